use std::{sync::Arc, time::Duration};

use axum::http::HeaderValue;
use url::Url;

use crate::application::print::PrintPipeline;

#[derive(Clone)]
pub struct HttpState {
    pub pipeline: Arc<PrintPipeline>,
    /// Destination base applied to every request.
    pub base: Url,
    pub cors_allowed_origin: HeaderValue,
    pub job_timeout: Duration,
}
