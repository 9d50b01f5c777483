use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode, Uri},
};
use tracing::info;

use super::{
    error::ApiError,
    models::{PrintRequest, PrintResponse, StatusResponse},
    state::HttpState,
};

const SOURCE: &str = "infra::http::handlers::print";

pub async fn print(
    State(state): State<HttpState>,
    payload: Result<Json<PrintRequest>, JsonRejection>,
) -> Result<Json<PrintResponse>, ApiError> {
    let Json(PrintRequest {
        url,
        file_name,
        options,
    }) = payload.map_err(|rejection| ApiError::bad_request(SOURCE, &rejection))?;

    let job = state
        .pipeline
        .print(&url, &state.base, &file_name, options);

    // Dropping the timed-out job future releases its page lease.
    match tokio::time::timeout(state.job_timeout, job).await {
        Ok(Ok(printed)) => {
            info!(
                target = "webprint::http::print",
                source_url = %url,
                url = %printed,
                "Print request served"
            );
            Ok(Json(PrintResponse {
                url: printed.to_string(),
            }))
        }
        Ok(Err(err)) if err.is_input() => Err(ApiError::bad_request(SOURCE, &err.cause)),
        Ok(Err(err)) => Err(ApiError::internal(SOURCE, &err)),
        Err(_) => Err(ApiError::from_message(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "print job exceeded {}s and was cancelled",
                state.job_timeout.as_secs()
            ),
        )),
    }
}

/// CORS preflight; headers are added by the CORS middleware.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn status(State(state): State<HttpState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: true,
        engine: state.pipeline.pool().state(),
    })
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::method_not_allowed(method.as_str(), uri.path())
}
