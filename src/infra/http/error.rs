use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::models::{ErrorBody, ErrorDetails};
use crate::application::error::ErrorReport;

/// Error response carrying the canonical reason phrase and a detail message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        Self {
            status,
            detail: error.to_string(),
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        detail: impl Into<String>,
    ) -> Self {
        let detail = detail.into();
        Self {
            status,
            report: ErrorReport::from_message(source, status, detail.clone()),
            detail,
        }
    }

    pub fn bad_request(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(source, StatusCode::BAD_REQUEST, error)
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    pub fn not_found(path: &str) -> Self {
        Self::from_message(
            "infra::http::fallback",
            StatusCode::NOT_FOUND,
            format!("no route for {path}"),
        )
    }

    pub fn method_not_allowed(method: &str, path: &str) -> Self {
        Self::from_message(
            "infra::http::fallback",
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{method} is not allowed on {path}"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            message: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            details: ErrorDetails {
                message: self.detail,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
