use serde::{Deserialize, Serialize};

use crate::{application::print::SessionState, domain::options::PrintOptions};

/// `POST /print` body: the source, the file name and any print options at
/// the top level.
#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    pub url: String,
    pub file_name: String,
    #[serde(flatten)]
    pub options: PrintOptions,
}

#[derive(Debug, Serialize)]
pub struct PrintResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: bool,
    pub engine: SessionState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub details: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::options::{Layout, PaperFormat};

    #[test]
    fn print_request_reads_options_from_the_top_level() {
        let request: PrintRequest = serde_json::from_value(json!({
            "url": "https://example.com",
            "file_name": "report.pdf",
            "format": "Letter",
            "layout": "landscape",
            "scale": 2,
            "margin": { "top": "1in" },
            "callback": "ignored",
        }))
        .expect("request parsed");

        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.file_name, "report.pdf");
        assert_eq!(request.options.format, PaperFormat::Letter);
        assert_eq!(request.options.layout, Layout::Landscape);
        assert_eq!(request.options.scale, 2.0);
        assert!(request.options.background);
    }

    #[test]
    fn error_body_uses_camel_case() {
        let body = ErrorBody {
            status_code: 400,
            message: "Bad Request".to_string(),
            details: ErrorDetails {
                message: "url: relative URL without a base".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(body).expect("serialize"),
            json!({
                "statusCode": 400,
                "message": "Bad Request",
                "details": { "message": "url: relative URL without a base" },
            })
        );
    }
}
