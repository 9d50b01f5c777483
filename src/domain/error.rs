use thiserror::Error;

/// Rejected caller input. Raised before any rendering or storage resource is touched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("invalid `{field}` URL `{value}`: {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_url(field: &'static str, value: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            field,
            value: value.into(),
            source,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::Validation { field, .. } | Self::InvalidUrl { field, .. } => field,
        }
    }
}
