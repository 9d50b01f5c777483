use url::Url;

use super::{error::DomainError, options::PrintOptions};

/// A validated request to print one page. Consumed by a single pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub source: Url,
    pub destination_base: Url,
    pub file_name: String,
    pub options: PrintOptions,
}

impl PrintJob {
    pub fn new(
        source: &str,
        destination_base: &Url,
        file_name: &str,
        options: PrintOptions,
    ) -> Result<Self, DomainError> {
        let source = parse_source(source)?;
        validate_destination(destination_base)?;
        validate_file_name(file_name)?;
        options.validate()?;

        Ok(Self {
            source,
            destination_base: destination_base.clone(),
            file_name: file_name.to_string(),
            options,
        })
    }
}

/// Parse a page URL, accepting only absolute http(s) addresses.
pub fn parse_source(raw: &str) -> Result<Url, DomainError> {
    let url = Url::parse(raw.trim()).map_err(|err| DomainError::invalid_url("url", raw, err))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DomainError::validation(
            "url",
            format!("scheme `{other}` is not supported; use http or https"),
        )),
    }
}

/// Parse an `s3://bucket/prefix` destination base.
pub fn parse_destination(raw: &str) -> Result<Url, DomainError> {
    let url = Url::parse(raw.trim()).map_err(|err| DomainError::invalid_url("base", raw, err))?;
    validate_destination(&url)?;
    Ok(url)
}

fn validate_destination(base: &Url) -> Result<(), DomainError> {
    if base.scheme() != "s3" {
        return Err(DomainError::validation(
            "base",
            format!("scheme `{}` is not supported; use s3://bucket/", base.scheme()),
        ));
    }
    match base.host_str() {
        Some(bucket) if !bucket.is_empty() => Ok(()),
        _ => Err(DomainError::validation("base", "bucket name is missing")),
    }
}

fn validate_file_name(file_name: &str) -> Result<(), DomainError> {
    if file_name.trim().is_empty() {
        return Err(DomainError::validation("file_name", "must not be empty"));
    }
    if file_name.contains(['/', '\\']) {
        return Err(DomainError::validation(
            "file_name",
            "must be a single path segment",
        ));
    }
    if matches!(file_name, "." | "..") {
        return Err(DomainError::validation(
            "file_name",
            "must not be a relative directory reference",
        ));
    }
    Ok(())
}
