//! Destination addressing for printed artifacts.
//!
//! Every job writes under a fresh random token, so concurrent and repeated
//! jobs never share a key and no existence check is made before upload.

use url::Url;
use uuid::Uuid;

use super::error::DomainError;

pub const FALLBACK_REGION: &str = "us-east-1";
const REGION_QUERY_KEY: &str = "region";

/// Region fallbacks captured from the process environment at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionDefaults {
    /// `AWS_DEFAULT_REGION`
    pub default_region: Option<String>,
    /// `AWS_REGION`
    pub region: Option<String>,
}

impl RegionDefaults {
    pub fn from_env() -> Self {
        Self {
            default_region: non_empty_env("AWS_DEFAULT_REGION"),
            region: non_empty_env("AWS_REGION"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Where one artifact is written. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAddress {
    bucket: String,
    key: String,
    region: String,
    token: Uuid,
}

impl StorageAddress {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Conventional public URL for the object. Computed locally because the
    /// backend does not return one on write.
    pub fn public_url(&self) -> Result<Url, DomainError> {
        let host = if self.region == FALLBACK_REGION {
            format!("{}.s3.amazonaws.com", self.bucket)
        } else {
            format!("{}.s3-{}.amazonaws.com", self.bucket, self.region)
        };
        let mut url = Url::parse(&format!("https://{host}/"))
            .map_err(|err| DomainError::invalid_url("base", host.clone(), err))?;
        url.path_segments_mut()
            .map_err(|()| DomainError::validation("base", "bucket cannot form a URL host"))?
            .pop_if_empty()
            .extend(self.key.split('/'));
        Ok(url)
    }
}

/// Computes collision-free destination keys under a base location.
#[derive(Debug, Clone, Default)]
pub struct AddressBuilder {
    regions: RegionDefaults,
}

impl AddressBuilder {
    pub fn new(regions: RegionDefaults) -> Self {
        Self { regions }
    }

    pub fn build(&self, base: &Url, file_name: &str) -> Result<StorageAddress, DomainError> {
        let bucket = base
            .host_str()
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| DomainError::validation("base", "bucket name is missing"))?
            .to_string();

        let token = Uuid::new_v4();
        let key = format!("{}{token}/{file_name}", key_prefix(base.path()));

        Ok(StorageAddress {
            bucket,
            key,
            region: self.resolve_region(base)?,
            token,
        })
    }

    /// `?region=` on the base, then `AWS_DEFAULT_REGION`, then `AWS_REGION`,
    /// then `us-east-1`. The result becomes part of a hostname, so only
    /// lowercase letters, digits and `-` are accepted.
    pub fn resolve_region(&self, base: &Url) -> Result<String, DomainError> {
        let region = base
            .query_pairs()
            .find(|(key, value)| key == REGION_QUERY_KEY && !value.is_empty())
            .map(|(_, value)| value.into_owned())
            .or_else(|| self.regions.default_region.clone())
            .or_else(|| self.regions.region.clone())
            .unwrap_or_else(|| FALLBACK_REGION.to_string());

        if !is_region_name(&region) {
            return Err(DomainError::validation(
                "base",
                format!("region `{region}` is not a valid region name"),
            ));
        }
        Ok(region)
    }
}

fn is_region_name(region: &str) -> bool {
    !region.is_empty()
        && region
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
}

fn key_prefix(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
