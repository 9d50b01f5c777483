//! Durable persistence of rendered artifacts.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use url::Url;

use super::renderer::PdfArtifact;
use crate::domain::address::StorageAddress;

pub const ATTACHMENT_DISPOSITION: &str = "attachment";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage rejected upload of `{key}`: {message}")]
    Backend { key: String, message: String },
    #[error("cannot form public URL for `{key}`: {message}")]
    Address { key: String, message: String },
}

/// A single object write.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub content_disposition: String,
}

/// Object storage client. Implementations resolve their own endpoint and
/// credentials; failures are reported as plain backend messages.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, object: PutObject) -> Result<(), String>;
}

#[derive(Clone)]
pub struct ArtifactStore {
    backend: Arc<dyn ObjectStore>,
}

impl ArtifactStore {
    pub fn new(backend: Arc<dyn ObjectStore>) -> Self {
        Self { backend }
    }

    /// Upload the artifact as a downloadable PDF and report its public URL.
    /// No retry is attempted.
    pub async fn upload(
        &self,
        artifact: PdfArtifact,
        address: &StorageAddress,
    ) -> Result<Url, StorageError> {
        let public_url = address
            .public_url()
            .map_err(|err| StorageError::Address {
                key: address.key().to_string(),
                message: err.to_string(),
            })?;

        let size_bytes = artifact.len();
        self.backend
            .put(PutObject {
                bucket: address.bucket().to_string(),
                key: address.key().to_string(),
                body: artifact.bytes,
                content_type: artifact.content_type.to_string(),
                content_disposition: ATTACHMENT_DISPOSITION.to_string(),
            })
            .await
            .map_err(|message| StorageError::Backend {
                key: address.key().to_string(),
                message,
            })?;

        info!(
            target = "webprint::store",
            bucket = address.bucket(),
            key = address.key(),
            region = address.region(),
            size_bytes,
            url = %public_url,
            "Artifact uploaded"
        );

        Ok(public_url)
    }
}
