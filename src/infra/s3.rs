//! S3 object store used for printed artifacts.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};
use tracing::debug;

use crate::{
    application::print::{ObjectStore, PutObject},
    config::StorageSettings,
    domain::address::FALLBACK_REGION,
};

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the AWS default provider chain, applying the
    /// configured region and endpoint overrides.
    pub async fn from_settings(settings: &StorageSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = settings.region.clone() {
            loader = loader.region(Region::new(region));
        }
        let shared = loader.load().await;
        let config = client_config(&shared, settings);

        debug!(
            target = "webprint::s3",
            region = config.region().map(|region| region.as_ref()).unwrap_or(""),
            endpoint = settings.endpoint_url.as_deref().unwrap_or(""),
            "S3 client configured"
        );

        Self::new(Client::from_conf(config))
    }
}

/// Client config on top of the shared AWS config. Without a region from
/// settings or the provider chain the client targets `us-east-1`, the same
/// region public URLs fall back to.
fn client_config(shared: &SdkConfig, settings: &StorageSettings) -> aws_sdk_s3::Config {
    let mut builder = aws_sdk_s3::config::Builder::from(shared);
    if shared.region().is_none() {
        builder = builder.region(Region::new(FALLBACK_REGION));
    }
    if let Some(endpoint) = settings.endpoint_url.as_deref() {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    builder.build()
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, object: PutObject) -> Result<(), String> {
        self.client
            .put_object()
            .bucket(object.bucket)
            .key(object.key)
            .body(ByteStream::from(object.body))
            .content_type(object.content_type)
            .content_disposition(object.content_disposition)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| DisplayErrorContext(&err).to_string())
    }
}
