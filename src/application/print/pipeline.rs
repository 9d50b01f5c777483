//! The `print` operation shared by the CLI and the HTTP server.

use std::{fmt, sync::Arc, time::Instant};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::{
    pool::{PoolError, RenderPool},
    renderer::{PageRenderer, RenderError},
    store::{ArtifactStore, StorageError},
};
use crate::domain::{
    address::AddressBuilder,
    error::DomainError,
    job::PrintJob,
    options::PrintOptions,
};

/// Stages of one print job, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Created,
    Addressed,
    Rendering,
    Rendered,
    Uploading,
    Done,
}

impl JobStage {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::Addressed => "addressed",
            JobStage::Rendering => "rendering",
            JobStage::Rendered => "rendered",
            JobStage::Uploading => "uploading",
            JobStage::Done => "done",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PrintFailure {
    #[error(transparent)]
    Input(#[from] DomainError),
    #[error(transparent)]
    ResourceUnavailable(#[from] PoolError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Terminal failure of a print job: the stage it was in and why.
#[derive(Debug, Error)]
#[error("print job failed at stage `{stage}`: {cause}")]
pub struct PrintError {
    pub stage: JobStage,
    #[source]
    pub cause: PrintFailure,
}

impl PrintError {
    fn at(stage: JobStage, cause: impl Into<PrintFailure>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.cause, PrintFailure::Input(_))
    }
}

/// Address, render and upload one page.
pub struct PrintPipeline {
    pool: Arc<RenderPool>,
    renderer: PageRenderer,
    addresses: AddressBuilder,
    store: ArtifactStore,
}

impl PrintPipeline {
    pub fn new(
        pool: Arc<RenderPool>,
        renderer: PageRenderer,
        addresses: AddressBuilder,
        store: ArtifactStore,
    ) -> Self {
        Self {
            pool,
            renderer,
            addresses,
            store,
        }
    }

    pub fn pool(&self) -> &RenderPool {
        &self.pool
    }

    /// Print `source` to a PDF stored under `destination` as `file_name` and
    /// return its public URL. Input is validated before any engine work.
    pub async fn print(
        &self,
        source: &str,
        destination: &Url,
        file_name: &str,
        options: PrintOptions,
    ) -> Result<Url, PrintError> {
        let started_at = Instant::now();
        let job = PrintJob::new(source, destination, file_name, options)
            .map_err(|err| PrintError::at(JobStage::Created, err))?;

        let address = self
            .addresses
            .build(&job.destination_base, &job.file_name)
            .map_err(|err| PrintError::at(JobStage::Created, err))?;
        let token = address.token();
        info!(
            target = "webprint::pipeline",
            %token,
            stage = %JobStage::Addressed,
            url = %job.source,
            bucket = address.bucket(),
            key = address.key(),
            "Print job addressed"
        );

        let lease = self
            .pool
            .acquire_page()
            .await
            .map_err(|err| log_failure(token, PrintError::at(JobStage::Rendering, err)))?;
        let rendered = self
            .renderer
            .render(lease.page(), &job.source, &job.options)
            .await;
        lease.release().await;
        let artifact =
            rendered.map_err(|err| log_failure(token, PrintError::at(JobStage::Rendering, err)))?;
        info!(
            target = "webprint::pipeline",
            %token,
            stage = %JobStage::Rendered,
            pdf_bytes = artifact.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Print job rendered"
        );

        let url = self
            .store
            .upload(artifact, &address)
            .await
            .map_err(|err| log_failure(token, PrintError::at(JobStage::Uploading, err)))?;
        info!(
            target = "webprint::pipeline",
            %token,
            stage = %JobStage::Done,
            url = %url,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Print job completed"
        );

        Ok(url)
    }
}

fn log_failure(token: Uuid, error: PrintError) -> PrintError {
    warn!(
        target = "webprint::pipeline",
        %token,
        stage = %error.stage,
        error = %error.cause,
        "Print job failed"
    );
    error
}
