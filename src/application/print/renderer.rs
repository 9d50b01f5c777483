//! Turning a leased page into a PDF artifact.

use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::engine::{EngineError, EnginePage};
use crate::domain::options::PrintOptions;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: EngineError,
    },
    #[error("PDF export failed: {0}")]
    Export(#[source] EngineError),
}

/// Rendered document bytes, held only until upload completes.
#[derive(Debug, Clone)]
pub struct PdfArtifact {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

impl PdfArtifact {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: PDF_CONTENT_TYPE,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RendererSettings {
    /// Pause between navigation and export so late scripts can paint.
    /// Best-effort only; nothing waits on fonts or specific elements.
    pub settle_delay: Duration,
    pub navigation_timeout: Duration,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

/// Drives one leased page through navigation, media emulation and export.
/// The page is never closed here; its lease owns that.
#[derive(Debug, Clone, Default)]
pub struct PageRenderer {
    settings: RendererSettings,
}

impl PageRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub async fn render(
        &self,
        page: &dyn EnginePage,
        source: &Url,
        options: &PrintOptions,
    ) -> Result<PdfArtifact, RenderError> {
        let started_at = Instant::now();

        match tokio::time::timeout(self.settings.navigation_timeout, page.navigate(source)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(RenderError::Navigation {
                    url: source.to_string(),
                    source: err,
                });
            }
            Err(_) => {
                return Err(RenderError::Navigation {
                    url: source.to_string(),
                    source: EngineError::Timeout(self.settings.navigation_timeout),
                });
            }
        }
        debug!(
            target = "webprint::render",
            url = %source,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Page reached network idle"
        );

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        page.emulate_media(options.media)
            .await
            .map_err(RenderError::Export)?;
        let bytes = page.print_pdf(options).await.map_err(RenderError::Export)?;
        if bytes.is_empty() {
            return Err(RenderError::Export(EngineError::protocol(
                "engine returned an empty document",
            )));
        }

        info!(
            target = "webprint::render",
            url = %source,
            media = %options.media,
            format = %options.format,
            layout = %options.layout,
            pdf_bytes = bytes.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Page exported as PDF"
        );

        Ok(PdfArtifact::new(bytes))
    }
}
