//! Seam between the print core and a headless browser engine.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::domain::options::{Media, PrintOptions};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine failed to launch: {0}")]
    Launch(String),
    #[error("engine connection lost: {0}")]
    Connection(String),
    #[error("engine operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine rejected command: {0}")]
    Protocol(String),
}

impl EngineError {
    pub fn launch(message: impl Into<String>) -> Self {
        Self::Launch(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether the session behind this error should be treated as dead. An
    /// unanswered command means the browser is hung even if its socket is open.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Flags for starting an engine session.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
    pub headless: bool,
    pub request_timeout: Option<Duration>,
}

/// Starts engine sessions. One call per (re)launch.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn EngineSession>, EngineError>;
}

/// A live engine instance that can host several pages.
#[async_trait]
pub trait EngineSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn EnginePage>, EngineError>;

    async fn close(&self) -> Result<(), EngineError>;

    fn is_alive(&self) -> bool;
}

/// One tab inside a session, used for a single navigate/export cycle.
#[async_trait]
pub trait EnginePage: Send + Sync {
    /// Load `url` and wait until network activity is almost idle.
    async fn navigate(&self, url: &Url) -> Result<(), EngineError>;

    async fn emulate_media(&self, media: Media) -> Result<(), EngineError>;

    async fn print_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>, EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}
