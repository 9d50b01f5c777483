//! Headless Chromium engine over the DevTools protocol.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chromiumoxide::{
    Browser, BrowserConfig, Page,
    cdp::browser_protocol::{
        emulation::SetEmulatedMediaParams,
        page::{
            EventLifecycleEvent, NavigateParams, PrintToPdfParams, SetLifecycleEventsEnabledParams,
        },
    },
    error::CdpError,
};
use futures::StreamExt;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    application::print::{EngineError, EnginePage, EngineSession, LaunchOptions, RenderEngine},
    domain::options::{Dimension, Media, PrintOptions},
};

const BLANK_PAGE: &str = "about:blank";
const NETWORK_ALMOST_IDLE: &str = "networkAlmostIdle";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SANDBOX_ARGS: [&str; 1] = ["--disable-setuid-sandbox"];

/// Launches one Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromeEngine;

impl ChromeEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RenderEngine for ChromeEngine {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn EngineSession>, EngineError> {
        let request_timeout = options.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let profile_dir = std::env::temp_dir().join(format!("webprint-chrome-{}", Uuid::new_v4()));

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .args(SANDBOX_ARGS)
            .args(options.args.iter().cloned())
            .request_timeout(request_timeout)
            .user_data_dir(&profile_dir);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = options.executable.as_ref() {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(EngineError::launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| EngineError::launch(err.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let handler_alive = Arc::clone(&alive);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(
                        target = "webprint::chrome",
                        error = %err,
                        "DevTools handler reported an error"
                    );
                }
            }
            handler_alive.store(false, Ordering::Release);
            warn!(target = "webprint::chrome", "DevTools connection closed");
        });

        debug!(
            target = "webprint::chrome",
            profile_dir = %profile_dir.display(),
            "Chromium launched"
        );

        Ok(Box::new(ChromeSession {
            browser: Mutex::new(browser),
            handler_task,
            alive,
            profile_dir,
            request_timeout,
        }))
    }
}

pub struct ChromeSession {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    alive: Arc<AtomicBool>,
    profile_dir: PathBuf,
    request_timeout: Duration,
}

#[async_trait]
impl EngineSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn EnginePage>, EngineError> {
        if !self.is_alive() {
            return Err(EngineError::connection("browser process is gone"));
        }
        let page = self
            .browser
            .lock()
            .await
            .new_page(BLANK_PAGE)
            .await
            .map_err(|err| classify(err, self.request_timeout))?;

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|err| classify(err, self.request_timeout))?;

        Ok(Box::new(ChromePage {
            page,
            request_timeout: self.request_timeout,
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.alive.store(false, Ordering::Release);
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|err| classify(err, self.request_timeout));
        if closed.is_err() {
            let _ = browser.kill().await;
        }
        let _ = browser.wait().await;
        self.handler_task.abort();

        if let Err(err) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            debug!(
                target = "webprint::chrome",
                profile_dir = %self.profile_dir.display(),
                error = %err,
                "Failed to remove browser profile directory"
            );
        }
        closed
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.handler_task.is_finished()
    }
}

pub struct ChromePage {
    page: Page,
    request_timeout: Duration,
}

#[async_trait]
impl EnginePage for ChromePage {
    async fn navigate(&self, url: &Url) -> Result<(), EngineError> {
        let mut lifecycle = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|err| classify(err, self.request_timeout))?;

        let navigation = self
            .page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(|err| classify(err, self.request_timeout))?;
        if let Some(error_text) = navigation.result.error_text.as_ref() {
            return Err(EngineError::protocol(format!("navigation failed: {error_text}")));
        }

        // Same-document navigations have no loader and no lifecycle to wait on.
        let Some(loader_id) = navigation.result.loader_id.clone() else {
            return Ok(());
        };

        while let Some(event) = lifecycle.next().await {
            if event.loader_id == loader_id && event.name == NETWORK_ALMOST_IDLE {
                return Ok(());
            }
        }
        Err(EngineError::connection("page closed before the network went idle"))
    }

    async fn emulate_media(&self, media: Media) -> Result<(), EngineError> {
        self.page
            .execute(SetEmulatedMediaParams {
                media: Some(media.as_str().to_string()),
                ..Default::default()
            })
            .await
            .map(|_| ())
            .map_err(|err| classify(err, self.request_timeout))
    }

    async fn print_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        self.page
            .pdf(pdf_params(options))
            .await
            .map_err(|err| classify(err, self.request_timeout))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|err| classify(err, self.request_timeout))
    }
}

/// DevTools print parameters; sizes and margins are in inches. Orientation is
/// applied by the engine through `landscape`.
pub fn pdf_params(options: &PrintOptions) -> PrintToPdfParams {
    let (paper_width, paper_height) = options.format.size_inches();
    let margin = options.margin.unwrap_or_default();
    let inches = |value: Option<Dimension>| {
        Some(value.map(|dimension| dimension.to_inches()).unwrap_or(0.0))
    };

    PrintToPdfParams {
        landscape: Some(options.layout.is_landscape()),
        print_background: Some(options.background),
        scale: Some(options.scale),
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: inches(margin.top),
        margin_bottom: inches(margin.bottom),
        margin_left: inches(margin.left),
        margin_right: inches(margin.right),
        ..Default::default()
    }
}

/// Transport failures mean the browser is gone; everything else is a
/// command-level rejection.
fn classify(err: CdpError, request_timeout: Duration) -> EngineError {
    match err {
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            EngineError::connection(err.to_string())
        }
        CdpError::Timeout => EngineError::Timeout(request_timeout),
        other => EngineError::protocol(other.to_string()),
    }
}
