#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use webprint::application::print::{
    ArtifactStore, EngineError, EnginePage, EngineSession, LaunchOptions, ObjectStore,
    PageRenderer, PoolSettings, PrintPipeline, PutObject, RenderEngine, RenderPool,
    RendererSettings,
};
use webprint::domain::{
    address::{AddressBuilder, RegionDefaults},
    options::{Media, PrintOptions},
};

pub const FAKE_PDF: &[u8] = b"%PDF-1.7 fake";

/// Counters shared by every session and page a [`FakeEngine`] hands out.
#[derive(Debug, Default)]
pub struct EngineProbe {
    pub launches: AtomicUsize,
    pub session_closes: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub navigations: AtomicUsize,
    pub exports: AtomicUsize,
    pub failed_page_attempts: AtomicUsize,
}

impl EngineProbe {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn session_closes(&self) -> usize {
        self.session_closes.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    /// Total engine interactions of any kind.
    pub fn interactions(&self) -> usize {
        self.launches() + self.pages_opened() + self.navigations()
    }
}

/// Scripted engine. The first `broken_sessions` sessions report themselves
/// alive but fail every `new_page` with a connection error (or a timeout when
/// `unresponsive_sessions` is set); launches numbered `failing_launch_from`
/// and later fail outright. The n-th failed page attempt across all sessions
/// waits `page_failure_delays[n]` before failing.
#[derive(Debug, Default)]
pub struct FakeEngine {
    pub probe: Arc<EngineProbe>,
    pub broken_sessions: usize,
    pub unresponsive_sessions: bool,
    pub page_failure_delays: Vec<Duration>,
    pub failing_launch_from: Option<usize>,
    pub hang_navigation: Arc<AtomicBool>,
    pub fail_export: bool,
}

impl FakeEngine {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn with_broken_sessions(count: usize) -> Self {
        Self {
            broken_sessions: count,
            ..Self::default()
        }
    }
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn EngineSession>, EngineError> {
        let number = self.probe.launches.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .failing_launch_from
            .is_some_and(|from| number >= from)
        {
            return Err(EngineError::launch(format!("launch #{number} refused")));
        }
        Ok(Box::new(FakeSession {
            probe: Arc::clone(&self.probe),
            broken: number <= self.broken_sessions,
            unresponsive: self.unresponsive_sessions,
            page_failure_delays: self.page_failure_delays.clone(),
            closed: AtomicBool::new(false),
            hang_navigation: Arc::clone(&self.hang_navigation),
            fail_export: self.fail_export,
        }))
    }
}

struct FakeSession {
    probe: Arc<EngineProbe>,
    broken: bool,
    unresponsive: bool,
    page_failure_delays: Vec<Duration>,
    closed: AtomicBool,
    hang_navigation: Arc<AtomicBool>,
    fail_export: bool,
}

#[async_trait]
impl EngineSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn EnginePage>, EngineError> {
        if self.broken {
            let attempt = self.probe.failed_page_attempts.fetch_add(1, Ordering::SeqCst);
            match self.page_failure_delays.get(attempt) {
                Some(delay) if !delay.is_zero() => tokio::time::sleep(*delay).await,
                // Let concurrent callers observe the same broken session.
                _ => tokio::task::yield_now().await,
            }
            if self.unresponsive {
                return Err(EngineError::Timeout(Duration::from_secs(30)));
            }
            return Err(EngineError::connection("target closed"));
        }
        self.probe.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            probe: Arc::clone(&self.probe),
            hang_navigation: Arc::clone(&self.hang_navigation),
            fail_export: self.fail_export,
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.probe.session_closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

struct FakePage {
    probe: Arc<EngineProbe>,
    hang_navigation: Arc<AtomicBool>,
    fail_export: bool,
}

#[async_trait]
impl EnginePage for FakePage {
    async fn navigate(&self, _url: &Url) -> Result<(), EngineError> {
        self.probe.navigations.fetch_add(1, Ordering::SeqCst);
        if self.hang_navigation.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn emulate_media(&self, _media: Media) -> Result<(), EngineError> {
        Ok(())
    }

    async fn print_pdf(&self, _options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        self.probe.exports.fetch_add(1, Ordering::SeqCst);
        if self.fail_export {
            return Err(EngineError::protocol("Printing failed"));
        }
        Ok(FAKE_PDF.to_vec())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.probe.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory object store recording every write.
#[derive(Debug, Default)]
pub struct FakeObjectStore {
    pub objects: Mutex<Vec<PutObject>>,
    pub reject_with: Option<String>,
}

impl FakeObjectStore {
    pub fn rejecting(message: &str) -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            reject_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(&self, object: PutObject) -> Result<(), String> {
        if let Some(message) = self.reject_with.as_ref() {
            return Err(message.clone());
        }
        self.objects.lock().await.push(object);
        Ok(())
    }
}

pub fn pool(engine: Arc<FakeEngine>, max_concurrent_pages: usize) -> RenderPool {
    RenderPool::new(
        engine,
        PoolSettings {
            launch: LaunchOptions::default(),
            max_concurrent_pages,
        },
    )
}

pub fn renderer(navigation_timeout: Duration) -> PageRenderer {
    PageRenderer::new(RendererSettings {
        settle_delay: Duration::ZERO,
        navigation_timeout,
    })
}

/// Pipeline over fakes with no region defaults, so addresses fall back to
/// `us-east-1` unless the base names a region.
pub fn pipeline(engine: Arc<FakeEngine>, store: Arc<FakeObjectStore>) -> PrintPipeline {
    PrintPipeline::new(
        Arc::new(pool(engine, 4)),
        renderer(Duration::from_secs(5)),
        AddressBuilder::new(RegionDefaults::default()),
        ArtifactStore::new(store),
    )
}

pub fn base(raw: &str) -> Url {
    Url::parse(raw).expect("base url")
}

/// Let spawned cleanup tasks run until `done` holds.
pub async fn settle_until(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(done(), "condition not reached after yielding");
}
