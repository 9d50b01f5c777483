//! Ownership of the headless browser session and leasing of its pages.
//!
//! The pool holds at most one session. Session state transitions (launch,
//! replacement after a crash, shutdown) happen under a single async mutex so
//! concurrent jobs never relaunch the engine at the same time; page work runs
//! outside that lock once the session is ready.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use super::engine::{EngineError, EnginePage, EngineSession, LaunchOptions, RenderEngine};

const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("rendering engine unavailable: {0}")]
    ResourceUnavailable(#[source] EngineError),
    #[error("render pool is shut down")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Absent,
    Starting,
    Ready,
    InUse,
    Dead,
}

impl SessionState {
    fn encode(self) -> u8 {
        match self {
            SessionState::Absent => 0,
            SessionState::Starting => 1,
            SessionState::Ready => 2,
            SessionState::InUse => 3,
            SessionState::Dead => 4,
        }
    }

    fn decode(raw: u8) -> Self {
        match raw {
            1 => SessionState::Starting,
            2 => SessionState::Ready,
            3 => SessionState::InUse,
            4 => SessionState::Dead,
            _ => SessionState::Absent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub launch: LaunchOptions,
    pub max_concurrent_pages: usize,
}

#[derive(Default)]
struct SessionSlot {
    session: Option<Arc<dyn EngineSession>>,
    generation: u64,
}

pub struct RenderPool {
    engine: Arc<dyn RenderEngine>,
    launch: LaunchOptions,
    slot: Mutex<SessionSlot>,
    phase: AtomicU8,
    pages: Arc<Semaphore>,
    leased: Arc<AtomicUsize>,
}

impl RenderPool {
    pub fn new(engine: Arc<dyn RenderEngine>, settings: PoolSettings) -> Self {
        Self {
            engine,
            launch: settings.launch,
            slot: Mutex::new(SessionSlot::default()),
            phase: AtomicU8::new(SessionState::Absent.encode()),
            pages: Arc::new(Semaphore::new(settings.max_concurrent_pages.max(1))),
            leased: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current session state as observed without waiting on the session lock.
    pub fn state(&self) -> SessionState {
        match SessionState::decode(self.phase.load(Ordering::Acquire)) {
            SessionState::Ready if self.leased.load(Ordering::Acquire) > 0 => SessionState::InUse,
            state => state,
        }
    }

    /// Lease a fresh page in a live session, launching or replacing the
    /// session as needed. A lost connection or an unanswered command while
    /// opening the page triggers exactly one session replacement and one retry.
    pub async fn acquire_page(&self) -> Result<PageLease, PoolError> {
        let permit = Arc::clone(&self.pages)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let (session, generation) = self.ready_session().await?;
        let page = match session.new_page().await {
            Ok(page) => page,
            Err(err) if err.is_session_fatal() => {
                warn!(
                    target = "webprint::pool",
                    generation,
                    error = %err,
                    "Browser session failed while opening page; replacing session"
                );
                let (replacement, replacement_generation) =
                    self.replace_session(generation).await?;
                match replacement.new_page().await {
                    Ok(page) => page,
                    Err(err) => {
                        warn!(
                            target = "webprint::pool",
                            generation = replacement_generation,
                            error = %err,
                            "Retry against replacement session failed"
                        );
                        if err.is_session_fatal() {
                            self.mark_dead(replacement_generation).await;
                        }
                        return Err(PoolError::ResourceUnavailable(err));
                    }
                }
            }
            Err(err) => return Err(PoolError::ResourceUnavailable(err)),
        };

        self.leased.fetch_add(1, Ordering::AcqRel);
        Ok(PageLease::new(
            page,
            LeaseToken {
                _permit: permit,
                leased: Arc::clone(&self.leased),
            },
        ))
    }

    /// Close the held session and refuse further leases.
    pub async fn shutdown(&self) {
        self.pages.close();
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.session.take() {
            close_session(session.as_ref(), slot.generation).await;
        }
        self.phase
            .store(SessionState::Absent.encode(), Ordering::Release);
        info!(target = "webprint::pool", "Render pool shut down");
    }

    async fn ready_session(&self) -> Result<(Arc<dyn EngineSession>, u64), PoolError> {
        let mut slot = self.slot.lock().await;
        if let Some(session) = self.live_session(&slot) {
            return Ok((session, slot.generation));
        }
        self.relaunch(&mut slot).await
    }

    /// Replace the session that failed at `failed_generation`, unless another
    /// job already did so.
    async fn replace_session(
        &self,
        failed_generation: u64,
    ) -> Result<(Arc<dyn EngineSession>, u64), PoolError> {
        let mut slot = self.slot.lock().await;
        if slot.generation != failed_generation
            && let Some(session) = self.live_session(&slot)
        {
            debug!(
                target = "webprint::pool",
                failed_generation,
                generation = slot.generation,
                "Session already replaced by a concurrent job"
            );
            return Ok((session, slot.generation));
        }

        self.phase
            .store(SessionState::Dead.encode(), Ordering::Release);
        self.relaunch(&mut slot).await
    }

    /// Mark the session dead, unless a newer generation already replaced it.
    async fn mark_dead(&self, generation: u64) {
        let slot = self.slot.lock().await;
        if slot.generation == generation {
            self.phase
                .store(SessionState::Dead.encode(), Ordering::Release);
        }
    }

    fn live_session(&self, slot: &SessionSlot) -> Option<Arc<dyn EngineSession>> {
        let dead = SessionState::decode(self.phase.load(Ordering::Acquire)) == SessionState::Dead;
        slot.session
            .as_ref()
            .filter(|session| !dead && session.is_alive())
            .cloned()
    }

    async fn relaunch(
        &self,
        slot: &mut SessionSlot,
    ) -> Result<(Arc<dyn EngineSession>, u64), PoolError> {
        if let Some(broken) = slot.session.take() {
            close_session(broken.as_ref(), slot.generation).await;
        }

        slot.generation += 1;
        self.phase
            .store(SessionState::Starting.encode(), Ordering::Release);
        let started_at = Instant::now();

        match self.engine.launch(&self.launch).await {
            Ok(session) => {
                let session: Arc<dyn EngineSession> = Arc::from(session);
                slot.session = Some(Arc::clone(&session));
                self.phase
                    .store(SessionState::Ready.encode(), Ordering::Release);
                info!(
                    target = "webprint::pool",
                    generation = slot.generation,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Browser session started"
                );
                Ok((session, slot.generation))
            }
            Err(err) => {
                self.phase
                    .store(SessionState::Dead.encode(), Ordering::Release);
                warn!(
                    target = "webprint::pool",
                    generation = slot.generation,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %err,
                    "Browser session failed to start"
                );
                Err(PoolError::ResourceUnavailable(err))
            }
        }
    }
}

async fn close_session(session: &dyn EngineSession, generation: u64) {
    match tokio::time::timeout(SESSION_CLOSE_TIMEOUT, session.close()).await {
        Ok(Ok(())) => debug!(target = "webprint::pool", generation, "Browser session closed"),
        Ok(Err(err)) => warn!(
            target = "webprint::pool",
            generation,
            error = %err,
            "Failed to close browser session; continuing"
        ),
        Err(_) => warn!(
            target = "webprint::pool",
            generation,
            timeout_ms = SESSION_CLOSE_TIMEOUT.as_millis() as u64,
            "Timed out closing browser session; continuing"
        ),
    }
}

struct LeaseToken {
    _permit: OwnedSemaphorePermit,
    leased: Arc<AtomicUsize>,
}

impl Drop for LeaseToken {
    fn drop(&mut self) {
        self.leased.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Scoped ownership of one page. The page is closed exactly once: by
/// [`PageLease::release`], or by a close task scheduled from `Drop` when the
/// lease is abandoned on an error path or by a cancelled caller.
pub struct PageLease {
    page: Option<Box<dyn EnginePage>>,
    token: Option<LeaseToken>,
    runtime: tokio::runtime::Handle,
}

impl PageLease {
    fn new(page: Box<dyn EnginePage>, token: LeaseToken) -> Self {
        Self {
            page: Some(page),
            token: Some(token),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    pub fn page(&self) -> &dyn EnginePage {
        self.page
            .as_deref()
            .expect("PageLease: page already released")
    }

    /// Close the page. Failures are logged; the session stays open.
    pub async fn release(mut self) {
        if let Some(page) = self.page.take() {
            close_page(page.as_ref()).await;
        }
        self.token.take();
    }
}

impl Drop for PageLease {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let token = self.token.take();
            self.runtime.spawn(async move {
                close_page(page.as_ref()).await;
                drop(token);
            });
        }
    }
}

async fn close_page(page: &dyn EnginePage) {
    if let Err(err) = page.close().await {
        warn!(
            target = "webprint::pool",
            error = %err,
            "Failed to close page"
        );
    }
}
