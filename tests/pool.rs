mod support;

use std::{sync::Arc, time::Duration};

use webprint::application::print::{EngineError, PoolError, SessionState};

use support::{FakeEngine, pool, settle_until};

#[tokio::test]
async fn session_is_launched_lazily_and_reused() {
    let engine = Arc::new(FakeEngine::healthy());
    let pool = pool(Arc::clone(&engine), 4);
    assert_eq!(pool.state(), SessionState::Absent);
    assert_eq!(engine.probe.launches(), 0);

    let first = pool.acquire_page().await.expect("first page");
    assert_eq!(pool.state(), SessionState::InUse);
    first.release().await;
    assert_eq!(pool.state(), SessionState::Ready);

    let second = pool.acquire_page().await.expect("second page");
    second.release().await;

    assert_eq!(engine.probe.launches(), 1);
    assert_eq!(engine.probe.pages_opened(), 2);
    assert_eq!(engine.probe.pages_closed(), 2);
}

#[tokio::test]
async fn crashed_session_is_restarted_exactly_once() {
    let engine = Arc::new(FakeEngine::with_broken_sessions(1));
    let pool = pool(Arc::clone(&engine), 4);

    let lease = pool.acquire_page().await.expect("page from replacement session");
    lease.release().await;

    assert_eq!(engine.probe.launches(), 2);
    assert_eq!(engine.probe.session_closes(), 1);
    assert_eq!(engine.probe.pages_opened(), 1);
    assert_eq!(pool.state(), SessionState::Ready);
}

#[tokio::test]
async fn unresponsive_session_is_replaced() {
    let engine = Arc::new(FakeEngine {
        broken_sessions: 1,
        unresponsive_sessions: true,
        ..FakeEngine::default()
    });
    let pool = pool(Arc::clone(&engine), 4);

    let lease = pool
        .acquire_page()
        .await
        .expect("page from replacement session");
    lease.release().await;

    assert_eq!(engine.probe.launches(), 2);
    assert_eq!(engine.probe.session_closes(), 1);
    assert_eq!(engine.probe.pages_opened(), 1);
    assert_eq!(pool.state(), SessionState::Ready);
}

#[tokio::test]
async fn persistently_hung_engine_is_relaunched_by_later_jobs() {
    let engine = Arc::new(FakeEngine {
        broken_sessions: usize::MAX,
        unresponsive_sessions: true,
        ..FakeEngine::default()
    });
    let pool = pool(Arc::clone(&engine), 4);

    for attempt in 1..=3 {
        match pool.acquire_page().await {
            Err(PoolError::ResourceUnavailable(EngineError::Timeout(_))) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("hung engine produced a page"),
        }
        assert_eq!(engine.probe.launches(), attempt * 2);
        assert_eq!(pool.state(), SessionState::Dead);
    }
}

#[tokio::test]
async fn failed_restart_reports_resource_unavailable() {
    let engine = Arc::new(FakeEngine {
        broken_sessions: 1,
        failing_launch_from: Some(2),
        ..FakeEngine::default()
    });
    let pool = pool(Arc::clone(&engine), 4);

    let err = pool
        .acquire_page()
        .await
        .err()
        .expect("restart failure surfaces");

    match err {
        PoolError::ResourceUnavailable(EngineError::Launch(message)) => {
            assert!(message.contains("#2"), "unexpected message: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.probe.launches(), 2);
    assert_eq!(pool.state(), SessionState::Dead);
}

#[tokio::test]
async fn dead_pool_relaunches_on_next_acquire() {
    let engine = Arc::new(FakeEngine {
        failing_launch_from: Some(1),
        ..FakeEngine::default()
    });
    let pool = pool(Arc::clone(&engine), 4);

    assert!(pool.acquire_page().await.is_err());
    assert_eq!(pool.state(), SessionState::Dead);
    assert!(pool.acquire_page().await.is_err());
    assert_eq!(engine.probe.launches(), 2);
}

#[tokio::test]
async fn concurrent_crash_triggers_a_single_relaunch() {
    let engine = Arc::new(FakeEngine::with_broken_sessions(1));
    let pool = pool(Arc::clone(&engine), 4);

    let (first, second) = tokio::join!(pool.acquire_page(), pool.acquire_page());
    let first = first.expect("first job gets a page");
    let second = second.expect("second job gets a page");

    assert_eq!(engine.probe.launches(), 2);
    assert_eq!(engine.probe.pages_opened(), 2);

    first.release().await;
    second.release().await;
    assert_eq!(engine.probe.pages_closed(), 2);
}

#[tokio::test]
async fn dropped_lease_closes_its_page_once() {
    let engine = Arc::new(FakeEngine::healthy());
    let pool = pool(Arc::clone(&engine), 1);

    let lease = pool.acquire_page().await.expect("page");
    drop(lease);

    let probe = Arc::clone(&engine.probe);
    settle_until(|| probe.pages_closed() == 1).await;
    assert_eq!(engine.probe.pages_closed(), 1);

    // The single page slot is free again once the abandoned page is closed.
    let next = pool.acquire_page().await.expect("slot released");
    next.release().await;
    assert_eq!(engine.probe.pages_closed(), 2);
}

#[tokio::test]
async fn shutdown_closes_the_session_and_refuses_new_leases() {
    let engine = Arc::new(FakeEngine::healthy());
    let pool = pool(Arc::clone(&engine), 4);

    pool.acquire_page()
        .await
        .expect("page")
        .release()
        .await;
    pool.shutdown().await;

    assert_eq!(engine.probe.session_closes(), 1);
    assert_eq!(pool.state(), SessionState::Absent);
    assert!(matches!(pool.acquire_page().await, Err(PoolError::Closed)));
}

#[tokio::test(start_paused = true)]
async fn late_retry_failure_keeps_a_newer_session_alive() {
    // Job A fails on the first session, replaces it and waits on its retry.
    // Job B then finds that replacement broken, installs a third session and
    // gets a page before A's retry finally fails.
    let engine = Arc::new(FakeEngine {
        broken_sessions: 2,
        page_failure_delays: vec![Duration::ZERO, Duration::from_millis(100), Duration::ZERO],
        ..FakeEngine::default()
    });
    let pool = Arc::new(pool(Arc::clone(&engine), 4));

    let slow = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.acquire_page().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let lease = pool.acquire_page().await.expect("page from third session");
    assert_eq!(engine.probe.launches(), 3);

    let slow = slow.await.expect("join");
    assert!(matches!(
        slow.err(),
        Some(PoolError::ResourceUnavailable(EngineError::Connection(_)))
    ));
    assert_eq!(pool.state(), SessionState::InUse);

    lease.release().await;
    assert_eq!(pool.state(), SessionState::Ready);
    pool.acquire_page()
        .await
        .expect("page from the surviving session")
        .release()
        .await;
    assert_eq!(engine.probe.launches(), 3);
}
