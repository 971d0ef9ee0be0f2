use std::{
    collections::HashSet,
    env,
    time::{Duration, Instant},
};

use tenantpool::{
    PoolError, PoolOptions, PoolRegistry, PostgresConnector, TenantPool, backend::PostgresPool,
};
use tokio::time::sleep;

// Set to a reachable libpq-style descriptor to run the live checks, e.g.
// TENANTPOOL_TEST_DSN="host=127.0.0.1 user=postgres password=postgres dbname=postgres"
const LIVE_DSN_VAR: &str = "TENANTPOOL_TEST_DSN";

fn small_pool() -> PoolOptions {
    PoolOptions {
        max_connections: 4,
        min_connections: 2,
        connect_timeout: Duration::from_secs(2),
        ..PoolOptions::default()
    }
}

fn live_dsn() -> Option<String> {
    let dsn = env::var(LIVE_DSN_VAR).ok();
    if dsn.is_none() {
        eprintln!("skipping: {LIVE_DSN_VAR} not set");
    }
    dsn
}

/// Backend pids of `n` connections checked out at the same time.
async fn backend_pids(pool: &PostgresPool, n: usize) -> HashSet<i32> {
    let mut held = Vec::with_capacity(n);
    for _ in 0..n {
        held.push(pool.get().await.unwrap());
    }

    let mut pids = HashSet::new();
    for conn in &held {
        let row = conn.query_one("SELECT pg_backend_pid()", &[]).await.unwrap();
        pids.insert(row.get::<_, i32>(0));
    }
    pids
}

/// Poll `pool.stats().total` until it equals `want`, or panic after `limit`.
async fn wait_for_total(pool: &PostgresPool, want: u32, limit: Duration) {
    let deadline = Instant::now() + limit;
    while pool.stats().total != want {
        assert!(
            Instant::now() < deadline,
            "pool total stuck at {} (want {want})",
            pool.stats().total
        );
        sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_creation_failure() {
    let registry = PoolRegistry::new(PostgresConnector, small_pool());

    // nothing listens on port 1
    let err = registry
        .get_or_create("t1", "host=127.0.0.1 port=1 user=nobody dbname=nothing")
        .await
        .unwrap_err();

    assert!(matches!(err, PoolError::PoolCreationFailure { .. }), "{err:?}");
    assert!(registry.is_empty());
}

#[tokio::test]
async fn live_pool_is_warmed_and_released() {
    let Some(dsn) = live_dsn() else { return };

    let registry = PoolRegistry::new(PostgresConnector, small_pool());

    let pool = registry.get_or_create("live", &dsn).await.unwrap();
    let again = registry.get_or_create("live", &dsn).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&pool, &again));

    let stats = registry.stats("live", &dsn).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.idle, 2);
    assert_eq!(stats.active, 0);

    registry.release("live", &dsn).unwrap();
    assert!(matches!(
        registry.stats("live", &dsn),
        Err(PoolError::PoolNotFound { .. })
    ));
}

#[tokio::test]
async fn idle_connections_above_the_floor_are_reaped() {
    let Some(dsn) = live_dsn() else { return };

    let registry = PoolRegistry::new(
        PostgresConnector,
        PoolOptions {
            max_connections: 4,
            min_connections: 1,
            max_idle_time: Duration::from_millis(300),
            reap_interval: Duration::from_millis(100),
            ..small_pool()
        },
    );
    let pool = registry.get_or_create("idle", &dsn).await.unwrap();
    assert_eq!(pool.stats().total, 1);

    // grow to 3, then let them all go idle
    assert_eq!(backend_pids(&pool, 3).await.len(), 3);
    assert_eq!(pool.stats().total, 3);

    wait_for_total(&pool, 1, Duration::from_secs(3)).await;

    // the floor is kept even though it is idle too
    sleep(Duration::from_millis(600)).await;
    assert_eq!(pool.stats().total, 1);

    registry.release("idle", &dsn).unwrap();
}

#[tokio::test]
async fn expired_connections_are_replaced_up_to_the_floor() {
    let Some(dsn) = live_dsn() else { return };

    let registry = PoolRegistry::new(
        PostgresConnector,
        PoolOptions {
            max_connections: 4,
            min_connections: 2,
            max_lifetime: Duration::from_millis(400),
            reap_interval: Duration::from_millis(100),
            ..small_pool()
        },
    );
    let pool = registry.get_or_create("aged", &dsn).await.unwrap();
    let first = backend_pids(&pool, 2).await;
    assert_eq!(first.len(), 2);

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        sleep(Duration::from_millis(100)).await;
        if pool.stats().total == 2 {
            let now = backend_pids(&pool, 2).await;
            if now.is_disjoint(&first) {
                break;
            }
        }
        assert!(Instant::now() < deadline, "connections were never replaced");
    }

    registry.release("aged", &dsn).unwrap();
}

#[tokio::test]
async fn maintenance_stops_after_release() {
    let Some(dsn) = live_dsn() else { return };

    let registry = PoolRegistry::new(
        PostgresConnector,
        PoolOptions {
            reap_interval: Duration::from_millis(100),
            ..small_pool()
        },
    );
    let pool = registry.get_or_create("stop", &dsn).await.unwrap();
    assert!(!pool.is_closed());

    registry.release("stop", &dsn).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while !pool.is_closed() {
        assert!(Instant::now() < deadline, "maintenance task still running");
        sleep(Duration::from_millis(20)).await;
    }

    // nothing tops a released pool back up
    sleep(Duration::from_millis(300)).await;
    assert_eq!(pool.stats().total, 0);
    assert!(pool.get().await.is_err());
}
