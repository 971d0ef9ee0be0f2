use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use secrecy::SecretString;
use tokio::{sync::Notify, time::sleep};

use tenantpool::{
    PoolConnector, PoolError, PoolOptions, PoolRegistry, PoolStats, ServiceFacade, TenantPool,
};

#[allow(dead_code)]
pub const RELEASE_DSN: &str = "host=registry.test user=admin dbname=tenant_registry";

// -----------------------------------------------------------------------------
// ----- ScriptedConnector -----------------------------------------------------

/// In-memory stand-in for the pooling library.
///
/// Descriptors without an `=` fail to parse. A descriptor containing `hold`
/// blocks in `connect` until [`ScriptedConnector::open_gate`] is called.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    connects: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
    gate: Notify,
}

impl ScriptedConnector {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// The next `n` constructions fail with `PoolCreationFailure`.
    #[allow(dead_code)]
    pub fn failing(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn open_gate(&self) {
        self.gate.notify_one();
    }
}

impl PoolConnector for ScriptedConnector {
    type Source = String;
    type Pool = ScriptedPool;

    fn parse(&self, dsn: &str) -> Result<Self::Source, PoolError> {
        if !dsn.contains('=') {
            return Err(PoolError::invalid_data_source(
                "expected key=value pairs",
            ));
        }
        Ok(dsn.to_string())
    }

    fn connect(
        &self,
        source: Self::Source,
        options: &PoolOptions,
    ) -> impl Future<Output = Result<Self::Pool, PoolError>> + Send {
        let warm = options.warm_target() as u32;

        async move {
            let serial = self.connects.fetch_add(1, Ordering::SeqCst);

            if source.contains("hold") {
                self.gate.notified().await;
            }
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }

            let fail = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if fail {
                return Err(PoolError::creation_failure("connection refused"));
            }

            Ok(ScriptedPool {
                serial,
                closed: AtomicBool::new(false),
                warm,
            })
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ScriptedPool ----------------------------------------------------------

#[derive(Debug)]
pub struct ScriptedPool {
    pub serial: usize,
    closed: AtomicBool,
    warm: u32,
}

impl ScriptedPool {
    #[allow(dead_code)]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl TenantPool for ScriptedPool {
    fn stats(&self) -> PoolStats {
        PoolStats {
            active: 0,
            idle: self.warm,
            total: self.warm,
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// -----------------------------------------------------------------------------
// ----- Builders --------------------------------------------------------------

#[allow(dead_code)]
pub fn registry(connector: ScriptedConnector) -> Arc<PoolRegistry<ScriptedConnector>> {
    Arc::new(PoolRegistry::new(connector, PoolOptions::default()))
}

#[allow(dead_code)]
pub fn facade(
    registry: Arc<PoolRegistry<ScriptedConnector>>,
) -> Arc<ServiceFacade<ScriptedConnector>> {
    Arc::new(ServiceFacade::new(
        registry,
        SecretString::new(RELEASE_DSN.into()),
    ))
}

/// Poll until `cond` holds, or panic after ~2s.
#[allow(dead_code)]
pub async fn eventually(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
