//! Contract with the pooling library that owns real sockets.
//!
//! The registry never talks to a database itself. It asks a [`PoolConnector`]
//! to validate a descriptor and build a pool, and only ever reads stats from
//! or closes the resulting [`TenantPool`].

pub mod postgres;

use std::future::Future;
use std::time::Duration;

use crate::errors::PoolError;

pub use postgres::{PostgresConnector, PostgresPool};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_MAX_CONNECTIONS: usize = 20;
pub const DEFAULT_MIN_CONNECTIONS: usize = 5;
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(30);

// -----------------------------------------------------------------------------
// ----- PoolOptions -----------------------------------------------------------

/// Parameters every pool in the registry is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_connections: usize,
    pub min_connections: usize,
    pub max_lifetime: Duration,
    pub max_idle_time: Duration,
    pub connect_timeout: Duration,
    pub reap_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_lifetime: DEFAULT_MAX_LIFETIME,
            max_idle_time: DEFAULT_MAX_IDLE_TIME,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

impl PoolOptions {
    /// Number of connections opened up front; never more than the cap.
    pub fn warm_target(&self) -> usize {
        self.min_connections.min(self.max_connections)
    }
}

// -----------------------------------------------------------------------------
// ----- PoolStats -------------------------------------------------------------

/// Point-in-time connection counts, read straight from the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub active: u32,
    pub idle: u32,
    pub total: u32,
}

// -----------------------------------------------------------------------------
// ----- Traits ----------------------------------------------------------------

pub trait TenantPool: Send + Sync + 'static {
    fn stats(&self) -> PoolStats;

    /// Stop handing out connections and drop the idle ones.
    fn close(&self);
}

pub trait PoolConnector: Send + Sync + 'static {
    /// A validated descriptor, ready to connect with.
    type Source: Send;
    type Pool: TenantPool;

    /// Fails with [`PoolError::InvalidDataSource`]; must not touch the network.
    fn parse(&self, dsn: &str) -> Result<Self::Source, PoolError>;

    /// Fails with [`PoolError::PoolCreationFailure`].
    fn connect(
        &self,
        source: Self::Source,
        options: &PoolOptions,
    ) -> impl Future<Output = Result<Self::Pool, PoolError>> + Send;
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
