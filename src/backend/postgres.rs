use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_postgres::NoTls;
use tracing::{debug, warn};

use super::{PoolConnector, PoolOptions, PoolStats, TenantPool};
use crate::errors::PoolError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const MIN_REAP_INTERVAL: Duration = Duration::from_millis(100);

/// libpq's fallback when a descriptor names neither `host` nor `hostaddr`.
const DEFAULT_HOST: &str = "localhost";

// -----------------------------------------------------------------------------
// ----- PostgresConnector -----------------------------------------------------

/// Builds `deadpool-postgres` pools from libpq-style descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl PoolConnector for PostgresConnector {
    type Source = tokio_postgres::Config;
    type Pool = PostgresPool;

    fn parse(&self, dsn: &str) -> Result<Self::Source, PoolError> {
        let mut config = dsn
            .parse::<tokio_postgres::Config>()
            .map_err(|e| PoolError::invalid_data_source(e.to_string()))?;

        if config.get_hosts().is_empty() && config.get_hostaddrs().is_empty() {
            config.host(DEFAULT_HOST);
        }

        Ok(config)
    }

    fn connect(
        &self,
        source: Self::Source,
        options: &PoolOptions,
    ) -> impl Future<Output = Result<Self::Pool, PoolError>> + Send {
        let options = options.clone();
        async move { PostgresPool::open(source, options).await }
    }
}

// -----------------------------------------------------------------------------
// ----- PostgresPool ----------------------------------------------------------

pub struct PostgresPool {
    pool: Pool,
    maintenance: JoinHandle<()>,
}

// -----------------------------------------------------------------------------
// ----- PostgresPool: Static --------------------------------------------------

impl PostgresPool {
    async fn open(config: tokio_postgres::Config, options: PoolOptions) -> Result<Self, PoolError> {
        let manager = Manager::from_config(
            config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(options.max_connections)
            .create_timeout(Some(options.connect_timeout))
            .wait_timeout(Some(options.connect_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| PoolError::creation_failure(e.to_string()))?;

        // A descriptor that parses can still point at a dead host or carry bad
        // credentials; surface that now rather than on first use.
        if let Err(err) = warm(&pool, options.warm_target()).await {
            pool.close();
            return Err(PoolError::creation_failure(err.to_string()));
        }

        let maintenance = spawn_maintenance(pool.clone(), options);

        Ok(Self { pool, maintenance })
    }
}

// -----------------------------------------------------------------------------
// ----- PostgresPool: Public --------------------------------------------------

impl PostgresPool {
    /// Check a connection out of the pool.
    pub async fn get(&self) -> Result<Object, deadpool_postgres::PoolError> {
        self.pool.get().await
    }

    /// True once the pool is closed and its maintenance task has exited.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed() && self.maintenance.is_finished()
    }
}

// -----------------------------------------------------------------------------
// ----- PostgresPool: TenantPool ----------------------------------------------

impl TenantPool for PostgresPool {
    fn stats(&self) -> PoolStats {
        let status = self.pool.status();
        let active = status.size.saturating_sub(status.available);

        PoolStats {
            active: clamp_u32(active),
            idle: clamp_u32(status.available),
            total: clamp_u32(status.size),
        }
    }

    fn close(&self) {
        self.maintenance.abort();
        self.pool.close();
    }
}

impl fmt::Debug for PostgresPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresPool")
            .field("status", &self.pool.status())
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

impl Drop for PostgresPool {
    fn drop(&mut self) {
        // The maintenance task holds its own clone of the pool.
        self.maintenance.abort();
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

/// Check out `target` connections at once, then hand them all back idle.
async fn warm(pool: &Pool, target: usize) -> Result<(), deadpool_postgres::PoolError> {
    let mut held = Vec::with_capacity(target);
    for _ in 0..target {
        held.push(pool.get().await?);
    }
    Ok(())
}

fn spawn_maintenance(pool: Pool, options: PoolOptions) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(options.reap_interval.max(MIN_REAP_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let floor = options.warm_target();

        // First tick fires immediately; the pool was just warmed.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }

            let reaped = reap(&pool, floor, options.max_lifetime, options.max_idle_time);
            if reaped > 0 {
                debug!("reaped {reaped} expired connections");
            }

            // Checking out touches idle connections, so only do it when short.
            if pool.status().size < floor {
                if let Err(err) = warm(&pool, floor).await {
                    warn!("failed to top up pool to {floor} connections: {err}");
                }
            }
        }
    })
}

/// Drop idle connections that outlived `max_lifetime`, and those idle for
/// longer than `max_idle_time` as long as the pool stays at or above `floor`.
/// Returns how many were dropped.
fn reap(pool: &Pool, floor: usize, max_lifetime: Duration, max_idle_time: Duration) -> usize {
    let remaining = Cell::new(pool.status().size);

    let result = pool.retain(|_, metrics| {
        let expired = metrics.age() >= max_lifetime
            || (metrics.last_used() >= max_idle_time && remaining.get() > floor);

        if expired {
            remaining.set(remaining.get().saturating_sub(1));
        }
        !expired
    });

    result.removed.len()
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
