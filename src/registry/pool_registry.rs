use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::key::PoolKey;
use crate::backend::{PoolConnector, PoolOptions, PoolStats, TenantPool};
use crate::errors::PoolError;

// -----------------------------------------------------------------------------
// ----- Slot ------------------------------------------------------------------

/// One per key. Empty while the first construction is in flight; the cell
/// guarantees only one construction runs at a time for that key.
struct Slot<P> {
    cell: OnceCell<Arc<P>>,

    /// `get_or_create` calls currently holding the slot. Only changed under
    /// the map lock.
    waiters: AtomicUsize,
}

impl<P> Slot<P> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    fn pool(&self) -> Option<Arc<P>> {
        self.cell.get().cloned()
    }

    fn is_built(&self) -> bool {
        self.cell.initialized()
    }
}

// -----------------------------------------------------------------------------
// ----- PoolRegistry ----------------------------------------------------------

/// Lazily built pools, at most one per (tenant, descriptor).
///
/// The map lock is only held for lookups and inserts, never across a
/// construction, so a slow backend for one tenant does not stall the others.
pub struct PoolRegistry<C: PoolConnector> {
    connector: C,
    options: PoolOptions,
    slots: Mutex<HashMap<PoolKey, Arc<Slot<C::Pool>>>>,
}

// -----------------------------------------------------------------------------
// ----- PoolRegistry: Static --------------------------------------------------

impl<C: PoolConnector> PoolRegistry<C> {
    pub fn new(connector: C, options: PoolOptions) -> Self {
        Self {
            connector,
            options,
            slots: Mutex::new(HashMap::new()),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- PoolRegistry: Public --------------------------------------------------

impl<C: PoolConnector> PoolRegistry<C> {
    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Return the live pool for the key, building it on first use.
    ///
    /// Concurrent first calls for one key share a single construction. If it
    /// fails, every waiter that has not started its own attempt yet retries in
    /// turn, and the key is left with no pool once nobody is waiting. The same
    /// holds when the callers are dropped mid-construction.
    pub async fn get_or_create(&self, tenant: &str, dsn: &str) -> Result<Arc<C::Pool>, PoolError> {
        let key = PoolKey::new(tenant, dsn);

        if let Some(pool) = self.live(&key) {
            return Ok(pool);
        }

        let source = self.connector.parse(dsn)?;
        let slot = SlotGuard {
            slot: self.join_slot(&key),
            registry: self,
            key,
        };

        let created = slot
            .slot
            .cell
            .get_or_try_init(|| async {
                let pool = self.connector.connect(source, &self.options).await?;
                info!(tenant, "created connection pool");
                Ok::<_, PoolError>(Arc::new(pool))
            })
            .await
            .cloned();

        if let Err(err) = &created {
            warn!(tenant, "connection pool construction failed: {err}");
        }

        created
    }

    /// Close the pool for the key and forget it.
    pub fn release(&self, tenant: &str, dsn: &str) -> Result<(), PoolError> {
        let key = PoolKey::new(tenant, dsn);

        let pool = {
            let mut slots = self.slots.lock();
            let pool = slots
                .get(&key)
                .and_then(|slot| slot.pool())
                .ok_or_else(|| PoolError::pool_not_found(tenant))?;
            slots.remove(&key);
            pool
        };

        pool.close();
        info!(tenant, "released connection pool");
        Ok(())
    }

    pub fn stats(&self, tenant: &str, dsn: &str) -> Result<PoolStats, PoolError> {
        let key = PoolKey::new(tenant, dsn);

        let pool = self
            .live(&key)
            .ok_or_else(|| PoolError::pool_not_found(tenant))?;

        Ok(pool.stats())
    }

    /// Number of fully built pools. In-flight constructions do not count.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.is_built())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every built pool and drop it from the map. Returns how many
    /// were closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<(PoolKey, Arc<C::Pool>)> = {
            let mut slots = self.slots.lock();
            let keys: Vec<PoolKey> = slots
                .iter()
                .filter(|(_, slot)| slot.is_built())
                .map(|(key, _)| key.clone())
                .collect();

            keys.into_iter()
                .filter_map(|key| {
                    let pool = slots.remove(&key)?.pool()?;
                    Some((key, pool))
                })
                .collect()
        };

        for (key, pool) in &drained {
            pool.close();
            info!(tenant = key.tenant(), "released connection pool");
        }

        drained.len()
    }
}

// -----------------------------------------------------------------------------
// ----- PoolRegistry: Private -------------------------------------------------

impl<C: PoolConnector> PoolRegistry<C> {
    fn live(&self, key: &PoolKey) -> Option<Arc<C::Pool>> {
        self.slots.lock().get(key).and_then(|slot| slot.pool())
    }

    /// Fetch or insert the slot for `key` and register the caller as a waiter.
    fn join_slot(&self, key: &PoolKey) -> Arc<Slot<C::Pool>> {
        let mut slots = self.slots.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::new()));
        slot.waiters.fetch_add(1, Ordering::Relaxed);
        slot.clone()
    }

    /// Unregister the caller from `held`, and drop it from the map if it is
    /// still empty and nobody else is waiting on it.
    fn leave_slot(&self, key: &PoolKey, held: &Arc<Slot<C::Pool>>) {
        let mut slots = self.slots.lock();
        let left = held.waiters.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);

        let vacant = left == 0
            && !held.is_built()
            && slots.get(key).is_some_and(|slot| Arc::ptr_eq(slot, held));

        if vacant {
            slots.remove(key);
        }
    }
}

// -----------------------------------------------------------------------------
// ----- SlotGuard -------------------------------------------------------------

/// Holds a slot for one `get_or_create` call. On drop, whether the call
/// finished or was cancelled, the slot is pruned if it is empty and no other
/// caller is waiting on it.
struct SlotGuard<'a, C: PoolConnector> {
    registry: &'a PoolRegistry<C>,
    key: PoolKey,
    slot: Arc<Slot<C::Pool>>,
}

impl<C: PoolConnector> Drop for SlotGuard<'_, C> {
    fn drop(&mut self) {
        self.registry.leave_slot(&self.key, &self.slot);
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
