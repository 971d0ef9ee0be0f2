use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::messages::{
    ConnectionRelease, ConnectionRequest, ConnectionResponse, ReleaseResponse, StatsRequest,
    StatsResponse,
};
use super::{Rejected, ServiceResult};
use crate::backend::PoolConnector;
use crate::handle;
use crate::registry::PoolRegistry;

// -----------------------------------------------------------------------------
// ----- ServiceFacade ---------------------------------------------------------

/// Request/response front of the registry.
///
/// Release and stats calls only know the tenant, so they address the pool
/// under a fixed descriptor (`release_dsn`) instead of the one the caller
/// created it with. A pool created under any other descriptor cannot be
/// released or inspected through this surface.
pub struct ServiceFacade<C: PoolConnector> {
    registry: Arc<PoolRegistry<C>>,
    release_dsn: SecretString,
}

// -----------------------------------------------------------------------------
// ----- ServiceFacade: Static -------------------------------------------------

impl<C: PoolConnector> ServiceFacade<C> {
    pub fn new(registry: Arc<PoolRegistry<C>>, release_dsn: SecretString) -> Self {
        Self {
            registry,
            release_dsn,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ServiceFacade: Public -------------------------------------------------

impl<C: PoolConnector> ServiceFacade<C> {
    pub fn registry(&self) -> &Arc<PoolRegistry<C>> {
        &self.registry
    }

    /// Make sure a pool exists for the tenant and mint a handle for it. No
    /// connection is checked out.
    pub async fn get_connection(
        &self,
        request: ConnectionRequest,
    ) -> ServiceResult<ConnectionResponse> {
        self.registry
            .get_or_create(&request.tenant_id, &request.dsn)
            .await
            .map_err(Rejected::<ConnectionResponse>::new)?;

        Ok(ConnectionResponse::granted(handle::encode(
            &request.tenant_id,
        )))
    }

    pub fn release_connection(&self, request: ConnectionRelease) -> ServiceResult<ReleaseResponse> {
        let tenant =
            handle::decode(&request.connection_id).map_err(Rejected::<ReleaseResponse>::new)?;

        self.registry
            .release(tenant, self.release_dsn.expose_secret())
            .map_err(Rejected::<ReleaseResponse>::new)?;

        Ok(ReleaseResponse::released())
    }

    pub fn get_pool_stats(&self, request: StatsRequest) -> ServiceResult<StatsResponse> {
        let stats = self
            .registry
            .stats(&request.tenant_id, self.release_dsn.expose_secret())
            .map_err(Rejected::<StatsResponse>::new)?;

        Ok(StatsResponse::from(stats))
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
