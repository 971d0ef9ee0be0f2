use serde::{Deserialize, Serialize};

use crate::backend::PoolStats;
use crate::errors::PoolError;

// -----------------------------------------------------------------------------
// ----- Requests --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub tenant_id: String,
    pub dsn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRelease {
    pub connection_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRequest {
    pub tenant_id: String,
}

// -----------------------------------------------------------------------------
// ----- Responses -------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionResponse {
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub active_connections: u32,
    #[serde(default)]
    pub idle_connections: u32,
    #[serde(default)]
    pub total_connections: u32,
    #[serde(default)]
    pub error: String,
}

// -----------------------------------------------------------------------------
// ----- Responses: Static -----------------------------------------------------

impl ConnectionResponse {
    pub fn granted(connection_id: String) -> Self {
        Self {
            connection_id,
            error: String::new(),
        }
    }
}

impl ReleaseResponse {
    pub fn released() -> Self {
        Self {
            success: true,
            error: String::new(),
        }
    }
}

impl From<PoolStats> for StatsResponse {
    fn from(stats: PoolStats) -> Self {
        Self {
            active_connections: stats.active,
            idle_connections: stats.idle,
            total_connections: stats.total,
            error: String::new(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Failed ----------------------------------------------------------------

/// A response that only carries the error text; every other field is zeroed.
pub trait Failed: Default {
    fn failed(error: &PoolError) -> Self;
}

impl Failed for ConnectionResponse {
    fn failed(error: &PoolError) -> Self {
        Self {
            error: error.to_string(),
            ..Default::default()
        }
    }
}

impl Failed for ReleaseResponse {
    fn failed(error: &PoolError) -> Self {
        Self {
            error: error.to_string(),
            ..Default::default()
        }
    }
}

impl Failed for StatsResponse {
    fn failed(error: &PoolError) -> Self {
        Self {
            error: error.to_string(),
            ..Default::default()
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
