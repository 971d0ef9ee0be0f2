use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- PoolError -------------------------------------------------------------

/// Every failure the registry, the handle codec and the façade can report.
///
/// Messages never include the data-source descriptor; it carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("invalid data source: {reason}")]
    InvalidDataSource { reason: String },

    #[error("failed to create connection pool: {reason}")]
    PoolCreationFailure { reason: String },

    #[error("pool not found for tenant {tenant}")]
    PoolNotFound { tenant: String },

    #[error("invalid connection handle '{handle}'")]
    InvalidHandleFormat { handle: String },
}

// -----------------------------------------------------------------------------
// ----- PoolError: Static -----------------------------------------------------

impl PoolError {
    pub fn invalid_data_source(reason: impl Into<String>) -> Self {
        Self::InvalidDataSource {
            reason: reason.into(),
        }
    }

    pub fn creation_failure(reason: impl Into<String>) -> Self {
        Self::PoolCreationFailure {
            reason: reason.into(),
        }
    }

    pub fn pool_not_found(tenant: impl Into<String>) -> Self {
        Self::PoolNotFound {
            tenant: tenant.into(),
        }
    }

    pub fn invalid_handle(handle: impl Into<String>) -> Self {
        Self::InvalidHandleFormat {
            handle: handle.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- PoolError: Public -----------------------------------------------------

impl PoolError {
    /// Stable machine-readable code, sent next to the message on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            PoolError::InvalidDataSource { .. } => "invalid_data_source",
            PoolError::PoolCreationFailure { .. } => "pool_creation_failure",
            PoolError::PoolNotFound { .. } => "pool_not_found",
            PoolError::InvalidHandleFormat { .. } => "invalid_handle_format",
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
