use std::fmt;

// -----------------------------------------------------------------------------
// ----- PoolKey ---------------------------------------------------------------

/// (tenant, descriptor). Compared byte for byte; nothing is normalized.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    tenant: String,
    dsn: String,
}

impl PoolKey {
    pub fn new(tenant: &str, dsn: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            dsn: dsn.to_string(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }
}

// Descriptors carry passwords; keep them out of logs.
impl fmt::Debug for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolKey")
            .field("tenant", &self.tenant)
            .field("dsn", &"<redacted>")
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
