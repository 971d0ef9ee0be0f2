//! Opaque connection handles: `conn-<tenant>-<unix nanos>`.
//!
//! A handle names the tenant only. It does not carry the descriptor the pool
//! was created with, so anything holding just a handle cannot rebuild the
//! pool key on its own.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::PoolError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const HANDLE_PREFIX: &str = "conn";
pub const DELIMITER: char = '-';

// -----------------------------------------------------------------------------
// ----- Encode ----------------------------------------------------------------

pub fn encode(tenant: &str) -> String {
    encode_at(tenant, unix_nanos())
}

pub fn encode_at(tenant: &str, nanos: u128) -> String {
    format!("{HANDLE_PREFIX}{DELIMITER}{tenant}{DELIMITER}{nanos}")
}

// -----------------------------------------------------------------------------
// ----- Decode ----------------------------------------------------------------

/// Recover the tenant from a handle.
///
/// The tenant is whatever sits between the first and second delimiter, so a
/// tenant that itself contains `-` comes back truncated (`acme-eu` decodes to
/// `acme`). The leading segment is not checked against [`HANDLE_PREFIX`].
pub fn decode(handle: &str) -> Result<&str, PoolError> {
    let mut segments = handle.split(DELIMITER);
    let _prefix = segments.next();

    segments.next().ok_or_else(|| PoolError::invalid_handle(handle))
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
