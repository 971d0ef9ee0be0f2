pub mod facade;
pub mod messages;

use std::{error::Error, fmt};

use crate::errors::PoolError;

pub use facade::ServiceFacade;
pub use messages::{
    ConnectionRelease, ConnectionRequest, ConnectionResponse, Failed, ReleaseResponse,
    StatsRequest, StatsResponse,
};

// -----------------------------------------------------------------------------
// ----- Rejected --------------------------------------------------------------

/// A failed call, reported on both channels at once: `response` carries the
/// error text in its payload and `error` is the failure itself. The two
/// always describe the same thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected<T> {
    pub response: T,
    pub error: PoolError,
}

impl<T: Failed> Rejected<T> {
    pub fn new(error: PoolError) -> Self {
        Self {
            response: T::failed(&error),
            error,
        }
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: fmt::Debug> Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

pub type ServiceResult<T> = Result<T, Rejected<T>>;
