pub mod backend;
pub mod config;
pub mod errors;
pub mod handle;
pub mod registry;
pub mod server;
pub mod service;

pub use backend::{PoolConnector, PoolOptions, PoolStats, PostgresConnector, TenantPool};
pub use config::Config;
pub use errors::PoolError;
pub use registry::{PoolKey, PoolRegistry};
pub use server::Server;
pub use service::{Rejected, ServiceFacade};
