pub mod key;
pub mod pool_registry;

pub use key::PoolKey;
pub use pool_registry::PoolRegistry;
