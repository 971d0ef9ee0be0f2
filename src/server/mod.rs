//! Line-oriented TCP transport: one JSON request per line in, one JSON reply
//! per line out.

mod client;
pub mod frame;
pub mod listener;

pub use frame::{Reply, ReplyBody, Request, WireError};
pub use listener::Server;
