pub mod config;
pub mod logging;

pub mod cache;
pub mod http;
pub mod idempotency;
pub mod portal;
pub mod resolver;
pub mod retry;

mod sync;
