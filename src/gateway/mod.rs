//! Gateway server implementation

pub mod auth;
pub mod exposure;
pub mod logs;
pub mod metrics;
pub mod rate_limit;
mod router;
mod server;

pub use exposure::ExposureMap;
pub use logs::{LogBuffer, LogEntry};
pub use server::{Gateway, GatewayStatus};
