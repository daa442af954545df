//! HTTP API
//!
//! Health, metrics and records endpoints, with per-request metrics tracking.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::ApiRouter;
pub use server::ApiServer;
