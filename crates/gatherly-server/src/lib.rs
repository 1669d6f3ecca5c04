//! HTTP server for the Gatherly registration service.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use observability::{init_tracing, shutdown_tracing};
pub use server::{GatherlyServer, ServerBuilder, build_app};
pub use state::AppState;
