//! HTTP surface for cohortq
//!
//! One streaming query endpoint plus a health check, served by axum.

mod config;
mod query_routes;
mod server;

pub use config::HttpServerConfig;
pub use query_routes::{query_routes, ErrorResponse, QueryState};
pub use server::HttpServer;
