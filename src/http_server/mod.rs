//! # HTTP Server Module
//!
//! Serving layer for the progressive query engine.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/start`, `/refine` - Drive a progressive query
//! - `/estimate`, `/history` - Read the current answer and its trace
//! - `/sessions` - Create and close sessions
//! - `/observability/metrics` - Counters

pub mod config;
pub mod errors;
pub mod observability_routes;
pub mod query_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use query_routes::SESSION_HEADER;
pub use server::HttpServer;
