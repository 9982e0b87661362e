//! # HTTP Server
//!
//! Combines the query and observability routers into one axum app.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::observability_routes::{health_routes, observability_routes};
use super::query_routes::query_routes;
use crate::engine::SessionRegistry;
use crate::observability::{log_event_with_fields, Event};

/// How often idle sessions are swept
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// HTTP server for the progressive query API
pub struct HttpServer {
    config: HttpServerConfig,
    registry: Arc<SessionRegistry>,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, registry: Arc<SessionRegistry>) -> Self {
        let router = Self::build_router(&config, Arc::clone(&registry));
        Self {
            config,
            registry,
            router,
        }
    }

    /// Build the combined router with all endpoints
    pub fn build_router(config: &HttpServerConfig, registry: Arc<SessionRegistry>) -> Router {
        let metrics = Arc::clone(registry.engine().metrics());

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(health_routes())
            .merge(query_routes(registry))
            .nest("/observability", observability_routes(metrics))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until Ctrl-C
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address '{}': {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?.to_string();
        log_event_with_fields(Event::ServerListening, &[("addr", local.as_str())]);

        let registry = Arc::clone(&self.registry);
        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                registry.purge_expired();
            }
        });

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        result
    }
}

async fn shutdown_signal() {
    // If the handler cannot be installed, run until killed
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{QueryEngine, SessionConfig};
    use crate::source::MemorySource;

    fn registry() -> Arc<SessionRegistry> {
        let engine = QueryEngine::new(Arc::new(MemorySource::single("x", vec![1.0])), 10);
        Arc::new(SessionRegistry::new(engine, SessionConfig::default()))
    }

    #[test]
    fn test_server_creation() {
        let server = HttpServer::new(HttpServerConfig::default(), registry());
        assert_eq!(server.socket_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_router_builds_with_origin_list() {
        let config = HttpServerConfig {
            cors_origins: vec!["http://localhost:5173".to_string()],
            ..Default::default()
        };
        let _router = HttpServer::new(config, registry()).router();
    }
}
