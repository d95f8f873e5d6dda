//! HTTP server with graceful shutdown

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    error::Result,
    handlers,
    middleware::rate_limit_middleware,
    state::AppState,
};

/// Server instance
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server instance
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Run the server until a shutdown signal arrives
    pub async fn serve(self) -> Result<()> {
        let config = self.state.config.clone();
        let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));

        tracing::info!("Starting {} on {}", config.service.name, addr);
        tracing::info!(
            "Rate limiting strategy: {}",
            config.rate_limit.strategy
        );

        let body_limit = config.service.body_limit_mb * 1024 * 1024;

        // First layer in the builder is outermost
        let app = self.build_router().layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().include_headers(true))
                        .on_response(DefaultOnResponse::new().include_headers(true)),
                )
                .layer(RequestBodyLimitLayer::new(body_limit))
                .layer(TimeoutLayer::with_status_code(
                    http::StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.service.timeout_secs),
                ))
                .layer(CompressionLayer::new()),
        );

        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Assemble routes: rate-limited inventory routes plus an ungated
    /// health probe
    fn build_router(&self) -> Router {
        handlers::inventory_routes()
            .route_layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                rate_limit_middleware,
            ))
            .route("/health", get(handlers::health))
            .with_state(self.state.clone())
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}
