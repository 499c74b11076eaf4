use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{any, get};
use axum::{middleware, Router};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::gateway::Gateway;
use crate::handlers::{analyze_image, health_check, hello, not_found, AppState};
use crate::middleware::security_headers;
use crate::vision::{AzureVisionClient, ImageAnalyzer};

/// Assemble the router around a gateway built from `config` and the given
/// analysis collaborator. Split out from [`Server`] so tests can drive the
/// full stack with a mock analyzer.
pub fn create_app(config: &Config, analyzer: Arc<dyn ImageAnalyzer>) -> Router {
    let gateway = Arc::new(Gateway::new(config, analyzer, Arc::new(SystemClock)));
    let state = AppState {
        gateway,
        max_request_bytes: config.max_request_bytes as usize,
        max_request_mb: config.max_request_mb(),
    };

    Router::new()
        // Registered for every method so the validator's method rule, not
        // the router, produces the 405 body.
        .route("/api/analyzeImage", any(analyze_image))
        .route("/hello/:string", get(hello))
        .route("/health", get(health_check))
        .fallback(not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config))
                .layer(middleware::from_fn(security_headers)),
        )
}

/// Browser-facing CORS policy mirroring the origin gate's allow-list. The
/// gate itself remains the enforcement point; this layer only answers
/// preflights for the allowed origins.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let analyzer = Arc::new(AzureVisionClient::new(&config)?);
        Ok(Self {
            app: create_app(&config, analyzer),
            bind_addr: config.bind_addr,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("vision-gate listening on {}", self.bind_addr);
        tracing::info!("Health check available at /health");

        // Run server with graceful shutdown
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
