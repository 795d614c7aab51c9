//! HTTP surface: scrape, health and device management
//!
//! ## Endpoints
//!
//! - `GET /metrics` - exposition text for every device with a reading
//! - `GET /health` - liveness, always `OK`
//! - `GET /devices` - list known devices
//! - `POST /devices` - add a device
//! - `PUT /devices/{instance}` - replace a known device

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, put},
};
use std::net::SocketAddr;
#[cfg(feature = "api")]
use tokio::{sync::oneshot, task::JoinHandle};
#[cfg(feature = "api")]
use tracing::{error, info};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:9100")
    pub bind_addr: SocketAddr,
}

/// All routes with their shared state
#[cfg(feature = "api")]
pub fn router(state: ApiState) -> Router {
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/metrics", get(routes::metrics::scrape))
        .route("/health", get(routes::health::health_check))
        .route(
            "/devices",
            get(routes::devices::list_devices).post(routes::devices::add_device),
        )
        .route("/devices/:instance", put(routes::devices::update_device))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// A running server; dropping it leaves the server running
#[cfg(feature = "api")]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[cfg(feature = "api")]
impl ApiServer {
    /// Address actually bound, useful when binding port 0
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("API server task failed: {e}");
        }
        info!("API server stopped");
    }
}

/// Spawn the API server
///
/// This binds the listener, then serves in a background task.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<ApiServer> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("API server error: {}", e);
        }
    });

    Ok(ApiServer {
        addr,
        shutdown_tx,
        task,
    })
}
