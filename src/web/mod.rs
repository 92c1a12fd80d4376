//! HTTP API.
//!
//! ## Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/status` | camera status JSON |
//! | POST | `/camera/connect` | `{success, message}` |
//! | POST | `/camera/disconnect` | `{success, message}` |
//! | POST | `/camera/stream/start` | `{success, message}` |
//! | POST | `/camera/stream/stop` | `{success, message}` |
//! | GET | `/camera/snapshot` | `image/jpeg` or `{error}` |
//! | GET | `/camera/stream` | `multipart/x-mixed-replace` MJPEG |
//! | GET | `/camera/settings` | `{gain, exposure, video_exposure}` |
//! | POST | `/camera/settings` | `{success, gain, exposure, video_exposure}` |

mod handlers;
pub mod mjpeg;
mod responses;

pub use responses::{ActionResponse, ApiError, CameraStatus, SettingsResponse, StatusResponse};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{CamError, Result};
use crate::session::Session;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    /// Delay between MJPEG parts.
    pub mjpeg_interval: Duration,
}

impl AppState {
    pub fn new(session: Arc<Session>, mjpeg_interval: Duration) -> Self {
        Self {
            session,
            mjpeg_interval,
        }
    }
}

/// Create the API router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/camera/connect", post(handlers::connect))
        .route("/camera/disconnect", post(handlers::disconnect))
        .route("/camera/stream/start", post(handlers::start_stream))
        .route("/camera/stream/stop", post(handlers::stop_stream))
        .route("/camera/snapshot", get(handlers::snapshot))
        .route("/camera/stream", get(handlers::stream))
        .route(
            "/camera/settings",
            get(handlers::get_settings).post(handlers::update_settings),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CamError::WebServerFailed {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server stopped");
    Ok(())
}
