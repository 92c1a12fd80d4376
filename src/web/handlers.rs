//! Route handlers.
//!
//! Session methods block on the camera, so every one of them runs through
//! `spawn_blocking`.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use super::AppState;
use super::mjpeg;
use super::responses::{ActionResponse, ApiError, SettingsResponse, StatusResponse};
use crate::error::{CamError, Result, ResultExt};
use crate::image_ops::{SNAPSHOT_QUALITY, encode_jpeg};
use crate::session::Session;
use crate::settings::{Settings, SettingsUpdate};

async fn blocking<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&Session) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let session = Arc::clone(&state.session);
    tokio::task::spawn_blocking(move || f(&session))
        .await
        .with_context(|| "camera task failed")?
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::from(&state.session.status()))
}

pub async fn connect(State(state): State<AppState>) -> Response {
    match blocking(&state, Session::connect).await {
        Ok(_) => ActionResponse::ok("Camera connected").into_response(),
        Err(e) => ApiError::action(&e).into_response(),
    }
}

pub async fn disconnect(State(state): State<AppState>) -> Response {
    match blocking(&state, |session| {
        session.disconnect();
        Ok(())
    })
    .await
    {
        Ok(()) => ActionResponse::ok("Camera disconnected").into_response(),
        Err(e) => ApiError::action(&e).into_response(),
    }
}

pub async fn start_stream(State(state): State<AppState>) -> Response {
    match blocking(&state, Session::start_stream).await {
        Ok(()) => ActionResponse::ok("Stream started").into_response(),
        Err(e) => ApiError::action(&e).into_response(),
    }
}

pub async fn stop_stream(State(state): State<AppState>) -> Response {
    match blocking(&state, |session| {
        session.stop_stream();
        Ok(())
    })
    .await
    {
        Ok(()) => ActionResponse::ok("Stream stopped").into_response(),
        Err(e) => ApiError::action(&e).into_response(),
    }
}

/// Capture and encode a still, pausing an active stream around it.
pub async fn snapshot(State(state): State<AppState>) -> Response {
    if !state.session.is_connected() {
        return ApiError::snapshot(&CamError::DeviceNotOpen).into_response();
    }

    let captured = blocking(&state, |session| {
        let snapshot = session.capture_snapshot()?;
        if let Some(e) = &snapshot.resume_error {
            warn!(error = %e, "Snapshot taken but stream not resumed");
        }
        encode_jpeg(&snapshot.frame, SNAPSHOT_QUALITY)
    })
    .await;

    match captured {
        Ok(jpeg) => {
            info!(bytes = jpeg.len(), "Snapshot served");
            let mut response = jpeg.into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            response
        }
        Err(e) => ApiError::snapshot(&e).into_response(),
    }
}

pub async fn stream(State(state): State<AppState>) -> Response {
    mjpeg::response(Arc::clone(&state.session), state.mjpeg_interval)
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.session.settings())
}

pub async fn update_settings(
    State(state): State<AppState>,
    body: std::result::Result<Json<SettingsUpdate>, JsonRejection>,
) -> Response {
    let update = match body {
        Ok(Json(update)) => update,
        Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
    };

    match blocking(&state, move |session| session.update_settings(&update)).await {
        Ok(settings) => Json(SettingsResponse {
            success: true,
            settings,
        })
        .into_response(),
        Err(e) => ApiError::action(&e).into_response(),
    }
}
