//! JSON bodies and the error response type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::error::CamError;
use crate::settings::Settings;
use crate::state::StateSummary;

/// `{success, message}` returned by the POST actions.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// One camera entry of `GET /status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    pub connected: bool,
    pub streaming: bool,
    pub last_snapshot: Option<DateTime<Utc>>,
    pub fault: Option<String>,
}

impl From<&StateSummary> for CameraStatus {
    fn from(summary: &StateSummary) -> Self {
        Self {
            connected: summary.connected,
            streaming: summary.streaming,
            last_snapshot: summary.last_snapshot,
            fault: summary.fault.clone(),
        }
    }
}

/// `sensors` block of `GET /status`.
///
/// Both camera slots report the single attached camera. This controller has
/// no environment sensors, so `temperature` and `humidity` are always null.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensors {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub weather_cam: CameraStatus,
    pub meteor_cam: CameraStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub sensors: Sensors,
}

impl From<&StateSummary> for StatusResponse {
    fn from(summary: &StateSummary) -> Self {
        Self {
            sensors: Sensors {
                temperature: None,
                humidity: None,
                weather_cam: CameraStatus::from(summary),
                meteor_cam: CameraStatus::from(summary),
            },
        }
    }
}

/// Body of a successful `POST /camera/settings`.
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `{success: false, message}`
    Action,
    /// `{error}`
    Snapshot,
}

/// Failure response. Camera failures are always HTTP 500.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    shape: Shape,
    message: String,
}

impl ApiError {
    /// Failure of a POST action.
    pub fn action(err: &CamError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            shape: Shape::Action,
            message: err.to_string(),
        }
    }

    /// Failure of `GET /camera/snapshot`.
    pub fn snapshot(err: &CamError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            shape: Shape::Snapshot,
            message: err.to_string(),
        }
    }

    /// Malformed request body.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            shape: Shape::Action,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = self.status.as_u16(), message = %self.message, "Request failed");
        let body = match self.shape {
            Shape::Action => json!({ "success": false, "message": self.message }),
            Shape::Snapshot => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}
