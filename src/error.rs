//! Error types for camera service operations.

use std::fmt;

use thiserror::Error;

/// Result code returned by the vendor camera SDK.
///
/// Every integer the SDK can hand back is folded into one of these kinds
/// through [`AsiCode::from_raw`]; integers outside the table are kept as
/// [`AsiCode::Unknown`] so diagnostics still show the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsiCode {
    InvalidIndex,
    InvalidId,
    InvalidControlType,
    CameraClosed,
    CameraRemoved,
    InvalidPath,
    InvalidFileFormat,
    InvalidSize,
    InvalidImageType,
    OutOfBoundary,
    Timeout,
    InvalidSequence,
    BufferTooSmall,
    VideoModeActive,
    ExposureInProgress,
    GeneralError,
    InvalidMode,
    Unknown(i32),
}

/// `(raw code, kind, SDK constant name)` for every documented failure code.
/// Code 0 is `ASI_SUCCESS` and never becomes an `AsiCode`.
const CODE_TABLE: &[(i32, AsiCode, &str)] = &[
    (1, AsiCode::InvalidIndex, "ASI_ERROR_INVALID_INDEX"),
    (2, AsiCode::InvalidId, "ASI_ERROR_INVALID_ID"),
    (3, AsiCode::InvalidControlType, "ASI_ERROR_INVALID_CONTROL_TYPE"),
    (4, AsiCode::CameraClosed, "ASI_ERROR_CAMERA_CLOSED"),
    (5, AsiCode::CameraRemoved, "ASI_ERROR_CAMERA_REMOVED"),
    (6, AsiCode::InvalidPath, "ASI_ERROR_INVALID_PATH"),
    (7, AsiCode::InvalidFileFormat, "ASI_ERROR_INVALID_FILEFORMAT"),
    (8, AsiCode::InvalidSize, "ASI_ERROR_INVALID_SIZE"),
    (9, AsiCode::InvalidImageType, "ASI_ERROR_INVALID_IMGTYPE"),
    (10, AsiCode::OutOfBoundary, "ASI_ERROR_OUTOF_BOUNDARY"),
    (11, AsiCode::Timeout, "ASI_ERROR_TIMEOUT"),
    (12, AsiCode::InvalidSequence, "ASI_ERROR_INVALID_SEQUENCE"),
    (13, AsiCode::BufferTooSmall, "ASI_ERROR_BUFFER_TOO_SMALL"),
    (14, AsiCode::VideoModeActive, "ASI_ERROR_VIDEO_MODE_ACTIVE"),
    (15, AsiCode::ExposureInProgress, "ASI_ERROR_EXPOSURE_IN_PROGRESS"),
    (16, AsiCode::GeneralError, "ASI_ERROR_GENERAL_ERROR"),
    (17, AsiCode::InvalidMode, "ASI_ERROR_INVALID_MODE"),
];

impl AsiCode {
    /// Map a raw SDK return value. Returns `None` for `ASI_SUCCESS` (0).
    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        Some(
            CODE_TABLE
                .iter()
                .find(|(code, _, _)| *code == raw)
                .map_or(Self::Unknown(raw), |(_, kind, _)| *kind),
        )
    }

    /// Convert a raw SDK return value into a `Result`.
    pub fn check(raw: i32) -> std::result::Result<(), Self> {
        Self::from_raw(raw).map_or(Ok(()), Err)
    }

    /// The raw integer the SDK uses for this code.
    pub fn raw(self) -> i32 {
        match self {
            Self::Unknown(raw) => raw,
            kind => CODE_TABLE
                .iter()
                .find(|(_, k, _)| *k == kind)
                .map_or(-1, |(code, _, _)| *code),
        }
    }

    /// SDK constant name, or `None` for codes outside the table.
    pub fn name(self) -> Option<&'static str> {
        CODE_TABLE
            .iter()
            .find(|(_, k, _)| *k == self)
            .map(|(_, _, name)| *name)
    }

    /// True when the camera is gone and only a reconnect can help.
    pub const fn is_disconnect(self) -> bool {
        matches!(self, Self::CameraClosed | Self::CameraRemoved)
    }
}

impl fmt::Display for AsiCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.raw()),
            None => write!(f, "UNKNOWN_ERROR_{}", self.raw()),
        }
    }
}

/// Primary error type for camera operations.
#[derive(Error, Debug)]
pub enum CamError {
    // Connection errors
    #[error("No cameras found")]
    NoDeviceFound,

    #[error("Failed to get camera properties: {0}")]
    PropertyQueryFailed(AsiCode),

    #[error("Failed to open camera: {0}")]
    DeviceOpenFailed(AsiCode),

    #[error("Failed to initialize camera: {0}")]
    DeviceInitFailed(AsiCode),

    #[error("Camera not connected")]
    DeviceNotOpen,

    #[error("Camera SDK unavailable: {0}")]
    SdkUnavailable(String),

    // Streaming errors
    #[error("Failed to start video capture: {0}")]
    StartVideoFailed(AsiCode),

    #[error("Timed out waiting for a video frame")]
    Timeout,

    #[error("Failed to read video frame: {0}")]
    VideoReadFailed(AsiCode),

    #[error("Failed to stop video capture: {0}")]
    StopVideoFailed(AsiCode),

    // Still capture errors
    #[error("Failed to start exposure: {0}")]
    ExposureStartFailed(AsiCode),

    #[error("Exposure failed: {reason}")]
    ExposureFailed { reason: String },

    #[error("Failed to read exposure status: {0}")]
    ExposureStatusFailed(AsiCode),

    #[error("Failed to stop exposure: {0}")]
    ExposureStopFailed(AsiCode),

    #[error("Failed to get image data: {0}")]
    DataFetchFailed(AsiCode),

    // Control errors
    #[error("Failed to {action} control {control}: {code}")]
    ControlFailed {
        action: &'static str,
        control: &'static str,
        code: AsiCode,
    },

    #[error("Unknown device error: {0}")]
    UnknownDeviceError(AsiCode),

    /// A raw SDK failure that has not yet been given operation context.
    #[error("Camera SDK error: {0}")]
    Sdk(AsiCode),

    // Input errors
    #[error("Invalid setting {field}={value}: {reason}")]
    InvalidSetting {
        field: &'static str,
        value: i64,
        reason: &'static str,
    },

    // Output errors
    #[error("Image encoding failed: {0}")]
    ImageEncoding(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Web server failed to start on {addr}: {reason}")]
    WebServerFailed { addr: String, reason: String },

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl CamError {
    /// The SDK code behind this error, if any.
    pub const fn code(&self) -> Option<AsiCode> {
        match self {
            Self::PropertyQueryFailed(code)
            | Self::DeviceOpenFailed(code)
            | Self::DeviceInitFailed(code)
            | Self::StartVideoFailed(code)
            | Self::VideoReadFailed(code)
            | Self::StopVideoFailed(code)
            | Self::ExposureStartFailed(code)
            | Self::ExposureStatusFailed(code)
            | Self::ExposureStopFailed(code)
            | Self::DataFetchFailed(code)
            | Self::UnknownDeviceError(code)
            | Self::Sdk(code)
            | Self::ControlFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoDeviceFound
                | Self::DeviceNotOpen
                | Self::SdkUnavailable(_)
                | Self::InvalidSetting { .. }
                | Self::Config(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoDeviceFound => Some("Ensure the camera is connected via USB"),
            Self::DeviceNotOpen => Some("POST /camera/connect first"),
            Self::SdkUnavailable(_) => {
                Some("Install libASICamera2 or pass --sdk-lib <PATH> (or set ASI_SDK_LIB)")
            }
            _ if self.code().is_some_and(AsiCode::is_disconnect) => {
                Some("Reconnect the camera and POST /camera/connect")
            }
            _ => None,
        }
    }

    /// Re-wrap a raw [`CamError::Sdk`] failure with operation context.
    ///
    /// Other variants pass through untouched, and unknown codes always
    /// surface as [`CamError::UnknownDeviceError`].
    pub fn in_context(self, wrap: fn(AsiCode) -> Self) -> Self {
        match self {
            Self::Sdk(code @ AsiCode::Unknown(_)) => Self::UnknownDeviceError(code),
            Self::Sdk(code) => wrap(code),
            other => other,
        }
    }
}

impl From<AsiCode> for CamError {
    fn from(code: AsiCode) -> Self {
        Self::Sdk(code)
    }
}

/// Convenience type alias for Results using CamError.
pub type Result<T> = std::result::Result<T, CamError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CamError::Other(format!("{}: {e}", f().into())))
    }
}
