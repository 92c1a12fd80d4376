//! Observable session state.
//!
//! Tracks the operating mode, the device identity and the most recent
//! frame. Only the session mutates it; the HTTP layer reads snapshots.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use crate::device::DeviceInfo;
use crate::frame::Frame;

/// Mutually exclusive camera operating modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    Streaming,
    Capturing,
}

/// Tracked session state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Current operating mode.
    pub mode: Mode,
    /// Device properties while the camera is open.
    pub device: Option<DeviceInfo>,
    /// Most recent frame from either the stream or a snapshot.
    pub last_frame: Option<Arc<Frame>>,
    /// Message of the last failed operation, cleared on the next success.
    pub last_error: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "Mode transition");
        }
        self.mode = mode;
    }

    /// Replace the last frame. Readers holding the previous `Arc` keep it.
    pub fn record_frame(&mut self, frame: Arc<Frame>) {
        trace!(captured_at = %frame.captured_at(), "Recording frame");
        self.last_frame = Some(frame);
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Forget the device. The last frame survives, matching `lastSnapshot`
    /// staying populated after a disconnect.
    pub fn reset_device(&mut self) {
        self.mode = Mode::Idle;
        self.device = None;
    }

    /// Point-in-time copy for reporting.
    #[must_use]
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            mode: self.mode,
            connected: self.is_connected(),
            streaming: self.mode == Mode::Streaming,
            last_snapshot: self.last_frame.as_ref().map(|f| f.captured_at()),
            fault: self.last_error.clone(),
            device: self.device.clone(),
        }
    }
}

/// Summary of session state for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
    pub mode: Mode,
    pub connected: bool,
    pub streaming: bool,
    /// Capture time of the most recent frame.
    pub last_snapshot: Option<DateTime<Utc>>,
    pub fault: Option<String>,
    pub device: Option<DeviceInfo>,
}

/// Session state with thread-safe access.
///
/// Writers hold the lock only long enough to swap fields; frame buffers
/// are never copied under it.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: RwLock<SessionState>,
}

impl SharedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get read access to session state.
    pub fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get write access to session state.
    pub fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> Mode {
        self.read().mode
    }

    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.read().last_frame.clone()
    }
}
