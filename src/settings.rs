//! Capture settings and partial updates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CamError, Result};

pub const DEFAULT_GAIN: i64 = 50;
pub const DEFAULT_STILL_EXPOSURE_MICROS: i64 = 1_000_000;
pub const DEFAULT_STREAM_EXPOSURE_CAP_MICROS: i64 = 100_000;

/// Values applied to the camera on each mode transition.
///
/// Serialized with the HTTP field names: `exposure` is the still exposure
/// and `video_exposure` the streaming auto-exposure ceiling, both in
/// microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub gain: i64,
    #[serde(rename = "exposure")]
    pub still_exposure_micros: i64,
    #[serde(rename = "video_exposure")]
    pub stream_exposure_cap_micros: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            still_exposure_micros: DEFAULT_STILL_EXPOSURE_MICROS,
            stream_exposure_cap_micros: DEFAULT_STREAM_EXPOSURE_CAP_MICROS,
        }
    }
}

impl Settings {
    /// Reject values the camera cannot take.
    pub fn validate(&self) -> Result<()> {
        if self.gain < 0 {
            return Err(CamError::InvalidSetting {
                field: "gain",
                value: self.gain,
                reason: "must not be negative",
            });
        }
        for (field, value) in [
            ("photo_exposure", self.still_exposure_micros),
            ("video_exposure", self.stream_exposure_cap_micros),
        ] {
            if value <= 0 {
                return Err(CamError::InvalidSetting {
                    field,
                    value,
                    reason: "must be a positive number of microseconds",
                });
            }
        }
        Ok(())
    }

    /// Merge `update` over these settings and validate the result.
    pub fn merged(&self, update: &SettingsUpdate) -> Result<Self> {
        let next = Self {
            gain: update.gain.unwrap_or(self.gain),
            still_exposure_micros: update.photo_exposure.unwrap_or(self.still_exposure_micros),
            stream_exposure_cap_micros: update
                .video_exposure
                .unwrap_or(self.stream_exposure_cap_micros),
        };
        next.validate()?;
        debug!(?next, "Merged settings update");
        Ok(next)
    }
}

/// Body of `POST /camera/settings`. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SettingsUpdate {
    pub gain: Option<i64>,
    pub photo_exposure: Option<i64>,
    pub video_exposure: Option<i64>,
}

impl SettingsUpdate {
    /// Whether applying this update needs a stream restart to take effect.
    pub const fn touches_stream_controls(&self) -> bool {
        self.gain.is_some() || self.video_exposure.is_some()
    }
}
