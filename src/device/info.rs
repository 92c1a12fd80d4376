//! Device information and SDK enumeration types.

use serde::Serialize;

/// Information about a connected camera, taken from the SDK property block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    /// Sensor/product name reported by the SDK
    pub name: String,
    /// SDK camera identifier (not the enumeration index)
    pub camera_id: i32,
    /// Maximum sensor width in pixels
    pub max_width: u32,
    /// Maximum sensor height in pixels
    pub max_height: u32,
    /// Colour sensor flag
    pub is_color: bool,
    /// ADC bit depth
    pub bit_depth: u32,
    /// Pixel pitch in micrometres
    pub pixel_size_um: f64,
}

impl DeviceInfo {
    /// Byte size of one full-frame RGB24 image.
    pub const fn frame_bytes(&self) -> usize {
        self.max_width as usize * self.max_height as usize * 3
    }
}

/// SDK control identifiers (`ASI_CONTROL_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(dead_code)]
pub enum ControlKind {
    Gain,
    Exposure,
    Gamma,
    WhiteBalanceRed,
    WhiteBalanceBlue,
    Offset,
    BandwidthOverload,
    Overclock,
    Temperature,
    Flip,
    AutoMaxGain,
    AutoMaxExposure,
    AutoTargetBrightness,
    HardwareBin,
    HighSpeedMode,
}

impl ControlKind {
    /// Numeric id expected by the SDK.
    pub const fn id(self) -> i32 {
        match self {
            Self::Gain => 0,
            Self::Exposure => 1,
            Self::Gamma => 2,
            Self::WhiteBalanceRed => 3,
            Self::WhiteBalanceBlue => 4,
            Self::Offset => 5,
            Self::BandwidthOverload => 6,
            Self::Overclock => 7,
            Self::Temperature => 8,
            Self::Flip => 9,
            Self::AutoMaxGain => 10,
            Self::AutoMaxExposure => 11,
            Self::AutoTargetBrightness => 12,
            Self::HardwareBin => 13,
            Self::HighSpeedMode => 14,
        }
    }

    /// Name used in logs and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::Exposure => "exposure",
            Self::Gamma => "gamma",
            Self::WhiteBalanceRed => "wb_r",
            Self::WhiteBalanceBlue => "wb_b",
            Self::Offset => "offset",
            Self::BandwidthOverload => "bandwidth_overload",
            Self::Overclock => "overclock",
            Self::Temperature => "temperature",
            Self::Flip => "flip",
            Self::AutoMaxGain => "auto_max_gain",
            Self::AutoMaxExposure => "auto_max_exposure",
            Self::AutoTargetBrightness => "auto_target_brightness",
            Self::HardwareBin => "hardware_bin",
            Self::HighSpeedMode => "high_speed_mode",
        }
    }
}

/// Still-exposure state (`ASI_EXPOSURE_STATUS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExposureStatus {
    Idle,
    Working,
    Success,
    Failed,
}

impl ExposureStatus {
    /// Map the SDK's status integer. Values outside 0..=3 are treated as
    /// failures since the exposure state can no longer be trusted.
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Working,
            2 => Self::Success,
            _ => Self::Failed,
        }
    }
}

/// Output pixel formats (`ASI_IMG_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(dead_code)]
pub enum ImageType {
    Raw8,
    Rgb24,
    Raw16,
    Y8,
}

impl ImageType {
    pub const fn id(self) -> i32 {
        match self {
            Self::Raw8 => 0,
            Self::Rgb24 => 1,
            Self::Raw16 => 2,
            Self::Y8 => 3,
        }
    }
}
