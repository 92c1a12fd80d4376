//! Real camera backend over the dynamically loaded ASI SDK.

use std::ffi::{c_int, c_long};
use std::path::PathBuf;

use tracing::trace;

use super::CameraSdk;
use super::info::{ControlKind, DeviceInfo, ExposureStatus, ImageType};
use super::sdk::{AsiCameraInfo, AsiSdk};
use crate::error::{AsiCode, CamError, Result};

/// [`CameraSdk`] backed by `libASICamera2`.
///
/// A backend whose library failed to load is still constructible so the
/// service can start; every call then reports [`CamError::SdkUnavailable`].
pub struct AsiCamera {
    sdk: std::result::Result<AsiSdk, String>,
}

impl AsiCamera {
    /// Search `candidates` for the SDK, remembering the failure if none load.
    pub fn discover(candidates: &[PathBuf]) -> Self {
        Self {
            sdk: AsiSdk::discover(candidates).map_err(|e| e.to_string()),
        }
    }

    /// Whether a library was loaded.
    pub fn is_loaded(&self) -> bool {
        self.sdk.is_ok()
    }

    fn sdk(&self) -> Result<&AsiSdk> {
        self.sdk
            .as_ref()
            .map_err(|reason| CamError::SdkUnavailable(reason.clone()))
    }
}

fn check(rc: c_int) -> Result<()> {
    AsiCode::check(rc).map_err(CamError::Sdk)
}

impl CameraSdk for AsiCamera {
    fn connected_cameras(&self) -> Result<usize> {
        let count = self.sdk()?.num_connected();
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn camera_property(&self, index: usize) -> Result<DeviceInfo> {
        let sdk = self.sdk()?;
        let mut raw = AsiCameraInfo::zeroed();
        check(sdk.property(index as c_int, &mut raw))?;
        Ok(DeviceInfo {
            name: raw.name(),
            camera_id: raw.camera_id,
            max_width: u32::try_from(raw.max_width).unwrap_or(0),
            max_height: u32::try_from(raw.max_height).unwrap_or(0),
            is_color: raw.is_color_cam != 0,
            bit_depth: u32::try_from(raw.bit_depth).unwrap_or(0),
            pixel_size_um: raw.pixel_size,
        })
    }

    fn open_camera(&self, camera_id: i32) -> Result<()> {
        check(self.sdk()?.open(camera_id))
    }

    fn init_camera(&self, camera_id: i32) -> Result<()> {
        check(self.sdk()?.init(camera_id))
    }

    fn close_camera(&self, camera_id: i32) -> Result<()> {
        check(self.sdk()?.close(camera_id))
    }

    fn set_roi_format(
        &self,
        camera_id: i32,
        width: u32,
        height: u32,
        bin: u32,
        format: ImageType,
    ) -> Result<()> {
        check(self.sdk()?.roi_format(
            camera_id,
            width as c_int,
            height as c_int,
            bin as c_int,
            format.id(),
        ))
    }

    fn set_control_value(
        &self,
        camera_id: i32,
        control: ControlKind,
        value: i64,
        auto: bool,
    ) -> Result<()> {
        trace!(control = control.name(), value, auto, "ASISetControlValue");
        let value = control_arg(control, value)?;
        check(
            self.sdk()?
                .set_control(camera_id, control.id(), value, c_int::from(auto)),
        )
    }

    fn get_control_value(&self, camera_id: i32, control: ControlKind) -> Result<(i64, bool)> {
        let (rc, value, auto) = self.sdk()?.get_control(camera_id, control.id());
        check(rc)?;
        Ok((i64::from(value), auto != 0))
    }

    fn start_video_capture(&self, camera_id: i32) -> Result<()> {
        check(self.sdk()?.start_video(camera_id))
    }

    fn stop_video_capture(&self, camera_id: i32) -> Result<()> {
        check(self.sdk()?.stop_video(camera_id))
    }

    fn get_video_data(&self, camera_id: i32, buffer: &mut [u8], wait_ms: u32) -> Result<()> {
        let wait = c_int::try_from(wait_ms).unwrap_or(c_int::MAX);
        check(self.sdk()?.video_data(camera_id, buffer, wait))
    }

    fn start_exposure(&self, camera_id: i32, dark: bool) -> Result<()> {
        check(self.sdk()?.begin_exposure(camera_id, c_int::from(dark)))
    }

    fn stop_exposure(&self, camera_id: i32) -> Result<()> {
        check(self.sdk()?.abort_exposure(camera_id))
    }

    fn exposure_status(&self, camera_id: i32) -> Result<ExposureStatus> {
        let (rc, status) = self.sdk()?.exposure_status(camera_id);
        check(rc)?;
        Ok(ExposureStatus::from_raw(status))
    }

    fn get_data_after_exposure(&self, camera_id: i32, buffer: &mut [u8]) -> Result<()> {
        check(self.sdk()?.exposure_data(camera_id, buffer))
    }
}

/// `c_long` is 32 bits on Windows, so large values must be rejected rather
/// than truncated.
fn control_arg(control: ControlKind, value: i64) -> Result<c_long> {
    c_long::try_from(value).map_err(|_| CamError::InvalidSetting {
        field: control.name(),
        value,
        reason: "out of range for the camera SDK",
    })
}
