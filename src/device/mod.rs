//! Device abstraction layer for ASI cameras.
//!
//! [`CameraSdk`] is the thin seam over the vendor SDK's per-camera
//! primitives; it has a real implementation backed by the dynamically
//! loaded library and a mock one for tests. [`DeviceHandle`] sits on top
//! and owns the open/closed lifecycle plus the mapping from raw SDK codes
//! to named [`CamError`](crate::error::CamError) kinds.

mod handle;
mod info;
pub mod mock;
mod real;
mod sdk;

pub use handle::{DeviceHandle, OpenOptions};
pub use info::{ControlKind, DeviceInfo, ExposureStatus, ImageType};
pub use real::AsiCamera;
pub use sdk::{AsiSdk, default_library_paths};

use std::sync::Arc;

use crate::error::Result;

/// Raw camera SDK operations.
///
/// Every call is synchronous and may block (video reads up to their
/// timeout). Failures come back as [`CamError::Sdk`] carrying the mapped
/// result code, or [`CamError::SdkUnavailable`] when no library is loaded.
/// Implementations are not required to be safe against concurrent calls on
/// the same camera; callers serialize access.
///
/// [`CamError::Sdk`]: crate::error::CamError::Sdk
/// [`CamError::SdkUnavailable`]: crate::error::CamError::SdkUnavailable
pub trait CameraSdk: Send + Sync {
    /// Number of cameras currently attached.
    fn connected_cameras(&self) -> Result<usize>;

    /// Property block of the camera at enumeration `index`.
    fn camera_property(&self, index: usize) -> Result<DeviceInfo>;

    fn open_camera(&self, camera_id: i32) -> Result<()>;

    fn init_camera(&self, camera_id: i32) -> Result<()>;

    fn close_camera(&self, camera_id: i32) -> Result<()>;

    fn set_roi_format(
        &self,
        camera_id: i32,
        width: u32,
        height: u32,
        bin: u32,
        format: ImageType,
    ) -> Result<()>;

    fn set_control_value(
        &self,
        camera_id: i32,
        control: ControlKind,
        value: i64,
        auto: bool,
    ) -> Result<()>;

    /// Current `(value, auto)` pair for a control.
    fn get_control_value(&self, camera_id: i32, control: ControlKind) -> Result<(i64, bool)>;

    fn start_video_capture(&self, camera_id: i32) -> Result<()>;

    fn stop_video_capture(&self, camera_id: i32) -> Result<()>;

    /// Block for up to `wait_ms` filling `buffer` with the next video frame.
    fn get_video_data(&self, camera_id: i32, buffer: &mut [u8], wait_ms: u32) -> Result<()>;

    fn start_exposure(&self, camera_id: i32, dark: bool) -> Result<()>;

    fn stop_exposure(&self, camera_id: i32) -> Result<()>;

    fn exposure_status(&self, camera_id: i32) -> Result<ExposureStatus>;

    /// Copy the finished still exposure into `buffer`.
    fn get_data_after_exposure(&self, camera_id: i32, buffer: &mut [u8]) -> Result<()>;
}

/// Type alias for boxed trait object.
pub type BoxedSdk = Box<dyn CameraSdk>;

impl<T: CameraSdk + ?Sized> CameraSdk for Arc<T> {
    fn connected_cameras(&self) -> Result<usize> {
        (**self).connected_cameras()
    }

    fn camera_property(&self, index: usize) -> Result<DeviceInfo> {
        (**self).camera_property(index)
    }

    fn open_camera(&self, camera_id: i32) -> Result<()> {
        (**self).open_camera(camera_id)
    }

    fn init_camera(&self, camera_id: i32) -> Result<()> {
        (**self).init_camera(camera_id)
    }

    fn close_camera(&self, camera_id: i32) -> Result<()> {
        (**self).close_camera(camera_id)
    }

    fn set_roi_format(
        &self,
        camera_id: i32,
        width: u32,
        height: u32,
        bin: u32,
        format: ImageType,
    ) -> Result<()> {
        (**self).set_roi_format(camera_id, width, height, bin, format)
    }

    fn set_control_value(
        &self,
        camera_id: i32,
        control: ControlKind,
        value: i64,
        auto: bool,
    ) -> Result<()> {
        (**self).set_control_value(camera_id, control, value, auto)
    }

    fn get_control_value(&self, camera_id: i32, control: ControlKind) -> Result<(i64, bool)> {
        (**self).get_control_value(camera_id, control)
    }

    fn start_video_capture(&self, camera_id: i32) -> Result<()> {
        (**self).start_video_capture(camera_id)
    }

    fn stop_video_capture(&self, camera_id: i32) -> Result<()> {
        (**self).stop_video_capture(camera_id)
    }

    fn get_video_data(&self, camera_id: i32, buffer: &mut [u8], wait_ms: u32) -> Result<()> {
        (**self).get_video_data(camera_id, buffer, wait_ms)
    }

    fn start_exposure(&self, camera_id: i32, dark: bool) -> Result<()> {
        (**self).start_exposure(camera_id, dark)
    }

    fn stop_exposure(&self, camera_id: i32) -> Result<()> {
        (**self).stop_exposure(camera_id)
    }

    fn exposure_status(&self, camera_id: i32) -> Result<ExposureStatus> {
        (**self).exposure_status(camera_id)
    }

    fn get_data_after_exposure(&self, camera_id: i32, buffer: &mut [u8]) -> Result<()> {
        (**self).get_data_after_exposure(camera_id, buffer)
    }
}
