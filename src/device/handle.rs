//! Open/closed lifecycle and error mapping around one camera.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::BoxedSdk;
use super::info::{ControlKind, DeviceInfo, ExposureStatus, ImageType};
use crate::error::{AsiCode, CamError, Result};
use crate::frame::Frame;

/// Pause after clearing the auto-gain/auto-exposure latches; the SDK applies
/// the auto flag asynchronously and a value written too early is overridden.
const AUTO_LATCH_SETTLE: Duration = Duration::from_millis(100);

/// Values applied to the hardware right after a successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub gain: i64,
    pub exposure_micros: i64,
    pub bandwidth: i64,
}

/// Wraps the SDK for the first attached camera.
///
/// Tracks whether the camera is open plus the hardware mode it was last
/// put in, so `close` and `stop_video` can be called at any time. Holds no
/// locks of its own; callers serialize access.
pub struct DeviceHandle {
    sdk: BoxedSdk,
    info: Option<DeviceInfo>,
    video_active: bool,
    exposure_active: bool,
}

fn control_error(err: CamError, action: &'static str, control: ControlKind) -> CamError {
    match err {
        CamError::Sdk(code @ AsiCode::Unknown(_)) => CamError::UnknownDeviceError(code),
        CamError::Sdk(code) => CamError::ControlFailed {
            action,
            control: control.name(),
            code,
        },
        other => other,
    }
}

impl DeviceHandle {
    pub fn new(sdk: BoxedSdk) -> Self {
        Self {
            sdk,
            info: None,
            video_active: false,
            exposure_active: false,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.info.is_some()
    }

    fn open_info(&self) -> Result<&DeviceInfo> {
        self.info.as_ref().ok_or(CamError::DeviceNotOpen)
    }

    fn camera_id(&self) -> Result<i32> {
        self.open_info().map(|info| info.camera_id)
    }

    /// List attached cameras without opening any of them.
    pub fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let count = self.sdk.connected_cameras()?;
        (0..count)
            .map(|index| {
                self.sdk
                    .camera_property(index)
                    .map_err(|e| e.in_context(CamError::PropertyQueryFailed))
            })
            .collect()
    }

    /// Open and initialize the first attached camera.
    ///
    /// Configures full-frame RGB24 output, clears the auto-gain and
    /// auto-exposure latches, then applies `options` explicitly. Calling this
    /// on an open handle returns the current info without touching hardware.
    pub fn open(&mut self, options: &OpenOptions) -> Result<DeviceInfo> {
        if let Some(info) = &self.info {
            debug!(camera_id = info.camera_id, "Camera already open");
            return Ok(info.clone());
        }

        let count = self.sdk.connected_cameras()?;
        info!(count, "Enumerated cameras");
        if count == 0 {
            return Err(CamError::NoDeviceFound);
        }

        let props = self
            .sdk
            .camera_property(0)
            .map_err(|e| e.in_context(CamError::PropertyQueryFailed))?;
        let id = props.camera_id;
        info!(
            name = %props.name,
            camera_id = id,
            width = props.max_width,
            height = props.max_height,
            color = props.is_color,
            "Found camera"
        );

        self.sdk
            .open_camera(id)
            .map_err(|e| e.in_context(CamError::DeviceOpenFailed))?;

        if let Err(e) = self.sdk.init_camera(id) {
            if let Err(close_err) = self.sdk.close_camera(id) {
                warn!(error = %close_err, "Close after failed init also failed");
            }
            return Err(e.in_context(CamError::DeviceInitFailed));
        }

        if let Err(e) =
            self.sdk
                .set_roi_format(id, props.max_width, props.max_height, 1, ImageType::Rgb24)
        {
            warn!(error = %e, "Failed to set full-frame RGB24 ROI");
        }

        self.video_active = false;
        self.exposure_active = false;
        self.info = Some(props.clone());

        for control in [ControlKind::Gain, ControlKind::Exposure] {
            let current = self.get_control(control).map_or(0, |(value, _)| value);
            if let Err(e) = self.set_control(control, current, false) {
                warn!(control = control.name(), error = %e, "Failed to clear auto latch");
            }
        }
        thread::sleep(AUTO_LATCH_SETTLE);

        if let Err(e) = self.set_control(ControlKind::BandwidthOverload, options.bandwidth, false) {
            warn!(error = %e, "Failed to set USB bandwidth");
        }
        if let Err(e) = self.set_control(ControlKind::Exposure, options.exposure_micros, false) {
            warn!(error = %e, "Failed to set initial exposure");
        }
        match self
            .set_control(ControlKind::Gain, options.gain, false)
            .and_then(|()| self.get_control(ControlKind::Gain))
        {
            Ok((actual, auto)) => {
                info!(requested = options.gain, actual, auto, "Initial gain applied");
            }
            Err(e) => warn!(error = %e, "Failed to apply initial gain"),
        }

        Ok(props)
    }

    /// Stop any active stream or exposure and release the camera.
    ///
    /// A no-op on a closed handle. Errors are logged, never returned: the
    /// handle always ends up closed.
    pub fn close(&mut self) {
        let Ok(id) = self.camera_id() else {
            return;
        };
        if self.video_active {
            if let Err(e) = self.stop_video() {
                warn!(error = %e, "Failed to stop video before close");
            }
        }
        if self.exposure_active {
            if let Err(e) = self.abort_exposure() {
                warn!(error = %e, "Failed to stop exposure before close");
            }
        }
        if let Err(e) = self.sdk.close_camera(id) {
            warn!(camera_id = id, error = %e, "Failed to close camera");
        }
        self.video_active = false;
        self.exposure_active = false;
        self.info = None;
        info!(camera_id = id, "Camera closed");
    }

    pub fn set_control(&mut self, control: ControlKind, value: i64, auto: bool) -> Result<()> {
        let id = self.camera_id()?;
        self.sdk
            .set_control_value(id, control, value, auto)
            .map_err(|e| control_error(e, "set", control))
    }

    /// Current `(value, auto)` for a control.
    pub fn get_control(&self, control: ControlKind) -> Result<(i64, bool)> {
        let id = self.camera_id()?;
        self.sdk
            .get_control_value(id, control)
            .map_err(|e| control_error(e, "get", control))
    }

    /// Enter video mode. The caller guarantees no exposure is in progress.
    pub fn start_video(&mut self) -> Result<()> {
        let id = self.camera_id()?;
        self.sdk
            .start_video_capture(id)
            .map_err(|e| e.in_context(CamError::StartVideoFailed))?;
        self.video_active = true;
        Ok(())
    }

    /// Leave video mode. Idempotent.
    pub fn stop_video(&mut self) -> Result<()> {
        if !self.video_active {
            return Ok(());
        }
        let id = self.camera_id()?;
        self.video_active = false;
        self.sdk
            .stop_video_capture(id)
            .map_err(|e| e.in_context(CamError::StopVideoFailed))
    }

    /// Block for up to `timeout_ms` waiting for the next video frame.
    ///
    /// [`CamError::Timeout`] is the normal outcome when the exposure cap is
    /// longer than the poll interval; callers treat it as "no frame yet".
    pub fn read_video_frame(&mut self, timeout_ms: u32) -> Result<Frame> {
        let info = self.open_info()?;
        let (id, width, height) = (info.camera_id, info.max_width, info.max_height);
        let mut buffer = vec![0u8; Frame::byte_len(width, height)];
        match self.sdk.get_video_data(id, &mut buffer, timeout_ms) {
            Ok(()) => Frame::from_rgb(width, height, buffer)
                .ok_or(CamError::VideoReadFailed(AsiCode::BufferTooSmall)),
            Err(CamError::Sdk(AsiCode::Timeout)) => Err(CamError::Timeout),
            Err(e) => Err(e.in_context(CamError::VideoReadFailed)),
        }
    }

    /// Begin a light-frame still exposure with the currently applied controls.
    pub fn start_exposure(&mut self) -> Result<()> {
        let id = self.camera_id()?;
        self.sdk
            .start_exposure(id, false)
            .map_err(|e| e.in_context(CamError::ExposureStartFailed))?;
        self.exposure_active = true;
        Ok(())
    }

    pub fn poll_exposure_status(&mut self) -> Result<ExposureStatus> {
        let id = self.camera_id()?;
        let status = self
            .sdk
            .exposure_status(id)
            .map_err(|e| e.in_context(CamError::ExposureStatusFailed))?;
        if status == ExposureStatus::Idle {
            self.exposure_active = false;
        }
        Ok(status)
    }

    /// Force-stop a running exposure.
    pub fn abort_exposure(&mut self) -> Result<()> {
        let id = self.camera_id()?;
        self.exposure_active = false;
        self.sdk
            .stop_exposure(id)
            .map_err(|e| e.in_context(CamError::ExposureStopFailed))
    }

    /// Fetch the image of a successfully finished exposure.
    pub fn read_exposed_frame(&mut self) -> Result<Frame> {
        let info = self.open_info()?;
        let (id, width, height) = (info.camera_id, info.max_width, info.max_height);
        let mut buffer = vec![0u8; Frame::byte_len(width, height)];
        self.exposure_active = false;
        self.sdk
            .get_data_after_exposure(id, &mut buffer)
            .map_err(|e| e.in_context(CamError::DataFetchFailed))?;
        Frame::from_rgb(width, height, buffer)
            .ok_or(CamError::DataFetchFailed(AsiCode::BufferTooSmall))
    }
}
