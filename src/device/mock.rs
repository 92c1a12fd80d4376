//! Mock camera implementation for tests and hardware-free serving.
//!
//! This module provides a scriptable [`CameraSdk`] that records every
//! call and tracks the hardware mode it has been put in, so tests can
//! assert both the call sequence and that video and still exposure were
//! never active at the same time.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use skycam::device::mock::{ExposureScript, MockCameraBuilder, Operation};
//!
//! let mock = Arc::new(MockCameraBuilder::new().exposure(ExposureScript::Fail).build());
//! // ... drive a Session over Box::new(Arc::clone(&mock)) ...
//! mock.assert_contains(&Operation::StartExposure);
//! assert_eq!(mock.violations(), 0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::CameraSdk;
use super::info::{ControlKind, DeviceInfo, ExposureStatus, ImageType};
use crate::error::{AsiCode, CamError, Result};

/// Recorded SDK call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ConnectedCameras,
    CameraProperty { index: usize },
    OpenCamera,
    InitCamera,
    CloseCamera,
    SetRoiFormat {
        width: u32,
        height: u32,
        format: ImageType,
    },
    SetControl {
        control: ControlKind,
        value: i64,
        auto: bool,
    },
    GetControl { control: ControlKind },
    StartVideo,
    StopVideo,
    GetVideoData { wait_ms: u32 },
    StartExposure,
    StopExposure,
    ExposureStatus,
    GetExposureData,
}

/// How the mock responds to a still exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureScript {
    /// Report `Working` for `working_polls` status queries, then `Success`.
    Succeed { working_polls: u32 },
    /// Report `Failed` on the first status query.
    Fail,
    /// Stay `Working` until the exposure is stopped.
    Hang,
    /// Reject `ASIStartExposure` with the given code.
    RejectStart(AsiCode),
}

impl Default for ExposureScript {
    fn default() -> Self {
        Self::Succeed { working_polls: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exposure {
    None,
    Running { polls: u32 },
    Done,
    /// Left over from an earlier session; cleared only by `stop_exposure`.
    Stuck,
}

struct MockState {
    attached: bool,
    open: bool,
    video: bool,
    exposure: Exposure,
    script: ExposureScript,
    controls: HashMap<ControlKind, (i64, bool)>,
    video_failure: Option<AsiCode>,
    video_start_failure: Option<AsiCode>,
    frame_counter: u8,
}

/// Mock camera for testing without real hardware.
///
/// All methods take `&self`; share it as `Arc<MockCamera>` and hand a clone
/// to the code under test.
pub struct MockCamera {
    info: DeviceInfo,
    state: Mutex<MockState>,
    operation_log: Mutex<Vec<Operation>>,
    fail_open: Option<AsiCode>,
    fail_init: Option<AsiCode>,
    frame_delay: Duration,
    reading: AtomicBool,
    violations: AtomicUsize,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCamera {
    /// A healthy 64x48 colour camera.
    #[must_use]
    pub fn new() -> Self {
        MockCameraBuilder::new().build()
    }

    /// Property block this mock reports.
    pub const fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: Operation) {
        trace!(?op, "Mock operation");
        self.operation_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
    }

    fn violation(&self, what: &str) {
        warn!(what, "Mock hardware misuse");
        self.violations.fetch_add(1, Ordering::SeqCst);
    }

    /// Check `camera_id` and that the camera is attached and open.
    fn ready(&self, state: &MockState, camera_id: i32) -> Result<()> {
        if camera_id != self.info.camera_id {
            return Err(CamError::Sdk(AsiCode::InvalidId));
        }
        if !state.attached {
            return Err(CamError::Sdk(AsiCode::CameraRemoved));
        }
        if !state.open {
            return Err(CamError::Sdk(AsiCode::CameraClosed));
        }
        Ok(())
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.operation_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear the operation log.
    pub fn clear_operations(&self) {
        self.operation_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of recorded operations equal to `op`.
    pub fn count(&self, op: &Operation) -> usize {
        self.operations().iter().filter(|o| *o == op).count()
    }

    /// Assert that an operation was recorded.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, op: &Operation) {
        let ops = self.operations();
        assert!(ops.contains(op), "Expected {op:?} in operations: {ops:?}");
    }

    /// Assert that no operations were recorded.
    ///
    /// # Panics
    ///
    /// Panics if any operation was recorded.
    pub fn assert_no_operations(&self) {
        let ops = self.operations();
        assert!(ops.is_empty(), "Expected no operations, got: {ops:?}");
    }

    /// Count of calls that would corrupt real hardware: overlapping video
    /// reads, reads outside video mode, or video and exposure both active.
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn is_video_active(&self) -> bool {
        self.lock().video
    }

    /// Current stored `(value, auto)` for a control.
    pub fn control(&self, control: ControlKind) -> Option<(i64, bool)> {
        self.lock().controls.get(&control).copied()
    }

    /// Preload a control value, as if left behind by another program.
    pub fn seed_control(&self, control: ControlKind, value: i64, auto: bool) {
        self.lock().controls.insert(control, (value, auto));
    }

    /// Change how subsequent exposures behave.
    pub fn set_exposure_script(&self, script: ExposureScript) {
        self.lock().script = script;
    }

    /// Make every video read fail with `code` (or succeed again with `None`).
    pub fn set_video_failure(&self, code: Option<AsiCode>) {
        self.lock().video_failure = code;
    }

    /// Make later `StartVideo` calls fail with `code`, or succeed again with `None`.
    pub fn set_video_start_failure(&self, code: Option<AsiCode>) {
        self.lock().video_start_failure = code;
    }

    /// Simulate the USB cable being pulled.
    pub fn unplug(&self) {
        debug!("Mock camera unplugged");
        let mut state = self.lock();
        state.attached = false;
        state.open = false;
        state.video = false;
        state.exposure = Exposure::None;
    }

    /// Reattach after [`unplug`](Self::unplug). The camera must be reopened.
    pub fn replug(&self) {
        debug!("Mock camera replugged");
        self.lock().attached = true;
    }

    fn read_video(&self, camera_id: i32, buffer: &mut [u8]) -> Result<()> {
        let (failure, seed) = {
            let mut state = self.lock();
            self.ready(&state, camera_id)?;
            if !state.video {
                drop(state);
                self.violation("video read outside video mode");
                return Err(CamError::Sdk(AsiCode::InvalidSequence));
            }
            state.frame_counter = state.frame_counter.wrapping_add(1);
            (state.video_failure, state.frame_counter)
        };
        if buffer.len() < self.info.frame_bytes() {
            return Err(CamError::Sdk(AsiCode::BufferTooSmall));
        }
        thread::sleep(self.frame_delay);
        if let Some(code) = failure {
            return Err(CamError::Sdk(code));
        }
        Self::fill_frame(buffer, seed);
        Ok(())
    }

    fn fill_frame(buffer: &mut [u8], seed: u8) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = seed.wrapping_add((i % 251) as u8);
        }
    }
}

impl CameraSdk for MockCamera {
    fn connected_cameras(&self) -> Result<usize> {
        self.record(Operation::ConnectedCameras);
        Ok(usize::from(self.lock().attached))
    }

    fn camera_property(&self, index: usize) -> Result<DeviceInfo> {
        self.record(Operation::CameraProperty { index });
        if index != 0 || !self.lock().attached {
            return Err(CamError::Sdk(AsiCode::InvalidIndex));
        }
        Ok(self.info.clone())
    }

    fn open_camera(&self, camera_id: i32) -> Result<()> {
        self.record(Operation::OpenCamera);
        if camera_id != self.info.camera_id {
            return Err(CamError::Sdk(AsiCode::InvalidId));
        }
        if let Some(code) = self.fail_open {
            return Err(CamError::Sdk(code));
        }
        let mut state = self.lock();
        if !state.attached {
            return Err(CamError::Sdk(AsiCode::CameraRemoved));
        }
        state.open = true;
        Ok(())
    }

    fn init_camera(&self, camera_id: i32) -> Result<()> {
        self.record(Operation::InitCamera);
        self.ready(&self.lock(), camera_id)?;
        self.fail_init.map_or(Ok(()), |code| Err(CamError::Sdk(code)))
    }

    fn close_camera(&self, camera_id: i32) -> Result<()> {
        self.record(Operation::CloseCamera);
        if self.reading.load(Ordering::SeqCst) {
            self.violation("close during video read");
        }
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        state.open = false;
        state.video = false;
        Ok(())
    }

    fn set_roi_format(
        &self,
        camera_id: i32,
        width: u32,
        height: u32,
        _bin: u32,
        format: ImageType,
    ) -> Result<()> {
        self.record(Operation::SetRoiFormat {
            width,
            height,
            format,
        });
        self.ready(&self.lock(), camera_id)?;
        if width > self.info.max_width || height > self.info.max_height {
            return Err(CamError::Sdk(AsiCode::InvalidSize));
        }
        Ok(())
    }

    fn set_control_value(
        &self,
        camera_id: i32,
        control: ControlKind,
        value: i64,
        auto: bool,
    ) -> Result<()> {
        self.record(Operation::SetControl {
            control,
            value,
            auto,
        });
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        if value < 0 {
            return Err(CamError::Sdk(AsiCode::OutOfBoundary));
        }
        state.controls.insert(control, (value, auto));
        Ok(())
    }

    fn get_control_value(&self, camera_id: i32, control: ControlKind) -> Result<(i64, bool)> {
        self.record(Operation::GetControl { control });
        let state = self.lock();
        self.ready(&state, camera_id)?;
        Ok(state.controls.get(&control).copied().unwrap_or((0, false)))
    }

    fn start_video_capture(&self, camera_id: i32) -> Result<()> {
        self.record(Operation::StartVideo);
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        if let Some(code) = state.video_start_failure {
            return Err(CamError::Sdk(code));
        }
        if matches!(state.exposure, Exposure::Running { .. } | Exposure::Stuck) {
            drop(state);
            self.violation("video started during exposure");
            return Err(CamError::Sdk(AsiCode::ExposureInProgress));
        }
        state.video = true;
        Ok(())
    }

    fn stop_video_capture(&self, camera_id: i32) -> Result<()> {
        self.record(Operation::StopVideo);
        if self.reading.load(Ordering::SeqCst) {
            self.violation("video stopped during read");
        }
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        state.video = false;
        Ok(())
    }

    fn get_video_data(&self, camera_id: i32, buffer: &mut [u8], wait_ms: u32) -> Result<()> {
        self.record(Operation::GetVideoData { wait_ms });
        if self.reading.swap(true, Ordering::SeqCst) {
            self.violation("overlapping video reads");
        }
        let outcome = self.read_video(camera_id, buffer);
        self.reading.store(false, Ordering::SeqCst);
        outcome
    }

    fn start_exposure(&self, camera_id: i32, _dark: bool) -> Result<()> {
        self.record(Operation::StartExposure);
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        if state.video {
            drop(state);
            self.violation("exposure started during video");
            return Err(CamError::Sdk(AsiCode::VideoModeActive));
        }
        if matches!(state.exposure, Exposure::Running { .. } | Exposure::Stuck) {
            return Err(CamError::Sdk(AsiCode::ExposureInProgress));
        }
        if let ExposureScript::RejectStart(code) = state.script {
            return Err(CamError::Sdk(code));
        }
        state.exposure = Exposure::Running { polls: 0 };
        Ok(())
    }

    fn stop_exposure(&self, camera_id: i32) -> Result<()> {
        self.record(Operation::StopExposure);
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        state.exposure = Exposure::None;
        Ok(())
    }

    fn exposure_status(&self, camera_id: i32) -> Result<ExposureStatus> {
        self.record(Operation::ExposureStatus);
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        let (status, next) = match (state.exposure, state.script) {
            (Exposure::None, _) => (ExposureStatus::Idle, Exposure::None),
            (Exposure::Stuck, _) => (ExposureStatus::Working, Exposure::Stuck),
            (Exposure::Done, _) => (ExposureStatus::Success, Exposure::Done),
            (Exposure::Running { .. }, ExposureScript::Fail) => {
                (ExposureStatus::Failed, Exposure::None)
            }
            (Exposure::Running { polls }, ExposureScript::Succeed { working_polls }) => {
                if polls >= working_polls {
                    (ExposureStatus::Success, Exposure::Done)
                } else {
                    (
                        ExposureStatus::Working,
                        Exposure::Running { polls: polls + 1 },
                    )
                }
            }
            (running @ Exposure::Running { .. }, _) => (ExposureStatus::Working, running),
        };
        state.exposure = next;
        Ok(status)
    }

    fn get_data_after_exposure(&self, camera_id: i32, buffer: &mut [u8]) -> Result<()> {
        self.record(Operation::GetExposureData);
        let mut state = self.lock();
        self.ready(&state, camera_id)?;
        if state.exposure != Exposure::Done {
            return Err(CamError::Sdk(AsiCode::InvalidSequence));
        }
        if buffer.len() < self.info.frame_bytes() {
            return Err(CamError::Sdk(AsiCode::BufferTooSmall));
        }
        state.exposure = Exposure::None;
        state.frame_counter = state.frame_counter.wrapping_add(1);
        Self::fill_frame(buffer, state.frame_counter);
        Ok(())
    }
}

/// Builder for creating configured mock cameras.
#[derive(Debug, Clone)]
pub struct MockCameraBuilder {
    width: u32,
    height: u32,
    attached: bool,
    fail_open: Option<AsiCode>,
    fail_init: Option<AsiCode>,
    reject_video_start: Option<AsiCode>,
    script: ExposureScript,
    stuck_exposure: bool,
    frame_delay: Duration,
}

impl Default for MockCameraBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCameraBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: 64,
            height: 48,
            attached: true,
            fail_open: None,
            fail_init: None,
            reject_video_start: None,
            script: ExposureScript::default(),
            stuck_exposure: false,
            frame_delay: Duration::from_millis(2),
        }
    }

    /// Report zero attached cameras.
    #[must_use]
    pub const fn no_cameras(mut self) -> Self {
        self.attached = false;
        self
    }

    /// Sensor resolution.
    #[must_use]
    pub const fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub const fn fail_open(mut self, code: AsiCode) -> Self {
        self.fail_open = Some(code);
        self
    }

    #[must_use]
    pub const fn fail_init(mut self, code: AsiCode) -> Self {
        self.fail_init = Some(code);
        self
    }

    #[must_use]
    pub const fn reject_video_start(mut self, code: AsiCode) -> Self {
        self.reject_video_start = Some(code);
        self
    }

    #[must_use]
    pub const fn exposure(mut self, script: ExposureScript) -> Self {
        self.script = script;
        self
    }

    /// Start with an exposure stuck in `Working` that only
    /// `ASIStopExposure` clears.
    #[must_use]
    pub const fn stuck_exposure(mut self) -> Self {
        self.stuck_exposure = true;
        self
    }

    /// Simulated readout time of each video frame.
    #[must_use]
    pub const fn frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    #[must_use]
    pub fn build(self) -> MockCamera {
        debug!(width = self.width, height = self.height, "Creating mock camera");
        MockCamera {
            info: DeviceInfo {
                name: "ZWO ASI Mock".to_string(),
                camera_id: 0,
                max_width: self.width,
                max_height: self.height,
                is_color: true,
                bit_depth: 12,
                pixel_size_um: 3.75,
            },
            state: Mutex::new(MockState {
                attached: self.attached,
                open: false,
                video: false,
                exposure: if self.stuck_exposure {
                    Exposure::Stuck
                } else {
                    Exposure::None
                },
                script: self.script,
                controls: HashMap::new(),
                video_failure: None,
                video_start_failure: self.reject_video_start,
                frame_counter: 0,
            }),
            operation_log: Mutex::new(Vec::new()),
            fail_open: self.fail_open,
            fail_init: self.fail_init,
            frame_delay: self.frame_delay,
            reading: AtomicBool::new(false),
            violations: AtomicUsize::new(0),
        }
    }
}
