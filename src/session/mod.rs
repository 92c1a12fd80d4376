//! Camera session: mode transitions over a single device.
//!
//! A [`Session`] owns the [`DeviceHandle`], the observable
//! [`SessionState`](crate::state::SessionState) and the current
//! [`Settings`]. Two locks keep the hardware consistent:
//!
//! - the transition lock is held for the whole of `connect`,
//!   `disconnect`, `start_stream`, `stop_stream`, `capture_snapshot` and
//!   `update_settings`, so transitions never interleave;
//! - the device lock is held for each individual device call, including
//!   every read issued by the background pull loop.
//!
//! Lock order is transition, then device, then state. Every method blocks;
//! async callers go through `spawn_blocking`.

mod capture;
mod stream;
mod timings;

pub use timings::{SessionTimings, video_read_timeout_ms};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;

use tracing::{debug, info, instrument, warn};

use crate::device::{BoxedSdk, ControlKind, DeviceHandle, DeviceInfo, OpenOptions};
use crate::error::{CamError, Result};
use crate::frame::Frame;
use crate::settings::{Settings, SettingsUpdate};
use crate::state::{Mode, SharedState, StateSummary};
use stream::{PullLoop, StreamWorker};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Construction parameters for a [`Session`].
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub settings: Settings,
    /// USB bandwidth-overload percentage applied on connect.
    pub bandwidth: i64,
    pub timings: SessionTimings,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            bandwidth: 40,
            timings: SessionTimings::default(),
        }
    }
}

/// Result of a successful snapshot.
#[derive(Debug)]
pub struct Snapshot {
    pub frame: Arc<Frame>,
    /// Set when the stream was active before the capture and could not be
    /// restarted afterwards.
    pub resume_error: Option<CamError>,
}

/// The camera session.
pub struct Session {
    transition: Mutex<Option<StreamWorker>>,
    device: Arc<Mutex<DeviceHandle>>,
    state: Arc<SharedState>,
    settings: RwLock<Settings>,
    bandwidth: i64,
    timings: SessionTimings,
}

impl Session {
    pub fn new(sdk: BoxedSdk, options: SessionOptions) -> Self {
        Self {
            transition: Mutex::new(None),
            device: Arc::new(Mutex::new(DeviceHandle::new(sdk))),
            state: Arc::new(SharedState::new()),
            settings: RwLock::new(options.settings),
            bandwidth: options.bandwidth,
            timings: options.timings,
        }
    }

    fn begin_transition(&self) -> MutexGuard<'_, Option<StreamWorker>> {
        lock(&self.transition)
    }

    /// Current settings.
    pub fn settings(&self) -> Settings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn is_streaming(&self) -> bool {
        self.mode() == Mode::Streaming
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().is_connected()
    }

    pub fn status(&self) -> StateSummary {
        self.state.read().summary()
    }

    /// Most recent frame from the stream or the last snapshot.
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.state.latest_frame()
    }

    fn record_outcome<T>(&self, result: &Result<T>) {
        let mut state = self.state.write();
        match result {
            Ok(_) => state.clear_error(),
            Err(e) => state.record_error(e.to_string()),
        }
    }

    /// Open the first attached camera with the current settings.
    ///
    /// Succeeds without touching hardware if already connected.
    #[instrument(skip(self))]
    pub fn connect(&self) -> Result<DeviceInfo> {
        let _transition = self.begin_transition();
        let settings = self.settings();
        let options = OpenOptions {
            gain: settings.gain,
            exposure_micros: settings.still_exposure_micros,
            bandwidth: self.bandwidth,
        };

        let result = lock(&self.device).open(&options);
        self.record_outcome(&result);
        if let Ok(info) = &result {
            self.state.write().device = Some(info.clone());
            info!(name = %info.name, "Camera connected");
        }
        result
    }

    /// Stop any stream and close the camera. A no-op when disconnected.
    #[instrument(skip(self))]
    pub fn disconnect(&self) {
        let mut worker = self.begin_transition();
        self.stop_stream_locked(&mut worker);
        lock(&self.device).close();
        self.state.write().reset_device();
    }

    /// Return to `Idle` with the device closed. Used at shutdown.
    pub fn close(&self) {
        if self.is_connected() || self.is_streaming() {
            info!("Closing camera session");
        }
        self.disconnect();
    }

    /// Enter `Streaming`. Succeeds immediately if already streaming.
    #[instrument(skip(self))]
    pub fn start_stream(&self) -> Result<()> {
        let mut worker = self.begin_transition();
        // Cleared up front: the pull loop may report its own fault as soon as
        // it is spawned.
        if worker.is_none() {
            self.state.write().clear_error();
        }
        let result = self.start_stream_locked(&mut worker);
        if let Err(e) = &result {
            self.state.write().record_error(e.to_string());
        }
        result
    }

    /// Leave `Streaming`. Always succeeds; hardware errors are logged.
    #[instrument(skip(self))]
    pub fn stop_stream(&self) {
        let mut worker = self.begin_transition();
        self.stop_stream_locked(&mut worker);
    }

    fn start_stream_locked(&self, worker: &mut Option<StreamWorker>) -> Result<()> {
        if worker.is_some() {
            debug!("Stream already running");
            return Ok(());
        }
        let cap = self.settings().stream_exposure_cap_micros;

        {
            let mut device = lock(&self.device);
            if !device.is_open() {
                return Err(CamError::DeviceNotOpen);
            }
            if let Err(e) = device.set_control(ControlKind::AutoMaxExposure, cap, false) {
                warn!(error = %e, "Failed to set auto-exposure ceiling");
            }
            if let Err(e) = device.set_control(ControlKind::Exposure, 0, true) {
                warn!(error = %e, "Failed to enable auto exposure");
            }
            device.start_video()?;
        }

        let pull = PullLoop {
            device: Arc::clone(&self.device),
            state: Arc::clone(&self.state),
            timeout_ms: video_read_timeout_ms(cap),
            pause: self.timings.loop_pause,
        };
        match StreamWorker::spawn(pull) {
            Ok(spawned) => *worker = Some(spawned),
            Err(e) => {
                warn!(error = %e, "Failed to spawn video loop");
                if let Err(stop_err) = lock(&self.device).stop_video() {
                    warn!(error = %stop_err, "Failed to stop video after spawn failure");
                }
                return Err(e);
            }
        }

        self.state.write().set_mode(Mode::Streaming);
        info!(cap_us = cap, "Stream started");
        Ok(())
    }

    fn stop_stream_locked(&self, worker: &mut Option<StreamWorker>) {
        let Some(running) = worker.take() else {
            return;
        };
        running.stop(self.timings.stream_join);
        if let Err(e) = lock(&self.device).stop_video() {
            warn!(error = %e, "Failed to stop video capture");
        }
        self.state.write().set_mode(Mode::Idle);
        info!("Stream stopped");
    }

    /// Take one still exposure, pausing and resuming an active stream.
    ///
    /// The stream is restarted even when the exposure fails; a failed
    /// restart is reported in [`Snapshot::resume_error`] or logged.
    #[instrument(skip(self))]
    pub fn capture_snapshot(&self) -> Result<Snapshot> {
        let mut worker = self.begin_transition();
        if !lock(&self.device).is_open() {
            let err = CamError::DeviceNotOpen;
            self.state.write().record_error(err.to_string());
            return Err(err);
        }

        let was_streaming = worker.is_some();
        if was_streaming {
            debug!("Pausing stream for capture");
            self.stop_stream_locked(&mut worker);
            thread::sleep(self.timings.stop_settle);
        }

        let settings = self.settings();
        self.state.write().set_mode(Mode::Capturing);
        let result = capture::expose(&mut lock(&self.device), &settings, &self.timings).map(Arc::new);
        {
            let mut state = self.state.write();
            state.set_mode(Mode::Idle);
            match &result {
                Ok(frame) => {
                    state.record_frame(Arc::clone(frame));
                    state.clear_error();
                }
                Err(e) => state.record_error(e.to_string()),
            }
        }

        let resume_error = if was_streaming {
            thread::sleep(self.timings.resume_settle);
            debug!("Resuming stream after capture");
            self.start_stream_locked(&mut worker).err()
        } else {
            None
        };
        if let Some(e) = &resume_error {
            warn!(error = %e, "Failed to resume stream after capture");
            self.state.write().record_error(e.to_string());
        }

        result.map(|frame| Snapshot {
            frame,
            resume_error,
        })
    }

    /// Merge `update` into the settings and apply it to the open camera.
    ///
    /// Gain and stream-ceiling changes restart an active stream; the still
    /// exposure is only applied at the next snapshot. Returns the settings
    /// now in effect.
    #[instrument(skip(self))]
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        let mut worker = self.begin_transition();
        let next = self.settings().merged(update)?;
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = next;

        if !update.touches_stream_controls() || !lock(&self.device).is_open() {
            return Ok(next);
        }

        let was_streaming = worker.is_some();
        if was_streaming {
            debug!("Stopping stream to apply settings");
            self.stop_stream_locked(&mut worker);
            thread::sleep(self.timings.stop_settle);
        }

        self.apply_stream_controls(update);

        if was_streaming {
            thread::sleep(self.timings.restart_settle);
            if let Err(e) = self.start_stream_locked(&mut worker) {
                warn!(error = %e, "Failed to restart stream with new settings");
                self.state.write().record_error(e.to_string());
            }
        }
        Ok(next)
    }

    /// Write each changed control and read it back.
    fn apply_stream_controls(&self, update: &SettingsUpdate) {
        let controls = [
            (ControlKind::Gain, update.gain),
            (ControlKind::AutoMaxExposure, update.video_exposure),
        ];
        let mut device = lock(&self.device);
        for (control, value) in controls {
            let Some(requested) = value else {
                continue;
            };
            let applied = device
                .set_control(control, requested, false)
                .and_then(|()| device.get_control(control));
            match applied {
                Ok((actual, _)) if actual == requested => {
                    info!(control = control.name(), value = actual, "Control applied");
                }
                Ok((actual, auto)) => {
                    warn!(control = control.name(), requested, actual, auto, "Control readback differs");
                }
                Err(e) => {
                    warn!(control = control.name(), error = %e, "Failed to apply control");
                    self.state.write().record_error(e.to_string());
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
