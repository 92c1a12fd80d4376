//! Still-exposure protocol.

use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::SessionTimings;
use crate::device::{ControlKind, DeviceHandle, ExposureStatus};
use crate::error::{CamError, Result};
use crate::frame::Frame;
use crate::settings::Settings;

/// Wait for a leftover exposure to finish, force-stopping it after
/// `idle_wait_limit`.
fn wait_for_idle(device: &mut DeviceHandle, timings: &SessionTimings) -> Result<()> {
    let mut status = device.poll_exposure_status()?;
    if status == ExposureStatus::Idle {
        return Ok(());
    }

    warn!(?status, "Camera not idle, waiting");
    let started = Instant::now();
    while status != ExposureStatus::Idle && started.elapsed() < timings.idle_wait_limit {
        thread::sleep(timings.exposure_poll);
        status = device.poll_exposure_status()?;
    }

    if status != ExposureStatus::Idle {
        warn!(?status, "Camera still not idle, forcing exposure stop");
        if let Err(e) = device.abort_exposure() {
            warn!(error = %e, "Forced exposure stop failed");
        }
        thread::sleep(timings.abort_settle);
    }
    Ok(())
}

/// Run one light-frame exposure with `settings` and fetch the image.
///
/// The device must be open and out of video mode.
pub(super) fn expose(
    device: &mut DeviceHandle,
    settings: &Settings,
    timings: &SessionTimings,
) -> Result<Frame> {
    wait_for_idle(device, timings)?;

    device.set_control(ControlKind::Exposure, settings.still_exposure_micros, false)?;
    device.set_control(ControlKind::Gain, settings.gain, false)?;
    info!(
        exposure_us = settings.still_exposure_micros,
        gain = settings.gain,
        "Starting exposure"
    );

    device.start_exposure()?;

    let deadline = timings.exposure_deadline(settings.still_exposure_micros);
    let started = Instant::now();
    loop {
        match device.poll_exposure_status()? {
            ExposureStatus::Success => break,
            ExposureStatus::Failed => {
                return Err(CamError::ExposureFailed {
                    reason: "camera reported ASI_EXP_FAILED".to_string(),
                });
            }
            ExposureStatus::Idle | ExposureStatus::Working => {}
        }
        if started.elapsed() >= deadline {
            if let Err(e) = device.abort_exposure() {
                warn!(error = %e, "Failed to stop timed-out exposure");
            }
            return Err(CamError::ExposureFailed {
                reason: format!("no result after {} ms", deadline.as_millis()),
            });
        }
        thread::sleep(timings.exposure_poll);
    }

    let frame = device.read_exposed_frame()?;
    debug!(
        elapsed_ms = started.elapsed().as_millis(),
        width = frame.width(),
        height = frame.height(),
        "Exposure complete"
    );
    Ok(frame)
}
