//! Delays and bounds used by mode transitions.

use std::time::Duration;

/// Settle delays and wait bounds.
///
/// The defaults are what ASI cameras need in practice: the SDK returns from
/// `ASIStopVideoCapture` before the sensor has actually left video mode, and
/// exposing or restarting too early fails with `VIDEO_MODE_ACTIVE` or
/// returns a black frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Upper bound on waiting for the pull loop to exit.
    pub stream_join: Duration,
    /// Pause between pull-loop iterations.
    pub loop_pause: Duration,
    /// After stopping a stream, before exposing or applying controls.
    pub stop_settle: Duration,
    /// After a snapshot, before resuming the stream.
    pub resume_settle: Duration,
    /// After a settings change, before restarting the stream.
    pub restart_settle: Duration,
    /// Exposure status poll interval.
    pub exposure_poll: Duration,
    /// How long to wait for a leftover exposure to go idle.
    pub idle_wait_limit: Duration,
    /// After force-aborting a stuck exposure.
    pub abort_settle: Duration,
    /// Added to the exposure time to form the exposure deadline.
    pub exposure_grace: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            stream_join: Duration::from_secs(2),
            loop_pause: Duration::from_millis(10),
            stop_settle: Duration::from_millis(500),
            resume_settle: Duration::from_millis(300),
            restart_settle: Duration::from_millis(500),
            exposure_poll: Duration::from_millis(100),
            idle_wait_limit: Duration::from_secs(10),
            abort_settle: Duration::from_millis(500),
            exposure_grace: Duration::from_secs(5),
        }
    }
}

impl SessionTimings {
    /// Near-zero delays for tests and the mock backend. Orderings are
    /// unchanged; only the sleeps shrink.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            stream_join: Duration::from_secs(2),
            loop_pause: Duration::from_millis(1),
            stop_settle: Duration::ZERO,
            resume_settle: Duration::ZERO,
            restart_settle: Duration::ZERO,
            exposure_poll: Duration::from_millis(1),
            idle_wait_limit: Duration::from_millis(20),
            abort_settle: Duration::ZERO,
            exposure_grace: Duration::from_millis(50),
        }
    }

    /// Deadline for a still exposure of `exposure_micros`.
    pub fn exposure_deadline(&self, exposure_micros: i64) -> Duration {
        let exposure = u64::try_from(exposure_micros / 1000).unwrap_or(0);
        Duration::from_millis(exposure) + self.exposure_grace
    }
}

/// Video read timeout for a streaming auto-exposure ceiling.
///
/// Twice the ceiling plus 500 ms of readout, clamped to 1-5 s. Monotonic in
/// `cap_micros`.
pub fn video_read_timeout_ms(cap_micros: i64) -> u32 {
    let ms = cap_micros
        .max(0)
        .saturating_mul(2)
        .saturating_div(1000)
        .saturating_add(500)
        .clamp(1000, 5000);
    u32::try_from(ms).unwrap_or(5000)
}
