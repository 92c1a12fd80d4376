//! Background video-pull worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::lock;
use crate::device::DeviceHandle;
use crate::error::{CamError, Result};
use crate::state::SharedState;

const JOIN_POLL: Duration = Duration::from_millis(5);

/// Everything the pull loop needs, moved into its thread.
pub(super) struct PullLoop {
    pub device: Arc<Mutex<DeviceHandle>>,
    pub state: Arc<SharedState>,
    pub timeout_ms: u32,
    pub pause: Duration,
}

/// Handle to a running pull loop.
pub(super) struct StreamWorker {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl StreamWorker {
    pub fn spawn(pull: PullLoop) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let token = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("skycam-video".to_string())
            .spawn(move || pull.run(&token))?;
        Ok(Self { stop, thread })
    }

    /// Signal the loop and wait up to `bound` for it to exit.
    ///
    /// Returns `false` if the loop was still inside a read when the bound
    /// elapsed. That read holds the device lock, so the caller's next device
    /// call waits for it, and the loop issues no further read once it sees
    /// the stop token.
    pub fn stop(self, bound: Duration) -> bool {
        self.stop.store(true, Ordering::Release);
        let started = Instant::now();
        while !self.thread.is_finished() {
            if started.elapsed() >= bound {
                warn!(
                    bound_ms = bound.as_millis(),
                    "Video loop did not exit in time, proceeding"
                );
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
        if self.thread.join().is_err() {
            warn!("Video loop panicked");
        }
        true
    }
}

impl PullLoop {
    fn run(self, stop: &AtomicBool) {
        info!(timeout_ms = self.timeout_ms, "Video loop started");
        let mut consecutive: u32 = 0;
        let mut frames: u64 = 0;

        while !stop.load(Ordering::Acquire) {
            {
                let mut device = lock(&self.device);
                if stop.load(Ordering::Acquire) {
                    break;
                }
                match device.read_video_frame(self.timeout_ms) {
                    Ok(frame) => {
                        frames += 1;
                        let mut state = self.state.write();
                        if consecutive > 0 {
                            debug!(after = consecutive, "Video reads recovered");
                            state.clear_error();
                            consecutive = 0;
                        }
                        state.record_frame(Arc::new(frame));
                    }
                    Err(CamError::Timeout) => trace!("Video read timed out"),
                    Err(e) => {
                        consecutive += 1;
                        if consecutive == 1 {
                            self.state.write().record_error(e.to_string());
                        }
                        if consecutive == 1 || consecutive % 10 == 0 {
                            warn!(error = %e, consecutive, "Video read failed");
                        }
                    }
                }
            }
            thread::sleep(self.pause);
        }

        debug!(frames, "Video loop exited");
    }
}
