//! Common test utilities for skycam.
//!
//! - `fixtures`: mock-backed sessions and routers
//! - `http`: one-shot request helpers for the axum router
#![allow(dead_code)]

pub mod fixtures;
pub mod http;

use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `condition` every 2ms until it holds or `limit` passes.
pub fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
