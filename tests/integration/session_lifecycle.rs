//! Session lifecycle against the mock camera.
//!
//! Verifies the mode machine end to end, including concurrent callers and
//! a camera that disappears mid-stream.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use skycam::device::mock::{MockCameraBuilder, Operation};
use skycam::error::{AsiCode, CamError};
use skycam::settings::SettingsUpdate;
use skycam::state::Mode;

use crate::common::{fixtures, wait_until};

#[test]
fn test_full_cycle() {
    let (mock, session) = fixtures::healthy();
    assert_eq!(session.mode(), Mode::Idle);
    assert!(!session.is_connected());

    let info = session.connect().unwrap();
    assert_eq!(info.name, "ZWO ASI Mock");
    assert!(session.status().connected);

    session.start_stream().unwrap();
    assert!(wait_until(Duration::from_secs(2), || session
        .latest_frame()
        .is_some()));
    assert!(session.status().streaming);

    session.stop_stream();
    session.stop_stream();
    assert_eq!(session.mode(), Mode::Idle);
    assert_eq!(mock.count(&Operation::StopVideo), 1);

    session.disconnect();
    assert!(!mock.is_open());
    assert_eq!(mock.violations(), 0);
}

#[test]
fn test_reconnect_after_disconnect() {
    let (mock, session) = fixtures::healthy();
    session.connect().unwrap();
    session.disconnect();
    session.connect().unwrap();
    session.start_stream().unwrap();
    assert!(session.is_streaming());
    assert_eq!(mock.count(&Operation::OpenCamera), 2);
    session.close();
    assert!(!session.is_connected());
}

#[test]
fn test_open_failure_is_reported_by_name() {
    let mock = Arc::new(
        MockCameraBuilder::new()
            .fail_open(AsiCode::CameraRemoved)
            .build(),
    );
    let session = fixtures::session(&mock);
    let err = session.connect().unwrap_err();
    assert!(matches!(err, CamError::DeviceOpenFailed(AsiCode::CameraRemoved)));
    assert!(err.to_string().contains("CAMERA_REMOVED"));
    assert!(!session.is_connected());
}

#[test]
fn test_unplugged_camera_keeps_loop_alive() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    session.start_stream().unwrap();
    assert!(wait_until(Duration::from_secs(2), || session
        .latest_frame()
        .is_some()));

    mock.unplug();
    assert!(wait_until(Duration::from_secs(2), || session
        .status()
        .fault
        .is_some()));
    assert!(session.is_streaming());

    session.stop_stream();
    assert_eq!(session.mode(), Mode::Idle);
}

/// Many callers racing transitions must never overlap device access.
#[test]
fn test_concurrent_transitions_are_serialized() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());

    let workers: Vec<_> = (0..6)
        .map(|i| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for round in 0..8 {
                    match (i + round) % 4 {
                        0 => {
                            let _ = session.start_stream();
                        }
                        1 => session.stop_stream(),
                        2 => {
                            let _ = session.capture_snapshot();
                        }
                        _ => {
                            let _ = session.update_settings(&SettingsUpdate {
                                gain: Some(40 + i64::from(round)),
                                ..SettingsUpdate::default()
                            });
                        }
                    }
                    // Mode is never reported as anything but a single state.
                    let status = session.status();
                    assert!(!(status.streaming && status.mode == Mode::Capturing));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(mock.violations(), 0);
    assert_ne!(session.mode(), Mode::Capturing);
    assert_eq!(session.is_streaming(), mock.is_video_active());
    session.stop_stream();
    assert!(!mock.is_video_active());
}

#[test]
fn test_drop_closes_camera() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    session.start_stream().unwrap();
    drop(session);
    assert!(!mock.is_open());
    assert!(!mock.is_video_active());
}
