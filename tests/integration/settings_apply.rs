//! Runtime settings changes.

use std::sync::Arc;
use std::time::Duration;

use skycam::device::ControlKind;
use skycam::device::mock::{MockCameraBuilder, Operation};
use skycam::error::CamError;
use skycam::session::video_read_timeout_ms;
use skycam::settings::SettingsUpdate;

use crate::common::{fixtures, wait_until};

fn gain(value: i64) -> SettingsUpdate {
    SettingsUpdate {
        gain: Some(value),
        ..SettingsUpdate::default()
    }
}

#[test]
fn test_gain_change_restarts_stream() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    session.start_stream().unwrap();
    mock.clear_operations();

    let applied = session.update_settings(&gain(75)).unwrap();
    assert_eq!(applied.gain, 75);

    let ops = mock.operations();
    let stop = ops.iter().position(|o| *o == Operation::StopVideo).unwrap();
    let set = ops
        .iter()
        .position(|o| {
            *o == Operation::SetControl {
                control: ControlKind::Gain,
                value: 75,
                auto: false,
            }
        })
        .unwrap();
    let readback = ops
        .iter()
        .position(|o| {
            *o == Operation::GetControl {
                control: ControlKind::Gain,
            }
        })
        .unwrap();
    let restart = ops
        .iter()
        .position(|o| *o == Operation::StartVideo)
        .unwrap();
    assert!(stop < set && set < readback && readback < restart);
    assert_eq!(mock.count(&Operation::StopVideo), 1);
    assert_eq!(mock.count(&Operation::StartVideo), 1);

    assert_eq!(mock.control(ControlKind::Gain), Some((75, false)));
    assert!(session.is_streaming());
    assert!(session.status().streaming);
    assert_eq!(mock.violations(), 0);
    session.stop_stream();
}

#[test]
fn test_gain_change_while_idle_touches_only_gain() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    mock.clear_operations();

    session.update_settings(&gain(60)).unwrap();
    assert_eq!(mock.count(&Operation::StartVideo), 0);
    assert_eq!(mock.count(&Operation::StopVideo), 0);
    assert_eq!(
        mock.count(&Operation::SetControl {
            control: ControlKind::AutoMaxExposure,
            value: 100_000,
            auto: false,
        }),
        0
    );
    assert_eq!(mock.control(ControlKind::Gain), Some((60, false)));

    // Same value again is a no-op in effect.
    let again = session.update_settings(&gain(60)).unwrap();
    assert_eq!(again, session.settings());
    assert_eq!(mock.control(ControlKind::Gain), Some((60, false)));
}

#[test]
fn test_ceiling_change_sets_read_timeout() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    session.start_stream().unwrap();

    session
        .update_settings(&SettingsUpdate {
            video_exposure: Some(2_000_000),
            ..SettingsUpdate::default()
        })
        .unwrap();
    assert_eq!(
        mock.control(ControlKind::AutoMaxExposure),
        Some((2_000_000, false))
    );
    assert!(session.is_streaming());

    let expected = video_read_timeout_ms(2_000_000);
    assert_eq!(expected, 4500);
    assert!(wait_until(Duration::from_secs(2), || {
        mock.count(&Operation::GetVideoData { wait_ms: expected }) > 0
    }));
    session.stop_stream();
}

#[test]
fn test_invalid_update_changes_nothing() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    let before = session.settings();
    mock.clear_operations();

    let err = session
        .update_settings(&SettingsUpdate {
            gain: Some(80),
            photo_exposure: Some(0),
            ..SettingsUpdate::default()
        })
        .unwrap_err();
    assert!(matches!(err, CamError::InvalidSetting { .. }));
    assert_eq!(session.settings(), before);
    mock.assert_no_operations();
}

#[test]
fn test_failed_restart_is_reported() {
    let mock = Arc::new(MockCameraBuilder::new().build());
    let session = fixtures::session(&mock);
    session.connect().unwrap();
    session.start_stream().unwrap();

    // Cable pulled mid-stream, so the restart cannot succeed.
    mock.unplug();
    let applied = session.update_settings(&gain(70)).unwrap();
    assert_eq!(applied.gain, 70);
    assert!(!session.is_streaming());
    assert!(session.status().fault.is_some());

    mock.replug();
    session.disconnect();
    session.connect().unwrap();
    assert_eq!(mock.control(ControlKind::Gain), Some((70, false)));
}
