//! Still capture through the session.

use std::sync::Arc;
use std::time::Duration;

use skycam::device::ControlKind;
use skycam::device::mock::{ExposureScript, MockCameraBuilder, Operation};
use skycam::error::{AsiCode, CamError};
use skycam::image_ops::{SNAPSHOT_QUALITY, encode_jpeg};
use skycam::settings::Settings;
use skycam::state::Mode;

use crate::common::{fixtures, wait_until};

#[test]
fn test_idle_snapshot_uses_still_settings() {
    let mock = Arc::new(MockCameraBuilder::new().resolution(32, 24).build());
    let session = fixtures::session_with(
        &mock,
        Settings {
            gain: 90,
            still_exposure_micros: 20_000,
            ..Settings::default()
        },
    );
    session.connect().unwrap();

    let snapshot = session.capture_snapshot().unwrap();
    assert_eq!(snapshot.frame.width(), 32);
    assert_eq!(snapshot.frame.height(), 24);
    assert!(snapshot.resume_error.is_none());
    assert_eq!(mock.control(ControlKind::Exposure), Some((20_000, false)));
    assert_eq!(mock.control(ControlKind::Gain), Some((90, false)));
    assert_eq!(mock.count(&Operation::StartVideo), 0);

    let status = session.status();
    assert_eq!(status.mode, Mode::Idle);
    assert!(status.last_snapshot.is_some());
    assert!(Arc::ptr_eq(&session.latest_frame().unwrap(), &snapshot.frame));

    let jpeg = encode_jpeg(&snapshot.frame, SNAPSHOT_QUALITY).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_snapshot_pauses_and_resumes_stream() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    session.start_stream().unwrap();
    assert!(wait_until(Duration::from_secs(2), || session
        .latest_frame()
        .is_some()));

    session.capture_snapshot().unwrap();
    assert!(session.is_streaming());

    let ops = mock.operations();
    let stop = ops.iter().position(|o| *o == Operation::StopVideo).unwrap();
    let expose = ops
        .iter()
        .position(|o| *o == Operation::StartExposure)
        .unwrap();
    let restart = ops
        .iter()
        .rposition(|o| *o == Operation::StartVideo)
        .unwrap();
    assert!(stop < expose && expose < restart);
    assert!(
        !ops[stop..restart]
            .iter()
            .any(|o| matches!(o, Operation::GetVideoData { .. }))
    );
    // The ceiling is reapplied on resume.
    assert_eq!(mock.control(ControlKind::AutoMaxExposure), Some((100_000, false)));
    assert_eq!(mock.violations(), 0);
    session.stop_stream();
}

#[test]
fn test_failed_resume_keeps_snapshot_and_reports_fault() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    session.start_stream().unwrap();
    assert!(wait_until(Duration::from_secs(2), || session
        .latest_frame()
        .is_some()));

    mock.set_video_start_failure(Some(AsiCode::InvalidMode));
    let snapshot = session.capture_snapshot().unwrap();
    assert!(matches!(
        snapshot.resume_error,
        Some(CamError::StartVideoFailed(AsiCode::InvalidMode))
    ));
    assert!(Arc::ptr_eq(&session.latest_frame().unwrap(), &snapshot.frame));

    let status = session.status();
    assert!(!session.is_streaming());
    assert!(!status.streaming);
    assert_eq!(status.mode, Mode::Idle);
    assert!(status.last_snapshot.is_some());
    assert!(
        status
            .fault
            .is_some_and(|fault| fault.contains("ASI_ERROR_INVALID_MODE"))
    );

    // The next successful start clears the fault.
    mock.set_video_start_failure(None);
    session.start_stream().unwrap();
    assert_eq!(session.status().fault, None);
    session.stop_stream();
}

#[test]
fn test_failing_exposure_returns_to_idle() {
    let mock = Arc::new(MockCameraBuilder::new().exposure(ExposureScript::Fail).build());
    let session = fixtures::session_with(
        &mock,
        Settings {
            stream_exposure_cap_micros: 50_000,
            ..Settings::default()
        },
    );
    session.connect().unwrap();

    let err = session.capture_snapshot().unwrap_err();
    assert!(matches!(err, CamError::ExposureFailed { .. }));
    assert_eq!(session.mode(), Mode::Idle);
    assert!(session.latest_frame().is_none());
    assert_eq!(mock.count(&Operation::GetExposureData), 0);
    assert!(
        session
            .status()
            .fault
            .is_some_and(|fault| fault.starts_with("Exposure failed"))
    );
}

#[test]
fn test_hung_exposure_times_out() {
    let mock = Arc::new(MockCameraBuilder::new().exposure(ExposureScript::Hang).build());
    let session = fixtures::session_with(
        &mock,
        Settings {
            still_exposure_micros: 1_000,
            ..Settings::default()
        },
    );
    session.connect().unwrap();

    assert!(matches!(
        session.capture_snapshot(),
        Err(CamError::ExposureFailed { .. })
    ));
    assert_eq!(session.mode(), Mode::Idle);
    assert!(session.status().fault.is_some());

    mock.set_exposure_script(ExposureScript::Succeed { working_polls: 2 });
    session.capture_snapshot().unwrap();
    assert_eq!(session.status().fault, None);
}

#[test]
fn test_rejected_exposure_names_code() {
    let mock = Arc::new(
        MockCameraBuilder::new()
            .exposure(ExposureScript::RejectStart(AsiCode::ExposureInProgress))
            .build(),
    );
    let session = fixtures::session(&mock);
    session.connect().unwrap();

    let err = session.capture_snapshot().unwrap_err();
    assert!(matches!(
        err,
        CamError::ExposureStartFailed(AsiCode::ExposureInProgress)
    ));
    assert!(err.to_string().contains("ASI_ERROR_EXPOSURE_IN_PROGRESS"));
}

#[test]
fn test_leftover_exposure_is_cleared_first() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new().stuck_exposure());
    session.capture_snapshot().unwrap();
    let ops = mock.operations();
    let abort = ops
        .iter()
        .position(|o| *o == Operation::StopExposure)
        .unwrap();
    let start = ops
        .iter()
        .position(|o| *o == Operation::StartExposure)
        .unwrap();
    assert!(abort < start);
}
