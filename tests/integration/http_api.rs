//! HTTP routes against a mock-backed session.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use tower::ServiceExt;

use skycam::device::ControlKind;
use skycam::device::mock::{ExposureScript, MockCameraBuilder};
use skycam::settings::Settings;
use skycam::state::Mode;

use crate::common::http::{get, post, post_json};
use crate::common::{fixtures, wait_until};

#[tokio::test]
async fn test_status_before_connect() {
    let (_mock, session) = fixtures::healthy();
    let app = fixtures::app(&session);

    let reply = get(&app, "/status").await;
    assert_eq!(reply.status, StatusCode::OK);
    let json = reply.json();
    let cam = &json["sensors"]["weatherCam"];
    assert_eq!(cam["connected"], false);
    assert_eq!(cam["streaming"], false);
    assert!(cam["lastSnapshot"].is_null());
    assert_eq!(json["sensors"]["meteorCam"], *cam);
    assert!(json["sensors"]["temperature"].is_null());
}

#[tokio::test]
async fn test_connect_and_disconnect() {
    let (mock, session) = fixtures::healthy();
    let app = fixtures::app(&session);

    let reply = post(&app, "/camera/connect").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["success"], true);
    assert_eq!(reply.json()["message"], "Camera connected");
    assert!(mock.is_open());
    assert_eq!(
        get(&app, "/status").await.json()["sensors"]["weatherCam"]["connected"],
        true
    );

    let reply = post(&app, "/camera/disconnect").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "Camera disconnected");
    assert!(!mock.is_open());
}

#[tokio::test]
async fn test_connect_without_camera_is_500() {
    let mock = Arc::new(MockCameraBuilder::new().no_cameras().build());
    let session = fixtures::session(&mock);
    let app = fixtures::app(&session);

    let reply = post(&app, "/camera/connect").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let json = reply.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "No cameras found");

    let status = get(&app, "/status").await.json();
    assert_eq!(status["sensors"]["weatherCam"]["fault"], "No cameras found");
}

#[tokio::test]
async fn test_stream_start_requires_connection() {
    let (_mock, session) = fixtures::healthy();
    let app = fixtures::app(&session);

    let reply = post(&app, "/camera/stream/start").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["message"], "Camera not connected");

    // Stopping an idle session is fine.
    let reply = post(&app, "/camera/stream/stop").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["success"], true);
}

#[tokio::test]
async fn test_snapshot_requires_connection() {
    let (mock, session) = fixtures::healthy();
    let app = fixtures::app(&session);

    let reply = get(&app, "/camera/snapshot").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["error"], "Camera not connected");
    mock.assert_no_operations();
}

#[tokio::test]
async fn test_snapshot_returns_jpeg() {
    let (_mock, session) = fixtures::connected(MockCameraBuilder::new());
    let app = fixtures::app(&session);

    let reply = get(&app, "/camera/snapshot").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type(), "image/jpeg");
    assert!(reply.body.starts_with(&[0xFF, 0xD8]));
    assert!(reply.body.ends_with(&[0xFF, 0xD9]));

    let status = get(&app, "/status").await.json();
    assert!(status["sensors"]["weatherCam"]["lastSnapshot"].is_string());
}

#[tokio::test]
async fn test_failed_snapshot_is_500_and_idle() {
    let mock = Arc::new(MockCameraBuilder::new().exposure(ExposureScript::Fail).build());
    let session = fixtures::session_with(
        &mock,
        Settings {
            stream_exposure_cap_micros: 50_000,
            ..Settings::default()
        },
    );
    session.connect().unwrap();
    let app = fixtures::app(&session);

    let reply = get(&app, "/camera/snapshot").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let json = reply.json();
    assert!(json["error"].as_str().unwrap().starts_with("Exposure failed"));
    assert!(json.get("success").is_none());
    assert_eq!(session.mode(), Mode::Idle);
}

#[tokio::test]
async fn test_mjpeg_without_stream_is_empty() {
    let (_mock, session) = fixtures::connected(MockCameraBuilder::new());
    let app = fixtures::app(&session);

    let reply = get(&app, "/camera/stream").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.content_type(),
        "multipart/x-mixed-replace; boundary=frame"
    );
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn test_mjpeg_streams_parts_until_stopped() {
    let (_mock, session) = fixtures::connected(MockCameraBuilder::new());
    let app = fixtures::app(&session);

    let reply = post(&app, "/camera/stream/start").await;
    assert_eq!(reply.json()["message"], "Stream started");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/camera/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    let mut body = response.into_body().into_data_stream();

    let first = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first part in time")
        .expect("stream has a part")
        .unwrap();
    let head = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    assert!(first.starts_with(head));
    assert_eq!(&first[head.len()..head.len() + 2], &[0xFF, 0xD8]);
    assert!(first.ends_with(b"\r\n"));

    let reply = post(&app, "/camera/stream/stop").await;
    assert_eq!(reply.status, StatusCode::OK);

    // The body ends once the session leaves Streaming.
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while body.next().await.is_some() {}
    })
    .await;
    assert!(ended.is_ok());
}

#[tokio::test]
async fn test_settings_round_trip() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    let app = fixtures::app(&session);

    let reply = get(&app, "/camera/settings").await;
    assert_eq!(reply.status, StatusCode::OK);
    let json = reply.json();
    assert_eq!(json["gain"], 50);
    assert_eq!(json["exposure"], 1_000_000);
    assert_eq!(json["video_exposure"], 100_000);

    for _ in 0..2 {
        let reply = post_json(&app, "/camera/settings", r#"{"gain": 60}"#).await;
        assert_eq!(reply.status, StatusCode::OK);
        let json = reply.json();
        assert_eq!(json["success"], true);
        assert_eq!(json["gain"], 60);
        assert_eq!(json["exposure"], 1_000_000);

        let readback = get(&app, "/camera/settings").await.json();
        assert_eq!(readback["gain"], 60);
        assert_eq!(readback["video_exposure"], 100_000);
    }
    assert_eq!(mock.control(ControlKind::Gain), Some((60, false)));
}

#[tokio::test]
async fn test_gain_change_keeps_streaming() {
    let (mock, session) = fixtures::connected(MockCameraBuilder::new());
    let app = fixtures::app(&session);
    post(&app, "/camera/stream/start").await;

    let reply = post_json(&app, "/camera/settings", r#"{"gain": 75}"#).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["gain"], 75);
    assert_eq!(mock.control(ControlKind::Gain), Some((75, false)));

    let streaming = get(&app, "/status").await.json()["sensors"]["weatherCam"]["streaming"].clone();
    assert_eq!(streaming, true);
    assert!(wait_until(Duration::from_secs(2), || mock.is_video_active()));
    post(&app, "/camera/stream/stop").await;
}

#[tokio::test]
async fn test_settings_rejects_bad_bodies() {
    let (_mock, session) = fixtures::healthy();
    let app = fixtures::app(&session);

    let reply = post_json(&app, "/camera/settings", "{not json").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["success"], false);

    let reply = post_json(&app, "/camera/settings", r#"{"gain": "high"}"#).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = post_json(&app, "/camera/settings", r#"{"video_exposure": -1}"#).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        reply.json()["message"]
            .as_str()
            .unwrap()
            .contains("video_exposure")
    );
    assert_eq!(session.settings(), Settings::default());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_mock, session) = fixtures::healthy();
    let app = fixtures::app(&session);
    assert_eq!(get(&app, "/camera/nope").await.status, StatusCode::NOT_FOUND);
}
