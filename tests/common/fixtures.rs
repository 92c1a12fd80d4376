//! Mock-backed sessions.

use std::sync::Arc;
use std::time::Duration;

use skycam::device::mock::{MockCamera, MockCameraBuilder};
use skycam::session::{Session, SessionOptions, SessionTimings};
use skycam::settings::Settings;
use skycam::web::{AppState, router};

use axum::Router;

/// MJPEG poll interval used by router fixtures.
pub const TEST_MJPEG_INTERVAL: Duration = Duration::from_millis(5);

/// A session over `mock` with near-zero settle delays.
pub fn session_with(mock: &Arc<MockCamera>, settings: Settings) -> Arc<Session> {
    super::init_test_logging();
    Arc::new(Session::new(
        Box::new(Arc::clone(mock)),
        SessionOptions {
            settings,
            timings: SessionTimings::immediate(),
            ..SessionOptions::default()
        },
    ))
}

pub fn session(mock: &Arc<MockCamera>) -> Arc<Session> {
    session_with(mock, Settings::default())
}

/// A healthy mock and a session over it.
pub fn healthy() -> (Arc<MockCamera>, Arc<Session>) {
    let mock = Arc::new(MockCamera::new());
    let session = session(&mock);
    (mock, session)
}

/// A connected session built from `builder`.
pub fn connected(builder: MockCameraBuilder) -> (Arc<MockCamera>, Arc<Session>) {
    let mock = Arc::new(builder.build());
    let session = session(&mock);
    session.connect().expect("mock camera should connect");
    (mock, session)
}

pub fn app(session: &Arc<Session>) -> Router {
    router(AppState::new(Arc::clone(session), TEST_MJPEG_INTERVAL))
}
