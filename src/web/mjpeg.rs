//! MJPEG live view.
//!
//! Emits the session's latest frame as one `multipart/x-mixed-replace`
//! part per poll interval for as long as the session is streaming. A
//! client that connects while the session is not streaming gets an empty
//! body.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;
use futures::stream;
use tracing::{debug, warn};

use crate::frame::Frame;
use crate::image_ops::{STREAM_QUALITY, encode_jpeg};
use crate::session::Session;

/// Multipart boundary, as expected by existing dashboard clients.
pub const MJPEG_BOUNDARY: &str = "frame";

struct Poller {
    session: Arc<Session>,
    interval: Duration,
    waited: bool,
    /// Last encoded frame, reused while the session has nothing newer.
    cache: Option<(Arc<Frame>, Bytes)>,
    parts: u64,
}

impl Poller {
    async fn jpeg_for(&mut self, frame: Arc<Frame>) -> Option<Bytes> {
        if let Some((cached, jpeg)) = &self.cache {
            if Arc::ptr_eq(cached, &frame) {
                return Some(jpeg.clone());
            }
        }
        let source = Arc::clone(&frame);
        match tokio::task::spawn_blocking(move || encode_jpeg(&source, STREAM_QUALITY)).await {
            Ok(Ok(jpeg)) => {
                self.cache = Some((frame, jpeg.clone()));
                Some(jpeg)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to encode stream frame");
                None
            }
            Err(e) => {
                warn!(error = %e, "Stream encoder task failed");
                None
            }
        }
    }

    async fn next_part(&mut self) -> Option<Bytes> {
        loop {
            if self.waited {
                tokio::time::sleep(self.interval).await;
            }
            self.waited = true;

            if !self.session.is_streaming() {
                debug!(parts = self.parts, "MJPEG stream ended");
                return None;
            }
            let Some(frame) = self.session.latest_frame() else {
                continue;
            };
            if let Some(jpeg) = self.jpeg_for(frame).await {
                self.parts += 1;
                return Some(part(&jpeg));
            }
        }
    }
}

/// Frame one JPEG as a multipart part.
pub fn part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{MJPEG_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut buf = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    buf.put_slice(header.as_bytes());
    buf.put_slice(jpeg);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// Stream of multipart parts for `session`.
pub fn parts(
    session: Arc<Session>,
    interval: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    let poller = Poller {
        session,
        interval,
        waited: false,
        cache: None,
        parts: 0,
    };
    stream::unfold(poller, |mut poller| async move {
        let part = poller.next_part().await?;
        Some((Ok(part), poller))
    })
}

/// Build the `GET /camera/stream` response.
pub fn response(session: Arc<Session>, interval: Duration) -> Response {
    let content_type = format!("multipart/x-mixed-replace; boundary={MJPEG_BOUNDARY}");
    let mut response = (StatusCode::OK, Body::from_stream(parts(session, interval))).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
