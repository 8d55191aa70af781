//! Streaming upstream responses back to the caller.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use http::header::{self, HeaderMap, HeaderName};
use http::StatusCode;
use tracing::{debug, warn};

/// Headers owned by the connection rather than the message.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

// =============================================================================
// Upstream Response
// =============================================================================

/// Status, headers and an unread body stream from the tile service.
pub struct UpstreamResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BoxStream<'static, io::Result<Bytes>>,
}

impl UpstreamResponse {
    pub fn new<S>(status: StatusCode, headers: HeaderMap, body: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            status,
            headers,
            body: body.boxed(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl From<reqwest::Response> for UpstreamResponse {
    fn from(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other));
        Self::new(status, headers, body)
    }
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Forwarding
// =============================================================================

/// Turn an upstream response into the caller's response.
///
/// The status is copied as-is, including auth rejections that survived the
/// retry. Every end-to-end header is copied in order, repeated names
/// included. The body is streamed chunk by chunk; if the caller goes away,
/// the upstream body is dropped and the disconnect is only logged.
pub fn forward_response(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse {
        status,
        headers,
        body,
    } = upstream;

    let mut response = Response::new(Body::from_stream(ForwardedBody::new(body)));
    *response.status_mut() = status;

    let connection_scoped = connection_tokens(&headers);
    let forwarded = response.headers_mut();
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name, &connection_scoped) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }

    response
}

/// Header names the upstream listed in its `Connection` header.
fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_hop_by_hop(name: &HeaderName, connection_scoped: &[String]) -> bool {
    let name = name.as_str();
    HOP_BY_HOP.contains(&name) || connection_scoped.iter().any(|token| token == name)
}

/// Body stream that notices when it is dropped before the upstream finished.
struct ForwardedBody {
    inner: BoxStream<'static, io::Result<Bytes>>,
    bytes_sent: u64,
    finished: bool,
}

impl ForwardedBody {
    fn new(inner: BoxStream<'static, io::Result<Bytes>>) -> Self {
        Self {
            inner,
            bytes_sent: 0,
            finished: false,
        }
    }
}

impl Stream for ForwardedBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                warn!(error = %e, bytes_sent = this.bytes_sent, "Upstream body failed mid-stream");
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ForwardedBody {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                bytes_sent = self.bytes_sent,
                "Caller disconnected before tile body finished"
            );
        }
    }
}
