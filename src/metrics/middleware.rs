//! Request interception: per-request latency, count and size observations.

use std::time::Instant;

use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use percent_encoding::percent_decode_str;
use tracing::trace;

use super::measure::{request_size, response_size, seconds_since};
use super::path::{substitute_params, truncate_path};
use super::recorder::{Metrics, MetricsRecorder};

/// Axum middleware recording the four HTTP series for every request.
///
/// Paths are templated from the matched route's parameters; requests that matched no
/// route fall back to truncation.
///
/// ```ignore
/// Router::new()
///     .route("/users/:id", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metrics, track_http_metrics))
/// ```
pub async fn track_http_metrics(
    State(metrics): State<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let request_bytes = request_size(&request);

    let (mut parts, body) = request.into_parts();
    let path = match RawPathParams::from_request_parts(&mut parts, &()).await {
        // Param values arrive decoded, so match them against the decoded path.
        Ok(params) => {
            let decoded = percent_decode_str(parts.uri.path()).decode_utf8_lossy();
            substitute_params(&decoded, params.iter())
        }
        Err(_) => truncate_path(parts.uri.path()),
    };

    let response = next.run(Request::from_parts(parts, body)).await;

    let duration = seconds_since(start);
    let status = response.status();
    let response_bytes = response_size(response.headers(), response.body());

    metrics.record_request_total(&method, &path, status.as_str());
    metrics.record_request_duration(&method, &path, duration);
    metrics.record_response_bytes(&method, &path, response_bytes as f64);
    metrics.record_request_bytes(&method, &path, request_bytes as f64);

    trace!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration,
        "Recorded request metrics"
    );

    response
}

/// Records the request count and latency for a caller that already knows the path.
///
/// Size series are left alone.
pub fn record_http_request<R: MetricsRecorder>(
    recorder: &R,
    method: &str,
    path: &str,
    status: StatusCode,
    start: Instant,
) {
    recorder.record_request_total(method, path, status.as_str());
    recorder.record_request_duration(method, path, seconds_since(start));
}

/// Bracket-style form of [`record_http_request`], started now.
///
/// Dropping the timer without calling [`finish`](Self::finish) records the request
/// with status 500, since the bracketed code left before producing a response.
#[must_use = "the request is recorded when the timer is finished or dropped"]
pub struct HttpRequestTimer<'a, R: MetricsRecorder> {
    recorder: &'a R,
    method: String,
    path: String,
    start: Instant,
    finished: bool,
}

impl<'a, R: MetricsRecorder> HttpRequestTimer<'a, R> {
    /// Starts timing a request whose normalised `path` is already known.
    pub fn start(recorder: &'a R, method: &str, path: &str) -> Self {
        HttpRequestTimer {
            recorder,
            method: method.to_string(),
            path: path.to_string(),
            start: Instant::now(),
            finished: false,
        }
    }

    /// Records the request with the status it finished with.
    pub fn finish(mut self, status: StatusCode) {
        self.record(status);
    }

    fn record(&mut self, status: StatusCode) {
        if self.finished {
            return;
        }
        self.finished = true;
        record_http_request(self.recorder, &self.method, &self.path, status, self.start);
    }
}

impl<R: MetricsRecorder> Drop for HttpRequestTimer<'_, R> {
    fn drop(&mut self) {
        self.record(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
