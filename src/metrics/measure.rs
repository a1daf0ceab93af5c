//! Conversions from raw timings, call arguments and requests into observation values.

use std::fmt::Display;
use std::time::{Duration, Instant};

use axum::body::HttpBody;
use axum::http::{header, HeaderMap, Request, Version};

/// Smallest value any duration histogram receives, in seconds.
pub const MIN_DURATION_SECS: f64 = 0.001;

/// Converts `elapsed` to seconds, flooring at one millisecond.
pub fn clamp_duration(elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs < MIN_DURATION_SECS {
        MIN_DURATION_SECS
    } else {
        secs
    }
}

/// Clamped seconds elapsed since `start`.
pub fn seconds_since(start: Instant) -> f64 {
    clamp_duration(start.elapsed())
}

/// Joins the display form of each argument with `_`.
///
/// The result is used verbatim as a label value: no escaping, no length cap.
pub fn format_label_args(args: &[&dyn Display]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join("_")
}

/// Approximate request size in bytes.
///
/// Sums the path, method, protocol, every header name once plus each of its values,
/// the host, and the content length when it is known (not negative). Request-line and
/// separator overhead is ignored.
pub fn estimate_request_size(
    method: &str,
    protocol: &str,
    host: &str,
    path: &str,
    headers: &HeaderMap,
    content_length: i64,
) -> u64 {
    let mut size = path.len() + method.len() + protocol.len();
    for name in headers.keys() {
        size += name.as_str().len();
        size += headers
            .get_all(name)
            .iter()
            .map(|value| value.len())
            .sum::<usize>();
    }
    size += host.len();

    let mut size = size as u64;
    if content_length >= 0 {
        size += content_length as u64;
    }
    size
}

/// Protocol string in the `HTTP/x.y` form.
pub fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Estimated size of an incoming request.
///
/// The host comes from the URI authority or the `Host` header; that header is not
/// counted a second time among the others.
pub fn request_size<B: HttpBody>(request: &Request<B>) -> u64 {
    let headers = request.headers();
    let host = request
        .uri()
        .host()
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .unwrap_or("");

    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .or_else(|| {
            request
                .body()
                .size_hint()
                .exact()
                .and_then(|n| i64::try_from(n).ok())
        })
        .unwrap_or(-1);

    let size = estimate_request_size(
        request.method().as_str(),
        protocol_name(request.version()),
        host,
        request.uri().path(),
        headers,
        content_length,
    );

    let host_header = headers
        .get_all(header::HOST)
        .iter()
        .map(|value| value.len())
        .reduce(|a, b| a + b)
        .map_or(0, |values| header::HOST.as_str().len() + values);
    size.saturating_sub(host_header as u64)
}

/// Size of a response body: the exact size hint, else `Content-Length`, else 0.
pub fn response_size<B: HttpBody>(headers: &HeaderMap, body: &B) -> u64 {
    body.size_hint()
        .exact()
        .or_else(|| {
            headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        })
        .unwrap_or(0)
}
