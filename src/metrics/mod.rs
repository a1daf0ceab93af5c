//! Metrics collection and exposition for Prometheus.
//!
//! This module turns request timings, sizes and call-site durations into
//! bounded-cardinality observations on six series.

mod measure;
mod middleware;
mod path;
mod recorder;
mod timer;

pub use measure::{
    clamp_duration, estimate_request_size, format_label_args, protocol_name, request_size,
    response_size, seconds_since, MIN_DURATION_SECS,
};
pub use middleware::{record_http_request, track_http_metrics, HttpRequestTimer};
pub use path::{substitute_params, truncate_path};
pub use recorder::{
    Metrics, MetricsRecorder, DATABASE_DURATION_SECONDS, FUNC_DURATION_SECONDS,
    HTTP_REQUEST_BYTES, HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUEST_TOTAL, HTTP_RESPONSE_BYTES,
};
pub use timer::{
    new_database_timer, new_func_timer, record_database_duration, record_func_duration,
    start_database_timer, start_func_timer, ScopedTimer,
};
