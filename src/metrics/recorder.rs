//! Metrics recording implementation using Prometheus.

use prometheus::core::Collector;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use tracing::debug;

use crate::config::MetricsConfig;

pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_REQUEST_TOTAL: &str = "http_request_total";
pub const HTTP_REQUEST_BYTES: &str = "http_request_bytes";
pub const HTTP_RESPONSE_BYTES: &str = "http_response_bytes";
pub const DATABASE_DURATION_SECONDS: &str = "database_duration_seconds";
pub const FUNC_DURATION_SECONDS: &str = "func_duration_seconds";

/// Trait for recording observations, one method per series.
///
/// Label values are used as given; normalisation (path templating, lower-casing,
/// argument formatting) happens in the callers.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Increments the request counter for a finished request.
    fn record_request_total(&self, method: &str, path: &str, status: &str);

    /// Records the latency of an HTTP request.
    fn record_request_duration(&self, method: &str, path: &str, duration_secs: f64);

    /// Records the estimated size of an HTTP request.
    fn record_request_bytes(&self, method: &str, path: &str, bytes: f64);

    /// Records the size of an HTTP response body.
    fn record_response_bytes(&self, method: &str, path: &str, bytes: f64);

    /// Records the latency of a database operation.
    fn record_database_duration(&self, dao: &str, filter: &str, args: &str, duration_secs: f64);

    /// Records the latency of an arbitrary named function.
    fn record_func_duration(&self, func: &str, args: &str, duration_secs: f64);
}

/// Prometheus metrics collector owning the six series.
///
/// Created once at startup and shared by cloning; clones observe into the same series.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub(crate) request_duration: HistogramVec,
    pub(crate) request_total: CounterVec,
    pub(crate) request_bytes: HistogramVec,
    pub(crate) response_bytes: HistogramVec,

    // Call-site metrics
    pub(crate) database_duration: HistogramVec,
    pub(crate) func_duration: HistogramVec,
}

impl Metrics {
    /// Creates the series and registers them into a fresh registry.
    pub fn new(config: &MetricsConfig) -> prometheus::Result<Self> {
        Self::with_registry(Registry::new(), config)
    }

    /// Creates the series and registers them into `registry`.
    ///
    /// Fails if any of the six names is already registered there, or if the
    /// configured buckets or const labels are invalid. On failure the registry is
    /// left as it was found.
    pub fn with_registry(registry: Registry, config: &MetricsConfig) -> prometheus::Result<Self> {
        let histogram = |name: &str, help: &str, buckets: &[f64], labels: &[&str]| {
            let opts = HistogramOpts::new(name, help)
                .const_labels(config.const_labels.clone())
                .buckets(buckets.to_vec());
            // HistogramVec only checks buckets once a child is created.
            Histogram::with_opts(opts.clone())?;
            HistogramVec::new(opts, labels)
        };

        let metrics = Metrics {
            request_duration: histogram(
                HTTP_REQUEST_DURATION_SECONDS,
                "The HTTP request latencies in seconds.",
                &config.duration_buckets,
                &["method", "path"],
            )?,
            request_total: CounterVec::new(
                Opts::new(HTTP_REQUEST_TOTAL, "Total number of HTTP requests made.")
                    .const_labels(config.const_labels.clone()),
                &["method", "path", "status"],
            )?,
            request_bytes: histogram(
                HTTP_REQUEST_BYTES,
                "The HTTP request sizes in bytes.",
                &config.size_buckets,
                &["method", "path"],
            )?,
            response_bytes: histogram(
                HTTP_RESPONSE_BYTES,
                "Response Bytes Size of Each Request.",
                &config.size_buckets,
                &["method", "path"],
            )?,
            database_duration: histogram(
                DATABASE_DURATION_SECONDS,
                "database request latencies in seconds.",
                &config.duration_buckets,
                &["dao", "filter", "args"],
            )?,
            func_duration: histogram(
                FUNC_DURATION_SECONDS,
                "func latencies in seconds.",
                &config.duration_buckets,
                &["func", "args"],
            )?,
            registry,
        };

        let collectors = metrics.collectors();
        for (registered, collector) in collectors.iter().enumerate() {
            if let Err(e) = metrics.registry.register(collector.box_clone()) {
                for earlier in &collectors[..registered] {
                    let _ = metrics.registry.unregister(earlier.box_clone());
                }
                return Err(e);
            }
        }

        debug!(
            const_labels = config.const_labels.len(),
            "Registered request, database and function metrics"
        );
        Ok(metrics)
    }

    /// The registry the series are published in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Removes all six series from the registry.
    ///
    /// Every series is attempted; the first failure is returned. Consumes the
    /// handle: to keep observing afterwards, build a new `Metrics`.
    pub fn unregister(self) -> prometheus::Result<()> {
        let mut first_error = None;
        for collector in self.collectors() {
            if let Err(e) = self.registry.unregister(collector.box_clone()) {
                first_error.get_or_insert(e);
            }
        }
        debug!("Unregistered request, database and function metrics");
        first_error.map_or(Ok(()), Err)
    }

    fn collectors(&self) -> Vec<Series> {
        vec![
            Series::Histogram(self.request_duration.clone()),
            Series::Counter(self.request_total.clone()),
            Series::Histogram(self.request_bytes.clone()),
            Series::Histogram(self.response_bytes.clone()),
            Series::Histogram(self.database_duration.clone()),
            Series::Histogram(self.func_duration.clone()),
        ]
    }

    /// Renders all metrics of the registry in Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

enum Series {
    Histogram(HistogramVec),
    Counter(CounterVec),
}

impl Series {
    fn box_clone(&self) -> Box<dyn Collector> {
        match self {
            Series::Histogram(vec) => Box::new(vec.clone()),
            Series::Counter(vec) => Box::new(vec.clone()),
        }
    }
}

impl MetricsRecorder for Metrics {
    fn record_request_total(&self, method: &str, path: &str, status: &str) {
        self.request_total
            .with_label_values(&[method, path, status])
            .inc();
    }

    fn record_request_duration(&self, method: &str, path: &str, duration_secs: f64) {
        self.request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    fn record_request_bytes(&self, method: &str, path: &str, bytes: f64) {
        self.request_bytes
            .with_label_values(&[method, path])
            .observe(bytes);
    }

    fn record_response_bytes(&self, method: &str, path: &str, bytes: f64) {
        self.response_bytes
            .with_label_values(&[method, path])
            .observe(bytes);
    }

    fn record_database_duration(&self, dao: &str, filter: &str, args: &str, duration_secs: f64) {
        self.database_duration
            .with_label_values(&[dao, filter, args])
            .observe(duration_secs);
    }

    fn record_func_duration(&self, func: &str, args: &str, duration_secs: f64) {
        self.func_duration
            .with_label_values(&[func, args])
            .observe(duration_secs);
    }
}
