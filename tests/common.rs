#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use httpstats::config::{load_config_str, ConfigV1};
use httpstats::metrics::Metrics;
use httpstats::routes::create_router;
use httpstats::startup::build_state;
use prometheus::proto::Metric;
use prometheus::Registry;

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
bind_address: 127.0.0.1:8081
logging:
  level: "debug"
  format: "json"
"#;

pub fn load_test_config(yaml: &str) -> ConfigV1 {
    load_config_str(yaml).expect("Failed to parse test config YAML")
}

pub fn build_app(config: ConfigV1) -> (Router, Metrics) {
    let state = build_state(Arc::new(config)).expect("metrics should register");
    let metrics = state.metrics.clone();
    (create_router(state), metrics)
}

pub fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

/// Finds the series of `name` whose labels are exactly `labels`.
pub fn find_series(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> Option<Metric> {
    let families = registry.gather();
    let family = families.iter().find(|mf| mf.get_name() == name)?;
    family
        .get_metric()
        .iter()
        .find(|m| {
            let pairs = m.get_label();
            pairs.len() == labels.len()
                && labels
                    .iter()
                    .all(|(k, v)| pairs.iter().any(|lp| lp.get_name() == *k && lp.get_value() == *v))
        })
        .cloned()
}

pub fn counter_value(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> f64 {
    find_series(registry, name, labels)
        .map(|m| m.get_counter().get_value())
        .unwrap_or(0.0)
}

pub fn histogram_count(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> u64 {
    find_series(registry, name, labels)
        .map(|m| m.get_histogram().get_sample_count())
        .unwrap_or(0)
}

pub fn histogram_sum(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> f64 {
    find_series(registry, name, labels)
        .map(|m| m.get_histogram().get_sample_sum())
        .unwrap_or(0.0)
}
