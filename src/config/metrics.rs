use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings for the six HTTP/database/function series and their exposition route.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct MetricsConfig {
    /// Path the exposition endpoint is served on.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Labels attached to every series of every metric.
    #[serde(default)]
    pub const_labels: HashMap<String, String>,
    /// Buckets for the request, database and function duration histograms.
    #[serde(default = "default_buckets")]
    pub duration_buckets: Vec<f64>,
    /// Buckets for the request and response size histograms.
    #[serde(default = "default_buckets")]
    pub size_buckets: Vec<f64>,
}

fn default_endpoint() -> String {
    "/metrics".to_string()
}

fn default_buckets() -> Vec<f64> {
    prometheus::DEFAULT_BUCKETS.to_vec()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            endpoint: default_endpoint(),
            const_labels: HashMap::new(),
            duration_buckets: default_buckets(),
            size_buckets: default_buckets(),
        }
    }
}
