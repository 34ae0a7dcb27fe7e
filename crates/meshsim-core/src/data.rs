use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{EndpointName, ServiceName};

/// Mean and coefficient of variation of a latency distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean latency in milliseconds.
    pub mean: f64,
    /// Coefficient of variation (stddev / mean; 0 when the mean is 0).
    pub cv: f64,
}

impl LatencyStats {
    /// Zero mean, zero coefficient of variation.
    pub const ZERO: LatencyStats = LatencyStats { mean: 0.0, cv: 0.0 };

    /// Creates a statistics pair.
    #[must_use]
    pub const fn new(mean: f64, cv: f64) -> Self {
        Self { mean, cv }
    }
}

/// One captured response an endpoint is known to produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleResponse {
    /// HTTP status code as written in configuration, e.g. `"200"`.
    pub status: String,
    /// Response content type, when recorded.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Representative response body, when recorded.
    #[serde(default)]
    pub body: Option<Value>,
}

impl SampleResponse {
    /// Whether the sample represents a success (2xx) response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }

    /// Whether the sample represents a server-error (5xx) response.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.starts_with('5')
    }
}

/// Static sample payloads of one endpoint, used to flesh out generated
/// records with representative bodies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointBaseData {
    /// Endpoint the samples belong to.
    pub endpoint: EndpointName,
    /// Captured responses, in configuration order.
    #[serde(default)]
    pub sample_responses: Vec<SampleResponse>,
}

/// One synthetic traffic record: the schema consumed by the historical and
/// aggregated-data persistence layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinedRealtimeData {
    /// Unique name of the service version that served the requests.
    pub unique_service_name: ServiceName,
    /// Unique name of the endpoint that served the requests.
    pub unique_endpoint_name: EndpointName,
    /// Slot timestamp in epoch microseconds.
    pub latest_timestamp_us: i64,
    /// Status bucket of the record, e.g. `"200"`.
    pub status: String,
    /// Number of requests combined into this record.
    pub combined: u64,
    /// Latency statistics of the bucket.
    pub latency: LatencyStats,
    /// Content type of the representative response, when known.
    #[serde(default)]
    pub response_content_type: Option<String>,
    /// Representative response body, when known.
    #[serde(default)]
    pub response_body: Option<Value>,
}
