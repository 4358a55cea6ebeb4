use serde::{Deserialize, Serialize};

/// Span export.  Logs always go to stdout as JSON; spans (HTTP requests,
/// session event pumps, command dispatch) are additionally shipped over
/// OTLP/gRPC when an endpoint is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Fraction of traces kept.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl ObservabilityConfig {
    /// The collector to export to, if any.  A blank endpoint means off.
    pub fn export_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// `sample_rate` clamped into `0.0..=1.0`; NaN samples nothing.
    pub fn sampling_ratio(&self) -> f64 {
        if self.sample_rate.is_nan() {
            0.0
        } else {
            self.sample_rate.clamp(0.0, 1.0)
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: default_service_name(),
            sample_rate: default_sample_rate(),
        }
    }
}

fn default_service_name() -> String {
    "pairbot".into()
}

fn default_sample_rate() -> f64 {
    1.0
}
