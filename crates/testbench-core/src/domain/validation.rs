//! System-health metrics reported by the validation endpoint.

use serde::{Deserialize, Serialize};

/// Metrics from the remote validation run, or the reason they are missing.
///
/// `Unavailable` is a normal outcome: the validation endpoint is optional
/// infrastructure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationMetrics {
    Available {
        emotion_accuracy_pct: f64,
        compliance_accuracy_pct: f64,
        avg_response_time_ms: f64,
    },
    Unavailable {
        reason: String,
    },
}

impl ValidationMetrics {
    pub fn is_available(&self) -> bool {
        matches!(self, ValidationMetrics::Available { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_metrics_tagging() {
        let metrics = ValidationMetrics::Unavailable {
            reason: "Validation endpoint not available.".to_string(),
        };
        let json = serde_json::to_value(&metrics).expect("serialize");
        assert_eq!(json["status"], "unavailable");
        assert!(!metrics.is_available());
    }
}
