//! System-health validation.

use tracing::info;

use crate::client::HealthProbe;
use crate::domain::{TestbenchError, ValidationMetrics};
use crate::obs;

/// Reason reported whenever the validation endpoint cannot be used.
pub const VALIDATION_UNAVAILABLE: &str = "Validation endpoint not available.";

/// Query the probe and map the outcome onto [`ValidationMetrics`].
///
/// Never fails: any probe error is reported as
/// [`ValidationMetrics::Unavailable`].
pub async fn validate(probe: &dyn HealthProbe) -> ValidationMetrics {
    match probe.validate().await {
        Ok(report) => {
            info!(
                emotion_accuracy = report.emotion_accuracy,
                compliance_accuracy = report.compliance_accuracy,
                avg_response_time_ms = report.average_response_time,
                "validation metrics received"
            );
            ValidationMetrics::Available {
                emotion_accuracy_pct: report.emotion_accuracy,
                compliance_accuracy_pct: report.compliance_accuracy,
                avg_response_time_ms: report.average_response_time,
            }
        }
        Err(e) => {
            let err = TestbenchError::ValidationUnavailable(e.to_string());
            obs::emit_validation_unavailable(&err);
            ValidationMetrics::Unavailable {
                reason: format!("{VALIDATION_UNAVAILABLE} ({e})"),
            }
        }
    }
}
