//! HTTP response models

use serde::Serialize;

use crate::notification::DispatchSummary;

/// Compact result of the `send` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub sent_count: usize,
    pub failed_count: usize,
    /// Number of resolved targets
    pub sent_to_tokens: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<&DispatchSummary> for SendResponse {
    fn from(summary: &DispatchSummary) -> Self {
        Self {
            success: summary.success,
            sent_count: summary.sent_count,
            failed_count: summary.failed_count,
            sent_to_tokens: summary.total_targets,
            warnings: summary.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::DispatchOutcome;

    #[test]
    fn test_from_summary() {
        let summary = DispatchSummary::from_outcomes(vec![
            DispatchOutcome {
                index: 0,
                target: None,
                success: true,
                message_id: Some("projects/p/messages/1".to_string()),
                error: None,
            },
            DispatchOutcome {
                index: 1,
                target: None,
                success: false,
                message_id: None,
                error: Some("UNREGISTERED".to_string()),
            },
        ]);

        let response = SendResponse::from(&summary);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "sent_count": 1,
                "failed_count": 1,
                "sent_to_tokens": 2
            })
        );
    }
}
