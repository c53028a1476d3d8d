//! Delivery outcomes.

use crate::ids::MessageId;
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Overall outcome of delivering a [`crate::Message`] to all its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Every target succeeded.
    Success,
    /// At least one target succeeded and at least one failed.
    Partial,
    /// Every target failed.
    Failed,
}

/// Per-target delivery outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    /// The target this result describes.
    pub target: Target,
    /// Platform adapter that handled the target.
    pub platform: String,
    /// Whether delivery succeeded.
    pub success: bool,
    /// Error description; empty when `success` is true.
    pub error: String,
    /// When the adapter call started.
    pub started_at: SystemTime,
    /// How long the adapter call took.
    pub duration: Duration,
    /// Number of attempts made, including the final one.
    pub attempts: u32,
}

impl SendResult {
    /// Build a successful result.
    #[must_use]
    pub fn success(target: Target, platform: impl Into<String>, started_at: SystemTime, duration: Duration, attempts: u32) -> Self {
        Self {
            target,
            platform: platform.into(),
            success: true,
            error: String::new(),
            started_at,
            duration,
            attempts,
        }
    }

    /// Build a failed result.
    #[must_use]
    pub fn failure(
        target: Target,
        platform: impl Into<String>,
        error: impl Into<String>,
        started_at: SystemTime,
        duration: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            target,
            platform: platform.into(),
            success: false,
            error: error.into(),
            started_at,
            duration,
            attempts,
        }
    }
}

/// Aggregated outcome of delivering one [`crate::Message`] to all its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// The message this receipt describes.
    pub message_id: MessageId,
    /// Overall status derived from the per-target results.
    pub status: ReceiptStatus,
    /// Total number of targets.
    pub total: usize,
    /// Number of targets that succeeded.
    pub successful: usize,
    /// Number of targets that failed.
    pub failed: usize,
    /// Per-target results, in target order.
    pub results: Vec<SendResult>,
    /// When the last result was recorded.
    pub completed_at: SystemTime,
}

impl Receipt {
    /// Build a receipt from a complete set of per-target results.
    #[must_use]
    pub fn from_results(message_id: MessageId, results: Vec<SendResult>, completed_at: SystemTime) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|result| result.success).count();
        let failed = total - successful;
        let status = if failed == 0 {
            ReceiptStatus::Success
        } else if successful == 0 {
            ReceiptStatus::Failed
        } else {
            ReceiptStatus::Partial
        };
        Self {
            message_id,
            status,
            total,
            successful,
            failed,
            results,
            completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    fn target() -> Target {
        Target::builder("email", "a@example.com", "smtp").build().expect("valid target")
    }

    #[test]
    fn all_success_yields_success_status() {
        let now = SystemTime::now();
        let results = vec![SendResult::success(target(), "smtp", now, Duration::from_millis(5), 1)];
        let receipt = Receipt::from_results(MessageId::generate(), results, now);
        assert_eq!(receipt.status, ReceiptStatus::Success);
        assert_eq!(receipt.successful, 1);
        assert_eq!(receipt.failed, 0);
    }

    #[test]
    fn mixed_outcomes_yield_partial_status() {
        let now = SystemTime::now();
        let results = vec![
            SendResult::success(target(), "smtp", now, Duration::from_millis(5), 1),
            SendResult::failure(target(), "smtp", "boom", now, Duration::from_millis(5), 3),
        ];
        let receipt = Receipt::from_results(MessageId::generate(), results, now);
        assert_eq!(receipt.status, ReceiptStatus::Partial);
        assert_eq!(receipt.total, 2);
    }

    #[test]
    fn all_failure_yields_failed_status() {
        let now = SystemTime::now();
        let results = vec![SendResult::failure(target(), "smtp", "boom", now, Duration::from_millis(5), 1)];
        let receipt = Receipt::from_results(MessageId::generate(), results, now);
        assert_eq!(receipt.status, ReceiptStatus::Failed);
    }
}
