//! Notification sink that reports processing notifications through the log.

use ledgerfolio_core::notifications::{Notification, NotificationSink};
use tracing::{debug, warn};

/// Writes every notification as a structured log record. Progress goes to
/// `debug`, negative balances to `warn`.
#[derive(Clone, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: Notification) {
        let kind = notification.kind();
        match &notification {
            Notification::ProgressUpdate {
                total, processed, ..
            } => {
                debug!(kind, total, processed, "Balance processing progress");
            }
            Notification::NegativeBalanceDetected {
                event_identifier,
                group_identifier,
                asset,
                balance_before,
                ..
            } => {
                let payload = serde_json::to_string(&notification).unwrap_or_default();
                warn!(
                    kind,
                    event_identifier,
                    group_identifier = group_identifier.as_str(),
                    asset = asset.as_str(),
                    balance_before = %balance_before,
                    payload = payload.as_str(),
                    "Negative balance detected"
                );
            }
        }
    }
}
