//! Operator broadcast: copy one message to every registered user

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay between copies, keeps a large broadcast under Telegram's flood limits
pub const BROADCAST_PACE: Duration = Duration::from_millis(50);

/// Word that aborts a pending broadcast
pub const CANCEL_WORD: &str = "cancel";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn summary(&self) -> String {
        format!(
            "✅ Broadcast finished.\n\n📨 Delivered: {}\n🚫 Failed: {}",
            self.delivered, self.failed
        )
    }
}

/// Whether the operator's reply aborts the broadcast
pub fn is_cancel(text: Option<&str>) -> bool {
    text.is_some_and(|t| t.trim().eq_ignore_ascii_case(CANCEL_WORD))
}

/// Send to each recipient in turn; a failure (usually a user who blocked
/// the bot) is counted and the rest still get the message
pub async fn broadcast<F, Fut, E>(recipients: &[i64], pace: Duration, mut send: F) -> BroadcastReport
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut report = BroadcastReport::default();

    for (i, &user_id) in recipients.iter().enumerate() {
        if i > 0 && !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
        match send(user_id).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::debug!(user_id, error = %e, "Broadcast copy failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        delivered = report.delivered,
        failed = report.failed,
        "Broadcast finished"
    );
    report
}
