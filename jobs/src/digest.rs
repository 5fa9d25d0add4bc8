//! Weekly digest: one summary message per opted-in user with a chat
//! binding, covering the best alerts of the last seven days.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dispatch::ChatSender;
use store::Store;
use tracing::{info, instrument, warn};

/// Pause between users so a large digest run cannot trip the provider.
pub const INTER_MESSAGE_DELAY: Duration = Duration::from_millis(50);

#[instrument(skip(store, sender))]
pub async fn run_weekly_digest(
    store: &Store,
    sender: Arc<dyn ChatSender>,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let since_ms = now.timestamp_millis() - 7 * 86_400_000;
    let recipients = store.users.digest_recipients().await?;

    let mut sent = 0usize;
    for user in &recipients {
        let Some(chat_id) = &user.telegram_chat_id else {
            continue;
        };

        let best = store.alerts.best_alerts_since(&user.user_id, since_ms).await?;
        let text = render_digest(&best);

        match sender.send_text(chat_id, &text).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(user_id = %user.user_id, error = %e, "digest send failed"),
        }

        tokio::time::sleep(INTER_MESSAGE_DELAY).await;
    }

    info!(recipients = recipients.len(), sent, "weekly digest finished");
    Ok(sent)
}

fn render_digest(best: &[(String, String, f64, f64)]) -> String {
    if best.is_empty() {
        return "Your week in deals: nothing matched your watches. Targets unchanged.".to_string();
    }

    let mut lines = vec![format!("Your week in deals ({} items):", best.len())];
    for (kind, item_id, best_total, target) in best {
        lines.push(format!(
            "- {kind} {item_id}: best {best_total:.2} EUR (target {target:.2})"
        ));
    }
    lines.join("\n")
}
