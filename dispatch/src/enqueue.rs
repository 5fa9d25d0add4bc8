//! Alert → queue-job fan-in, with quiet-hours deferral.

use chrono::{DateTime, Utc};
use model::AlertPayload;
use store::{Store, User};
use tracing::{debug, instrument};

use crate::queue::DispatchQueue;
use crate::quiet::delay_until_end_ms;
use crate::types::{JobPayload, QueueName};

/// Enqueues the channel jobs for a fresh alert.
///
/// Job ids are `{queue}:{alert_id}`, so re-enqueues from a replayed scan
/// collapse. Chat is skipped when the user has no chat binding (for
/// instance after a block); push is skipped when the process has no push
/// gateway. Returns the job ids created, for the alert's accounting
/// column.
#[instrument(skip(queue, store, user, alert), fields(alert_id, user_id = %user.user_id))]
pub async fn enqueue_alert(
    queue: &DispatchQueue,
    store: &Store,
    user: &User,
    alert_id: &str,
    alert: &AlertPayload,
    push_enabled: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<String>> {
    let delay_ms = delay_until_end_ms(user, now);
    if delay_ms > 0 {
        debug!(delay_ms, "quiet hours active; deferring delivery");
    }
    let now_ms = now.timestamp_millis();

    let mut job_ids = Vec::new();

    if let Some(chat_id) = &user.telegram_chat_id {
        let job_id = format!("chat:{alert_id}");
        let payload = JobPayload {
            alert_id: alert_id.to_string(),
            user_id: user.user_id.clone(),
            recipient: chat_id.clone(),
            alert: alert.clone(),
        };
        queue
            .enqueue(&job_id, QueueName::Chat, &payload, delay_ms, now_ms)
            .await?;
        job_ids.push(job_id);
    }

    if push_enabled {
        let job_id = format!("push:{alert_id}");
        let payload = JobPayload {
            alert_id: alert_id.to_string(),
            user_id: user.user_id.clone(),
            recipient: user.user_id.clone(),
            alert: alert.clone(),
        };
        queue
            .enqueue(&job_id, QueueName::Push, &payload, delay_ms, now_ms)
            .await?;
        job_ids.push(job_id);
    }

    if !job_ids.is_empty() {
        store
            .alerts
            .record_channel_jobs(alert_id, &job_ids.join(","))
            .await?;
    }

    Ok(job_ids)
}
