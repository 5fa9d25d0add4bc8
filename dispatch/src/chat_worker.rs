//! Chat queue workers.
//!
//! N workers drain the `chat` queue under a pool-wide jobs/s budget. The
//! chat path owns the Alert row's delivery status:
//! - success        → alert `sent` + stamp
//! - blocked (403)  → detach the chat handle, alert `failed`, no retry
//! - rate limit     → backoff retry, alert untouched
//! - other          → alert `failed` now; a later successful retry flips it
//!   back to `sent`

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use model::AlertStatus;
use store::Store;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::queue::DispatchQueue;
use crate::rate::RateLimiter;
use crate::telegram::{ChatSendError, ChatSender};
use crate::types::{ClaimedJob, QueueName};

pub const CHAT_CONCURRENCY: usize = 10;
pub const CHAT_JOBS_PER_SEC: u32 = 30;

const IDLE_POLL: Duration = Duration::from_millis(500);

pub struct ChatWorkerPool {
    queue: DispatchQueue,
    store: Store,
    sender: Arc<dyn ChatSender>,
    limiter: Arc<RateLimiter>,
    concurrency: usize,
}

impl ChatWorkerPool {
    pub fn new(queue: DispatchQueue, store: Store, sender: Arc<dyn ChatSender>) -> Self {
        Self {
            queue,
            store,
            sender,
            limiter: Arc::new(RateLimiter::new(CHAT_JOBS_PER_SEC)),
            concurrency: CHAT_CONCURRENCY,
        }
    }

    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!(concurrency = self.concurrency, "chat worker pool starting");
        (0..self.concurrency)
            .map(|idx| {
                let pool = Arc::clone(&self);
                tokio::spawn(async move { pool.worker_loop(idx).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker_idx: usize) {
        loop {
            let now = Utc::now().timestamp_millis();
            match self.queue.claim_one(QueueName::Chat, now).await {
                Ok(Some(job)) => {
                    self.limiter.acquire().await;
                    if let Err(e) = self.process(&job).await {
                        error!(worker_idx, job_id = %job.job_id, error = ?e, "chat job processing error");
                    }
                }
                Ok(None) => tokio::time::sleep(IDLE_POLL).await,
                Err(e) => {
                    error!(worker_idx, error = ?e, "chat queue claim failed");
                    tokio::time::sleep(IDLE_POLL).await;
                }
            }
        }
    }

    /// Drains one claimed job. Every branch settles both the job row and
    /// the alert row.
    #[instrument(skip(self, job), fields(job_id = %job.job_id, alert_id = %job.payload.alert_id))]
    pub async fn process(&self, job: &ClaimedJob) -> anyhow::Result<()> {
        let now = Utc::now().timestamp_millis();
        let payload = &job.payload;

        match self.sender.send(&payload.recipient, payload).await {
            Ok(()) => {
                self.store
                    .alerts
                    .set_status(&payload.alert_id, AlertStatus::Sent, Some(now))
                    .await?;
                self.queue.complete(&job.job_id, now).await?;
                debug!("alert sent via chat");
            }
            Err(ChatSendError::Blocked) => {
                self.store
                    .users
                    .clear_telegram_chat(&payload.user_id)
                    .await?;
                self.store
                    .alerts
                    .set_status(&payload.alert_id, AlertStatus::Failed, None)
                    .await?;
                self.queue
                    .mark_failed(&job.job_id, "recipient blocked", now)
                    .await?;
                warn!(user_id = %payload.user_id, "recipient blocked; chat handle detached");
            }
            Err(ChatSendError::RateLimited) => {
                let retrying = self
                    .queue
                    .fail_and_reschedule(job, "provider rate limit", now)
                    .await?;
                if !retrying {
                    self.store
                        .alerts
                        .set_status(&payload.alert_id, AlertStatus::Failed, None)
                        .await?;
                }
            }
            Err(ChatSendError::Other(reason)) => {
                // Mark failed immediately; a successful retry overwrites.
                self.store
                    .alerts
                    .set_status(&payload.alert_id, AlertStatus::Failed, None)
                    .await?;
                self.queue.fail_and_reschedule(job, &reason, now).await?;
            }
        }
        Ok(())
    }
}
