//! Push queue workers.
//!
//! One job fans out to every active subscription of the user. Push never
//! touches Alert.status: the chat path owns it; push is additive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use store::Store;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::queue::DispatchQueue;
use crate::rate::RateLimiter;
use crate::types::{ClaimedJob, PushOutcome, QueueName};
use crate::webpush::{PushGateway, PushSendError, subscription_keys_valid};

pub const PUSH_CONCURRENCY: usize = 10;
pub const PUSH_JOBS_PER_SEC: u32 = 50;

const IDLE_POLL: Duration = Duration::from_millis(500);

pub struct PushWorkerPool {
    queue: DispatchQueue,
    store: Store,
    gateway: Arc<dyn PushGateway>,
    limiter: Arc<RateLimiter>,
    concurrency: usize,
}

impl PushWorkerPool {
    pub fn new(queue: DispatchQueue, store: Store, gateway: Arc<dyn PushGateway>) -> Self {
        Self {
            queue,
            store,
            gateway,
            limiter: Arc::new(RateLimiter::new(PUSH_JOBS_PER_SEC)),
            concurrency: PUSH_CONCURRENCY,
        }
    }

    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!(concurrency = self.concurrency, "push worker pool starting");
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
            match self.queue.claim_one(QueueName::Push, now).await {
                Ok(Some(job)) => {
                    self.limiter.acquire().await;
                    if let Err(e) = self.process(&job).await {
                        error!(worker_idx, job_id = %job.job_id, error = ?e, "push job processing error");
                    }
                }
                Ok(None) => tokio::time::sleep(IDLE_POLL).await,
                Err(e) => {
                    error!(worker_idx, error = ?e, "push queue claim failed");
                    tokio::time::sleep(IDLE_POLL).await;
                }
            }
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    pub async fn process(&self, job: &ClaimedJob) -> anyhow::Result<PushOutcome> {
        let now = Utc::now().timestamp_millis();
        let user_id = &job.payload.user_id;

        let subs = self.store.users.active_push_subscriptions(user_id).await?;
        if subs.is_empty() {
            self.queue.complete(&job.job_id, now).await?;
            return Ok(PushOutcome::NoSubscriptions);
        }

        let mut delivered = 0usize;
        let mut attempted = 0usize;
        for sub in &subs {
            if !subscription_keys_valid(sub) {
                debug!(sub_id = %sub.sub_id, "subscription with bad key material skipped");
                continue;
            }
            attempted += 1;
            match self.gateway.send(sub).await {
                Ok(()) => delivered += 1,
                Err(PushSendError::Gone) => {
                    self.store
                        .users
                        .deactivate_push_subscription(&sub.sub_id)
                        .await?;
                }
                Err(PushSendError::Other(reason)) => {
                    debug!(sub_id = %sub.sub_id, reason = %reason, "push delivery failed");
                }
            }
        }

        let outcome = match (delivered, attempted) {
            (0, 0) => PushOutcome::NoSubscriptions,
            (0, _) => PushOutcome::Failed,
            (d, a) if d == a => PushOutcome::Sent,
            _ => PushOutcome::Partial,
        };

        match outcome {
            PushOutcome::Failed => {
                // Transient push-service trouble: retry the whole fan-out;
                // re-delivery to subscriptions that did succeed is
                // impossible here because none did.
                self.queue
                    .fail_and_reschedule(job, "all subscriptions failed", now)
                    .await?;
            }
            _ => self.queue.complete(&job.job_id, now).await?,
        }

        debug!(outcome = outcome.as_str(), delivered, attempted, "push fan-out done");
        Ok(outcome)
    }
}
