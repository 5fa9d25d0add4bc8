//! Durable SQL-backed job queue.
//!
//! Jobs are rows; the queue database may be the main one or its own DSN.
//! Guarantees:
//! - enqueue is idempotent per job id (unique key, DO NOTHING)
//! - a job is claimed by exactly one worker (optimistic UPDATE ... WHERE
//!   status = 'queued'; losers see zero rows affected)
//! - failures re-enter with exponential backoff until attempts run out
//! - completed/failed rows are retained bounded for observability

use sqlx::{AnyPool, Row};
use tracing::{debug, instrument, warn};

use crate::types::{ClaimedJob, JobPayload, QueueName};

/// Retry policy defaults.
pub const DEFAULT_MAX_ATTEMPTS: i64 = 3;
pub const BACKOFF_BASE_MS: i64 = 2_000;

/// Retention per queue.
pub const KEEP_COMPLETED: i64 = 100;
pub const KEEP_FAILED: i64 = 500;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS dispatch_jobs (
  job_id TEXT PRIMARY KEY,
  queue TEXT NOT NULL,
  alert_id TEXT NOT NULL,
  recipient TEXT NOT NULL,
  payload TEXT NOT NULL,
  status TEXT NOT NULL DEFAULT 'queued',
  attempts INTEGER NOT NULL DEFAULT 0,
  max_attempts INTEGER NOT NULL,
  next_run_ms BIGINT NOT NULL,
  last_error TEXT,
  created_ms BIGINT NOT NULL,
  updated_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_jobs_queue_due ON dispatch_jobs(queue, status, next_run_ms);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(Clone)]
pub struct DispatchQueue {
    pool: AnyPool,
}

impl DispatchQueue {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Enqueues a job; a second enqueue with the same job id is a no-op.
    /// `delay_ms` defers the first run (quiet hours).
    #[instrument(skip(self, payload), fields(job_id, queue = queue.as_str(), delay_ms))]
    pub async fn enqueue(
        &self,
        job_id: &str,
        queue: QueueName,
        payload: &JobPayload,
        delay_ms: i64,
        now_ms: i64,
    ) -> anyhow::Result<bool> {
        let body = serde_json::to_string(payload)?;
        let result = sqlx::query(
            r#"
INSERT INTO dispatch_jobs (job_id, queue, alert_id, recipient, payload, status,
                           attempts, max_attempts, next_run_ms, created_ms, updated_ms)
VALUES (?, ?, ?, ?, ?, 'queued', 0, ?, ?, ?, ?)
ON CONFLICT (job_id) DO NOTHING;
"#,
        )
        .bind(job_id)
        .bind(queue.as_str())
        .bind(&payload.alert_id)
        .bind(&payload.recipient)
        .bind(&body)
        .bind(DEFAULT_MAX_ATTEMPTS)
        .bind(now_ms + delay_ms.max(0))
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!("job already enqueued; collapsed");
        }
        Ok(inserted)
    }

    /// Claims the next due job, or `None`. Safe under concurrent workers.
    pub async fn claim_one(
        &self,
        queue: QueueName,
        now_ms: i64,
    ) -> anyhow::Result<Option<ClaimedJob>> {
        // A few optimistic rounds: another worker may win the UPDATE race.
        for _ in 0..3 {
            let candidate = sqlx::query(
                r#"
SELECT job_id FROM dispatch_jobs
WHERE queue = ? AND status = 'queued' AND next_run_ms <= ?
ORDER BY next_run_ms
LIMIT 1;
"#,
            )
            .bind(queue.as_str())
            .bind(now_ms)
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = candidate else {
                return Ok(None);
            };
            let job_id: String = row.get("job_id");

            let won = sqlx::query(
                r#"
UPDATE dispatch_jobs
SET status = 'active', attempts = attempts + 1, updated_ms = ?
WHERE job_id = ? AND status = 'queued';
"#,
            )
            .bind(now_ms)
            .bind(&job_id)
            .execute(&self.pool)
            .await?;

            if won.rows_affected() == 0 {
                continue;
            }

            let row = sqlx::query(
                r#"
SELECT job_id, queue, attempts, max_attempts, payload
FROM dispatch_jobs WHERE job_id = ?;
"#,
            )
            .bind(&job_id)
            .fetch_one(&self.pool)
            .await?;

            let payload_raw: String = row.get("payload");
            let payload: JobPayload = match serde_json::from_str(&payload_raw) {
                Ok(p) => p,
                Err(e) => {
                    // Poison job: park it as failed instead of looping.
                    warn!(job_id = %job_id, error = %e, "unparseable job payload; failing job");
                    self.mark_failed(&job_id, "unparseable payload", now_ms).await?;
                    continue;
                }
            };

            return Ok(Some(ClaimedJob {
                job_id,
                queue,
                attempts: row.get("attempts"),
                max_attempts: row.get("max_attempts"),
                payload,
            }));
        }
        Ok(None)
    }

    pub async fn complete(&self, job_id: &str, now_ms: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE dispatch_jobs SET status = 'completed', updated_ms = ? WHERE job_id = ?;"#,
        )
        .bind(now_ms)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Permanent failure: no more retries regardless of attempts left.
    pub async fn mark_failed(&self, job_id: &str, error: &str, now_ms: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE dispatch_jobs SET status = 'failed', last_error = ?, updated_ms = ? WHERE job_id = ?;"#,
        )
        .bind(error)
        .bind(now_ms)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Retryable failure: re-queue with exponential backoff, or park as
    /// failed when attempts are exhausted. Returns true when a retry is
    /// scheduled.
    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    pub async fn fail_and_reschedule(
        &self,
        job: &ClaimedJob,
        error: &str,
        now_ms: i64,
    ) -> anyhow::Result<bool> {
        if job.attempts >= job.max_attempts {
            self.mark_failed(&job.job_id, error, now_ms).await?;
            return Ok(false);
        }

        let delay = BACKOFF_BASE_MS << (job.attempts - 1).max(0);
        sqlx::query(
            r#"
UPDATE dispatch_jobs
SET status = 'queued', last_error = ?, next_run_ms = ?, updated_ms = ?
WHERE job_id = ?;
"#,
        )
        .bind(error)
        .bind(now_ms + delay)
        .bind(now_ms)
        .bind(&job.job_id)
        .execute(&self.pool)
        .await?;
        debug!(delay_ms = delay, attempt = job.attempts, "job rescheduled");
        Ok(true)
    }

    /// Prunes finished rows past the retention caps, oldest first.
    pub async fn prune(&self, queue: QueueName) -> anyhow::Result<()> {
        for (status, keep) in [("completed", KEEP_COMPLETED), ("failed", KEEP_FAILED)] {
            sqlx::query(
                r#"
DELETE FROM dispatch_jobs
WHERE queue = ? AND status = ?
  AND job_id NOT IN (
    SELECT job_id FROM dispatch_jobs
    WHERE queue = ? AND status = ?
    ORDER BY updated_ms DESC
    LIMIT ?
  );
"#,
            )
            .bind(queue.as_str())
            .bind(status)
            .bind(queue.as_str())
            .bind(status)
            .bind(keep)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Observability: queued + active depth of a queue.
    pub async fn depth(&self, queue: QueueName) -> anyhow::Result<i64> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM dispatch_jobs WHERE queue = ? AND status IN ('queued', 'active');"#,
        )
        .bind(queue.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }
}
