use model::{AlertStatus, NormalizedListing, NotificationType};
use sqlx::{AnyPool, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::rows::{NotificationState, UserWindowCounts, Watch};
use crate::watches::{SELECT_WATCH, row_to_watch};

/// Outcome of an alert insert. Duplicates are the dedup mechanism working,
/// not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum AlertInsert {
    Inserted { alert_id: String },
    Duplicate,
}

#[derive(Clone, Debug)]
pub struct NewAlert<'a> {
    pub user_id: &'a str,
    pub watch_id: &'a str,
    pub listing: &'a NormalizedListing,
    pub target: f64,
    pub notification_type: NotificationType,
    pub scheduled_for_ms: Option<i64>,
    pub idempotency_key: &'a str,
    pub created_ms: i64,
}

/// A notification state joined with its watch, for the still-available
/// re-check job.
#[derive(Clone, Debug)]
pub struct ReminderCandidate {
    pub state: NotificationState,
    pub watch: Watch,
}

pub struct AlertRepo {
    pool: AnyPool,
}

impl AlertRepo {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Inserts an alert row; a duplicate idempotency key is a silent no-op.
    ///
    /// Uniqueness is enforced by the constraint, never by check-then-insert:
    /// two racing scans cannot both insert.
    #[instrument(skip(self, alert), fields(key = alert.idempotency_key))]
    pub async fn insert_idempotent(&self, alert: &NewAlert<'_>) -> anyhow::Result<AlertInsert> {
        let alert_id = Uuid::new_v4().to_string();
        let l = alert.listing;
        let delta_percent = if alert.target > 0.0 {
            ((alert.target - l.total) / alert.target) * 100.0
        } else {
            0.0
        };

        let result = sqlx::query(
            r#"
INSERT INTO alert_history (alert_id, user_id, watch_id, source, listing_id, scanned_for,
                           kind, item_id, price, shipping, total, target, delta_percent,
                           notification_type, status, scheduled_for_ms, created_ms,
                           idempotency_key, fingerprint)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?)
ON CONFLICT (idempotency_key) DO NOTHING;
"#,
        )
        .bind(&alert_id)
        .bind(alert.user_id)
        .bind(alert.watch_id)
        .bind(l.source.as_str())
        .bind(&l.listing_id)
        .bind(l.scanned_for.as_str())
        .bind(l.item.kind.as_str())
        .bind(&l.item.id)
        .bind(l.price)
        .bind(l.shipping)
        .bind(l.total)
        .bind(alert.target)
        .bind(delta_percent)
        .bind(alert.notification_type.as_str())
        .bind(alert.scheduled_for_ms)
        .bind(alert.created_ms)
        .bind(alert.idempotency_key)
        .bind(&l.fingerprint)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("idempotency conflict; alert suppressed");
            return Ok(AlertInsert::Duplicate);
        }
        Ok(AlertInsert::Inserted { alert_id })
    }

    pub async fn set_status(
        &self,
        alert_id: &str,
        status: AlertStatus,
        sent_ms: Option<i64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE alert_history SET status = ?, sent_ms = COALESCE(?, sent_ms) WHERE alert_id = ?;"#,
        )
        .bind(status.as_str())
        .bind(sent_ms)
        .bind(alert_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_channel_jobs(&self, alert_id: &str, jobs_csv: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE alert_history SET channel_jobs = ?, status = 'queued' WHERE alert_id = ?;"#)
            .bind(jobs_csv)
            .bind(alert_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Throttle counters over the standard windows, all UTC-based.
    pub async fn window_counts(
        &self,
        user_id: &str,
        item: &model::ItemRef,
        now_ms: i64,
    ) -> anyhow::Result<UserWindowCounts> {
        let day_start = now_ms - now_ms.rem_euclid(86_400_000);
        let hour_start = now_ms - now_ms.rem_euclid(3_600_000);
        let ten_min_ago = now_ms - 600_000;

        let row = sqlx::query(
            r#"
SELECT
  SUM(CASE WHEN created_ms >= ? THEN 1 ELSE 0 END) AS today,
  SUM(CASE WHEN created_ms >= ? THEN 1 ELSE 0 END) AS this_hour,
  SUM(CASE WHEN created_ms >= ? THEN 1 ELSE 0 END) AS last_10_min,
  SUM(CASE WHEN created_ms >= ? AND kind = ? AND item_id = ? THEN 1 ELSE 0 END) AS per_item_today,
  MIN(CASE WHEN created_ms >= ? THEN total ELSE NULL END) AS best_total_today
FROM alert_history
WHERE user_id = ? AND created_ms >= ?;
"#,
        )
        .bind(day_start)
        .bind(hour_start)
        .bind(ten_min_ago)
        .bind(day_start)
        .bind(item.kind.as_str())
        .bind(&item.id)
        .bind(day_start)
        .bind(user_id)
        .bind(day_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserWindowCounts {
            today: row.get::<Option<i64>, _>("today").unwrap_or(0),
            this_hour: row.get::<Option<i64>, _>("this_hour").unwrap_or(0),
            last_10_min: row.get::<Option<i64>, _>("last_10_min").unwrap_or(0),
            per_item_today: row.get::<Option<i64>, _>("per_item_today").unwrap_or(0),
            best_total_today: row.get("best_total_today"),
        })
    }

    /// Reminder suppression: was this fingerprint alerted to this user in
    /// the last `days` days?
    pub async fn alerted_within(
        &self,
        user_id: &str,
        fingerprint: &str,
        days: i64,
        now_ms: i64,
    ) -> anyhow::Result<bool> {
        let since = now_ms - days * 86_400_000;
        let row = sqlx::query(
            r#"
SELECT COUNT(*) AS n FROM alert_history
WHERE user_id = ? AND fingerprint = ? AND created_ms >= ?;
"#,
        )
        .bind(user_id)
        .bind(fingerprint)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("n") > 0)
    }

    /// Best alert per watch for a user since `since_ms`; digest input.
    pub async fn best_alerts_since(
        &self,
        user_id: &str,
        since_ms: i64,
    ) -> anyhow::Result<Vec<(String, String, f64, f64)>> {
        let rows = sqlx::query(
            r#"
SELECT kind, item_id, MIN(total) AS best_total, MAX(target) AS target
FROM alert_history
WHERE user_id = ? AND created_ms >= ?
GROUP BY kind, item_id;
"#,
        )
        .bind(user_id)
        .bind(since_ms)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                (
                    r.get("kind"),
                    r.get("item_id"),
                    r.get("best_total"),
                    r.get("target"),
                )
            })
            .collect())
    }

    // ---- watch notification state ----

    /// Records (or refreshes) the winning listing for a watch after a scan.
    pub async fn upsert_notification_state(
        &self,
        watch_id: &str,
        listing_id: &str,
        price: f64,
        now_ms: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO watch_notification_state (watch_id, listing_id, notified_ms, notified_price)
VALUES (?, ?, ?, ?)
ON CONFLICT (watch_id, listing_id) DO UPDATE SET
  notified_ms = excluded.notified_ms,
  notified_price = excluded.notified_price;
"#,
        )
        .bind(watch_id)
        .bind(listing_id)
        .bind(now_ms)
        .bind(price)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Latest notified listing for a watch; drives notification-type
    /// derivation.
    pub async fn latest_state(&self, watch_id: &str) -> anyhow::Result<Option<NotificationState>> {
        let row = sqlx::query(
            r#"
SELECT watch_id, listing_id, notified_ms, notified_price, reminder_count, last_reminder_ms
FROM watch_notification_state
WHERE watch_id = ?
ORDER BY notified_ms DESC
LIMIT 1;
"#,
        )
        .bind(watch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| row_to_state(&r)))
    }

    /// Still-available re-check candidates: notified at least `age_days`
    /// ago, under the reminder cap, and notably below target at notify
    /// time.
    #[instrument(skip(self))]
    pub async fn reminder_candidates(
        &self,
        age_days: i64,
        max_reminders: i64,
        price_factor: f64,
        now_ms: i64,
    ) -> anyhow::Result<Vec<ReminderCandidate>> {
        let cutoff = now_ms - age_days * 86_400_000;
        let sql = format!(
            r#"{SELECT_WATCH}
JOIN watch_notification_state s ON s.watch_id = watches.watch_id
WHERE s.notified_ms <= ?
  AND s.reminder_count < ?
  AND s.notified_price < watches.target_price * ?
  AND watches.status = 'active'
"#
        );
        // State columns ride along on a second query per watch id to keep
        // the row mapping simple and resilient.
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .bind(max_reminders)
            .bind(price_factor)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for r in rows {
            let watch = match row_to_watch(&r) {
                Ok(w) => w,
                Err(e) => {
                    warn!(error = %e, "skipping malformed reminder row");
                    continue;
                }
            };
            if let Some(state) = self.latest_state(&watch.watch_id).await? {
                out.push(ReminderCandidate { state, watch });
            }
        }
        Ok(out)
    }

    pub async fn bump_reminder(
        &self,
        watch_id: &str,
        listing_id: &str,
        now_ms: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
UPDATE watch_notification_state
SET reminder_count = reminder_count + 1, last_reminder_ms = ?
WHERE watch_id = ? AND listing_id = ?;
"#,
        )
        .bind(now_ms)
        .bind(watch_id)
        .bind(listing_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks a state as fully reminded so it stops being re-checked.
    pub async fn exhaust_reminders(
        &self,
        watch_id: &str,
        listing_id: &str,
        max_reminders: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
UPDATE watch_notification_state
SET reminder_count = ?
WHERE watch_id = ? AND listing_id = ?;
"#,
        )
        .bind(max_reminders)
        .bind(watch_id)
        .bind(listing_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_state(r: &sqlx::any::AnyRow) -> NotificationState {
    NotificationState {
        watch_id: r.get("watch_id"),
        listing_id: r.get("listing_id"),
        notified_ms: r.get("notified_ms"),
        notified_price: r.get("notified_price"),
        reminder_count: r.get::<i64, _>("reminder_count") as i32,
        last_reminder_ms: r.get("last_reminder_ms"),
    }
}
