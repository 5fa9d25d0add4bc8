use filter::ConditionPref;
use model::Country;
use sqlx::{AnyPool, Row};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::rows::{
    NewWatch, ScanGroup, Watch, WatchStatus, countries_from_csv, countries_to_csv, item_from_row,
    words_from_csv, words_to_csv,
};

/// Watches and their scan-group aggregation.
pub struct WatchRepo {
    pool: AnyPool,
}

impl WatchRepo {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Creates (or revives) a watch.
    ///
    /// One transaction: the item row is upserted, the user's country read
    /// for the allowlist default, and the watch inserted. A second watch on
    /// the same (user, item) updates the existing row instead; the unique
    /// constraint is the arbiter, not a pre-read.
    #[instrument(skip(self, new), fields(user_id = %new.user_id, item = %new.item))]
    pub async fn create(&self, new: &NewWatch, now_ms: i64) -> anyhow::Result<Watch> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
INSERT INTO items (kind, item_id, updated_ms) VALUES (?, ?, ?)
ON CONFLICT (kind, item_id) DO NOTHING;
"#,
        )
        .bind(new.item.kind.as_str())
        .bind(&new.item.id)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        let country_row = sqlx::query(r#"SELECT country FROM users WHERE user_id = ?;"#)
            .bind(&new.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        let country = country_row
            .and_then(|r| Country::parse(&r.get::<String, _>("country")))
            .ok_or_else(|| anyhow::anyhow!("user {} has no usable country", new.user_id))?;

        let allow = countries_to_csv(&country.default_allowlist());
        let watch_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
INSERT INTO watches (watch_id, user_id, kind, item_id, target_price, min_price,
                     condition, ship_from_allow, source_ebay, source_brickowl,
                     status, created_ms)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, 'active', ?)
ON CONFLICT (user_id, kind, item_id) DO UPDATE SET
  target_price = excluded.target_price,
  min_price = excluded.min_price,
  condition = excluded.condition,
  source_brickowl = excluded.source_brickowl,
  status = 'active',
  snoozed_until_ms = NULL;
"#,
        )
        .bind(&watch_id)
        .bind(&new.user_id)
        .bind(new.item.kind.as_str())
        .bind(&new.item.id)
        .bind(new.target_price)
        .bind(new.min_price)
        .bind(new.condition.as_str())
        .bind(&allow)
        .bind(new.source_brickowl as i32)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let watch = self
            .fetch_by_user_item(&new.user_id, &new.item)
            .await?
            .ok_or_else(|| anyhow::anyhow!("watch vanished after create"))?;
        info!(watch_id = %watch.watch_id, "watch active");
        Ok(watch)
    }

    pub async fn fetch_by_user_item(
        &self,
        user_id: &str,
        item: &model::ItemRef,
    ) -> anyhow::Result<Option<Watch>> {
        let row = sqlx::query(&format!("{SELECT_WATCH} WHERE user_id = ? AND kind = ? AND item_id = ?;"))
            .bind(user_id)
            .bind(item.kind.as_str())
            .bind(&item.id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => Ok(Some(row_to_watch(&r)?)),
            None => Ok(None),
        }
    }

    pub async fn set_status(&self, watch_id: &str, status: WatchStatus) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE watches SET status = ? WHERE watch_id = ?;"#)
            .bind(status.as_str())
            .bind(watch_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn snooze(&self, watch_id: &str, until_ms: i64) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE watches SET snoozed_until_ms = ? WHERE watch_id = ?;"#)
            .bind(until_ms)
            .bind(watch_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn bump_alert_counter(&self, watch_id: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE watches SET alerts_sent = alerts_sent + 1 WHERE watch_id = ?;"#)
            .bind(watch_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// User-edited filter fields; the operator surface calls this.
    pub async fn update_constraints(
        &self,
        watch_id: &str,
        ship_from_allow: &[Country],
        exclude_words: &[String],
        min_seller_rating: Option<f64>,
        min_seller_feedback: Option<i64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
UPDATE watches SET ship_from_allow = ?, exclude_words = ?,
                   min_seller_rating = ?, min_seller_feedback = ?
WHERE watch_id = ?;
"#,
        )
        .bind(countries_to_csv(ship_from_allow))
        .bind(words_to_csv(exclude_words))
        .bind(min_seller_rating)
        .bind(min_seller_feedback)
        .bind(watch_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Active watches grouped by (item, buyer country), priority first.
    /// One group is one provider query serving all of its watchers.
    #[instrument(skip(self))]
    pub async fn scan_groups(&self, now_ms: i64) -> anyhow::Result<Vec<ScanGroup>> {
        let rows = common::warn_if_slow(
            "db_scan_groups",
            std::time::Duration::from_millis(250),
            sqlx::query(
                r#"
SELECT w.kind, w.item_id, u.country AS ship_to,
       COUNT(*) AS watcher_count,
       MAX(u.scan_priority) AS max_priority,
       MAX(w.source_brickowl) AS any_brickowl
FROM watches w
JOIN users u ON u.user_id = w.user_id
WHERE w.status = 'active'
  AND (w.snoozed_until_ms IS NULL OR w.snoozed_until_ms <= ?)
GROUP BY w.kind, w.item_id, u.country
ORDER BY max_priority DESC, watcher_count DESC;
"#,
            )
            .bind(now_ms)
            .fetch_all(&self.pool),
        )
        .await?;

        let mut out = Vec::new();
        for r in rows {
            let kind: String = r.get("kind");
            let item_id: String = r.get("item_id");
            let ship_to_code: String = r.get("ship_to");
            let Some(ship_to) = Country::parse(&ship_to_code) else {
                warn!(country = %ship_to_code, "group with unknown buyer country skipped");
                continue;
            };
            match item_from_row(&kind, &item_id) {
                Ok(item) => out.push(ScanGroup {
                    item,
                    ship_to,
                    watcher_count: r.get("watcher_count"),
                    max_priority: r.get::<i64, _>("max_priority") as i32,
                    any_brickowl: r.get::<i64, _>("any_brickowl") != 0,
                }),
                Err(e) => warn!(error = %e, "skipping malformed group row"),
            }
        }
        Ok(out)
    }

    /// All active watchers inside one scan group.
    pub async fn watchers_in_group(
        &self,
        item: &model::ItemRef,
        ship_to: Country,
        now_ms: i64,
    ) -> anyhow::Result<Vec<Watch>> {
        let rows = sqlx::query(&format!(
            r#"{SELECT_WATCH}
JOIN users u ON u.user_id = watches.user_id
WHERE watches.kind = ? AND watches.item_id = ? AND u.country = ?
  AND watches.status = 'active'
  AND (watches.snoozed_until_ms IS NULL OR watches.snoozed_until_ms <= ?);"#
        ))
        .bind(item.kind.as_str())
        .bind(&item.id)
        .bind(ship_to.as_str())
        .bind(now_ms)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_watch(&r) {
                Ok(w) => out.push(w),
                Err(e) => warn!(error = %e, "skipping malformed watch row"),
            }
        }
        Ok(out)
    }
}

pub(crate) const SELECT_WATCH: &str = r#"
SELECT watches.watch_id, watches.user_id, watches.kind, watches.item_id,
       watches.target_price, watches.min_price, watches.condition,
       watches.ship_from_allow, watches.min_seller_rating, watches.min_seller_feedback,
       watches.exclude_words, watches.source_ebay, watches.source_brickowl,
       watches.status, watches.snoozed_until_ms, watches.alerts_sent, watches.created_ms
FROM watches"#;

pub(crate) fn row_to_watch(r: &sqlx::any::AnyRow) -> anyhow::Result<Watch> {
    let kind: String = r.get("kind");
    let item_id: String = r.get("item_id");
    let condition_s: String = r.get("condition");
    let status_s: String = r.get("status");

    Ok(Watch {
        watch_id: r.get("watch_id"),
        user_id: r.get("user_id"),
        item: item_from_row(&kind, &item_id)?,
        target_price: r.get("target_price"),
        min_price: r.get("min_price"),
        condition: ConditionPref::parse(&condition_s)
            .ok_or_else(|| anyhow::anyhow!("unknown condition pref: {condition_s}"))?,
        ship_from_allow: countries_from_csv(&r.get::<String, _>("ship_from_allow")),
        min_seller_rating: r.get("min_seller_rating"),
        min_seller_feedback: r.get("min_seller_feedback"),
        exclude_words: words_from_csv(&r.get::<String, _>("exclude_words")),
        source_ebay: r.get::<i64, _>("source_ebay") != 0,
        source_brickowl: r.get::<i64, _>("source_brickowl") != 0,
        status: WatchStatus::parse(&status_s)
            .ok_or_else(|| anyhow::anyhow!("unknown watch status: {status_s}"))?,
        snoozed_until_ms: r.get("snoozed_until_ms"),
        alerts_sent: r.get("alerts_sent"),
        created_ms: r.get("created_ms"),
    })
}
