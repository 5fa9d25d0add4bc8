use sqlx::AnyPool;

/// One aggregated row per (day, item, condition, source, region).
#[derive(Clone, Debug, PartialEq)]
pub struct DailyPriceRow {
    pub day: String,
    pub kind: String,
    pub item_id: String,
    pub condition: String,
    pub source: String,
    pub region: String,
    pub min_total: f64,
    pub avg_total: f64,
    pub max_total: f64,
    pub listing_count: i64,
}

pub struct PriceHistoryRepo {
    pool: AnyPool,
}

impl PriceHistoryRepo {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Replaces the day's row wholesale. Re-running the snapshot job for
    /// the same day is idempotent; there is no average-of-averages merge.
    pub async fn upsert_day(&self, row: &DailyPriceRow) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO price_history_daily (day, kind, item_id, condition, source, region,
                                 min_total, avg_total, max_total, listing_count)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (day, kind, item_id, condition, source, region) DO UPDATE SET
  min_total = excluded.min_total,
  avg_total = excluded.avg_total,
  max_total = excluded.max_total,
  listing_count = excluded.listing_count;
"#,
        )
        .bind(&row.day)
        .bind(&row.kind)
        .bind(&row.item_id)
        .bind(&row.condition)
        .bind(&row.source)
        .bind(&row.region)
        .bind(row.min_total)
        .bind(row.avg_total)
        .bind(row.max_total)
        .bind(row.listing_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
