use model::{Country, ItemRef, NormalizedListing, Source};
use sqlx::{AnyPool, Row};
use tracing::{debug, instrument};

/// Listing rows, keyed by (source, listing_id, scanned_for).
pub struct ListingRepo {
    pool: AnyPool,
}

impl ListingRepo {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Upserts one scan batch. Re-seen listings refresh price and activity;
    /// the fetched stamp is what `mark_absent_inactive` keys on afterward.
    #[instrument(skip(self, listings), fields(count = listings.len()))]
    pub async fn upsert_batch(&self, listings: &[NormalizedListing]) -> anyhow::Result<()> {
        for l in listings {
            sqlx::query(
                r#"
INSERT INTO listings (source, listing_id, scanned_for, kind, item_id, title, url, image_url,
                      seller_id, seller_username, seller_rating, seller_feedback, ship_from,
                      condition, price, shipping, shipping_estimated, import_charges,
                      import_estimated, total, currency_original, price_original,
                      shipping_original, fingerprint, fetched_ms, is_active)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
ON CONFLICT (source, listing_id, scanned_for) DO UPDATE SET
  title = excluded.title,
  price = excluded.price,
  shipping = excluded.shipping,
  shipping_estimated = excluded.shipping_estimated,
  import_charges = excluded.import_charges,
  import_estimated = excluded.import_estimated,
  total = excluded.total,
  price_original = excluded.price_original,
  shipping_original = excluded.shipping_original,
  fingerprint = excluded.fingerprint,
  fetched_ms = excluded.fetched_ms,
  is_active = 1;
"#,
            )
            .bind(l.source.as_str())
            .bind(&l.listing_id)
            .bind(l.scanned_for.as_str())
            .bind(l.item.kind.as_str())
            .bind(&l.item.id)
            .bind(&l.title)
            .bind(&l.url)
            .bind(&l.image_url)
            .bind(&l.seller_id)
            .bind(&l.seller_username)
            .bind(l.seller_rating)
            .bind(l.seller_feedback)
            .bind(l.ship_from.as_str())
            .bind(l.condition.as_str())
            .bind(l.price)
            .bind(l.shipping)
            .bind(l.shipping_estimated as i32)
            .bind(l.import_charges)
            .bind(l.import_estimated as i32)
            .bind(l.total)
            .bind(&l.currency_original)
            .bind(l.price_original)
            .bind(l.shipping_original)
            .bind(&l.fingerprint)
            .bind(l.fetched_at_ms)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Marks listings of this (item, destination) that the scan did not
    /// re-see as inactive. `cycle_ms` is the batch's fetched stamp.
    pub async fn mark_absent_inactive(
        &self,
        item: &ItemRef,
        scanned_for: Country,
        cycle_ms: i64,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
UPDATE listings SET is_active = 0
WHERE kind = ? AND item_id = ? AND scanned_for = ? AND fetched_ms < ? AND is_active = 1;
"#,
        )
        .bind(item.kind.as_str())
        .bind(&item.id)
        .bind(scanned_for.as_str())
        .bind(cycle_ms)
        .execute(&self.pool)
        .await?;
        let deactivated = result.rows_affected();
        if deactivated > 0 {
            debug!(deactivated, "listings no longer offered");
        }
        Ok(deactivated)
    }

    /// Is a given listing currently active anywhere? Used by the reminder
    /// job to decide `previous_sold`.
    pub async fn is_active(&self, source: Source, listing_id: &str) -> anyhow::Result<bool> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM listings WHERE source = ? AND listing_id = ? AND is_active = 1;"#,
        )
        .bind(source.as_str())
        .bind(listing_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("n") > 0)
    }

    /// Raw stats rows for the daily snapshot: every active listing's total
    /// with its aggregation key. Aggregation happens in the job so region
    /// mapping stays in code.
    pub async fn active_totals(
        &self,
        kind: model::ItemKind,
    ) -> anyhow::Result<Vec<(String, String, String, String, f64)>> {
        let rows = sqlx::query(
            r#"
SELECT item_id, condition, source, scanned_for, total
FROM listings
WHERE kind = ? AND is_active = 1;
"#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                (
                    r.get("item_id"),
                    r.get("condition"),
                    r.get("source"),
                    r.get("scanned_for"),
                    r.get("total"),
                )
            })
            .collect())
    }

    /// Deletes deal rows whose validity window lapsed.
    pub async fn delete_expired(&self, now_ms: i64) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"DELETE FROM listings WHERE expires_at_ms IS NOT NULL AND expires_at_ms < ?;"#,
        )
        .bind(now_ms)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
