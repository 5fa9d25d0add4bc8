//! Daily price snapshot: one aggregate row per (item, condition, source,
//! region) per UTC day, recomputed wholesale from current active listings.

use std::collections::HashMap;

use chrono::NaiveDate;
use model::{Block, Country, ItemKind};
use store::{DailyPriceRow, Store};
use tracing::{error, info, instrument};

fn region_of(country_code: &str) -> Option<&'static str> {
    match Country::parse(country_code)?.block() {
        Block::EuUk => Some("EU"),
        Block::NorthAmerica => Some("NA"),
    }
}

/// Snapshots both kinds. Sets and minifigs are independent: a failure in
/// one is logged and must not prevent the other.
#[instrument(skip(store))]
pub async fn run_daily_snapshot(store: &Store, day: NaiveDate) -> anyhow::Result<()> {
    let mut last_err = None;

    for kind in [ItemKind::Set, ItemKind::Minifig] {
        if let Err(e) = snapshot_kind(store, kind, day).await {
            error!(kind = kind.as_str(), error = ?e, "snapshot failed for kind");
            last_err = Some(e);
        }
    }

    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn snapshot_kind(store: &Store, kind: ItemKind, day: NaiveDate) -> anyhow::Result<()> {
    let totals = store.listings.active_totals(kind).await?;

    // (item, condition, source, region) → totals seen today.
    let mut buckets: HashMap<(String, String, String, &'static str), Vec<f64>> = HashMap::new();
    for (item_id, condition, source, scanned_for, total) in totals {
        let Some(region) = region_of(&scanned_for) else {
            continue;
        };
        buckets
            .entry((item_id, condition, source, region))
            .or_default()
            .push(total);
    }

    let day_str = day.format("%Y-%m-%d").to_string();
    let rows = buckets.len();
    for ((item_id, condition, source, region), totals) in buckets {
        let count = totals.len() as i64;
        let min = totals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = totals.iter().sum::<f64>() / count as f64;

        store
            .price_history
            .upsert_day(&DailyPriceRow {
                day: day_str.clone(),
                kind: kind.as_str().to_string(),
                item_id,
                condition,
                source,
                region: region.to_string(),
                min_total: (min * 100.0).round() / 100.0,
                avg_total: (avg * 100.0).round() / 100.0,
                max_total: (max * 100.0).round() / 100.0,
                listing_count: count,
            })
            .await?;
    }

    info!(kind = kind.as_str(), rows, "daily snapshot written");
    Ok(())
}
