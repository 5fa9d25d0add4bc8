//! Still-available reminders.
//!
//! Daily pass over notification states that were well under target a few
//! days ago: re-check the marketplace, and either remind the watcher the
//! deal is still live or mark the state so it stops being re-checked.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use market::normalize_listing;
use model::NotificationType;
use scheduler::EbayPort;
use store::{NewAlert, Store};
use tracing::{debug, info, instrument, warn};

/// Re-check states notified at least this many days ago.
pub const REMINDER_AGE_DAYS: i64 = 3;
/// At most this many reminders per (watch, listing).
pub const MAX_REMINDERS: i64 = 2;
/// Only deals that were at least 20% under target qualify.
pub const PRICE_FACTOR: f64 = 0.8;

const RECHECK_PAGE: u32 = 50;

#[instrument(skip(store, queue, ebay))]
pub async fn run_reminders(
    store: &Store,
    queue: &dispatch::DispatchQueue,
    ebay: Arc<dyn EbayPort>,
    push_enabled: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let now_ms = now.timestamp_millis();
    let candidates = store
        .alerts
        .reminder_candidates(REMINDER_AGE_DAYS, MAX_REMINDERS, PRICE_FACTOR, now_ms)
        .await?;

    let mut reminded = 0usize;
    for candidate in &candidates {
        let watch = &candidate.watch;
        let state = &candidate.state;

        let Some(user) = store.users.fetch(&watch.user_id).await? else {
            continue;
        };

        // Re-check the marketplace for the remembered listing.
        let raws = match ebay
            .search(&watch.item, user.country, RECHECK_PAGE, 0)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(watch_id = %watch.watch_id, error = %e, "re-check failed; retried next run");
                continue;
            }
        };

        let piece_count = store
            .items
            .fetch(&watch.item)
            .await?
            .and_then(|r| r.piece_count);

        let still_good = raws
            .iter()
            .filter(|raw| raw.listing_id == state.listing_id)
            .filter_map(|raw| {
                normalize_listing(raw, &watch.item, user.country, piece_count, now_ms).ok()
            })
            .find(|l| l.total <= watch.target_price);

        let Some(listing) = still_good else {
            debug!(watch_id = %watch.watch_id, listing_id = %state.listing_id,
                   "deal gone or over target; reminders exhausted");
            store
                .alerts
                .exhaust_reminders(&watch.watch_id, &state.listing_id, MAX_REMINDERS)
                .await?;
            continue;
        };

        let key = filter::idempotency_key(
            listing.source,
            &watch.user_id,
            &listing.fingerprint,
            now.date_naive(),
        );
        let inserted = store
            .alerts
            .insert_idempotent(&NewAlert {
                user_id: &watch.user_id,
                watch_id: &watch.watch_id,
                listing: &listing,
                target: watch.target_price,
                notification_type: NotificationType::Reminder,
                scheduled_for_ms: None,
                idempotency_key: &key,
                created_ms: now_ms,
            })
            .await?;

        // Bump regardless of dedup: a conflict means the user already heard
        // about this deal today.
        store
            .alerts
            .bump_reminder(&watch.watch_id, &state.listing_id, now_ms)
            .await?;

        if let store::AlertInsert::Inserted { alert_id } = inserted {
            let payload = scheduler::build_payload(
                NotificationType::Reminder,
                &listing,
                None,
                watch.target_price,
            );
            // Reminder enqueue honors quiet hours like any other alert.
            dispatch::enqueue_alert(queue, store, &user, &alert_id, &payload, push_enabled, now)
                .await?;
            reminded += 1;
        }
    }

    info!(candidates = candidates.len(), reminded, "reminder pass finished");
    Ok(reminded)
}
