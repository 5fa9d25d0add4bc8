//! Notification-type derivation and payload assembly.

use model::{AlertPayload, NormalizedListing, NotificationType};
use pricing::round2;
use store::{NotificationState, UserWindowCounts};

/// Per-user alert throttles; counters come from the watch store.
pub const MAX_ALERTS_PER_DAY: i64 = 20;
pub const MAX_ALERTS_PER_HOUR: i64 = 8;
pub const MAX_ALERTS_PER_10_MIN: i64 = 3;
pub const MAX_ALERTS_PER_ITEM_DAY: i64 = 5;

pub fn throttled(counts: &UserWindowCounts) -> bool {
    counts.today >= MAX_ALERTS_PER_DAY
        || counts.this_hour >= MAX_ALERTS_PER_HOUR
        || counts.last_10_min >= MAX_ALERTS_PER_10_MIN
        || counts.per_item_today >= MAX_ALERTS_PER_ITEM_DAY
}

/// Why this watcher is being notified, relative to the last state.
///
/// - no prior state                         → `First`
/// - same listing, lower total              → `PriceDrop`
/// - same listing, not lower                → suppress (`None`)
/// - different listing, prior still offered → `BetterDeal` when cheaper,
///   otherwise suppress
/// - different listing, prior gone          → `PreviousSold`
pub fn derive_type(
    prior: Option<&NotificationState>,
    candidate: &NormalizedListing,
    prior_still_listed: bool,
) -> Option<NotificationType> {
    let Some(prior) = prior else {
        return Some(NotificationType::First);
    };

    if prior.listing_id == candidate.listing_id {
        if candidate.total < prior.notified_price {
            return Some(NotificationType::PriceDrop);
        }
        return None;
    }

    if !prior_still_listed {
        return Some(NotificationType::PreviousSold);
    }
    if candidate.total < prior.notified_price {
        return Some(NotificationType::BetterDeal);
    }
    None
}

pub fn reason_text(nt: NotificationType) -> &'static str {
    match nt {
        NotificationType::First => "first deal under target",
        NotificationType::PriceDrop => "price dropped on the listing you were notified about",
        NotificationType::BetterDeal => "a better deal appeared",
        NotificationType::PreviousSold => "the previous deal sold; this is the next best",
        NotificationType::Reminder => "still available below your target",
    }
}

pub fn build_payload(
    nt: NotificationType,
    listing: &NormalizedListing,
    item_name: Option<&str>,
    target: f64,
) -> AlertPayload {
    let savings_abs = round2(target - listing.total);
    let savings_pct = if target > 0.0 {
        round2((target - listing.total) / target * 100.0)
    } else {
        0.0
    };

    AlertPayload {
        notification_type: nt,
        item_ref: listing.item.clone(),
        item_name: item_name.map(str::to_string),
        price: listing.price,
        shipping: listing.shipping,
        import: listing.import_charges,
        total: listing.total,
        currency_original: listing.currency_original.clone(),
        target,
        savings_abs,
        savings_pct,
        ship_from_country: listing.ship_from.as_str().to_string(),
        condition: listing.condition.as_str().to_string(),
        seller_name: listing.seller_username.clone(),
        listing_url: listing.url.clone(),
        is_estimate: listing.is_estimate(),
        notification_reason: reason_text(nt).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use model::{Condition, Country, ItemRef, Source};

    use super::*;

    fn listing(id: &str, total: f64) -> NormalizedListing {
        NormalizedListing {
            source: Source::Ebay,
            listing_id: id.to_string(),
            scanned_for: Country::De,
            item: ItemRef::set("75192"),
            title: "LEGO 75192".into(),
            url: "https://x.test".into(),
            image_url: None,
            seller_id: "s".into(),
            seller_username: "s".into(),
            seller_rating: None,
            seller_feedback: None,
            ship_from: Country::De,
            condition: Condition::New,
            price: total,
            shipping: 0.0,
            shipping_estimated: false,
            import_charges: 0.0,
            import_estimated: false,
            total,
            currency_original: "EUR".into(),
            price_original: total,
            shipping_original: 0.0,
            fingerprint: "f".into(),
            fetched_at_ms: 0,
            is_active: true,
        }
    }

    fn state(listing_id: &str, price: f64) -> NotificationState {
        NotificationState {
            watch_id: "w".into(),
            listing_id: listing_id.to_string(),
            notified_ms: 0,
            notified_price: price,
            reminder_count: 0,
            last_reminder_ms: None,
        }
    }

    #[test]
    fn no_prior_is_first() {
        assert_eq!(
            derive_type(None, &listing("a", 100.0), true),
            Some(NotificationType::First)
        );
    }

    #[test]
    fn same_listing_lower_price_is_price_drop() {
        let prior = state("a", 120.0);
        assert_eq!(
            derive_type(Some(&prior), &listing("a", 100.0), true),
            Some(NotificationType::PriceDrop)
        );
        assert_eq!(derive_type(Some(&prior), &listing("a", 120.0), true), None);
    }

    #[test]
    fn different_listing_cases() {
        let prior = state("a", 120.0);
        assert_eq!(
            derive_type(Some(&prior), &listing("b", 100.0), true),
            Some(NotificationType::BetterDeal)
        );
        assert_eq!(derive_type(Some(&prior), &listing("b", 130.0), true), None);
        assert_eq!(
            derive_type(Some(&prior), &listing("b", 130.0), false),
            Some(NotificationType::PreviousSold)
        );
    }

    #[test]
    fn throttle_caps() {
        let mut counts = UserWindowCounts::default();
        assert!(!throttled(&counts));
        counts.this_hour = MAX_ALERTS_PER_HOUR;
        assert!(throttled(&counts));
    }
}
