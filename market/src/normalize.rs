use model::{Country, ItemRef, NormalizedListing};
use pricing::{CostError, CostInputs, landed_cost};
use thiserror::Error;

use crate::types::RawListing;

/// Per-listing normalization failures are policy, not faults: the listing
/// is dropped and the scan continues.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("listing states no ship-from location")]
    MissingShipFrom,

    #[error(transparent)]
    Cost(#[from] CostError),
}

/// Annotates a raw candidate with landed cost and identity, producing the
/// single tagged shape every downstream stage consumes.
pub fn normalize_listing(
    raw: &RawListing,
    item: &ItemRef,
    ship_to: Country,
    piece_count: Option<u32>,
    fetched_at_ms: i64,
) -> Result<NormalizedListing, NormalizeError> {
    let ship_from = raw.ship_from.ok_or(NormalizeError::MissingShipFrom)?;

    let cost = landed_cost(&CostInputs {
        source: raw.source,
        price_original: raw.price_original,
        shipping_original: raw.shipping_original,
        currency_original: &raw.currency_original,
        ship_from,
        ship_to,
        item_kind: item.kind,
        piece_count,
        seller_name: &raw.seller_username,
    })?;

    let fingerprint = filter::fingerprint(
        raw.source,
        raw.seller_id.as_deref(),
        &raw.title,
        cost.price,
    );

    Ok(NormalizedListing {
        source: raw.source,
        listing_id: raw.listing_id.clone(),
        scanned_for: ship_to,
        item: item.clone(),
        title: raw.title.clone(),
        url: raw.url.clone(),
        image_url: raw.image_url.clone(),
        seller_id: raw
            .seller_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        seller_username: raw.seller_username.clone(),
        seller_rating: raw.seller_rating,
        seller_feedback: raw.seller_feedback,
        ship_from,
        condition: raw.condition,
        price: cost.price,
        shipping: cost.shipping,
        shipping_estimated: cost.shipping_estimated,
        import_charges: cost.import_charges,
        import_estimated: cost.import_estimated,
        total: cost.total,
        currency_original: raw.currency_original.clone(),
        price_original: raw.price_original,
        shipping_original: raw.shipping_original.unwrap_or(0.0),
        fingerprint,
        fetched_at_ms,
        is_active: true,
    })
}
