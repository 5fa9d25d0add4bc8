use model::{Condition, Country, Source};

/// A candidate listing as an adapter saw it, before costing and filtering.
///
/// Adapters are responsible for emitting exactly this shape; everything
/// marketplace-specific (wire DTOs, condition ids, lot maps) stops here.
#[derive(Clone, Debug)]
pub struct RawListing {
    pub source: Source,
    pub listing_id: String,
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,

    pub seller_id: Option<String>,
    pub seller_username: String,
    /// Positive-feedback percentage on eBay; unavailable on BrickOwl.
    pub seller_rating: Option<f64>,
    pub seller_feedback: Option<i64>,

    /// `None` when the marketplace did not state a location; normalization
    /// drops such candidates.
    pub ship_from: Option<Country>,
    pub condition: Condition,

    pub price_original: f64,
    /// Quoted shipping to the scanned destination, original currency.
    pub shipping_original: Option<f64>,
    pub currency_original: String,
}
