use serde::{Deserialize, Serialize};

use crate::country::Country;
use crate::item::ItemRef;

/// Marketplace a listing was scanned from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Ebay,
    #[serde(rename = "brickowl")]
    BrickOwl,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ebay => "ebay",
            Source::BrickOwl => "brickowl",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ebay" => Some(Source::Ebay),
            "brickowl" => Some(Source::BrickOwl),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Used,
    Unknown,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
            Condition::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Condition::New),
            "used" => Some(Condition::Used),
            "unknown" => Some(Condition::Unknown),
            _ => None,
        }
    }
}

/// A marketplace candidate after normalization.
///
/// All monetary fields are canonical EUR for comparison; `*_original` keep
/// the seller's figures for display. Invariant:
/// `total == round2(price + shipping + import_charges)`.
///
/// The fingerprint is a function of (source, seller, title prefix, price
/// bucket) only; shipping and destination never feed into it, so the same
/// offer scanned for two countries deduplicates to one identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub source: Source,
    pub listing_id: String,
    pub scanned_for: Country,
    pub item: ItemRef,

    pub title: String,
    pub url: String,
    pub image_url: Option<String>,

    pub seller_id: String,
    pub seller_username: String,
    pub seller_rating: Option<f64>,
    pub seller_feedback: Option<i64>,

    pub ship_from: Country,
    pub condition: Condition,

    pub price: f64,
    pub shipping: f64,
    pub shipping_estimated: bool,
    pub import_charges: f64,
    pub import_estimated: bool,
    pub total: f64,

    pub currency_original: String,
    pub price_original: f64,
    pub shipping_original: f64,

    pub fingerprint: String,
    pub fetched_at_ms: i64,
    pub is_active: bool,
}

impl NormalizedListing {
    /// True when any monetary component was estimated rather than quoted.
    pub fn is_estimate(&self) -> bool {
        self.shipping_estimated || self.import_estimated
    }
}
