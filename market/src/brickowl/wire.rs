//! BrickOwl API response shapes.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CatalogSearchResponse {
    #[serde(default)]
    pub results: Vec<CatalogResult>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogResult {
    pub boid: String,
    pub name: String,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
}

/// Availability is keyed by lot id.
#[derive(Debug, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub lots: HashMap<String, Lot>,
}

#[derive(Debug, Deserialize)]
pub struct Lot {
    pub price: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub store_id: Option<u64>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Closed lots are historical; only open ones are offers.
    #[serde(default)]
    pub open: bool,
}
