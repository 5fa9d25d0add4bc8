//! Browse-API response shapes. Only the fields the engine reads.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub item_summaries: Vec<ItemSummary>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub item_id: String,
    pub title: String,
    pub item_web_url: String,
    pub image: Option<Image>,
    pub seller: Option<Seller>,
    pub item_location: Option<ItemLocation>,
    pub condition_id: Option<String>,
    pub price: Option<Money>,
    #[serde(default)]
    pub shipping_options: Vec<ShippingOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub username: Option<String>,
    pub feedback_percentage: Option<String>,
    pub feedback_score: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLocation {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    pub shipping_cost: Option<Money>,
    pub shipping_cost_type: Option<String>,
}
