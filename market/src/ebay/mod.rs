//! eBay adapter.
//!
//! Endpoint choice, region filtering and condition mapping all live here so
//! the scheduler only ever sees `RawListing`s. Region behavior has three
//! variants:
//! - EU buyer whose country has its own marketplace: the server-side
//!   `itemLocationRegion` filter is applied (the filter combined with a
//!   foreign marketplace returns wrong results, so it is only sent when the
//!   marketplace is the buyer's own).
//! - UK buyer: no region filter; EU imports are wanted.
//! - North-America buyer: no region filter; the ship-from allowlist prunes
//!   client-side.

pub mod token;
mod wire;

use model::{Condition, Country, ItemKind, ItemRef, Source};
use tracing::{debug, instrument, warn};

use crate::error::MarketError;
use crate::types::RawListing;
pub use token::TokenStore;

const API_BASE: &str = "https://api.ebay.com/buy/browse/v1";
pub const TOKEN_URL: &str = "https://api.ebay.com/identity/v1/oauth2/token";
pub const TOKEN_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// Closed mapping from ship-to country to its own marketplace. Countries
/// absent here are served by the configured fallback marketplace.
fn own_marketplace(country: Country) -> Option<&'static str> {
    let id = match country {
        Country::At => "EBAY_AT",
        Country::Be => "EBAY_BE",
        Country::Ch => "EBAY_CH",
        Country::De => "EBAY_DE",
        Country::Es => "EBAY_ES",
        Country::Fr => "EBAY_FR",
        Country::Gb => "EBAY_GB",
        Country::Ie => "EBAY_IE",
        Country::It => "EBAY_IT",
        Country::Nl => "EBAY_NL",
        Country::Pl => "EBAY_PL",
        Country::Us => "EBAY_US",
        Country::Ca => "EBAY_CA",
        _ => return None,
    };
    Some(id)
}

pub struct EbayClient {
    http: reqwest::Client,
    tokens: std::sync::Arc<TokenStore>,
    /// Marketplace used when the buyer country has none of its own.
    default_marketplace: String,
    affiliate_campaign: Option<String>,
}

impl EbayClient {
    pub fn new(
        http: reqwest::Client,
        tokens: std::sync::Arc<TokenStore>,
        default_marketplace: String,
        affiliate_campaign: Option<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            default_marketplace,
            affiliate_campaign,
        }
    }

    /// Searches fixed-price listings for an item shipped to `ship_to`.
    ///
    /// The query is the brand token plus the identifier; deliberately no
    /// price sort, which surfaces spare parts first.
    #[instrument(skip(self), fields(item = %item, ship_to = ship_to.as_str()))]
    pub async fn search(
        &self,
        item: &ItemRef,
        ship_to: Country,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RawListing>, MarketError> {
        let query = format!("lego {}", item.id);
        let (marketplace, region_filter) = self.marketplace_for(ship_to);

        let mut filters = vec!["buyingOptions:{FIXED_PRICE}".to_string()];
        if region_filter {
            filters.push("itemLocationRegion:EUROPEAN_UNION".to_string());
        }

        let url = format!("{API_BASE}/item_summary/search");
        let limit_s = limit.to_string();
        let offset_s = offset.to_string();
        let filter_s = filters.join(",");
        let params = [
            ("q", query.as_str()),
            ("limit", limit_s.as_str()),
            ("offset", offset_s.as_str()),
            ("filter", filter_s.as_str()),
            ("deliveryCountry", ship_to.as_str()),
        ];

        let body = self.get_with_auth_retry(&url, &params, marketplace).await?;
        let parsed: wire::SearchResponse =
            serde_json::from_str(&body).map_err(|e| MarketError::Decode(e.to_string()))?;

        debug!(
            total = parsed.total,
            returned = parsed.item_summaries.len(),
            marketplace,
            "search page fetched"
        );

        Ok(parsed
            .item_summaries
            .into_iter()
            .filter_map(|s| self.to_raw(s, item.kind))
            .collect())
    }

    fn marketplace_for(&self, ship_to: Country) -> (&str, bool) {
        match own_marketplace(ship_to) {
            // Region filter only together with the buyer's own EU
            // marketplace; GB and NA marketplaces get none.
            Some(id) => (id, ship_to.is_eu()),
            None => (self.default_marketplace.as_str(), false),
        }
    }

    /// One GET with bearer auth; on an auth rejection the token is purged
    /// and the request retried once.
    async fn get_with_auth_retry(
        &self,
        url: &str,
        params: &[(&str, &str)],
        marketplace: &str,
    ) -> Result<String, MarketError> {
        match self.get_once(url, params, marketplace).await {
            Err(MarketError::Auth(reason)) => {
                warn!(reason = %reason, "auth rejected; purging token and retrying once");
                self.tokens.invalidate().await;
                self.get_once(url, params, marketplace).await
            }
            other => other,
        }
    }

    async fn get_once(
        &self,
        url: &str,
        params: &[(&str, &str)],
        marketplace: &str,
    ) -> Result<String, MarketError> {
        let token = self.tokens.acquire().await?;
        let resp = self
            .http
            .get(url)
            .query(params)
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", marketplace)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            // Absence is an empty result, not a failure.
            return Ok(r#"{"itemSummaries":[],"total":0}"#.to_string());
        }
        if !status.is_success() {
            let body = resp.text().await.ok();
            return Err(MarketError::from_status(status.as_u16(), body));
        }
        Ok(resp.text().await?)
    }

    fn to_raw(&self, s: wire::ItemSummary, kind: ItemKind) -> Option<RawListing> {
        let price = s.price.as_ref()?;
        let price_value: f64 = price.value.parse().ok()?;

        // Cheapest stated shipping option, if any quoted a cost.
        let shipping_original = s
            .shipping_options
            .iter()
            .filter_map(|o| o.shipping_cost.as_ref())
            .filter_map(|m| m.value.parse::<f64>().ok())
            .fold(None::<f64>, |acc, v| {
                Some(acc.map_or(v, |best| best.min(v)))
            });

        let seller = s.seller.as_ref();
        let seller_username = seller
            .and_then(|x| x.username.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let url = match &self.affiliate_campaign {
            Some(campaign) => append_campaign(&s.item_web_url, campaign),
            None => s.item_web_url.clone(),
        };

        Some(RawListing {
            source: Source::Ebay,
            listing_id: s.item_id,
            title: s.title,
            url,
            image_url: s.image.map(|i| i.image_url),
            seller_id: seller.and_then(|x| x.username.clone()),
            seller_username,
            seller_rating: seller
                .and_then(|x| x.feedback_percentage.as_ref())
                .and_then(|p| p.parse().ok()),
            seller_feedback: seller.and_then(|x| x.feedback_score),
            ship_from: s
                .item_location
                .and_then(|l| l.country)
                .and_then(|c| Country::parse(&c)),
            condition: map_condition(s.condition_id.as_deref(), kind),
            price_original: price_value,
            shipping_original,
            currency_original: price.currency.clone(),
        })
    }
}

/// Maps eBay condition ids. "New: other" (1500/1750) counts as used for
/// minifigs: an opened blister is a used figure to a collector.
fn map_condition(condition_id: Option<&str>, kind: ItemKind) -> Condition {
    match condition_id {
        Some("1000") => Condition::New,
        Some("1500") | Some("1750") => match kind {
            ItemKind::Minifig => Condition::Used,
            ItemKind::Set => Condition::New,
        },
        Some("2000") | Some("2500") | Some("3000") | Some("4000") | Some("5000")
        | Some("6000") => Condition::Used,
        _ => Condition::Unknown,
    }
}

fn append_campaign(url: &str, campaign: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}campid={campaign}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_marketplace_table_is_closed() {
        assert_eq!(own_marketplace(Country::De), Some("EBAY_DE"));
        assert_eq!(own_marketplace(Country::Gb), Some("EBAY_GB"));
        assert_eq!(own_marketplace(Country::Cz), None);
        assert_eq!(own_marketplace(Country::Se), None);
    }

    #[test]
    fn new_other_is_used_for_minifigs_only() {
        assert_eq!(map_condition(Some("1500"), ItemKind::Minifig), Condition::Used);
        assert_eq!(map_condition(Some("1500"), ItemKind::Set), Condition::New);
        assert_eq!(map_condition(Some("1000"), ItemKind::Minifig), Condition::New);
        assert_eq!(map_condition(None, ItemKind::Set), Condition::Unknown);
    }

    #[test]
    fn campaign_append_respects_existing_query() {
        assert_eq!(
            append_campaign("https://x.test/item/1", "55"),
            "https://x.test/item/1?campid=55"
        );
        assert_eq!(
            append_campaign("https://x.test/item/1?a=b", "55"),
            "https://x.test/item/1?a=b&campid=55"
        );
    }
}
