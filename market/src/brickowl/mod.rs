//! BrickOwl adapter.
//!
//! The catalog is keyed by opaque numeric "boids"; every availability query
//! needs one, so resolution (collector code or name → boid) is part of the
//! adapter contract. The provider allows roughly two requests per second;
//! a process-wide pacer keeps a hard 500 ms gap between calls.

mod wire;

use std::time::Duration;

use tokio::time::Instant;

use model::{Condition, Country, ItemKind, Source};
use tracing::{debug, instrument};

use crate::error::MarketError;
use crate::types::RawListing;

const API_BASE: &str = "https://api.brickowl.com/v1";

/// Minimum gap between any two BrickOwl requests, process-wide.
pub const MIN_REQUEST_GAP: Duration = Duration::from_millis(500);

/// Serializes callers and enforces the inter-request gap. The lock is held
/// across the sleep on purpose: that is what makes the gap process-wide.
pub struct Pacer {
    min_gap: Duration,
    last: tokio::sync::Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn pace(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let due = prev + self.min_gap;
            let now = Instant::now();
            if due > now {
                tokio::time::sleep(due - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Catalog match for a resolution query. `exact` is false when the match
/// came from "first result of the right type" rather than a code hit.
#[derive(Clone, Debug)]
pub struct ResolvedCatalogItem {
    pub boid: String,
    pub name: String,
    pub exact: bool,
}

pub struct BrickOwlClient {
    http: reqwest::Client,
    key: String,
    pacer: Pacer,
}

impl BrickOwlClient {
    pub fn new(http: reqwest::Client, key: String) -> Self {
        Self {
            http,
            key,
            pacer: Pacer::new(MIN_REQUEST_GAP),
        }
    }

    /// Resolves a collector code or a free-form name to a boid.
    ///
    /// Best match: a result whose name or permalink contains the code
    /// verbatim. Failing that, the first result of the right type is
    /// accepted but flagged inexact.
    #[instrument(skip(self), fields(query, kind = kind.as_str()))]
    pub async fn resolve(
        &self,
        query: &str,
        kind: ItemKind,
    ) -> Result<Option<ResolvedCatalogItem>, MarketError> {
        let type_name = match kind {
            ItemKind::Set => "Set",
            ItemKind::Minifig => "Minifigure",
        };

        let body = self
            .get(
                "/catalog/search",
                &[("query", query), ("type", type_name)],
            )
            .await?;
        let parsed: wire::CatalogSearchResponse =
            serde_json::from_str(&body).map_err(|e| MarketError::Decode(e.to_string()))?;

        let needle = query.trim().to_lowercase();
        let exact = parsed.results.iter().find(|r| {
            r.name.to_lowercase().contains(&needle)
                || r.permalink
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&needle))
        });

        let chosen = match exact {
            Some(hit) => Some(ResolvedCatalogItem {
                boid: hit.boid.clone(),
                name: hit.name.clone(),
                exact: true,
            }),
            None => parsed
                .results
                .iter()
                .find(|r| {
                    r.item_type
                        .as_deref()
                        .is_none_or(|t| t.eq_ignore_ascii_case(type_name))
                })
                .map(|r| ResolvedCatalogItem {
                    boid: r.boid.clone(),
                    name: r.name.clone(),
                    exact: false,
                }),
        };

        debug!(found = chosen.is_some(), "catalog resolution");
        Ok(chosen)
    }

    /// Open lots for a boid, shippable to `ship_to`.
    ///
    /// Lots have no seller-written title; one is synthesized from the
    /// catalog identity so fingerprints and logs stay meaningful. Identity
    /// is guaranteed by the boid, which the filter is told via
    /// `identity_verified`.
    #[instrument(skip(self, item, item_name), fields(boid, ship_to = ship_to.as_str()))]
    pub async fn availability(
        &self,
        boid: &str,
        ship_to: Country,
        item: &model::ItemRef,
        item_name: Option<&str>,
    ) -> Result<Vec<RawListing>, MarketError> {
        let body = self
            .get(
                "/catalog/availability",
                &[("boid", boid), ("country", ship_to.as_str())],
            )
            .await?;
        let parsed: wire::AvailabilityResponse =
            serde_json::from_str(&body).map_err(|e| MarketError::Decode(e.to_string()))?;

        let title = match item_name {
            Some(name) => format!("LEGO {} {name}", item.id),
            None => format!("LEGO {}", item.id),
        };
        let listings = parsed
            .lots
            .into_iter()
            .filter(|(_, lot)| lot.open)
            .filter_map(|(lot_id, lot)| to_raw(lot_id, lot, boid, &title))
            .collect::<Vec<_>>();

        debug!(open_lots = listings.len(), "availability fetched");
        Ok(listings)
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String, MarketError> {
        self.pacer.pace().await;

        let url = format!("{API_BASE}{path}");
        let resp = self
            .http
            .get(&url)
            .query(&[("key", self.key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(r#"{"results":[],"lots":{}}"#.to_string());
        }
        if !status.is_success() {
            let body = resp.text().await.ok();
            return Err(MarketError::from_status(status.as_u16(), body));
        }
        Ok(resp.text().await?)
    }
}

fn to_raw(lot_id: String, lot: wire::Lot, boid: &str, title: &str) -> Option<RawListing> {
    let price: f64 = lot.price.parse().ok()?;
    let store_name = lot.store_name.unwrap_or_else(|| "unknown".to_string());

    Some(RawListing {
        source: Source::BrickOwl,
        listing_id: lot_id,
        title: title.to_string(),
        url: lot
            .url
            .unwrap_or_else(|| format!("https://www.brickowl.com/boid/{boid}")),
        image_url: None,
        seller_id: lot.store_id.map(|id| id.to_string()),
        seller_username: store_name,
        seller_rating: None,
        seller_feedback: None,
        ship_from: lot.country.as_deref().and_then(Country::parse),
        condition: map_condition(lot.condition.as_deref()),
        price_original: price,
        shipping_original: None,
        currency_original: lot.currency.unwrap_or_else(|| "EUR".to_string()),
    })
}

/// BrickOwl condition codes: `new*` grades are new, `used*` grades used.
fn map_condition(code: Option<&str>) -> Condition {
    match code {
        Some(c) if c.to_lowercase().starts_with("new") => Condition::New,
        Some(c) if c.to_lowercase().starts_with("used") => Condition::Used,
        _ => Condition::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_grades() {
        assert_eq!(map_condition(Some("new")), Condition::New);
        assert_eq!(map_condition(Some("news")), Condition::New);
        assert_eq!(map_condition(Some("usedg")), Condition::Used);
        assert_eq!(map_condition(None), Condition::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_enforces_gap() {
        let pacer = Pacer::new(Duration::from_millis(500));

        pacer.pace().await;
        let before = tokio::time::Instant::now();
        pacer.pace().await;
        let waited = tokio::time::Instant::now() - before;

        assert!(waited >= Duration::from_millis(499), "waited {waited:?}");
    }
}
