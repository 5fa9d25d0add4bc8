//! Rebrickable encyclopedia client. Best-effort enrichment only: names,
//! images and part counts. A failure here never fails a scan.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::MarketError;

const API_BASE: &str = "https://rebrickable.com/api/v3";

#[derive(Clone, Debug, Deserialize)]
pub struct EncyclopediaEntry {
    /// `fig-NNNNNN` for minifigs, `NNNNN-1` for sets.
    pub set_num: String,
    pub name: String,
    pub num_parts: Option<u32>,
    pub set_img_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<EncyclopediaEntry>,
}

pub struct RebrickableClient {
    http: reqwest::Client,
    key: String,
}

impl RebrickableClient {
    pub fn new(http: reqwest::Client, key: String) -> Self {
        Self { http, key }
    }

    /// Direct lookup by `fig-NNNNNN` id.
    #[instrument(skip(self))]
    pub async fn minifig(&self, fig_num: &str) -> Result<Option<EncyclopediaEntry>, MarketError> {
        self.get_entry(&format!("{API_BASE}/lego/minifigs/{fig_num}/"))
            .await
    }

    /// Set lookup; the encyclopedia keys sets as `NNNNN-1`.
    #[instrument(skip(self))]
    pub async fn set(&self, set_number: &str) -> Result<Option<EncyclopediaEntry>, MarketError> {
        self.get_entry(&format!("{API_BASE}/lego/sets/{set_number}-1/"))
            .await
    }

    /// Name search over minifigs; first page only, first hit wins.
    #[instrument(skip(self))]
    pub async fn search_minifigs(
        &self,
        query: &str,
    ) -> Result<Option<EncyclopediaEntry>, MarketError> {
        let resp = self
            .http
            .get(format!("{API_BASE}/lego/minifigs/"))
            .query(&[("search", query), ("page_size", "5")])
            .header("Authorization", format!("key {}", self.key))
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.ok();
            return Err(MarketError::from_status(status.as_u16(), body));
        }

        let page: SearchPage = resp.json().await?;
        debug!(hits = page.results.len(), "encyclopedia search");
        Ok(page.results.into_iter().next())
    }

    async fn get_entry(&self, url: &str) -> Result<Option<EncyclopediaEntry>, MarketError> {
        let resp = self
            .http
            .get(url)
            .header("Authorization", format!("key {}", self.key))
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.ok();
            return Err(MarketError::from_status(status.as_u16(), body));
        }
        Ok(Some(resp.json().await?))
    }
}
