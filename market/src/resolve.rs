//! Cross-catalog identifier resolution.
//!
//! Input is free-form: a Rebrickable id, a bare boid, a collector code or a
//! name. Detection is regex-first; resolution goes cache → BrickOwl catalog
//! → Rebrickable enrichment, and never guesses: an unresolved input comes
//! back with `success == false` so callers can fall back to searching eBay
//! by the original string (collector codes appear in human-written titles).

use std::sync::Arc;

use async_trait::async_trait;
use model::ItemKind;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::brickowl::BrickOwlClient;
use crate::error::MarketError;
use crate::rebrickable::RebrickableClient;

/// Cached resolutions are trusted for 30 days.
pub const CACHE_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

static REBRICKABLE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^fig-\d{6}$").unwrap());
static BOID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static COLLECTOR_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,4}\d+[a-z]?$").unwrap());

/// What the raw input looks like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectedId {
    Rebrickable(String),
    Boid(String),
    CollectorCode(String),
    Name(String),
}

pub fn detect(input: &str) -> DetectedId {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();

    if REBRICKABLE_ID_RE.is_match(&lowered) {
        DetectedId::Rebrickable(lowered)
    } else if BOID_RE.is_match(trimmed) {
        DetectedId::Boid(trimmed.to_string())
    } else if COLLECTOR_CODE_RE.is_match(&lowered) {
        DetectedId::CollectorCode(lowered)
    } else {
        DetectedId::Name(trimmed.to_string())
    }
}

/// A cache row for a resolution. Writes are upserts, so concurrent
/// resolutions of the same input converge on the same row.
#[derive(Clone, Debug)]
pub struct CachedId {
    pub resolved_id: String,
    pub display_name: Option<String>,
    pub exact: bool,
    pub updated_ms: i64,
}

/// Persistence seam for the resolver; implemented by the watch store.
#[async_trait]
pub trait IdCache: Send + Sync {
    async fn get(&self, kind: ItemKind, input: &str) -> anyhow::Result<Option<CachedId>>;
    async fn put(
        &self,
        kind: ItemKind,
        input: &str,
        resolved: &CachedId,
    ) -> anyhow::Result<()>;
}

/// Outcome of one resolution. `success == false` means nothing was mapped;
/// everything else is best-effort-populated.
#[derive(Clone, Debug, Default)]
pub struct ResolveOutcome {
    pub success: bool,
    pub boid: Option<String>,
    pub rebrickable_id: Option<String>,
    pub display_name: Option<String>,
    pub image_url: Option<String>,
    pub piece_count: Option<u32>,
    /// False when the boid came from a first-result fallback.
    pub exact: bool,
}

pub struct Resolver {
    brickowl: Option<Arc<BrickOwlClient>>,
    rebrickable: Option<Arc<RebrickableClient>>,
    cache: Arc<dyn IdCache>,
    now_ms: fn() -> i64,
}

impl Resolver {
    pub fn new(
        brickowl: Option<Arc<BrickOwlClient>>,
        rebrickable: Option<Arc<RebrickableClient>>,
        cache: Arc<dyn IdCache>,
        now_ms: fn() -> i64,
    ) -> Self {
        Self {
            brickowl,
            rebrickable,
            cache,
            now_ms,
        }
    }

    #[instrument(skip(self), fields(input, kind = kind.as_str()))]
    pub async fn resolve(&self, input: &str, kind: ItemKind) -> Result<ResolveOutcome, MarketError> {
        match detect(input) {
            DetectedId::Rebrickable(id) => self.from_encyclopedia(&id).await,
            DetectedId::Boid(boid) => Ok(ResolveOutcome {
                success: true,
                boid: Some(boid),
                exact: true,
                ..Default::default()
            }),
            DetectedId::CollectorCode(code) => self.via_brickowl(&code, kind, true).await,
            DetectedId::Name(name) => self.via_brickowl(&name, kind, false).await,
        }
    }

    async fn from_encyclopedia(&self, fig_id: &str) -> Result<ResolveOutcome, MarketError> {
        let Some(client) = &self.rebrickable else {
            return Ok(ResolveOutcome::default());
        };
        let Some(entry) = client.minifig(fig_id).await? else {
            return Ok(ResolveOutcome::default());
        };
        Ok(ResolveOutcome {
            success: true,
            rebrickable_id: Some(entry.set_num),
            display_name: Some(entry.name),
            image_url: entry.set_img_url,
            piece_count: entry.num_parts,
            exact: true,
            ..Default::default()
        })
    }

    async fn via_brickowl(
        &self,
        query: &str,
        kind: ItemKind,
        is_code: bool,
    ) -> Result<ResolveOutcome, MarketError> {
        // Fresh cache rows short-circuit the provider round-trip.
        match self.cache.get(kind, query).await {
            Ok(Some(hit)) if (self.now_ms)() - hit.updated_ms < CACHE_TTL_MS => {
                debug!("id cache hit");
                let mut out = ResolveOutcome {
                    success: true,
                    boid: Some(hit.resolved_id),
                    display_name: hit.display_name,
                    exact: hit.exact,
                    ..Default::default()
                };
                self.enrich(&mut out, query, is_code).await;
                return Ok(out);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "id cache read failed; resolving live"),
        }

        let Some(client) = &self.brickowl else {
            return Ok(ResolveOutcome::default());
        };

        let Some(resolved) = client.resolve(query, kind).await? else {
            debug!("no catalog match; caller should fall back to text search");
            return Ok(ResolveOutcome::default());
        };

        let row = CachedId {
            resolved_id: resolved.boid.clone(),
            display_name: Some(resolved.name.clone()),
            exact: resolved.exact,
            updated_ms: (self.now_ms)(),
        };
        if let Err(e) = self.cache.put(kind, query, &row).await {
            warn!(error = %e, "id cache write failed");
        }

        let mut out = ResolveOutcome {
            success: true,
            boid: Some(resolved.boid),
            display_name: Some(resolved.name),
            exact: resolved.exact,
            ..Default::default()
        };
        self.enrich(&mut out, query, is_code).await;
        Ok(out)
    }

    /// Best-effort Rebrickable enrichment: image and part count. Collector
    /// codes search by the resolved display name, not the code.
    async fn enrich(&self, out: &mut ResolveOutcome, _query: &str, _is_code: bool) {
        let Some(client) = &self.rebrickable else {
            return;
        };
        let Some(name) = out.display_name.clone() else {
            return;
        };
        match client.search_minifigs(&name).await {
            Ok(Some(entry)) => {
                out.rebrickable_id = Some(entry.set_num);
                out.image_url = entry.set_img_url;
                out.piece_count = entry.num_parts;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "encyclopedia enrichment failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_is_regex_first() {
        assert_eq!(
            detect("fig-012345"),
            DetectedId::Rebrickable("fig-012345".into())
        );
        assert_eq!(detect("123456"), DetectedId::Boid("123456".into()));
        assert_eq!(
            detect("sw0010"),
            DetectedId::CollectorCode("sw0010".into())
        );
        assert_eq!(
            detect("SW0010"),
            DetectedId::CollectorCode("sw0010".into())
        );
        assert_eq!(
            detect("njo640a"),
            DetectedId::CollectorCode("njo640a".into())
        );
        assert_eq!(
            detect("Darth Vader"),
            DetectedId::Name("Darth Vader".into())
        );
        // Seven digits after "fig-" is not an encyclopedia id.
        assert_eq!(
            detect("fig-1234567"),
            DetectedId::Name("fig-1234567".into())
        );
    }
}
