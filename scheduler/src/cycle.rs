//! Scan cycles.
//!
//! Responsibilities:
//! - Read active scan groups in (priority, watcher count) order.
//! - Fan groups out under a global concurrency cap; work inside a group is
//!   sequential.
//! - Per group: query adapters, normalize, persist listings, match
//!   watchers, write alerts, enqueue dispatch jobs.
//! - Enforce the cycle wall-clock budget: when it runs out, remaining
//!   groups are skipped and logged; everything already done is durable.
//!
//! One group's failure is recorded and never blocks the others. Within a
//! group, a watcher's candidate listings are walked in ascending landed
//! total, so the first alert a watcher gets is its best current offer.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CycleId;
use filter::{BatchContext, Candidate, DEFAULT_SCORE_THRESHOLD, Verdict, WatchContext};
use futures::StreamExt;
use market::{MarketError, RawListing, Resolver, normalize_listing};
use model::{Country, ItemKind, ItemRef, Source};
use store::{ItemRow, NewAlert, ScanGroup, Store, Watch};
use tracing::{debug, error, info, instrument, warn};

use crate::notify::{build_payload, derive_type, throttled};
use crate::stats::Counters;

/// eBay-side seam; the production impl is the real client.
#[async_trait]
pub trait EbayPort: Send + Sync {
    async fn search(
        &self,
        item: &ItemRef,
        ship_to: Country,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RawListing>, MarketError>;
}

#[async_trait]
impl EbayPort for market::EbayClient {
    async fn search(
        &self,
        item: &ItemRef,
        ship_to: Country,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RawListing>, MarketError> {
        market::EbayClient::search(self, item, ship_to, limit, offset).await
    }
}

/// BrickOwl-side seam.
#[async_trait]
pub trait BrickOwlPort: Send + Sync {
    async fn availability(
        &self,
        boid: &str,
        ship_to: Country,
        item: &ItemRef,
        item_name: Option<&str>,
    ) -> Result<Vec<RawListing>, MarketError>;
}

#[async_trait]
impl BrickOwlPort for market::BrickOwlClient {
    async fn availability(
        &self,
        boid: &str,
        ship_to: Country,
        item: &ItemRef,
        item_name: Option<&str>,
    ) -> Result<Vec<RawListing>, MarketError> {
        market::BrickOwlClient::availability(self, boid, ship_to, item, item_name).await
    }
}

#[derive(Clone, Debug)]
pub struct CycleConfig {
    /// Groups in flight at once.
    pub global_concurrency: usize,
    /// Listings requested per adapter query.
    pub listing_page_limit: u32,
    /// Wall-clock budget for one whole cycle.
    pub cycle_budget: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 4,
            listing_page_limit: 50,
            cycle_budget: Duration::from_secs(120),
        }
    }
}

/// Per-group outcome, aggregated into [`CycleStats`].
#[derive(Clone, Debug, Default)]
pub struct GroupReport {
    pub listings: usize,
    pub alerts: usize,
    pub errors: Vec<String>,
    pub skipped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CycleStats {
    pub groups: usize,
    pub groups_failed: usize,
    pub groups_skipped: usize,
    pub listings: usize,
    pub alerts: usize,
}

pub struct ScanScheduler {
    store: Store,
    queue: dispatch::DispatchQueue,
    ebay: Option<Arc<dyn EbayPort>>,
    brickowl: Option<Arc<dyn BrickOwlPort>>,
    resolver: Option<Arc<Resolver>>,
    push_enabled: bool,
    counters: Counters,
    cfg: CycleConfig,
}

impl ScanScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        queue: dispatch::DispatchQueue,
        ebay: Option<Arc<dyn EbayPort>>,
        brickowl: Option<Arc<dyn BrickOwlPort>>,
        resolver: Option<Arc<Resolver>>,
        push_enabled: bool,
        counters: Counters,
        cfg: CycleConfig,
    ) -> Self {
        Self {
            store,
            queue,
            ebay,
            brickowl,
            resolver,
            push_enabled,
            counters,
            cfg,
        }
    }

    /// Runs one full scan cycle.
    #[instrument(skip(self), fields(cycle_id = tracing::field::Empty))]
    pub async fn run_cycle(&self) -> anyhow::Result<CycleStats> {
        let cycle_id = CycleId::default();
        tracing::Span::current().record("cycle_id", cycle_id.to_short().as_str());

        let started = Instant::now();
        let deadline = started + self.cfg.cycle_budget;
        let now = Utc::now();

        self.counters.cycles.fetch_add(1, Ordering::Relaxed);

        let groups = self.store.watches.scan_groups(now.timestamp_millis()).await?;
        let total = groups.len();
        debug!(groups = total, "scan cycle starting");

        let reports: Vec<GroupReport> = futures::stream::iter(groups)
            .map(|group| async move {
                if Instant::now() >= deadline {
                    self.counters
                        .groups_skipped_budget
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(item = %group.item, ship_to = group.ship_to.as_str(),
                          "cycle budget exhausted; group skipped");
                    return GroupReport {
                        skipped: true,
                        ..Default::default()
                    };
                }
                match self.scan_group(&group).await {
                    Ok(report) => {
                        self.counters.groups_scanned.fetch_add(1, Ordering::Relaxed);
                        report
                    }
                    Err(e) => {
                        self.counters.groups_failed.fetch_add(1, Ordering::Relaxed);
                        error!(item = %group.item, ship_to = group.ship_to.as_str(),
                               error = ?e, "group scan failed");
                        GroupReport {
                            errors: vec![e.to_string()],
                            ..Default::default()
                        }
                    }
                }
            })
            .buffer_unordered(self.cfg.global_concurrency)
            .collect()
            .await;

        let stats = CycleStats {
            groups: total,
            groups_failed: reports.iter().filter(|r| !r.errors.is_empty() && r.listings == 0).count(),
            groups_skipped: reports.iter().filter(|r| r.skipped).count(),
            listings: reports.iter().map(|r| r.listings).sum(),
            alerts: reports.iter().map(|r| r.alerts).sum(),
        };
        info!(
            groups = stats.groups,
            skipped = stats.groups_skipped,
            listings = stats.listings,
            alerts = stats.alerts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan cycle finished"
        );
        Ok(stats)
    }

    /// Scans one (item, destination) group end to end.
    #[instrument(skip(self, group), fields(item = %group.item, ship_to = group.ship_to.as_str()))]
    async fn scan_group(&self, group: &ScanGroup) -> anyhow::Result<GroupReport> {
        let now = Utc::now();
        let cycle_ms = now.timestamp_millis();
        let mut report = GroupReport::default();

        let item_row = self.store.items.fetch(&group.item).await?;
        let item_name = item_row.as_ref().and_then(|r| r.name.clone());
        let piece_count = item_row.as_ref().and_then(|r| r.piece_count);

        // Partial failure across adapters is expected: one failing must not
        // void the other's candidates.
        let mut raws: Vec<RawListing> = Vec::new();

        if let Some(ebay) = &self.ebay {
            match ebay
                .search(&group.item, group.ship_to, self.cfg.listing_page_limit, 0)
                .await
            {
                Ok(mut batch) => raws.append(&mut batch),
                Err(e) => {
                    warn!(error = %e, retryable = e.retryable(), "ebay search failed");
                    report.errors.push(format!("ebay: {e}"));
                }
            }
        }

        if group.any_brickowl {
            if let Some(brickowl) = &self.brickowl {
                match self.boid_for(&group.item, item_row.as_ref(), cycle_ms).await {
                    Some(boid) => match brickowl
                        .availability(&boid, group.ship_to, &group.item, item_name.as_deref())
                        .await
                    {
                        Ok(mut batch) => raws.append(&mut batch),
                        Err(e) => {
                            warn!(error = %e, "brickowl availability failed");
                            report.errors.push(format!("brickowl: {e}"));
                        }
                    },
                    None => debug!("no boid; brickowl skipped for this group"),
                }
            }
        }

        self.counters
            .listings_fetched
            .fetch_add(raws.len() as u64, Ordering::Relaxed);

        // Normalization errors drop the listing, not the group.
        let mut listings = Vec::with_capacity(raws.len());
        for raw in &raws {
            match normalize_listing(raw, &group.item, group.ship_to, piece_count, cycle_ms) {
                Ok(l) => listings.push(l),
                Err(e) => {
                    self.counters.listings_dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(listing_id = %raw.listing_id, reason = %e, "listing dropped");
                }
            }
        }

        self.store.listings.upsert_batch(&listings).await?;
        self.store
            .listings
            .mark_absent_inactive(&group.item, group.ship_to, cycle_ms)
            .await?;
        report.listings = listings.len();

        // Ascending landed total: a watcher's first hit is its best offer.
        listings.sort_by(|a, b| a.total.partial_cmp(&b.total).unwrap_or(std::cmp::Ordering::Equal));

        let batch = if group.item.kind == ItemKind::Set {
            BatchContext::from_batch_prices(&listings.iter().map(|l| l.price).collect::<Vec<_>>())
        } else {
            BatchContext::default()
        };

        let watchers = self
            .store
            .watches
            .watchers_in_group(&group.item, group.ship_to, cycle_ms)
            .await?;

        for watch in &watchers {
            match self
                .match_watcher(watch, &listings, &batch, item_name.as_deref(), now)
                .await
            {
                Ok(true) => report.alerts += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(watch_id = %watch.watch_id, error = ?e, "watcher matching failed");
                    report.errors.push(format!("watch {}: {e}", watch.watch_id));
                }
            }
        }

        Ok(report)
    }

    /// Finds the watcher's best passing listing and raises at most one
    /// alert. Returns whether an alert row was created.
    async fn match_watcher(
        &self,
        watch: &Watch,
        listings: &[model::NormalizedListing],
        batch: &BatchContext,
        item_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let now_ms = now.timestamp_millis();

        let Some(user) = self.store.users.fetch(&watch.user_id).await? else {
            warn!(user_id = %watch.user_id, "watch without user row");
            return Ok(false);
        };

        for listing in listings {
            let candidate = Candidate {
                title: &listing.title,
                price: listing.price,
                condition: listing.condition,
                ship_from: listing.ship_from,
                seller_rating: listing.seller_rating,
                seller_feedback: listing.seller_feedback,
                identity_verified: listing.source == Source::BrickOwl,
            };
            let ctx = WatchContext {
                item: &watch.item,
                item_name,
                condition: watch.condition,
                min_price: watch.min_price,
                exclude_words: &watch.exclude_words,
                ship_from_allow: &watch.ship_from_allow,
                min_seller_rating: watch.min_seller_rating,
                min_seller_feedback: watch.min_seller_feedback,
                score_threshold: DEFAULT_SCORE_THRESHOLD,
            };

            match filter::evaluate(&candidate, &ctx, batch) {
                Verdict::Reject { reason } => {
                    self.counters.policy_rejects.fetch_add(1, Ordering::Relaxed);
                    debug!(listing_id = %listing.listing_id, reason = reason.tag(), "candidate rejected");
                    continue;
                }
                Verdict::Accept { .. } => {}
            }

            if listing.total > watch.target_price || listing.total < watch.min_price {
                continue;
            }

            // The best passing listing decides this watcher's fate for the
            // cycle; worse offers are never alerted instead.
            return self.raise_alert(watch, &user, listing, listings, item_name, now, now_ms).await;
        }
        Ok(false)
    }

    #[allow(clippy::too_many_arguments)]
    async fn raise_alert(
        &self,
        watch: &Watch,
        user: &store::User,
        listing: &model::NormalizedListing,
        batch_listings: &[model::NormalizedListing],
        item_name: Option<&str>,
        now: DateTime<Utc>,
        now_ms: i64,
    ) -> anyhow::Result<bool> {
        let counts = self
            .store
            .alerts
            .window_counts(&watch.user_id, &watch.item, now_ms)
            .await?;
        if throttled(&counts) {
            self.counters.alerts_throttled.fetch_add(1, Ordering::Relaxed);
            debug!(user_id = %watch.user_id, "user throttled; alert suppressed");
            return Ok(false);
        }

        let prior = self.store.alerts.latest_state(&watch.watch_id).await?;
        let prior_listed = match &prior {
            Some(p) => batch_listings.iter().any(|l| l.listing_id == p.listing_id),
            None => true,
        };
        let Some(nt) = derive_type(prior.as_ref(), listing, prior_listed) else {
            debug!(watch_id = %watch.watch_id, "no notification-worthy change");
            return Ok(false);
        };

        let key = filter::idempotency_key(
            listing.source,
            &watch.user_id,
            &listing.fingerprint,
            now.date_naive(),
        );

        let quiet_delay = dispatch::delay_until_end_ms(user, now);
        let scheduled_for_ms = (quiet_delay > 0).then_some(now_ms + quiet_delay);

        let inserted = self
            .store
            .alerts
            .insert_idempotent(&NewAlert {
                user_id: &watch.user_id,
                watch_id: &watch.watch_id,
                listing,
                target: watch.target_price,
                notification_type: nt,
                scheduled_for_ms,
                idempotency_key: &key,
                created_ms: now_ms,
            })
            .await?;

        let alert_id = match inserted {
            store::AlertInsert::Duplicate => {
                self.counters.alerts_deduped.fetch_add(1, Ordering::Relaxed);
                return Ok(false);
            }
            store::AlertInsert::Inserted { alert_id } => alert_id,
        };

        self.counters.alerts_created.fetch_add(1, Ordering::Relaxed);
        self.store.watches.bump_alert_counter(&watch.watch_id).await?;
        self.store
            .alerts
            .upsert_notification_state(&watch.watch_id, &listing.listing_id, listing.total, now_ms)
            .await?;

        let payload = build_payload(nt, listing, item_name, watch.target_price);
        dispatch::enqueue_alert(
            &self.queue,
            &self.store,
            user,
            &alert_id,
            &payload,
            self.push_enabled,
            now,
        )
        .await?;

        info!(
            alert_id = %alert_id,
            watch_id = %watch.watch_id,
            total = listing.total,
            notification_type = nt.as_str(),
            "alert raised"
        );
        Ok(true)
    }

    /// Boid from the item row, or a live resolution that also enriches the
    /// item row for next time.
    async fn boid_for(
        &self,
        item: &ItemRef,
        cached: Option<&ItemRow>,
        now_ms: i64,
    ) -> Option<String> {
        if let Some(boid) = cached.and_then(|r| r.boid.clone()) {
            return Some(boid);
        }
        let resolver = self.resolver.as_ref()?;

        match resolver.resolve(&item.id, item.kind).await {
            Ok(outcome) if outcome.success => {
                if outcome.boid.is_some() {
                    let row = ItemRow {
                        item: item.clone(),
                        name: outcome.display_name.clone(),
                        boid: outcome.boid.clone(),
                        rebrickable_id: outcome.rebrickable_id.clone(),
                        image_url: outcome.image_url.clone(),
                        piece_count: outcome.piece_count,
                    };
                    if let Err(e) = self.store.items.upsert(&row, now_ms).await {
                        warn!(error = %e, "item enrichment write failed");
                    }
                }
                outcome.boid
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "id resolution failed");
                None
            }
        }
    }
}
