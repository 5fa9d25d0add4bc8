use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility; they never affect behavior.
#[derive(Clone, Default)]
pub struct Counters {
    pub cycles: Arc<AtomicU64>,
    pub groups_scanned: Arc<AtomicU64>,
    pub groups_failed: Arc<AtomicU64>,
    pub groups_skipped_budget: Arc<AtomicU64>,

    pub listings_fetched: Arc<AtomicU64>,
    pub listings_dropped: Arc<AtomicU64>,

    pub alerts_created: Arc<AtomicU64>,
    pub alerts_deduped: Arc<AtomicU64>,
    pub alerts_throttled: Arc<AtomicU64>,
    pub policy_rejects: Arc<AtomicU64>,
}
