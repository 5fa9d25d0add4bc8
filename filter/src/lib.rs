//! Candidate filtering and listing identity.
//!
//! Everything in this crate is pure: no I/O, no clocks. The scheduler feeds
//! it candidates and watch context; it answers accept/reject with a stable
//! reason tag, and mints the fingerprint / idempotency key the dedup layer
//! persists.

pub mod condition;
pub mod fingerprint;
pub mod identity;
pub mod lexicon;
pub mod pipeline;

pub use condition::{ConditionPref, condition_matches, effective_condition};
pub use fingerprint::{fingerprint, idempotency_key, price_bucket};
pub use pipeline::{
    BatchContext, Candidate, DEFAULT_SCORE_THRESHOLD, RejectReason, StepTrace, Verdict, WatchContext,
    evaluate, explain,
};
