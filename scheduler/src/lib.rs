//! Scan scheduling: groups, cycles, matching, alerting.

pub mod cycle;
pub mod notify;
pub mod stats;

pub use cycle::{BrickOwlPort, CycleConfig, CycleStats, EbayPort, GroupReport, ScanScheduler};
pub use notify::{build_payload, derive_type, reason_text, throttled};
pub use stats::Counters;
