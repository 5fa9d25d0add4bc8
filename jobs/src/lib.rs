//! Scheduled background jobs: digest, still-available reminders, price
//! snapshots, cleanup.

pub mod cleanup;
pub mod digest;
pub mod reminder;
pub mod runner;
pub mod snapshot;

pub use cleanup::run_cleanup;
pub use digest::run_weekly_digest;
pub use reminder::run_reminders;
pub use runner::{spawn_daily, spawn_weekly, until_next_daily, until_next_weekly};
pub use snapshot::run_daily_snapshot;
