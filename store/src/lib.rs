//! Persistent state.
//!
//! One SQL database owns every durable entity. Repositories do persistence
//! and row mapping only; policy stays in the scheduler, filter and jobs.
//! Malformed rows are logged and skipped, never allowed to fail a batch.

pub mod alerts;
pub mod db;
pub mod items;
pub mod listings;
pub mod rows;
pub mod price_history;
pub mod schema;
pub mod users;
pub mod watches;

pub use alerts::{AlertInsert, AlertRepo, NewAlert, ReminderCandidate};
pub use db::Db;
pub use items::ItemRepo;
pub use listings::ListingRepo;
pub use rows::{
    ItemRow, NewWatch, NotificationState, PushSubscription, ScanGroup, User, UserWindowCounts,
    Watch, WatchStatus,
};
pub use price_history::{DailyPriceRow, PriceHistoryRepo};
pub use users::UserRepo;
pub use watches::WatchRepo;

use std::sync::Arc;

/// Bundle of repositories over one pool; constructed once and injected.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<UserRepo>,
    pub items: Arc<ItemRepo>,
    pub watches: Arc<WatchRepo>,
    pub listings: Arc<ListingRepo>,
    pub alerts: Arc<AlertRepo>,
    pub price_history: Arc<PriceHistoryRepo>,
}

impl Store {
    pub fn new(db: &Db) -> Self {
        let pool = (*db.pool).clone();
        Self {
            users: Arc::new(UserRepo::new(pool.clone())),
            items: Arc::new(ItemRepo::new(pool.clone())),
            watches: Arc::new(WatchRepo::new(pool.clone())),
            listings: Arc::new(ListingRepo::new(pool.clone())),
            alerts: Arc::new(AlertRepo::new(pool.clone())),
            price_history: Arc::new(PriceHistoryRepo::new(pool)),
        }
    }
}
