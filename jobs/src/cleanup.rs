//! Expired-deal cleanup and queue retention.

use dispatch::{DispatchQueue, QueueName};
use store::Store;
use tracing::{info, instrument};

#[instrument(skip(store, queue))]
pub async fn run_cleanup(
    store: &Store,
    queue: &DispatchQueue,
    now_ms: i64,
) -> anyhow::Result<u64> {
    let deleted = store.listings.delete_expired(now_ms).await?;

    queue.prune(QueueName::Chat).await?;
    queue.prune(QueueName::Push).await?;

    info!(deleted, "expired deals removed; queue retention applied");
    Ok(deleted)
}
