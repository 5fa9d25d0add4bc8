//! Bridges the resolver's cache seam onto the item repository.

use std::sync::Arc;

use async_trait::async_trait;
use market::{CachedId, IdCache};
use model::ItemKind;
use store::ItemRepo;

pub struct SqlIdCache {
    items: Arc<ItemRepo>,
}

impl SqlIdCache {
    pub fn new(items: Arc<ItemRepo>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl IdCache for SqlIdCache {
    async fn get(&self, kind: ItemKind, input: &str) -> anyhow::Result<Option<CachedId>> {
        Ok(self.items.id_cache_get(kind, input).await?.map(
            |(resolved_id, display_name, exact, updated_ms)| CachedId {
                resolved_id,
                display_name,
                exact,
                updated_ms,
            },
        ))
    }

    async fn put(&self, kind: ItemKind, input: &str, resolved: &CachedId) -> anyhow::Result<()> {
        self.items
            .id_cache_put(
                kind,
                input,
                &resolved.resolved_id,
                resolved.display_name.as_deref(),
                resolved.exact,
                resolved.updated_ms,
            )
            .await
    }
}
