use model::{ItemKind, ItemRef};
use sqlx::{AnyPool, Row};
use tracing::warn;

use crate::rows::ItemRow;

/// Catalog items and the resolver's id cache.
///
/// Item upserts merge: a NULL never overwrites a known secondary id, so the
/// row accumulates identities as different resolvers learn them. Lookups by
/// any id land on the same row.
pub struct ItemRepo {
    pool: AnyPool,
}

impl ItemRepo {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, row: &ItemRow, now_ms: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO items (kind, item_id, name, boid, rebrickable_id, image_url, piece_count, updated_ms)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (kind, item_id) DO UPDATE SET
  name = COALESCE(excluded.name, items.name),
  boid = COALESCE(excluded.boid, items.boid),
  rebrickable_id = COALESCE(excluded.rebrickable_id, items.rebrickable_id),
  image_url = COALESCE(excluded.image_url, items.image_url),
  piece_count = COALESCE(excluded.piece_count, items.piece_count),
  updated_ms = excluded.updated_ms;
"#,
        )
        .bind(row.item.kind.as_str())
        .bind(&row.item.id)
        .bind(&row.name)
        .bind(&row.boid)
        .bind(&row.rebrickable_id)
        .bind(&row.image_url)
        .bind(row.piece_count.map(|p| p as i64))
        .bind(now_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, item: &ItemRef) -> anyhow::Result<Option<ItemRow>> {
        let row = sqlx::query(
            r#"
SELECT kind, item_id, name, boid, rebrickable_id, image_url, piece_count
FROM items WHERE kind = ? AND item_id = ?;
"#,
        )
        .bind(item.kind.as_str())
        .bind(&item.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ItemRow {
            item: item.clone(),
            name: r.get("name"),
            boid: r.get("boid"),
            rebrickable_id: r.get("rebrickable_id"),
            image_url: r.get("image_url"),
            piece_count: r.get::<Option<i64>, _>("piece_count").map(|p| p as u32),
        }))
    }

    /// Secondary-id lookup: find the item row owning a boid.
    pub async fn fetch_by_boid(&self, boid: &str) -> anyhow::Result<Option<ItemRow>> {
        let row = sqlx::query(
            r#"
SELECT kind, item_id, name, boid, rebrickable_id, image_url, piece_count
FROM items WHERE boid = ?;
"#,
        )
        .bind(boid)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(r) => {
                let kind_s: String = r.get("kind");
                let Some(kind) = ItemKind::parse(&kind_s) else {
                    warn!(kind = %kind_s, "unknown kind on item row; skipping");
                    return Ok(None);
                };
                Ok(Some(ItemRow {
                    item: ItemRef {
                        kind,
                        id: r.get("item_id"),
                    },
                    name: r.get("name"),
                    boid: r.get("boid"),
                    rebrickable_id: r.get("rebrickable_id"),
                    image_url: r.get("image_url"),
                    piece_count: r.get::<Option<i64>, _>("piece_count").map(|p| p as u32),
                }))
            }
        }
    }

    // ---- resolver id cache ----

    pub async fn id_cache_get(
        &self,
        kind: ItemKind,
        input: &str,
    ) -> anyhow::Result<Option<(String, Option<String>, bool, i64)>> {
        let row = sqlx::query(
            r#"
SELECT resolved_id, display_name, exact_match, updated_ms
FROM id_cache WHERE kind = ? AND input = ?;
"#,
        )
        .bind(kind.as_str())
        .bind(input)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                r.get("resolved_id"),
                r.get("display_name"),
                r.get::<i64, _>("exact_match") != 0,
                r.get("updated_ms"),
            )
        }))
    }

    /// Upsert semantics: racing resolutions of the same input converge.
    pub async fn id_cache_put(
        &self,
        kind: ItemKind,
        input: &str,
        resolved_id: &str,
        display_name: Option<&str>,
        exact: bool,
        now_ms: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO id_cache (kind, input, resolved_id, display_name, exact_match, updated_ms)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT (kind, input) DO UPDATE SET
  resolved_id = excluded.resolved_id,
  display_name = excluded.display_name,
  exact_match = excluded.exact_match,
  updated_ms = excluded.updated_ms;
"#,
        )
        .bind(kind.as_str())
        .bind(input)
        .bind(resolved_id)
        .bind(display_name)
        .bind(exact as i32)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
