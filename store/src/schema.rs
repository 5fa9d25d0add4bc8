//! Idempotent schema creation. Types stay on the portable subset both
//! backends share: TEXT ids, BIGINT epoch-milliseconds, DOUBLE PRECISION
//! money, INTEGER booleans.

use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS users (
  user_id TEXT PRIMARY KEY,
  country TEXT NOT NULL,
  timezone TEXT NOT NULL,
  telegram_chat_id TEXT,
  quiet_start_min INTEGER,
  quiet_end_min INTEGER,
  digest_enabled INTEGER NOT NULL DEFAULT 0,
  scan_priority INTEGER NOT NULL DEFAULT 0,
  created_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS items (
  kind TEXT NOT NULL,
  item_id TEXT NOT NULL,
  name TEXT,
  boid TEXT,
  rebrickable_id TEXT,
  image_url TEXT,
  piece_count INTEGER,
  updated_ms BIGINT NOT NULL,
  PRIMARY KEY (kind, item_id)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS watches (
  watch_id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL REFERENCES users(user_id),
  kind TEXT NOT NULL,
  item_id TEXT NOT NULL,
  target_price DOUBLE PRECISION NOT NULL,
  min_price DOUBLE PRECISION NOT NULL DEFAULT 0,
  condition TEXT NOT NULL DEFAULT 'any',
  ship_from_allow TEXT NOT NULL,
  min_seller_rating DOUBLE PRECISION,
  min_seller_feedback BIGINT,
  exclude_words TEXT NOT NULL DEFAULT '',
  source_ebay INTEGER NOT NULL DEFAULT 1,
  source_brickowl INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL DEFAULT 'active',
  snoozed_until_ms BIGINT,
  alerts_sent BIGINT NOT NULL DEFAULT 0,
  created_ms BIGINT NOT NULL,
  UNIQUE (user_id, kind, item_id)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS listings (
  source TEXT NOT NULL,
  listing_id TEXT NOT NULL,
  scanned_for TEXT NOT NULL,
  kind TEXT NOT NULL,
  item_id TEXT NOT NULL,
  title TEXT NOT NULL,
  url TEXT NOT NULL,
  image_url TEXT,
  seller_id TEXT NOT NULL,
  seller_username TEXT NOT NULL,
  seller_rating DOUBLE PRECISION,
  seller_feedback BIGINT,
  ship_from TEXT NOT NULL,
  condition TEXT NOT NULL,
  price DOUBLE PRECISION NOT NULL,
  shipping DOUBLE PRECISION NOT NULL,
  shipping_estimated INTEGER NOT NULL,
  import_charges DOUBLE PRECISION NOT NULL,
  import_estimated INTEGER NOT NULL,
  total DOUBLE PRECISION NOT NULL,
  currency_original TEXT NOT NULL,
  price_original DOUBLE PRECISION NOT NULL,
  shipping_original DOUBLE PRECISION NOT NULL,
  fingerprint TEXT NOT NULL,
  fetched_ms BIGINT NOT NULL,
  is_active INTEGER NOT NULL DEFAULT 1,
  expires_at_ms BIGINT,
  PRIMARY KEY (source, listing_id, scanned_for)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS alert_history (
  alert_id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL,
  watch_id TEXT NOT NULL,
  source TEXT NOT NULL,
  listing_id TEXT NOT NULL,
  scanned_for TEXT NOT NULL,
  kind TEXT NOT NULL,
  item_id TEXT NOT NULL,
  price DOUBLE PRECISION NOT NULL,
  shipping DOUBLE PRECISION NOT NULL,
  total DOUBLE PRECISION NOT NULL,
  target DOUBLE PRECISION NOT NULL,
  delta_percent DOUBLE PRECISION NOT NULL,
  notification_type TEXT NOT NULL,
  status TEXT NOT NULL DEFAULT 'pending',
  scheduled_for_ms BIGINT,
  created_ms BIGINT NOT NULL,
  sent_ms BIGINT,
  idempotency_key TEXT NOT NULL UNIQUE,
  fingerprint TEXT NOT NULL,
  channel_jobs TEXT NOT NULL DEFAULT ''
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS watch_notification_state (
  watch_id TEXT NOT NULL,
  listing_id TEXT NOT NULL,
  notified_ms BIGINT NOT NULL,
  notified_price DOUBLE PRECISION NOT NULL,
  reminder_count INTEGER NOT NULL DEFAULT 0,
  last_reminder_ms BIGINT,
  PRIMARY KEY (watch_id, listing_id)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS id_cache (
  kind TEXT NOT NULL,
  input TEXT NOT NULL,
  resolved_id TEXT NOT NULL,
  display_name TEXT,
  exact_match INTEGER NOT NULL DEFAULT 1,
  updated_ms BIGINT NOT NULL,
  PRIMARY KEY (kind, input)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS price_history_daily (
  day TEXT NOT NULL,
  kind TEXT NOT NULL,
  item_id TEXT NOT NULL,
  condition TEXT NOT NULL,
  source TEXT NOT NULL,
  region TEXT NOT NULL,
  min_total DOUBLE PRECISION NOT NULL,
  avg_total DOUBLE PRECISION NOT NULL,
  max_total DOUBLE PRECISION NOT NULL,
  listing_count BIGINT NOT NULL,
  PRIMARY KEY (day, kind, item_id, condition, source, region)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS push_subscriptions (
  sub_id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL,
  endpoint TEXT NOT NULL,
  p256dh TEXT NOT NULL,
  auth TEXT NOT NULL,
  active INTEGER NOT NULL DEFAULT 1,
  created_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_watches_user ON watches(user_id);"#)
        .execute(pool)
        .await?;
    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_watches_item ON watches(kind, item_id);"#)
        .execute(pool)
        .await?;
    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_listings_item ON listings(kind, item_id, scanned_for);"#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_alerts_user_created ON alert_history(user_id, created_ms);"#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_alerts_fingerprint ON alert_history(user_id, fingerprint, created_ms);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
