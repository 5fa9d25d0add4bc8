use model::Country;
use sqlx::{AnyPool, Row};
use tracing::{info, instrument, warn};

use crate::rows::{PushSubscription, User, countries_to_csv};

/// User rows and their notification bindings.
pub struct UserRepo {
    pool: AnyPool,
}

impl UserRepo {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO users (user_id, country, timezone, telegram_chat_id, quiet_start_min,
                   quiet_end_min, digest_enabled, scan_priority, created_ms)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (user_id) DO UPDATE SET
  country = excluded.country,
  timezone = excluded.timezone,
  telegram_chat_id = excluded.telegram_chat_id,
  quiet_start_min = excluded.quiet_start_min,
  quiet_end_min = excluded.quiet_end_min,
  digest_enabled = excluded.digest_enabled,
  scan_priority = excluded.scan_priority;
"#,
        )
        .bind(&user.user_id)
        .bind(user.country.as_str())
        .bind(&user.timezone)
        .bind(&user.telegram_chat_id)
        .bind(user.quiet_start_min)
        .bind(user.quiet_end_min)
        .bind(user.digest_enabled as i32)
        .bind(user.scan_priority)
        .bind(user.created_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            r#"
SELECT user_id, country, timezone, telegram_chat_id, quiet_start_min,
       quiet_end_min, digest_enabled, scan_priority, created_ms
FROM users WHERE user_id = ?;
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_user(&r)?)),
            None => Ok(None),
        }
    }

    /// Changes a user's country and rewrites every watch's ship-from
    /// allowlist to the new region default in one statement.
    #[instrument(skip(self))]
    pub async fn set_country(&self, user_id: &str, country: Country) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"UPDATE users SET country = ? WHERE user_id = ?;"#)
            .bind(country.as_str())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let allow = countries_to_csv(&country.default_allowlist());
        sqlx::query(r#"UPDATE watches SET ship_from_allow = ? WHERE user_id = ?;"#)
            .bind(&allow)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(user_id, country = country.as_str(), "country changed; allowlists rewritten");
        Ok(())
    }

    /// Detaches the chat binding after the provider reports the user
    /// blocked the bot. Alerts for this user skip chat until reconnect.
    pub async fn clear_telegram_chat(&self, user_id: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET telegram_chat_id = NULL WHERE user_id = ?;"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        warn!(user_id, "telegram chat binding cleared");
        Ok(())
    }

    pub async fn digest_recipients(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
SELECT user_id, country, timezone, telegram_chat_id, quiet_start_min,
       quiet_end_min, digest_enabled, scan_priority, created_ms
FROM users
WHERE digest_enabled = 1 AND telegram_chat_id IS NOT NULL;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_user(&r) {
                Ok(u) => out.push(u),
                Err(e) => warn!(error = %e, "skipping malformed user row"),
            }
        }
        Ok(out)
    }

    pub async fn active_push_subscriptions(
        &self,
        user_id: &str,
    ) -> anyhow::Result<Vec<PushSubscription>> {
        let rows = sqlx::query(
            r#"
SELECT sub_id, user_id, endpoint, p256dh, auth, active
FROM push_subscriptions
WHERE user_id = ? AND active = 1;
"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| PushSubscription {
                sub_id: r.get("sub_id"),
                user_id: r.get("user_id"),
                endpoint: r.get("endpoint"),
                p256dh: r.get("p256dh"),
                auth: r.get("auth"),
                active: r.get::<i64, _>("active") != 0,
            })
            .collect())
    }

    pub async fn add_push_subscription(&self, sub: &PushSubscription) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO push_subscriptions (sub_id, user_id, endpoint, p256dh, auth, active, created_ms)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (sub_id) DO UPDATE SET active = excluded.active;
"#,
        )
        .bind(&sub.sub_id)
        .bind(&sub.user_id)
        .bind(&sub.endpoint)
        .bind(&sub.p256dh)
        .bind(&sub.auth)
        .bind(sub.active as i32)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deactivates a subscription the push service reported gone (HTTP 404
    /// or 410 on delivery).
    pub async fn deactivate_push_subscription(&self, sub_id: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE push_subscriptions SET active = 0 WHERE sub_id = ?;"#)
            .bind(sub_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_user(r: &sqlx::any::AnyRow) -> anyhow::Result<User> {
    let country_code: String = r.get("country");
    let country = Country::parse(&country_code)
        .ok_or_else(|| anyhow::anyhow!("unknown country in user row: {country_code}"))?;

    Ok(User {
        user_id: r.get("user_id"),
        country,
        timezone: r.get("timezone"),
        telegram_chat_id: r.get("telegram_chat_id"),
        quiet_start_min: r.get::<Option<i64>, _>("quiet_start_min").map(|v| v as i32),
        quiet_end_min: r.get::<Option<i64>, _>("quiet_end_min").map(|v| v as i32),
        digest_enabled: r.get::<i64, _>("digest_enabled") != 0,
        scan_priority: r.get::<i64, _>("scan_priority") as i32,
        created_ms: r.get("created_ms"),
    })
}
