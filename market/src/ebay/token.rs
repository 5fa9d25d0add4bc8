use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::MarketError;

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Process-wide OAuth2 client-credentials cache.
///
/// Constructed once at startup and injected. `acquire` is single-flight:
/// the mutex is held across the refresh request, so concurrent callers wait
/// for the one in-flight refresh instead of stampeding the token endpoint.
pub struct TokenStore {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    state: tokio::sync::Mutex<Option<CachedToken>>,
}

impl TokenStore {
    pub fn new(
        http: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: String,
    ) -> Self {
        Self {
            http,
            token_url,
            client_id,
            client_secret,
            scope,
            state: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns a token valid for at least the expiry margin.
    pub async fn acquire(&self) -> Result<String, MarketError> {
        let mut guard = self.state.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(cached.access_token.clone());
            }
            debug!("cached token inside expiry margin; refreshing");
        }

        let fresh = self.refresh().await?;
        let token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token. Called after an auth rejection so the next
    /// `acquire` refreshes.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    async fn refresh(&self) -> Result<CachedToken, MarketError> {
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.ok();
            return Err(MarketError::from_status(status.as_u16(), body));
        }

        let parsed: TokenResponse = resp.json().await?;
        info!(expires_in = parsed.expires_in, "marketplace token refreshed");

        Ok(CachedToken {
            access_token: parsed.access_token,
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        })
    }
}
