use thiserror::Error;

/// Marketplace failure taxonomy. Adapters map raw HTTP outcomes to these at
/// the boundary; nothing above them ever inspects a status code.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Credential rejected. The adapter purges its token and retries once
    /// before surfacing this.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Provider throttled us; workers back off.
    #[error("rate limited by provider")]
    RateLimit,

    /// The queried resource does not exist. Adapters convert this to an
    /// empty result before callers see it; it only escapes from lookups
    /// where absence is meaningful.
    #[error("not found")]
    NotFound,

    #[error("server error (status {status})")]
    Server { status: u16, body: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response shape: {0}")]
    Decode(String),

    /// Adapter was constructed without its credential; callers should have
    /// checked `is_configured`.
    #[error("adapter not configured")]
    NotConfigured,
}

impl MarketError {
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            MarketError::RateLimit | MarketError::Server { .. } | MarketError::Network(_)
        )
    }

    /// Maps an HTTP status to the taxonomy. 2xx must be handled before
    /// calling this.
    pub fn from_status(status: u16, body: Option<String>) -> Self {
        match status {
            401 | 403 => MarketError::Auth(format!("status {status}")),
            429 => MarketError::RateLimit,
            404 => MarketError::NotFound,
            _ => MarketError::Server { status, body },
        }
    }
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MarketError::Decode(e.to_string())
        } else {
            MarketError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(MarketError::from_status(401, None), MarketError::Auth(_)));
        assert!(matches!(MarketError::from_status(429, None), MarketError::RateLimit));
        assert!(matches!(MarketError::from_status(404, None), MarketError::NotFound));
        assert!(matches!(
            MarketError::from_status(503, None),
            MarketError::Server { status: 503, .. }
        ));
    }

    #[test]
    fn retryability() {
        assert!(MarketError::RateLimit.retryable());
        assert!(MarketError::Network("timeout".into()).retryable());
        assert!(!MarketError::Auth("denied".into()).retryable());
        assert!(!MarketError::NotFound.retryable());
    }
}
