use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Fatal at startup: the process cannot run without these.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A feature's variables were set partially.
    #[error("incomplete configuration for {feature}: {missing} not set")]
    Incomplete {
        feature: &'static str,
        missing: &'static str,
    },

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct EbayConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug)]
pub struct VapidConfig {
    pub public_key: String,
    pub private_key_pem: String,
    pub subject: String,
}

/// Process configuration, environment-only. Required keys are fatal when
/// absent; optional credentials gate their adapter or channel off.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Dispatch-queue DSN; may equal `database_url`.
    pub queue_url: String,
    pub telegram_bot_token: String,

    pub ebay: Option<EbayConfig>,
    pub ebay_default_marketplace: String,
    pub brickowl_key: Option<String>,
    pub rebrickable_key: Option<String>,
    pub vapid: Option<VapidConfig>,
    pub affiliate_campaign: Option<String>,

    pub base_url: Option<String>,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,

    pub scan_interval_secs: u64,
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let ebay = match (optional("EBAY_CLIENT_ID"), optional("EBAY_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(EbayConfig {
                client_id,
                client_secret,
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    feature: "ebay",
                    missing: "EBAY_CLIENT_SECRET",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    feature: "ebay",
                    missing: "EBAY_CLIENT_ID",
                });
            }
            (None, None) => None,
        };

        let vapid = match (
            optional("VAPID_PUBLIC_KEY"),
            optional("VAPID_PRIVATE_KEY"),
            optional("VAPID_SUBJECT"),
        ) {
            (Some(public_key), Some(private_key_pem), Some(subject)) => Some(VapidConfig {
                public_key,
                private_key_pem,
                subject,
            }),
            (None, None, None) => None,
            (public, private, _) => {
                let missing = if public.is_none() {
                    "VAPID_PUBLIC_KEY"
                } else if private.is_none() {
                    "VAPID_PRIVATE_KEY"
                } else {
                    "VAPID_SUBJECT"
                };
                return Err(ConfigError::Incomplete {
                    feature: "web push",
                    missing,
                });
            }
        };

        let port = match optional("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
            })?,
            None => 8080,
        };

        let scan_interval_secs = match optional("SCAN_INTERVAL_SECS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "SCAN_INTERVAL_SECS",
                value: raw.clone(),
            })?,
            None => 600,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            queue_url: required("QUEUE_URL")?,
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            ebay,
            ebay_default_marketplace: optional("EBAY_DEFAULT_MARKETPLACE")
                .unwrap_or_else(|| "EBAY_DE".to_string()),
            brickowl_key: optional("BRICKOWL_KEY"),
            rebrickable_key: optional("REBRICKABLE_KEY"),
            vapid,
            affiliate_campaign: optional("AFFILIATE_CAMPAIGN"),
            base_url: optional("BASE_URL"),
            port,
            log_level: optional("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: optional("LOG_JSON").is_some_and(|v| v == "1" || v == "true"),
            scan_interval_secs,
        })
    }
}
