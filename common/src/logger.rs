use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Installs the process-wide subscriber. Idempotent so integration tests can
/// call it per test without panicking. `RUST_LOG` wins over the configured
/// default filter.
pub fn init_logging(service_name: &'static str, json: bool, default_filter: &str) {
    LOGGER_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let base = fmt::layer()
            .with_target(true)
            .with_line_number(true)
            // Includes timing when the span closes
            .with_span_events(fmt::format::FmtSpan::CLOSE);

        if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(base.json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(base)
                .init();
        }

        tracing::info!(service = service_name, "logger initialized");
    });
}

/// Correlation id that follows one scan cycle through groups, upserts and
/// dispatch enqueues.
#[derive(Clone, Debug)]
pub struct CycleId(Uuid);

impl CycleId {
    pub fn to_short(&self) -> String {
        self.0.as_hyphenated().to_string()[..8].to_string()
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wraps a future and emits a warning when it takes longer than `max`.
/// Used around DB and marketplace calls that should stay fast.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = std::time::Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
