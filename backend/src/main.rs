mod config;
mod id_cache;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Utc, Weekday};
use config::Config;
use dispatch::{ChatWorkerPool, DispatchQueue, PushWorkerPool, TelegramSender, VapidPushGateway};
use market::{BrickOwlClient, EbayClient, RebrickableClient, Resolver};
use scheduler::{BrickOwlPort, Counters, CycleConfig, EbayPort, ScanScheduler};
use sqlx::any::AnyPoolOptions;
use store::{Db, Store};
use tracing::{error, info};

use crate::id_cache::SqlIdCache;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

async fn init_store(cfg: &Config) -> anyhow::Result<Store> {
    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;
    Ok(Store::new(&db))
}

async fn init_queue(cfg: &Config) -> anyhow::Result<DispatchQueue> {
    let pool = AnyPoolOptions::new()
        .max_connections(8)
        .connect(&cfg.queue_url)
        .await?;
    dispatch::queue::migrate(&pool).await?;
    Ok(DispatchQueue::new(pool))
}

fn build_ebay(cfg: &Config, http: &reqwest::Client) -> Option<Arc<EbayClient>> {
    let creds = cfg.ebay.as_ref()?;
    let tokens = Arc::new(market::ebay::TokenStore::new(
        http.clone(),
        market::ebay::TOKEN_URL.to_string(),
        creds.client_id.clone(),
        creds.client_secret.clone(),
        market::ebay::TOKEN_SCOPE.to_string(),
    ));
    Some(Arc::new(EbayClient::new(
        http.clone(),
        tokens,
        cfg.ebay_default_marketplace.clone(),
        cfg.affiliate_campaign.clone(),
    )))
}

/// Starts the scan loop at a fixed cadence. A failing cycle is logged and
/// the next tick proceeds.
fn start_scan_loop(sched: Arc<ScanScheduler>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sched.run_cycle().await {
                error!(error = ?e, "scan cycle failed");
            }
        }
    });
}

fn start_jobs(
    store: Store,
    queue: DispatchQueue,
    sender: Arc<TelegramSender>,
    ebay: Option<Arc<dyn EbayPort>>,
    push_enabled: bool,
) {
    {
        let store = store.clone();
        let sender = sender.clone();
        jobs::spawn_weekly("weekly_digest", Weekday::Sun, 17, move || {
            let store = store.clone();
            let sender = sender.clone();
            async move {
                jobs::run_weekly_digest(&store, sender, Utc::now()).await?;
                Ok(())
            }
        });
    }

    if let Some(ebay) = ebay {
        let store = store.clone();
        let queue = queue.clone();
        jobs::spawn_daily("still_available_reminder", 8, 30, move || {
            let store = store.clone();
            let queue = queue.clone();
            let ebay = ebay.clone();
            async move {
                jobs::run_reminders(&store, &queue, ebay, push_enabled, Utc::now()).await?;
                Ok(())
            }
        });
    }

    {
        let store = store.clone();
        jobs::spawn_daily("daily_price_snapshot", 0, 5, move || {
            let store = store.clone();
            async move { jobs::run_daily_snapshot(&store, Utc::now().date_naive()).await }
        });
    }

    {
        jobs::spawn_daily("expired_deal_cleanup", 0, 10, move || {
            let store = store.clone();
            let queue = queue.clone();
            async move {
                jobs::run_cleanup(&store, &queue, now_ms()).await?;
                Ok(())
            }
        });
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config problems are fatal before anything else starts.
    let cfg = Config::from_env()?;
    common::init_logging("brickwatch", cfg.log_json, &cfg.log_level);
    sqlx::any::install_default_drivers();

    info!(
        port = cfg.port,
        base_url = ?cfg.base_url,
        scan_interval_secs = cfg.scan_interval_secs,
        "starting brickwatch"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(market::HTTP_TIMEOUT_SECS))
        .pool_idle_timeout(Duration::from_secs(30))
        .build()?;

    let store = init_store(&cfg).await?;
    let queue = init_queue(&cfg).await?;

    // Adapters are feature-gated by their credentials.
    let ebay = build_ebay(&cfg, &http);
    let brickowl = cfg
        .brickowl_key
        .clone()
        .map(|key| Arc::new(BrickOwlClient::new(http.clone(), key)));
    let rebrickable = cfg
        .rebrickable_key
        .clone()
        .map(|key| Arc::new(RebrickableClient::new(http.clone(), key)));

    let resolver = brickowl.as_ref().map(|bo| {
        Arc::new(Resolver::new(
            Some(bo.clone()),
            rebrickable.clone(),
            Arc::new(SqlIdCache::new(store.items.clone())),
            now_ms,
        ))
    });

    // Delivery channels.
    let sender = Arc::new(TelegramSender::new(http.clone(), cfg.telegram_bot_token.clone()));
    Arc::new(ChatWorkerPool::new(
        queue.clone(),
        store.clone(),
        sender.clone(),
    ))
    .spawn();

    let push_enabled = cfg.vapid.is_some();
    if let Some(vapid) = &cfg.vapid {
        let gateway = Arc::new(VapidPushGateway::new(
            http.clone(),
            vapid.public_key.clone(),
            &vapid.private_key_pem,
            vapid.subject.clone(),
        )?);
        Arc::new(PushWorkerPool::new(queue.clone(), store.clone(), gateway)).spawn();
    }

    let ebay_port: Option<Arc<dyn EbayPort>> = ebay.map(|c| c as Arc<dyn EbayPort>);
    let brickowl_port: Option<Arc<dyn BrickOwlPort>> =
        brickowl.map(|c| c as Arc<dyn BrickOwlPort>);

    let sched = Arc::new(ScanScheduler::new(
        store.clone(),
        queue.clone(),
        ebay_port.clone(),
        brickowl_port,
        resolver,
        push_enabled,
        Counters::default(),
        CycleConfig::default(),
    ));
    start_scan_loop(sched, Duration::from_secs(cfg.scan_interval_secs));

    start_jobs(store, queue, sender, ebay_port, push_enabled);

    info!("brickwatch started; waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    Ok(())
}
