use std::sync::Arc;

use async_trait::async_trait;
use dispatch::{DispatchQueue, QueueName};
use filter::ConditionPref;
use market::{MarketError, RawListing};
use model::{Condition, Country, ItemRef, Source};
use scheduler::{Counters, CycleConfig, EbayPort, ScanScheduler};
use sqlx::{AnyPool, Row};
use sqlx::any::AnyPoolOptions;
use store::{NewWatch, Store};
use uuid::Uuid;

async fn setup() -> (AnyPool, Store, DispatchQueue) {
    sqlx::any::install_default_drivers();
    let conn = format!(
        "sqlite:file:{}?mode=memory&cache=shared",
        Uuid::new_v4()
    );
    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&conn)
        .await
        .expect("connect");

    store::schema::migrate(&pool).await.expect("store schema");
    dispatch::queue::migrate(&pool).await.expect("queue schema");

    let db = store::Db {
        pool: Arc::new(pool.clone()),
    };
    (pool.clone(), Store::new(&db), DispatchQueue::new(pool))
}

/// Fixed-response eBay port.
struct StaticEbay {
    listings: Vec<RawListing>,
}

#[async_trait]
impl EbayPort for StaticEbay {
    async fn search(
        &self,
        _item: &ItemRef,
        _ship_to: Country,
        _limit: u32,
        _offset: u32,
    ) -> Result<Vec<RawListing>, MarketError> {
        Ok(self.listings.clone())
    }
}

/// eBay port that always fails; exercises per-group error recording.
struct BrokenEbay;

#[async_trait]
impl EbayPort for BrokenEbay {
    async fn search(
        &self,
        _item: &ItemRef,
        _ship_to: Country,
        _limit: u32,
        _offset: u32,
    ) -> Result<Vec<RawListing>, MarketError> {
        Err(MarketError::Server {
            status: 503,
            body: None,
        })
    }
}

fn raw_listing(listing_id: &str, price: f64, ship_from: Country) -> RawListing {
    RawListing {
        source: Source::Ebay,
        listing_id: listing_id.to_string(),
        title: "LEGO Star Wars 75192 Millennium Falcon UCS".to_string(),
        url: format!("https://ebay.test/itm/{listing_id}"),
        image_url: None,
        seller_id: Some("bricks_de".to_string()),
        seller_username: "bricks_de".to_string(),
        seller_rating: Some(99.8),
        seller_feedback: Some(5432),
        ship_from: Some(ship_from),
        condition: Condition::New,
        price_original: price,
        shipping_original: Some(0.0),
        currency_original: "EUR".to_string(),
    }
}

fn scheduler_with(
    store: &Store,
    queue: &DispatchQueue,
    ebay: Arc<dyn EbayPort>,
) -> ScanScheduler {
    ScanScheduler::new(
        store.clone(),
        queue.clone(),
        Some(ebay),
        None,
        None,
        false,
        Counters::default(),
        CycleConfig::default(),
    )
}

fn test_user(id: &str, country: Country) -> store::User {
    store::User {
        user_id: id.to_string(),
        country,
        timezone: "Europe/Berlin".to_string(),
        telegram_chat_id: Some(format!("chat-{id}")),
        quiet_start_min: None,
        quiet_end_min: None,
        digest_enabled: false,
        scan_priority: 0,
        created_ms: 0,
    }
}

async fn make_watch(store: &Store, user: &str, item: &ItemRef, target: f64, min: f64) {
    store
        .watches
        .create(
            &NewWatch {
                user_id: user.to_string(),
                item: item.clone(),
                target_price: target,
                min_price: min,
                condition: ConditionPref::Any,
                source_brickowl: false,
            },
            1,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn basic_set_alert_end_to_end() {
    let (pool, store, queue) = setup().await;

    store.users.upsert(&test_user("u1", Country::De)).await.unwrap();
    let item = ItemRef::set("75192");
    make_watch(&store, "u1", &item, 400.0, 10.0).await;

    let ebay = Arc::new(StaticEbay {
        listings: vec![raw_listing("v1|100|0", 350.0, Country::De)],
    });
    let sched = scheduler_with(&store, &queue, ebay);

    let stats = sched.run_cycle().await.unwrap();
    assert_eq!(stats.groups, 1);
    assert_eq!(stats.listings, 1);
    assert_eq!(stats.alerts, 1);

    // Alert row: domestic free shipping, total = price, first deal.
    let row = sqlx::query(
        r#"SELECT total, notification_type, idempotency_key, status FROM alert_history;"#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<f64, _>("total"), 350.0);
    assert_eq!(row.get::<String, _>("notification_type"), "first");
    assert_eq!(row.get::<String, _>("status"), "queued");
    let key: String = row.get("idempotency_key");
    assert!(key.starts_with("ebay:u1:"), "{key}");
    assert_eq!(key.split(':').count(), 4);

    // One chat job, dispatched immediately (no quiet hours).
    assert_eq!(queue.depth(QueueName::Chat).await.unwrap(), 1);
    let job = queue
        .claim_one(QueueName::Chat, chrono::Utc::now().timestamp_millis())
        .await
        .unwrap()
        .expect("chat job due now");
    assert_eq!(job.payload.user_id, "u1");
    assert_eq!(job.payload.alert.total, 350.0);
}

#[tokio::test]
async fn rescan_same_day_is_deduplicated() {
    let (pool, store, queue) = setup().await;

    store.users.upsert(&test_user("u1", Country::De)).await.unwrap();
    let item = ItemRef::set("75192");
    make_watch(&store, "u1", &item, 400.0, 10.0).await;

    let ebay = Arc::new(StaticEbay {
        listings: vec![raw_listing("v1|100|0", 350.0, Country::De)],
    });
    let sched = scheduler_with(&store, &queue, ebay);

    let first = sched.run_cycle().await.unwrap();
    assert_eq!(first.alerts, 1);

    // Second scan sees the identical offer: idempotency conflict, no alert.
    let second = sched.run_cycle().await.unwrap();
    assert_eq!(second.alerts, 0);

    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM alert_history;"#)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn above_target_never_alerts() {
    let (pool, store, queue) = setup().await;

    // GB buyer, DE seller at 500 + 25 shipping: import charges push the
    // landed total to 640, above the 600 target.
    store.users.upsert(&test_user("u2", Country::Gb)).await.unwrap();
    let item = ItemRef::set("75192");
    make_watch(&store, "u2", &item, 600.0, 0.0).await;

    let mut listing = raw_listing("v1|200|0", 500.0, Country::De);
    listing.shipping_original = Some(25.0);

    let sched = scheduler_with(&store, &queue, Arc::new(StaticEbay { listings: vec![listing] }));
    let stats = sched.run_cycle().await.unwrap();

    assert_eq!(stats.listings, 1, "listing is recorded");
    assert_eq!(stats.alerts, 0, "but no alert above target");

    let total: f64 = sqlx::query_scalar(r#"SELECT total FROM listings;"#)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 640.0);
}

#[tokio::test]
async fn adapter_failure_is_contained_per_group() {
    let (_pool, store, queue) = setup().await;

    store.users.upsert(&test_user("u1", Country::De)).await.unwrap();
    make_watch(&store, "u1", &ItemRef::set("75192"), 400.0, 0.0).await;

    let sched = scheduler_with(&store, &queue, Arc::new(BrokenEbay));
    let stats = sched.run_cycle().await.unwrap();

    // The cycle itself succeeds; the group recorded its error.
    assert_eq!(stats.groups, 1);
    assert_eq!(stats.alerts, 0);
}

#[tokio::test]
async fn cross_block_seller_never_reaches_an_eu_buyer() {
    let (pool, store, queue) = setup().await;

    store.users.upsert(&test_user("u1", Country::De)).await.unwrap();
    make_watch(&store, "u1", &ItemRef::set("75192"), 400.0, 0.0).await;

    // US seller: dropped at normalization (cross-block), never persisted.
    let sched = scheduler_with(
        &store,
        &queue,
        Arc::new(StaticEbay {
            listings: vec![raw_listing("v1|300|0", 300.0, Country::Us)],
        }),
    );
    let stats = sched.run_cycle().await.unwrap();

    assert_eq!(stats.listings, 0);
    assert_eq!(stats.alerts, 0);
    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM listings;"#)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn watcher_gets_best_offer_first() {
    let (pool, store, queue) = setup().await;

    store.users.upsert(&test_user("u1", Country::De)).await.unwrap();
    make_watch(&store, "u1", &ItemRef::set("75192"), 400.0, 0.0).await;

    // Batch with three prices; cheapness reference is the second-cheapest
    // (350), and 340 is within 35% of it, so the cheapest passing listing
    // wins.
    let sched = scheduler_with(
        &store,
        &queue,
        Arc::new(StaticEbay {
            listings: vec![
                raw_listing("v1|1|0", 390.0, Country::De),
                raw_listing("v1|2|0", 340.0, Country::De),
                raw_listing("v1|3|0", 350.0, Country::De),
            ],
        }),
    );
    let stats = sched.run_cycle().await.unwrap();
    assert_eq!(stats.alerts, 1);

    let alerted: String = sqlx::query_scalar(r#"SELECT listing_id FROM alert_history;"#)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(alerted, "v1|2|0");
}
