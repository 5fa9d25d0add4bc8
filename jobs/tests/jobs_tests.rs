use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dispatch::{DispatchQueue, QueueName};
use filter::ConditionPref;
use market::{MarketError, RawListing};
use model::{Condition, Country, ItemRef, Source};
use scheduler::EbayPort;
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

fn normalized(
    item: &ItemRef,
    listing_id: &str,
    scanned_for: Country,
    condition: Condition,
    total: f64,
) -> model::NormalizedListing {
    model::NormalizedListing {
        source: Source::Ebay,
        listing_id: listing_id.to_string(),
        scanned_for,
        item: item.clone(),
        title: format!("LEGO {} listing", item.id),
        url: "https://ebay.test/itm".into(),
        image_url: None,
        seller_id: "s".into(),
        seller_username: "s".into(),
        seller_rating: None,
        seller_feedback: None,
        ship_from: scanned_for,
        condition,
        price: total,
        shipping: 0.0,
        shipping_estimated: false,
        import_charges: 0.0,
        import_estimated: false,
        total,
        currency_original: "EUR".into(),
        price_original: total,
        shipping_original: 0.0,
        fingerprint: format!("{listing_id:0>16}"),
        fetched_at_ms: 1_700_000_000_000,
        is_active: true,
    }
}

#[tokio::test]
async fn snapshot_aggregates_per_region_and_condition() {
    let (pool, store, _queue) = setup().await;
    let item = ItemRef::set("75192");

    store
        .listings
        .upsert_batch(&[
            normalized(&item, "a", Country::De, Condition::New, 300.0),
            normalized(&item, "b", Country::Fr, Condition::New, 400.0),
            normalized(&item, "c", Country::De, Condition::Used, 250.0),
            normalized(&item, "d", Country::Us, Condition::New, 500.0),
        ])
        .await
        .unwrap();

    let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    jobs::run_daily_snapshot(&store, day).await.unwrap();

    let rows = sqlx::query(
        r#"SELECT condition, region, min_total, avg_total, max_total, listing_count
           FROM price_history_daily WHERE item_id = '75192' ORDER BY condition, region;"#,
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 3);

    // new/EU: 300 and 400.
    let new_eu = &rows[0];
    assert_eq!(new_eu.get::<String, _>("condition"), "new");
    assert_eq!(new_eu.get::<String, _>("region"), "EU");
    assert_eq!(new_eu.get::<f64, _>("min_total"), 300.0);
    assert_eq!(new_eu.get::<f64, _>("avg_total"), 350.0);
    assert_eq!(new_eu.get::<f64, _>("max_total"), 400.0);
    assert_eq!(new_eu.get::<i64, _>("listing_count"), 2);

    // Re-running the same day replaces, not merges.
    jobs::run_daily_snapshot(&store, day).await.unwrap();
    let count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM price_history_daily WHERE item_id = '75192';"#)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 3);
}

/// eBay port scripted for the reminder re-check.
struct RecheckEbay {
    listings: Vec<RawListing>,
}

#[async_trait]
impl EbayPort for RecheckEbay {
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

fn raw(listing_id: &str, price: f64) -> RawListing {
    RawListing {
        source: Source::Ebay,
        listing_id: listing_id.to_string(),
        title: "LEGO Star Wars sw0010 Darth Vader complete minifig".to_string(),
        url: "https://ebay.test/itm/r".to_string(),
        image_url: None,
        seller_id: Some("s".to_string()),
        seller_username: "s".to_string(),
        seller_rating: None,
        seller_feedback: None,
        ship_from: Some(Country::De),
        condition: Condition::New,
        price_original: price,
        shipping_original: Some(0.0),
        currency_original: "EUR".to_string(),
    }
}

#[tokio::test]
async fn reminder_fires_when_deal_still_live() {
    let (_pool, store, queue) = setup().await;

    store
        .users
        .upsert(&store::User {
            user_id: "u1".into(),
            country: Country::De,
            timezone: "Europe/Berlin".into(),
            telegram_chat_id: Some("chat-1".into()),
            quiet_start_min: None,
            quiet_end_min: None,
            digest_enabled: false,
            scan_priority: 0,
            created_ms: 0,
        })
        .await
        .unwrap();

    let item = ItemRef::minifig("sw0010");
    let watch = store
        .watches
        .create(
            &NewWatch {
                user_id: "u1".into(),
                item: item.clone(),
                target_price: 100.0,
                min_price: 0.0,
                condition: ConditionPref::Any,
                source_brickowl: false,
            },
            1,
        )
        .await
        .unwrap();

    // Notified 4 days ago at 60, well under the 100 target.
    let notified_ms = Utc::now().timestamp_millis() - 4 * 86_400_000;
    store
        .alerts
        .upsert_notification_state(&watch.watch_id, "v1|500|0", 60.0, notified_ms)
        .await
        .unwrap();

    let ebay = Arc::new(RecheckEbay {
        listings: vec![raw("v1|500|0", 60.0)],
    });
    let reminded = jobs::run_reminders(&store, &queue, ebay, false, Utc::now())
        .await
        .unwrap();

    assert_eq!(reminded, 1);
    assert_eq!(queue.depth(QueueName::Chat).await.unwrap(), 1);

    // Counter bumped; immediately re-running does not double-remind today.
    let reminded_again = jobs::run_reminders(
        &store,
        &queue,
        Arc::new(RecheckEbay {
            listings: vec![raw("v1|500|0", 60.0)],
        }),
        false,
        Utc::now(),
    )
    .await
    .unwrap();
    assert_eq!(reminded_again, 0);
}

#[tokio::test]
async fn reminder_exhausts_when_deal_gone() {
    let (_pool, store, queue) = setup().await;

    store
        .users
        .upsert(&store::User {
            user_id: "u1".into(),
            country: Country::De,
            timezone: "Europe/Berlin".into(),
            telegram_chat_id: Some("chat-1".into()),
            quiet_start_min: None,
            quiet_end_min: None,
            digest_enabled: false,
            scan_priority: 0,
            created_ms: 0,
        })
        .await
        .unwrap();

    let item = ItemRef::minifig("sw0010");
    let watch = store
        .watches
        .create(
            &NewWatch {
                user_id: "u1".into(),
                item: item.clone(),
                target_price: 100.0,
                min_price: 0.0,
                condition: ConditionPref::Any,
                source_brickowl: false,
            },
            1,
        )
        .await
        .unwrap();

    let notified_ms = Utc::now().timestamp_millis() - 4 * 86_400_000;
    store
        .alerts
        .upsert_notification_state(&watch.watch_id, "v1|500|0", 60.0, notified_ms)
        .await
        .unwrap();

    // The listing is no longer in the marketplace response.
    let reminded = jobs::run_reminders(
        &store,
        &queue,
        Arc::new(RecheckEbay { listings: vec![] }),
        false,
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(reminded, 0);
    assert_eq!(queue.depth(QueueName::Chat).await.unwrap(), 0);

    // Exhausted: next run has no candidates left.
    let candidates = store
        .alerts
        .reminder_candidates(3, 2, 0.8, Utc::now().timestamp_millis())
        .await
        .unwrap();
    assert!(candidates.is_empty());
}
