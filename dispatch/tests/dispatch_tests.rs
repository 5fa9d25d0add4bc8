use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dispatch::{
    ChatSendError, ChatSender, ChatWorkerPool, DispatchQueue, JobPayload, QueueName, enqueue_alert,
};
use model::{AlertPayload, AlertStatus, Condition, Country, ItemRef, NotificationType, Source};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use store::{NewAlert, Store};
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

fn payload(alert_id: &str, user_id: &str, recipient: &str) -> JobPayload {
    JobPayload {
        alert_id: alert_id.to_string(),
        user_id: user_id.to_string(),
        recipient: recipient.to_string(),
        alert: AlertPayload {
            notification_type: NotificationType::First,
            item_ref: ItemRef::set("75192"),
            item_name: Some("Millennium Falcon".into()),
            price: 350.0,
            shipping: 0.0,
            import: 0.0,
            total: 350.0,
            currency_original: "EUR".into(),
            target: 400.0,
            savings_abs: 50.0,
            savings_pct: 12.5,
            ship_from_country: "DE".into(),
            condition: "new".into(),
            seller_name: "bricks_de".into(),
            listing_url: "https://ebay.test/itm/100".into(),
            is_estimate: false,
            notification_reason: "first deal under target".into(),
        },
    }
}

fn test_user(id: &str, chat: Option<&str>) -> store::User {
    store::User {
        user_id: id.to_string(),
        country: Country::De,
        timezone: "Europe/Berlin".to_string(),
        telegram_chat_id: chat.map(str::to_string),
        quiet_start_min: None,
        quiet_end_min: None,
        digest_enabled: false,
        scan_priority: 0,
        created_ms: 0,
    }
}

fn test_listing(item: &ItemRef) -> model::NormalizedListing {
    model::NormalizedListing {
        source: Source::Ebay,
        listing_id: "v1|1|0".into(),
        scanned_for: Country::De,
        item: item.clone(),
        title: "LEGO 75192".into(),
        url: "https://ebay.test/itm/1".into(),
        image_url: None,
        seller_id: "s".into(),
        seller_username: "s".into(),
        seller_rating: None,
        seller_feedback: None,
        ship_from: Country::De,
        condition: Condition::New,
        price: 350.0,
        shipping: 0.0,
        shipping_estimated: false,
        import_charges: 0.0,
        import_estimated: false,
        total: 350.0,
        currency_original: "EUR".into(),
        price_original: 350.0,
        shipping_original: 0.0,
        fingerprint: "0123456789abcdef".into(),
        fetched_at_ms: 0,
        is_active: true,
    }
}

/// Scripted chat sender: pops the next outcome per call.
struct ScriptedSender {
    outcomes: tokio::sync::Mutex<Vec<Result<(), ChatSendError>>>,
    calls: AtomicUsize,
}

#[async_trait]
impl ChatSender for ScriptedSender {
    async fn send_text(&self, _chat_id: &str, _text: &str) -> Result<(), ChatSendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes.lock().await.remove(0)
    }
}

#[tokio::test]
async fn enqueue_is_idempotent_per_job_id() {
    let (_pool, _store, queue) = setup().await;
    let p = payload("a1", "u1", "chat-1");

    let first = queue
        .enqueue("chat:a1", QueueName::Chat, &p, 0, 1_000)
        .await
        .unwrap();
    let second = queue
        .enqueue("chat:a1", QueueName::Chat, &p, 0, 2_000)
        .await
        .unwrap();

    assert!(first);
    assert!(!second, "same job id must collapse");
    assert_eq!(queue.depth(QueueName::Chat).await.unwrap(), 1);
}

#[tokio::test]
async fn delayed_jobs_are_not_claimable_early() {
    let (_pool, _store, queue) = setup().await;
    let p = payload("a2", "u1", "chat-1");

    queue
        .enqueue("chat:a2", QueueName::Chat, &p, 60_000, 1_000)
        .await
        .unwrap();

    assert!(queue.claim_one(QueueName::Chat, 30_000).await.unwrap().is_none());
    let job = queue.claim_one(QueueName::Chat, 61_001).await.unwrap();
    assert!(job.is_some());
}

#[tokio::test]
async fn retry_backoff_grows_and_exhausts() {
    let (_pool, _store, queue) = setup().await;
    let p = payload("a3", "u1", "chat-1");
    queue
        .enqueue("chat:a3", QueueName::Chat, &p, 0, 0)
        .await
        .unwrap();

    // Attempt 1 fails: retry due in 2s.
    let job = queue.claim_one(QueueName::Chat, 10).await.unwrap().unwrap();
    assert_eq!(job.attempts, 1);
    assert!(queue.fail_and_reschedule(&job, "boom", 10).await.unwrap());
    assert!(queue.claim_one(QueueName::Chat, 1_000).await.unwrap().is_none());

    // Attempt 2 fails: retry due in 4s.
    let job = queue.claim_one(QueueName::Chat, 2_100).await.unwrap().unwrap();
    assert_eq!(job.attempts, 2);
    assert!(queue.fail_and_reschedule(&job, "boom", 2_100).await.unwrap());

    // Attempt 3 fails: attempts exhausted, parked as failed.
    let job = queue.claim_one(QueueName::Chat, 7_000).await.unwrap().unwrap();
    assert_eq!(job.attempts, 3);
    assert!(!queue.fail_and_reschedule(&job, "boom", 7_000).await.unwrap());
    assert!(queue.claim_one(QueueName::Chat, 100_000).await.unwrap().is_none());
}

#[tokio::test]
async fn blocked_recipient_detaches_chat_handle() {
    let (_pool, store, queue) = setup().await;

    store.users.upsert(&test_user("u3", Some("chat-3"))).await.unwrap();

    let item = ItemRef::set("75192");
    let listing = test_listing(&item);
    let inserted = store
        .alerts
        .insert_idempotent(&NewAlert {
            user_id: "u3",
            watch_id: "w3",
            listing: &listing,
            target: 400.0,
            notification_type: NotificationType::First,
            scheduled_for_ms: None,
            idempotency_key: "ebay:u3:0123456789abcdef:2024-01-15",
            created_ms: 0,
        })
        .await
        .unwrap();
    let alert_id = match inserted {
        store::AlertInsert::Inserted { alert_id } => alert_id,
        other => panic!("unexpected {other:?}"),
    };

    let p = payload(&alert_id, "u3", "chat-3");
    queue
        .enqueue(&format!("chat:{alert_id}"), QueueName::Chat, &p, 0, 0)
        .await
        .unwrap();

    let sender = Arc::new(ScriptedSender {
        outcomes: tokio::sync::Mutex::new(vec![Err(ChatSendError::Blocked)]),
        calls: AtomicUsize::new(0),
    });
    let pool = ChatWorkerPool::new(queue.clone(), store.clone(), sender.clone());

    let job = queue
        .claim_one(QueueName::Chat, chrono::Utc::now().timestamp_millis())
        .await
        .unwrap()
        .unwrap();
    pool.process(&job).await.unwrap();

    // Handle detached, alert failed, no retry scheduled.
    let user = store.users.fetch("u3").await.unwrap().unwrap();
    assert_eq!(user.telegram_chat_id, None);
    assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    assert!(queue
        .claim_one(QueueName::Chat, i64::MAX / 2)
        .await
        .unwrap()
        .is_none());

    // Subsequent alerts for this user skip chat enqueue entirely.
    let jobs = enqueue_alert(
        &queue,
        &store,
        &user,
        "later-alert",
        &p.alert,
        false,
        chrono::Utc::now(),
    )
    .await
    .unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn successful_send_marks_alert_sent() {
    let (pool, store, queue) = setup().await;
    store.users.upsert(&test_user("u4", Some("chat-4"))).await.unwrap();

    let item = ItemRef::set("75192");
    let listing = test_listing(&item);
    let alert_id = match store
        .alerts
        .insert_idempotent(&NewAlert {
            user_id: "u4",
            watch_id: "w4",
            listing: &listing,
            target: 400.0,
            notification_type: NotificationType::First,
            scheduled_for_ms: None,
            idempotency_key: "ebay:u4:0123456789abcdef:2024-01-15",
            created_ms: 0,
        })
        .await
        .unwrap()
    {
        store::AlertInsert::Inserted { alert_id } => alert_id,
        other => panic!("unexpected {other:?}"),
    };

    let p = payload(&alert_id, "u4", "chat-4");
    queue
        .enqueue(&format!("chat:{alert_id}"), QueueName::Chat, &p, 0, 0)
        .await
        .unwrap();

    let sender = Arc::new(ScriptedSender {
        outcomes: tokio::sync::Mutex::new(vec![Ok(())]),
        calls: AtomicUsize::new(0),
    });
    let worker_pool = ChatWorkerPool::new(queue.clone(), store.clone(), sender);

    let job = queue
        .claim_one(QueueName::Chat, chrono::Utc::now().timestamp_millis())
        .await
        .unwrap()
        .unwrap();
    worker_pool.process(&job).await.unwrap();

    let status: String =
        sqlx::query_scalar(r#"SELECT status FROM alert_history WHERE alert_id = ?;"#)
            .bind(&alert_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, AlertStatus::Sent.as_str());
}
