//! Alert delivery.
//!
//! Two durable queues (`chat`, `push`) backed by SQL rows, drained by
//! bounded worker pools under per-pool jobs/s budgets, with exponential
//! backoff and bounded retention. Quiet hours defer enqueue delivery by
//! the remaining window, never drop.

pub mod chat_worker;
pub mod enqueue;
pub mod push_worker;
pub mod queue;
pub mod quiet;
pub mod rate;
pub mod telegram;
pub mod types;
pub mod webpush;

pub use chat_worker::ChatWorkerPool;
pub use enqueue::enqueue_alert;
pub use push_worker::PushWorkerPool;
pub use queue::DispatchQueue;
pub use quiet::{delay_until_end_ms, in_quiet_hours};
pub use rate::RateLimiter;
pub use telegram::{ChatSendError, ChatSender, TelegramSender};
pub use types::{ClaimedJob, JobPayload, JobStatus, PushOutcome, QueueName};
pub use webpush::{PushGateway, PushSendError, VapidPushGateway};
