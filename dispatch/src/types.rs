use model::AlertPayload;
use serde::{Deserialize, Serialize};

/// The two durable queues. Chat owns the alert's delivery status; push is
/// additive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueName {
    Chat,
    Push,
}

impl QueueName {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Chat => "chat",
            QueueName::Push => "push",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(QueueName::Chat),
            "push" => Some(QueueName::Push),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// What a dispatch job carries. `recipient` is a chat id for the chat
/// queue and a user id for the push queue (push fans out to that user's
/// subscriptions at delivery time).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobPayload {
    pub alert_id: String,
    pub user_id: String,
    pub recipient: String,
    pub alert: AlertPayload,
}

/// A claimed job as the worker sees it.
#[derive(Clone, Debug)]
pub struct ClaimedJob {
    pub job_id: String,
    pub queue: QueueName,
    pub attempts: i64,
    pub max_attempts: i64,
    pub payload: JobPayload,
}

/// Push fan-out result over a user's subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    Partial,
    Failed,
    NoSubscriptions,
}

impl PushOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushOutcome::Sent => "sent",
            PushOutcome::Partial => "partial",
            PushOutcome::Failed => "failed",
            PushOutcome::NoSubscriptions => "no_subscriptions",
        }
    }
}
