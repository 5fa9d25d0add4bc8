use serde::{Deserialize, Serialize};

use crate::item::ItemRef;

/// Why a watcher is being notified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// No prior alert for this watch.
    First,
    /// Same listing as the prior alert, at a lower price.
    PriceDrop,
    /// A different listing undercuts the previously alerted total.
    BetterDeal,
    /// The previously alerted listing disappeared.
    PreviousSold,
    /// Still-available re-check fired.
    Reminder,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::First => "first",
            NotificationType::PriceDrop => "price_drop",
            NotificationType::BetterDeal => "better_deal",
            NotificationType::PreviousSold => "previous_sold",
            NotificationType::Reminder => "reminder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "first" => Some(NotificationType::First),
            "price_drop" => Some(NotificationType::PriceDrop),
            "better_deal" => Some(NotificationType::BetterDeal),
            "previous_sold" => Some(NotificationType::PreviousSold),
            "reminder" => Some(NotificationType::Reminder),
            _ => None,
        }
    }
}

/// Delivery lifecycle of an alert row. Owned by the chat path; push is
/// additive and never transitions it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Queued,
    Sent,
    Delivered,
    Failed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Queued => "queued",
            AlertStatus::Sent => "sent",
            AlertStatus::Delivered => "delivered",
            AlertStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AlertStatus::Pending),
            "queued" => Some(AlertStatus::Queued),
            "sent" => Some(AlertStatus::Sent),
            "delivered" => Some(AlertStatus::Delivered),
            "failed" => Some(AlertStatus::Failed),
            _ => None,
        }
    }
}

/// The channel-agnostic payload handed to the dispatcher. Rendering for
/// humans happens outside the core; these are the only fields it may use.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub item_ref: ItemRef,
    pub item_name: Option<String>,
    pub price: f64,
    pub shipping: f64,
    pub import: f64,
    pub total: f64,
    pub currency_original: String,
    pub target: f64,
    pub savings_abs: f64,
    pub savings_pct: f64,
    pub ship_from_country: String,
    pub condition: String,
    pub seller_name: String,
    pub listing_url: String,
    pub is_estimate: bool,
    pub notification_reason: String,
}
