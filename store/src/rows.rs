use filter::ConditionPref;
use model::{Country, ItemKind, ItemRef};

/// Watch lifecycle: stopped watches keep their history and counters and can
/// be resumed; nothing is ever deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchStatus {
    Active,
    Stopped,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Active => "active",
            WatchStatus::Stopped => "stopped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(WatchStatus::Active),
            "stopped" => Some(WatchStatus::Stopped),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub user_id: String,
    pub country: Country,
    pub timezone: String,
    pub telegram_chat_id: Option<String>,
    /// Quiet hours as minutes of local day; None disables them.
    pub quiet_start_min: Option<i32>,
    pub quiet_end_min: Option<i32>,
    pub digest_enabled: bool,
    pub scan_priority: i32,
    pub created_ms: i64,
}

#[derive(Clone, Debug)]
pub struct Watch {
    pub watch_id: String,
    pub user_id: String,
    pub item: ItemRef,
    pub target_price: f64,
    pub min_price: f64,
    pub condition: ConditionPref,
    pub ship_from_allow: Vec<Country>,
    pub min_seller_rating: Option<f64>,
    pub min_seller_feedback: Option<i64>,
    pub exclude_words: Vec<String>,
    pub source_ebay: bool,
    pub source_brickowl: bool,
    pub status: WatchStatus,
    pub snoozed_until_ms: Option<i64>,
    pub alerts_sent: i64,
    pub created_ms: i64,
}

/// Caller-supplied fields for watch creation; everything else defaults.
#[derive(Clone, Debug)]
pub struct NewWatch {
    pub user_id: String,
    pub item: ItemRef,
    pub target_price: f64,
    pub min_price: f64,
    pub condition: ConditionPref,
    pub source_brickowl: bool,
}

/// One (item, ship-to) aggregation of active watches: a single provider
/// query serves every watcher in the group.
#[derive(Clone, Debug)]
pub struct ScanGroup {
    pub item: ItemRef,
    pub ship_to: Country,
    pub watcher_count: i64,
    pub max_priority: i32,
    pub any_brickowl: bool,
}

#[derive(Clone, Debug)]
pub struct ItemRow {
    pub item: ItemRef,
    pub name: Option<String>,
    pub boid: Option<String>,
    pub rebrickable_id: Option<String>,
    pub image_url: Option<String>,
    pub piece_count: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct NotificationState {
    pub watch_id: String,
    pub listing_id: String,
    pub notified_ms: i64,
    pub notified_price: f64,
    pub reminder_count: i32,
    pub last_reminder_ms: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct PushSubscription {
    pub sub_id: String,
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub active: bool,
}

/// Per-user alert counts over the throttling windows.
#[derive(Clone, Copy, Debug, Default)]
pub struct UserWindowCounts {
    pub today: i64,
    pub this_hour: i64,
    pub last_10_min: i64,
    pub per_item_today: i64,
    pub best_total_today: Option<f64>,
}

/// Countries are stored as a comma-separated code list; unknown codes are
/// skipped on read so a bad row cannot poison a scan.
pub fn countries_to_csv(countries: &[Country]) -> String {
    countries
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn countries_from_csv(csv: &str) -> Vec<Country> {
    csv.split(',')
        .filter_map(Country::parse)
        .collect()
}

pub fn words_to_csv(words: &[String]) -> String {
    words.join(",")
}

pub fn words_from_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn item_from_row(kind: &str, item_id: &str) -> anyhow::Result<ItemRef> {
    let kind = ItemKind::parse(kind)
        .ok_or_else(|| anyhow::anyhow!("unknown item kind in row: {kind}"))?;
    Ok(ItemRef {
        kind,
        id: item_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_csv_roundtrip() {
        let list = vec![Country::De, Country::Gb, Country::Fr];
        let csv = countries_to_csv(&list);
        assert_eq!(csv, "DE,GB,FR");
        assert_eq!(countries_from_csv(&csv), list);
    }

    #[test]
    fn bad_codes_are_skipped() {
        assert_eq!(countries_from_csv("DE,XX,GB"), vec![Country::De, Country::Gb]);
        assert!(countries_from_csv("").is_empty());
    }
}
