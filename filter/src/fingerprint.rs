use chrono::NaiveDate;
use model::Source;
use sha2::{Digest, Sha256};

/// Stable listing identity: first 16 hex chars of
/// `sha256("{source}|{seller}|{lower(title).trim()[:50]}|{price bucket}")`.
///
/// Shipping, destination and cent-level price moves never change it; a €10
/// bucket crossing does. The format is persisted: changing it invalidates
/// every dedup row, so treat it as a wire format.
pub fn fingerprint(source: Source, seller_id: Option<&str>, title: &str, price: f64) -> String {
    let seller = seller_id.filter(|s| !s.is_empty()).unwrap_or("unknown");
    let prefix: String = title.to_lowercase().trim().chars().take(50).collect();
    let bucket = price_bucket(price);

    let input = format!("{}|{}|{}|{}", source.as_str(), seller, prefix, bucket);
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// €10 buckets absorb micro-adjustments: 349.99 and 341.00 share a bucket,
/// 339.99 does not.
pub fn price_bucket(price: f64) -> i64 {
    ((price / 10.0).floor() * 10.0) as i64
}

/// Unique key on the alert row: at most one alert per (source, user,
/// fingerprint, UTC day). Max 150 chars by construction.
pub fn idempotency_key(source: Source, user_id: &str, fingerprint: &str, day: NaiveDate) -> String {
    format!(
        "{}:{}:{}:{}",
        source.as_str(),
        user_id,
        fingerprint,
        day.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_case_and_whitespace() {
        let a = fingerprint(Source::Ebay, Some("seller1"), "  LEGO 75192 Falcon ", 350.0);
        let b = fingerprint(Source::Ebay, Some("seller1"), "lego 75192 falcon", 350.0);
        assert_eq!(a, b);
    }

    #[test]
    fn stable_within_price_bucket() {
        let a = fingerprint(Source::Ebay, Some("s"), "lego 75192", 341.0);
        let b = fingerprint(Source::Ebay, Some("s"), "lego 75192", 349.99);
        assert_eq!(a, b);
    }

    #[test]
    fn changes_across_bucket_boundary() {
        let a = fingerprint(Source::Ebay, Some("s"), "lego 75192", 349.0);
        let b = fingerprint(Source::Ebay, Some("s"), "lego 75192", 350.0);
        assert_ne!(a, b);
    }

    #[test]
    fn missing_seller_is_unknown() {
        let a = fingerprint(Source::BrickOwl, None, "lego sw0010", 40.0);
        let b = fingerprint(Source::BrickOwl, Some(""), "lego sw0010", 40.0);
        assert_eq!(a, b);
    }

    #[test]
    fn sixteen_hex_chars() {
        let fp = fingerprint(Source::Ebay, Some("s"), "lego", 10.0);
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_format() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let key = idempotency_key(Source::Ebay, "1", "abcd1234abcd1234", day);
        assert_eq!(key, "ebay:1:abcd1234abcd1234:2024-01-15");
        assert!(key.len() <= 150);
    }
}
