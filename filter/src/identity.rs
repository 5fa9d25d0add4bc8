use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexicon::BRAND_TOKENS;

/// Lowercased, trimmed view of a title. All matching below runs on this.
pub fn normalize(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Unicode-aware word split. Keeps letters and digits together so "sw0010"
/// survives as one token.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn has_brand(normalized: &str) -> bool {
    let toks = tokens(normalized);
    BRAND_TOKENS.iter().any(|b| toks.contains(b))
}

/// Collector code shape: short alpha prefix, digits, optional variant
/// letter (`sw0010`, `njo640a`).
pub static COLLECTOR_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)([a-z]{2,4})(\d+)([a-z]?)$").unwrap());

/// Does the title contain the set number, tolerating a `-N` revision suffix
/// and a leading `#`?
pub fn set_number_in_title(normalized: &str, number: &str) -> bool {
    let escaped = regex::escape(number);
    let pattern = format!(r"(^|[^0-9]){escaped}(-\d+)?([^0-9]|$)");
    Regex::new(&pattern)
        .map(|re| re.is_match(normalized))
        .unwrap_or(false)
}

/// Does the title contain the collector code? Sellers write `sw0010`,
/// `sw 0010`, `sw-0010` or `sw#0010`; all are accepted. A name match alone
/// is never enough for minifigs, so this is the only identity gate.
pub fn collector_code_in_title(normalized: &str, code: &str) -> bool {
    let code = code.trim().to_lowercase();
    let Some(caps) = COLLECTOR_CODE_RE.captures(&code) else {
        return false;
    };
    let prefix = regex::escape(&caps[1]);
    let digits = regex::escape(&caps[2]);
    let suffix = regex::escape(&caps[3]);
    let pattern =
        format!(r"(^|[^a-z0-9]){prefix}[\s\-#]?{digits}{suffix}([^a-z0-9]|$)");
    Regex::new(&pattern)
        .map(|re| re.is_match(normalized))
        .unwrap_or(false)
}

/// Token-wise catalog-name match: every significant name token must appear
/// in the title. Used for sets when the number is absent.
pub fn name_tokens_match(normalized: &str, catalog_name: &str) -> bool {
    let title_toks = tokens(normalized);
    let name_norm = normalize(catalog_name);
    let significant: Vec<&str> = tokens(&name_norm)
        .into_iter()
        .filter(|t| t.len() >= 3 && !BRAND_TOKENS.contains(t))
        .collect();

    !significant.is_empty() && significant.iter().all(|t| title_toks.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_number_with_suffix_and_hash() {
        let t = normalize("LEGO Star Wars #75192-1 Millennium Falcon");
        assert!(set_number_in_title(&t, "75192"));
    }

    #[test]
    fn set_number_does_not_match_inside_longer_number() {
        let t = normalize("LEGO 7519243 something");
        assert!(!set_number_in_title(&t, "75192"));
    }

    #[test]
    fn collector_code_separators() {
        for title in [
            "lego sw0010 darth vader",
            "lego sw 0010 darth vader",
            "lego sw-0010 darth vader",
            "lego sw#0010 darth vader",
        ] {
            assert!(collector_code_in_title(title, "sw0010"), "{title}");
        }
    }

    #[test]
    fn collector_code_absent() {
        let t = normalize("LEGO Darth Vader Minifigure helmet only");
        assert!(!collector_code_in_title(&t, "sw0010"));
    }

    #[test]
    fn collector_code_not_substring_of_other_code() {
        assert!(!collector_code_in_title("lego sw0010b variant", "sw0010"));
        assert!(collector_code_in_title("lego sw0010b variant", "sw0010b"));
    }

    #[test]
    fn name_match_requires_all_significant_tokens() {
        let t = normalize("LEGO Millennium Falcon UCS");
        assert!(name_tokens_match(&t, "Millennium Falcon"));
        assert!(!name_tokens_match(&t, "Millennium Falcon Cockpit"));
    }

    #[test]
    fn brand_token_is_token_scoped() {
        assert!(has_brand("lego star wars"));
        assert!(!has_brand("legoland ticket"));
    }
}
