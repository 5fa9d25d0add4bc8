//! Title & quality filter.
//!
//! A deterministic, short-circuiting pipeline: given the same candidate,
//! watch and batch context it always produces the same verdict, so every
//! decision can be replayed offline from a logged title.
//!
//! Step order (first failure wins):
//! 1. watch constraints (ship-from allowlist, exclude words, seller floors)
//! 2. brand token
//! 3. item identity (set number / collector code)
//! 4. element-number rejection (minifig)
//! 5. positional body-part rule (minifig)
//! 6. negative-keyword categories
//! 7. set-posing-as-minifig
//! 8. price sanity
//! 9. condition match
//! 10. suspicious cheapness (sets, batch-relative)
//! 11. quality score threshold

use model::{Condition, Country, ItemKind, ItemRef};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::condition::{ConditionPref, condition_matches, effective_condition};
use crate::identity::{
    collector_code_in_title, has_brand, name_tokens_match, normalize, set_number_in_title, tokens,
};
use crate::lexicon::{
    BODY_PART_STEMS, COMMON_ELEMENT_PARTS, MINIFIG_INDICATORS, NEGATIVE_KEYWORDS,
    NegativeCategory, SET_WORDS,
};

/// Price band for minifigs; anything outside is a mislisting or a scam.
pub const MINIFIG_PRICE_MIN: f64 = 0.50;
pub const MINIFIG_PRICE_MAX: f64 = 2000.0;

/// Above this price, a "minifig" listing naming a set number is almost
/// certainly the whole set.
pub const SET_AS_MINIFIG_PRICE: f64 = 100.0;

/// Listings more than this fraction below the batch reference are dropped.
pub const CHEAPNESS_RATIO: f64 = 0.35;

pub const DEFAULT_SCORE_THRESHOLD: u8 = 40;

static ELEMENT_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[^a-z0-9])\d{4,6}(pb|pr|px)\d+[a-z]?([^a-z0-9]|$)").unwrap()
});

static SET_NUMBER_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^a-z0-9])\d{4,5}([^a-z0-9]|$)").unwrap());

/// One marketplace candidate, reduced to the fields the filter reads.
#[derive(Clone, Debug)]
pub struct Candidate<'a> {
    pub title: &'a str,
    /// Item price in canonical EUR, before shipping.
    pub price: f64,
    pub condition: Condition,
    pub ship_from: Country,
    pub seller_rating: Option<f64>,
    pub seller_feedback: Option<i64>,
    /// True for catalog-keyed sources (BrickOwl lots): identity is
    /// guaranteed by the opaque id and the title is synthesized, so the
    /// lexical steps (brand, identity, element numbers, body parts,
    /// negative keywords, set-posing) do not apply.
    pub identity_verified: bool,
}

/// The watch-side inputs to a filter run.
#[derive(Clone, Debug)]
pub struct WatchContext<'a> {
    pub item: &'a ItemRef,
    pub item_name: Option<&'a str>,
    pub condition: ConditionPref,
    pub min_price: f64,
    pub exclude_words: &'a [String],
    pub ship_from_allow: &'a [Country],
    pub min_seller_rating: Option<f64>,
    pub min_seller_feedback: Option<i64>,
    pub score_threshold: u8,
}

/// Batch-relative context: the reference price for the suspicious-cheapness
/// rule is the second-cheapest candidate of the scan batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchContext {
    pub reference_price: Option<f64>,
}

impl BatchContext {
    pub fn from_batch_prices(prices: &[f64]) -> Self {
        let mut sorted: Vec<f64> = prices.iter().copied().filter(|p| *p > 0.0).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            reference_price: sorted.get(1).copied(),
        }
    }
}

/// Machine-readable rejection cause; `tag()` is stable for logs and the
/// replay endpoint.
#[derive(Clone, Debug, PartialEq)]
pub enum RejectReason {
    ShipFromNotAllowed,
    ExcludedWord(String),
    SellerRatingBelowFloor,
    SellerFeedbackBelowFloor,
    MissingBrand,
    IdentityNotInTitle,
    ElementNumber,
    BodyPartWord(String),
    NegativeKeyword(NegativeCategory),
    SetPosingAsMinifig,
    PriceOutOfRange,
    ConditionMismatch,
    SuspiciouslyCheap,
    ScoreBelowThreshold(u8),
}

impl RejectReason {
    pub fn tag(&self) -> &'static str {
        match self {
            RejectReason::ShipFromNotAllowed => "ship_from_not_allowed",
            RejectReason::ExcludedWord(_) => "excluded_word",
            RejectReason::SellerRatingBelowFloor => "seller_rating",
            RejectReason::SellerFeedbackBelowFloor => "seller_feedback",
            RejectReason::MissingBrand => "missing_brand",
            RejectReason::IdentityNotInTitle => "identity_not_in_title",
            RejectReason::ElementNumber => "element_number",
            RejectReason::BodyPartWord(_) => "body_part_word",
            RejectReason::NegativeKeyword(_) => "negative_keyword",
            RejectReason::SetPosingAsMinifig => "set_posing_as_minifig",
            RejectReason::PriceOutOfRange => "price_out_of_range",
            RejectReason::ConditionMismatch => "condition_mismatch",
            RejectReason::SuspiciouslyCheap => "suspiciously_cheap",
            RejectReason::ScoreBelowThreshold(_) => "score_below_threshold",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Accept { score: u8 },
    Reject { reason: RejectReason },
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept { .. })
    }
}

/// One executed pipeline step, for the replay/debug surface.
#[derive(Clone, Debug)]
pub struct StepTrace {
    pub step: &'static str,
    pub outcome: String,
}

pub fn evaluate(candidate: &Candidate<'_>, watch: &WatchContext<'_>, batch: &BatchContext) -> Verdict {
    explain(candidate, watch, batch).0
}

/// Runs the pipeline and returns the verdict together with the trace of
/// every step that executed. The trace ends at the first rejection.
pub fn explain(
    candidate: &Candidate<'_>,
    watch: &WatchContext<'_>,
    batch: &BatchContext,
) -> (Verdict, Vec<StepTrace>) {
    let mut trace = Vec::new();
    let norm = normalize(candidate.title);

    macro_rules! reject {
        ($step:expr, $reason:expr) => {{
            let reason = $reason;
            trace.push(StepTrace {
                step: $step,
                outcome: format!("reject: {}", reason.tag()),
            });
            return (Verdict::Reject { reason }, trace);
        }};
    }
    macro_rules! pass {
        ($step:expr, $detail:expr) => {
            trace.push(StepTrace {
                step: $step,
                outcome: $detail.to_string(),
            })
        };
    }

    // Watch constraints come first: they are per-user and cheapest.
    if !watch.ship_from_allow.contains(&candidate.ship_from) {
        reject!("ship_from", RejectReason::ShipFromNotAllowed);
    }
    pass!("ship_from", "allowed");

    for word in watch.exclude_words {
        let w = word.trim().to_lowercase();
        if !w.is_empty() && norm.contains(&w) {
            reject!("exclude_words", RejectReason::ExcludedWord(w));
        }
    }
    pass!("exclude_words", "none matched");

    if let (Some(floor), Some(rating)) = (watch.min_seller_rating, candidate.seller_rating) {
        if rating < floor {
            reject!("seller", RejectReason::SellerRatingBelowFloor);
        }
    }
    if let (Some(floor), Some(feedback)) = (watch.min_seller_feedback, candidate.seller_feedback) {
        if feedback < floor {
            reject!("seller", RejectReason::SellerFeedbackBelowFloor);
        }
    }
    pass!("seller", "floors satisfied");

    // Lexical steps only make sense on seller-written titles.
    let identity_by_code;
    if candidate.identity_verified {
        identity_by_code = true;
        pass!("identity", "catalog-keyed");
    } else {
        if !has_brand(&norm) {
            reject!("brand", RejectReason::MissingBrand);
        }
        pass!("brand", "present");

        // Identity. Sets may match by number or full name; minifigs must
        // carry the collector code because names collide across variants.
        identity_by_code = match watch.item.kind {
            ItemKind::Set => set_number_in_title(&norm, &watch.item.id),
            ItemKind::Minifig => collector_code_in_title(&norm, &watch.item.id),
        };
        let identity_by_name = watch.item.kind == ItemKind::Set
            && watch
                .item_name
                .is_some_and(|name| name_tokens_match(&norm, name));

        if !identity_by_code && !identity_by_name {
            reject!("identity", RejectReason::IdentityNotInTitle);
        }
        pass!(
            "identity",
            if identity_by_code { "code" } else { "name" }
        );

        if watch.item.kind == ItemKind::Minifig {
            if ELEMENT_NUMBER_RE.is_match(&norm)
                || tokens(&norm)
                    .iter()
                    .any(|t| COMMON_ELEMENT_PARTS.contains(t))
            {
                reject!("element_number", RejectReason::ElementNumber);
            }
            pass!("element_number", "clean");

            match body_part_position(&norm) {
                BodyPartVerdict::Reject(word) => {
                    reject!("body_part", RejectReason::BodyPartWord(word))
                }
                BodyPartVerdict::Clean => pass!("body_part", "clean"),
                BodyPartVerdict::IndicatorFirst => pass!("body_part", "indicator precedes"),
            }
        }

        for (category, term) in NEGATIVE_KEYWORDS {
            if category.minifig_only() && watch.item.kind != ItemKind::Minifig {
                continue;
            }
            let hit = if term.contains(' ') {
                norm.contains(term)
            } else {
                tokens(&norm).contains(term)
            };
            if hit {
                reject!("negative_keywords", RejectReason::NegativeKeyword(*category));
            }
        }
        pass!("negative_keywords", "clean");

        if watch.item.kind == ItemKind::Minifig
            && candidate.price > SET_AS_MINIFIG_PRICE
            && SET_NUMBER_TOKEN_RE.is_match(&norm)
            && tokens(&norm).iter().any(|t| SET_WORDS.contains(t))
        {
            reject!("set_as_minifig", RejectReason::SetPosingAsMinifig);
        }
    }

    let price_ok = match watch.item.kind {
        ItemKind::Minifig => {
            (MINIFIG_PRICE_MIN..=MINIFIG_PRICE_MAX).contains(&candidate.price)
        }
        ItemKind::Set => candidate.price >= watch.min_price,
    };
    if !price_ok {
        reject!("price_sanity", RejectReason::PriceOutOfRange);
    }
    pass!("price_sanity", "in range");

    let effective = effective_condition(&norm, candidate.condition);
    if !condition_matches(watch.condition, effective) {
        reject!("condition", RejectReason::ConditionMismatch);
    }
    pass!("condition", effective.as_str());

    if watch.item.kind == ItemKind::Set {
        if let Some(reference) = batch.reference_price {
            if candidate.price < reference * (1.0 - CHEAPNESS_RATIO) {
                reject!("cheapness", RejectReason::SuspiciouslyCheap);
            }
        }
        pass!("cheapness", "plausible");
    }

    let score = quality_score(&norm, watch, candidate, identity_by_code);
    if score < watch.score_threshold {
        reject!("score", RejectReason::ScoreBelowThreshold(score));
    }
    pass!("score", format!("{score}"));

    (Verdict::Accept { score }, trace)
}

enum BodyPartVerdict {
    Clean,
    IndicatorFirst,
    Reject(String),
}

/// Positional body-part rule. A part word before any minifig indicator (or
/// with no indicator at all) means the listing sells the part; an indicator
/// first means the part word describes completeness ("Minifigur mit
/// Beinen").
fn body_part_position(norm: &str) -> BodyPartVerdict {
    let toks = tokens(norm);

    let body_idx = toks.iter().enumerate().find_map(|(i, t)| {
        BODY_PART_STEMS
            .iter()
            .find(|(stem, _)| t.starts_with(stem) && t.len() <= stem.len() + 2)
            .map(|_| i)
    });
    let Some(body_idx) = body_idx else {
        return BodyPartVerdict::Clean;
    };

    let indicator_idx = toks.iter().enumerate().find_map(|(i, t)| {
        MINIFIG_INDICATORS
            .iter()
            .find(|ind| t.starts_with(*ind) && t.len() <= ind.len() + 3)
            .map(|_| i)
    });

    match indicator_idx {
        Some(ind) if ind < body_idx => BodyPartVerdict::IndicatorFirst,
        _ => {
            let word = toks[body_idx].to_string();
            BodyPartVerdict::Reject(word)
        }
    }
}

/// Quality score, 0–100. Code-matched identity starts at 70, name-only at
/// 50; soft signals top it up. The threshold is a safety net, not the main
/// gate.
fn quality_score(
    norm: &str,
    watch: &WatchContext<'_>,
    candidate: &Candidate<'_>,
    identity_by_code: bool,
) -> u8 {
    let mut score: u32 = if identity_by_code { 70 } else { 50 };

    if watch.item.kind == ItemKind::Minifig {
        let toks = tokens(norm);
        if toks
            .iter()
            .any(|t| MINIFIG_INDICATORS.iter().any(|ind| t.starts_with(ind)))
        {
            score += 10;
        }
    }

    if watch
        .item_name
        .is_some_and(|name| name_tokens_match(norm, name))
    {
        score += 10;
    }

    let typical_band = match watch.item.kind {
        ItemKind::Minifig => (1.0..=500.0).contains(&candidate.price),
        ItemKind::Set => (20.0..=3000.0).contains(&candidate.price),
    };
    if typical_band {
        score += 5;
    }

    score.min(100) as u8
}
