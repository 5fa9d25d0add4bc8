use filter::{
    BatchContext, Candidate, ConditionPref, DEFAULT_SCORE_THRESHOLD, RejectReason, Verdict,
    WatchContext, evaluate,
};
use model::{Condition, Country, ItemRef};

fn minifig_watch(item: &ItemRef) -> WatchContext<'_> {
    WatchContext {
        item,
        item_name: Some("Darth Vader"),
        condition: ConditionPref::Any,
        min_price: 0.0,
        exclude_words: &[],
        ship_from_allow: &[
            Country::De,
            Country::Fr,
            Country::Gb,
            Country::Nl,
            Country::At,
        ],
        min_seller_rating: None,
        min_seller_feedback: None,
        score_threshold: DEFAULT_SCORE_THRESHOLD,
    }
}

fn candidate(title: &str, price: f64) -> Candidate<'_> {
    Candidate {
        title,
        price,
        condition: Condition::Unknown,
        ship_from: Country::De,
        seller_rating: Some(99.1),
        seller_feedback: Some(1200),
        identity_verified: false,
    }
}

fn reason(v: Verdict) -> RejectReason {
    match v {
        Verdict::Reject { reason } => reason,
        Verdict::Accept { score } => panic!("expected rejection, got accept with score {score}"),
    }
}

#[test]
fn minifig_without_code_is_rejected() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let v = evaluate(
        &candidate("LEGO Darth Vader Minifigure helmet only", 45.0),
        &watch,
        &BatchContext::default(),
    );
    assert_eq!(reason(v), RejectReason::IdentityNotInTitle);
}

#[test]
fn minifig_with_code_and_indicator_passes() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let v = evaluate(
        &candidate("LEGO Star Wars sw0010 Darth Vader complete minifig", 45.0),
        &watch,
        &BatchContext::default(),
    );
    assert!(v.is_accept(), "{v:?}");
}

#[test]
fn body_part_before_indicator_rejects() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let v = evaluate(
        &candidate("LEGO sw0010 Beine Minifigur", 12.0),
        &watch,
        &BatchContext::default(),
    );
    assert!(matches!(reason(v), RejectReason::BodyPartWord(_)));
}

#[test]
fn indicator_before_body_part_accepts() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let v = evaluate(
        &candidate("LEGO sw0010 Minifigur mit Beinen", 12.0),
        &watch,
        &BatchContext::default(),
    );
    assert!(v.is_accept(), "{v:?}");
}

#[test]
fn body_part_without_indicator_rejects() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let v = evaluate(
        &candidate("LEGO sw0010 Beine", 8.0),
        &watch,
        &BatchContext::default(),
    );
    assert!(matches!(reason(v), RejectReason::BodyPartWord(_)));
}

#[test]
fn element_number_listing_rejects() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    // Generic 4-digit + pb pattern.
    let v = evaluate(
        &candidate("LEGO sw0010 torso 9748pb01 part", 5.0),
        &watch,
        &BatchContext::default(),
    );
    assert_eq!(reason(v), RejectReason::ElementNumber);

    // Curated element list.
    let v = evaluate(
        &candidate("LEGO sw0010 970c55pb04 hips and legs", 5.0),
        &watch,
        &BatchContext::default(),
    );
    assert_eq!(reason(v), RejectReason::ElementNumber);
}

#[test]
fn expensive_minifig_listing_naming_a_set_rejects() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let v = evaluate(
        &candidate("LEGO sw0010 Darth Vader from set 75192 sealed box", 450.0),
        &watch,
        &BatchContext::default(),
    );
    assert_eq!(reason(v), RejectReason::SetPosingAsMinifig);
}

#[test]
fn knockoff_keyword_rejects() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let v = evaluate(
        &candidate("custom sw0010 Darth Vader minifig lego compatible", 4.0),
        &watch,
        &BatchContext::default(),
    );
    assert!(matches!(reason(v), RejectReason::NegativeKeyword(_)));
}

#[test]
fn minifig_price_bounds() {
    let item = ItemRef::minifig("sw0010");
    let watch = minifig_watch(&item);
    let low = evaluate(
        &candidate("LEGO sw0010 minifig", 0.25),
        &watch,
        &BatchContext::default(),
    );
    assert_eq!(reason(low), RejectReason::PriceOutOfRange);

    let high = evaluate(
        &candidate("LEGO sw0010 minifig", 2500.0),
        &watch,
        &BatchContext::default(),
    );
    assert_eq!(reason(high), RejectReason::PriceOutOfRange);
}

#[test]
fn suspicious_cheapness_uses_second_cheapest_reference() {
    let item = ItemRef::set("75192");
    let mut watch = minifig_watch(&item);
    watch.item = &item;
    watch.item_name = Some("Millennium Falcon");

    let batch = BatchContext::from_batch_prices(&[120.0, 400.0, 420.0, 450.0]);
    assert_eq!(batch.reference_price, Some(400.0));

    // 120 is > 35% below the 400 reference: a minifig-only mislisting.
    let v = evaluate(
        &candidate("LEGO 75192 Millennium Falcon", 120.0),
        &watch,
        &batch,
    );
    assert_eq!(reason(v), RejectReason::SuspiciouslyCheap);

    // 300 is within tolerance.
    let v = evaluate(
        &candidate("LEGO 75192 Millennium Falcon", 300.0),
        &watch,
        &batch,
    );
    assert!(v.is_accept(), "{v:?}");
}

#[test]
fn exclude_words_and_ship_from_gate() {
    let item = ItemRef::set("75192");
    let mut watch = minifig_watch(&item);
    let excluded = vec!["damaged".to_string()];
    watch.exclude_words = &excluded;

    let v = evaluate(
        &candidate("LEGO 75192 damaged box", 300.0),
        &watch,
        &BatchContext::default(),
    );
    assert!(matches!(reason(v), RejectReason::ExcludedWord(_)));

    let mut us_candidate = candidate("LEGO 75192 Millennium Falcon", 300.0);
    us_candidate.ship_from = Country::Us;
    let v = evaluate(&us_candidate, &watch, &BatchContext::default());
    assert_eq!(reason(v), RejectReason::ShipFromNotAllowed);
}

#[test]
fn condition_preference_enforced() {
    let item = ItemRef::set("75192");
    let mut watch = minifig_watch(&item);
    watch.condition = ConditionPref::New;

    let mut used = candidate("LEGO 75192 Millennium Falcon gebraucht", 300.0);
    used.condition = Condition::Used;
    let v = evaluate(&used, &watch, &BatchContext::default());
    assert_eq!(reason(v), RejectReason::ConditionMismatch);
}
