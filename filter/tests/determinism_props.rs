use filter::{
    BatchContext, Candidate, ConditionPref, DEFAULT_SCORE_THRESHOLD, WatchContext, evaluate,
    fingerprint,
};
use model::{Condition, Country, ItemRef, Source};
use proptest::prelude::*;

proptest! {
    // Same (title, watch, batch) must always yield the same verdict.
    #[test]
    fn filter_is_deterministic(
        title in "[ a-z0-9#\\-]{0,60}",
        price in 0.1f64..3000.0,
        reference in proptest::option::of(10.0f64..1000.0),
    ) {
        let item = ItemRef::set("75192");
        let watch = WatchContext {
            item: &item,
            item_name: Some("Millennium Falcon"),
            condition: ConditionPref::Any,
            min_price: 0.0,
            exclude_words: &[],
            ship_from_allow: &[Country::De],
            min_seller_rating: None,
            min_seller_feedback: None,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        };
        let candidate = Candidate {
            title: &title,
            price,
            condition: Condition::Unknown,
            ship_from: Country::De,
            seller_rating: None,
            seller_feedback: None,
            identity_verified: false,
        };
        let batch = BatchContext { reference_price: reference };

        let a = evaluate(&candidate, &watch, &batch);
        let b = evaluate(&candidate, &watch, &batch);
        prop_assert_eq!(a, b);
    }

    // Shipping and destination are not fingerprint inputs; only the €10
    // bucket of the price is.
    #[test]
    fn fingerprint_ignores_sub_bucket_moves(
        title in "[ a-zA-Z0-9]{1,80}",
        base in 0.0f64..2000.0,
        jitter in 0.0f64..9.99,
    ) {
        let bucket_start = (base / 10.0).floor() * 10.0;
        let a = fingerprint(Source::Ebay, Some("seller"), &title, bucket_start);
        let b = fingerprint(Source::Ebay, Some("seller"), &title, (bucket_start + jitter).min(bucket_start + 9.99));
        prop_assert_eq!(a, b);
    }
}
