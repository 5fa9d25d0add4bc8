use model::{Country, ItemKind, Source};
use pricing::{CostInputs, landed_cost, round2};
use proptest::prelude::*;

fn eu_country() -> impl Strategy<Value = Country> {
    prop_oneof![
        Just(Country::De),
        Just(Country::Fr),
        Just(Country::It),
        Just(Country::Es),
        Just(Country::Nl),
        Just(Country::Pl),
        Just(Country::At),
        Just(Country::Gb),
    ]
}

proptest! {
    // total must always be the rounded sum of its parts, whatever the
    // corridor or size curve did.
    #[test]
    fn total_is_rounded_sum(
        price in 0.5f64..5000.0,
        shipping in 0.01f64..200.0,
        from in eu_country(),
        to in eu_country(),
        pieces in proptest::option::of(0u32..10_000),
    ) {
        let inputs = CostInputs {
            source: Source::Ebay,
            price_original: price,
            shipping_original: Some(shipping),
            currency_original: "EUR",
            ship_from: from,
            ship_to: to,
            item_kind: ItemKind::Set,
            piece_count: pieces,
            seller_name: "prop_seller",
        };
        let cost = landed_cost(&inputs).unwrap();
        prop_assert_eq!(
            cost.total,
            round2(cost.price + cost.shipping + cost.import_charges)
        );
    }

    // BrickOwl estimation must be deterministic and always flagged.
    #[test]
    fn brickowl_estimates_are_deterministic(
        price in 0.5f64..2000.0,
        from in eu_country(),
        to in eu_country(),
        pieces in proptest::option::of(0u32..10_000),
    ) {
        let inputs = CostInputs {
            source: Source::BrickOwl,
            price_original: price,
            shipping_original: None,
            currency_original: "EUR",
            ship_from: from,
            ship_to: to,
            item_kind: ItemKind::Set,
            piece_count: pieces,
            seller_name: "prop_seller",
        };
        let a = landed_cost(&inputs).unwrap();
        let b = landed_cost(&inputs).unwrap();
        prop_assert_eq!(a, b);
        prop_assert!(a.is_estimate());
    }
}
