//! Landed-cost model.
//!
//! Turns a raw marketplace offer into `price + shipping + import` in
//! canonical EUR. Conversion exists for comparison against watch targets,
//! not for accounting. Every estimated component flips `is_estimate`, which
//! downstream renders as an uncertainty marker.

pub mod currency;
pub mod import;
pub mod shipping;

use model::{Country, ItemKind, Source};
use thiserror::Error;

pub use currency::{SUPPORTED_CURRENCIES, round2, to_eur};
pub use import::{ImportCharge, import_charge, is_ex_vat_seller};
pub use shipping::{Corridor, corridor, estimate_shipping};

#[derive(Debug, Error, PartialEq)]
pub enum CostError {
    /// eBay offered no (or zero) cross-border shipping: the seller does not
    /// ship to the destination.
    #[error("no shipping from {from:?} to {to:?}")]
    NoShipping { from: Country, to: Country },

    /// Buyer and seller are in different blocks; these candidates should
    /// have been dropped before costing.
    #[error("cross-block corridor {from:?} -> {to:?}")]
    CrossBlock { from: Country, to: Country },

    #[error("currency {0} not in conversion table")]
    UnknownCurrency(String),
}

/// Raw monetary facts about one offer, as the adapter saw them.
#[derive(Clone, Debug)]
pub struct CostInputs<'a> {
    pub source: Source,
    pub price_original: f64,
    /// Quoted shipping in the original currency. `None` when the
    /// marketplace did not state a cost (BrickOwl never does).
    pub shipping_original: Option<f64>,
    pub currency_original: &'a str,
    pub ship_from: Country,
    pub ship_to: Country,
    pub item_kind: ItemKind,
    pub piece_count: Option<u32>,
    pub seller_name: &'a str,
}

/// Landed cost in canonical EUR.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandedCost {
    pub price: f64,
    pub shipping: f64,
    pub shipping_estimated: bool,
    pub import_charges: f64,
    pub import_estimated: bool,
    pub total: f64,
}

impl LandedCost {
    pub fn is_estimate(&self) -> bool {
        self.shipping_estimated || self.import_estimated
    }
}

/// Computes the landed cost for one offer.
///
/// Shipping policy:
/// - eBay quotes shipping when the seller ships to the destination. Absent
///   or zero cross-border means "does not ship there" and the offer is
///   rejected; domestic zero means free shipping.
/// - BrickOwl never quotes shipping, so the corridor table estimates it.
pub fn landed_cost(inputs: &CostInputs<'_>) -> Result<LandedCost, CostError> {
    let from = inputs.ship_from;
    let to = inputs.ship_to;

    if from.block() != to.block() {
        return Err(CostError::CrossBlock { from, to });
    }

    let fx = currency::rate(inputs.currency_original)
        .ok_or_else(|| CostError::UnknownCurrency(inputs.currency_original.to_string()))?;

    let mut price = round2(inputs.price_original * fx);

    // B2B sellers list ex-VAT; uplift by the destination rate so their
    // offers compare fairly against consumer listings.
    if is_ex_vat_seller(inputs.seller_name) {
        price = round2(price * (1.0 + to.vat_rate()));
    }

    let (shipping, shipping_estimated) = match inputs.source {
        Source::BrickOwl => (
            estimate_shipping(from, to, inputs.item_kind, inputs.piece_count),
            true,
        ),
        Source::Ebay => match inputs.shipping_original {
            Some(s) if s > 0.0 => (round2(s * fx), false),
            // Zero or missing: free domestically, unserved cross-border.
            _ if from == to => (0.0, false),
            _ => return Err(CostError::NoShipping { from, to }),
        },
    };

    let ImportCharge {
        amount: import_charges,
        estimated: import_estimated,
    } = import_charge(from, to, price, shipping);

    let total = round2(price + shipping + import_charges);

    Ok(LandedCost {
        price,
        shipping,
        shipping_estimated,
        import_charges,
        import_estimated,
        total,
    })
}
