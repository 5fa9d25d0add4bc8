use model::Country;

use crate::currency::round2;

/// Import component of a landed cost. `estimated` is true whenever customs
/// math ran at all; only "free" corridors are exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImportCharge {
    pub amount: f64,
    pub estimated: bool,
}

const FREE: ImportCharge = ImportCharge {
    amount: 0.0,
    estimated: false,
};

/// Sellers known to list ex-VAT (B2B storefronts). Matched on display name,
/// lowercase. Data, not code: extending the list is a reviewable diff.
const EX_VAT_SELLERS: &[&str] = &["brickmerchant-b2b", "steinhandel-gmbh", "bulkbrick-trade"];

pub fn is_ex_vat_seller(display_name: &str) -> bool {
    let name = display_name.trim().to_lowercase();
    EX_VAT_SELLERS.iter().any(|s| *s == name)
}

/// Customs charge for a corridor, on EUR `price` + `shipping`.
///
/// Rules:
/// - same country or intra-EU: free
/// - EU→UK: 20% VAT on goods+shipping plus flat handling
/// - UK→EU: destination VAT plus flat handling
/// - US→CA: 13% GST/HST plus handling; the C$20 threshold is so low it only
///   waives trinkets
/// - CA→US: free under the $800 de-minimis, else 5% duty plus handling
/// - anything else inside a block (CH corridors): not modeled, charged as
///   zero but flagged estimated
pub fn import_charge(from: Country, to: Country, price: f64, shipping: f64) -> ImportCharge {
    if from == to {
        return FREE;
    }
    if from.is_eu() && to.is_eu() {
        return FREE;
    }

    let goods = price + shipping;

    match (from, to) {
        (f, Country::Gb) if f.is_eu() => ImportCharge {
            amount: round2(0.20 * goods + 10.0),
            estimated: true,
        },
        (Country::Gb, t) if t.is_eu() => ImportCharge {
            amount: round2(t.vat_rate() * goods + 10.0),
            estimated: true,
        },
        (Country::Us, Country::Ca) => {
            // Canadian de-minimis is C$20; below that nothing is collected.
            if goods < round2(20.0 * 0.68) {
                ImportCharge {
                    amount: 0.0,
                    estimated: true,
                }
            } else {
                ImportCharge {
                    amount: round2(0.13 * goods + 12.0),
                    estimated: true,
                }
            }
        }
        (Country::Ca, Country::Us) => {
            if goods < round2(800.0 * 0.92) {
                ImportCharge {
                    amount: 0.0,
                    estimated: true,
                }
            } else {
                ImportCharge {
                    amount: round2(0.05 * goods + 15.0),
                    estimated: true,
                }
            }
        }
        // CH and other unmodeled corridors within a block.
        _ => ImportCharge {
            amount: 0.0,
            estimated: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intra_eu_is_free_and_exact() {
        assert_eq!(import_charge(Country::De, Country::Fr, 100.0, 10.0), FREE);
    }

    #[test]
    fn eu_to_uk_vat_plus_handling() {
        let c = import_charge(Country::De, Country::Gb, 500.0, 25.0);
        assert_eq!(c.amount, 115.0);
        assert!(c.estimated);
    }

    #[test]
    fn uk_to_eu_uses_destination_rate() {
        let c = import_charge(Country::Gb, Country::De, 100.0, 0.0);
        assert_eq!(c.amount, round2(0.19 * 100.0 + 10.0));
    }

    #[test]
    fn ca_to_us_de_minimis() {
        let under = import_charge(Country::Ca, Country::Us, 300.0, 20.0);
        assert_eq!(under.amount, 0.0);
        let over = import_charge(Country::Ca, Country::Us, 900.0, 20.0);
        assert_eq!(over.amount, round2(0.05 * 920.0 + 15.0));
    }

    #[test]
    fn us_to_ca_has_effectively_no_de_minimis() {
        let c = import_charge(Country::Us, Country::Ca, 50.0, 10.0);
        assert!(c.amount > 0.0);
    }

    #[test]
    fn ex_vat_allowlist_matches_case_insensitively() {
        assert!(is_ex_vat_seller("BrickMerchant-B2B"));
        assert!(!is_ex_vat_seller("random_store"));
    }

    #[test]
    fn ch_corridor_is_estimated_zero() {
        let c = import_charge(Country::De, Country::Ch, 100.0, 10.0);
        assert_eq!(c.amount, 0.0);
        assert!(c.estimated);
    }
}
