/// Closed conversion table to canonical EUR.
///
/// Rates are deliberately static: conversion exists so a PLN listing can be
/// compared against a EUR target, not to settle money. Revisions land here
/// as data changes.
const RATES: &[(&str, f64)] = &[
    ("EUR", 1.0),
    ("GBP", 1.17),
    ("USD", 0.92),
    ("CAD", 0.68),
    ("CHF", 1.05),
    ("PLN", 0.23),
    ("SEK", 0.088),
    ("DKK", 0.134),
    ("CZK", 0.040),
];

pub const SUPPORTED_CURRENCIES: &[&str] =
    &["EUR", "GBP", "USD", "CAD", "CHF", "PLN", "SEK", "DKK", "CZK"];

/// EUR per unit of `currency`, or `None` when outside the closed table.
pub fn rate(currency: &str) -> Option<f64> {
    let wanted = currency.trim().to_ascii_uppercase();
    RATES.iter().find(|(c, _)| *c == wanted).map(|(_, r)| *r)
}

/// Converts an amount to EUR, rounded to cents.
pub fn to_eur(amount: f64, currency: &str) -> Option<f64> {
    rate(currency).map(|r| round2(amount * r))
}

/// Round half away from zero to two decimals; the rounding every monetary
/// invariant in the system is stated against.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eur_is_identity() {
        assert_eq!(to_eur(123.45, "EUR"), Some(123.45));
    }

    #[test]
    fn table_is_closed() {
        assert_eq!(rate("JPY"), None);
        assert_eq!(rate("AUD"), None);
    }

    #[test]
    fn lowercase_currency_codes_parse() {
        assert_eq!(rate("gbp"), Some(1.17));
    }

    #[test]
    fn round2_collapses_float_noise() {
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(1.2345), 1.23);
        assert_eq!(round2(1.236), 1.24);
    }
}
