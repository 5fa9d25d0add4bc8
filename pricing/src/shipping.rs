use model::{Country, ItemKind, country::are_neighbors};

use crate::currency::round2;

/// Shipping corridor between two countries in the same block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corridor {
    Domestic,
    EuNeighbor,
    EuNonNeighbor,
    EuUk,
    UsCa,
}

/// Classifies the corridor. GB↔EU pairs map to the tariffed `EuUk`
/// corridor; everything else inside the EuUk block uses the neighbor
/// distinction. Callers must have dropped cross-block pairs already.
pub fn corridor(from: Country, to: Country) -> Corridor {
    if from == to {
        return Corridor::Domestic;
    }
    match (from, to) {
        (Country::Us, Country::Ca) | (Country::Ca, Country::Us) => Corridor::UsCa,
        (Country::Gb, _) | (_, Country::Gb) => Corridor::EuUk,
        _ if are_neighbors(from, to) => Corridor::EuNeighbor,
        _ => Corridor::EuNonNeighbor,
    }
}

/// (base EUR, cap EUR) per corridor for sets.
fn set_rates(c: Corridor) -> (f64, f64) {
    match c {
        Corridor::Domestic => (5.0, 12.0),
        Corridor::EuNeighbor => (8.0, 35.0),
        Corridor::EuNonNeighbor => (12.0, 35.0),
        Corridor::EuUk => (15.0, 45.0),
        Corridor::UsCa => (10.0, 35.0),
    }
}

/// Parcel-size multiplier for sets, stepped on piece count. Listings with
/// no known piece count sit mid-curve.
fn size_multiplier(piece_count: Option<u32>) -> f64 {
    match piece_count {
        Some(p) if p < 200 => 1.0,
        Some(p) if p < 1000 => 1.5,
        Some(p) if p < 2000 => 1.8,
        Some(p) if p < 4000 => 2.2,
        Some(_) => 2.8,
        None => 1.5,
    }
}

/// Flat letter-post rates for minifigs; size never matters.
fn minifig_rate(c: Corridor) -> f64 {
    match c {
        Corridor::Domestic => 2.5,
        Corridor::EuNeighbor => 4.0,
        Corridor::EuNonNeighbor => 5.5,
        Corridor::EuUk => 7.0,
        Corridor::UsCa => 6.0,
    }
}

/// Estimated shipping in EUR for marketplaces that never quote it.
pub fn estimate_shipping(
    from: Country,
    to: Country,
    kind: ItemKind,
    piece_count: Option<u32>,
) -> f64 {
    let c = corridor(from, to);
    match kind {
        ItemKind::Minifig => minifig_rate(c),
        ItemKind::Set => {
            let (base, cap) = set_rates(c);
            round2((base * size_multiplier(piece_count)).min(cap))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corridor_classification() {
        assert_eq!(corridor(Country::De, Country::De), Corridor::Domestic);
        assert_eq!(corridor(Country::De, Country::At), Corridor::EuNeighbor);
        assert_eq!(corridor(Country::De, Country::Es), Corridor::EuNonNeighbor);
        assert_eq!(corridor(Country::De, Country::Gb), Corridor::EuUk);
        assert_eq!(corridor(Country::Gb, Country::Fr), Corridor::EuUk);
        assert_eq!(corridor(Country::Us, Country::Ca), Corridor::UsCa);
    }

    #[test]
    fn small_set_ships_at_base() {
        let s = estimate_shipping(Country::De, Country::De, ItemKind::Set, Some(150));
        assert_eq!(s, 5.0);
    }

    #[test]
    fn huge_set_hits_the_cap() {
        // 2.8 * 5.0 = 14.0 would exceed the domestic cap of 12.
        let s = estimate_shipping(Country::De, Country::De, ItemKind::Set, Some(7541));
        assert_eq!(s, 12.0);
    }

    #[test]
    fn mid_size_set_scales_by_curve() {
        let s = estimate_shipping(Country::De, Country::Es, ItemKind::Set, Some(2500));
        assert_eq!(s, 26.4); // 12 * 2.2
    }

    #[test]
    fn minifig_rate_is_flat() {
        let a = estimate_shipping(Country::De, Country::Gb, ItemKind::Minifig, None);
        let b = estimate_shipping(Country::De, Country::Gb, ItemKind::Minifig, Some(5000));
        assert_eq!(a, b);
        assert_eq!(a, 7.0);
    }
}
