use serde::{Deserialize, Serialize};

/// Shipping blocks. Buyers never see sellers from the other block; the
/// scheduler and filter both enforce this before any cost math runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Block {
    EuUk,
    NorthAmerica,
}

/// Closed set of destination/origin countries the engine serves.
///
/// Countries outside this set can still appear as a listing's ship-from; they
/// parse to `None` and the listing is dropped by the ship-from allowlist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    At,
    Be,
    Ch,
    Cz,
    De,
    Dk,
    Es,
    Fr,
    Gb,
    Ie,
    It,
    Lu,
    Nl,
    Pl,
    Pt,
    Se,
    Us,
    Ca,
}

impl Country {
    pub fn as_str(&self) -> &'static str {
        match self {
            Country::At => "AT",
            Country::Be => "BE",
            Country::Ch => "CH",
            Country::Cz => "CZ",
            Country::De => "DE",
            Country::Dk => "DK",
            Country::Es => "ES",
            Country::Fr => "FR",
            Country::Gb => "GB",
            Country::Ie => "IE",
            Country::It => "IT",
            Country::Lu => "LU",
            Country::Nl => "NL",
            Country::Pl => "PL",
            Country::Pt => "PT",
            Country::Se => "SE",
            Country::Us => "US",
            Country::Ca => "CA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let c = match s.trim().to_ascii_uppercase().as_str() {
            "AT" => Country::At,
            "BE" => Country::Be,
            "CH" => Country::Ch,
            "CZ" => Country::Cz,
            "DE" => Country::De,
            "DK" => Country::Dk,
            "ES" => Country::Es,
            "FR" => Country::Fr,
            "GB" | "UK" => Country::Gb,
            "IE" => Country::Ie,
            "IT" => Country::It,
            "LU" => Country::Lu,
            "NL" => Country::Nl,
            "PL" => Country::Pl,
            "PT" => Country::Pt,
            "SE" => Country::Se,
            "US" => Country::Us,
            "CA" => Country::Ca,
            _ => return None,
        };
        Some(c)
    }

    pub fn block(&self) -> Block {
        match self {
            Country::Us | Country::Ca => Block::NorthAmerica,
            _ => Block::EuUk,
        }
    }

    /// EU customs union membership (GB and CH are in the EuUk block but not
    /// in the union; their corridors carry import charges).
    pub fn is_eu(&self) -> bool {
        !matches!(
            self,
            Country::Gb | Country::Ch | Country::Us | Country::Ca
        )
    }

    /// Standard VAT rate used for import estimation and the ex-VAT uplift.
    pub fn vat_rate(&self) -> f64 {
        match self {
            Country::At => 0.20,
            Country::Be => 0.21,
            Country::Ch => 0.081,
            Country::Cz => 0.21,
            Country::De => 0.19,
            Country::Dk => 0.25,
            Country::Es => 0.21,
            Country::Fr => 0.20,
            Country::Gb => 0.20,
            Country::Ie => 0.23,
            Country::It => 0.22,
            Country::Lu => 0.17,
            Country::Nl => 0.21,
            Country::Pl => 0.23,
            Country::Pt => 0.23,
            Country::Se => 0.25,
            Country::Us => 0.0,
            Country::Ca => 0.0,
        }
    }

    /// Default ship-from allowlist for a buyer in this country.
    pub fn default_allowlist(&self) -> Vec<Country> {
        match self.block() {
            Block::NorthAmerica => vec![Country::Us, Country::Ca],
            Block::EuUk => vec![
                Country::At,
                Country::Be,
                Country::Ch,
                Country::Cz,
                Country::De,
                Country::Dk,
                Country::Es,
                Country::Fr,
                Country::Gb,
                Country::Ie,
                Country::It,
                Country::Lu,
                Country::Nl,
                Country::Pl,
                Country::Pt,
                Country::Se,
            ],
        }
    }
}

/// Land-border adjacency inside the EuUk block, used to pick the cheaper
/// neighbor shipping corridor. Stored one direction; `are_neighbors` checks
/// both.
const NEIGHBORS: &[(Country, Country)] = &[
    (Country::At, Country::Ch),
    (Country::At, Country::Cz),
    (Country::At, Country::De),
    (Country::At, Country::It),
    (Country::Be, Country::De),
    (Country::Be, Country::Fr),
    (Country::Be, Country::Lu),
    (Country::Be, Country::Nl),
    (Country::Ch, Country::De),
    (Country::Ch, Country::Fr),
    (Country::Ch, Country::It),
    (Country::Cz, Country::De),
    (Country::Cz, Country::Pl),
    (Country::De, Country::Dk),
    (Country::De, Country::Fr),
    (Country::De, Country::Lu),
    (Country::De, Country::Nl),
    (Country::De, Country::Pl),
    (Country::Dk, Country::Se),
    (Country::Es, Country::Fr),
    (Country::Es, Country::Pt),
    (Country::Fr, Country::It),
    (Country::Fr, Country::Lu),
    (Country::Gb, Country::Ie),
];

pub fn are_neighbors(a: Country, b: Country) -> bool {
    NEIGHBORS
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}
