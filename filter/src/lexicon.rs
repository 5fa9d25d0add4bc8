//! Curated word lists the title filter runs on.
//!
//! These are data, not logic: extending a language or adding an element
//! number is a one-line diff here and shows up in review as such. Tests read
//! the tables directly as fixtures.

/// Brand tokens. The brand is spelled the same in every catalog language;
/// common misspellings are not accepted on purpose (they correlate with
/// knockoffs).
pub const BRAND_TOKENS: &[&str] = &["lego"];

/// Words that signal the listing is a complete minifigure. Position matters:
/// a body-part word *after* one of these describes what is included, not
/// what is sold.
pub const MINIFIG_INDICATORS: &[&str] = &[
    "minifig",
    "minifigure",
    "minifigur",
    "minifigura",
    "minifiguren",
    "figurine",
    "figur",
    "figura",
    "complete",
    "komplett",
    "completo",
    "complet",
];

/// Body-part stems, multilingual, matched by token prefix so inflected
/// forms ("Beinen", "Haare") hit their stem.
pub const BODY_PART_STEMS: &[(&str, &str)] = &[
    // legs
    ("legs", "legs"),
    ("leg", "legs"),
    ("beine", "legs"),
    ("bein", "legs"),
    ("piernas", "legs"),
    ("jambes", "legs"),
    ("gambe", "legs"),
    ("benen", "legs"),
    // hair
    ("hair", "hair"),
    ("haar", "hair"),
    ("cheveux", "hair"),
    ("pelo", "hair"),
    ("capelli", "hair"),
    // helmet
    ("helmet", "helmet"),
    ("helm", "helmet"),
    ("casque", "helmet"),
    ("casco", "helmet"),
    // torso
    ("torso", "torso"),
    ("torse", "torso"),
    ("oberkörper", "torso"),
    // head
    ("head", "head"),
    ("kopf", "head"),
    ("cabeza", "head"),
    ("testa", "head"),
    // arms / hands
    ("arms", "arm"),
    ("arme", "arm"),
    ("hands", "hand"),
    ("hände", "hand"),
];

/// Negative-keyword categories. Single words are matched as whole tokens,
/// phrases as substrings of the normalized title.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegativeCategory {
    PartsOnly,
    NonFigureProduct,
    FullSet,
    CustomOrKnockoff,
    BulkLot,
    InstructionsOnly,
    DisplayCase,
}

impl NegativeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegativeCategory::PartsOnly => "parts_only",
            NegativeCategory::NonFigureProduct => "non_figure_product",
            NegativeCategory::FullSet => "full_set",
            NegativeCategory::CustomOrKnockoff => "custom_or_knockoff",
            NegativeCategory::BulkLot => "bulk_lot",
            NegativeCategory::InstructionsOnly => "instructions_only",
            NegativeCategory::DisplayCase => "display_case",
        }
    }

    /// FullSet only applies to minifig watches; a set watcher obviously
    /// wants full sets.
    pub fn minifig_only(&self) -> bool {
        matches!(self, NegativeCategory::FullSet)
    }
}

pub const NEGATIVE_KEYWORDS: &[(NegativeCategory, &str)] = &[
    (NegativeCategory::PartsOnly, "parts only"),
    (NegativeCategory::PartsOnly, "only parts"),
    (NegativeCategory::PartsOnly, "nur teile"),
    (NegativeCategory::PartsOnly, "einzelteile"),
    (NegativeCategory::PartsOnly, "ersatzteile"),
    (NegativeCategory::PartsOnly, "spare parts"),
    (NegativeCategory::PartsOnly, "pieces only"),
    (NegativeCategory::PartsOnly, "incomplete"),
    (NegativeCategory::PartsOnly, "unvollständig"),
    (NegativeCategory::NonFigureProduct, "sticker"),
    (NegativeCategory::NonFigureProduct, "aufkleber"),
    (NegativeCategory::NonFigureProduct, "poster"),
    (NegativeCategory::NonFigureProduct, "keychain"),
    (NegativeCategory::NonFigureProduct, "schlüsselanhänger"),
    (NegativeCategory::NonFigureProduct, "magnet"),
    (NegativeCategory::NonFigureProduct, "mug"),
    (NegativeCategory::NonFigureProduct, "tasse"),
    (NegativeCategory::NonFigureProduct, "t-shirt"),
    (NegativeCategory::NonFigureProduct, "plush"),
    (NegativeCategory::FullSet, "full set"),
    (NegativeCategory::FullSet, "complete set"),
    (NegativeCategory::FullSet, "komplett set"),
    (NegativeCategory::FullSet, "komplettset"),
    (NegativeCategory::FullSet, "misb"),
    (NegativeCategory::FullSet, "nisb"),
    (NegativeCategory::CustomOrKnockoff, "custom"),
    (NegativeCategory::CustomOrKnockoff, "moc"),
    (NegativeCategory::CustomOrKnockoff, "compatible"),
    (NegativeCategory::CustomOrKnockoff, "kompatibel"),
    (NegativeCategory::CustomOrKnockoff, "replica"),
    (NegativeCategory::CustomOrKnockoff, "lepin"),
    (NegativeCategory::CustomOrKnockoff, "knockoff"),
    (NegativeCategory::BulkLot, "konvolut"),
    (NegativeCategory::BulkLot, "job lot"),
    (NegativeCategory::BulkLot, "lot of"),
    (NegativeCategory::BulkLot, "bulk"),
    (NegativeCategory::BulkLot, "sammlung"),
    (NegativeCategory::BulkLot, "kilo"),
    (NegativeCategory::InstructionsOnly, "instructions only"),
    (NegativeCategory::InstructionsOnly, "only instructions"),
    (NegativeCategory::InstructionsOnly, "nur anleitung"),
    (NegativeCategory::InstructionsOnly, "nur bauanleitung"),
    (NegativeCategory::InstructionsOnly, "notice seule"),
    (NegativeCategory::InstructionsOnly, "manual only"),
    (NegativeCategory::DisplayCase, "display case"),
    (NegativeCategory::DisplayCase, "vitrine"),
    (NegativeCategory::DisplayCase, "showcase"),
    (NegativeCategory::DisplayCase, "acrylic case"),
];

/// Element numbers of parts commonly mislisted under a figure's collector
/// code (heads, hairpieces, helmets, torsos). Matched as whole tokens.
pub const COMMON_ELEMENT_PARTS: &[&str] = &[
    "970c00",
    "970c55pb04",
    "973c01",
    "3626",
    "3626b",
    "3626c",
    "3833",
    "3624",
    "30370",
    "87610",
    "98371",
];

/// Condition keywords, multilingual.
pub const USED_KEYWORDS: &[&str] = &[
    "used",
    "gebraucht",
    "usado",
    "usagé",
    "usato",
    "occasion",
    "second hand",
    "bespielt",
];

pub const NEW_KEYWORDS: &[&str] = &[
    "new",
    "neu",
    "nuevo",
    "neuf",
    "nuovo",
    "sealed",
    "ovp",
    "misb",
    "bnib",
    "neuware",
];

/// Words that mark a listing as a boxed set in the set-posing-as-minifig
/// heuristic.
pub const SET_WORDS: &[&str] = &["set", "box", "sealed", "ovp", "misb"];
