use std::fmt;

use serde::{Deserialize, Serialize};

/// Catalog item class. Sets and minifigs live in separate id spaces and
/// follow different filter rules downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Set,
    Minifig,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Set => "set",
            ItemKind::Minifig => "minifig",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "set" => Some(ItemKind::Set),
            "minifig" => Some(ItemKind::Minifig),
            _ => None,
        }
    }
}

/// Primary identity of a catalog item.
///
/// For sets the id is the catalog number (`"75192"`). For minifigs it is the
/// collector code (`"sw0010"`); the BrickOwl boid and Rebrickable id are
/// secondary ids stored on the item row, never part of the reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: String,
}

impl ItemRef {
    pub fn set(id: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Set,
            id: id.into(),
        }
    }

    pub fn minifig(id: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Minifig,
            id: id.into().to_lowercase(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
