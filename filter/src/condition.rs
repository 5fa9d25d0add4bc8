use model::Condition;
use serde::{Deserialize, Serialize};

use crate::identity::tokens;
use crate::lexicon::{NEW_KEYWORDS, USED_KEYWORDS};

/// What the watch asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionPref {
    New,
    Used,
    Any,
}

impl ConditionPref {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionPref::New => "new",
            ConditionPref::Used => "used",
            ConditionPref::Any => "any",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(ConditionPref::New),
            "used" => Some(ConditionPref::Used),
            "any" => Some(ConditionPref::Any),
            _ => None,
        }
    }
}

/// Resolves the effective condition of a candidate. The marketplace field
/// wins when present; otherwise title keywords decide, used markers first
/// ("new in opened box, used once" is a used listing).
pub fn effective_condition(normalized_title: &str, reported: Condition) -> Condition {
    if reported != Condition::Unknown {
        return reported;
    }

    let toks = tokens(normalized_title);
    if USED_KEYWORDS
        .iter()
        .any(|k| toks.contains(k) || (k.contains(' ') && normalized_title.contains(k)))
    {
        return Condition::Used;
    }
    if NEW_KEYWORDS
        .iter()
        .any(|k| toks.contains(k) || (k.contains(' ') && normalized_title.contains(k)))
    {
        return Condition::New;
    }
    Condition::Unknown
}

/// Does the candidate's condition satisfy the watch preference? Unknown
/// satisfies only `any`.
pub fn condition_matches(pref: ConditionPref, effective: Condition) -> bool {
    match pref {
        ConditionPref::Any => true,
        ConditionPref::New => effective == Condition::New,
        ConditionPref::Used => effective == Condition::Used,
    }
}
