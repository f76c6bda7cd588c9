use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How strictly a rejection must be justified with review notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewNotesPolicy {
    /// Accept the rejection and attach a warning to the outcome.
    #[default]
    Warn,
    /// Refuse the rejection with `MissingReviewContext`.
    Require,
}

impl ReviewNotesPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewNotesPolicy::Warn => "warn",
            ReviewNotesPolicy::Require => "require",
        }
    }
}

impl fmt::Display for ReviewNotesPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReviewNotesPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" | "lenient" => Ok(Self::Warn),
            "require" | "strict" => Ok(Self::Require),
            other => Err(format!("unknown review notes policy '{other}'")),
        }
    }
}

/// Non-fatal findings attached to a successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionWarning {
    MissingReviewNotes,
}

impl TransitionWarning {
    pub const fn message(self) -> &'static str {
        match self {
            TransitionWarning::MissingReviewNotes => "listing rejected without review notes",
        }
    }
}
