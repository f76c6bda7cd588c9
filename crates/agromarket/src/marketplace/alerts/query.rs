use std::str::FromStr;

use serde::Deserialize;

use super::domain::{Alert, AlertCategoryId, ScopeKind};
use crate::marketplace::scope::FilterError;

/// Viewer-side narrowing of the alert feed, ANDed with audience resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub category: Option<AlertCategoryId>,
    #[serde(default)]
    pub scope: Option<ScopeKind>,
    #[serde(default, alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl FromStr for AlertOrder {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "-created_at" => Ok(AlertOrder::NewestFirst),
            "created_at" => Ok(AlertOrder::OldestFirst),
            other => Err(FilterError::UnknownOrdering(other.to_string())),
        }
    }
}

impl AlertQuery {
    pub fn order(&self) -> Result<AlertOrder, FilterError> {
        match self.ordering.as_deref().map(str::trim) {
            None | Some("") => Ok(AlertOrder::default()),
            Some(raw) => raw.parse(),
        }
    }

    pub fn admits(&self, alert: &Alert) -> bool {
        if self.category.is_some_and(|category| alert.category != category) {
            return false;
        }
        if self.scope.is_some_and(|scope| alert.scope.kind() != scope) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                alert.title.to_lowercase().contains(&needle)
                    || alert.message.to_lowercase().contains(&needle)
            }
        }
    }

    /// Sort by creation time in the requested direction, ties by id.
    pub fn sort(order: AlertOrder, alerts: &mut [Alert]) {
        alerts.sort_by(|a, b| {
            let by_time = match order {
                AlertOrder::NewestFirst => b.created_at.cmp(&a.created_at),
                AlertOrder::OldestFirst => a.created_at.cmp(&b.created_at),
            };
            by_time.then_with(|| a.id.cmp(&b.id))
        });
    }
}
