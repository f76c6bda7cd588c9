use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::geography::DepartmentId;
use crate::marketplace::listings::{ImageRef, UserId};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertCategoryId(pub u32);

/// Scope as submitted, before the department pairing is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    #[default]
    Global,
    #[serde(alias = "departamental")]
    Departmental,
}

impl ScopeKind {
    pub const fn label(self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Departmental => "departmental",
        }
    }
}

/// Validated audience breadth of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "department", rename_all = "snake_case")]
pub enum AlertScope {
    Global,
    Departmental(DepartmentId),
}

impl AlertScope {
    /// Pair a scope kind with an optional department, rejecting inconsistent combinations.
    pub fn from_parts(
        kind: ScopeKind,
        department: Option<DepartmentId>,
    ) -> Result<Self, AlertValidation> {
        match (kind, department) {
            (ScopeKind::Global, None) => Ok(AlertScope::Global),
            (ScopeKind::Departmental, Some(department)) => {
                Ok(AlertScope::Departmental(department))
            }
            (kind, department) => Err(AlertValidation::InconsistentScope { kind, department }),
        }
    }

    pub const fn kind(self) -> ScopeKind {
        match self {
            AlertScope::Global => ScopeKind::Global,
            AlertScope::Departmental(_) => ScopeKind::Departmental,
        }
    }

    pub const fn department(self) -> Option<DepartmentId> {
        match self {
            AlertScope::Global => None,
            AlertScope::Departmental(department) => Some(department),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertValidation {
    #[error("{} scope cannot be paired with department {department:?}", .kind.label())]
    InconsistentScope {
        kind: ScopeKind,
        department: Option<DepartmentId>,
    },
    #[error("alert title must not be empty")]
    EmptyTitle,
    #[error("alert message must not be empty")]
    EmptyMessage,
}

/// Moderator supplied fields for a new alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub title: String,
    pub message: String,
    pub category: AlertCategoryId,
    #[serde(default)]
    pub scope: ScopeKind,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// A geographically scoped notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub id: AlertId,
    pub title: String,
    pub message: String,
    pub category: AlertCategoryId,
    #[serde(flatten)]
    pub scope: AlertScope,
    pub images: Vec<ImageRef>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn create(
        id: AlertId,
        created_by: UserId,
        draft: AlertDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, AlertValidation> {
        let scope = AlertScope::from_parts(draft.scope, draft.department)?;

        if draft.title.trim().is_empty() {
            return Err(AlertValidation::EmptyTitle);
        }
        if draft.message.trim().is_empty() {
            return Err(AlertValidation::EmptyMessage);
        }

        Ok(Self {
            id,
            title: draft.title.trim().to_string(),
            message: draft.message,
            category: draft.category,
            scope,
            images: draft.images,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}
