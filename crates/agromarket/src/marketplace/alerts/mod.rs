//! Geographically scoped notices.

pub mod domain;
pub mod query;
pub mod repository;
pub mod service;

pub use domain::{
    Alert, AlertCategoryId, AlertDraft, AlertId, AlertScope, AlertValidation, ScopeKind,
};
pub use query::{AlertOrder, AlertQuery};
pub use repository::AlertRepository;
pub use service::{AlertFeed, AlertService, AlertServiceError};
