//! Scope resolver: location-based audience rules shared by alerts and listing queries.
//!
//! Both halves consume the same two-level hierarchy through `MunicipalityRef`, which already
//! carries the department a municipality belongs to.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::alerts::{Alert, AlertScope};
use super::geography::{DepartmentId, MunicipalityId, MunicipalityRef};
use super::listings::Listing;

/// Whether the viewer has a location configured at all.
///
/// Viewers without one see no alerts and should be asked to complete their profile.
pub fn has_location(user_municipality: Option<&MunicipalityRef>) -> bool {
    user_municipality.is_some()
}

/// Decide whether `alert` is visible to a viewer living in `user_municipality`.
pub fn resolve_alert_audience(alert: &Alert, user_municipality: Option<&MunicipalityRef>) -> bool {
    let Some(municipality) = user_municipality else {
        return false;
    };

    match alert.scope {
        AlertScope::Global => true,
        AlertScope::Departmental(department) => municipality.department == department,
    }
}

/// Optional department / municipality query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationFilter {
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub municipality: Option<MunicipalityId>,
}

impl LocationFilter {
    pub const fn new(department: Option<DepartmentId>, municipality: Option<MunicipalityId>) -> Self {
        Self {
            department,
            municipality,
        }
    }

    pub const fn is_active(&self) -> bool {
        self.department.is_some() || self.municipality.is_some()
    }

    /// A municipality filter wins over a department filter. A missing location never matches an
    /// active filter.
    pub fn matches(&self, location: Option<&MunicipalityRef>) -> bool {
        match (self.municipality, self.department) {
            (Some(municipality), _) => location.is_some_and(|loc| loc.id == municipality),
            (None, Some(department)) => location.is_some_and(|loc| loc.department == department),
            (None, None) => true,
        }
    }
}

pub fn matches_location(
    listing: &Listing,
    department: Option<DepartmentId>,
    municipality: Option<MunicipalityId>,
) -> bool {
    LocationFilter::new(department, municipality).matches(listing.municipality.as_ref())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid price range: min {min} is greater than max {max}")]
    InvalidRange { min: Decimal, max: Decimal },
    #[error("invalid price range: bound {0} is negative")]
    NegativeBound(Decimal),
    #[error("unknown ordering field '{0}'")]
    UnknownOrdering(String),
}

/// Inclusive price bounds; an unset bound imposes no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PriceRange {
    min: Option<Decimal>,
    max: Option<Decimal>,
}

impl PriceRange {
    pub const UNBOUNDED: PriceRange = PriceRange {
        min: None,
        max: None,
    };

    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Result<Self, FilterError> {
        for bound in [min, max].into_iter().flatten() {
            if bound < Decimal::ZERO {
                return Err(FilterError::NegativeBound(bound));
            }
        }

        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(FilterError::InvalidRange { min, max });
            }
        }

        Ok(Self { min, max })
    }

    pub fn min(&self) -> Option<Decimal> {
        self.min
    }

    pub fn max(&self) -> Option<Decimal> {
        self.max
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, price: Decimal) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

pub fn matches_price(listing: &Listing, range: &PriceRange) -> bool {
    range.contains(listing.price)
}
