//! Composable query predicates for marketplace listings.
//!
//! Each predicate is an independent pure function; `ListingQuery` simply ANDs the ones that are
//! set, so evaluation order only affects cost, never membership.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::Listing;
use super::eligibility::{is_active_only, is_eligible, AudienceContext};
use crate::marketplace::categories::{CategoryId, CategoryTree};
use crate::marketplace::geography::{AdministrativeHierarchy, DepartmentId, MunicipalityId};
use crate::marketplace::scope::{matches_price, FilterError, LocationFilter, PriceRange};

pub fn matches_category(listing: &Listing, categories: &BTreeSet<CategoryId>) -> bool {
    listing
        .category
        .is_some_and(|category| categories.contains(&category))
}

/// Free-text term, lower-cased, with the municipalities whose own or department name contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    needle: String,
    places: BTreeSet<MunicipalityId>,
}

impl SearchTerm {
    /// `None` for blank input.
    pub fn new(raw: &str, hierarchy: &AdministrativeHierarchy) -> Option<Self> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        Some(Self {
            places: hierarchy.municipalities_named(&needle),
            needle,
        })
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }
}

/// Case-insensitive substring match over title, description and location names.
pub fn matches_search(listing: &Listing, term: &SearchTerm) -> bool {
    listing.title.to_lowercase().contains(&term.needle)
        || listing.description.to_lowercase().contains(&term.needle)
        || listing
            .municipality
            .is_some_and(|place| term.places.contains(&place.id))
}

pub fn matches_unit(listing: &Listing, unit: &str) -> bool {
    listing
        .unit_of_measure
        .to_lowercase()
        .contains(&unit.trim().to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    CreatedAt,
    Price,
    Quantity,
    PublishedAt,
}

impl OrderField {
    pub const fn label(self) -> &'static str {
        match self {
            OrderField::CreatedAt => "created_at",
            OrderField::Price => "price",
            OrderField::Quantity => "quantity",
            OrderField::PublishedAt => "published_at",
        }
    }
}

/// Sort order for result sets; `-field` means descending.
///
/// Ties fall back to newest `created_at`, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListingOrdering {
    pub field: OrderField,
    pub descending: bool,
}

/// Most recently published first; unpublished listings sort last.
impl Default for ListingOrdering {
    fn default() -> Self {
        Self {
            field: OrderField::PublishedAt,
            descending: true,
        }
    }
}

impl FromStr for ListingOrdering {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "created_at" => OrderField::CreatedAt,
            "price" => OrderField::Price,
            "quantity" => OrderField::Quantity,
            "published_at" => OrderField::PublishedAt,
            _ => return Err(FilterError::UnknownOrdering(raw.to_string())),
        };
        Ok(Self { field, descending })
    }
}

impl ListingOrdering {
    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        let primary = match self.field {
            OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
            OrderField::Price => a.price.cmp(&b.price),
            OrderField::Quantity => a.quantity.cmp(&b.quantity),
            OrderField::PublishedAt => a.published_at.cmp(&b.published_at),
        };
        let primary = if self.descending {
            primary.reverse()
        } else {
            primary
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, listings: &mut [Listing]) {
        listings.sort_by(|a, b| self.compare(a, b));
    }
}

/// Raw marketplace query parameters as they arrive from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub municipality: Option<MunicipalityId>,
    #[serde(default, alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub ordering: Option<String>,
    /// Keep sold, paused and expired listings in the public feed.
    #[serde(default)]
    pub include_inactive: Option<bool>,
}

/// Validated set of predicates ANDed with an audience's eligibility rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingQuery {
    pub categories: Option<BTreeSet<CategoryId>>,
    pub price: PriceRange,
    pub location: LocationFilter,
    pub search: Option<SearchTerm>,
    pub unit: Option<String>,
    pub featured_only: bool,
    pub active_only: bool,
    pub ordering: ListingOrdering,
}

impl ListingQuery {
    /// Validate raw parameters. Range and ordering errors surface here, before any listing is
    /// looked at.
    pub fn from_params(
        params: FeedParams,
        categories: &CategoryTree,
        hierarchy: &AdministrativeHierarchy,
    ) -> Result<Self, FilterError> {
        let price = PriceRange::new(params.min_price, params.max_price)?;
        let ordering = params
            .ordering
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| raw.parse::<ListingOrdering>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            categories: params.category.map(|id| categories.descendants_of(id)),
            price,
            location: LocationFilter::new(params.department, params.municipality),
            search: params
                .search
                .as_deref()
                .and_then(|raw| SearchTerm::new(raw, hierarchy)),
            unit: non_empty(params.unit),
            featured_only: params.is_featured.unwrap_or(false),
            active_only: !params.include_inactive.unwrap_or(false),
            ordering,
        })
    }

    /// AND of every predicate that is set.
    pub fn admits(&self, listing: &Listing, now: DateTime<Utc>) -> bool {
        if self.active_only && !is_active_only(listing, now) {
            return false;
        }
        if let Some(categories) = &self.categories {
            if !matches_category(listing, categories) {
                return false;
            }
        }
        if !matches_price(listing, &self.price) {
            return false;
        }
        if !self.location.matches(listing.municipality.as_ref()) {
            return false;
        }
        if self.featured_only && !listing.is_featured {
            return false;
        }
        if let Some(unit) = &self.unit {
            if !matches_unit(listing, unit) {
                return false;
            }
        }
        match &self.search {
            Some(term) => matches_search(listing, term),
            None => true,
        }
    }

    /// Filter `listings` for `context` and sort the survivors.
    pub fn run<I>(&self, listings: I, context: &AudienceContext, now: DateTime<Utc>) -> Vec<Listing>
    where
        I: IntoIterator<Item = Listing>,
    {
        let mut results: Vec<Listing> = listings
            .into_iter()
            .filter(|listing| is_eligible(listing, context) && self.admits(listing, now))
            .collect();
        self.ordering.sort(&mut results);
        results
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
