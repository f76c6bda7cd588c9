//! Agricultural marketplace core.
//!
//! - `listings`: lifecycle engine, eligibility filter and composable query predicates.
//! - `scope`: location rules shared by alert audiences and listing queries.
//! - `alerts`, `geography`, `categories`, `crops`: the data those rules consume.

pub mod alerts;
pub mod categories;
pub mod crops;
pub mod geography;
pub mod listings;
pub mod router;
pub mod scope;

#[cfg(test)]
mod tests;

pub use router::{marketplace_router, MarketplaceState};
