//! Crop production records.
//!
//! Plain owner data with no lifecycle; it shares the product reference with listings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::listings::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FertilizerKind {
    #[default]
    None,
    Organic,
    Chemical,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationMethod {
    #[default]
    None,
    Gravity,
    Drip,
    Sprinkler,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropDraft {
    pub product: ProductId,
    /// Variety or cultivar sown, e.g. "castilla" for coffee.
    pub crop_type: String,
    pub start_date: NaiveDate,
    pub harvest_date: NaiveDate,
    /// Hectares sown.
    pub area: f64,
    pub production_qty: f64,
    #[serde(default)]
    pub fertilizer: FertilizerKind,
    #[serde(default)]
    pub irrigation: IrrigationMethod,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CropError {
    #[error("harvest date {harvest} must be after start date {start}")]
    HarvestNotAfterStart { start: NaiveDate, harvest: NaiveDate },
    #[error("area must be positive (found {0})")]
    NonPositiveArea(f64),
    #[error("production quantity must be positive (found {0})")]
    NonPositiveProduction(f64),
    #[error("crop type is required")]
    MissingCropType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecord {
    pub owner: UserId,
    pub product: ProductId,
    pub crop_type: String,
    pub start_date: NaiveDate,
    pub harvest_date: NaiveDate,
    pub area: f64,
    pub production_qty: f64,
    pub fertilizer: FertilizerKind,
    pub irrigation: IrrigationMethod,
    pub notes: String,
}

impl CropRecord {
    pub fn new(owner: UserId, draft: CropDraft) -> Result<Self, CropError> {
        let crop_type = draft.crop_type.trim();
        if crop_type.is_empty() {
            return Err(CropError::MissingCropType);
        }
        if draft.harvest_date <= draft.start_date {
            return Err(CropError::HarvestNotAfterStart {
                start: draft.start_date,
                harvest: draft.harvest_date,
            });
        }
        // Written as the valid range so NaN is rejected too.
        if !(draft.area > 0.0 && draft.area.is_finite()) {
            return Err(CropError::NonPositiveArea(draft.area));
        }
        if !(draft.production_qty > 0.0 && draft.production_qty.is_finite()) {
            return Err(CropError::NonPositiveProduction(draft.production_qty));
        }

        Ok(Self {
            owner,
            product: draft.product,
            crop_type: crop_type.to_string(),
            start_date: draft.start_date,
            harvest_date: draft.harvest_date,
            area: draft.area,
            production_qty: draft.production_qty,
            fertilizer: draft.fertilizer,
            irrigation: draft.irrigation,
            notes: draft.notes.trim().to_string(),
        })
    }

    pub fn growing_days(&self) -> i64 {
        (self.harvest_date - self.start_date).num_days()
    }

    /// Production per hectare.
    pub fn yield_per_area(&self) -> f64 {
        self.production_qty / self.area
    }
}
