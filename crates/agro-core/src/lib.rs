#![deny(warnings)]

//! Core domain models and invariants for AgroProfit.
//!
//! This crate defines serializable types used across the simulator with
//! validation helpers to guarantee basic invariants at the host boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Unique identifier for a crop type, e.g. "padi", "jagung", "cabe".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CropCode(pub String);

impl CropCode {
    pub fn new(code: impl Into<String>) -> Self {
        CropCode(code.into())
    }
}

impl std::fmt::Display for CropCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit the land area of a [`SimulationInput`] is expressed in.
///
/// Persisted forms use the short names `"hectare"` and `"meter"`;
/// `"square_meter"` is accepted as an alias on input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaUnit {
    #[serde(rename = "hectare")]
    Hectare,
    #[serde(rename = "meter", alias = "square_meter")]
    SquareMeter,
}

/// Static reference defaults for a crop type: expected yield, market
/// price, and typical per-hectare input costs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    /// Human-readable crop name (e.g., "Padi Sawah").
    pub name: String,
    /// Expected harvest yield in kg per hectare.
    pub harvest_kg_per_ha: Decimal,
    /// Market price per kilogram.
    pub price_per_kg: Decimal,
    /// Typical seed cost per hectare.
    pub seed_cost: Decimal,
    /// Typical fertilizer cost per hectare.
    pub fertilizer_cost: Decimal,
    /// Typical labor cost per hectare.
    pub labor_cost: Decimal,
}

impl CropProfile {
    /// Zero-valued stand-in profile for an unknown crop code; the raw
    /// code doubles as the display name.
    pub fn fallback(code: &CropCode) -> Self {
        CropProfile {
            name: code.0.clone(),
            harvest_kg_per_ha: Decimal::ZERO,
            price_per_kg: Decimal::ZERO,
            seed_cost: Decimal::ZERO,
            fertilizer_cost: Decimal::ZERO,
            labor_cost: Decimal::ZERO,
        }
    }
}

/// User-supplied inputs for one profit simulation. Cost, harvest, and
/// price fields are on a per-hectare basis regardless of the area unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    /// Crop code (display-name lookup only; never alters the arithmetic).
    pub crop: CropCode,
    /// Land area in the given unit (> 0 for a meaningful ROI).
    pub land_area: Decimal,
    /// Unit of `land_area`.
    pub unit: AreaUnit,
    /// Seed cost per hectare.
    pub seed_cost: Decimal,
    /// Fertilizer cost per hectare.
    pub fertilizer_cost: Decimal,
    /// Labor cost per hectare.
    pub labor_cost: Decimal,
    /// Estimated harvest in kg per hectare.
    pub estimated_harvest: Decimal,
    /// Selling price per kilogram.
    pub price_per_kg: Decimal,
}

/// Immutable snapshot of a computed simulation: totals plus the echoed
/// inputs that produced them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Total cost over the whole area, whole monetary units.
    pub total_cost: Decimal,
    /// Total revenue over the whole area, whole monetary units.
    pub total_revenue: Decimal,
    /// Signed profit (`total_revenue - total_cost`), whole units.
    pub profit: Decimal,
    /// Return on investment in percent, two decimal places; 0 when
    /// total cost is 0.
    pub roi: Decimal,
    /// Display name resolved from the crop profile table.
    pub crop_name: String,
    /// Echoed crop code.
    pub crop: CropCode,
    pub land_area: Decimal,
    pub unit: AreaUnit,
    pub seed_cost: Decimal,
    pub fertilizer_cost: Decimal,
    pub labor_cost: Decimal,
    pub estimated_harvest: Decimal,
    pub price_per_kg: Decimal,
    /// When the result was computed.
    pub calculated_at: DateTime<Utc>,
}

/// A named achievement marker. Once earned it is never revoked, and a
/// user never holds two badges with the same name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
}

/// Per-user gamification aggregate: cumulative points, simulation count,
/// and the append-only badge set.
///
/// The level is derived from points and intentionally not stored, so it
/// can never drift from the `points / 100 + 1` rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProgression {
    pub points: u64,
    pub simulations_count: u64,
    pub badges: Vec<Badge>,
}

impl UserProgression {
    /// Level derived from points: one level per 100 points, starting at 1.
    pub fn level(&self) -> u64 {
        self.points / 100 + 1
    }

    pub fn has_badge(&self, name: &str) -> bool {
        self.badges.iter().any(|b| b.name == name)
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Monetary or quantity field must be non-negative.
    #[error("negative value for {0}")]
    NegativeValue(&'static str),
    /// Land area must be strictly positive.
    #[error("land area must be > 0")]
    NonPositiveArea,
    /// Badge names within one progression must be unique.
    #[error("duplicate badge name: {0}")]
    DuplicateBadge(String),
    /// Text field must be non-empty.
    #[error("empty field: {0}")]
    EmptyField(&'static str),
}

/// Validate a simulation input at the host boundary. The economics
/// engine itself assumes these preconditions hold.
pub fn validate_input(input: &SimulationInput) -> Result<(), ValidationError> {
    if input.land_area <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveArea);
    }
    let fields = [
        (input.seed_cost, "seed_cost"),
        (input.fertilizer_cost, "fertilizer_cost"),
        (input.labor_cost, "labor_cost"),
        (input.estimated_harvest, "estimated_harvest"),
        (input.price_per_kg, "price_per_kg"),
    ];
    for (value, name) in fields {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeValue(name));
        }
    }
    Ok(())
}

/// Validate a crop profile (reference data sanity; built-ins always pass).
pub fn validate_profile(profile: &CropProfile) -> Result<(), ValidationError> {
    if profile.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    let fields = [
        (profile.harvest_kg_per_ha, "harvest_kg_per_ha"),
        (profile.price_per_kg, "price_per_kg"),
        (profile.seed_cost, "seed_cost"),
        (profile.fertilizer_cost, "fertilizer_cost"),
        (profile.labor_cost, "labor_cost"),
    ];
    for (value, name) in fields {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeValue(name));
        }
    }
    Ok(())
}

/// Validate a progression aggregate, including badge-name uniqueness.
pub fn validate_progression(p: &UserProgression) -> Result<(), ValidationError> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for badge in &p.badges {
        if badge.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("badge name"));
        }
        if !names.insert(&badge.name) {
            return Err(ValidationError::DuplicateBadge(badge.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn input() -> SimulationInput {
        SimulationInput {
            crop: CropCode::new("padi"),
            land_area: Decimal::ONE,
            unit: AreaUnit::Hectare,
            seed_cost: Decimal::new(2_000_000, 0),
            fertilizer_cost: Decimal::new(1_500_000, 0),
            labor_cost: Decimal::new(3_000_000, 0),
            estimated_harvest: Decimal::new(6000, 0),
            price_per_kg: Decimal::new(5000, 0),
        }
    }

    fn badge(name: &str) -> Badge {
        Badge {
            name: name.to_string(),
            icon: "🌱".to_string(),
            description: String::new(),
            earned_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn serde_roundtrip_input() {
        let s = serde_json::to_string(&input()).unwrap();
        let back: SimulationInput = serde_json::from_str(&s).unwrap();
        assert_eq!(back, input());
    }

    #[test]
    fn area_unit_wire_names() {
        assert_eq!(serde_json::to_string(&AreaUnit::Hectare).unwrap(), "\"hectare\"");
        assert_eq!(serde_json::to_string(&AreaUnit::SquareMeter).unwrap(), "\"meter\"");
        let alias: AreaUnit = serde_json::from_str("\"square_meter\"").unwrap();
        assert_eq!(alias, AreaUnit::SquareMeter);
    }

    #[test]
    fn valid_input_passes() {
        assert!(validate_input(&input()).is_ok());
    }

    #[test]
    fn zero_area_rejected() {
        let mut i = input();
        i.land_area = Decimal::ZERO;
        assert_eq!(validate_input(&i), Err(ValidationError::NonPositiveArea));
    }

    #[test]
    fn negative_cost_rejected() {
        let mut i = input();
        i.fertilizer_cost = Decimal::new(-1, 0);
        assert_eq!(
            validate_input(&i),
            Err(ValidationError::NegativeValue("fertilizer_cost"))
        );
    }

    #[test]
    fn level_is_derived_from_points() {
        let mut p = UserProgression::default();
        assert_eq!(p.level(), 1);
        p.points = 99;
        assert_eq!(p.level(), 1);
        p.points = 100;
        assert_eq!(p.level(), 2);
        p.points = 510;
        assert_eq!(p.level(), 6);
    }

    #[test]
    fn duplicate_badge_names_rejected() {
        let p = UserProgression {
            points: 0,
            simulations_count: 5,
            badges: vec![badge("Novice"), badge("Novice")],
        };
        assert_eq!(
            validate_progression(&p),
            Err(ValidationError::DuplicateBadge("Novice".to_string()))
        );
    }

    #[test]
    fn fallback_profile_is_zeroed() {
        let code = CropCode::new("xyz");
        let p = CropProfile::fallback(&code);
        assert_eq!(p.name, "xyz");
        assert_eq!(p.seed_cost, Decimal::ZERO);
        assert_eq!(p.harvest_kg_per_ha, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn non_negative_fields_validate(seed in 0i64..100_000_000,
                                        fert in 0i64..100_000_000,
                                        labor in 0i64..100_000_000,
                                        area in 1i64..10_000) {
            let mut i = input();
            i.seed_cost = Decimal::new(seed, 0);
            i.fertilizer_cost = Decimal::new(fert, 0);
            i.labor_cost = Decimal::new(labor, 0);
            i.land_area = Decimal::new(area, 0);
            prop_assert!(validate_input(&i).is_ok());
        }

        #[test]
        fn level_never_below_one(points in 0u64..1_000_000) {
            let p = UserProgression { points, ..Default::default() };
            prop_assert!(p.level() >= 1);
            prop_assert_eq!(p.level(), points / 100 + 1);
        }
    }
}
