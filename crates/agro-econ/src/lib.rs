#![deny(warnings)]

//! Economics engine for AgroProfit.
//!
//! This module provides the profit/ROI calculation and the static crop
//! profile table:
//! - Pure derivation of cost, revenue, profit, and ROI from one input
//! - Unit normalization (square meters to hectares)
//! - Per-crop default parameters with a zero-valued fallback

use agro_core::{AreaUnit, CropCode, CropProfile, SimulationInput, SimulationResult};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

/// Square meters per hectare.
const SQM_PER_HECTARE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

fn builtin_profiles() -> [(&'static str, CropProfile); 6] {
    let profile = |name: &str, harvest: i64, price: i64, seed: i64, fert: i64, labor: i64| {
        CropProfile {
            name: name.to_string(),
            harvest_kg_per_ha: Decimal::new(harvest, 0),
            price_per_kg: Decimal::new(price, 0),
            seed_cost: Decimal::new(seed, 0),
            fertilizer_cost: Decimal::new(fert, 0),
            labor_cost: Decimal::new(labor, 0),
        }
    };
    [
        ("padi", profile("Padi Sawah", 6000, 5000, 2_000_000, 1_500_000, 3_000_000)),
        ("jagung", profile("Jagung", 5000, 4000, 1_500_000, 1_200_000, 2_500_000)),
        ("kedelai", profile("Kedelai", 2000, 8000, 1_000_000, 800_000, 2_000_000)),
        ("cabe", profile("Cabe Merah", 10_000, 25_000, 3_000_000, 2_000_000, 4_000_000)),
        ("tomat", profile("Tomat", 15_000, 5000, 1_200_000, 1_000_000, 2_500_000)),
        ("bawang", profile("Bawang Merah", 8000, 15_000, 2_500_000, 1_800_000, 3_500_000)),
    ]
}

/// Look up the static profile for a crop code.
///
/// Unknown codes resolve to a zero-valued stand-in whose display name is
/// the raw code, so the lookup is total and never fails.
pub fn crop_profile(code: &CropCode) -> CropProfile {
    for (key, profile) in builtin_profiles() {
        if key == code.0 {
            return profile;
        }
    }
    debug!(crop = %code, "unknown crop code, using zero-valued fallback");
    CropProfile::fallback(code)
}

/// Code/label pairs for every built-in crop, in table order.
pub fn crop_options() -> Vec<(CropCode, String)> {
    builtin_profiles()
        .into_iter()
        .map(|(key, profile)| (CropCode::new(key), profile.name))
        .collect()
}

/// Build a simulation input pre-filled with the crop's default costs,
/// yield, and price for the given area.
pub fn input_from_profile(code: &CropCode, land_area: Decimal, unit: AreaUnit) -> SimulationInput {
    let profile = crop_profile(code);
    SimulationInput {
        crop: code.clone(),
        land_area,
        unit,
        seed_cost: profile.seed_cost,
        fertilizer_cost: profile.fertilizer_cost,
        labor_cost: profile.labor_cost,
        estimated_harvest: profile.harvest_kg_per_ha,
        price_per_kg: profile.price_per_kg,
    }
}

fn round_whole(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute a profit/ROI breakdown from one simulation input.
///
/// Pure: no side effects, and the crop table is consulted only for the
/// display name. The arithmetic always uses the caller-supplied cost,
/// harvest, and price fields, even when they override the crop defaults.
/// Preconditions (non-negative fields) are the caller's responsibility;
/// see `agro_core::validate_input`.
///
/// Cost, revenue, and profit are rounded to whole monetary units; ROI is
/// a percentage with two decimal places, reported as 0 when total cost
/// is 0 rather than undefined.
pub fn compute_simulation(input: &SimulationInput, now: DateTime<Utc>) -> SimulationResult {
    let area_ha = match input.unit {
        AreaUnit::SquareMeter => input.land_area / SQM_PER_HECTARE,
        AreaUnit::Hectare => input.land_area,
    };

    let total_cost = (input.seed_cost + input.fertilizer_cost + input.labor_cost) * area_ha;
    let total_revenue = (input.estimated_harvest * input.price_per_kg) * area_ha;
    let profit = total_revenue - total_cost;
    let roi = if total_cost > Decimal::ZERO {
        (profit / total_cost * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };

    SimulationResult {
        total_cost: round_whole(total_cost),
        total_revenue: round_whole(total_revenue),
        profit: round_whole(profit),
        roi,
        crop_name: crop_profile(&input.crop).name,
        crop: input.crop.clone(),
        land_area: input.land_area,
        unit: input.unit,
        seed_cost: input.seed_cost,
        fertilizer_cost: input.fertilizer_cost,
        labor_cost: input.labor_cost,
        estimated_harvest: input.estimated_harvest,
        price_per_kg: input.price_per_kg,
        calculated_at: now,
    }
}
