//! Derived carbon metrics for a sample.
//!
//! All quantities are computed from unrounded values and rounded once at the end, rounding halves
//! away from zero: outputs, emissions and shares to 2 decimal places and intensity to 6.
use crate::aggregate::{AggregatedSample, percentage};
use crate::category::{CategoryGroup, CategoryRegistry};
use crate::id::CategoryID;
use crate::units::{EmissionIntensity, Emissions, Power, round_dp};
use indexmap::IndexMap;
use strum::IntoEnumIterator;

/// Decimal places for outputs, emissions and shares
pub const VALUE_DECIMALS: i32 = 2;

/// Decimal places for emission intensity
pub const INTENSITY_DECIMALS: i32 = 6;

/// Metrics derived from a single sample
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Total output across all categories (MW)
    pub total_output: Power,
    /// Total emissions for one hour at the sampled output (tCO2)
    pub total_emissions: Emissions,
    /// Emissions per unit of energy generated (kgCO2/kWh). Zero if total output is not positive.
    pub emission_intensity: EmissionIntensity,
    /// Share of total output for each group of categories, as a percentage.
    ///
    /// Negative output (e.g. storage which is charging) reduces the total without belonging to any
    /// group, so a share can exceed 100 and the fossil and renewable shares can sum to more than
    /// 100.
    pub group_shares: IndexMap<CategoryGroup, f64>,
    /// Share of total output for each category in the sample, as a percentage
    pub category_shares: IndexMap<CategoryID, f64>,
}

impl Metrics {
    /// Compute metrics for a sample using the carbon factors in `registry`.
    ///
    /// Categories which aren't in the registry contribute to total output but have no emissions
    /// and belong to no group.
    pub fn compute(sample: &AggregatedSample, registry: &CategoryRegistry) -> Self {
        let total_output = sample.total_output();
        let total_emissions: Emissions = sample
            .iter()
            .map(|(id, output)| output * registry.carbon_factor(id.as_str()))
            .sum();

        let emission_intensity = if total_output.value() > 0.0 {
            total_emissions / total_output
        } else {
            EmissionIntensity(0.0)
        };

        let group_shares = CategoryGroup::iter()
            .map(|group| {
                let group_output: Power = sample
                    .iter()
                    .filter(|(id, _)| registry.is_in_group(id.as_str(), group))
                    .map(|(_, output)| output)
                    .sum();
                let share = round_dp(percentage(group_output, total_output), VALUE_DECIMALS);
                (group, share)
            })
            .collect();

        let category_shares = sample
            .shares()
            .into_iter()
            .map(|(id, share)| (id, round_dp(share, VALUE_DECIMALS)))
            .collect();

        Self {
            total_output: total_output.round_dp(VALUE_DECIMALS),
            total_emissions: total_emissions.round_dp(VALUE_DECIMALS),
            emission_intensity: emission_intensity.round_dp(INTENSITY_DECIMALS),
            group_shares,
            category_shares,
        }
    }

    /// The share of total output for a group, as a percentage
    pub fn group_share(&self, group: CategoryGroup) -> f64 {
        self.group_shares.get(&group).copied().unwrap_or(0.0)
    }

    /// The share of total output for a category, as a percentage. Zero if it wasn't observed.
    pub fn category_share(&self, category: &str) -> f64 {
        self.category_shares.get(category).copied().unwrap_or(0.0)
    }
}
