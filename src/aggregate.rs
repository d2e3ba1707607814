//! Code for combining the observations of one run into a single sample.
use crate::id::CategoryID;
use crate::parser::Observation;
use crate::time::SampleTime;
use crate::units::{Dimensionless, Power};
use indexmap::IndexMap;

/// Total output per category at a single point in time.
///
/// Each category appears at most once. Categories are kept in the order in which they were first
/// observed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSample {
    /// When the sample was taken
    pub timestamp: SampleTime,
    outputs: IndexMap<CategoryID, Power>,
}

impl AggregatedSample {
    /// Group observations by category, summing their outputs.
    ///
    /// The feed may split one category across several rows (one per plant or unit), so outputs for
    /// the same category add. Capacity is not carried past this point.
    pub fn from_observations<'a, I>(timestamp: SampleTime, observations: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut outputs = IndexMap::new();
        for observation in observations {
            *outputs
                .entry(observation.category.clone())
                .or_insert(Power(0.0)) += observation.output;
        }

        Self { timestamp, outputs }
    }

    /// The summed output for a category, if it was observed
    pub fn output(&self, category: &str) -> Option<Power> {
        self.outputs.get(category).copied()
    }

    /// Iterate over categories and their summed outputs
    pub fn iter(&self) -> impl Iterator<Item = (&CategoryID, Power)> {
        self.outputs.iter().map(|(id, output)| (id, *output))
    }

    /// Iterate over the categories observed in this sample
    pub fn categories(&self) -> impl Iterator<Item = &CategoryID> {
        self.outputs.keys()
    }

    /// Whether no categories were observed
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Total output across all categories
    pub fn total_output(&self) -> Power {
        self.outputs.values().sum()
    }

    /// Each category's share of total output, as a percentage.
    ///
    /// Shares are unrounded. If total output is not positive, every share is zero.
    pub fn shares(&self) -> IndexMap<CategoryID, f64> {
        let total = self.total_output();
        self.outputs
            .iter()
            .map(|(id, output)| (id.clone(), percentage(*output, total)))
            .collect()
    }
}

/// `part` as a percentage of `total`, or zero if `total` is not positive
pub fn percentage(part: Power, total: Power) -> f64 {
    if total.value() > 0.0 {
        let Dimensionless(fraction) = part / total;
        100.0 * fraction
    } else {
        0.0
    }
}
