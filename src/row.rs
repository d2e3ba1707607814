//! Code for reshaping a sample into a single flat row of the history table.
//!
//! A row has one value per column name. Columns are matched by name when rows are merged, but we
//! still lay them out in a canonical order so that files written by successive runs line up.
use crate::aggregate::AggregatedSample;
use crate::category::{CategoryGroup, CategoryRegistry};
use crate::id::CategoryID;
use crate::metrics::{Metrics, VALUE_DECIMALS};
use crate::time::SampleTime;
use crate::units::round_dp;
use indexmap::{IndexMap, IndexSet};
use strum::IntoEnumIterator;

/// The name of the key column
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Column for total output
pub const TOTAL_OUTPUT_COLUMN: &str = "total_generation(MW)";

/// Column for total emissions
pub const TOTAL_EMISSIONS_COLUMN: &str = "carbon_emissions(tCO2)";

/// Column for emission intensity
pub const INTENSITY_COLUMN: &str = "emission_intensity(kgCO2/kWh)";

/// Suffix for per-category generation columns
const GENERATION_SUFFIX: &str = "(MW)";

/// Suffix for per-category share columns
const SHARE_SUFFIX: &str = "(%)";

/// The name of the column holding the share of output for a group
pub fn group_share_column(group: CategoryGroup) -> String {
    format!("{group}_share{SHARE_SUFFIX}")
}

/// The name of the column holding the output of a category
pub fn generation_column(category: &CategoryID) -> String {
    format!("{category}{GENERATION_SUFFIX}")
}

/// The name of the column holding the share of output of a category
pub fn share_column(category: &CategoryID) -> String {
    format!("{category}{SHARE_SUFFIX}")
}

/// The names of the fixed metric columns, in order
pub fn metric_columns() -> Vec<String> {
    let mut columns = vec![
        TOTAL_OUTPUT_COLUMN.to_string(),
        TOTAL_EMISSIONS_COLUMN.to_string(),
        INTENSITY_COLUMN.to_string(),
    ];
    columns.extend(CategoryGroup::iter().map(group_share_column));

    columns
}

/// Whether a category with this label would have a column named the same as a fixed column
pub fn is_reserved_label(label: &str) -> bool {
    let metric_columns = metric_columns();
    [
        format!("{label}{GENERATION_SUFFIX}"),
        format!("{label}{SHARE_SUFFIX}"),
    ]
    .iter()
    .any(|column| column == TIMESTAMP_COLUMN || metric_columns.contains(column))
}

/// Recover the categories recorded in a set of column names.
///
/// Every category has a generation column, so we look for those, ignoring metric columns.
pub fn categories_from_columns<'a, I>(columns: I) -> Vec<CategoryID>
where
    I: IntoIterator<Item = &'a String>,
{
    let metric_columns = metric_columns();
    columns
        .into_iter()
        .filter(|column| !metric_columns.contains(*column))
        .filter_map(|column| column.strip_suffix(GENERATION_SUFFIX))
        .filter(|category| !category.is_empty())
        .map(CategoryID::from)
        .collect()
}

/// One record of the history table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The key of the row
    pub timestamp: SampleTime,
    /// Values for every other column, by column name
    pub values: IndexMap<String, f64>,
}

impl Row {
    /// Create a new [`Row`]
    pub fn new(timestamp: SampleTime, values: IndexMap<String, f64>) -> Self {
        Self { timestamp, values }
    }

    /// The value in the given column, if present
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Turns a sample and its metrics into a [`Row`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowShaper {
    /// Whether to include a share column for every category
    pub include_shares: bool,
}

impl Default for RowShaper {
    fn default() -> Self {
        Self {
            include_shares: true,
        }
    }
}

impl RowShaper {
    /// Create a new [`RowShaper`]
    pub fn new(include_shares: bool) -> Self {
        Self { include_shares }
    }

    /// Every category a row should have a column for.
    ///
    /// This is the categories in the registry, in registry order, followed by any other categories
    /// which have been recorded in the history table, in the order they appear there.
    pub fn known_categories<'a, I>(
        registry: &CategoryRegistry,
        history_columns: I,
    ) -> IndexSet<CategoryID>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut known: IndexSet<CategoryID> = registry.ids().cloned().collect();
        known.extend(categories_from_columns(history_columns));
        known
    }

    /// Build a row from a sample.
    ///
    /// The row has the metric columns followed by a generation column (and a share column, if
    /// enabled) for each known category. Categories in the sample which aren't yet known are
    /// added after the known ones. Known categories which weren't observed get zeros.
    pub fn shape(
        &self,
        sample: &AggregatedSample,
        metrics: &Metrics,
        known_categories: &IndexSet<CategoryID>,
    ) -> Row {
        let mut values = IndexMap::new();
        values.insert(
            TOTAL_OUTPUT_COLUMN.to_string(),
            metrics.total_output.value(),
        );
        values.insert(
            TOTAL_EMISSIONS_COLUMN.to_string(),
            metrics.total_emissions.value(),
        );
        values.insert(
            INTENSITY_COLUMN.to_string(),
            metrics.emission_intensity.value(),
        );
        for group in CategoryGroup::iter() {
            values.insert(group_share_column(group), metrics.group_share(group));
        }

        let new_categories = sample
            .categories()
            .filter(|category| !known_categories.contains(*category));
        for category in known_categories.iter().chain(new_categories) {
            let output = sample
                .output(category.as_str())
                .map_or(0.0, |output| round_dp(output.value(), VALUE_DECIMALS));
            values.insert(generation_column(category), output);
            if self.include_shares {
                values.insert(
                    share_column(category),
                    metrics.category_share(category.as_str()),
                );
            }
        }

        Row::new(sample.timestamp, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Category, CategoryTag};
    use crate::parser::Observation;
    use crate::units::Power;
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> CategoryRegistry {
        CategoryRegistry::new([
            Category::new("Coal", 0.9, &[CategoryTag::Fossil]),
            Category::new("Wind", 0.0, &[CategoryTag::Renewable]),
            Category::new("Solar", 0.0, &[CategoryTag::Renewable]),
        ])
        .unwrap()
    }

    fn sample(outputs: &[(&str, f64)]) -> AggregatedSample {
        let observations = outputs
            .iter()
            .map(|(category, output)| Observation {
                category: (*category).into(),
                capacity: Power(100.0),
                output: Power(*output),
            })
            .collect_vec();
        AggregatedSample::from_observations("2025-06-01 12:00".parse().unwrap(), &observations)
    }

    #[rstest]
    fn test_shape(registry: CategoryRegistry) {
        let sample = sample(&[("Wind", 20.0), ("Coal", 50.0), ("Coal", 10.0)]);
        let metrics = Metrics::compute(&sample, &registry);
        let known = RowShaper::known_categories(&registry, std::iter::empty());
        let row = RowShaper::default().shape(&sample, &metrics, &known);

        assert_eq!(row.timestamp.to_string(), "2025-06-01 12:00");
        assert_eq!(
            row.values.keys().collect_vec(),
            [
                "total_generation(MW)",
                "carbon_emissions(tCO2)",
                "emission_intensity(kgCO2/kWh)",
                "renewable_share(%)",
                "fossil_share(%)",
                "low_carbon_share(%)",
                "Coal(MW)",
                "Coal(%)",
                "Wind(MW)",
                "Wind(%)",
                "Solar(MW)",
                "Solar(%)",
            ]
        );
        assert_approx_eq!(f64, row.get("Coal(MW)").unwrap(), 60.0);
        assert_approx_eq!(f64, row.get("Coal(%)").unwrap(), 75.0);
        assert_approx_eq!(f64, row.get("Wind(%)").unwrap(), 25.0);
        assert_approx_eq!(f64, row.get("Solar(MW)").unwrap(), 0.0);
        assert_approx_eq!(f64, row.get("Solar(%)").unwrap(), 0.0);
        assert_approx_eq!(f64, row.get(TOTAL_EMISSIONS_COLUMN).unwrap(), 54.0);
    }

    #[rstest]
    fn test_shape_without_shares(registry: CategoryRegistry) {
        let sample = sample(&[("Coal", 10.0)]);
        let metrics = Metrics::compute(&sample, &registry);
        let known = RowShaper::known_categories(&registry, std::iter::empty());
        let row = RowShaper::new(false).shape(&sample, &metrics, &known);

        assert!(row.get("Coal(MW)").is_some());
        assert!(row.get("Coal(%)").is_none());
        assert!(row.get("fossil_share(%)").is_some());
    }

    #[rstest]
    fn test_shape_new_and_historical_categories(registry: CategoryRegistry) {
        let history_columns = [
            TOTAL_OUTPUT_COLUMN.to_string(),
            "Coal(MW)".to_string(),
            "Tidal(MW)".to_string(),
            "Tidal(%)".to_string(),
        ];
        let known = RowShaper::known_categories(&registry, &history_columns);
        assert_eq!(
            known.iter().map(CategoryID::as_str).collect_vec(),
            ["Coal", "Wind", "Solar", "Tidal"]
        );

        let sample = sample(&[("Geothermal", 5.0), ("Coal", 5.0)]);
        let metrics = Metrics::compute(&sample, &registry);
        let row = RowShaper::new(false).shape(&sample, &metrics, &known);
        assert_eq!(
            row.values.keys().skip(6).collect_vec(),
            [
                "Coal(MW)",
                "Wind(MW)",
                "Solar(MW)",
                "Tidal(MW)",
                "Geothermal(MW)"
            ]
        );
        assert_approx_eq!(f64, row.get("Tidal(MW)").unwrap(), 0.0);
        assert_approx_eq!(f64, row.get("Geothermal(MW)").unwrap(), 5.0);
    }

    #[rstest]
    fn test_conservation(registry: CategoryRegistry) {
        let sample = sample(&[("Coal", 12.345), ("Wind", 7.005), ("Tidal", -1.1)]);
        let metrics = Metrics::compute(&sample, &registry);
        let known = RowShaper::known_categories(&registry, std::iter::empty());
        let row = RowShaper::default().shape(&sample, &metrics, &known);

        let category_total: f64 = categories_from_columns(row.values.keys())
            .iter()
            .map(|category| row.get(&generation_column(category)).unwrap())
            .sum();
        assert!((category_total - row.get(TOTAL_OUTPUT_COLUMN).unwrap()).abs() < 0.02);
    }

    #[rstest]
    #[case("total_generation", true)]
    #[case("renewable_share", true)]
    #[case("low_carbon_share", true)]
    #[case("carbon_emissions", false)]
    #[case("timestamp", false)]
    #[case("燃煤(Coal)", false)]
    fn test_is_reserved_label(#[case] label: &str, #[case] expected: bool) {
        assert_eq!(is_reserved_label(label), expected);
    }

    #[test]
    fn test_categories_from_columns() {
        let columns = [
            "total_generation(MW)".to_string(),
            "renewable_share(%)".to_string(),
            "燃煤(Coal)(MW)".to_string(),
            "燃煤(Coal)(%)".to_string(),
            "(MW)".to_string(),
        ];
        assert_eq!(
            categories_from_columns(&columns),
            [CategoryID::new("燃煤(Coal)")]
        );
    }
}
