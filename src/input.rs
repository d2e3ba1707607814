//! Common routines for handling input data.
use crate::category::{Category, CategoryRegistry, CategoryTag};
use crate::row::is_reserved_label;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a series of type Ts from a CSV file into a Vec<T>.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_vec_from_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = read_csv_internal(file_path)?;
    ensure!(!vec.is_empty(), "CSV file {} cannot be empty", file_path.display());

    Ok(vec)
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// A category as it appears in a categories CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct CategoryRaw {
    id: String,
    carbon_factor: f64,
    #[serde(default)]
    groups: String,
}

impl CategoryRaw {
    fn into_category(self) -> Result<Category> {
        let tags: Vec<CategoryTag> = self
            .groups
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .with_context(|| format!("Invalid group '{s}' for category {}", self.id))
            })
            .try_collect()?;

        ensure!(
            !is_reserved_label(&self.id),
            "Category {} clashes with a metric column",
            self.id
        );

        Ok(Category::new(&self.id, self.carbon_factor, &tags))
    }
}

/// Read a table of categories from a CSV file.
///
/// The file has the columns `id`, `carbon_factor` and `groups`, where `groups` is a
/// semicolon-separated list of `renewable`, `fossil` and `nuclear` (possibly empty). The order of
/// rows determines the order of the category columns in the output.
pub fn read_categories(file_path: &Path) -> Result<CategoryRegistry> {
    let categories: Vec<Category> = read_vec_from_csv::<CategoryRaw>(file_path)?
        .into_iter()
        .map(CategoryRaw::into_category)
        .try_collect()
        .with_context(|| input_err_msg(file_path))?;

    CategoryRegistry::new(categories).with_context(|| input_err_msg(file_path))
}
