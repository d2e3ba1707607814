//! Code for loading program settings.
use crate::category::CategoryRegistry;
use crate::feed::DEFAULT_FEED_URL;
use crate::get_gridcarbon_config_dir;
use crate::input::{read_categories, read_toml};
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for gridcarbon
# Uncomment a line to change its value
";

/// The default location of the history table
pub const DEFAULT_HISTORY_PATH: &str = "taipower_emission_data.csv";

/// The default request timeout, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_gridcarbon_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// The default program log level
    pub log_level: String,
    /// The URL of the generation feed
    pub feed_url: String,
    /// Path to the CSV file which samples are recorded in
    pub history_path: PathBuf,
    /// How long to wait for the feed before giving up, in seconds
    pub timeout_secs: u64,
    /// Whether to record each category's share of total output
    pub include_shares: bool,
    /// A CSV file of categories to use instead of the built-in table
    pub categories_path: Option<PathBuf>,
    /// A directory to write log files to
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            history_path: DEFAULT_HISTORY_PATH.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            include_shares: true,
            categories_path: None,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Read the contents of the settings file from the config directory.
    ///
    /// If the file is not present, default values for settings will be used
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if the file is invalid
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read settings from the specified path, using defaults if it doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// The request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The category registry to use: either the one in `categories_path` or the built-in one
    pub fn category_registry(&self) -> Result<CategoryRegistry> {
        match &self.categories_path {
            Some(path) => read_categories(path),
            None => Ok(CategoryRegistry::taipower()),
        }
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> String {
        // Convert to TOML. Fields which are None by default are omitted.
        let settings_raw =
            toml::to_string(&Settings::default()).expect("Could not convert settings to TOML");

        // Iterate through the generated TOML, commenting out lines and adding docs
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.split('\n') {
            if let Some(last) = line.find('=') {
                let field = line[..last].trim();

                // All fields should have doc comments
                let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
                for line in docs.split('\n') {
                    write!(&mut out, "\n# # {}\n", line.trim()).unwrap();
                }

                writeln!(&mut out, "# {}", line.trim()).unwrap();
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "log_level = \"warn\"").unwrap();
            writeln!(file, "timeout_secs = 5").unwrap();
            writeln!(file, "log_dir = \"logs\"").unwrap();
        }

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                timeout_secs: 5,
                log_dir: Some("logs".into()),
                ..Settings::default()
            }
        );
    }

    #[test]
    fn test_settings_load_from_path_unknown_field() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "colour = \"blue\"\n").unwrap();

        assert_error!(
            Settings::load_from_path(&file_path),
            format!("Error reading {}", file_path.display())
        );
    }

    #[test]
    fn test_category_registry() {
        assert_eq!(
            Settings::default().category_registry().unwrap().len(),
            CategoryRegistry::taipower().len()
        );

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("categories.csv");
        fs::write(&file_path, "id,carbon_factor,groups\nCoal,0.9,fossil\n").unwrap();
        let settings = Settings {
            categories_path: Some(file_path),
            ..Settings::default()
        };
        let registry = settings.category_registry().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Coal").is_some());
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents();
        assert!(contents.starts_with(DEFAULT_SETTINGS_FILE_HEADER));
        assert!(contents.contains("# timeout_secs = 30\n"));
        assert!(contents.contains("# # Whether to record each category's share of total output\n"));

        // Uncommenting everything should give the default settings
        let uncommented = contents
            .lines()
            .filter(|line| !line.starts_with("# #"))
            .filter_map(|line| line.strip_prefix("# "))
            .filter(|line| line.contains('='))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(
            toml::from_str::<Settings>(&uncommented).unwrap(),
            Settings::default()
        );
    }
}
