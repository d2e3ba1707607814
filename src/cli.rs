//! The command line interface for the program.
use crate::category::CategoryRegistry;
use crate::feed::{FeedPayload, fetch};
use crate::log;
use crate::pipeline::{RunOutcome, process_payload};
use crate::row::RowShaper;
use crate::settings::Settings;
use crate::time::SampleTime;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the program.
///
/// With no command, samples the feed once using the program settings.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Path to the history table
    #[arg(long)]
    pub history: Option<PathBuf>,
    /// URL of the generation feed
    #[arg(long)]
    pub feed_url: Option<String>,
    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Don't record each category's share of total output
    #[arg(long)]
    pub no_shares: bool,
}

impl RunOpts {
    /// Override settings with any options given on the command line
    fn apply(&self, settings: &mut Settings) {
        if let Some(history) = &self.history {
            settings.history_path.clone_from(history);
        }
        if let Some(feed_url) = &self.feed_url {
            settings.feed_url.clone_from(feed_url);
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        if self.no_shares {
            settings.include_shares = false;
        }
    }
}

/// Options for the parse command
#[derive(Args)]
pub struct ParseOpts {
    /// Path to the history table
    #[arg(long)]
    pub history: Option<PathBuf>,
    /// The time to record the sample at (YYYY-MM-DD HH:MM). Defaults to now.
    #[arg(long)]
    pub timestamp: Option<SampleTime>,
    /// Don't record each category's share of total output
    #[arg(long)]
    pub no_shares: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Sample the generation feed and record it in the history table.
    Run {
        /// Run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Record a payload previously saved to a file, instead of fetching it.
    Parse {
        /// Path to the JSON payload
        payload_path: PathBuf,
        /// Other options
        #[command(flatten)]
        opts: ParseOpts,
    },
    /// Print the categories in use, with their carbon factors and groups.
    Categories,
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { opts } => handle_run_command(&opts, None),
            Self::Parse { payload_path, opts } => {
                handle_parse_command(&payload_path, &opts, None)
            }
            Self::Categories => handle_categories_command(None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ gridcarbon --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    // With no command, take a single sample
    cli.command
        .unwrap_or(Commands::Run {
            opts: RunOpts::default(),
        })
        .execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Initialise the program logger and load the categories to use
fn prepare(settings: &Settings) -> Result<CategoryRegistry> {
    log::init(Some(&settings.log_level), settings.log_dir.as_deref())
        .context("Failed to initialise logging.")?;

    let registry = settings
        .category_registry()
        .context("Failed to load categories.")?;
    info!("Using {} categories", registry.len());

    Ok(registry)
}

/// Merge a payload into the history table
fn record_payload(
    payload: &FeedPayload,
    timestamp: SampleTime,
    registry: &CategoryRegistry,
    settings: &Settings,
) -> Result<()> {
    let shaper = RowShaper::new(settings.include_shares);
    match process_payload(
        payload,
        timestamp,
        registry,
        shaper,
        &settings.history_path,
    )? {
        RunOutcome::Merged(_) => info!("Sampling complete!"),
        RunOutcome::Skipped { .. } => info!("Nothing recorded"),
    }

    Ok(())
}

/// Handle the `run` command.
pub fn handle_run_command(opts: &RunOpts, settings: Option<Settings>) -> Result<()> {
    let mut settings = load_settings(settings)?;
    opts.apply(&mut settings);
    let registry = prepare(&settings)?;

    // The sample is keyed by when we asked for it
    let timestamp = SampleTime::now();
    info!("Fetching {}", settings.feed_url);
    let payload = fetch(&settings.feed_url, settings.timeout())?;

    record_payload(&payload, timestamp, &registry, &settings)
}

/// Handle the `parse` command.
pub fn handle_parse_command(
    payload_path: &Path,
    opts: &ParseOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;
    if let Some(history) = &opts.history {
        settings.history_path.clone_from(history);
    }
    if opts.no_shares {
        settings.include_shares = false;
    }
    let registry = prepare(&settings)?;

    let timestamp = opts.timestamp.unwrap_or_else(SampleTime::now);
    let payload = FeedPayload::from_path(payload_path)?;
    info!("Loaded payload from {}", payload_path.display());

    record_payload(&payload, timestamp, &registry, &settings)
}

/// Handle the `categories` command.
pub fn handle_categories_command(settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    let registry = settings
        .category_registry()
        .context("Failed to load categories.")?;
    for category in registry.iter() {
        println!("{category}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_options() {
        let cli = Cli::try_parse_from([
            "gridcarbon",
            "run",
            "--history",
            "out.csv",
            "--timeout",
            "5",
            "--no-shares",
        ])
        .unwrap();
        let Some(Commands::Run { opts }) = cli.command else {
            panic!("Expected run command");
        };

        let mut settings = Settings::default();
        opts.apply(&mut settings);
        assert_eq!(settings.history_path, PathBuf::from("out.csv"));
        assert_eq!(settings.timeout_secs, 5);
        assert!(!settings.include_shares);
        assert_eq!(settings.feed_url, Settings::default().feed_url);
    }

    #[test]
    fn test_parse_no_command() {
        let cli = Cli::try_parse_from(["gridcarbon"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_bad_timestamp() {
        assert!(
            Cli::try_parse_from(["gridcarbon", "parse", "x.json", "--timestamp", "noon"]).is_err()
        );
    }

    #[test]
    fn test_handle_categories_command() {
        handle_categories_command(Some(Settings::default())).unwrap();
    }
}
