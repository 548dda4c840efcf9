//! # Application Configuration
//!
//! Loads the `idsflow` settings in layers, each overriding the one before:
//!
//! 1. built-in defaults, including the bilateral debt series table;
//! 2. a YAML file (`idsflow.yml` in the working directory, or `--config`);
//! 3. `IDSFLOW_`-prefixed environment variables, nested with `__`
//!    (e.g. `IDSFLOW_REQUEST_TIMEOUT_SECS=30`).
//!
//! Command-line flags are applied on top by the command handlers.

use config::{Config as ConfigBuilder, Environment, File, FileFormat, Map, Value as ConfigValue};
use idsflow::constants::{
    BULK_PAGE_SIZE, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR,
    DEFAULT_REQUEST_TIMEOUT_SECS, IDS_SOURCE_ID,
};
use idsflow::{Concept, DuplicatePolicy, FailurePolicy, SeriesSpec};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// The file looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "idsflow.yml";

/// The default series table: bilateral public and publicly guaranteed debt.
pub const DEFAULT_SERIES: [(&str, &str); 4] = [
    ("debt_stock", "DT.DOD.BLAT.CD"),
    ("disbursements", "DT.DIS.BLAT.CD"),
    ("principal_repayments", "DT.AMT.BLAT.CD"),
    ("interest_payments", "DT.INT.BLAT.CD"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(#[from] config::ConfigError),
    #[error("Config file not found at '{}'", .0.display())]
    NotFound(PathBuf),
}

/// Layout of the consolidated dataset on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One column per year.
    #[default]
    Wide,
    /// One row per observation.
    Long,
}

/// The fully resolved configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub source_id: String,
    pub request_timeout_secs: u64,
    /// Maximum number of series in flight.
    pub concurrency: usize,
    pub bulk_page_size: u32,
    pub failure_policy: FailurePolicy,
    pub duplicate_policy: DuplicatePolicy,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub series: Vec<SeriesSpec>,
    /// Concepts resolved by `idsflow metadata` when none are named.
    pub concepts: Vec<String>,
}

impl AppConfig {
    pub fn concepts(&self) -> Vec<Concept> {
        self.concepts
            .iter()
            .filter_map(|c| c.parse::<Concept>().ok())
            .collect()
    }
}

fn default_series() -> Vec<ConfigValue> {
    DEFAULT_SERIES
        .iter()
        .map(|(short_name, api_code)| {
            let mut table = Map::new();
            table.insert("short_name".to_string(), ConfigValue::from(*short_name));
            table.insert("api_code".to_string(), ConfigValue::from(*api_code));
            ConfigValue::from(table)
        })
        .collect()
}

fn default_concepts() -> Vec<ConfigValue> {
    Concept::KNOWN
        .iter()
        .map(|c| ConfigValue::from(c.as_str()))
        .collect()
}

/// Loads the configuration, reading `config_path_override` instead of
/// `idsflow.yml` when given. An explicit path must exist; the default file is
/// optional.
pub fn get_config(config_path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        // Layer 1: built-in defaults.
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("source_id", IDS_SOURCE_ID)?
        .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
        .set_default("concurrency", DEFAULT_CONCURRENCY as i64)?
        .set_default("bulk_page_size", i64::from(BULK_PAGE_SIZE))?
        .set_default("failure_policy", "abort")?
        .set_default("duplicate_policy", "error")?
        .set_default("output_dir", DEFAULT_OUTPUT_DIR)?
        .set_default("format", "wide")?
        .set_default("series", default_series())?
        .set_default("concepts", default_concepts())?;

    // Layer 2: YAML file.
    match config_path_override {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            info!("Loading configuration from '{}'.", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                info!("Loading configuration from '{DEFAULT_CONFIG_FILE}'.");
            }
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Yaml)
                    .required(false),
            );
        }
    }

    // Layer 3: prefixed environment variables.
    let settings = builder
        .add_source(
            Environment::with_prefix("IDSFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("concepts"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
