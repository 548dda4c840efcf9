//! # `idsflow` Library Crate
//!
//! Command definitions and handlers for the `idsflow` CLI, which pulls
//! bilateral external-debt series from International Debt Statistics and
//! writes them to CSV.

pub mod config;

use crate::config::{get_config, AppConfig, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use idsflow::constants::{LAST_UPDATED_FILE, LONG_DATASET_FILE, METADATA_DIR, WIDE_DATASET_FILE};
use idsflow::metadata::fetch_all_metadata;
use idsflow::persist::{
    read_wide_csv, write_last_updated_csv, write_long_csv, write_metadata_csv, write_wide_csv,
};
use idsflow::{
    pivot_long, pivot_wide, ApiEndpoint, Concept, FailurePolicy, IdsClient, Pipeline,
    PipelineOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// --- CLI Argument Structs ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every configured series and write the consolidated dataset
    Run(RunArgs),
    /// Download the lookup table of one or more concepts
    Metadata(MetadataArgs),
    /// Reshape a persisted wide CSV back into the long layout
    PivotLong(PivotLongArgs),
    /// Print the bulk URL of every configured series
    Urls(UrlsArgs),
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to a YAML config file. Defaults to `./idsflow.yml` if present.
    #[arg(long, env = "IDSFLOW_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Directory the dataset and last-updated report are written to.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Layout of the dataset file.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Keep going when a series fails and report it at the end.
    #[arg(long)]
    pub continue_on_error: bool,
}

#[derive(Args, Debug)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// A concept to resolve, e.g. `country`. Repeatable. Defaults to the configured list.
    #[arg(long = "concept")]
    pub concepts: Vec<String>,
    /// Directory the `metadata/` lookups are written under.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PivotLongArgs {
    /// The wide CSV to read.
    pub wide_csv: PathBuf,
    /// Where to write the long CSV.
    pub long_csv: PathBuf,
}

#[derive(Args, Debug)]
pub struct UrlsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

// --- Public Entrypoint ---

/// The main entry point for the `idsflow` library.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::Metadata(args) => handle_metadata(args).await,
        Commands::PivotLong(args) => handle_pivot_long(args),
        Commands::Urls(args) => handle_urls(args),
    }
}

// --- Command Handlers ---

fn load_config(args: &ConfigArgs) -> Result<AppConfig> {
    get_config(args.config.as_deref()).context("Failed to load configuration")
}

fn build_client(config: &AppConfig) -> Result<IdsClient> {
    IdsClient::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

fn endpoint(config: &AppConfig) -> ApiEndpoint {
    ApiEndpoint::new(&config.base_url).with_source_id(&config.source_id)
}

/// Resolves when Ctrl-C is pressed. Never resolves if the signal handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Handles `idsflow run`.
async fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }
    info!("Starting 'run' command with config: {:?}", config);

    let pipeline = Pipeline::new(Arc::new(build_client(&config)?))
        .with_endpoint(endpoint(&config))
        .with_options(PipelineOptions {
            concurrency: config.concurrency,
            bulk_page_size: config.bulk_page_size,
            failure_policy: config.failure_policy,
        });

    println!("Fetching {} series...", config.series.len());
    let output = pipeline
        .run_until(&config.series, ctrl_c())
        .await
        .context("Pipeline run failed")?;

    let dataset_path = match config.format {
        OutputFormat::Wide => {
            let path = config.output_dir.join(WIDE_DATASET_FILE);
            let wide = pivot_wide(&output.dataset, config.duplicate_policy)
                .context("Failed to pivot the dataset to wide format")?;
            write_wide_csv(&wide, &path)?;
            path
        }
        OutputFormat::Long => {
            let path = config.output_dir.join(LONG_DATASET_FILE);
            write_long_csv(&output.dataset, &path)?;
            path
        }
    };
    let updated_path = config.output_dir.join(LAST_UPDATED_FILE);
    write_last_updated_csv(&output.last_updated, &updated_path)?;

    println!(
        "Wrote {} observations to '{}'.",
        output.dataset.len(),
        dataset_path.display()
    );
    println!("Wrote last-updated dates to '{}'.", updated_path.display());

    if !output.failures.is_empty() {
        eprintln!("{} series failed:", output.failures.len());
        for failure in &output.failures {
            eprintln!("  - {}: {}", failure.short_name, failure.error);
        }
    }
    Ok(())
}

/// Handles `idsflow metadata`.
async fn handle_metadata(args: MetadataArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    let concepts: Vec<Concept> = if args.concepts.is_empty() {
        config.concepts()
    } else {
        args.concepts
            .iter()
            .filter_map(|c| c.parse::<Concept>().ok())
            .collect()
    };

    let client = build_client(&config)?;
    let resolved = fetch_all_metadata(&client, &endpoint(&config), &concepts)
        .await
        .context("Failed to fetch concept metadata")?;

    let dir = config.output_dir.join(METADATA_DIR);
    for (concept, entries) in resolved {
        let path = dir.join(format!("{}.csv", concept.as_str()));
        write_metadata_csv(&entries, &path)?;
        println!(
            "Wrote {} '{concept}' entries to '{}'.",
            entries.len(),
            path.display()
        );
    }
    Ok(())
}

/// Handles `idsflow pivot-long`.
fn handle_pivot_long(args: PivotLongArgs) -> Result<()> {
    let wide = read_wide_csv(&args.wide_csv)
        .with_context(|| format!("Failed to read '{}'", args.wide_csv.display()))?;
    let long = pivot_long(&wide);
    write_long_csv(&long, &args.long_csv)?;
    println!(
        "Wrote {} observations to '{}'.",
        long.len(),
        args.long_csv.display()
    );
    Ok(())
}

/// Handles `idsflow urls`.
fn handle_urls(args: UrlsArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let endpoint = endpoint(&config);
    for spec in &config.series {
        println!(
            "{}\t{}",
            spec.short_name,
            endpoint.bulk_query_url(&spec.api_code, config.bulk_page_size)
        );
    }
    Ok(())
}
