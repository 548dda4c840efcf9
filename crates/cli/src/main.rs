//! # idsflow: International Debt Statistics Extractor
//!
//! Thin entrypoint for the `idsflow` command-line interface. All logic lives
//! in the `idsflow_cli` library crate.

use anyhow::Result;
use clap::Parser;
use idsflow_cli::{run, Cli};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load `.env` before anything reads the environment
    dotenvy::dotenv().ok();

    // 2. Setup logging
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("idsflow=info".parse()?))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 3. Parse CLI arguments
    let cli = Cli::parse();

    // 4. Run the command and report failures with their full context chain
    if let Err(e) = run(cli).await {
        eprintln!("[idsflow error] {e:?}");
        std::process::exit(1);
    }

    Ok(())
}
