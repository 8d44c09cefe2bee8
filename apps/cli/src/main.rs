//! Veglytics CLI: commodity price extraction from daily market bulletins.
//!
//! Downloads the published bulletin PDFs, extracts vegetable prices per
//! market into a local database, and answers price and trend queries.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
