//! Eventloom CLI: submit community pages, get structured records back.
//!
//! Fetches a page, extracts an event or update record with a language
//! model, and appends the result to the configured tabular store.

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
