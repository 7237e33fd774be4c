//! ClauseForge CLI — contract clause analysis pipeline.
//!
//! Ingests raw contract documents, extracts and classifies clauses through a
//! delegated completion service, and manages the candidate → standard clause
//! review lifecycle.

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
