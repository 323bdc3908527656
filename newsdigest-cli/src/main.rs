//! Entry point for `newsdigest`.
//!
//! Loads `.env` (ignored if absent), parses arguments and runs the chosen
//! subcommand. Any terminal failure exits non-zero.

use anyhow::Result;
use clap::Parser;

use newsdigest_cli::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    cli::run(Cli::parse()).await
}
