//! Command-line interface definition and dispatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use newsdigest_core::{Credentials, DigestConfig};
use newsdigest_llm::CurationClient;

use crate::logging;
use crate::pipeline::{self, RunOptions};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "newsdigest.toml";

/// Top-level CLI structure.
#[derive(Debug, Parser)]
#[command(name = "newsdigest", version, about = "Curate a daily AI news digest")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, env = "NEWSDIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Curate today's digest and store it
    Run {
        /// Override `curation.max_items`
        #[arg(long)]
        max_items: Option<usize>,
        /// Do not store; print the digest JSON instead
        #[arg(long)]
        dry_run: bool,
        /// Also write the digest JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate config and credentials without calling the model
    CheckConfig,
}

/// Load the config named on the command line, or the default file if it
/// exists, or built-in defaults. The result is validated.
///
/// # Errors
///
/// Fails if an explicitly named file cannot be read, or on invalid values.
pub fn load_config(path: Option<&Path>) -> Result<DigestConfig> {
    let config = match path {
        Some(path) => DigestConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            DigestConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("loading config from {DEFAULT_CONFIG_FILE}"))?
        }
        None => DigestConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Dispatch the parsed command.
///
/// # Errors
///
/// Any configuration, curation or storage failure; the process exits non-zero.
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    logging::init(&config.general)?;

    match cli.command {
        Commands::Run {
            max_items,
            dry_run,
            output,
        } => {
            let credentials =
                Credentials::from_env(&config).context("reading API credentials")?;
            let client = CurationClient::new(&config, credentials);
            let options = RunOptions {
                max_items,
                dry_run,
                output,
            };
            let record = pipeline::run_once(&config, &client, &options).await?;
            info!(
                date = %record.date,
                items = record.digest.len(),
                attempts = record.attempts,
                "Digest run complete"
            );
            Ok(())
        }
        Commands::CheckConfig => {
            Credentials::from_env(&config).context("reading API credentials")?;
            println!("{}", describe(&config));
            Ok(())
        }
    }
}

/// One-screen summary of the effective configuration. Credentials are not
/// included.
#[must_use]
pub fn describe(config: &DigestConfig) -> String {
    let directives = config
        .curation
        .directives
        .iter()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!("    - {d}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "configuration OK\n  endpoint:    {}\n  model:       {}\n  search tool: {} via {}\n  window:      {} day(s), {} results per search\n  max items:   {}\n  attempts:    {}\n  store:       {} at {}\n  directives:\n{directives}",
        config.llm.endpoint,
        config.llm.model,
        config.search.tool_name,
        config.search.server_label,
        config.search.days,
        config.search.max_results,
        config.curation.max_items,
        config.retry.max_attempts,
        config.persistence.backend,
        config.persistence.path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "newsdigest",
            "run",
            "--max-items",
            "5",
            "--dry-run",
            "--output",
            "out.json",
        ])
        .expect("parse");
        match cli.command {
            Commands::Run {
                max_items,
                dry_run,
                output,
            } => {
                assert_eq!(max_items, Some(5));
                assert!(dry_run);
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            Commands::CheckConfig => panic!("expected run"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["newsdigest", "check-config", "--config", "x.toml"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::CheckConfig));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["newsdigest"]).is_err());
    }

    #[test]
    fn explicit_config_file_is_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[curation]\nmax_items = 0\n").expect("write");
        let err = load_config(Some(path.as_path())).expect_err("should fail");
        assert!(format!("{err:#}").contains("max_items"));

        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(missing.as_path())).is_err());
    }

    #[test]
    fn describe_omits_credentials() {
        let text = describe(&DigestConfig::default());
        assert!(text.contains("openai/gpt-oss-120b"));
        assert!(text.contains("tavily_search via tavily"));
        assert!(!text.contains("{api_key}"));
    }
}
