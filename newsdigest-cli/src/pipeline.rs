//! One pipeline run: curate, wrap as a dated record, hand to the store.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use newsdigest_core::persistence::open_sink;
use newsdigest_core::{DigestConfig, DigestRecord};
use newsdigest_llm::CurationClient;

/// Per-run overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Replaces `curation.max_items` when set.
    pub max_items: Option<usize>,
    /// Skip the store.
    pub dry_run: bool,
    /// Extra JSON copy of the record.
    pub output: Option<PathBuf>,
}

/// Curate once and deliver the result.
///
/// With `dry_run` the record is not stored; it is printed to stdout unless
/// `output` names a file.
///
/// # Errors
///
/// Curation failures keep their [`newsdigest_llm::CurateError`] as the
/// source, so callers can recover the failure kind by downcasting.
pub async fn run_once(
    config: &DigestConfig,
    client: &CurationClient,
    options: &RunOptions,
) -> Result<DigestRecord> {
    let max_items = options.max_items.unwrap_or(config.curation.max_items);
    info!(
        max_items,
        directives = config.curation.directives.len(),
        model = client.model(),
        "Starting digest run"
    );

    let curated = match client.curate(&config.curation.directives, max_items).await {
        Ok(curated) => curated,
        Err(err) => {
            error!(
                kind = %err.kind(),
                attempts = err.attempts(),
                last_cause = %err.last_cause().map(ToString::to_string).unwrap_or_default(),
                "Digest run failed"
            );
            debug!(counters = ?client.counters().snapshot(), "Curation counters");
            return Err(anyhow::Error::new(err).context("curating today's digest"));
        }
    };

    let record = DigestRecord::new(curated.digest, curated.model, curated.attempts);
    info!(
        items = record.digest.len(),
        attempts = record.attempts,
        latency_ms = curated.latency_ms,
        top_story = record.digest.top_story().unwrap_or_default(),
        topics = %record.digest.all_topics().join(", "),
        "Digest curated"
    );
    debug!(counters = ?client.counters().snapshot(), "Curation counters");

    let json = render_json(&record)?;

    if let Some(path) = &options.output {
        std::fs::write(path, &json)
            .with_context(|| format!("writing digest to {}", path.display()))?;
        info!(path = %path.display(), "Digest written");
    } else if options.dry_run {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}").context("writing digest to stdout")?;
    }

    if options.dry_run {
        info!("Dry run: digest not stored");
    } else {
        let sink = open_sink(&config.persistence).context("opening digest store")?;
        let location = sink.publish(&record).context("storing digest")?;
        info!(location = %location, "Digest stored");
    }

    Ok(record)
}

/// Pretty JSON form of a record, as written by `--output` and `--dry-run`.
///
/// # Errors
///
/// Only if serialization fails, which a well-formed record never does.
pub fn render_json(record: &DigestRecord) -> Result<String> {
    serde_json::to_string_pretty(record).context("serializing digest")
}
