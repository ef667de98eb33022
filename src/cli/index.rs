//! CLI `index`, `reembed`, and `reindex` commands.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use keepsake::config::KeepsakeConfig;
use keepsake::memory::artifacts;
use keepsake::memory::service::IndexAttempt;

/// Index (or force re-embed) a single memory folder.
pub async fn index(config: &KeepsakeConfig, memory_id: &str, force: bool) -> Result<()> {
    let service = super::open_service(config)?;

    let id = memory_id.to_string();
    let svc = Arc::clone(&service);
    let outcome = tokio::task::spawn_blocking(move || {
        if force {
            svc.reembed_memory(&id)
        } else {
            svc.index_memory(&id)
        }
    })
    .await?
    .with_context(|| format!("failed to index memory {memory_id}"))?;

    println!(
        "Indexed {} ({} dims, provider {})",
        outcome.memory_id, outcome.dimensions, outcome.provider
    );
    if !outcome.people.is_empty() {
        println!("  People: {}", outcome.people.join(", "));
    }
    println!("  Story:  {}", if outcome.has_story { "yes" } else { "no" });
    Ok(())
}

/// Re-index every memory folder under the media root. Failures are reported
/// and skipped.
pub async fn reindex(config: &KeepsakeConfig) -> Result<()> {
    let service = super::open_service(config)?;

    let total = artifacts::list_memory_ids(service.media_root())
        .with_context(|| format!("failed to read media root {}", service.media_root().display()))?
        .len();

    if total == 0 {
        println!("No memories found under {}.", service.media_root().display());
        return Ok(());
    }

    println!("Reindexing {total} memories...");

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let svc = Arc::clone(&service);
    let progress = pb.clone();
    let report = tokio::task::spawn_blocking(move || {
        svc.reindex_all_with(|id, attempt| {
            if let IndexAttempt::Failed { reason, .. } = attempt {
                progress.println(format!("[SKIP] {id}: {reason}"));
            }
            progress.set_message(id.to_string());
            progress.inc(1);
        })
    })
    .await?
    .context("reindex failed")?;

    pb.finish_and_clear();

    println!(
        "Reindexed {} memories, skipped {}.",
        report.indexed.len(),
        report.skipped.len()
    );
    Ok(())
}
