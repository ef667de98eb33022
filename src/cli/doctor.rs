//! CLI `doctor` command: run index diagnostics and print a health report.

use anyhow::{Context, Result};

use keepsake::config::KeepsakeConfig;
use keepsake::db;
use keepsake::embedding::{Backend, EmbeddingProvider, EmbeddingRouter};

/// Run index diagnostics and print a health report.
pub fn doctor(config: &KeepsakeConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Index: not found at {}", db_path.display());
        println!("Run `keepsake reindex` to build it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    let router = EmbeddingRouter::from_config(&config.embedding);
    let active_tag = router.model_id();
    let active_dims = router.dimensions();

    println!("keepsake Health Report");
    println!("======================");
    println!();
    println!("Index:             {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Media root:        {}", config.resolved_media_root().display());
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("Embedding provider:");
    println!("  Recorded:        {}", report.provider.as_deref().unwrap_or("(not set)"));
    println!("  Active:          {active_tag}");
    if router.backend() == Backend::Local && config.embedding.prefers_remote() {
        println!(
            "  Note:            {} is not set; using the local model",
            config.embedding.api_key_env
        );
    }
    match report.dimensions {
        Some(dims) if dims != active_dims => {
            println!("  WARNING: index holds {dims}-dim vectors but the active provider produces {active_dims}.");
            println!("  Searches will fail. Delete the index file and run `keepsake reindex`.");
        }
        Some(_) if report.provider.as_deref() != Some(active_tag.as_str()) => {
            println!("  WARNING: provider changed. Run `keepsake reindex` to refresh vectors.");
        }
        Some(_) => println!("  Status:          OK (match)"),
        None => println!("  Status:          empty index"),
    }
    println!();
    println!("Row counts:");
    println!("  Entries:         {}", report.entry_count);
    println!("  Person tags:     {}", report.people_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Delete {} (the index is derived data)", db_path.display());
        println!("  2. Run `keepsake reindex` to rebuild it from the media root");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
