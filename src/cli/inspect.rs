//! CLI `inspect` command: list index entries, or show one in full.

use anyhow::{Context, Result};

use keepsake::config::KeepsakeConfig;
use keepsake::memory::index::MemoryIndex;

const SNIPPET_CHARS: usize = 200;

/// Without an id, print one block per entry. With an id, print everything
/// stored for it.
pub fn inspect(config: &KeepsakeConfig, memory_id: Option<&str>) -> Result<()> {
    let index = MemoryIndex::open(config.resolved_db_path()).context("failed to open index")?;

    match memory_id {
        Some(id) => inspect_one(&index, id),
        None => list_all(&index),
    }
}

fn list_all(index: &MemoryIndex) -> Result<()> {
    let entries = index.list()?;
    println!("Total indexed memories: {}", entries.len());
    if let Some(dims) = index.dimensions()? {
        println!(
            "Dimensions: {dims} (provider {})",
            index.provider()?.as_deref().unwrap_or("unknown")
        );
    }
    println!();

    for entry in &entries {
        println!("ID:        {}", entry.id);
        println!("PEOPLE:    {}", entry.people);
        println!("HAS STORY: {}", entry.has_story);
        println!("DOCUMENT:  {}", snippet(&entry.document));
        println!("{}", "-".repeat(50));
    }
    Ok(())
}

fn inspect_one(index: &MemoryIndex, id: &str) -> Result<()> {
    let Some(entry) = index.get(id)? else {
        anyhow::bail!("memory not indexed: {id}");
    };

    println!("Memory: {}", entry.id);
    println!("{}", "=".repeat(50));
    println!("  People:      {}", if entry.people.is_empty() { "(none)" } else { entry.people.as_str() });
    println!("  Has story:   {}", entry.has_story);
    println!("  Provider:    {}", entry.provider);
    println!("  Dimensions:  {}", entry.dimensions);
    println!("  Updated:     {}", entry.updated_at);
    println!();
    println!("Document:");
    for line in entry.document.lines() {
        println!("  {line}");
    }
    Ok(())
}

fn snippet(text: &str) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
