use anyhow::Result;
use std::sync::Arc;

use keepsake::config::KeepsakeConfig;

/// Run a search from the terminal.
pub async fn search(
    config: &KeepsakeConfig,
    query: &str,
    k: usize,
    person: Option<&str>,
) -> Result<()> {
    let service = super::open_service(config)?;

    let query_text = query.to_string();
    let person_filter = person.map(str::to_string);
    let svc = Arc::clone(&service);
    let hits = tokio::task::spawn_blocking(move || {
        svc.search(&query_text, k, person_filter.as_deref())
    })
    .await??;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());

    for (i, hit) in hits.iter().enumerate() {
        println!("  {}. {} (score: {:.4})", i + 1, hit.memory_id, hit.score);
        if let Some(ref thumb) = hit.thumbnail {
            println!("     thumbnail: {thumb}");
        }
        if let Some(entry) = service.index().get(&hit.memory_id)? {
            if !entry.people.is_empty() {
                println!("     people: {}", entry.people);
            }
        }
        println!();
    }

    Ok(())
}
