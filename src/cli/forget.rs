use anyhow::{Context, Result};

use keepsake::config::KeepsakeConfig;
use keepsake::memory::index::MemoryIndex;

/// Remove a memory's index entry. The memory folder itself is left alone.
pub fn forget(config: &KeepsakeConfig, memory_id: &str) -> Result<()> {
    let index = MemoryIndex::open(config.resolved_db_path()).context("failed to open index")?;

    if index.remove(memory_id)? {
        println!("Removed {memory_id} from the index.");
    } else {
        println!("{memory_id} was not indexed.");
    }
    Ok(())
}
