//! Core type definitions for indexing and search.
//!
//! Defines [`MemoryDocument`] (the synthesized text for one memory),
//! [`EntryMetadata`] (structured fields stored next to the vector),
//! [`IndexEntry`] (a persisted row), and [`SearchHit`] (a ranked result).

use serde::{Deserialize, Serialize};

/// Separator used when flattening the people list into the stored metadata string.
pub const PEOPLE_SEPARATOR: &str = ", ";

/// The retrievable document derived from one memory's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryDocument {
    /// Newline-joined clauses; never empty.
    pub text: String,
    /// Face labels in source order, duplicates kept.
    pub people: Vec<String>,
    pub has_story: bool,
}

impl MemoryDocument {
    pub fn metadata(&self) -> EntryMetadata {
        EntryMetadata {
            people: self.people.clone(),
            has_story: self.has_story,
        }
    }
}

/// Metadata stored with each index entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub people: Vec<String>,
    pub has_story: bool,
}

impl EntryMetadata {
    /// Comma-joined people string, as stored in the `people` column.
    pub fn people_joined(&self) -> String {
        self.people.join(PEOPLE_SEPARATOR)
    }
}

/// A persisted index row, without its vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub id: String,
    pub document: String,
    /// Comma-joined people list.
    pub people: String,
    pub has_story: bool,
    /// Tag of the embedding backend that produced the vector.
    pub provider: String,
    pub dimensions: usize,
    /// RFC 3339 timestamp of the last upsert.
    pub updated_at: String,
}

/// One ranked search result. `score = 1 - cosine distance`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub memory_id: String,
    pub score: f64,
    /// First image of the memory, relative to the media root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}
