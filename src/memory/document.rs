//! Document synthesis: one retrievable text per memory.
//!
//! Clause order and truncation limits decide which signal dominates the
//! embedded text, so they are fixed:
//!
//! 1. `People in this memory: {people}.`
//! 2. `Images show: {first 6 captions joined by ". "}.`
//! 3. `Conversation/Audio: {first 300 chars of transcript}.`
//! 4. `Story summary: {first 500 chars of story}.`
//!
//! Clauses are joined by `\n` and only emitted when their source is
//! non-empty. With no clauses the text is [`FALLBACK_TEXT`].

use crate::memory::artifacts::MemoryArtifacts;
use crate::memory::types::{MemoryDocument, PEOPLE_SEPARATOR};

pub const MAX_CAPTIONS: usize = 6;
pub const TRANSCRIPT_CHARS: usize = 300;
pub const STORY_CHARS: usize = 500;
pub const FALLBACK_TEXT: &str = "This memory contains emotional value even with limited details.";

/// Compose the document for one memory. Pure: identical artifacts give
/// byte-identical text.
pub fn synthesize(artifacts: &MemoryArtifacts) -> MemoryDocument {
    let mut clauses: Vec<String> = Vec::with_capacity(4);

    if !artifacts.face_labels.is_empty() {
        clauses.push(format!(
            "People in this memory: {}.",
            artifacts.face_labels.join(PEOPLE_SEPARATOR)
        ));
    }
    if !artifacts.captions.is_empty() {
        let shown: Vec<&str> = artifacts
            .captions
            .iter()
            .take(MAX_CAPTIONS)
            .map(String::as_str)
            .collect();
        clauses.push(format!("Images show: {}.", shown.join(". ")));
    }
    if !artifacts.transcript.is_empty() {
        clauses.push(format!(
            "Conversation/Audio: {}.",
            truncate_chars(&artifacts.transcript, TRANSCRIPT_CHARS)
        ));
    }
    if !artifacts.story.is_empty() {
        clauses.push(format!(
            "Story summary: {}.",
            truncate_chars(&artifacts.story, STORY_CHARS)
        ));
    }

    let text = if clauses.is_empty() {
        FALLBACK_TEXT.to_string()
    } else {
        clauses.join("\n")
    };

    MemoryDocument {
        text,
        people: artifacts.face_labels.clone(),
        has_story: !artifacts.story.is_empty(),
    }
}

/// First `max_chars` Unicode scalar values of `s`.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
