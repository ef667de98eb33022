#![allow(dead_code)]

use keepsake::embedding::EmbeddingProvider;
use keepsake::memory::index::MemoryIndex;
use keepsake::memory::service::MemoryService;
use keepsake::{Error, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Words the test embedder gives their own dimension. Anything else only
/// counts when no vocabulary word is present.
const VOCAB: [&str; 12] = [
    "birthday", "lake", "mom", "dad", "office", "meeting", "notes", "house", "trip", "cake",
    "beach", "dog",
];

/// Deterministic bag-of-words embedder: one dimension per vocabulary word
/// plus an "other" bucket, L2-normalized.
pub struct VocabEmbedder {
    calls: AtomicUsize,
    fail_on: Option<String>,
}

impl VocabEmbedder {
    pub const DIMENSIONS: usize = VOCAB.len() + 1;
    pub const MODEL_ID: &'static str = "test:vocab";

    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: None,
        }
    }

    /// Fails any text containing `marker`, like a remote call rejecting one
    /// document.
    pub fn failing_on(marker: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(marker.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for VocabEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_on {
            if text.contains(marker.as_str()) {
                return Err(Error::Provider(format!("refused text containing {marker}")));
            }
        }
        Ok(vocab_vector(text))
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    fn model_id(&self) -> String {
        Self::MODEL_ID.to_string()
    }
}

pub fn vocab_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; VocabEmbedder::DIMENSIONS];
    let lower = text.to_lowercase();
    for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        if let Some(pos) = VOCAB.iter().position(|w| *w == word) {
            v[pos] += 1.0;
        }
    }
    if v.iter().all(|x| *x == 0.0) {
        v[VOCAB.len()] = 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

/// Always returns the same vector of a chosen size, tagged as another model.
pub struct FixedEmbedder {
    pub dims: usize,
}

impl EmbeddingProvider for FixedEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        v[0] = 1.0;
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_id(&self) -> String {
        format!("test:fixed-{}", self.dims)
    }
}

/// Artifact contents for one memory folder. Empty fields are not written.
#[derive(Default)]
pub struct MemoryFixture<'a> {
    pub captions: &'a [&'a str],
    pub transcript: Option<&'a str>,
    /// Face labels; each becomes a tagged face record.
    pub faces: &'a [&'a str],
    pub story: Option<&'a str>,
    /// File names created (empty) under `images/`.
    pub images: &'a [&'a str],
}

/// Create `media_root/id` and write the fixture's artifact files into it.
pub fn write_memory(media_root: &Path, id: &str, fixture: MemoryFixture<'_>) {
    let folder = media_root.join(id);
    std::fs::create_dir_all(&folder).unwrap();

    if !fixture.captions.is_empty() {
        std::fs::write(
            folder.join("captions.json"),
            serde_json::to_string(fixture.captions).unwrap(),
        )
        .unwrap();
    }
    if let Some(transcript) = fixture.transcript {
        std::fs::write(folder.join("transcript.txt"), transcript).unwrap();
    }
    if !fixture.faces.is_empty() {
        let faces: Vec<serde_json::Value> = fixture
            .faces
            .iter()
            .enumerate()
            .map(|(i, label)| serde_json::json!({ "crop_file": format!("face_{i}.jpg"), "label": label }))
            .collect();
        std::fs::write(folder.join("faces.json"), serde_json::to_string(&faces).unwrap()).unwrap();
    }
    if let Some(story) = fixture.story {
        std::fs::write(folder.join("story.txt"), story).unwrap();
    }
    if !fixture.images.is_empty() {
        let images = folder.join("images");
        std::fs::create_dir_all(&images).unwrap();
        for name in fixture.images {
            std::fs::write(images.join(name), b"").unwrap();
        }
    }
}

/// Service over an in-memory index.
pub fn test_service(media_root: &Path, embedder: Arc<dyn EmbeddingProvider>) -> MemoryService {
    MemoryService::new(MemoryIndex::open_in_memory().unwrap(), embedder, media_root)
}

/// The three-memory archive used by the search scenarios.
pub fn write_lake_archive(media_root: &Path) {
    write_memory(
        media_root,
        "lake_birthday",
        MemoryFixture {
            captions: &["a birthday cake on a picnic table", "kids swimming in the lake"],
            faces: &["Mom"],
            story: Some("We celebrated a birthday at the lake"),
            images: &["b.jpg", "a.jpg"],
            ..Default::default()
        },
    );
    write_memory(
        media_root,
        "office_notes",
        MemoryFixture {
            captions: &["a whiteboard covered in office meeting notes"],
            transcript: Some("let's go over the meeting notes from last week"),
            ..Default::default()
        },
    );
    write_memory(
        media_root,
        "lake_house",
        MemoryFixture {
            captions: &["Mom's lake house at sunset"],
            faces: &["Mom", "Dad"],
            story: Some("A weekend trip to Mom's lake house"),
            ..Default::default()
        },
    );
}
