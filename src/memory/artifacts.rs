//! Read path for the files upstream collaborators leave in a memory's folder.
//!
//! Every signal is optional. A missing file, an unreadable file, or content
//! that does not match the expected schema all read as "empty" for that
//! signal; none of them is an error.

use std::path::Path;

use serde::Deserialize;

pub const CAPTIONS_FILE: &str = "captions.json";
pub const TRANSCRIPT_FILE: &str = "transcript.txt";
pub const FACES_FILE: &str = "faces.json";
pub const STORY_FILE: &str = "story.txt";

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Derived artifacts for a single memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryArtifacts {
    pub captions: Vec<String>,
    pub transcript: String,
    /// Non-empty face labels in source order.
    pub face_labels: Vec<String>,
    pub story: String,
}

/// One element of `faces.json`. Extra fields (bounding boxes, scores) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct FaceRecord {
    #[serde(default)]
    pub crop_file: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl MemoryArtifacts {
    /// Load all artifacts from a memory folder.
    pub fn load(folder: &Path) -> Self {
        let captions = read_json::<Vec<String>>(&folder.join(CAPTIONS_FILE)).unwrap_or_default();
        let face_labels = read_json::<Vec<FaceRecord>>(&folder.join(FACES_FILE))
            .map(|faces| labels_from_faces(&faces))
            .unwrap_or_default();

        Self {
            captions,
            transcript: read_text(&folder.join(TRANSCRIPT_FILE)),
            face_labels,
            story: read_text(&folder.join(STORY_FILE)),
        }
    }
}

/// Keep labels that are present and non-empty, in order.
pub fn labels_from_faces(faces: &[FaceRecord]) -> Vec<String> {
    faces
        .iter()
        .filter_map(|f| f.label.as_deref())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_text(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unreadable artifact, treating as empty");
            String::new()
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "unreadable artifact, treating as empty");
            }
            return None;
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "malformed artifact, treating as empty");
            None
        }
    }
}

/// Names of all memory folders under the media root, sorted.
pub fn list_memory_ids(media_root: &Path) -> std::io::Result<Vec<String>> {
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(media_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            ids.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    ids.sort();
    Ok(ids)
}

/// First image under `<memory>/images/` by file name, as a path relative to
/// the media root with `/` separators.
pub fn thumbnail(media_root: &Path, memory_id: &str) -> Option<String> {
    let images_dir = media_root.join(memory_id).join("images");
    let mut names: Vec<String> = std::fs::read_dir(&images_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| is_image(name))
        .collect();
    names.sort();
    names
        .into_iter()
        .next()
        .map(|name| format!("{memory_id}/images/{name}"))
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
