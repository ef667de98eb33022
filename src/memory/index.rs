//! Persistent vector index, one entry per memory id.
//!
//! Entries live in `memory_index` (vector blob, document, metadata, provider
//! tag) with person tags exploded into `memory_people`. Distances are exact
//! cosine distances computed by sqlite-vec's `vec_distance_cosine`.
//!
//! The first upsert into an empty collection fixes its dimensionality (kept in
//! `schema_meta`); every later vector must match it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::db::schema;
use crate::embedding::is_usable_vector;
use crate::error::{Error, Result};
use crate::memory::embedding_to_bytes;
use crate::memory::types::{EntryMetadata, IndexEntry};

const META_DIMENSIONS: &str = "dimensions";
const META_PROVIDER: &str = "provider";

/// Owned handle on the index database, safe to share between threads.
pub struct MemoryIndex {
    conn: Mutex<Connection>,
}

impl MemoryIndex {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (or create) the index file at `path`.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_database(path)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_memory_database()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    pub fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        document: &str,
        metadata: &EntryMetadata,
        provider: &str,
    ) -> Result<()> {
        upsert_entry(&mut *self.lock()?, id, embedding, document, metadata, provider)
    }

    pub fn query(
        &self,
        embedding: &[f32],
        k: usize,
        person: Option<&str>,
    ) -> Result<Vec<(String, f64)>> {
        query_entries(&*self.lock()?, embedding, k, person)
    }

    pub fn remove(&self, id: &str) -> Result<bool> {
        remove_entry(&mut *self.lock()?, id)
    }

    pub fn get(&self, id: &str) -> Result<Option<IndexEntry>> {
        get_entry(&*self.lock()?, id)
    }

    pub fn embedding(&self, id: &str) -> Result<Option<Vec<f32>>> {
        get_embedding(&*self.lock()?, id)
    }

    pub fn list(&self) -> Result<Vec<IndexEntry>> {
        list_entries(&*self.lock()?)
    }

    pub fn count(&self) -> Result<usize> {
        count_entries(&*self.lock()?)
    }

    /// Dimensionality of the collection, or `None` while it is empty.
    pub fn dimensions(&self) -> Result<Option<usize>> {
        collection_dimensions(&*self.lock()?)
    }

    /// Provider tag recorded when the collection was first written.
    pub fn provider(&self) -> Result<Option<String>> {
        Ok(schema::get_meta(&*self.lock()?, META_PROVIDER)?)
    }
}

/// Insert or replace the entry for `id`. Vector, document, metadata, and
/// provider tag are written in one transaction.
pub fn upsert_entry(
    conn: &mut Connection,
    id: &str,
    embedding: &[f32],
    document: &str,
    metadata: &EntryMetadata,
    provider: &str,
) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidInput("memory id must not be empty".into()));
    }
    if embedding.is_empty() {
        return Err(Error::InvalidInput("embedding must not be empty".into()));
    }
    ensure_usable(embedding)?;

    let tx = conn.transaction()?;

    // 1. Dimensionality gate
    match collection_dimensions(&tx)? {
        Some(expected) if expected != embedding.len() => {
            return Err(Error::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Some(_) => {}
        None => {
            schema::set_meta(&tx, META_DIMENSIONS, &embedding.len().to_string())?;
            schema::set_meta(&tx, META_PROVIDER, provider)?;
        }
    }

    // 2. Provider drift is recorded, not blocked
    if let Some(recorded) = schema::get_meta(&tx, META_PROVIDER)? {
        if recorded != provider {
            tracing::warn!(
                memory_id = %id,
                recorded = %recorded,
                provider = %provider,
                "upserting a vector from a different embedding provider; run `keepsake reindex` with one provider"
            );
        }
    }

    // 3. Row
    write_row(&tx, id, embedding, document, metadata, provider)?;

    // 4. Person tags
    replace_people(&tx, id, &metadata.people)?;

    tx.commit()?;
    tracing::debug!(memory_id = %id, dims = embedding.len(), "index entry upserted");
    Ok(())
}

fn write_row(
    tx: &Transaction,
    id: &str,
    embedding: &[f32],
    document: &str,
    metadata: &EntryMetadata,
    provider: &str,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO memory_index (id, embedding, dimensions, document, people, has_story, provider, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT(id) DO UPDATE SET \
             embedding = excluded.embedding, \
             dimensions = excluded.dimensions, \
             document = excluded.document, \
             people = excluded.people, \
             has_story = excluded.has_story, \
             provider = excluded.provider, \
             updated_at = excluded.updated_at",
        params![
            id,
            embedding_to_bytes(embedding),
            embedding.len() as i64,
            document,
            metadata.people_joined(),
            metadata.has_story,
            provider,
            now,
        ],
    )?;
    Ok(())
}

fn replace_people(tx: &Transaction, id: &str, people: &[String]) -> Result<()> {
    tx.execute("DELETE FROM memory_people WHERE memory_id = ?1", params![id])?;
    let mut stmt = tx.prepare(
        "INSERT INTO memory_people (memory_id, position, person) VALUES (?1, ?2, ?3)",
    )?;
    for (position, person) in people.iter().enumerate() {
        stmt.execute(params![id, position as i64, person])?;
    }
    Ok(())
}

// vec_distance_cosine yields NULL for these, which would fail the whole scan.
fn ensure_usable(embedding: &[f32]) -> Result<()> {
    if is_usable_vector(embedding) {
        Ok(())
    } else {
        Err(Error::InvalidInput(
            "embedding has zero norm or non-finite values".into(),
        ))
    }
}

/// Nearest entries to `embedding`, closest first, at most `k`.
///
/// With a non-blank `person`, only entries tagged with exactly that person are
/// candidates.
pub fn query_entries(
    conn: &Connection,
    embedding: &[f32],
    k: usize,
    person: Option<&str>,
) -> Result<Vec<(String, f64)>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    ensure_usable(embedding)?;
    let Some(expected) = collection_dimensions(conn)? else {
        return Ok(Vec::new());
    };
    if expected != embedding.len() {
        return Err(Error::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }

    let bytes = embedding_to_bytes(embedding);
    let person = person.map(str::trim).filter(|p| !p.is_empty());

    let results = match person {
        Some(person) => {
            let mut stmt = conn.prepare(
                "SELECT id, vec_distance_cosine(embedding, ?1) AS distance FROM memory_index \
                 WHERE id IN (SELECT memory_id FROM memory_people WHERE person = ?3) \
                 ORDER BY distance ASC, id ASC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![bytes, k as i64, person], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, vec_distance_cosine(embedding, ?1) AS distance FROM memory_index \
                 ORDER BY distance ASC, id ASC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![bytes, k as i64], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(results)
}

/// Delete the entry for `id`. Returns whether an entry existed.
pub fn remove_entry(conn: &mut Connection, id: &str) -> Result<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM memory_people WHERE memory_id = ?1", params![id])?;
    let removed = tx.execute("DELETE FROM memory_index WHERE id = ?1", params![id])? > 0;

    // An emptied collection may be re-established with another provider.
    let remaining: i64 = tx.query_row("SELECT COUNT(*) FROM memory_index", [], |r| r.get(0))?;
    if remaining == 0 {
        schema::clear_meta(&tx, META_DIMENSIONS)?;
        schema::clear_meta(&tx, META_PROVIDER)?;
    }

    tx.commit()?;
    Ok(removed)
}

pub fn get_entry(conn: &Connection, id: &str) -> Result<Option<IndexEntry>> {
    let entry = conn
        .query_row(
            "SELECT id, document, people, has_story, provider, dimensions, updated_at \
             FROM memory_index WHERE id = ?1",
            params![id],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// All entries ordered by id.
pub fn list_entries(conn: &Connection) -> Result<Vec<IndexEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, document, people, has_story, provider, dimensions, updated_at \
         FROM memory_index ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], row_to_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_embedding(conn: &Connection, id: &str) -> Result<Option<Vec<f32>>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT embedding FROM memory_index WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(blob.map(|b| super::bytes_to_embedding(&b)))
}

pub fn count_entries(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM memory_index", [], |r| r.get(0))?;
    Ok(count as usize)
}

pub fn collection_dimensions(conn: &Connection) -> Result<Option<usize>> {
    Ok(schema::get_meta(conn, META_DIMENSIONS)?.and_then(|v| v.parse().ok()))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexEntry> {
    Ok(IndexEntry {
        id: row.get(0)?,
        document: row.get(1)?,
        people: row.get(2)?,
        has_story: row.get(3)?,
        provider: row.get(4)?,
        dimensions: row.get::<_, i64>(5)? as usize,
        updated_at: row.get(6)?,
    })
}
