mod helpers;

use helpers::{vocab_vector, write_lake_archive, FixedEmbedder, VocabEmbedder};
use keepsake::memory::index::MemoryIndex;
use keepsake::memory::service::MemoryService;
use keepsake::memory::types::EntryMetadata;
use keepsake::Error;
use std::sync::Arc;
use tempfile::TempDir;

fn open_service(tmp: &TempDir, embedder: Arc<dyn keepsake::embedding::EmbeddingProvider>) -> MemoryService {
    let index = MemoryIndex::open(tmp.path().join("db").join("index.db")).unwrap();
    MemoryService::new(index, embedder, tmp.path().join("memories"))
}

#[test]
fn entries_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    write_lake_archive(&tmp.path().join("memories"));

    let before = {
        let service = open_service(&tmp, Arc::new(VocabEmbedder::new()));
        service.reindex_all().unwrap();
        service.search("birthday at the lake", 3, None).unwrap()
    };

    let embedder = Arc::new(VocabEmbedder::new());
    let service = open_service(&tmp, embedder.clone());
    assert_eq!(service.index().count().unwrap(), 3);
    assert_eq!(service.index().dimensions().unwrap(), Some(VocabEmbedder::DIMENSIONS));
    assert_eq!(service.index().provider().unwrap().as_deref(), Some(VocabEmbedder::MODEL_ID));

    let after = service.search("birthday at the lake", 3, None).unwrap();
    assert_eq!(after, before);
    assert_eq!(embedder.calls(), 1, "only the query is embedded after reopen");

    let entry = service.index().get("lake_house").unwrap().unwrap();
    assert_eq!(entry.people, "Mom, Dad");
    assert!(entry.has_story);
}

#[test]
fn person_tags_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    write_lake_archive(&tmp.path().join("memories"));
    {
        let service = open_service(&tmp, Arc::new(VocabEmbedder::new()));
        service.reindex_all().unwrap();
    }

    let service = open_service(&tmp, Arc::new(VocabEmbedder::new()));
    let hits = service.search("lake", 5, Some("Dad")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory_id, "lake_house");
}

#[test]
fn switching_provider_dimensionality_is_rejected() {
    let tmp = TempDir::new().unwrap();
    write_lake_archive(&tmp.path().join("memories"));
    {
        let service = open_service(&tmp, Arc::new(VocabEmbedder::new()));
        service.index_memory("lake_house").unwrap();
    }

    let service = open_service(&tmp, Arc::new(FixedEmbedder { dims: 4 }));

    let err = service.index_memory("lake_birthday").unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { actual: 4, .. }));

    let err = service.search("lake", 3, None).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { actual: 4, .. }));

    // The rejected write left the collection untouched
    assert_eq!(service.index().count().unwrap(), 1);
    assert_eq!(service.index().dimensions().unwrap(), Some(VocabEmbedder::DIMENSIONS));
}

#[test]
fn same_dimensionality_from_another_provider_is_accepted_and_tagged() {
    let tmp = TempDir::new().unwrap();
    write_lake_archive(&tmp.path().join("memories"));
    {
        let service = open_service(&tmp, Arc::new(VocabEmbedder::new()));
        service.index_memory("lake_house").unwrap();
    }

    let service = open_service(&tmp, Arc::new(FixedEmbedder { dims: VocabEmbedder::DIMENSIONS }));
    service.index_memory("office_notes").unwrap();

    let entry = service.index().get("office_notes").unwrap().unwrap();
    assert_eq!(entry.provider, format!("test:fixed-{}", VocabEmbedder::DIMENSIONS));
    // The collection keeps the provider that created it
    assert_eq!(service.index().provider().unwrap().as_deref(), Some(VocabEmbedder::MODEL_ID));
}

#[test]
fn concurrent_upserts_and_queries_share_one_index() {
    const WRITERS: usize = 8;
    let tmp = TempDir::new().unwrap();
    let index = MemoryIndex::open(tmp.path().join("index.db")).unwrap();
    let mom = EntryMetadata {
        people: vec!["Mom".into()],
        has_story: false,
    };
    index
        .upsert("shared", &vocab_vector("lake"), "seed", &mom, VocabEmbedder::MODEL_ID)
        .unwrap();

    let query_errors = std::thread::scope(|s| {
        for n in 0..WRITERS {
            let index = &index;
            let mom = &mom;
            s.spawn(move || {
                let text = if n % 2 == 0 { "birthday at the lake" } else { "office meeting" };
                for _ in 0..5 {
                    index
                        .upsert(&format!("m{n}"), &vocab_vector(text), text, mom, VocabEmbedder::MODEL_ID)
                        .unwrap();
                }
            });
        }
        for document in ["first", "second"] {
            let index = &index;
            let mom = &mom;
            s.spawn(move || {
                for _ in 0..5 {
                    index
                        .upsert("shared", &vocab_vector(document), document, mom, VocabEmbedder::MODEL_ID)
                        .unwrap();
                }
            });
        }
        let reader = s.spawn(|| {
            let query = vocab_vector("lake Mom");
            let mut errors = Vec::new();
            for i in 0..50 {
                let person = if i % 2 == 0 { None } else { Some("Mom") };
                match index.query(&query, 5, person) {
                    Ok(hits) => assert!(hits.len() <= 5),
                    Err(err) => errors.push(err.to_string()),
                }
            }
            errors
        });
        reader.join().unwrap()
    });

    assert!(query_errors.is_empty(), "queries failed: {query_errors:?}");
    assert_eq!(index.count().unwrap(), WRITERS + 1);

    let shared = index.get("shared").unwrap().unwrap();
    assert!(["first", "second"].contains(&shared.document.as_str()));
    assert_eq!(index.embedding("shared").unwrap().unwrap(), vocab_vector(&shared.document));

    let tagged = index.query(&vocab_vector("lake"), WRITERS + 1, Some("Mom")).unwrap();
    assert_eq!(tagged.len(), WRITERS + 1);
}

#[test]
fn service_can_index_and_search_from_many_threads() {
    let tmp = TempDir::new().unwrap();
    write_lake_archive(&tmp.path().join("memories"));
    let service = open_service(&tmp, Arc::new(VocabEmbedder::new()));
    service.index_memory("office_notes").unwrap();

    std::thread::scope(|s| {
        for id in ["lake_birthday", "lake_house", "lake_birthday"] {
            let service = &service;
            s.spawn(move || service.index_memory(id).unwrap());
        }
        for _ in 0..2 {
            s.spawn(|| {
                for _ in 0..10 {
                    let hits = service.search("lake Mom", 3, None).unwrap();
                    assert!(!hits.is_empty());
                }
            });
        }
    });

    assert_eq!(service.index().count().unwrap(), 3);
    let hits = service.search("lake Mom", 2, Some("Mom")).unwrap();
    let mut ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["lake_birthday", "lake_house"]);
}
