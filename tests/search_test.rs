mod helpers;

use helpers::{test_service, write_lake_archive, write_memory, MemoryFixture, VocabEmbedder};
use keepsake::Error;
use std::sync::Arc;
use tempfile::TempDir;

fn indexed_archive() -> (TempDir, Arc<VocabEmbedder>, keepsake::memory::service::MemoryService) {
    let tmp = TempDir::new().unwrap();
    write_lake_archive(tmp.path());
    let embedder = Arc::new(VocabEmbedder::new());
    let service = test_service(tmp.path(), embedder.clone());
    let report = service.reindex_all().unwrap();
    assert_eq!(report.indexed.len(), 3);
    (tmp, embedder, service)
}

#[test]
fn lake_query_returns_the_two_lake_memories() {
    let (_tmp, _embedder, service) = indexed_archive();

    let hits = service.search("birthday at the lake", 2, None).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();

    assert_eq!(ids, vec!["lake_birthday", "lake_house"]);
    assert!(hits[0].score >= hits[1].score, "results are ordered by score");
}

#[test]
fn lake_mom_query_ranks_lake_memories_above_office() {
    let (_tmp, _embedder, service) = indexed_archive();

    let hits = service.search("lake Mom", 2, None).unwrap();
    let mut ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["lake_birthday", "lake_house"]);

    let all = service.search("lake Mom", 3, None).unwrap();
    assert_eq!(all[2].memory_id, "office_notes");
    assert!(all[1].score > all[2].score);
}

#[test]
fn three_story_memories_lake_mom_returns_both_lake_memories() {
    let tmp = TempDir::new().unwrap();
    for (id, story) in [
        ("lake_party", "birthday at the lake with Mom"),
        ("office", "office meeting notes"),
        ("lake_weekend", "Mom's lake house trip"),
    ] {
        write_memory(
            tmp.path(),
            id,
            MemoryFixture {
                story: Some(story),
                ..Default::default()
            },
        );
    }
    let service = test_service(tmp.path(), Arc::new(VocabEmbedder::new()));
    assert_eq!(service.reindex_all().unwrap().indexed.len(), 3);

    let hits = service.search("lake Mom", 2, None).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();
    assert_eq!(ids, vec!["lake_party", "lake_weekend"]);
    assert!(hits[0].score > hits[1].score);

    let all = service.search("lake Mom", 3, None).unwrap();
    assert_eq!(all[2].memory_id, "office");
    assert!(all[2].score.abs() < 1e-6);
}

#[test]
fn person_filter_excludes_untagged_memories() {
    let (_tmp, _embedder, service) = indexed_archive();

    // Best raw match is the office memory, which has nobody tagged.
    let hits = service.search("office meeting notes", 5, Some("Mom")).unwrap();
    let mut ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["lake_birthday", "lake_house"]);

    let dad = service.search("lake", 5, Some("Dad")).unwrap();
    assert_eq!(dad.len(), 1);
    assert_eq!(dad[0].memory_id, "lake_house");
}

#[test]
fn person_filter_is_exact_membership() {
    let tmp = TempDir::new().unwrap();
    write_memory(
        tmp.path(),
        "reunion",
        MemoryFixture {
            captions: &["family at the beach"],
            faces: &["Mom, Jr."],
            ..Default::default()
        },
    );
    write_memory(
        tmp.path(),
        "walk",
        MemoryFixture {
            captions: &["walking the dog"],
            faces: &["Momo"],
            ..Default::default()
        },
    );
    let service = test_service(tmp.path(), Arc::new(VocabEmbedder::new()));
    service.reindex_all().unwrap();

    assert!(service.search("beach", 5, Some("Mom")).unwrap().is_empty());
    assert!(service.search("beach", 5, Some("Jr.")).unwrap().is_empty());

    let hits = service.search("beach", 5, Some("Mom, Jr.")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory_id, "reunion");
}

#[test]
fn unknown_person_returns_no_hits() {
    let (_tmp, _embedder, service) = indexed_archive();
    assert!(service.search("lake", 5, Some("Grandpa")).unwrap().is_empty());
}

#[test]
fn blank_person_means_no_filter() {
    let (_tmp, _embedder, service) = indexed_archive();
    assert_eq!(service.search("lake", 5, Some("")).unwrap().len(), 3);
}

#[test]
fn empty_query_does_not_call_the_provider() {
    let (_tmp, embedder, service) = indexed_archive();
    let calls_before = embedder.calls();

    assert!(service.search("", 5, None).unwrap().is_empty());
    assert!(service.search("   \n", 5, Some("Mom")).unwrap().is_empty());

    assert_eq!(embedder.calls(), calls_before);
}

#[test]
fn search_on_empty_index_returns_nothing() {
    let tmp = TempDir::new().unwrap();
    let service = test_service(tmp.path(), Arc::new(VocabEmbedder::new()));
    assert!(service.search("birthday", 5, None).unwrap().is_empty());
}

#[test]
fn k_caps_the_result_count() {
    let (_tmp, _embedder, service) = indexed_archive();

    assert_eq!(service.search("lake", 1, None).unwrap().len(), 1);
    assert_eq!(service.search("lake", 10, None).unwrap().len(), 3);
    assert!(service.search("lake", 0, None).unwrap().is_empty());
}

#[test]
fn scores_are_one_minus_cosine_distance() {
    let (_tmp, _embedder, service) = indexed_archive();

    let hits = service.search("office meeting notes", 3, None).unwrap();
    assert_eq!(hits[0].memory_id, "office_notes");
    for hit in &hits {
        assert!(hit.score <= 1.0 + 1e-6);
        assert!(hit.score >= -1.0 - 1e-6);
    }
    // Nothing in the lake memories overlaps the query vocabulary.
    assert!(hits[1].score.abs() < 1e-6);
    assert!(hits[2].score.abs() < 1e-6);
}

#[test]
fn five_memories_top_three_ordered() {
    let tmp = TempDir::new().unwrap();
    let fixtures: [(&str, &[&str]); 5] = [
        ("m1", &["dog"]),
        ("m2", &["dog dog beach"]),
        ("m3", &["beach"]),
        ("m4", &["dog beach beach beach"]),
        ("m5", &["office"]),
    ];
    for (id, captions) in fixtures {
        write_memory(
            tmp.path(),
            id,
            MemoryFixture {
                captions,
                ..Default::default()
            },
        );
    }
    let service = test_service(tmp.path(), Arc::new(VocabEmbedder::new()));
    service.reindex_all().unwrap();

    let hits = service.search("dog", 3, None).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m4"]);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn hits_carry_first_image_as_thumbnail() {
    let (_tmp, _embedder, service) = indexed_archive();

    let hits = service.search("birthday at the lake", 3, None).unwrap();
    let birthday = hits.iter().find(|h| h.memory_id == "lake_birthday").unwrap();
    assert_eq!(birthday.thumbnail.as_deref(), Some("lake_birthday/images/a.jpg"));

    let house = hits.iter().find(|h| h.memory_id == "lake_house").unwrap();
    assert_eq!(house.thumbnail, None);
}

#[test]
fn query_vector_of_other_dimensionality_is_rejected() {
    let (_tmp, _embedder, service) = indexed_archive();

    let err = service.index().query(&[1.0f32; 4], 3, None).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch { expected, actual: 4 } if expected == VocabEmbedder::DIMENSIONS
    ));
}
