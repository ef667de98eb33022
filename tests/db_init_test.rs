use keepsake::db;

#[test]
fn full_schema_creates_all_tables_and_indexes() {
    let conn = db::open_memory_database().unwrap();

    // Verify tables
    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(tables.contains(&"memory_index".to_string()), "memory_index table missing");
    assert!(tables.contains(&"memory_people".to_string()), "memory_people table missing");
    assert!(tables.contains(&"schema_meta".to_string()), "schema_meta table missing");

    // Verify indexes
    let indexes: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert!(indexes.contains(&"idx_memory_people_person".to_string()));

    // Verify schema version
    let version: String = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(version, db::schema::SCHEMA_VERSION.to_string());

    // sqlite-vec is registered on every connection
    let vec_version: String = conn
        .query_row("SELECT vec_version()", [], |r| r.get(0))
        .unwrap();
    assert!(!vec_version.is_empty());
}

#[test]
fn schema_init_is_idempotent() {
    let conn = db::open_memory_database().unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::schema::init_schema(&conn).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_meta WHERE key = 'schema_version'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn check_constraints_reject_bad_rows() {
    let conn = db::open_memory_database().unwrap();

    let bad_story = conn.execute(
        "INSERT INTO memory_index (id, embedding, dimensions, document, has_story, provider, updated_at)
         VALUES ('m1', x'00000000', 1, 'doc', 2, 'test', '2024-01-01T00:00:00Z')",
        [],
    );
    assert!(bad_story.is_err(), "has_story outside 0/1 should be rejected");

    let bad_dims = conn.execute(
        "INSERT INTO memory_index (id, embedding, dimensions, document, provider, updated_at)
         VALUES ('m2', x'', 0, 'doc', 'test', '2024-01-01T00:00:00Z')",
        [],
    );
    assert!(bad_dims.is_err(), "zero dimensions should be rejected");
}

#[test]
fn deleting_an_entry_cascades_to_people() {
    let conn = db::open_memory_database().unwrap();
    conn.execute(
        "INSERT INTO memory_index (id, embedding, dimensions, document, people, provider, updated_at)
         VALUES ('m1', x'0000803f', 1, 'doc', 'Mom', 'test', '2024-01-01T00:00:00Z')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO memory_people (memory_id, position, person) VALUES ('m1', 0, 'Mom')",
        [],
    )
    .unwrap();

    conn.execute("DELETE FROM memory_index WHERE id = 'm1'", []).unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM memory_people", [], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}
