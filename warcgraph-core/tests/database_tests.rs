// Tests for database functionality

use warcgraph_core::data::{Database, RunStatus};
use warcgraph_core::{EdgeRecord, JobKind, VertexRecord};
use warcgraph_scanner::derive_id;
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn vertex(url: &str) -> VertexRecord {
    VertexRecord {
        id: derive_id(url),
        url: url.to_string(),
    }
}

fn edge(source: &str, dest: &str) -> EdgeRecord {
    EdgeRecord {
        source: derive_id(source),
        dest: derive_id(dest),
    }
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path).unwrap();
    db.create_run("edges", "[]", 0).unwrap();
    assert!(db_path.exists());
    drop(db);

    Database::drop(&db_path).unwrap();
    assert!(!db_path.exists());
    assert!(!temp_dir.path().join("test.db-wal").exists());
    assert!(!temp_dir.path().join("test.db-shm").exists());
}

#[test]
fn test_reopen_keeps_schema() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let run_id = {
        let db = Database::new(&db_path).unwrap();
        db.create_run("vertices", "[]", 0).unwrap()
    };

    let db = Database::new(&db_path).unwrap();
    assert!(db.get_run(&run_id).unwrap().is_some());
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_create_run() {
    let (_temp_dir, db) = create_test_db();

    let run_id = db
        .create_run("edges", "[\"/data/00.warc.gz\"]", 1_700_000_000)
        .unwrap();
    assert!(!run_id.is_empty());

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.kind, "edges");
    assert_eq!(run.start_time, 1_700_000_000);
    assert_eq!(run.status, RunStatus::Running.as_str());
    assert!(run.end_time.is_none());
    assert!(run.counters.is_none());
}

#[test]
fn test_complete_run() {
    let (_temp_dir, db) = create_test_db();

    let run_id = db.create_run("vertices", "[]", 0).unwrap();
    db.complete_run(&run_id, "{\"PAGES\":3}").unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(RunStatus::from_str(&run.status), Some(RunStatus::Completed));
    assert!(run.end_time.is_some());
    assert_eq!(run.counters.as_deref(), Some("{\"PAGES\":3}"));
}

#[test]
fn test_fail_run() {
    let (_temp_dir, db) = create_test_db();

    let run_id = db.create_run("vertices", "[]", 0).unwrap();
    db.fail_run(&run_id).unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(RunStatus::from_str(&run.status), Some(RunStatus::Failed));
}

#[test]
fn test_unknown_run() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_run("no-such-run").unwrap().is_none());
}

#[test]
fn test_invalid_kind_rejected() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.create_run("pagerank", "[]", 0).is_err());
}

// ============================================================================
// Row Tests
// ============================================================================

#[test]
fn test_insert_vertices() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("vertices", "[]", 0).unwrap();

    let rows = vec![vertex("example.com/"), vertex("example.com/a")];
    let count = db.insert_rows(&run_id, JobKind::Vertices, &rows).unwrap();
    assert_eq!(count, 2);

    let stored = db.get_vertices(&run_id).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.contains(&(
        derive_id("example.com/a").to_string(),
        "example.com/a".to_string()
    )));
}

#[test]
fn test_duplicate_vertex_rejected() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("vertices", "[]", 0).unwrap();

    let rows = vec![vertex("example.com/"), vertex("example.com/")];
    assert!(db.insert_rows(&run_id, JobKind::Vertices, &rows).is_err());
    // The transaction rolled back
    assert!(db.get_vertices(&run_id).unwrap().is_empty());
}

#[test]
fn test_insert_edges_keeps_duplicates() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("edges", "[]", 0).unwrap();

    let rows = vec![
        edge("example.com/", "example.com/a"),
        edge("example.com/", "example.com/a"),
        edge("example.com/a", "example.com/"),
    ];
    let count = db.insert_rows(&run_id, JobKind::Edges, &rows).unwrap();
    assert_eq!(count, 3);

    let stored = db.get_edges(&run_id).unwrap();
    assert_eq!(stored.len(), 3);
    let home = derive_id("example.com/").to_string();
    assert_eq!(stored.iter().filter(|(source, _)| *source == home).count(), 2);
}

#[test]
fn test_rows_are_scoped_by_run() {
    let (_temp_dir, db) = create_test_db();
    let first = db.create_run("edges", "[]", 0).unwrap();
    let second = db.create_run("edges", "[]", 0).unwrap();

    db.insert_rows(&first, JobKind::Edges, &[edge("a.com/", "b.com/")])
        .unwrap();

    assert_eq!(db.get_edges(&first).unwrap().len(), 1);
    assert!(db.get_edges(&second).unwrap().is_empty());
}
