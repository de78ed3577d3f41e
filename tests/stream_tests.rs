//! Integration tests for streamed imports read from files.

use std::io::{BufReader, Write};

use task_graph_ingest::db::Database;
use task_graph_ingest::import::stream::{InputFormat, StreamLimits};
use task_graph_ingest::import::{ImportPolicy, OrphanHandling};
use tokio_util::sync::CancellationToken;

fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn write_body(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn import_file(
    db: &Database,
    file: &tempfile::NamedTempFile,
    policy: &ImportPolicy,
    chunk_size: usize,
) -> anyhow::Result<task_graph_ingest::import::ImportResult> {
    let reader = BufReader::new(file.reopen().unwrap());
    let limits = StreamLimits {
        chunk_size,
        ..Default::default()
    };
    db.import_stream(reader, InputFormat::Auto, policy, limits, &CancellationToken::new())
}

#[test]
fn json_array_is_one_invocation() {
    let db = setup_db();
    let file = write_body(
        r#"[
            {"id": "bd-1", "title": "One", "labels": ["ops"], "dependencies": [{"depends_on_id": "bd-2"}]},
            {"id": "bd-2", "title": "Two", "issue_type": "bug"}
        ]"#,
    );

    let result = import_file(&db, &file, &ImportPolicy::default(), 1).unwrap();

    assert_eq!(result.created, 2);
    assert_eq!(result.applied_chunks, 1);
    assert_eq!(db.get_dependencies("bd-1").unwrap().len(), 1);
}

#[test]
fn ndjson_chunks_are_summed() {
    let db = setup_db();
    let body: String = (0..7)
        .map(|i| format!("{{\"id\":\"bd-{i}\",\"title\":\"Task {i}\"}}\n"))
        .collect();
    let file = write_body(&body);

    let result = import_file(&db, &file, &ImportPolicy::default().atomic(), 3).unwrap();

    assert_eq!(result.created, 7);
    assert_eq!(result.applied_chunks, 3);
    assert_eq!(result.task_ids.len(), 7);
    assert_eq!(db.count_tasks().unwrap(), 7);
}

#[test]
fn failed_chunk_keeps_earlier_chunks() {
    let db = setup_db();
    let body = concat!(
        "{\"id\":\"bd-1\",\"title\":\"a\"}\n",
        "{\"id\":\"bd-2\",\"title\":\"b\"}\n",
        "{\"id\":\"bd-3\",\"title\":\"c\"}\n",
        "{\"id\":\"bd-4\",\"title\":\"d\",\"dependencies\":[{\"depends_on_id\":\"bd-4\"}]}\n",
    );
    let file = write_body(body);

    let err = import_file(&db, &file, &ImportPolicy::default().atomic(), 2).unwrap_err();

    assert!(format!("{:#}", err).contains("import chunk 1"));
    assert!(db.task_exists("bd-2").unwrap());
    assert!(!db.task_exists("bd-3").unwrap());
    assert!(!db.task_exists("bd-4").unwrap());
}

#[test]
fn strict_orphan_check_sees_earlier_chunks() {
    let db = setup_db();
    let body = concat!(
        "{\"id\":\"bd-1\",\"title\":\"a\"}\n",
        "{\"id\":\"bd-2\",\"title\":\"b\",\"dependencies\":[{\"depends_on_id\":\"bd-1\"}]}\n",
    );
    let file = write_body(body);
    let policy = ImportPolicy::default().with_orphans(OrphanHandling::Strict);

    let result = import_file(&db, &file, &policy, 1).unwrap();

    assert_eq!(result.errors, 0);
    assert_eq!(result.applied_chunks, 2);
    assert_eq!(db.get_dependencies("bd-2").unwrap().len(), 1);
}

#[test]
fn malformed_line_stops_stream() {
    let db = setup_db();
    let file = write_body("{\"id\":\"bd-1\",\"title\":\"a\"}\n{oops\n");

    let err = import_file(&db, &file, &ImportPolicy::default(), 10).unwrap_err();

    assert!(err.to_string().contains("line 2"));
    assert_eq!(db.count_tasks().unwrap(), 0);
}
