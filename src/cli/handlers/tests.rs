use super::*;
use std::path::PathBuf;
use tempfile::tempdir;

use super::export::output_path;

// ===========================================
// Output Paths
// ===========================================

#[test]
fn output_defaults_to_filename_in_working_dir() {
    assert_eq!(
        output_path(None, "Intro 2024-05-01 10:00.pdf"),
        PathBuf::from("Intro 2024-05-01 10:00.pdf")
    );
}

#[test]
fn output_directory_keeps_document_name() {
    let dir = tempdir().unwrap();
    assert_eq!(
        output_path(Some(dir.path()), "Intro.pdf"),
        dir.path().join("Intro.pdf")
    );
}

#[test]
fn output_file_path_is_used_as_given() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("custom.pdf");
    assert_eq!(output_path(Some(&file), "Intro.pdf"), file);
}

// ===========================================
// Sessions
// ===========================================

#[test]
fn session_creates_host_and_store_tables_in_one_file() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("site.db");
    let session = Session::open(&Config::default(), &db).unwrap();

    let count: i64 = session
        .host
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
             AND name IN ('lessons', 'lesson_pages', 'page_order', 'export_queue')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 4);
}
