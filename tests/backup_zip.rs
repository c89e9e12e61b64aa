#[path = "../src/backup.rs"]
mod backup;

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// A minimal workspace database with one student.
fn write_workspace_db(workspace: &Path, roll: &str) {
    let conn = rusqlite::Connection::open(workspace.join("attendance.sqlite3")).expect("open db");
    conn.execute_batch(
        "CREATE TABLE students(roll TEXT PRIMARY KEY, name TEXT NOT NULL, class TEXT NOT NULL);
         CREATE TABLE attendance(
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             roll TEXT NOT NULL, name TEXT NOT NULL, class TEXT NOT NULL,
             date TEXT NOT NULL, time TEXT NOT NULL
         );",
    )
    .expect("create schema");
    conn.execute(
        "INSERT INTO students(roll, name, class) VALUES(?1, 'Asha', '10A')",
        [roll],
    )
    .expect("insert student");
}

fn student_rolls(workspace: &Path) -> Vec<String> {
    let conn = rusqlite::Connection::open(workspace.join("attendance.sqlite3")).expect("open db");
    let mut stmt = conn
        .prepare("SELECT roll FROM students ORDER BY roll")
        .expect("prepare");
    let rolls = stmt
        .query_map([], |r| r.get(0))
        .expect("query")
        .collect::<Result<Vec<String>, _>>()
        .expect("rows");
    rolls
}

/// A v1 bundle whose manifest checksum matches `db_bytes`.
fn write_bundle(path: &Path, db_bytes: &[u8], sha: Option<String>) {
    let sha = sha.unwrap_or_else(|| format!("{:x}", Sha256::digest(db_bytes)));
    let f = File::create(path).expect("create bundle");
    let mut zip = zip::ZipWriter::new(f);
    let opts = zip::write::FileOptions::default();
    let manifest = serde_json::json!({
        "format": backup::BUNDLE_FORMAT_V1,
        "version": 1,
        "dbSha256": sha,
    });
    zip.start_file("manifest.json", opts).expect("manifest entry");
    zip.write_all(manifest.to_string().as_bytes())
        .expect("write manifest");
    zip.start_file("db/attendance.sqlite3", opts)
        .expect("db entry");
    zip.write_all(db_bytes).expect("write db");
    zip.finish().expect("finish zip");
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("attendd-backup-src");
    let workspace2 = temp_dir("attendd-backup-dst");
    let out_dir = temp_dir("attendd-backup-out");

    write_workspace_db(&workspace, "S1");
    write_workspace_db(&workspace2, "S9");

    let bundle_path = out_dir.join("workspace.attendd.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 3);
    assert_eq!(export.db_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("manifest json");
    assert_eq!(manifest["format"], backup::BUNDLE_FORMAT_V1);
    assert_eq!(manifest["bundleId"], export.bundle_id.as_str());
    assert_eq!(manifest["dbSha256"], export.db_sha256.as_str());
    archive
        .by_name("db/attendance.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(student_rolls(&workspace2), vec!["S1".to_string()]);
    assert!(!workspace2.join("attendance.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn export_without_database_fails() {
    let workspace = temp_dir("attendd-backup-empty");
    let out = workspace.join("out.zip");
    let res = backup::export_workspace_bundle(&workspace, &out);
    assert!(res.is_err());
    assert!(!out.exists());
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn checksum_mismatch_is_rejected() {
    let workspace = temp_dir("attendd-backup-tampered");
    write_workspace_db(&workspace, "S1");
    let bundle_path = workspace.join("tampered.zip");
    write_bundle(&bundle_path, b"not the checksummed bytes", Some("0".repeat(64)));

    let err = backup::import_workspace_bundle(&bundle_path, &workspace)
        .expect_err("mismatch must fail");
    assert!(format!("{err:#}").contains("checksum mismatch"));
    assert_eq!(student_rolls(&workspace), vec!["S1".to_string()]);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_bundle_format_is_rejected() {
    let workspace = temp_dir("attendd-backup-format");
    let bundle_path = workspace.join("other.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        zip.start_file("manifest.json", zip::write::FileOptions::default())
            .expect("manifest entry");
        zip.write_all(br#"{"format":"something-else"}"#)
            .expect("write manifest");
        zip.finish().expect("finish zip");
    }
    let err = backup::import_workspace_bundle(&bundle_path, &workspace)
        .expect_err("format must be checked");
    assert!(err.to_string().contains("unsupported bundle format"));
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn non_zip_input_leaves_database_untouched() {
    let workspace = temp_dir("attendd-backup-notzip");
    write_workspace_db(&workspace, "S1");
    let junk = workspace.join("notes.txt");
    std::fs::write(&junk, b"hello, this is not a database at all").expect("write junk");

    let err = backup::import_workspace_bundle(&junk, &workspace).expect_err("junk must fail");
    assert!(err.to_string().contains("not a workspace bundle"));
    assert_eq!(student_rolls(&workspace), vec!["S1".to_string()]);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bundle_with_non_sqlite_payload_is_rejected() {
    let workspace = temp_dir("attendd-backup-payload");
    write_workspace_db(&workspace, "S1");
    let bundle_path = workspace.join("payload.zip");
    write_bundle(&bundle_path, b"checksummed but not sqlite", None);

    let err = backup::import_workspace_bundle(&bundle_path, &workspace)
        .expect_err("payload must be checked");
    assert!(format!("{err:#}").contains("not a valid SQLite file"));
    assert_eq!(student_rolls(&workspace), vec!["S1".to_string()]);
    assert!(!workspace.join("attendance.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bundle_without_attendance_tables_is_rejected() {
    let workspace = temp_dir("attendd-backup-schema");
    write_workspace_db(&workspace, "S1");

    let other = temp_dir("attendd-backup-schema-src");
    let other_db = other.join("other.sqlite3");
    {
        let conn = rusqlite::Connection::open(&other_db).expect("open other db");
        conn.execute_batch("CREATE TABLE notes(body TEXT);")
            .expect("create notes");
    }
    let bytes = std::fs::read(&other_db).expect("read other db");
    let bundle_path = workspace.join("schema.zip");
    write_bundle(&bundle_path, &bytes, None);

    let err = backup::import_workspace_bundle(&bundle_path, &workspace)
        .expect_err("schema must be checked");
    assert!(err.to_string().contains("no students table"));
    assert_eq!(student_rolls(&workspace), vec!["S1".to_string()]);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(other);
}
