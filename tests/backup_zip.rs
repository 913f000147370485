#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;

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

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("termresult-backup-src");
    let workspace2 = temp_dir("termresult-backup-dst");
    let out_dir = temp_dir("termresult-backup-out");

    let db_src = workspace.join("termresult.sqlite3");
    let bytes = b"sqlite-test-payload";
    std::fs::write(&db_src, bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.termresult.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(export.entry_count, 2);
    assert_eq!(export.db_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT));
    assert!(manifest.contains(&export.db_sha256));
    archive
        .by_name("db/termresult.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT);
    assert_eq!(import.db_sha256, export.db_sha256);

    let restored = std::fs::read(workspace2.join("termresult.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn export_without_database_fails() {
    let workspace = temp_dir("termresult-backup-empty");
    let out = workspace.join("out.zip");
    let e = backup::export_workspace_bundle(&workspace, &out).expect_err("no database");
    assert!(e.to_string().contains("workspace database not found"));
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn checksum_mismatch_is_rejected_and_keeps_existing_db() {
    let out_dir = temp_dir("termresult-backup-tampered");
    let workspace = temp_dir("termresult-backup-tampered-dst");
    std::fs::write(workspace.join("termresult.sqlite3"), b"existing").expect("seed db");

    let bundle_path = out_dir.join("tampered.zip");
    let file = File::create(&bundle_path).expect("create bundle");
    let mut zip = zip::ZipWriter::new(file);
    let opts = FileOptions::default();
    zip.start_file("manifest.json", opts).expect("manifest entry");
    zip.write_all(
        format!(
            "{{\"format\":\"{}\",\"version\":1,\"dbSha256\":\"{}\"}}",
            backup::BUNDLE_FORMAT,
            "0".repeat(64)
        )
        .as_bytes(),
    )
    .expect("write manifest");
    zip.start_file("db/termresult.sqlite3", opts).expect("db entry");
    zip.write_all(b"tampered-payload").expect("write db");
    zip.finish().expect("finish zip");

    let e = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("mismatch");
    assert!(e.to_string().contains("checksum mismatch"));
    let kept = std::fs::read(workspace.join("termresult.sqlite3")).expect("read db");
    assert_eq!(kept, b"existing");

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn non_zip_input_is_rejected() {
    let out_dir = temp_dir("termresult-backup-plain");
    let workspace = temp_dir("termresult-backup-plain-dst");
    let plain = out_dir.join("plain.sqlite3");
    std::fs::write(&plain, b"not a zip").expect("write plain file");

    let e = backup::import_workspace_bundle(&plain, &workspace).expect_err("not a bundle");
    assert!(e.to_string().contains("not a workspace bundle"));
    assert!(!workspace.join("termresult.sqlite3").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
