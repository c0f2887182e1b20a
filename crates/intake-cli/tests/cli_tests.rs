//! Integration tests for intake-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use intake_core::test_utils::create_test_ooxml;
use intake_core::test_utils::create_test_zip;
use intake_core::test_utils::pdf_bytes;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

fn intake_cmd() -> Command {
    cargo_bin_cmd!("intake")
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("failed to write fixture");
    path
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| entries.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default()
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("invalid JSON output")
}

#[test]
fn test_version_flag() {
    intake_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("intake"));
}

#[test]
fn test_help_lists_subcommands() {
    intake_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sanitize"))
        .stdout(predicate::str::contains("serve-check"));
}

#[test]
fn test_sanitize_strips_traversal() {
    intake_cmd()
        .arg("sanitize")
        .arg("../../etc/passwd")
        .assert()
        .success()
        .stdout(predicate::str::contains("..").not())
        .stdout(predicate::str::contains("/").not());
}

#[test]
fn test_sanitize_json_output() {
    let json = stdout_json(
        intake_cmd()
            .arg("--json")
            .arg("sanitize")
            .arg("report.pdf")
            .arg("..\\..\\boot.ini"),
    );

    assert_eq!(json["status"], "success");
    assert_eq!(json["operation"], "sanitize");
    assert_eq!(json["data"][0]["original"], "report.pdf");
    assert_eq!(json["data"][0]["sanitized"], "report.pdf");
    let second = json["data"][1]["sanitized"].as_str().unwrap();
    assert!(!second.contains('\\'));
    assert!(!second.contains(".."));
}

#[test]
fn test_scan_clean_pdf_passes() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let file = write_file(temp.path(), "syllabus.pdf", &pdf_bytes("week one"));

    intake_cmd()
        .arg("scan")
        .arg(&file)
        .arg("--mime")
        .arg("application/pdf")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scan passed"))
        .stdout(predicate::str::contains("application/pdf"));
}

#[test]
fn test_scan_rejection_leaves_file_in_place() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let file = write_file(temp.path(), "notes.txt", b"hello <script>alert(1)</script>");

    intake_cmd()
        .arg("scan")
        .arg(&file)
        .arg("--mime")
        .arg("text/plain")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Scan failed"))
        .stderr(predicate::str::contains("SCRIPT_CONTENT"))
        .stderr(predicate::str::contains("HINT"));

    assert!(file.exists(), "scan must never delete the file");
}

#[test]
fn test_scan_executable_disguised_as_pdf() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let mut bytes = b"MZ\x90\x00\x03\x00\x00\x00".to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    let file = write_file(temp.path(), "invoice.pdf", &bytes);

    intake_cmd()
        .arg("scan")
        .arg(&file)
        .arg("--mime")
        .arg("application/pdf")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Windows PE"))
        .stderr(predicate::str::contains("SIGNATURE_MISMATCH"));
}

#[test]
fn test_scan_all_reports_every_finding() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let file = write_file(
        temp.path(),
        "notes.txt",
        b"see <script>steal()</script> and http://attacker.example/payload",
    );

    let output = intake_cmd()
        .arg("--json")
        .arg("scan")
        .arg("--all")
        .arg(&file)
        .arg("--mime")
        .arg("text/plain")
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON output");
    assert_eq!(json["status"], "rejected");
    assert_eq!(json["data"]["outcome"]["accepted"], false);

    let codes: Vec<&str> = json["data"]["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|finding| finding["reason_code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"SCRIPT_CONTENT"));
    assert!(codes.contains(&"EXTERNAL_REFERENCE"));
}

#[test]
fn test_scan_docx_detected_from_container() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let docx = create_test_ooxml(vec![("word/document.xml", b"<w:document/>")]);
    let file = write_file(temp.path(), "essay.docx", &docx);

    let json = stdout_json(
        intake_cmd()
            .arg("--json")
            .arg("scan")
            .arg(&file)
            .arg("--mime")
            .arg("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    );

    assert_eq!(json["status"], "success");
    assert_eq!(
        json["data"]["detected_mime_type"],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
}

#[test]
fn test_scan_zip_with_word_folder_reported_as_zip() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let data = create_test_zip(vec![
        ("notes.csv", b"a,b\n"),
        ("word/list.csv", b"apple,pear\n"),
    ]);
    let file = write_file(temp.path(), "bundle.zip", &data);

    let json = stdout_json(
        intake_cmd()
            .arg("--json")
            .arg("scan")
            .arg(&file)
            .arg("--mime")
            .arg("application/zip"),
    );

    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["detected_mime_type"], "application/zip");
}

#[test]
fn test_scan_missing_file() {
    let temp = TempDir::new().expect("failed to create temp dir");

    intake_cmd()
        .arg("scan")
        .arg(temp.path().join("missing.pdf"))
        .arg("--mime")
        .arg("application/pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_json_errors_go_to_stderr() {
    let temp = TempDir::new().expect("failed to create temp dir");

    let output = intake_cmd()
        .arg("--json")
        .arg("scan")
        .arg(temp.path().join("missing.pdf"))
        .arg("--mime")
        .arg("application/pdf")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .get_output()
        .stderr
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON on stderr");
    assert_eq!(json["status"], "error");
    assert_eq!(json["operation"], "scan");
}

#[test]
fn test_ingest_moves_file_into_category() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = temp.path().join("uploads");
    let staged = write_file(temp.path(), "upload-1", &pdf_bytes("lecture"));

    intake_cmd()
        .arg("--root")
        .arg(&root)
        .arg("ingest")
        .arg(&staged)
        .arg("--category")
        .arg("documents")
        .arg("--mime")
        .arg("application/pdf")
        .arg("--name")
        .arg("lecture.pdf")
        .assert()
        .success()
        .stdout(predicate::str::contains("Upload accepted"));

    assert!(!staged.exists(), "staged file should have been moved");
    let stored = files_in(&root.join("documents"));
    assert_eq!(stored.len(), 1);
    let name = stored[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("documents_"));
    assert!(name.ends_with("_lecture.pdf"));
}

#[test]
fn test_ingest_json_with_user_directory() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = temp.path().join("uploads");
    let staged = write_file(temp.path(), "receipt.pdf", &pdf_bytes("total 12.00"));

    let json = stdout_json(
        intake_cmd()
            .arg("--json")
            .arg("--root")
            .arg(&root)
            .arg("ingest")
            .arg(&staged)
            .arg("-c")
            .arg("receipts")
            .arg("-m")
            .arg("application/pdf")
            .arg("-u")
            .arg("42"),
    );

    assert_eq!(json["status"], "success");
    assert_eq!(json["operation"], "ingest");
    assert_eq!(json["data"]["category"], "receipts");
    assert_eq!(files_in(&root.join("receipts").join("42")).len(), 1);
}

#[test]
fn test_ingest_denied_extension_keeps_staged_file() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = temp.path().join("uploads");
    let staged = write_file(temp.path(), "upload-2", &pdf_bytes("x"));

    intake_cmd()
        .arg("--root")
        .arg(&root)
        .arg("ingest")
        .arg(&staged)
        .arg("--category")
        .arg("documents")
        .arg("--mime")
        .arg("application/pdf")
        .arg("--name")
        .arg("setup.exe")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"))
        .stderr(predicate::str::contains("HINT"));

    assert!(staged.exists(), "pre-write rejection must not touch the staged file");
    assert!(files_in(&root.join("documents")).is_empty());
}

#[test]
fn test_ingest_content_rejection_deletes_file() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = temp.path().join("uploads");
    let staged = write_file(
        temp.path(),
        "upload-3",
        b"name,comment\nalice,<script>document.cookie</script>\n",
    );

    intake_cmd()
        .arg("--root")
        .arg(&root)
        .arg("ingest")
        .arg(&staged)
        .arg("--category")
        .arg("documents")
        .arg("--mime")
        .arg("text/csv")
        .arg("--name")
        .arg("roster.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Security violation"));

    assert!(!staged.exists());
    assert!(files_in(&root.join("documents")).is_empty());
}

#[test]
fn test_ingest_unknown_category() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let staged = write_file(temp.path(), "clip.mp4", b"\x00\x00\x00\x18ftypmp42");

    intake_cmd()
        .arg("--root")
        .arg(temp.path().join("uploads"))
        .arg("ingest")
        .arg(&staged)
        .arg("--category")
        .arg("videos")
        .arg("--mime")
        .arg("video/mp4")
        .assert()
        .failure()
        .stderr(predicate::str::contains("videos"))
        .stderr(predicate::str::contains("intake policy"));
}

#[test]
fn test_serve_check_after_ingest() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = temp.path().join("uploads");
    let staged = write_file(temp.path(), "handout.pdf", &pdf_bytes("handout"));

    let ingested = stdout_json(
        intake_cmd()
            .arg("--json")
            .arg("--root")
            .arg(&root)
            .arg("ingest")
            .arg(&staged)
            .arg("--category")
            .arg("materials")
            .arg("--mime")
            .arg("application/pdf"),
    );
    let stored_filename = ingested["data"]["stored_filename"].as_str().unwrap();

    let json = stdout_json(
        intake_cmd()
            .arg("--json")
            .arg("--root")
            .arg(&root)
            .arg("serve-check")
            .arg(format!("materials/{stored_filename}")),
    );

    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["headers"]["x-content-type-options"], "nosniff");
    assert_eq!(json["data"]["headers"]["x-frame-options"], "DENY");
    assert!(json["data"]["size"].as_u64().unwrap() > 0);
}

#[test]
fn test_serve_check_traversal_rejected() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = temp.path().join("uploads");
    fs::create_dir_all(&root).unwrap();

    intake_cmd()
        .arg("--root")
        .arg(&root)
        .arg("serve-check")
        .arg("../../../../etc/passwd")
        .arg("--identity")
        .arg("alice")
        .arg("--address")
        .arg("127.0.0.1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the storage root"));
}

#[test]
fn test_policy_json_defaults() {
    let json = stdout_json(intake_cmd().arg("--json").arg("policy"));

    assert_eq!(json["operation"], "policy");
    assert_eq!(json["data"]["scan_limit"], 10 * 1024);
    assert_eq!(json["data"]["categories"].as_array().unwrap().len(), 5);
    assert_eq!(json["data"]["categories"][0]["id"], "documents");
}

#[test]
fn test_policy_file_and_root_override() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let policy = write_file(
        temp.path(),
        "policy.json",
        br#"{ "scan_limit": 2048, "storage_root": "/var/lib/uploads" }"#,
    );

    let json = stdout_json(
        intake_cmd()
            .arg("--json")
            .arg("--policy")
            .arg(&policy)
            .arg("--root")
            .arg("/srv/intake")
            .arg("policy"),
    );

    assert_eq!(json["data"]["scan_limit"], 2048);
    assert_eq!(json["data"]["storage_root"], "/srv/intake");
}

#[test]
fn test_policy_human_lists_categories() {
    intake_cmd()
        .arg("policy")
        .assert()
        .success()
        .stdout(predicate::str::contains("documents"))
        .stdout(predicate::str::contains("receipts"));
}

#[test]
fn test_invalid_policy_file() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let policy = write_file(temp.path(), "policy.json", br#"{ "scan_limit": 0 }"#);

    intake_cmd()
        .arg("--policy")
        .arg(&policy)
        .arg("policy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("scan_limit"))
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_completion_bash() {
    intake_cmd()
        .arg("completion")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("intake"));
}
