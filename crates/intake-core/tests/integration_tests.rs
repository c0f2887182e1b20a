//! Integration tests for intake-core.
//!
//! These tests drive whole uploads through the pipeline with real filesystem
//! operations.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use intake_core::PolicyConfig;
use intake_core::UploadError;
use intake_core::UploadValidator;
use intake_core::ValidationOutcome;
use intake_core::formats::Detection;
use intake_core::formats::SignatureRegistry;
use intake_core::formats::detect_file_type;
use intake_core::formats::mime;
use intake_core::security::ContentScanner;
use intake_core::security::Requester;
use intake_core::test_utils::create_deflated_zip;
use intake_core::test_utils::create_test_ooxml;
use intake_core::test_utils::create_test_zip;
use intake_core::test_utils::pdf_bytes;
use intake_core::test_utils::png_bytes;
use intake_core::types::UploadedFile;
use intake_core::types::ValidationStage;
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    temp: TempDir,
    validator: UploadValidator,
    staged: Cell<usize>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(customize: impl FnOnce(&mut PolicyConfig)) -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("staging")).unwrap();
        let mut config = PolicyConfig {
            storage_root: temp.path().join("uploads"),
            ..PolicyConfig::default()
        };
        customize(&mut config);
        let validator = UploadValidator::new(config).unwrap();
        Self {
            temp,
            validator,
            staged: Cell::new(0),
        }
    }

    fn root(&self) -> PathBuf {
        self.temp.path().join("uploads")
    }

    fn stage(&self, original_name: &str, declared: &str, bytes: &[u8]) -> UploadedFile {
        let n = self.staged.get();
        self.staged.set(n + 1);
        let staged = self.temp.path().join("staging").join(format!("upload-{n}"));
        fs::write(&staged, bytes).unwrap();
        UploadedFile::from_staged(original_name, declared, staged).unwrap()
    }

    fn stored_files(&self, relative_dir: &str) -> Vec<PathBuf> {
        match fs::read_dir(self.root().join(relative_dir)) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[test]
fn test_ingest_pdf_into_materials() {
    let fx = Fixture::new();
    let upload = fx.stage("Lecture 1.pdf", mime::PDF, &pdf_bytes("week one"));

    let stored = fx.validator.ingest(&upload, "materials", Some("42")).unwrap();

    assert_eq!(stored.category, "materials");
    assert!(stored.stored_path.starts_with(fx.root().join("materials").join("42")));
    assert!(stored.stored_filename.starts_with("materials_"));
    assert!(stored.stored_filename.ends_with("_Lecture_1.pdf"));
    assert!(stored.stored_path.exists());
    assert!(!upload.staged_path.exists(), "staged file should be moved");
}

#[test]
fn test_ingest_png_image() {
    let fx = Fixture::new();
    let upload = fx.stage("avatar.png", mime::PNG, &png_bytes());
    let stored = fx.validator.ingest(&upload, "images", None).unwrap();
    assert_eq!(fs::read(stored.path()).unwrap(), png_bytes());
}

#[test]
fn test_executable_renamed_pdf_rejected_and_deleted() {
    let fx = Fixture::new();
    let mut bytes = b"MZ\x90\x00\x03\x00\x00\x00\x04\x00".to_vec();
    bytes.extend_from_slice(b"This program cannot be run in DOS mode.");
    let upload = fx.stage("invoice.pdf", mime::PDF, &bytes);

    let result = fx.validator.ingest(&upload, "receipts", None);

    assert!(matches!(result, Err(UploadError::SignatureMismatch { .. })));
    assert!(fx.stored_files("receipts").is_empty());
}

#[test]
fn test_policy_rejection_does_not_touch_storage() {
    let fx = Fixture::new();
    let upload = fx.stage("shell.php", mime::TEXT, b"<?php echo 1; ?>");

    let result = fx.validator.ingest(&upload, "documents", None);

    assert!(matches!(result, Err(UploadError::ExtensionDenied { .. })));
    assert!(!fx.root().exists(), "no directory should be created");
    assert!(upload.staged_path.exists(), "staged file belongs to the transport");
    let outcome = ValidationOutcome::from_result(&result);
    assert_eq!(outcome.stage, ValidationStage::RejectedPre);
    assert_eq!(outcome.reason_code, Some("EXTENSION_DENIED"));
}

#[test]
fn test_unknown_category() {
    let fx = Fixture::new();
    let upload = fx.stage("a.pdf", mime::PDF, &pdf_bytes(""));
    assert!(matches!(
        fx.validator.ingest(&upload, "payments", None),
        Err(UploadError::UnknownCategory { .. })
    ));
}

#[test]
fn test_traversal_in_user_id_rejected() {
    let fx = Fixture::new();
    let upload = fx.stage("a.pdf", mime::PDF, &pdf_bytes(""));
    assert!(matches!(
        fx.validator.ingest(&upload, "documents", Some("../../escape")),
        Err(UploadError::ContainmentViolation { .. })
    ));
    assert!(!fx.temp.path().join("escape").exists());
}

#[test]
fn test_traversal_filename_stored_safely() {
    let fx = Fixture::new();
    let upload = fx.stage("../../../etc/cron.d/evil.txt", mime::TEXT, b"harmless text\n");
    let stored = fx.validator.ingest(&upload, "documents", None).unwrap();
    assert_eq!(stored.stored_path.parent().unwrap(), fx.root().join("documents"));
    assert!(!stored.stored_filename.contains(".."));
}

#[test]
fn test_script_in_text_rejected_post_write() {
    let fx = Fixture::new();
    let upload = fx.stage("notes.txt", mime::TEXT, b"hello <script>steal()</script>");

    let result = fx.validator.ingest(&upload, "documents", None);

    let outcome = ValidationOutcome::from_result(&result);
    assert_eq!(outcome.stage, ValidationStage::RejectedPost);
    assert_eq!(outcome.reason_code, Some("SCRIPT_CONTENT"));
    assert!(fx.stored_files("documents").is_empty());
}

#[test]
fn test_polyglot_pdf_rejected() {
    let fx = Fixture::new();
    let mut bytes = pdf_bytes("");
    bytes.extend_from_slice(&create_test_zip(vec![("a.txt", b"x")]));
    let upload = fx.stage("paper.pdf", mime::PDF, &bytes);

    assert!(matches!(
        fx.validator.ingest(&upload, "documents", None),
        Err(UploadError::PolyglotDetected { .. })
    ));
    assert!(fx.stored_files("documents").is_empty());
}

#[test]
fn test_zip_archive_accepted_with_generic_mime() {
    let fx = Fixture::new();
    let data = create_test_zip(vec![("week1/notes.csv", b"a,b\n1,2\n")]);
    let upload = fx.stage("bundle.zip", mime::OCTET_STREAM, &data);
    assert!(fx.validator.ingest(&upload, "archives", None).is_ok());
}

#[test]
fn test_script_named_zip_with_generic_mime_rejected() {
    let fx = Fixture::new();
    let upload = fx.stage(
        "bundle.zip",
        mime::OCTET_STREAM,
        b"#!/bin/sh\nrm -rf \"$HOME\"\n",
    );

    let result = fx.validator.ingest(&upload, "archives", None);
    assert!(
        matches!(result, Err(UploadError::SignatureMismatch { .. })),
        "{result:?}"
    );
    assert!(fx.stored_files("archives").is_empty());
    assert!(!upload.staged_path.exists());
}

#[test]
fn test_plain_zip_with_word_folder_accepted() {
    let fx = Fixture::new();
    let data = create_test_zip(vec![
        ("notes.csv", b"a,b\n1,2\n"),
        ("word/list.csv", b"apple,pear\n"),
    ]);
    let upload = fx.stage("bundle.zip", mime::ZIP, &data);

    let stored = fx.validator.ingest(&upload, "archives", None).unwrap();
    assert!(stored.stored_path.exists());
}

#[test]
fn test_zip_bomb_rejected() {
    let fx = Fixture::new();
    let data = create_deflated_zip("zeros.bin", &vec![0u8; 4 * 1024 * 1024]);
    let upload = fx.stage("bundle.zip", mime::ZIP, &data);

    assert!(matches!(
        fx.validator.ingest(&upload, "archives", None),
        Err(UploadError::ZipBomb { .. })
    ));
    assert!(fx.stored_files("archives").is_empty());
}

#[test]
fn test_archive_over_archive_ceiling() {
    let fx = Fixture::with_config(|config| config.archive_max_size = 256);
    let data = create_test_zip(vec![("a.csv", &[b'1'; 1024][..])]);
    let upload = fx.stage("bundle.zip", mime::ZIP, &data);

    assert!(matches!(
        fx.validator.ingest(&upload, "archives", None),
        Err(UploadError::ArchiveTooLarge { max: 256, .. })
    ));
}

#[test]
fn test_docx_accepted() {
    let fx = Fixture::new();
    let data = create_test_ooxml(vec![("word/document.xml", b"<w:document/>")]);
    let upload = fx.stage("essay.docx", mime::DOCX, &data);
    assert!(fx.validator.ingest(&upload, "documents", None).is_ok());
}

#[test]
fn test_docx_with_macros_rejected() {
    let fx = Fixture::new();
    let data = create_test_ooxml(vec![
        ("word/document.xml", b"<w:document/>"),
        ("word/vbaProject.bin", b"\x00\x01\x02\x03"),
    ]);
    let upload = fx.stage("essay.docx", mime::DOCX, &data);

    assert!(matches!(
        fx.validator.ingest(&upload, "documents", None),
        Err(UploadError::MacroContent { .. })
    ));
    assert!(fx.stored_files("documents").is_empty());
}

#[test]
fn test_declared_docx_but_spreadsheet_content() {
    let fx = Fixture::new();
    let data = create_test_ooxml(vec![("xl/workbook.xml", b"<workbook/>")]);
    let upload = fx.stage("essay.docx", mime::DOCX, &data);

    assert!(matches!(
        fx.validator.ingest(&upload, "documents", None),
        Err(UploadError::TypeMismatch { detected: Some(ref d), .. }) if d == mime::XLSX
    ));
}

#[test]
fn test_office_detection_from_leading_bytes() {
    let registry = SignatureRegistry::default();
    assert_eq!(
        detect_file_type(&registry, b"PK\x03\x04\x14\x00\x00\x00word/document.xml"),
        Detection::Known(mime::DOCX)
    );
    assert_eq!(
        detect_file_type(&registry, b"PK\x03\x04\x14\x00\x00\x00xl/workbook.xml"),
        Detection::Known(mime::XLSX)
    );
}

#[test]
fn test_pdf_with_mz_is_polyglot() {
    let scanner = ContentScanner::new(&PolicyConfig::default()).unwrap();
    let findings = scanner.findings(b"%PDF-1.4 ... MZ ...", mime::PDF);
    assert!(
        findings
            .iter()
            .any(|err| matches!(err, UploadError::PolyglotDetected { .. }))
    );
}

#[test]
fn test_post_write_validate_never_leaves_rejected_file() {
    let fx = Fixture::new();
    let dir = fx.temp.path().join("written");
    fs::create_dir_all(&dir).unwrap();

    let cases: Vec<(&str, &str, Vec<u8>)> = vec![
        ("a.pdf", mime::PDF, b"MZ\x90\x00".to_vec()),
        ("a.png", mime::PNG, b"not a png".to_vec()),
        ("a.txt", mime::TEXT, b"javascript:alert(1)".to_vec()),
        ("a.txt", mime::TEXT, b"see file:///etc/shadow".to_vec()),
        ("a.zip", mime::ZIP, b"PK\x03\x04 broken".to_vec()),
        ("a.docx", mime::DOCX, create_test_zip(vec![("data.csv", b"1")])),
    ];

    for (i, (name, declared, bytes)) in cases.into_iter().enumerate() {
        let path = dir.join(format!("{i}-{name}"));
        fs::write(&path, &bytes).unwrap();
        let result = fx.validator.post_write_validate(&path, declared, name);
        assert!(result.is_err(), "case {i} ({name}) should fail");
        assert!(!path.exists(), "case {i} ({name}) left the file behind");
    }
}

#[test]
fn test_serving_round_trip() {
    let fx = Fixture::new();
    let upload = fx.stage("doc1.pdf", mime::PDF, &pdf_bytes("served"));
    let stored = fx.validator.ingest(&upload, "materials", None).unwrap();

    let served = fx
        .validator
        .resolve_for_serving(stored.path(), &Requester::anonymous())
        .unwrap();
    assert_eq!(served.size, fs::metadata(stored.path()).unwrap().len());
    assert_eq!(served.headers["x-frame-options"], "DENY");

    let relative = Path::new("materials").join(&stored.stored_filename);
    assert!(
        fx.validator
            .resolve_for_serving(&relative, &Requester::anonymous())
            .is_ok()
    );
}

#[test]
fn test_serving_traversal_rejected() {
    let fx = Fixture::new();
    let upload = fx.stage("doc1.pdf", mime::PDF, &pdf_bytes(""));
    fx.validator.ingest(&upload, "materials", None).unwrap();

    let result = fx.validator.resolve_for_serving(
        Path::new("../../etc/passwd"),
        &Requester::new(Some("student-7".to_string()), None),
    );
    assert!(matches!(result, Err(UploadError::ContainmentViolation { .. })));
    assert_eq!(result.unwrap_err().status_code(), http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_ingest_async_offloads_to_blocking_pool() {
    let fx = Fixture::new();
    let validator = Arc::new(fx.validator.clone());
    let upload = fx.stage("doc1.pdf", mime::PDF, &pdf_bytes("async"));

    let stored = Arc::clone(&validator)
        .ingest_async(upload, "materials".to_string(), Some("9".to_string()))
        .await
        .unwrap();
    assert!(stored.path().exists());

    let bad = fx.stage("a.pdf", mime::PDF, b"\x7fELF\x02\x01\x01");
    let target = fx.temp.path().join("written.pdf");
    fs::rename(&bad.staged_path, &target).unwrap();
    let result = validator
        .post_write_validate_async(target.clone(), mime::PDF.to_string(), "a.pdf".to_string())
        .await;
    assert!(matches!(result, Err(UploadError::SignatureMismatch { .. })));
    assert!(!target.exists());
}

#[test]
fn test_concurrent_ingests_do_not_collide() {
    let fx = Fixture::new();
    let uploads: Vec<UploadedFile> = (0..16)
        .map(|_| fx.stage("same.pdf", mime::PDF, &pdf_bytes("x")))
        .collect();

    std::thread::scope(|scope| {
        for upload in &uploads {
            let validator = &fx.validator;
            scope.spawn(move || validator.ingest(upload, "documents", Some("1")).unwrap());
        }
    });

    assert_eq!(fx.stored_files("documents/1").len(), 16);
}
