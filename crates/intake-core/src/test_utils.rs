//! Test utilities for building upload fixtures.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

/// Creates an in-memory ZIP archive with stored (uncompressed) entries.
///
/// # Examples
///
/// ```
/// use intake_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(vec![("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// assert!(zip_data.starts_with(b"PK\x03\x04"));
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    build_zip(entries, CompressionMethod::Stored)
}

/// Creates an in-memory ZIP archive with a single deflated entry.
///
/// Highly repetitive `data` yields a high compression ratio, which is how
/// the zip bomb tests get their fixtures.
#[must_use]
pub fn create_deflated_zip(name: &str, data: &[u8]) -> Vec<u8> {
    build_zip(vec![(name, data)], CompressionMethod::Deflated)
}

/// Minimal OOXML package: content types, package relationships and one part
/// per `(path, content)` pair.
#[must_use]
pub fn create_test_ooxml(parts: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", b"<?xml version=\"1.0\"?><Types/>"),
        ("_rels/.rels", b"<?xml version=\"1.0\"?><Relationships/>"),
    ];
    entries.extend(parts);
    create_test_zip(entries)
}

/// Leading bytes of a minimal PDF document.
#[must_use]
pub fn pdf_bytes(body: &str) -> Vec<u8> {
    format!("%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n{body}\n%%EOF\n").into_bytes()
}

/// PNG signature followed by an IHDR-sized body.
#[must_use]
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0, 0, 0, 13]);
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 2, 0, 0, 0]);
    bytes
}

fn build_zip(entries: Vec<(&str, &[u8])>, method: CompressionMethod) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(0o644);

    for (path, data) in entries {
        zip.start_file(path, options).unwrap();
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap().into_inner()
}
