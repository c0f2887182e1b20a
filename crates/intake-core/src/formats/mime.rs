//! MIME type names used by the default policy and signature registry.

/// PDF document.
pub const PDF: &str = "application/pdf";
/// JPEG image.
pub const JPEG: &str = "image/jpeg";
/// Non-standard JPEG alias some clients send.
pub const JPG: &str = "image/jpg";
/// PNG image.
pub const PNG: &str = "image/png";
/// GIF image.
pub const GIF: &str = "image/gif";
/// WebP image.
pub const WEBP: &str = "image/webp";
/// ZIP archive.
pub const ZIP: &str = "application/zip";
/// ZIP alias sent by some Windows browsers.
pub const ZIP_COMPRESSED: &str = "application/x-zip-compressed";
/// Generic binary stream.
pub const OCTET_STREAM: &str = "application/octet-stream";
/// Word 97-2003 document.
pub const DOC: &str = "application/msword";
/// Excel 97-2003 workbook.
pub const XLS: &str = "application/vnd.ms-excel";
/// PowerPoint 97-2003 presentation.
pub const PPT: &str = "application/vnd.ms-powerpoint";
/// Word document (OOXML).
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// Excel workbook (OOXML).
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// PowerPoint presentation (OOXML).
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
/// Plain text.
pub const TEXT: &str = "text/plain";
/// Comma-separated values.
pub const CSV: &str = "text/csv";

/// OOXML container types, the only ones subject to macro scanning.
pub const OOXML_TYPES: [&str; 3] = [DOCX, XLSX, PPTX];

/// Returns `true` if the MIME type is one of the OOXML container types.
#[must_use]
pub fn is_ooxml(mime_type: &str) -> bool {
    OOXML_TYPES
        .iter()
        .any(|ooxml| ooxml.eq_ignore_ascii_case(mime_type.trim()))
}
