//! Byte-level content scanning.

use regex::bytes::Regex;
use regex::bytes::RegexBuilder;

use crate::PolicyConfig;
use crate::Result;
use crate::UploadError;
use crate::formats::mime;
use crate::formats::signatures::EXECUTABLE_SIGNATURES;

/// Built-in script patterns as `(name, regex)` pairs, compiled
/// case-insensitively.
const SCRIPT_PATTERNS: [(&str, &str); 8] = [
    ("script tag", r"<\s*script"),
    ("javascript URI", r"javascript\s*:"),
    ("vbscript URI", r"vbscript\s*:"),
    (
        "event handler attribute",
        r"\bon(?:load|error|click|dblclick|mouseover|mouseout|mousedown|mouseup|focus|blur|change|submit|keydown|keyup|keypress|abort|unload|resize|input|toggle|animationstart|pointerover)\s*=",
    ),
    ("eval call", r"\beval\s*\("),
    ("document.write", r"document\s*\.\s*write"),
    ("document.cookie", r"document\s*\.\s*cookie"),
    ("window navigation", r"window\s*\.\s*(?:location|open)"),
];

/// Substrings that reveal VBA projects inside OOXML containers.
const MACRO_MARKERS: [&str; 5] = [
    "vbaProject.bin",
    "macros/",
    "xl/macrosheets/",
    "word/vbaProject",
    "ppt/vbaProject",
];

const URL_PATTERN: &str = r#"(?:https?|ftp)://[^\s"'<>()\[\]{}]+"#;
const UNC_PATTERN: &str = r"\\\\[A-Za-z0-9._$-]+\\[A-Za-z0-9._$-]+";
const FILE_URI_PATTERN: &str = r"file:/{2,}\S*";

/// Longest matched reference kept in an error.
const MAX_REFERENCE_CHARS: usize = 120;

/// Signatures searched anywhere in the buffer by the polyglot check.
const POLYGLOT_SIGNATURES: [(&str, &[u8]); 4] = [
    ("PDF", b"%PDF"),
    ("ZIP", b"PK\x03\x04"),
    ("JPEG", &[0xFF, 0xD8, 0xFF]),
    ("PNG", &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
];

/// Format name used by the polyglot check for any executable signature.
const EXECUTABLE_FORMAT: &str = "executable";

/// Scans the leading bytes of a file for active or disguised content.
///
/// Patterns are compiled once at construction; a scanner is immutable and can
/// be shared across threads.
///
/// # Examples
///
/// ```
/// use intake_core::PolicyConfig;
/// use intake_core::UploadError;
/// use intake_core::security::ContentScanner;
///
/// let scanner = ContentScanner::new(&PolicyConfig::default()).unwrap();
///
/// assert!(scanner.scan(b"quarterly figures, all good", "text/plain").is_ok());
/// assert!(matches!(
///     scanner.scan(b"<SCRIPT>alert(1)</script>", "text/plain"),
///     Err(UploadError::ScriptContent { .. })
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct ContentScanner {
    script_patterns: Vec<(String, Regex)>,
    url: Regex,
    unc: Regex,
    file_uri: Regex,
}

impl ContentScanner {
    /// Compiles the built-in patterns plus `config.extra_script_patterns`.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidConfig` if an extra pattern is not a
    /// valid regular expression.
    pub fn new(config: &PolicyConfig) -> Result<Self> {
        let mut script_patterns = SCRIPT_PATTERNS
            .iter()
            .map(|(name, pattern)| Ok(((*name).to_string(), compile(pattern)?)))
            .collect::<Result<Vec<_>>>()?;

        for pattern in &config.extra_script_patterns {
            script_patterns.push((pattern.clone(), compile(pattern)?));
        }

        Ok(Self {
            script_patterns,
            url: compile(URL_PATTERN)?,
            unc: compile(UNC_PATTERN)?,
            file_uri: compile(FILE_URI_PATTERN)?,
        })
    }

    /// Runs every check in order and stops at the first failure.
    ///
    /// Order: embedded executable, script content, macro indicators,
    /// external references, polyglot.
    ///
    /// # Errors
    ///
    /// Returns the first check's error.
    pub fn scan(&self, buffer: &[u8], declared_mime_type: &str) -> Result<()> {
        check_embedded_executable(buffer)?;
        self.check_script_content(buffer)?;
        check_macro_indicators(buffer, declared_mime_type)?;
        self.check_external_references(buffer)?;
        check_polyglot(buffer)
    }

    /// Runs every check and returns all failures, in check order.
    #[must_use]
    pub fn findings(&self, buffer: &[u8], declared_mime_type: &str) -> Vec<UploadError> {
        [
            check_embedded_executable(buffer),
            self.check_script_content(buffer),
            check_macro_indicators(buffer, declared_mime_type),
            self.check_external_references(buffer),
            check_polyglot(buffer),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect()
    }

    /// Looks for script or active-content patterns.
    ///
    /// # Errors
    ///
    /// Returns `ScriptContent` naming the first pattern that matched.
    pub fn check_script_content(&self, buffer: &[u8]) -> Result<()> {
        match self
            .script_patterns
            .iter()
            .find(|(_, regex)| regex.is_match(buffer))
        {
            Some((name, _)) => Err(UploadError::ScriptContent {
                pattern: name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Looks for absolute URLs, UNC paths and `file://` URIs.
    ///
    /// # Errors
    ///
    /// Returns `ExternalReference` with the first matched reference.
    pub fn check_external_references(&self, buffer: &[u8]) -> Result<()> {
        let found = [&self.file_uri, &self.url, &self.unc]
            .into_iter()
            .find_map(|regex| regex.find(buffer));

        match found {
            Some(m) => {
                let reference: String = String::from_utf8_lossy(m.as_bytes())
                    .chars()
                    .take(MAX_REFERENCE_CHARS)
                    .collect();
                Err(UploadError::ExternalReference { reference })
            }
            None => Ok(()),
        }
    }
}

/// Looks for executable or bytecode magic numbers anywhere in the buffer.
///
/// # Errors
///
/// Returns `EmbeddedExecutable` with the format and offset of the earliest
/// match.
pub fn check_embedded_executable(buffer: &[u8]) -> Result<()> {
    let earliest = EXECUTABLE_SIGNATURES
        .iter()
        .filter_map(|sig| find_bytes(buffer, sig.bytes).map(|offset| (offset, sig.format)))
        .min_by_key(|(offset, _)| *offset);

    match earliest {
        Some((offset, format)) => Err(UploadError::EmbeddedExecutable { format, offset }),
        None => Ok(()),
    }
}

/// Looks for VBA project markers, for OOXML declared types only.
///
/// # Errors
///
/// Returns `MacroContent` naming the marker found.
pub fn check_macro_indicators(buffer: &[u8], declared_mime_type: &str) -> Result<()> {
    if !mime::is_ooxml(declared_mime_type) {
        return Ok(());
    }

    match MACRO_MARKERS
        .iter()
        .find(|marker| find_bytes(buffer, marker.as_bytes()).is_some())
    {
        Some(marker) => Err(UploadError::MacroContent {
            marker: (*marker).to_string(),
        }),
        None => Ok(()),
    }
}

/// Looks for signatures of more than one format anywhere in the buffer.
///
/// # Errors
///
/// Returns `PolyglotDetected` listing every distinct format found.
pub fn check_polyglot(buffer: &[u8]) -> Result<()> {
    let mut formats: Vec<&'static str> = POLYGLOT_SIGNATURES
        .iter()
        .filter(|(_, sig)| find_bytes(buffer, sig).is_some())
        .map(|(format, _)| *format)
        .collect();

    if EXECUTABLE_SIGNATURES
        .iter()
        .any(|sig| find_bytes(buffer, sig.bytes).is_some())
    {
        formats.push(EXECUTABLE_FORMAT);
    }

    if formats.len() > 1 {
        Err(UploadError::PolyglotDetected { formats })
    } else {
        Ok(())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| UploadError::InvalidConfig(format!("invalid scan pattern {pattern:?}: {e}")))
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
