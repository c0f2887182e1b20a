//! Filename sanitization for untrusted upload names.

use std::path::Path;

use chrono::DateTime;
use chrono::Utc;
use percent_encoding::percent_decode_str;

/// Upper bound on traversal-stripping passes.
const MAX_PASSES: usize = 5;

/// Maximum length of a sanitized filename, in characters.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Longest suffix (including the dot) still treated as an extension when
/// truncating.
const MAX_EXTENSION_CHARS: usize = 11;

/// Path separators and characters reserved on common filesystems.
const FORBIDDEN_CHARS: [char; 9] = ['/', '\\', '<', '>', ':', '"', '|', '?', '*'];

/// System-path fragments removed case-insensitively. This is a heuristic
/// denylist, not a guarantee.
const SYSTEM_PATH_FRAGMENTS: [&str; 7] = [
    "system32", "windows", "win.ini", "boot.ini", "passwd", "shadow", "etc",
];

/// Reduces an untrusted string to a safe base filename using the current time
/// for the placeholder name.
///
/// See [`sanitize_filename_at`] for the exact rules.
///
/// # Examples
///
/// ```
/// use intake_core::sanitize_filename;
///
/// assert_eq!(sanitize_filename("my report.pdf"), "my_report.pdf");
///
/// let name = sanitize_filename("....%2F%2F..%2Fetc%2Fpasswd");
/// assert!(!name.contains("..") && !name.contains('/') && !name.contains('\\'));
/// ```
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    sanitize_filename_at(raw, Utc::now())
}

/// Reduces an untrusted string to a safe base filename.
///
/// The result never contains `..`, `/` or `\`, never starts with a dot, is at
/// most [`MAX_FILENAME_CHARS`] characters long and is never empty: when
/// nothing usable remains, `file_{unixMillis}.tmp` is returned.
///
/// Steps:
/// 1. Strip control and invisible format characters.
/// 2. Percent-decode once (a failed decode keeps the input) and strip control
///    characters again.
/// 3. Up to five passes, until stable: drop a drive prefix, `~`, `..`, path
///    separators, `<>:"|?*` and system-path fragments such as `etc`.
/// 4. Collapse whitespace to `_` and drop leading dots.
/// 5. Truncate, keeping the extension.
///
/// The function is pure: the same input and time always give the same output.
#[must_use]
pub fn sanitize_filename_at(raw: &str, now: DateTime<Utc>) -> String {
    let mut name = strip_control_chars(raw);
    if let Ok(decoded) = percent_decode_str(&name).decode_utf8() {
        name = strip_control_chars(&decoded);
    }

    for _ in 0..MAX_PASSES {
        let next = strip_traversal(&name);
        if next == name {
            break;
        }
        name = next;
    }

    let name = name.split_whitespace().collect::<Vec<_>>().join("_");
    let name = truncate_preserving_extension(name.trim_start_matches('.'), MAX_FILENAME_CHARS);
    let name = collapse_dot_runs(&name);

    if name.is_empty() || name == "." || name == ".." {
        placeholder_name(now)
    } else {
        name
    }
}

/// Returns the lowercased extension of a filename, without the dot.
///
/// Returns an empty string when there is none.
#[must_use]
pub fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Splits a sanitized filename into stem and dotted, lowercased extension.
///
/// ```
/// use intake_core::security::filename::split_name;
///
/// assert_eq!(split_name("Report.PDF"), ("Report".to_string(), ".pdf".to_string()));
/// assert_eq!(split_name("README"), ("README".to_string(), String::new()));
/// ```
#[must_use]
pub fn split_name(name: &str) -> (String, String) {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    let extension = file_extension(name);
    if extension.is_empty() {
        (stem, String::new())
    } else {
        (stem, format!(".{extension}"))
    }
}

fn placeholder_name(now: DateTime<Utc>) -> String {
    format!("file_{}.tmp", now.timestamp_millis())
}

fn is_control_or_format(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{2069}'
                | '\u{FEFF}'
        )
}

fn strip_control_chars(s: &str) -> String {
    s.chars().filter(|&c| !is_control_or_format(c)).collect()
}

/// One traversal-stripping pass. Removing one construct can expose another
/// (`./.` becomes `..` once the separator is gone), hence the caller loops.
fn strip_traversal(name: &str) -> String {
    let mut s = strip_drive_prefix(name).replace('~', "");
    s = s.replace("..", "");
    s.retain(|c| !FORBIDDEN_CHARS.contains(&c));
    for fragment in SYSTEM_PATH_FRAGMENTS {
        s = remove_ignore_ascii_case(&s, fragment);
    }
    s
}

fn strip_drive_prefix(name: &str) -> &str {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => &name[2..],
        _ => name,
    }
}

/// Removes every ASCII-case-insensitive occurrence of `needle`.
///
/// `needle` must be ASCII; lowercasing ASCII keeps byte offsets stable.
fn remove_ignore_ascii_case(haystack: &str, needle: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in lower.match_indices(needle) {
        out.push_str(&haystack[last..start]);
        last = start + needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}

fn truncate_preserving_extension(name: &str, max_chars: usize) -> String {
    let total = name.chars().count();
    if total <= max_chars {
        return name.to_string();
    }

    if let Some(dot) = name.rfind('.')
        && dot > 0
    {
        let extension = &name[dot..];
        let ext_chars = extension.chars().count();
        if ext_chars <= MAX_EXTENSION_CHARS {
            let stem: String = name[..dot].chars().take(max_chars - ext_chars).collect();
            return format!("{}{extension}", stem.trim_end_matches('.'));
        }
    }

    name.chars().take(max_chars).collect()
}

fn collapse_dot_runs(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_dot = false;
    for c in name.chars() {
        let is_dot = c == '.';
        if !(is_dot && previous_dot) {
            out.push(c);
        }
        previous_dot = is_dot;
    }
    out
}
