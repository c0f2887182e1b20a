//! Read-back guard for stored files.

use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use http::HeaderMap;
use http::HeaderValue;
use http::header;

use crate::Result;
use crate::UploadError;

/// Who asked for a file, for audit logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    /// Authenticated identity, if any.
    pub identity: Option<String>,
    /// Client address, if known.
    pub address: Option<IpAddr>,
}

impl Requester {
    /// Creates a requester.
    #[must_use]
    pub fn new(identity: Option<String>, address: Option<IpAddr>) -> Self {
        Self { identity, address }
    }

    /// An unauthenticated local requester, used by operator tools.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = self.identity.as_deref().unwrap_or("anonymous");
        match self.address {
            Some(address) => write!(f, "{identity}@{address}"),
            None => f.write_str(identity),
        }
    }
}

/// A stored file cleared for serving.
#[derive(Debug)]
pub struct ServedFile {
    /// Canonical path of the file.
    pub path: PathBuf,
    /// Open read handle.
    pub file: File,
    /// Size in bytes.
    pub size: u64,
    /// Response headers the caller must send with the bytes.
    pub headers: HeaderMap,
}

/// Resolves a requested path for serving, refusing anything outside `root`.
///
/// Relative requests are resolved against `root`. Both paths are
/// canonicalized so symlinks cannot escape; when the request does not exist,
/// its lexically normalized form decides containment first, so a traversal
/// attempt is reported as such rather than as a missing file.
///
/// # Errors
///
/// - `ContainmentViolation` if the request resolves outside `root`
/// - `FileNotFound` if it does not exist or is not a regular file
/// - `Io` for other filesystem failures
///
/// # Examples
///
/// ```no_run
/// use intake_core::security::Requester;
/// use intake_core::security::resolve_for_serving;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = Path::new("/srv/uploads");
/// let served = resolve_for_serving(Path::new("images/a.png"), root, &Requester::anonymous())?;
/// assert_eq!(served.headers["x-content-type-options"], "nosniff");
///
/// let escape = resolve_for_serving(Path::new("../../etc/passwd"), root, &Requester::anonymous());
/// assert!(escape.is_err());
/// # Ok(())
/// # }
/// ```
pub fn resolve_for_serving(
    requested: &Path,
    root: &Path,
    requester: &Requester,
) -> Result<ServedFile> {
    let canonical_root = root.canonicalize().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            UploadError::FileNotFound {
                path: root.to_path_buf(),
            }
        } else {
            UploadError::Io(e)
        }
    })?;

    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let canonical = match joined.canonicalize() {
        Ok(canonical) => canonical,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let lexical = normalize_lexically(&joined);
            let lexical_root = normalize_lexically(root);
            if !lexical.starts_with(&lexical_root) && !lexical.starts_with(&canonical_root) {
                return Err(containment_violation(requested, requester));
            }
            return Err(UploadError::FileNotFound {
                path: requested.to_path_buf(),
            });
        }
        Err(e) => return Err(UploadError::Io(e)),
    };

    if !canonical.starts_with(&canonical_root) {
        return Err(containment_violation(requested, requester));
    }

    let metadata = std::fs::metadata(&canonical)?;
    if !metadata.is_file() {
        return Err(UploadError::FileNotFound {
            path: requested.to_path_buf(),
        });
    }

    let file = File::open(&canonical)?;

    tracing::debug!(
        path = %canonical.display(),
        requester = %requester,
        "serving stored file"
    );

    Ok(ServedFile {
        path: canonical,
        file,
        size: metadata.len(),
        headers: security_headers(),
    })
}

/// Builds the response headers attached to every served file.
#[must_use]
pub fn security_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(5);
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers
}

fn containment_violation(requested: &Path, requester: &Requester) -> UploadError {
    tracing::warn!(
        path = %requested.display(),
        identity = requester.identity.as_deref().unwrap_or("anonymous"),
        address = ?requester.address,
        "blocked attempt to serve a file outside the storage root"
    );
    UploadError::ContainmentViolation {
        path: requested.to_path_buf(),
    }
}

/// Resolves `.` and `..` without touching the filesystem. `..` at the root
/// stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            Component::Normal(_) | Component::RootDir | Component::Prefix(_) => {
                normalized.push(component);
            }
        }
    }
    normalized
}
