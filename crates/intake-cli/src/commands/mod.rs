//! Subcommand implementations.

pub mod completion;
pub mod ingest;
pub mod policy;
pub mod sanitize;
pub mod scan;
pub mod serve_check;

use crate::error::convert_upload_error;
use anyhow::Result;
use intake_core::PolicyConfig;
use intake_core::UploadValidator;
use std::path::Path;

/// Loads the policy file (or the defaults) and applies `--root`.
pub fn load_policy(policy: Option<&Path>, root: Option<&Path>) -> Result<PolicyConfig> {
    let mut config = match policy {
        Some(path) => {
            let config =
                PolicyConfig::from_json_file(path).map_err(|e| convert_upload_error(e, path))?;
            tracing::debug!(policy = %path.display(), "loaded policy file");
            config
        }
        None => PolicyConfig::default(),
    };

    if let Some(root) = root {
        config.storage_root = root.to_path_buf();
    }

    Ok(config)
}

/// Builds the validator every file-handling command runs through.
pub fn build_validator(policy: Option<&Path>, root: Option<&Path>) -> Result<UploadValidator> {
    let config = load_policy(policy, root)?;
    let root = config.storage_root.clone();
    UploadValidator::new(config).map_err(|e| convert_upload_error(e, &root))
}

/// The name a client would have sent: `--name`, else the file's own name.
pub fn original_name(name: Option<&str>, file: &Path) -> String {
    name.map_or_else(
        || {
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        },
        str::to_string,
    )
}
