//! Output formatter trait for CLI results.

use crate::commands::sanitize::SanitizedName;
use crate::commands::scan::ScanReport;
use anyhow::Result;
use intake_core::PolicyConfig;
use intake_core::StoredFile;
use intake_core::security::ServedFile;
use serde::Serialize;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format sanitized filenames
    fn format_sanitized(&self, names: &[SanitizedName]) -> Result<()>;

    /// Format the verdict of a non-destructive scan
    fn format_scan_report(&self, report: &ScanReport) -> Result<()>;

    /// Format an accepted upload
    fn format_stored_file(&self, stored: &StoredFile) -> Result<()>;

    /// Format a path cleared for serving
    fn format_served_file(&self, served: &ServedFile) -> Result<()>;

    /// Format the effective policy
    fn format_policy(&self, config: &PolicyConfig) -> Result<()>;

    /// Format error message
    fn format_error(&self, operation: &str, error: &anyhow::Error);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Rejected,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    /// A completed operation whose subject failed validation.
    pub fn rejected(operation: impl Into<String>, data: T, reason: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Rejected,
            data: Some(data),
            error: Some(reason.into()),
        }
    }

    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
