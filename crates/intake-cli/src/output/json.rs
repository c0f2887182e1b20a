//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use crate::commands::sanitize::SanitizedName;
use crate::commands::scan::ScanReport;
use anyhow::Result;
use intake_core::PolicyConfig;
use intake_core::StoredFile;
use intake_core::security::ServedFile;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_sanitized(&self, names: &[SanitizedName]) -> Result<()> {
        Self::output(&JsonOutput::success("sanitize", names))
    }

    fn format_scan_report(&self, report: &ScanReport) -> Result<()> {
        let output = match &report.outcome.detail {
            Some(detail) if !report.outcome.accepted => {
                JsonOutput::rejected("scan", report, detail.as_str())
            }
            _ => JsonOutput::success("scan", report),
        };
        Self::output(&output)
    }

    fn format_stored_file(&self, stored: &StoredFile) -> Result<()> {
        Self::output(&JsonOutput::success("ingest", stored))
    }

    fn format_served_file(&self, served: &ServedFile) -> Result<()> {
        #[derive(Serialize)]
        struct ServedOutput {
            path: String,
            size: u64,
            headers: BTreeMap<String, String>,
        }

        let data = ServedOutput {
            path: served.path.display().to_string(),
            size: served.size,
            headers: served
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
        };

        Self::output(&JsonOutput::success("serve-check", data))
    }

    fn format_policy(&self, config: &PolicyConfig) -> Result<()> {
        Self::output(&JsonOutput::success("policy", config))
    }

    fn format_error(&self, operation: &str, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error(operation, format!("{error:#}"));
        if let Ok(json) = serde_json::to_string_pretty(&output) {
            let _ = writeln!(io::stderr(), "{json}");
        }
    }
}
