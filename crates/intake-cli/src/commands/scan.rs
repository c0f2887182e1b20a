//! Scan command implementation

use super::original_name;
use crate::cli::ScanArgs;
use crate::error::add_upload_context;
use crate::error::convert_upload_error;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use intake_core::UploadValidator;
use intake_core::ValidationOutcome;
use intake_core::formats::Detection;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Verdict of a non-destructive scan.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub path: PathBuf,
    pub original_name: String,
    pub declared_mime_type: String,
    pub detected_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malicious_format: Option<&'static str>,
    pub size_bytes: u64,
    pub outcome: ValidationOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
}

/// A single content-check failure.
#[derive(Debug, Serialize)]
pub struct Finding {
    pub reason_code: &'static str,
    pub detail: String,
}

/// Runs every post-write check on `args.file` without moving or deleting it.
///
/// With `--all`, every content check runs over the scan window and all
/// failures are listed, not only the first.
pub fn execute(
    args: &ScanArgs,
    validator: &UploadValidator,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let name = original_name(args.name.as_deref(), &args.file);

    let result = match validator.check_stored_file(&args.file, &args.mime, &name) {
        Err(err) if !err.is_security_violation() => {
            return Err(convert_upload_error(err, &args.file));
        }
        other => other,
    };

    let detection = validator
        .detect(&args.file)
        .map_err(|err| convert_upload_error(err, &args.file))?;
    let malicious_format = match detection {
        Detection::Malicious { format } => Some(format),
        Detection::Known(_) | Detection::Unknown => None,
    };

    let file = File::open(&args.file)
        .with_context(|| format!("failed to open '{}'", args.file.display()))?;
    let size_bytes = file.metadata()?.len();

    let findings = if args.all {
        let mut window = Vec::new();
        file.take(validator.config().scan_limit as u64)
            .read_to_end(&mut window)
            .with_context(|| format!("failed to read '{}'", args.file.display()))?;
        validator
            .scanner()
            .findings(&window, &args.mime)
            .iter()
            .map(|err| Finding {
                reason_code: err.reason_code(),
                detail: err.to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let report = ScanReport {
        path: args.file.clone(),
        original_name: name,
        declared_mime_type: args.mime.clone(),
        detected_mime_type: detection.mime_type(),
        malicious_format,
        size_bytes,
        outcome: ValidationOutcome::from_result(&result),
        findings,
    };

    tracing::debug!(
        path = %report.path.display(),
        accepted = report.outcome.accepted,
        findings = report.findings.len(),
        "scan finished"
    );

    formatter.format_scan_report(&report)?;

    add_upload_context(result, &args.file)
}
