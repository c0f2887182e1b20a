//! Sanitize command implementation

use crate::cli::SanitizeArgs;
use crate::output::OutputFormatter;
use anyhow::Result;
use intake_core::sanitize_filename;
use serde::Serialize;

/// One input name and what it sanitizes to.
#[derive(Debug, Serialize)]
pub struct SanitizedName {
    pub original: String,
    pub sanitized: String,
}

pub fn execute(args: &SanitizeArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let names: Vec<SanitizedName> = args
        .names
        .iter()
        .map(|original| SanitizedName {
            original: original.clone(),
            sanitized: sanitize_filename(original),
        })
        .collect();

    formatter.format_sanitized(&names)
}
