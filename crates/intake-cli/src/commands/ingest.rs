//! Ingest command implementation

use super::original_name;
use crate::cli::IngestArgs;
use crate::error::add_upload_context;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use intake_core::UploadValidator;
use intake_core::UploadedFile;

/// Validates a staged file and moves it into the storage root.
///
/// The staged file is left where it is when declared metadata is rejected.
/// Once it has been moved, a failing byte-level check deletes it.
pub fn execute(
    args: &IngestArgs,
    validator: &UploadValidator,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let name = original_name(args.name.as_deref(), &args.file);
    let upload = UploadedFile::from_staged(name, args.mime.as_str(), &args.file)
        .with_context(|| format!("failed to read staged file '{}'", args.file.display()))?;

    let stored = add_upload_context(
        validator.ingest(&upload, &args.category, args.user.as_deref()),
        &args.file,
    )?;

    formatter.format_stored_file(&stored)
}
