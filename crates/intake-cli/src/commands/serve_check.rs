//! Serve-check command implementation

use crate::cli::ServeCheckArgs;
use crate::error::add_upload_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use intake_core::UploadValidator;
use intake_core::security::Requester;

pub fn execute(
    args: &ServeCheckArgs,
    validator: &UploadValidator,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let requester = Requester::new(args.identity.clone(), args.address);

    let served = add_upload_context(
        validator.resolve_for_serving(&args.path, &requester),
        &args.path,
    )?;

    formatter.format_served_file(&served)
}
