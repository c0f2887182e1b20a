//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "intake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (and debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// JSON policy file (omitted fields keep their defaults)
    #[arg(long, global = true, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Storage root, overriding the policy's `storage_root`
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reduce untrusted filenames to safe stored names
    Sanitize(SanitizeArgs),
    /// Check a file's bytes against a declared type without touching it
    Scan(ScanArgs),
    /// Validate a staged file and move it into the storage root
    Ingest(IngestArgs),
    /// Resolve a stored file for serving, enforcing containment
    ServeCheck(ServeCheckArgs),
    /// Print the effective policy
    Policy,
    /// Generate shell completions
    Completion(CompletionArgs),
}

impl Commands {
    /// Subcommand name as typed on the command line.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sanitize(_) => "sanitize",
            Self::Scan(_) => "scan",
            Self::Ingest(_) => "ingest",
            Self::ServeCheck(_) => "serve-check",
            Self::Policy => "policy",
            Self::Completion(_) => "completion",
        }
    }
}

#[derive(clap::Args)]
pub struct SanitizeArgs {
    /// Filenames as sent by a client
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// File to inspect
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Declared MIME type
    #[arg(short, long, value_name = "TYPE")]
    pub mime: String,

    /// Original filename (default: the file's own name)
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Report every content finding instead of stopping at the first
    #[arg(short, long)]
    pub all: bool,
}

#[derive(clap::Args)]
pub struct IngestArgs {
    /// Staged file; it is moved into storage on success
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Upload category id
    #[arg(short, long, value_name = "ID")]
    pub category: String,

    /// Declared MIME type
    #[arg(short, long, value_name = "TYPE")]
    pub mime: String,

    /// Original filename (default: the file's own name)
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Owner id, adds a per-user subdirectory
    #[arg(short, long, value_name = "ID")]
    pub user: Option<String>,
}

#[derive(clap::Args)]
pub struct ServeCheckArgs {
    /// Requested path, absolute or relative to the storage root
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Identity of the requester, recorded on violations
    #[arg(long, value_name = "ID")]
    pub identity: Option<String>,

    /// Network address of the requester, recorded on violations
    #[arg(long, value_name = "ADDR")]
    pub address: Option<IpAddr>,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
