use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sync-planner")]
#[command(about = "Plans a one-way, incremental sync between two endpoints")]
pub struct Cli {
    /// Override the configuration directory for this invocation
    #[arg(long, global = true, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Plan (and optionally dispatch) a sync from source to destination
    Sync(SyncArgs),
}

#[derive(clap::Args, Clone, Debug)]
pub struct SyncArgs {
    /// Source endpoint (local path, or an https:// URL for a remote endpoint)
    pub source: String,
    /// Destination endpoint
    pub destination: String,

    /// Explicit endpoint kind hint, when the literal string is ambiguous
    #[arg(long, value_name = "KIND")]
    pub source_location: Option<String>,
    #[arg(long, value_name = "KIND")]
    pub destination_location: Option<String>,

    /// Descend into subdirectories/prefixes
    #[arg(long, default_value_t = true)]
    pub recursive: bool,

    /// Semicolon-separated glob patterns; an object must match at least one
    /// to be considered (applies to the file/blob name only)
    #[arg(long, value_name = "PATTERNS", default_value = "")]
    pub include_pattern: String,
    /// Semicolon-separated glob patterns to exclude by name
    #[arg(long, value_name = "PATTERNS", default_value = "")]
    pub exclude_pattern: String,
    /// Semicolon-separated anchored regular expressions to include, matched
    /// against the full relative path
    #[arg(long, value_name = "PATTERNS", default_value = "")]
    pub include_regex: String,
    /// Semicolon-separated anchored regular expressions to exclude
    #[arg(long, value_name = "PATTERNS", default_value = "")]
    pub exclude_regex: String,
    /// Semicolon-separated relative directory paths to prune entirely
    #[arg(long, value_name = "PATHS", default_value = "")]
    pub exclude_path: String,

    /// Delete destination objects that no longer exist on the source:
    /// `true` deletes every one, `false` leaves them, `prompt` asks before
    /// each deletion
    #[arg(long, value_enum, default_value_t = DeleteDestinationArg::False)]
    pub delete_destination: DeleteDestinationArg,

    /// How to decide whether an object present on both sides is stale
    #[arg(long, value_enum, default_value_t = CompareMode::SourceNewer)]
    pub compare_mode: CompareMode,

    /// Emit symlinks as regular files instead of skipping them
    #[arg(long)]
    pub preserve_symlinks: bool,

    /// How to treat hardlinked source files
    #[arg(long, value_enum, default_value_t = HardlinkPolicyArg::Follow)]
    pub hardlink_policy: HardlinkPolicyArg,

    /// Plan the sync and log the resulting job parts without dispatching them
    #[arg(long)]
    pub dry_run: bool,

    /// How to print the final summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Log verbosity passed through to env_logger
    #[arg(long, default_value = "info")]
    pub log_verbosity: String,

    /// Maximum transfers per dispatched job part
    #[arg(long)]
    pub max_transfers_per_part: Option<usize>,

    /// JSON listing fixture standing in for a live remote backend when
    /// `source` is a remote endpoint kind
    #[arg(long, hide = true, value_name = "PATH")]
    pub source_remote_fixture: Option<PathBuf>,
    /// Same as `--source-remote-fixture`, for the destination endpoint
    #[arg(long, hide = true, value_name = "PATH")]
    pub destination_remote_fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeleteDestinationArg {
    True,
    False,
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompareMode {
    SourceNewer,
    SizeDiffers,
    DigestDiffers,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HardlinkPolicyArg {
    Follow,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
