mod cli;
mod fixture;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, Result};
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands, CompareMode, DeleteDestinationArg, HardlinkPolicyArg, OutputFormat, SyncArgs};
use sync_core::compare::{DeleteConfirmationRequest, DeleteDestination};
use sync_core::config;
use sync_core::filter::{FilterChain, FilterConfig, HardlinkPolicy};
use sync_core::freshness::FreshnessMode;
use sync_core::location::{classify, NeverSingleObject};
use sync_core::orchestrator::{validate_pairing, SyncEndpoint, SyncOptions, SyncOrchestrator, SyncSummary};
use sync_core::processor::{Dispatcher, DryRunFormat, LoggingDispatcher, NullDispatcher};

/// Exit codes, per the CLI contract: 0 = in sync or fully synced, 1 = a
/// configuration/enumeration/dispatcher error stopped the run (including a
/// Ctrl-C cancellation), 99 = a dry run completed and, by its nature,
/// dispatched nothing — an internal "no exit" marker rather than a pass/fail
/// signal.
const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_DRY_RUN: u8 = 99;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run() -> Result<ExitCode> {
    color_eyre::install()?;
    let Cli { config_dir, command } = Cli::parse();
    if let Some(dir) = config_dir.as_ref() {
        config::set_config_dir(dir);
    }

    match command {
        Commands::Sync(args) => run_sync(args).await,
    }
}

async fn run_sync(args: SyncArgs) -> Result<ExitCode> {
    init_logging(&args.log_verbosity);

    let source_classified = classify(&args.source, args.source_location.as_deref(), &NeverSingleObject)
        .map_err(|err| eyre!(err))?;
    let destination_classified = classify(
        &args.destination,
        args.destination_location.as_deref(),
        &NeverSingleObject,
    )
    .map_err(|err| eyre!(err))?;

    let destination_exists = match destination_classified.kind {
        sync_core::location::EndpointKind::Local => std::path::Path::new(&args.destination).exists(),
        _ => args.destination_remote_fixture.is_some(),
    };
    validate_pairing(
        !source_classified.is_single_object,
        destination_exists,
        destination_classified.is_single_object,
        &args.destination,
    )
    .map_err(|err| eyre!(err))?;

    let filter = Arc::new(
        FilterChain::compile(&FilterConfig {
            include_glob: args.include_pattern.clone(),
            include_regex: args.include_regex.clone(),
            exclude_path: args.exclude_path.clone(),
            exclude_glob: args.exclude_pattern.clone(),
            exclude_regex: args.exclude_regex.clone(),
            follow_symlinks: args.preserve_symlinks,
            hardlink_policy: Some(match args.hardlink_policy {
                HardlinkPolicyArg::Follow => HardlinkPolicy::Follow,
                HardlinkPolicyArg::Skip => HardlinkPolicy::Skip,
            }),
        })
        .map_err(|err| eyre!(err))?,
    );

    let source_endpoint = build_endpoint(&args.source, &source_classified, args.source_remote_fixture.as_deref())?;
    let destination_endpoint = build_endpoint(
        &args.destination,
        &destination_classified,
        args.destination_remote_fixture.as_deref(),
    )?;

    let freshness = match args.compare_mode {
        CompareMode::SourceNewer => FreshnessMode::SourceNewer,
        CompareMode::SizeDiffers => FreshnessMode::SizeDiffers,
        CompareMode::DigestDiffers => FreshnessMode::DigestDiffers,
        CompareMode::Always => FreshnessMode::Always,
    };
    let delete_destination = match args.delete_destination {
        DeleteDestinationArg::True => DeleteDestination::True,
        DeleteDestinationArg::False => DeleteDestination::False,
        DeleteDestinationArg::Prompt => DeleteDestination::Prompt,
    };
    let options = SyncOptions {
        recursive: args.recursive,
        delete_destination,
        freshness,
        compute_digest: matches!(args.compare_mode, CompareMode::DigestDiffers),
        max_transfers_per_part: args
            .max_transfers_per_part
            .unwrap_or(sync_core::model::DEFAULT_MAX_TRANSFERS_PER_PART),
    };

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("received interrupt signal, cancelling sync");
            ctrl_c_token.cancel();
        }
    });

    let mut orchestrator = SyncOrchestrator::new(options, filter, cancellation);
    if matches!(delete_destination, DeleteDestination::Prompt) {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        orchestrator = orchestrator.with_delete_prompt_channel(tx);
        tokio::spawn(run_delete_prompts(rx));
    }

    let dispatcher: Box<dyn Dispatcher> = if args.dry_run {
        let format = match args.output_format {
            OutputFormat::Text => DryRunFormat::Text,
            OutputFormat::Json => DryRunFormat::Json,
        };
        Box::new(LoggingDispatcher::new(format))
    } else {
        Box::new(NullDispatcher)
    };

    match orchestrator
        .run(&source_endpoint, &destination_endpoint, dispatcher.as_ref())
        .await
    {
        Ok(summary) => {
            print_summary(&summary, args.output_format);
            if args.dry_run {
                Ok(ExitCode::from(EXIT_DRY_RUN))
            } else {
                Ok(ExitCode::from(EXIT_OK))
            }
        }
        Err(sync_core::SyncError::Cancelled) => {
            eprintln!("cancelled");
            Ok(ExitCode::from(EXIT_ERROR))
        }
        Err(err) => Err(eyre!(err)),
    }
}

/// Drives the `prompt` flow for `--delete-destination`: reads each
/// confirmation request as it arrives and asks on stdin, blocking the
/// comparator until answered. Reading stdin is blocking, so it runs on a
/// dedicated blocking task per request rather than stalling the runtime.
async fn run_delete_prompts(mut requests: tokio::sync::mpsc::Receiver<DeleteConfirmationRequest>) {
    while let Some(request) = requests.recv().await {
        let prompt = format!(
            "delete destination object with no source counterpart: {}? [y/N] ",
            request.candidate.relative_path
        );
        let answer = tokio::task::spawn_blocking(move || ask_yes_no(&prompt))
            .await
            .unwrap_or(false);
        let _ = request.respond.send(answer);
    }
}

fn ask_yes_no(prompt: &str) -> bool {
    use std::io::Write;
    eprint!("{prompt}");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn build_endpoint(
    literal: &str,
    classified: &sync_core::location::ClassifiedLocation,
    fixture_path: Option<&std::path::Path>,
) -> Result<SyncEndpoint> {
    use sync_core::location::EndpointKind;
    match classified.kind {
        EndpointKind::Local => Ok(SyncEndpoint::Local(std::path::PathBuf::from(literal))),
        kind => {
            let path = fixture_path.ok_or_else(|| {
                eyre!(
                    "{literal:?} is a remote endpoint; no live backend is wired into this build, \
                     pass a --*-remote-fixture JSON listing for a dry run"
                )
            })?;
            let (prefix, lister) = fixture::load(path)?;
            Ok(SyncEndpoint::Remote {
                kind,
                prefix,
                lister: Arc::new(lister),
            })
        }
    }
}

fn init_logging(verbosity: &str) {
    let env = env_logger::Env::default().default_filter_or(verbosity);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn print_summary(summary: &SyncSummary, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!(
                "source: {} object(s), destination: {} object(s)",
                summary.source_objects, summary.destination_objects
            );
            println!(
                "copy (new): {}, copy (stale): {}, delete: {}, parts: {}",
                summary.copy_new, summary.copy_stale, summary.delete, summary.parts_emitted
            );
            if summary.source_items_skipped > 0 || summary.destination_items_skipped > 0 {
                println!(
                    "skipped items: source={}, destination={}",
                    summary.source_items_skipped, summary.destination_items_skipped
                );
            }
        }
        OutputFormat::Json => {
            #[derive(serde::Serialize)]
            struct Json {
                source_objects: usize,
                destination_objects: usize,
                copy_new: usize,
                copy_stale: usize,
                delete: usize,
                parts_emitted: u64,
                source_items_skipped: usize,
                destination_items_skipped: usize,
            }
            let json = Json {
                source_objects: summary.source_objects,
                destination_objects: summary.destination_objects,
                copy_new: summary.copy_new,
                copy_stale: summary.copy_stale,
                delete: summary.delete,
                parts_emitted: summary.parts_emitted,
                source_items_skipped: summary.source_items_skipped,
                destination_items_skipped: summary.destination_items_skipped,
            };
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{text}"),
                Err(err) => log::error!("failed to serialize summary: {err}"),
            }
        }
    }
}
