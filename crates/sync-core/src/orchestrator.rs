//! Sync Orchestrator (§4.4, §5): wires classification, filtering, the two
//! traversals, the comparator, and the processor into one end-to-end run,
//! and owns the process-level concerns around that run (the advisory pid
//! file, the shared cancellation token).
//!
//! Grounded on the teacher crate's `orchestrator/orchestrator.rs`, which
//! plays the same "own the whole pipeline, stay free of any single step's
//! implementation details" role for a local-to-local copy; this version
//! generalizes it to the planner's four endpoint kinds and to planning
//! rather than byte transfer.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::compare::{compare, partition_counts, DeleteConfirmationRequest, DeleteDestination};
use crate::errors::{ConfigurationError, EnumerationError, Side, SyncError, SyncResult};
use crate::filter::FilterChain;
use crate::freshness::FreshnessMode;
use crate::index::Index;
use crate::location::EndpointKind;
use crate::processor::{Dispatcher, ProcessSummary, Processor};
use crate::traverse::{container, file_share, hierarchical_namespace, local, RemoteLister, TraverseEvent};

/// One side of a sync: either a local root or a remote prefix backed by a
/// `RemoteLister`. Built from a `ClassifiedLocation` by the caller (the CLI
/// layer), which is also where the literal endpoint string and any
/// credential/HTTP wiring belong (§1).
pub enum SyncEndpoint {
    Local(PathBuf),
    Remote {
        kind: EndpointKind,
        prefix: String,
        lister: Arc<dyn RemoteLister>,
    },
}

impl SyncEndpoint {
    fn kind(&self) -> EndpointKind {
        match self {
            SyncEndpoint::Local(_) => EndpointKind::Local,
            SyncEndpoint::Remote { kind, .. } => *kind,
        }
    }

    fn spawn_traversal(
        &self,
        recursive: bool,
        filter: Arc<FilterChain>,
        compute_digest: bool,
    ) -> (
        tokio::sync::mpsc::Receiver<TraverseEvent>,
        tokio::task::JoinHandle<Result<(), EnumerationError>>,
    ) {
        match self {
            SyncEndpoint::Local(root) => local::spawn(root.clone(), recursive, filter, compute_digest),
            SyncEndpoint::Remote { kind, prefix, lister } => match kind {
                EndpointKind::Container => {
                    container::spawn(lister.clone(), prefix.clone(), recursive, filter)
                }
                EndpointKind::FileShare => {
                    file_share::spawn(lister.clone(), prefix.clone(), recursive, filter)
                }
                EndpointKind::HierarchicalNamespace => {
                    hierarchical_namespace::spawn(lister.clone(), prefix.clone(), recursive, filter)
                }
                EndpointKind::Local => unreachable!("remote endpoint cannot have kind Local"),
            },
        }
    }
}

/// User-facing options for one sync run, collected from the CLI (§6).
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub recursive: bool,
    pub delete_destination: DeleteDestination,
    pub freshness: FreshnessMode,
    pub compute_digest: bool,
    pub max_transfers_per_part: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            delete_destination: DeleteDestination::False,
            freshness: FreshnessMode::SourceNewer,
            compute_digest: false,
            max_transfers_per_part: crate::model::DEFAULT_MAX_TRANSFERS_PER_PART,
        }
    }
}

/// Final accounting for a completed run.
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub source_objects: usize,
    pub destination_objects: usize,
    pub copy_new: usize,
    pub copy_stale: usize,
    pub delete: usize,
    pub parts_emitted: u64,
    pub source_items_skipped: usize,
    pub destination_items_skipped: usize,
}

/// Validate that the source/destination pairing is one this planner can
/// sync (§4.4). `destination_exists` and `destination_is_single_object` are
/// supplied by the caller's classification step, since only it has the
/// means to check (a local `Path::exists`, or a remote existence probe).
pub fn validate_pairing(
    source_is_collection: bool,
    destination_exists: bool,
    destination_is_single_object: bool,
    destination_literal: &str,
) -> Result<(), ConfigurationError> {
    if source_is_collection && destination_is_single_object {
        return Err(ConfigurationError::TypeMismatch {
            source_kind: "collection".to_string(),
            destination: destination_literal.to_string(),
        });
    }
    if source_is_collection && !destination_exists {
        return Err(ConfigurationError::DestinationMissing {
            destination: destination_literal.to_string(),
        });
    }
    Ok(())
}

/// Runs one full sync: traverse both sides concurrently, materialize them
/// into indexes, compare, and dispatch the resulting `JobPartOrder`s.
pub struct SyncOrchestrator {
    options: SyncOptions,
    filter: Arc<FilterChain>,
    cancellation: CancellationToken,
    delete_prompt: Option<tokio::sync::mpsc::Sender<DeleteConfirmationRequest>>,
}

impl SyncOrchestrator {
    pub fn new(options: SyncOptions, filter: Arc<FilterChain>, cancellation: CancellationToken) -> Self {
        Self {
            options,
            filter,
            cancellation,
            delete_prompt: None,
        }
    }

    /// Supply the channel `compare` blocks on for each destination-only
    /// object when `options.delete_destination` is `Prompt` (§4.5 step 2).
    /// The caller (the CLI) owns the other end and is responsible for
    /// answering every request it receives.
    pub fn with_delete_prompt_channel(mut self, sender: tokio::sync::mpsc::Sender<DeleteConfirmationRequest>) -> Self {
        self.delete_prompt = Some(sender);
        self
    }

    pub async fn run(
        &self,
        source: &SyncEndpoint,
        destination: &SyncEndpoint,
        dispatcher: &dyn Dispatcher,
    ) -> SyncResult<SyncSummary> {
        let _pid_guard = PidGuard::acquire()?;

        let (source_rx, source_join) =
            source.spawn_traversal(self.options.recursive, self.filter.clone(), self.options.compute_digest);
        let (destination_rx, destination_join) =
            destination.spawn_traversal(self.options.recursive, self.filter.clone(), false);

        let cancel_for_source = self.cancellation.clone();
        let cancel_for_destination = self.cancellation.clone();

        let source_index_fut = async {
            tokio::select! {
                result = Index::build(Side::Source, source_rx, source_join) => result,
                _ = cancel_for_source.cancelled() => Err(SyncError::Cancelled),
            }
        };
        let destination_index_fut = async {
            tokio::select! {
                result = Index::build(Side::Destination, destination_rx, destination_join) => result,
                _ = cancel_for_destination.cancelled() => Err(SyncError::Cancelled),
            }
        };

        let (source_index, destination_index) = tokio::try_join!(source_index_fut, destination_index_fut)
            .inspect_err(|_| self.cancellation.cancel())?;

        if self.cancellation.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let decisions = compare(
            &source_index,
            &destination_index,
            self.options.freshness,
            self.options.delete_destination,
            self.delete_prompt.as_ref(),
        )
        .await;
        let (copy_new, copy_stale, delete) = partition_counts(&decisions);

        let ProcessSummary {
            total_transfers: _,
            parts_emitted,
        } = Processor::new(self.options.max_transfers_per_part)
            .process(decisions, dispatcher)
            .await?;

        Ok(SyncSummary {
            source_objects: source_index.len(),
            destination_objects: destination_index.len(),
            copy_new,
            copy_stale,
            delete,
            parts_emitted,
            source_items_skipped: source_index.skipped().len(),
            destination_items_skipped: destination_index.skipped().len(),
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

/// Advisory marker preventing two sync runs from sharing one config
/// directory concurrently (§5). Best-effort: a stale pid file from a
/// crashed process is reclaimed rather than treated as fatal, since there is
/// no cross-platform `flock` equivalent in the teacher's dependency stack.
struct PidGuard {
    path: PathBuf,
}

impl PidGuard {
    fn acquire() -> SyncResult<Self> {
        let path = crate::config::pid_file_path().map_err(|err| {
            SyncError::Configuration(ConfigurationError::InvalidFilter {
                pattern: "pid-file".to_string(),
                message: err.to_string(),
            })
        })?;
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(existing) = std::fs::read_to_string(&path) {
            if let Ok(pid) = existing.trim().parse::<u32>() {
                if process_is_alive(pid) {
                    log::warn!(
                        "pid file {} claims sync-planner pid {pid} is already running; proceeding anyway",
                        path.display()
                    );
                }
            }
        }
        let _ = std::fs::write(&path, std::process::id().to_string());
        Ok(Self { path })
    }
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn process_is_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn process_is_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterConfig;
    use crate::processor::NullDispatcher;
    use std::fs;

    fn filter() -> Arc<FilterChain> {
        Arc::new(FilterChain::compile(&FilterConfig::default()).unwrap())
    }

    #[test]
    fn validate_pairing_rejects_collection_into_single_object() {
        let err = validate_pairing(true, true, true, "dst").unwrap_err();
        assert!(matches!(err, ConfigurationError::TypeMismatch { .. }));
    }

    #[test]
    fn validate_pairing_rejects_missing_destination_for_collection_source() {
        let err = validate_pairing(true, false, false, "dst").unwrap_err();
        assert!(matches!(err, ConfigurationError::DestinationMissing { .. }));
    }

    #[test]
    fn validate_pairing_accepts_matching_collections() {
        assert!(validate_pairing(true, true, false, "dst").is_ok());
    }

    #[tokio::test]
    async fn local_to_local_sync_emits_expected_summary() {
        let source_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        fs::write(source_dir.path().join("a.txt"), b"hello").unwrap();
        fs::write(dest_dir.path().join("stale.txt"), b"old").unwrap();

        let config_override = tempfile::tempdir().unwrap();
        crate::config::set_config_dir(config_override.path());

        let orchestrator = SyncOrchestrator::new(
            SyncOptions {
                delete_destination: DeleteDestination::True,
                ..Default::default()
            },
            filter(),
            CancellationToken::new(),
        );
        let summary = orchestrator
            .run(
                &SyncEndpoint::Local(source_dir.path().to_path_buf()),
                &SyncEndpoint::Local(dest_dir.path().to_path_buf()),
                &NullDispatcher,
            )
            .await
            .unwrap();

        assert_eq!(summary.copy_new, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(summary.parts_emitted, 1);
        crate::config::clear_config_dir_override();
    }
}
