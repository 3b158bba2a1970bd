//! Processor (§4.8): batches comparator decisions into `JobPartOrder`s and
//! hands them to a pluggable `Dispatcher`, the seam between this planner and
//! the external transfer engine (§1).
//!
//! Grounded on the teacher crate's `WorkerFactory` trait plus its concrete
//! implementations (`transfer_facade`): one trait at the boundary, several
//! interchangeable implementations behind it, none of which the planner
//! itself depends on concretely.

use async_trait::async_trait;
use serde::Serialize;

use crate::compare::Decision;
use crate::errors::DispatcherError;
use crate::model::{EntityType, JobPartOrder, TransferOrder, TransferOrderKind, DEFAULT_MAX_TRANSFERS_PER_PART};

/// Receives completed `JobPartOrder`s. A real implementation forwards them
/// to the transfer engine's job-part queue; `LoggingDispatcher` and the test
/// doubles below stand in when there is no live transfer engine to hand off
/// to, which is always true within this crate's own scope (§1).
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, part: JobPartOrder) -> Result<(), DispatcherError>;
}

/// Selects how `LoggingDispatcher` prints each decision, mirroring the
/// CLI's `--output-format` flag (§6) one level down from the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DryRunFormat {
    #[default]
    Text,
    Json,
}

/// One dry-run decision, serialized as the JSON object `--output-format
/// json` emits per line: `{Source, Destination, EntityType, BlobType}`.
#[derive(Serialize)]
struct DryRunRecord {
    #[serde(rename = "Source")]
    source: Option<String>,
    #[serde(rename = "Destination")]
    destination: String,
    #[serde(rename = "EntityType")]
    entity_type: EntityType,
    #[serde(rename = "BlobType")]
    blob_type: &'static str,
}

fn blob_type(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::File => "BlockBlob",
        EntityType::Folder => "Folder",
        EntityType::Symlink => "Symlink",
        EntityType::HardLink => "HardLink",
        EntityType::Other => "Other",
    }
}

/// Dispatcher used for `--dry-run`: prints one line per decision, in either
/// plain text or JSON per `format`, and never fails, so a dry run can
/// exercise the whole planning pipeline without a transfer engine present.
#[derive(Debug, Default)]
pub struct LoggingDispatcher {
    format: DryRunFormat,
}

impl LoggingDispatcher {
    pub fn new(format: DryRunFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Dispatcher for LoggingDispatcher {
    async fn dispatch(&self, part: JobPartOrder) -> Result<(), DispatcherError> {
        for transfer in &part.transfers {
            match self.format {
                DryRunFormat::Text => match transfer.kind {
                    TransferOrderKind::Copy => println!(
                        "DRYRUN: copy {} \u{2192} {}",
                        transfer.source.as_deref().unwrap_or("-"),
                        transfer.destination
                    ),
                    TransferOrderKind::Delete => println!("DRYRUN: remove {}", transfer.destination),
                },
                DryRunFormat::Json => {
                    let record = DryRunRecord {
                        source: transfer.source.clone(),
                        destination: transfer.destination.clone(),
                        entity_type: transfer.entity_type,
                        blob_type: blob_type(transfer.entity_type),
                    };
                    match serde_json::to_string(&record) {
                        Ok(line) => println!("{line}"),
                        Err(err) => log::error!("failed to serialize dry-run record: {err}"),
                    }
                }
            }
        }
        Ok(())
    }
}

/// Dispatcher that discards every part. Used where only the count of parts
/// and transfers matters (e.g. a summary-only CLI invocation).
#[derive(Debug, Default)]
pub struct NullDispatcher;

#[async_trait]
impl Dispatcher for NullDispatcher {
    async fn dispatch(&self, _part: JobPartOrder) -> Result<(), DispatcherError> {
        Ok(())
    }
}

/// Dispatcher that forwards every part over an async channel, for tests and
/// for in-process callers that want to consume parts themselves.
pub struct ChannelDispatcher {
    sender: tokio::sync::mpsc::Sender<JobPartOrder>,
}

impl ChannelDispatcher {
    pub fn new(sender: tokio::sync::mpsc::Sender<JobPartOrder>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn dispatch(&self, part: JobPartOrder) -> Result<(), DispatcherError> {
        self.sender
            .send(part)
            .await
            .map_err(|_| DispatcherError {
                part_number: 0,
                message: "dispatcher channel closed".to_string(),
            })
    }
}

/// Splits a decision stream into `JobPartOrder`s of at most
/// `max_transfers_per_part` transfers each and dispatches them in order.
///
/// Per §4.8: the final part is always emitted and marked `is_final_part`,
/// even if it is empty (an all-in-sync run with zero decisions still
/// produces one empty final part, so a transfer engine waiting on a part
/// stream always sees a clean end).
pub struct Processor {
    max_transfers_per_part: usize,
}

impl Default for Processor {
    fn default() -> Self {
        Self {
            max_transfers_per_part: DEFAULT_MAX_TRANSFERS_PER_PART,
        }
    }
}

impl Processor {
    pub fn new(max_transfers_per_part: usize) -> Self {
        Self {
            max_transfers_per_part: max_transfers_per_part.max(1),
        }
    }

    pub async fn process(
        &self,
        decisions: Vec<Decision>,
        dispatcher: &dyn Dispatcher,
    ) -> Result<ProcessSummary, DispatcherError> {
        let transfers: Vec<TransferOrder> = decisions.into_iter().map(Decision::into_transfer_order).collect();
        let total = transfers.len();
        let mut chunks = transfers.chunks(self.max_transfers_per_part).peekable();
        let mut part_number = 0u64;
        let mut parts_emitted = 0u64;

        if chunks.peek().is_none() {
            dispatcher
                .dispatch(JobPartOrder {
                    part_number,
                    is_final_part: true,
                    transfers: Vec::new(),
                })
                .await
                .map_err(|mut err| {
                    err.part_number = part_number;
                    err
                })?;
            return Ok(ProcessSummary {
                total_transfers: total,
                parts_emitted: 1,
            });
        }

        while let Some(chunk) = chunks.next() {
            let is_final_part = chunks.peek().is_none();
            dispatcher
                .dispatch(JobPartOrder {
                    part_number,
                    is_final_part,
                    transfers: chunk.to_vec(),
                })
                .await
                .map_err(|mut err| {
                    err.part_number = part_number;
                    err
                })?;
            parts_emitted += 1;
            part_number += 1;
        }

        Ok(ProcessSummary {
            total_transfers: total,
            parts_emitted,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessSummary {
    pub total_transfers: usize,
    pub parts_emitted: u64,
}
