//! Comparator (§4.6): the two-phase set-difference that turns a source index
//! and a destination index into transfer/delete decisions.
//!
//! Grounded on the teacher crate's `manifest.rs` diffing pass, generalized
//! from a single local-vs-local diff to the planner's source/destination
//! index pair, and on `copy/compare.rs`'s per-file comparison, which is
//! where `freshness.rs` picks up.
//!
//! Per §9, the source index is always fully materialized first (the
//! `Index::build` phase); the comparator here only ever streams the
//! destination side against an already-complete source, since traversers
//! make no ordering guarantee and a true streaming merge-join would require
//! both sides sorted the same way.

use tokio::sync::{mpsc, oneshot};

use crate::freshness::FreshnessMode;
use crate::index::Index;
use crate::model::{StoredObject, TransferOrder};

/// The three-valued `--delete-destination` setting (§6): always delete,
/// never delete, or ask before each deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDestination {
    True,
    False,
    Prompt,
}

/// One destination-only object awaiting a delete/skip answer, sent to
/// whichever side of the orchestrator's prompt channel is listening (the
/// CLI's stdin loop in a live run, a scripted responder in tests). Dropping
/// `respond` without sending is treated the same as an explicit `no`
/// (§4.5 step 2: "answer `no` skips").
#[derive(Debug)]
pub struct DeleteConfirmationRequest {
    pub candidate: StoredObject,
    pub respond: oneshot::Sender<bool>,
}

/// One decision the comparator reaches for a single relative path.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Exists only on the source: copy it.
    CopyNew(TransferOrder),
    /// Exists on both sides but the freshness predicate says to re-copy.
    CopyStale(TransferOrder),
    /// Exists only on the destination and `deleteDestination` is enabled.
    Delete(TransferOrder),
}

impl Decision {
    pub fn into_transfer_order(self) -> TransferOrder {
        match self {
            Decision::CopyNew(order) | Decision::CopyStale(order) | Decision::Delete(order) => order,
        }
    }
}

/// Compare a fully materialized source index against a fully materialized
/// destination index, yielding the full set of decisions in one pass.
///
/// `delete_destination` controls whether destination-only objects produce a
/// `Decision::Delete`: `False` silently ignores them, `True` deletes every
/// one, and `Prompt` asks on `prompt` per §4.5 step 2 — each candidate blocks
/// on a response from the orchestrator-supplied channel, and a `no` (or a
/// channel that never answers) skips just that one deletion. `prompt` must
/// be `Some` whenever `delete_destination` is `Prompt`; with no channel
/// configured every candidate is treated as answered `no`.
///
/// A destination-only directory-marker object is deleted like any other
/// destination-only `StoredObject` (the Folder entity type carries no
/// special case here) — the decided Open Question recorded in SPEC_FULL.md
/// §9: a marker with nothing left under it is itself stale.
pub async fn compare(
    source: &Index,
    destination: &Index,
    freshness: FreshnessMode,
    delete_destination: DeleteDestination,
    prompt: Option<&mpsc::Sender<DeleteConfirmationRequest>>,
) -> Vec<Decision> {
    let mut decisions = Vec::with_capacity(source.len());

    for source_object in source.iter() {
        match destination.get(&source_object.relative_path) {
            None => {
                decisions.push(Decision::CopyNew(TransferOrder::copy(
                    source_object.clone(),
                    source_object.relative_path.clone(),
                )));
            }
            Some(destination_object) => {
                if source_object.is_folder() && destination_object.is_folder() {
                    continue;
                }
                if freshness.needs_transfer(source_object, destination_object) {
                    decisions.push(Decision::CopyStale(TransferOrder::copy(
                        source_object.clone(),
                        source_object.relative_path.clone(),
                    )));
                }
            }
        }
    }

    if delete_destination != DeleteDestination::False {
        for destination_object in destination.iter() {
            if !source.contains(&destination_object.relative_path) {
                let confirmed = match delete_destination {
                    DeleteDestination::True => true,
                    DeleteDestination::False => unreachable!("outer guard excludes False"),
                    DeleteDestination::Prompt => confirm_delete(destination_object, prompt).await,
                };
                if confirmed {
                    decisions.push(Decision::Delete(TransferOrder::delete(destination_object.clone())));
                }
            }
        }
    }

    decisions
}

/// Ask the orchestrator's prompt channel whether `candidate` should be
/// deleted, blocking until it answers. No channel, a closed channel, or a
/// dropped response all count as `no`.
async fn confirm_delete(candidate: &StoredObject, prompt: Option<&mpsc::Sender<DeleteConfirmationRequest>>) -> bool {
    let Some(sender) = prompt else {
        log::warn!(
            "delete-destination=prompt but no prompt channel is configured; skipping {}",
            candidate.relative_path
        );
        return false;
    };
    let (respond, answer) = oneshot::channel();
    if sender
        .send(DeleteConfirmationRequest {
            candidate: candidate.clone(),
            respond,
        })
        .await
        .is_err()
    {
        return false;
    }
    answer.await.unwrap_or(false)
}

/// Partition decisions by kind, for callers (tests, summaries) that want
/// counts without caring about per-item ordering.
pub fn partition_counts(decisions: &[Decision]) -> (usize, usize, usize) {
    let mut copy_new = 0;
    let mut copy_stale = 0;
    let mut delete = 0;
    for decision in decisions {
        match decision {
            Decision::CopyNew(_) => copy_new += 1,
            Decision::CopyStale(_) => copy_stale += 1,
            Decision::Delete(_) => delete += 1,
        }
    }
    (copy_new, copy_stale, delete)
}
