//! Traversers (§4.3): one per endpoint kind. Each produces a lazy sequence
//! of `StoredObject`s rooted at a prefix, honoring the filter chain inline
//! so rejected objects never reach the indexer or comparator.
//!
//! Every traverser follows the teacher crate's thread-plus-channel idiom
//! (`blit-core::transfer_facade::planner::stream_local_plan`): enumeration
//! runs on its own task and streams `TraverseEvent`s back over a bounded
//! channel, with the final `Result` delivered once enumeration finishes.

pub mod container;
pub mod file_share;
pub mod hierarchical_namespace;
pub mod local;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::errors::{EnumerationError, ItemError};
use crate::model::{EntityType, StoredObject};

/// One event from a running traversal.
#[derive(Debug)]
pub enum TraverseEvent {
    Object(StoredObject),
    /// A single object could not be read; the sync continues (§7).
    Skipped(ItemError),
}

/// Channel capacity for traversal-to-consumer handoff. Bounded so a slow
/// indexer/comparator applies backpressure to a fast traverser.
pub const TRAVERSE_CHANNEL_CAPACITY: usize = 256;

pub type TraverseReceiver = mpsc::Receiver<TraverseEvent>;

/// One page of a paginated remote listing.
#[derive(Debug, Clone)]
pub struct RemoteListingPage {
    pub entries: Vec<RemoteEntry>,
    /// `None` signals the end of the listing. Per §4.3, a pagination loop
    /// terminates only once this is `None` after at least one page.
    pub continuation_token: Option<String>,
}

/// A single entry as reported by a remote listing call, before it is turned
/// into a canonical `StoredObject`.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub relative_path: String,
    pub entity_type: EntityType,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    pub content_digest: Option<Vec<u8>>,
    /// Set when the service's metadata marks this as a zero-byte
    /// directory-marker object (§4.3, §9's `hdi_isfolder=true` constant).
    pub is_folder_marker: bool,
}

/// Name of the service-specific metadata key that flags a directory-marker
/// object, kept as a named constant per §9 so new stores can be added by
/// extending a lister's metadata inspection rather than the comparator.
pub const FOLDER_MARKER_METADATA_KEY: &str = "hdi_isfolder";

/// Backend for listing a remote endpoint one page at a time. A real
/// implementation wraps the HTTP pipeline (out of scope for this crate,
/// §1); `container::tests`/`file_share::tests`/etc. use an in-memory
/// `StaticRemoteLister`.
pub trait RemoteLister: Send + Sync {
    /// List one page of entries under `prefix`. `continuation` is `None` on
    /// the first call for a given prefix.
    fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<RemoteListingPage, EnumerationError>;
}

/// In-memory `RemoteLister` used by tests and by the dry-run CLI path when
/// no live backend is configured. Pages are pre-seeded per prefix.
#[derive(Debug, Default, Clone)]
pub struct StaticRemoteLister {
    pages: std::collections::HashMap<String, Vec<RemoteListingPage>>,
}

impl StaticRemoteLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sequence of pages returned for `prefix`, in order.
    pub fn seed(mut self, prefix: impl Into<String>, pages: Vec<RemoteListingPage>) -> Self {
        self.pages.insert(prefix.into(), pages);
        self
    }

    /// Convenience for a single-page, non-paginated listing.
    pub fn seed_one_page(self, prefix: impl Into<String>, entries: Vec<RemoteEntry>) -> Self {
        self.seed(
            prefix,
            vec![RemoteListingPage {
                entries,
                continuation_token: None,
            }],
        )
    }
}

impl RemoteLister for StaticRemoteLister {
    fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<RemoteListingPage, EnumerationError> {
        let pages = self.pages.get(prefix).ok_or_else(|| EnumerationError::Remote {
            prefix: prefix.to_string(),
            message: "no pages seeded for prefix".to_string(),
        })?;
        let index: usize = match continuation {
            None => 0,
            Some(token) => token.parse().map_err(|_| EnumerationError::Remote {
                prefix: prefix.to_string(),
                message: format!("invalid continuation token {token:?}"),
            })?,
        };
        let mut page = pages
            .get(index)
            .cloned()
            .ok_or_else(|| EnumerationError::Remote {
                prefix: prefix.to_string(),
                message: format!("continuation token {index} out of range"),
            })?;
        if index + 1 < pages.len() {
            page.continuation_token = Some((index + 1).to_string());
        } else {
            page.continuation_token = None;
        }
        Ok(page)
    }
}

/// Build a `StoredObject` from a listing entry relative to `root_prefix`.
pub(crate) fn object_from_remote_entry(root_prefix: &str, entry: RemoteEntry) -> StoredObject {
    let relative = strip_root_prefix(root_prefix, &entry.relative_path);
    let mut object = StoredObject::new(relative, entry.entity_type, entry.last_modified, entry.size);
    if let Some(digest) = entry.content_digest {
        object = object.with_digest(digest);
    }
    object.endpoint_metadata.is_folder_marker = entry.is_folder_marker;
    object
}

fn strip_root_prefix(root_prefix: &str, full_path: &str) -> String {
    let root = root_prefix.trim_matches('/');
    let full = full_path.trim_matches('/');
    if root.is_empty() {
        full.to_string()
    } else {
        full.strip_prefix(root)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .unwrap_or_else(|| full.to_string())
    }
}

/// Shared recursive-directory walk used by `file_share` and
/// `hierarchical_namespace`: unlike `container`, both list one true
/// directory at a time and must recurse into child folders explicitly.
/// They differ only in how their `RemoteLister` determines entity type
/// (native directory entries for file shares vs. an explicit ADLS path
/// type attribute), which is already resolved by the time entries reach
/// this function.
pub(crate) fn hierarchical_walk(
    lister: &dyn RemoteLister,
    root_prefix: &str,
    recursive: bool,
    filter: &crate::filter::FilterChain,
    tx: &mpsc::Sender<TraverseEvent>,
) -> Result<(), EnumerationError> {
    use crate::filter::{Candidate, FilterDecision};

    let mut pending = vec![root_prefix.trim_matches('/').to_string()];
    while let Some(dir_prefix) = pending.pop() {
        let mut continuation: Option<String> = None;
        loop {
            let page = lister.list_page(&dir_prefix, continuation.as_deref())?;
            for entry in page.entries {
                let is_folder = entry.entity_type == crate::model::EntityType::Folder;
                let full_path = entry.relative_path.clone();
                let object = object_from_remote_entry(root_prefix, entry);

                let candidate = Candidate {
                    relative_path: &object.relative_path,
                    name: &object.name,
                    entity_type: object.entity_type,
                    hardlink_inode: None,
                };
                match filter.evaluate(&candidate) {
                    FilterDecision::Accept => {
                        if tx.blocking_send(TraverseEvent::Object(object)).is_err() {
                            return Ok(());
                        }
                        if is_folder && recursive {
                            pending.push(full_path);
                        }
                    }
                    FilterDecision::RejectAndPrune => {}
                    FilterDecision::Reject => {
                        if is_folder && recursive && !filter.should_prune_dir(&full_path) {
                            pending.push(full_path);
                        }
                    }
                }
            }
            continuation = page.continuation_token;
            if continuation.is_none() {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_root_prefix_removes_root_and_leading_slash() {
        assert_eq!(strip_root_prefix("adlsdir", "adlsdir/a"), "a");
        assert_eq!(strip_root_prefix("", "a/b"), "a/b");
        assert_eq!(strip_root_prefix("root/", "root/child/x"), "child/x");
    }

    #[test]
    fn static_lister_paginates_until_continuation_is_empty() {
        let lister = StaticRemoteLister::new().seed(
            "c",
            vec![
                RemoteListingPage {
                    entries: vec![],
                    continuation_token: None,
                },
                RemoteListingPage {
                    entries: vec![],
                    continuation_token: None,
                },
            ],
        );
        let first = lister.list_page("c", None).unwrap();
        assert_eq!(first.continuation_token.as_deref(), Some("1"));
        let second = lister.list_page("c", first.continuation_token.as_deref()).unwrap();
        assert_eq!(second.continuation_token, None);
    }
}
