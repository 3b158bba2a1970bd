//! Object-container traverser (§4.3): a flat namespace with no true
//! directories. A "folder" only exists as a zero-byte directory-marker blob
//! (`hdi_isfolder=true`) or implicitly, as a path prefix shared by other
//! blobs. Listing is a single paginated prefix scan; there is no recursive
//! per-directory walk the way there is for `file_share`/`hierarchical_namespace`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::errors::EnumerationError;
use crate::filter::{Candidate, FilterChain, FilterDecision};
use crate::model::StoredObject;

use super::{object_from_remote_entry, RemoteLister, TraverseEvent, TRAVERSE_CHANNEL_CAPACITY};

/// Spawn a container traversal. `recursive = false` keeps only entries whose
/// relative path has no further `/` beyond the root prefix, emulating a
/// single-level listing over a flat namespace.
pub fn spawn(
    lister: Arc<dyn RemoteLister>,
    prefix: String,
    recursive: bool,
    filter: Arc<FilterChain>,
) -> (
    mpsc::Receiver<TraverseEvent>,
    tokio::task::JoinHandle<Result<(), EnumerationError>>,
) {
    let (tx, rx) = mpsc::channel(TRAVERSE_CHANNEL_CAPACITY);
    let handle = tokio::task::spawn_blocking(move || list(&*lister, &prefix, recursive, &filter, &tx));
    (rx, handle)
}

fn list(
    lister: &dyn RemoteLister,
    prefix: &str,
    recursive: bool,
    filter: &FilterChain,
    tx: &mpsc::Sender<TraverseEvent>,
) -> Result<(), EnumerationError> {
    let mut continuation: Option<String> = None;
    loop {
        let page = lister.list_page(prefix, continuation.as_deref())?;
        for entry in page.entries {
            let object = object_from_remote_entry(prefix, entry);
            if !recursive && object.relative_path.contains('/') {
                continue;
            }
            if emit_if_accepted(object, filter, tx).is_err() {
                return Ok(());
            }
        }
        continuation = page.continuation_token;
        if continuation.is_none() {
            break;
        }
    }
    Ok(())
}

fn emit_if_accepted(
    object: StoredObject,
    filter: &FilterChain,
    tx: &mpsc::Sender<TraverseEvent>,
) -> Result<(), ()> {
    let candidate = Candidate {
        relative_path: &object.relative_path,
        name: &object.name,
        entity_type: object.entity_type,
        hardlink_inode: None,
    };
    match filter.evaluate(&candidate) {
        FilterDecision::Accept => tx
            .blocking_send(TraverseEvent::Object(object))
            .map_err(|_| ()),
        FilterDecision::Reject | FilterDecision::RejectAndPrune => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterConfig;
    use crate::model::EntityType;
    use crate::traverse::{RemoteEntry, StaticRemoteLister};
    use chrono::Utc;

    fn entry(path: &str, is_folder_marker: bool, entity_type: EntityType) -> RemoteEntry {
        RemoteEntry {
            relative_path: path.to_string(),
            entity_type,
            last_modified: Utc::now(),
            size: if entity_type == EntityType::File { 10 } else { 0 },
            content_digest: None,
            is_folder_marker,
        }
    }

    async fn drain(
        lister: StaticRemoteLister,
        prefix: &str,
        recursive: bool,
    ) -> Vec<StoredObject> {
        let filter = Arc::new(FilterChain::accept_all());
        let (mut rx, handle) = spawn(Arc::new(lister), prefix.to_string(), recursive, filter);
        let mut objects = Vec::new();
        while let Some(event) = rx.recv().await {
            if let TraverseEvent::Object(object) = event {
                objects.push(object);
            }
        }
        handle.await.unwrap().unwrap();
        objects
    }

    #[tokio::test]
    async fn flat_listing_recognizes_directory_markers() {
        let lister = StaticRemoteLister::new().seed_one_page(
            "c",
            vec![
                entry("c/dir", true, EntityType::Folder),
                entry("c/dir/a.txt", false, EntityType::File),
            ],
        );
        let objects = drain(lister, "c", true).await;
        let marker = objects.iter().find(|o| o.relative_path == "dir").unwrap();
        assert!(marker.is_directory_marker());
        let file = objects.iter().find(|o| o.relative_path == "dir/a.txt").unwrap();
        assert!(!file.is_directory_marker());
    }

    #[tokio::test]
    async fn non_recursive_drops_nested_entries() {
        let lister = StaticRemoteLister::new().seed_one_page(
            "c",
            vec![
                entry("c/top.txt", false, EntityType::File),
                entry("c/dir/nested.txt", false, EntityType::File),
            ],
        );
        let objects = drain(lister, "c", false).await;
        let paths: Vec<_> = objects.iter().map(|o| o.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["top.txt"]);
    }
}
