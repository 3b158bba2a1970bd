//! File-share traverser (§4.3). Unlike a container, a file share has true
//! directories; folders are native listing entries rather than zero-byte
//! markers, so the walk recurses directory-by-directory instead of scanning
//! one flat prefix.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::errors::EnumerationError;
use crate::filter::FilterChain;

use super::{hierarchical_walk, RemoteLister, TraverseEvent, TRAVERSE_CHANNEL_CAPACITY};

pub fn spawn(
    lister: Arc<dyn RemoteLister>,
    root_prefix: String,
    recursive: bool,
    filter: Arc<FilterChain>,
) -> (
    mpsc::Receiver<TraverseEvent>,
    tokio::task::JoinHandle<Result<(), EnumerationError>>,
) {
    let (tx, rx) = mpsc::channel(TRAVERSE_CHANNEL_CAPACITY);
    let handle = tokio::task::spawn_blocking(move || {
        hierarchical_walk(&*lister, &root_prefix, recursive, &filter, &tx)
    });
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityType, StoredObject};
    use crate::traverse::{RemoteEntry, RemoteListingPage, StaticRemoteLister};
    use chrono::Utc;

    fn entry(path: &str, entity_type: EntityType) -> RemoteEntry {
        RemoteEntry {
            relative_path: path.to_string(),
            entity_type,
            last_modified: Utc::now(),
            size: if entity_type == EntityType::File { 5 } else { 0 },
            content_digest: None,
            is_folder_marker: false,
        }
    }

    #[tokio::test]
    async fn recurses_into_child_directories() {
        let lister = StaticRemoteLister::new()
            .seed(
                "share",
                vec![RemoteListingPage {
                    entries: vec![
                        entry("share/top.txt", EntityType::File),
                        entry("share/sub", EntityType::Folder),
                    ],
                    continuation_token: None,
                }],
            )
            .seed_one_page("share/sub", vec![entry("share/sub/nested.txt", EntityType::File)]);

        let filter = Arc::new(FilterChain::accept_all());
        let (mut rx, handle) = spawn(Arc::new(lister), "share".to_string(), true, filter);
        let mut objects: Vec<StoredObject> = Vec::new();
        while let Some(event) = rx.recv().await {
            if let super::TraverseEvent::Object(object) = event {
                objects.push(object);
            }
        }
        handle.await.unwrap().unwrap();
        let mut paths: Vec<_> = objects.iter().map(|o| o.relative_path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec!["sub", "sub/nested.txt", "top.txt"]);
    }

    #[tokio::test]
    async fn non_recursive_does_not_descend() {
        let lister = StaticRemoteLister::new().seed_one_page(
            "share",
            vec![entry("share/top.txt", EntityType::File), entry("share/sub", EntityType::Folder)],
        );
        let filter = Arc::new(FilterChain::accept_all());
        let (mut rx, handle) = spawn(Arc::new(lister), "share".to_string(), false, filter);
        let mut objects = Vec::new();
        while let Some(event) = rx.recv().await {
            if let super::TraverseEvent::Object(object) = event {
                objects.push(object);
            }
        }
        handle.await.unwrap().unwrap();
        let paths: Vec<_> = objects.iter().map(|o| o.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["top.txt", "sub"]);
    }
}
