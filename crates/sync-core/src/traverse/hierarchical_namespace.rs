//! ADLS Gen2 (hierarchical-namespace) traverser (§4.3). Paths are listed
//! segment-wise, the same recursive-directory shape as `file_share`, but
//! every entry carries an explicit file-or-directory type attribute from
//! the service, so unlike a container listing there is never a same-name
//! blob/folder ambiguity to resolve (a name can only be one or the other).

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
    use crate::model::EntityType;
    use crate::traverse::{RemoteEntry, StaticRemoteLister};
    use chrono::Utc;

    fn entry(path: &str, entity_type: EntityType) -> RemoteEntry {
        RemoteEntry {
            relative_path: path.to_string(),
            entity_type,
            last_modified: Utc::now(),
            size: if entity_type == EntityType::File { 7 } else { 0 },
            content_digest: None,
            is_folder_marker: false,
        }
    }

    #[tokio::test]
    async fn adls_directory_can_be_the_traversal_root() {
        // Seed scenario 5: the sync root is itself an explicit ADLS directory.
        let lister = StaticRemoteLister::new().seed_one_page(
            "fs/adlsdir",
            vec![entry("fs/adlsdir/a.txt", EntityType::File)],
        );
        let filter = Arc::new(FilterChain::accept_all());
        let (mut rx, handle) = spawn(Arc::new(lister), "fs/adlsdir".to_string(), true, filter);
        let mut objects = Vec::new();
        while let Some(event) = rx.recv().await {
            if let super::TraverseEvent::Object(object) = event {
                objects.push(object);
            }
        }
        handle.await.unwrap().unwrap();
        let paths: Vec<_> = objects.iter().map(|o| o.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt"]);
    }
}
