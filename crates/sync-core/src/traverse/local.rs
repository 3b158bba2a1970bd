//! Local filesystem traverser (§4.3). Grounded on the teacher crate's
//! `fs_enum.rs`/`enumeration.rs` walk pattern: `WalkDir` driven from a
//! dedicated OS thread, streaming results back over a channel rather than
//! collecting a `Vec` up front, so a large tree never fully materializes in
//! memory before the comparator can start consuming it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::errors::{EnumerationError, ItemError};
use crate::filter::{Candidate, FilterChain, FilterDecision};
use crate::model::{normalize_relative_path, EndpointMetadata, EntityType, StoredObject};

use super::{TraverseEvent, TRAVERSE_CHANNEL_CAPACITY};

/// Spawn a local traversal rooted at `root`. Returns a receiver of
/// `TraverseEvent`s plus a join handle resolving to the terminal result:
/// `Ok(())` once the walk completes, or the fatal `EnumerationError` that
/// stopped it early.
pub fn spawn(
    root: PathBuf,
    recursive: bool,
    filter: std::sync::Arc<FilterChain>,
    compute_digest: bool,
) -> (
    mpsc::Receiver<TraverseEvent>,
    tokio::task::JoinHandle<Result<(), EnumerationError>>,
) {
    let (tx, rx) = mpsc::channel(TRAVERSE_CHANNEL_CAPACITY);
    let handle = tokio::task::spawn_blocking(move || walk(&root, recursive, &filter, compute_digest, &tx));
    (rx, handle)
}

fn walk(
    root: &Path,
    recursive: bool,
    filter: &FilterChain,
    compute_digest: bool,
    tx: &mpsc::Sender<TraverseEvent>,
) -> Result<(), EnumerationError> {
    if root.symlink_metadata().is_err() {
        return Err(EnumerationError::RootNotFound(root.to_path_buf()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .min_depth(0)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter();

    for entry in walker.filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let relative = normalize_relative_path(
            entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy(),
        );
        !filter.should_prune_dir(&relative)
    }) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                let item = ItemError::new(path, err.to_string());
                if tx.blocking_send(TraverseEvent::Skipped(item)).is_err() {
                    return Ok(());
                }
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let relative_path = normalize_relative_path(
            entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy(),
        );
        let name = entry.file_name().to_string_lossy().to_string();

        let metadata = match entry.path().symlink_metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                let item = ItemError::new(entry.path(), err.to_string());
                if tx.blocking_send(TraverseEvent::Skipped(item)).is_err() {
                    return Ok(());
                }
                continue;
            }
        };

        let entity_type = classify_entity(&metadata);
        let hardlink_inode = hardlink_inode(&metadata);

        let candidate = Candidate {
            relative_path: &relative_path,
            name: &name,
            entity_type,
            hardlink_inode,
        };
        match filter.evaluate(&candidate) {
            FilterDecision::Accept => {}
            FilterDecision::Reject | FilterDecision::RejectAndPrune => continue,
        }

        let last_modified_time = match metadata.modified() {
            Ok(time) => DateTime::<Utc>::from(time),
            Err(err) => {
                let item = ItemError::new(entry.path(), err.to_string());
                if tx.blocking_send(TraverseEvent::Skipped(item)).is_err() {
                    return Ok(());
                }
                continue;
            }
        };

        let size = if entity_type == EntityType::File {
            metadata.len()
        } else {
            0
        };

        let digest = if compute_digest && entity_type == EntityType::File {
            match crate::checksum::hash_file(entry.path(), crate::checksum::ChecksumType::Blake3) {
                Ok(digest) => Some(digest),
                Err(err) => {
                    let item = ItemError::new(entry.path(), err.to_string());
                    if tx.blocking_send(TraverseEvent::Skipped(item)).is_err() {
                        return Ok(());
                    }
                    None
                }
            }
        } else {
            None
        };

        let mut object = StoredObject::new(relative_path, entity_type, last_modified_time, size);
        if let Some(digest) = digest {
            object = object.with_digest(digest);
        }
        object.endpoint_metadata = EndpointMetadata {
            unix_mode: unix_mode(&metadata),
            ..Default::default()
        };

        if tx.blocking_send(TraverseEvent::Object(object)).is_err() {
            return Ok(());
        }
    }

    Ok(())
}

fn classify_entity(metadata: &std::fs::Metadata) -> EntityType {
    if metadata.is_dir() {
        EntityType::Folder
    } else if metadata.file_type().is_symlink() {
        EntityType::Symlink
    } else if metadata.is_file() {
        EntityType::File
    } else {
        EntityType::Other
    }
}

#[cfg(unix)]
fn hardlink_inode(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    if metadata.is_file() && metadata.nlink() > 1 {
        Some(metadata.ino())
    } else {
        None
    }
}

#[cfg(not(unix))]
fn hardlink_inode(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

#[cfg(unix)]
fn unix_mode(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.mode())
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterConfig;
    use std::fs;
    use std::sync::Arc;

    async fn drain(root: PathBuf, recursive: bool) -> (Vec<StoredObject>, Vec<ItemError>) {
        let filter = Arc::new(FilterChain::compile(&FilterConfig::default()).unwrap());
        let (mut rx, handle) = spawn(root, recursive, filter, false);
        let mut objects = Vec::new();
        let mut errors = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                TraverseEvent::Object(object) => objects.push(object),
                TraverseEvent::Skipped(err) => errors.push(err),
            }
        }
        handle.await.unwrap().unwrap();
        (objects, errors)
    }

    #[tokio::test]
    async fn walks_nested_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"bb").unwrap();

        let (objects, errors) = drain(dir.path().to_path_buf(), true).await;
        assert!(errors.is_empty());
        let mut paths: Vec<_> = objects.iter().map(|o| o.relative_path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec!["a.txt", "sub", "sub/b.txt"]);
    }

    #[tokio::test]
    async fn non_recursive_only_lists_top_level() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"bb").unwrap();

        let (objects, _errors) = drain(dir.path().to_path_buf(), false).await;
        let mut paths: Vec<_> = objects.iter().map(|o| o.relative_path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec!["a.txt", "sub"]);
    }

    #[tokio::test]
    async fn missing_root_is_a_fatal_enumeration_error() {
        let filter = Arc::new(FilterChain::accept_all());
        let (mut rx, handle) = spawn(PathBuf::from("/no/such/path/at/all"), true, filter, false);
        while rx.recv().await.is_some() {}
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(EnumerationError::RootNotFound(_))));
    }
}
