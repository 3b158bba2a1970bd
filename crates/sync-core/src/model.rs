//! The uniform object model exchanged between traversers and the comparator,
//! independent of which endpoint kind produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of filesystem entity a `StoredObject` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    File,
    Folder,
    Symlink,
    HardLink,
    Other,
}

/// Opaque, endpoint-specific attributes carried alongside a `StoredObject`
/// for the benefit of the downstream transfer engine. The comparator never
/// inspects these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMetadata {
    /// True for a flat-namespace directory-marker object (§4.3).
    pub is_folder_marker: bool,
    /// Service-specific storage tier (e.g. "Hot", "Cool"); opaque here.
    pub tier: Option<String>,
    /// Unix permission bits, when the source endpoint exposes them.
    pub unix_mode: Option<u32>,
    /// Free-form key/value bag for anything else the transfer engine wants.
    pub extra: HashMap<String, String>,
}

/// The canonical entity exchanged between traversers and the comparator.
///
/// `relative_path` uses forward slashes, is never absolute, and never begins
/// or ends with a separator unless it is empty (the root itself, when the
/// root is a single object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub relative_path: String,
    pub name: String,
    pub entity_type: EntityType,
    pub last_modified_time: DateTime<Utc>,
    pub size: u64,
    pub content_digest: Option<Vec<u8>>,
    pub endpoint_metadata: EndpointMetadata,
}

impl StoredObject {
    /// Build a `StoredObject`, deriving `name` from the final path segment
    /// (or leaving it empty for the root-as-single-object case).
    pub fn new(
        relative_path: impl Into<String>,
        entity_type: EntityType,
        last_modified_time: DateTime<Utc>,
        size: u64,
    ) -> Self {
        let relative_path = normalize_relative_path(relative_path.into());
        let name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&relative_path)
            .to_string();
        Self {
            relative_path,
            name,
            entity_type,
            last_modified_time,
            size,
            content_digest: None,
            endpoint_metadata: EndpointMetadata::default(),
        }
    }

    pub fn with_digest(mut self, digest: Vec<u8>) -> Self {
        self.content_digest = Some(digest);
        self
    }

    pub fn with_metadata(mut self, metadata: EndpointMetadata) -> Self {
        self.endpoint_metadata = metadata;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.entity_type == EntityType::Folder
    }

    /// Whether this entry is the ADLS-style directory-marker blob: a Folder
    /// entity flagged by the service-specific marker metadata.
    pub fn is_directory_marker(&self) -> bool {
        self.is_folder() && self.endpoint_metadata.is_folder_marker
    }
}

/// Normalize a path to the canonical `relative_path` form: forward slashes,
/// no leading or trailing separator, `.`/`""` collapsed to the empty root.
pub fn normalize_relative_path(raw: impl AsRef<str>) -> String {
    let replaced = raw.as_ref().replace('\\', "/");
    let trimmed = replaced.trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// The record emitted to the dispatcher. A `delete` decision is represented
/// by `kind = TransferOrderKind::Delete`, in which case `source` and related
/// source-only fields are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOrder {
    pub kind: TransferOrderKind,
    pub source: Option<String>,
    pub destination: String,
    pub last_modified_time: DateTime<Utc>,
    pub source_size: u64,
    pub content_digest: Option<Vec<u8>>,
    pub entity_type: EntityType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOrderKind {
    Copy,
    Delete,
}

impl TransferOrder {
    pub fn copy(source: StoredObject, destination: String) -> Self {
        Self {
            kind: TransferOrderKind::Copy,
            source: Some(source.relative_path.clone()),
            destination,
            last_modified_time: source.last_modified_time,
            source_size: source.size,
            content_digest: source.content_digest,
            entity_type: source.entity_type,
        }
    }

    pub fn delete(destination: StoredObject) -> Self {
        Self {
            kind: TransferOrderKind::Delete,
            source: None,
            destination: destination.relative_path,
            last_modified_time: destination.last_modified_time,
            source_size: 0,
            content_digest: None,
            entity_type: destination.entity_type,
        }
    }
}

/// A bounded batch of `TransferOrder`s plus a monotonically increasing part
/// number and a final-part flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPartOrder {
    pub part_number: u64,
    pub is_final_part: bool,
    pub transfers: Vec<TransferOrder>,
}

/// Default maximum transfers per part, matching the spec's typical value.
pub const DEFAULT_MAX_TRANSFERS_PER_PART: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_slashes_and_dot() {
        assert_eq!(normalize_relative_path("/a/b/"), "a/b");
        assert_eq!(normalize_relative_path("."), "");
        assert_eq!(normalize_relative_path(""), "");
        assert_eq!(normalize_relative_path("a\\b\\c"), "a/b/c");
    }

    #[test]
    fn name_is_final_segment() {
        let obj = StoredObject::new("a/b/c.txt", EntityType::File, Utc::now(), 10);
        assert_eq!(obj.name, "c.txt");
        assert_eq!(obj.relative_path, "a/b/c.txt");
    }

    #[test]
    fn root_object_has_empty_relative_path_and_name() {
        let obj = StoredObject::new("", EntityType::File, Utc::now(), 10);
        assert_eq!(obj.relative_path, "");
        assert_eq!(obj.name, "");
    }

    #[test]
    fn directory_marker_requires_both_folder_type_and_flag() {
        let mut obj = StoredObject::new("adlsdir", EntityType::Folder, Utc::now(), 0);
        assert!(!obj.is_directory_marker());
        obj.endpoint_metadata.is_folder_marker = true;
        assert!(obj.is_directory_marker());
    }
}
