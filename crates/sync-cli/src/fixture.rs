//! Loads a static remote listing from a JSON file, standing in for the
//! credentialed HTTP pipeline that a real container/file-share/ADLS backend
//! would use (out of scope for this crate, see the core crate's docs).
//! Exercised via the hidden `--remote-fixture` flag so remote endpoint
//! kinds can still be planned and demonstrated without a live service.

use std::path::Path;

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use serde::Deserialize;
use sync_core::model::EntityType;
use sync_core::traverse::{RemoteEntry, StaticRemoteLister};

#[derive(Debug, Deserialize)]
struct FixtureFile {
    prefix: String,
    entries: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    relative_path: String,
    entity_type: FixtureEntityType,
    last_modified: DateTime<Utc>,
    size: u64,
    #[serde(default)]
    is_folder_marker: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FixtureEntityType {
    File,
    Folder,
}

impl From<FixtureEntityType> for EntityType {
    fn from(value: FixtureEntityType) -> Self {
        match value {
            FixtureEntityType::File => EntityType::File,
            FixtureEntityType::Folder => EntityType::Folder,
        }
    }
}

/// Read a fixture file and build a `StaticRemoteLister` seeded with a single
/// page under its declared prefix.
pub fn load(path: &Path) -> Result<(String, StaticRemoteLister)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading remote fixture {}", path.display()))?;
    let fixture: FixtureFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing remote fixture {}", path.display()))?;

    let entries: Vec<RemoteEntry> = fixture
        .entries
        .into_iter()
        .map(|entry| RemoteEntry {
            relative_path: entry.relative_path,
            entity_type: entry.entity_type.into(),
            last_modified: entry.last_modified,
            size: entry.size,
            content_digest: None,
            is_folder_marker: entry.is_folder_marker,
        })
        .collect();

    let lister = StaticRemoteLister::new().seed_one_page(fixture.prefix.clone(), entries);
    Ok((fixture.prefix, lister))
}
