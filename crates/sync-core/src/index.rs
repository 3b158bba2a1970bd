//! Indexer (§4.5): materializes a traversal into a lookup keyed by relative
//! path. The comparator's two-phase design (§9) needs the source side fully
//! materialized before it can stream the destination against it, since
//! traversers make no ordering guarantee.

use std::collections::HashMap;

use crate::errors::{EnumerationError, ItemError, SyncError, Side};
use crate::model::StoredObject;
use crate::traverse::TraverseEvent;

/// A fully materialized set of `StoredObject`s keyed by `relative_path`.
#[derive(Debug, Default)]
pub struct Index {
    by_relative_path: HashMap<String, StoredObject>,
    skipped: Vec<ItemError>,
}

impl Index {
    pub fn get(&self, relative_path: &str) -> Option<&StoredObject> {
        self.by_relative_path.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.by_relative_path.contains_key(relative_path)
    }

    pub fn len(&self) -> usize {
        self.by_relative_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_relative_path.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredObject> {
        self.by_relative_path.values()
    }

    pub fn skipped(&self) -> &[ItemError] {
        &self.skipped
    }

    /// Consume a traversal's event stream into an `Index`. A duplicate
    /// `relative_path` is a fatal enumeration error (§4.5: "fail closed on
    /// duplicate keys"), since it means two traversal entries claim the same
    /// canonical identity and the comparator could not otherwise tell them
    /// apart.
    pub async fn build(
        side: Side,
        mut receiver: tokio::sync::mpsc::Receiver<TraverseEvent>,
        join: tokio::task::JoinHandle<Result<(), EnumerationError>>,
    ) -> Result<Self, SyncError> {
        let mut index = Self::default();
        while let Some(event) = receiver.recv().await {
            match event {
                TraverseEvent::Object(object) => {
                    if index
                        .by_relative_path
                        .insert(object.relative_path.clone(), object)
                        .is_some()
                    {
                        return Err(SyncError::Enumeration {
                            side,
                            source: EnumerationError::Remote {
                                prefix: index
                                    .by_relative_path
                                    .keys()
                                    .next()
                                    .cloned()
                                    .unwrap_or_default(),
                                message: "duplicate relative_path reported by traversal".into(),
                            },
                        });
                    }
                }
                TraverseEvent::Skipped(err) => {
                    log::warn!("skipping item on {side}: {err}");
                    index.skipped.push(err);
                }
            }
        }
        match join.await {
            Ok(Ok(())) => Ok(index),
            Ok(Err(source)) => Err(SyncError::Enumeration { side, source }),
            Err(join_err) => Err(SyncError::Enumeration {
                side,
                source: EnumerationError::Io {
                    path: Default::default(),
                    source: std::io::Error::other(join_err.to_string()),
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityType;
    use chrono::Utc;

    fn object(path: &str) -> StoredObject {
        StoredObject::new(path, EntityType::File, Utc::now(), 1)
    }

    #[tokio::test]
    async fn builds_index_from_event_stream() {
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let handle = tokio::spawn(async move {
            tx.send(TraverseEvent::Object(object("a.txt"))).await.unwrap();
            tx.send(TraverseEvent::Object(object("b.txt"))).await.unwrap();
            Ok(())
        });
        let index = Index::build(Side::Source, rx, handle).await.unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains("a.txt"));
    }

    #[tokio::test]
    async fn duplicate_relative_path_is_a_fatal_error() {
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let handle = tokio::spawn(async move {
            tx.send(TraverseEvent::Object(object("a.txt"))).await.unwrap();
            tx.send(TraverseEvent::Object(object("a.txt"))).await.unwrap();
            Ok(())
        });
        let err = Index::build(Side::Source, rx, handle).await.unwrap_err();
        assert!(matches!(err, SyncError::Enumeration { side: Side::Source, .. }));
    }
}
