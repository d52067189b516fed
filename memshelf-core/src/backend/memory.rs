// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process-private backend.
//!
//! Locations live in a process-wide `DashMap` so that every view created
//! for the same path in this process shares one item map. Nothing touches
//! the filesystem; other processes cannot see these items.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::backend::{BackendKind, StoreBackend};
use crate::error::{ShelfError, ShelfResult};
use crate::types::{ItemId, ItemKey};

fn locations() -> &'static DashMap<PathBuf, Arc<MemoryBackend>> {
    static LOCATIONS: OnceLock<DashMap<PathBuf, Arc<MemoryBackend>>> = OnceLock::new();
    LOCATIONS.get_or_init(DashMap::new)
}

/// In-memory item map bound to a location.
#[derive(Debug)]
pub struct MemoryBackend {
    location: PathBuf,
    items: DashMap<ItemId, Vec<u8>>,
}

impl MemoryBackend {
    /// Get the backend for `location`, creating it on first use.
    pub fn create(location: &Path) -> Arc<Self> {
        locations()
            .entry(location.to_path_buf())
            .or_insert_with(|| {
                tracing::debug!(location = %location.display(), "Created memory backend");
                Arc::new(Self {
                    location: location.to_path_buf(),
                    items: DashMap::new(),
                })
            })
            .clone()
    }

    /// Get the backend for `location` if it exists.
    pub fn attach(location: &Path) -> Option<Arc<Self>> {
        locations().get(location).map(|entry| Arc::clone(entry.value()))
    }

    /// Total frame bytes held.
    pub fn total_bytes(&self) -> usize {
        self.items.iter().map(|entry| entry.value().len()).sum()
    }
}

impl StoreBackend for MemoryBackend {
    fn location(&self) -> &Path {
        &self.location
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn dump_item(&self, id: &ItemId, frame: &[u8]) -> ShelfResult<()> {
        self.items.insert(id.clone(), frame.to_vec());
        Ok(())
    }

    fn load_item(&self, id: &ItemId) -> ShelfResult<Vec<u8>> {
        self.items
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ShelfError::ItemNotFound {
                key: ItemKey::new(&self.location, id.clone()),
            })
    }

    fn clear_item(&self, id: &ItemId) -> ShelfResult<()> {
        self.items.remove(id);
        Ok(())
    }

    fn clear(&self) -> ShelfResult<()> {
        self.items.clear();
        Ok(())
    }

    fn item_ids(&self) -> ShelfResult<Vec<ItemId>> {
        Ok(self.items.iter().map(|entry| entry.key().clone()).collect())
    }

    fn destroy(&self) -> ShelfResult<()> {
        self.items.clear();
        locations().remove(&self.location);
        tracing::debug!(location = %self.location.display(), "Dropped memory backend");
        Ok(())
    }

    fn contains_item(&self, id: &ItemId) -> ShelfResult<bool> {
        Ok(self.items.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_share_items() {
        let location = PathBuf::from(format!("/memshelf-mem-test/{}", ItemId::generate()));
        let first = MemoryBackend::create(&location);
        let second = MemoryBackend::create(&location);
        assert!(Arc::ptr_eq(&first, &second));

        let id = ItemId::generate();
        first.dump_item(&id, b"abc").unwrap();
        assert_eq!(second.load_item(&id).unwrap(), b"abc");
        assert_eq!(first.total_bytes(), 3);

        first.destroy().unwrap();
        assert!(MemoryBackend::attach(&location).is_none());
        assert!(!location.exists());
    }
}
