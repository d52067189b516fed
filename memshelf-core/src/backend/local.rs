// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Filesystem backend: `<location>/<item id>/output.json`.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::backend::{BackendKind, BackendOptions, StoreBackend};
use crate::error::{ShelfError, ShelfResult};
use crate::types::{ItemId, ItemKey};

/// File holding an item's frame inside its directory.
const ITEM_FILE: &str = "output.json";

/// Backend storing one directory per item under a shared location.
///
/// Writes land in a temporary file that is renamed into place, so readers
/// in other processes see either nothing or a complete frame.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    location: PathBuf,
    sync_writes: bool,
}

impl LocalBackend {
    /// Create the location if needed and bind to it.
    pub fn create(location: &Path, options: &BackendOptions) -> ShelfResult<Self> {
        std::fs::create_dir_all(location)
            .map_err(|e| ShelfError::io("creating shelf location", e))?;

        tracing::debug!(location = %location.display(), "Created local backend");

        Ok(Self {
            location: location.to_path_buf(),
            sync_writes: options.sync_writes,
        })
    }

    /// Bind to an existing location without creating it.
    pub fn attach(location: &Path) -> ShelfResult<Option<Self>> {
        match std::fs::metadata(location) {
            Ok(meta) if meta.is_dir() => Ok(Some(Self {
                location: location.to_path_buf(),
                sync_writes: false,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShelfError::io("inspecting shelf location", e)),
        }
    }

    fn item_dir(&self, id: &ItemId) -> PathBuf {
        self.location.join(id.as_str())
    }

    fn item_file(&self, id: &ItemId) -> PathBuf {
        self.item_dir(id).join(ITEM_FILE)
    }

    fn not_found(&self, id: &ItemId) -> ShelfError {
        ShelfError::ItemNotFound {
            key: ItemKey::new(&self.location, id.clone()),
        }
    }
}

impl StoreBackend for LocalBackend {
    fn location(&self) -> &Path {
        &self.location
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn dump_item(&self, id: &ItemId, frame: &[u8]) -> ShelfResult<()> {
        let dir = self.item_dir(id);
        std::fs::create_dir_all(&dir).map_err(|e| ShelfError::io("creating item directory", e))?;

        let tmp = dir.join(format!("{}.{}.tmp", ITEM_FILE, ItemId::generate()));
        let mut file =
            std::fs::File::create(&tmp).map_err(|e| ShelfError::io("creating item file", e))?;
        file.write_all(frame)
            .map_err(|e| ShelfError::io("writing item file", e))?;
        if self.sync_writes {
            file.sync_all()
                .map_err(|e| ShelfError::io("syncing item file", e))?;
        }
        drop(file);

        std::fs::rename(&tmp, dir.join(ITEM_FILE))
            .map_err(|e| ShelfError::io("publishing item file", e))?;

        tracing::trace!(id = %id, bytes = frame.len(), "Dumped item");
        Ok(())
    }

    fn load_item(&self, id: &ItemId) -> ShelfResult<Vec<u8>> {
        match std::fs::read(self.item_file(id)) {
            Ok(frame) => Ok(frame),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(self.not_found(id)),
            Err(e) => Err(ShelfError::io("reading item file", e)),
        }
    }

    fn clear_item(&self, id: &ItemId) -> ShelfResult<()> {
        match std::fs::remove_dir_all(self.item_dir(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShelfError::io("removing item directory", e)),
        }
    }

    fn clear(&self) -> ShelfResult<()> {
        let entries = std::fs::read_dir(&self.location)
            .map_err(|e| ShelfError::io("listing shelf location", e))?;

        for entry in entries {
            let entry = entry.map_err(|e| ShelfError::io("listing shelf location", e))?;
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .map(|t| t.is_dir())
                .map_err(|e| ShelfError::io("inspecting shelf entry", e))?;

            let result = if is_dir {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => {}
                // Another view cleared it first.
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ShelfError::io("removing shelf entry", e)),
            }
        }

        tracing::debug!(location = %self.location.display(), "Cleared local backend");
        Ok(())
    }

    fn item_ids(&self) -> ShelfResult<Vec<ItemId>> {
        let entries = std::fs::read_dir(&self.location)
            .map_err(|e| ShelfError::io("listing shelf location", e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ShelfError::io("listing shelf location", e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(id) = ItemId::new(name) else {
                continue;
            };
            if self.item_file(&id).is_file() {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn destroy(&self) -> ShelfResult<()> {
        match std::fs::remove_dir_all(&self.location) {
            Ok(()) => {
                tracing::debug!(location = %self.location.display(), "Removed shelf location");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShelfError::io("removing shelf location", e)),
        }
    }

    fn contains_item(&self, id: &ItemId) -> ShelfResult<bool> {
        Ok(self.item_file(id).is_file())
    }
}
