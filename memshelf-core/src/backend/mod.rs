// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Storage backends.
//!
//! A backend performs the byte-level write/read/erase of items at one
//! location. Values are framed by [`crate::codec::ItemCodec`] before they
//! reach a backend, so backends never interpret item contents.
//!
//! Backends are selected by the closed [`BackendKind`] enum:
//!
//! - [`BackendKind::Local`] -- one directory per item under the location;
//!   visible to every process that can reach the path.
//! - [`BackendKind::Memory`] -- process-private map keyed by location; for
//!   sharing between threads and for tests.

mod local;
mod memory;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HardValidationError, ShelfResult};
use crate::types::ItemId;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

/// Byte-level item storage bound to one location.
///
/// All implementations must satisfy these invariants:
/// - `load_item` on an absent id fails with `ShelfError::ItemNotFound`.
/// - `clear_item` on an absent id is a no-op.
/// - `clear` removes every item but keeps the location itself.
/// - I/O errors are propagated, never retried.
pub trait StoreBackend: Send + Sync + fmt::Debug {
    /// The location this backend is bound to.
    fn location(&self) -> &Path;

    /// Which variant this is.
    fn kind(&self) -> BackendKind;

    /// Write an item frame under `id`.
    fn dump_item(&self, id: &ItemId, frame: &[u8]) -> ShelfResult<()>;

    /// Read the item frame stored under `id`.
    fn load_item(&self, id: &ItemId) -> ShelfResult<Vec<u8>>;

    /// Erase one item.
    fn clear_item(&self, id: &ItemId) -> ShelfResult<()>;

    /// Erase every item, keep the location.
    fn clear(&self) -> ShelfResult<()>;

    /// Identifiers of all items currently stored.
    fn item_ids(&self) -> ShelfResult<Vec<ItemId>>;

    /// Remove the location itself. The backend must not be used afterwards.
    fn destroy(&self) -> ShelfResult<()>;

    /// Whether an item exists under `id`.
    fn contains_item(&self, id: &ItemId) -> ShelfResult<bool> {
        Ok(self.item_ids()?.contains(id))
    }
}

/// Backend variant, selected explicitly by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Memory,
}

impl BackendKind {
    /// Name used in configuration files.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Memory => "memory",
        }
    }

    /// Parse a configuration name.
    pub fn parse(name: &str) -> Result<Self, HardValidationError> {
        match name {
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            other => Err(HardValidationError::UnknownBackend {
                name: other.to_string(),
            }),
        }
    }

    /// Whether the location is a real directory that has to be registered
    /// for crash recovery.
    pub const fn persists_on_disk(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Create (or reuse) the location and bind a backend to it.
    pub fn create(
        &self,
        location: &Path,
        options: &BackendOptions,
    ) -> ShelfResult<Arc<dyn StoreBackend>> {
        match self {
            Self::Local => {
                let backend = LocalBackend::create(location, options)?;
                Ok(Arc::new(backend) as Arc<dyn StoreBackend>)
            }
            Self::Memory => Ok(MemoryBackend::create(location) as Arc<dyn StoreBackend>),
        }
    }

    /// Bind a view to an existing location. `None` when the location is gone.
    pub fn attach(&self, location: &Path) -> ShelfResult<Option<Arc<dyn StoreBackend>>> {
        match self {
            Self::Local => Ok(LocalBackend::attach(location)?
                .map(|backend| Arc::new(backend) as Arc<dyn StoreBackend>)),
            Self::Memory => Ok(MemoryBackend::attach(location)
                .map(|backend| backend as Arc<dyn StoreBackend>)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Options applied when a shelf opens its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    pub kind: BackendKind,
    /// fsync item files before they become visible (local backend only).
    pub sync_writes: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            sync_writes: false,
        }
    }
}

impl BackendOptions {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShelfError;
    use tempfile::TempDir;

    #[test]
    fn test_kind_parse_and_name() {
        assert_eq!(BackendKind::parse("local").unwrap(), BackendKind::Local);
        assert_eq!(BackendKind::parse("memory").unwrap(), BackendKind::Memory);
        assert!(BackendKind::parse("s3").is_err());
        assert_eq!(BackendKind::Memory.to_string(), "memory");
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&BackendKind::Local).unwrap(),
            "\"local\""
        );
        let kind: BackendKind = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(kind, BackendKind::Memory);
    }

    /// Contract checks shared by every backend variant.
    fn exercise_contract(kind: BackendKind, location: &Path) {
        let backend = kind.create(location, &BackendOptions::new(kind)).unwrap();
        assert_eq!(backend.kind(), kind);
        assert_eq!(backend.location(), location);

        let a = ItemId::generate();
        let b = ItemId::generate();
        backend.dump_item(&a, b"frame-a").unwrap();
        backend.dump_item(&b, b"frame-b").unwrap();
        assert_eq!(backend.load_item(&a).unwrap(), b"frame-a");
        assert!(backend.contains_item(&b).unwrap());

        let mut ids = backend.item_ids().unwrap();
        ids.sort();
        let mut expected = vec![a.clone(), b.clone()];
        expected.sort();
        assert_eq!(ids, expected);

        backend.clear_item(&a).unwrap();
        backend.clear_item(&a).unwrap();
        assert!(matches!(
            backend.load_item(&a),
            Err(ShelfError::ItemNotFound { .. })
        ));

        // A second view sees the same items.
        let view = kind.attach(location).unwrap().expect("location exists");
        assert_eq!(view.load_item(&b).unwrap(), b"frame-b");

        backend.clear().unwrap();
        assert!(backend.item_ids().unwrap().is_empty());
        assert!(kind.attach(location).unwrap().is_some());

        backend.destroy().unwrap();
        assert!(kind.attach(location).unwrap().is_none());
    }

    #[test]
    fn test_local_backend_contract() {
        let dir = TempDir::new().unwrap();
        exercise_contract(BackendKind::Local, &dir.path().join("pool"));
    }

    #[test]
    fn test_memory_backend_contract() {
        let dir = TempDir::new().unwrap();
        exercise_contract(BackendKind::Memory, &dir.path().join("pool"));
    }
}
