// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! The object store.
//!
//! A [`Shelf`] owns one backing location: it creates it, registers it for
//! crash recovery, hands out [`ShelfFuture`]s for values written into it,
//! and removes it on [`Shelf::close`] or when dropped. Once closed a shelf
//! never reopens.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::backend::{BackendKind, BackendOptions, StoreBackend};
use crate::codec::ItemCodec;
use crate::error::{ShelfError, ShelfResult};
use crate::future::ShelfFuture;
use crate::location::{absolutize, LocationResolver};
use crate::registry::{CrashRecoveryRegistry, ResourceKind};
use crate::types::{ItemId, PoolName};

/// Shared-location object store.
#[derive(Debug)]
pub struct Shelf {
    location: PathBuf,
    kind: BackendKind,
    /// `None` exactly when closed.
    backend: Option<Arc<dyn StoreBackend>>,
    registry: Arc<dyn CrashRecoveryRegistry>,
}

impl Shelf {
    /// Open a shelf at `location`, creating it if needed.
    ///
    /// On-disk locations are registered with `registry` as a folder right
    /// after they exist.
    pub fn open(
        location: impl AsRef<Path>,
        options: &BackendOptions,
        registry: Arc<dyn CrashRecoveryRegistry>,
    ) -> ShelfResult<Self> {
        let location = absolutize(location.as_ref())?;
        let backend = options.kind.create(&location, options)?;

        if options.kind.persists_on_disk() {
            if let Err(e) = registry.register(&location, ResourceKind::Folder) {
                if let Err(cleanup) = backend.destroy() {
                    tracing::warn!(
                        location = %location.display(),
                        error = %cleanup,
                        "Failed to remove location after registration error"
                    );
                }
                return Err(e);
            }
        }

        tracing::info!(
            location = %location.display(),
            backend = %options.kind,
            "Opened shelf"
        );

        Ok(Self {
            location,
            kind: options.kind,
            backend: Some(backend),
            registry,
        })
    }

    /// Resolve a location for `pool` and open a shelf there.
    pub fn create(
        resolver: &LocationResolver,
        explicit_override: Option<&Path>,
        pool: &PoolName,
        options: &BackendOptions,
        registry: Arc<dyn CrashRecoveryRegistry>,
    ) -> ShelfResult<Self> {
        let resolved = resolver.resolve(explicit_override, pool)?;
        Self::open(&resolved.path, options, registry)
    }

    /// Open a shelf, run `f` with it, and close it on every exit path.
    ///
    /// An error from `f` wins over an error from closing.
    pub fn scoped<F, R>(
        location: impl AsRef<Path>,
        options: &BackendOptions,
        registry: Arc<dyn CrashRecoveryRegistry>,
        f: F,
    ) -> ShelfResult<R>
    where
        F: FnOnce(&Shelf) -> ShelfResult<R>,
    {
        let mut shelf = Self::open(location, options, registry)?;
        let result = f(&shelf);
        let closed = shelf.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> ShelfResult<&Arc<dyn StoreBackend>> {
        self.backend.as_ref().ok_or_else(|| ShelfError::ClosedStore {
            location: self.location.clone(),
        })
    }

    /// Write `value` under a fresh random identifier and return its handle.
    ///
    /// A failed write leaves the shelf open and unaffected.
    pub fn shelve<T: Serialize>(&self, value: &T) -> ShelfResult<ShelfFuture<T>> {
        let backend = self.backend()?;
        let id = ItemId::generate();
        let frame = ItemCodec::encode(value)?;
        backend.dump_item(&id, &frame)?;

        tracing::debug!(
            location = %self.location.display(),
            id = %id,
            bytes = frame.len(),
            "Shelved item"
        );

        Ok(ShelfFuture::new(self.location.clone(), id, self.kind))
    }

    /// Erase every item. The shelf stays open; clearing a closed shelf is a
    /// no-op.
    pub fn clear(&self) -> ShelfResult<()> {
        match &self.backend {
            Some(backend) => backend.clear(),
            None => Ok(()),
        }
    }

    /// Identifiers of all items currently on the shelf.
    pub fn item_ids(&self) -> ShelfResult<Vec<ItemId>> {
        self.backend()?.item_ids()
    }

    pub fn len(&self) -> ShelfResult<usize> {
        Ok(self.item_ids()?.len())
    }

    pub fn is_empty(&self) -> ShelfResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Unregister and remove the location. Closing twice is a no-op.
    ///
    /// The shelf counts as closed even when removal fails; the registry
    /// entry is already gone at that point and the error is returned.
    pub fn close(&mut self) -> ShelfResult<()> {
        let Some(backend) = self.backend.take() else {
            return Ok(());
        };

        let unregistered = if self.kind.persists_on_disk() {
            self.registry
                .unregister(&self.location, ResourceKind::Folder)
        } else {
            Ok(())
        };
        let destroyed = backend.destroy();

        tracing::info!(location = %self.location.display(), "Closed shelf");

        unregistered?;
        destroyed
    }
}

impl Drop for Shelf {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(
                location = %self.location.display(),
                error = %e,
                "Failed to close shelf on drop"
            );
        }
    }
}
