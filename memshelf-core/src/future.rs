// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Handles to shelved items.
//!
//! A [`ShelfFuture`] is a pure value: the item's location, its identifier
//! and the backend variant needed to reach it. It does not own or borrow a
//! [`crate::Shelf`], so it can be cloned, serialized and sent to another
//! process, which resolves it with [`ShelfFuture::result`].

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendKind, StoreBackend};
use crate::codec::ItemCodec;
use crate::error::{ShelfError, ShelfResult};
use crate::memo;
use crate::types::{ItemId, ItemKey};

/// Lazy, memoizing reference to one shelved value of type `T`.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ShelfFuture<T> {
    key: ItemKey,
    backend: BackendKind,
    #[serde(skip)]
    _value: PhantomData<fn() -> T>,
}

impl<T> ShelfFuture<T> {
    /// Reference an item by its parts. Nothing is checked until resolution.
    pub fn new(location: impl Into<PathBuf>, id: ItemId, backend: BackendKind) -> Self {
        Self::from_key(ItemKey::new(location, id), backend)
    }

    pub fn from_key(key: ItemKey, backend: BackendKind) -> Self {
        Self {
            key,
            backend,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn location(&self) -> &Path {
        &self.key.location
    }

    pub fn id(&self) -> &ItemId {
        &self.key.id
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend
    }

    /// Whether this process already holds the resolved value.
    pub fn is_memoized(&self) -> bool {
        memo::contains(&self.key)
    }

    /// Erase the referenced item.
    ///
    /// Any value already memoized in this process stays cached. Erasing an
    /// item that is already gone is a no-op as long as the location exists.
    pub fn clear(&self) -> ShelfResult<()> {
        self.attach()?.clear_item(&self.key.id)
    }

    fn attach(&self) -> ShelfResult<Arc<dyn StoreBackend>> {
        self.backend
            .attach(&self.key.location)?
            .ok_or_else(|| ShelfError::ItemNotFound {
                key: self.key.clone(),
            })
    }
}

impl<T> ShelfFuture<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Resolve the handle.
    ///
    /// The first call in a process reads and decodes the item; later calls
    /// return the memoized value. Unknown or cleared items, and items of a
    /// closed shelf, fail with [`ShelfError::ItemNotFound`].
    ///
    /// Only one type is memoized per item. Resolving it as another type
    /// reads the item again without replacing the memoized entry, and fails
    /// with [`ShelfError::TypeMismatch`] when that read or decode fails.
    pub fn result(&self) -> ShelfResult<Arc<T>> {
        if let Some(cached) = memo::get(&self.key) {
            return match cached.downcast::<T>() {
                Ok(value) => Ok(value),
                Err(_) => self.load().map_err(|e| match e {
                    ShelfError::ItemNotFound { .. } | ShelfError::Serialization { .. } => {
                        ShelfError::TypeMismatch {
                            key: self.key.clone(),
                            expected: type_name::<T>(),
                        }
                    }
                    other => other,
                }),
            };
        }

        let value = self.load()?;
        memo::insert(
            self.key.clone(),
            Arc::clone(&value) as Arc<dyn std::any::Any + Send + Sync>,
        );

        tracing::trace!(key = %self.key, "Resolved shelf future");
        Ok(value)
    }

    fn load(&self) -> ShelfResult<Arc<T>> {
        let frame = self.attach()?.load_item(&self.key.id)?;
        Ok(Arc::new(ItemCodec::decode(&frame)?))
    }
}

impl<T> Clone for ShelfFuture<T> {
    fn clone(&self) -> Self {
        Self::from_key(self.key.clone(), self.backend)
    }
}

impl<T> PartialEq for ShelfFuture<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.backend == other.backend
    }
}

impl<T> Eq for ShelfFuture<T> {}

impl<T> fmt::Debug for ShelfFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShelfFuture")
            .field("location", &self.key.location)
            .field("id", &self.key.id)
            .field("backend", &self.backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_shape() {
        let id = ItemId::new("0123abcd").unwrap();
        let future: ShelfFuture<Vec<f64>> = ShelfFuture::new("/dev/shm/p", id, BackendKind::Local);
        let json = serde_json::to_value(&future).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "key": { "location": "/dev/shm/p", "id": "0123abcd" },
                "backend": "local"
            })
        );

        let back: ShelfFuture<Vec<f64>> = serde_json::from_value(json).unwrap();
        assert_eq!(back, future);
    }

    #[test]
    fn test_missing_location_is_not_found() {
        let future: ShelfFuture<u32> = ShelfFuture::new(
            "/nonexistent/memshelf/location",
            ItemId::generate(),
            BackendKind::Local,
        );
        assert!(future.result().unwrap_err().is_not_found());
        assert!(future.clear().unwrap_err().is_not_found());
        assert!(!future.is_memoized());
    }

    #[test]
    fn test_type_mismatch_on_memoized_value() {
        let key = ItemKey::new("/memo/mismatch", ItemId::generate());
        memo::insert(key.clone(), Arc::new(String::from("text")));

        let future: ShelfFuture<u64> = ShelfFuture::from_key(key.clone(), BackendKind::Memory);
        let err = future.result().unwrap_err();
        assert!(matches!(err, ShelfError::TypeMismatch { .. }));

        let future: ShelfFuture<String> = ShelfFuture::from_key(key.clone(), BackendKind::Memory);
        assert_eq!(future.result().unwrap().as_str(), "text");
        memo::forget(&key);
    }

    #[test]
    fn test_other_compatible_type_reads_again() {
        let location = std::path::PathBuf::from("/memo/compatible");
        let backend = BackendKind::Memory
            .create(&location, &crate::backend::BackendOptions::new(BackendKind::Memory))
            .unwrap();
        let id = ItemId::generate();
        backend
            .dump_item(&id, &ItemCodec::encode(&vec![1.5f64, 2.0]).unwrap())
            .unwrap();

        let typed: ShelfFuture<Vec<f64>> =
            ShelfFuture::new(&location, id.clone(), BackendKind::Memory);
        assert_eq!(*typed.result().unwrap(), vec![1.5, 2.0]);

        let untyped: ShelfFuture<serde_json::Value> =
            ShelfFuture::new(&location, id.clone(), BackendKind::Memory);
        assert_eq!(*untyped.result().unwrap(), serde_json::json!([1.5, 2.0]));
        // The first memoized type is kept.
        assert_eq!(*typed.result().unwrap(), vec![1.5, 2.0]);

        let incompatible: ShelfFuture<String> =
            ShelfFuture::new(&location, id, BackendKind::Memory);
        assert!(matches!(
            incompatible.result(),
            Err(ShelfError::TypeMismatch { .. })
        ));

        memo::forget(typed.key());
        backend.destroy().unwrap();
    }
}
