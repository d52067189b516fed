// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Lazily created per-process shelf.
//!
//! [`ShelfService`] is an ordinary value: construct it, hand it to whatever
//! needs to shelve things, and it opens one [`Shelf`] on first use. The
//! free functions [`shelve`], [`clear`] and [`shutdown`] wrap a process-wide
//! default service for application entry points; library code should take a
//! `&ShelfService` instead.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;

use crate::backend::BackendOptions;
use crate::config::{ShelfConfig, DEFAULT_POOL_PREFIX};
use crate::error::ShelfResult;
use crate::future::ShelfFuture;
use crate::location::LocationResolver;
use crate::registry::{CrashRecoveryRegistry, SidecarRegistry};
use crate::shelf::Shelf;
use crate::types::PoolName;

/// Owner of at most one lazily opened shelf.
#[derive(Debug)]
pub struct ShelfService {
    resolver: LocationResolver,
    temp_folder: Option<PathBuf>,
    pool_prefix: String,
    options: BackendOptions,
    registry: Arc<dyn CrashRecoveryRegistry>,
    shelf: Mutex<Option<Shelf>>,
}

impl Default for ShelfService {
    fn default() -> Self {
        Self::new()
    }
}

impl ShelfService {
    /// Service with built-in defaults and a sidecar crash-recovery registry.
    pub fn new() -> Self {
        Self {
            resolver: LocationResolver::default(),
            temp_folder: None,
            pool_prefix: DEFAULT_POOL_PREFIX.to_string(),
            options: BackendOptions::default(),
            registry: SidecarRegistry::new_shared(),
            shelf: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ShelfConfig) -> Self {
        Self::new()
            .with_resolver(config.resolver())
            .with_pool_prefix(&config.pool_prefix)
            .with_backend_options(config.backend_options())
            .with_temp_folder(config.temp_folder.clone())
    }

    pub fn with_resolver(mut self, resolver: LocationResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Explicit root folder, bypassing the environment and shared memory.
    pub fn with_temp_folder(mut self, folder: Option<PathBuf>) -> Self {
        self.temp_folder = folder;
        self
    }

    pub fn with_pool_prefix(mut self, prefix: &str) -> Self {
        self.pool_prefix = prefix.to_string();
        self
    }

    pub fn with_backend_options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn CrashRecoveryRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Option<Shelf>> {
        self.shelf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_shelf(&self) -> ShelfResult<Shelf> {
        let pool = PoolName::for_process(&self.pool_prefix)?;

        // Memory shelves only need a unique key: keep the probe from
        // creating a folder on the shared-memory mount.
        let fallback_root;
        let explicit = match (&self.temp_folder, self.options.kind.persists_on_disk()) {
            (Some(folder), _) => Some(folder.as_path()),
            (None, true) => None,
            (None, false) => {
                fallback_root = std::env::temp_dir();
                Some(fallback_root.as_path())
            }
        };

        Shelf::create(
            &self.resolver,
            explicit,
            &pool,
            &self.options,
            Arc::clone(&self.registry),
        )
    }

    /// Shelve `value`, opening the shelf on first use.
    pub fn shelve<T: Serialize>(&self, value: &T) -> ShelfResult<ShelfFuture<T>> {
        let mut guard = self.lock();
        let shelf = match guard.take() {
            Some(shelf) => shelf,
            None => self.open_shelf()?,
        };
        guard.insert(shelf).shelve(value)
    }

    /// Clear the shelf if one was ever opened.
    pub fn clear(&self) -> ShelfResult<()> {
        match self.lock().as_ref() {
            Some(shelf) => shelf.clear(),
            None => Ok(()),
        }
    }

    /// Close the current shelf. A later `shelve` opens a fresh one.
    pub fn close(&self) -> ShelfResult<()> {
        let shelf = self.lock().take();
        match shelf {
            Some(mut shelf) => shelf.close(),
            None => Ok(()),
        }
    }

    /// Location of the current shelf, if one is open.
    pub fn location(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|shelf| shelf.location().to_path_buf())
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    pub fn temp_folder(&self) -> Option<&Path> {
        self.temp_folder.as_deref()
    }
}

/// The process-wide default service.
pub fn default_service() -> &'static ShelfService {
    static DEFAULT: OnceLock<ShelfService> = OnceLock::new();
    DEFAULT.get_or_init(ShelfService::new)
}

/// Shelve `value` on the process-wide default shelf.
pub fn shelve<T: Serialize>(value: &T) -> ShelfResult<ShelfFuture<T>> {
    default_service().shelve(value)
}

/// Clear the process-wide default shelf; no-op if it was never used.
pub fn clear() -> ShelfResult<()> {
    default_service().clear()
}

/// Close the process-wide default shelf.
///
/// Statics are never dropped, so entry points call this before exiting;
/// if they cannot, the crash-recovery registry reclaims the location.
pub fn shutdown() -> ShelfResult<()> {
    default_service().close()
}
