// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! memshelf Core Library
//!
//! Lets worker processes share large values without pushing them through
//! IPC channels: a producer shelves a value once into a shared location
//! (preferably the RAM-backed `/dev/shm`) and passes around a small
//! [`ShelfFuture`]; any process on the same host resolves it on demand.
//!
//! Provides location resolution, the [`Shelf`] object store, memoizing
//! handles, storage backends, crash-recovery registration and a lazily
//! created per-process [`ShelfService`].

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod future;
pub mod location;
pub mod memo;
pub mod registry;
pub mod service;
pub mod shelf;
pub mod types;

// Re-export commonly used types
pub use backend::{BackendKind, BackendOptions, StoreBackend};
pub use config::{ConfigLoader, ShelfConfig};
pub use error::{HardValidationError, ShelfError, ShelfResult};
pub use future::ShelfFuture;
pub use location::{LocationResolver, ResolvedLocation};
pub use registry::{reap_orphans, CrashRecoveryRegistry, NoopRegistry, ResourceKind, SidecarRegistry};
pub use service::{clear, default_service, shelve, shutdown, ShelfService};
pub use shelf::Shelf;
pub use types::{ItemId, ItemKey, PoolName, ProcessId};
