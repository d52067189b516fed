// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Crash-recovery registry.
//!
//! Second line of defense behind `Shelf`'s `Drop`: if the owning process is
//! hard-killed, nothing in it runs, so the location must be reclaimable from
//! outside. [`SidecarRegistry`] writes an owner record next to every
//! registered resource (`<path>.owner`, JSON with the owner pid and kind)
//! and [`reap_orphans`] removes resources whose owner is gone.

use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ShelfError, ShelfResult};
use crate::types::ProcessId;

/// Extension of owner records.
pub const OWNER_SUFFIX: &str = ".owner";

/// Kind of resource a registry entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Folder,
    File,
}

impl ResourceKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Registry that can reclaim resources whose owning process died.
pub trait CrashRecoveryRegistry: Send + Sync + fmt::Debug {
    fn register(&self, path: &Path, kind: ResourceKind) -> ShelfResult<()>;

    fn unregister(&self, path: &Path, kind: ResourceKind) -> ShelfResult<()>;
}

/// Owner record persisted next to a registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub pid: ProcessId,
    pub kind: ResourceKind,
}

/// Path of the owner record for `path`.
pub fn owner_record_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(OWNER_SUFFIX);
    PathBuf::from(name)
}

/// Registry backed by owner records on disk.
#[derive(Debug, Default)]
pub struct SidecarRegistry {
    /// Entries registered by this process.
    entries: DashMap<PathBuf, ResourceKind>,
}

impl SidecarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry wrapped in an Arc for sharing across shelves.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Whether `path` is currently registered by this process.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }
}

impl CrashRecoveryRegistry for SidecarRegistry {
    fn register(&self, path: &Path, kind: ResourceKind) -> ShelfResult<()> {
        let record = OwnerRecord {
            pid: ProcessId::current(),
            kind,
        };
        let json = serde_json::to_vec(&record).map_err(|e| ShelfError::Serialization {
            message: e.to_string(),
        })?;
        std::fs::write(owner_record_path(path), json)
            .map_err(|e| ShelfError::io("writing owner record", e))?;

        self.entries.insert(path.to_path_buf(), kind);
        tracing::debug!(path = %path.display(), kind = %kind, "Registered resource");
        Ok(())
    }

    fn unregister(&self, path: &Path, kind: ResourceKind) -> ShelfResult<()> {
        self.entries.remove(path);
        match std::fs::remove_file(owner_record_path(path)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ShelfError::io("removing owner record", e)),
        }
        tracing::debug!(path = %path.display(), kind = %kind, "Unregistered resource");
        Ok(())
    }
}

/// Registry that records nothing. For embedders that reap by other means.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistry;

impl CrashRecoveryRegistry for NoopRegistry {
    fn register(&self, _path: &Path, _kind: ResourceKind) -> ShelfResult<()> {
        Ok(())
    }

    fn unregister(&self, _path: &Path, _kind: ResourceKind) -> ShelfResult<()> {
        Ok(())
    }
}

/// Remove every resource under `root` whose owner process is no longer
/// running, together with its owner record. Returns the reclaimed paths.
///
/// Unreadable owner records are skipped, not deleted.
pub fn reap_orphans(root: &Path) -> ShelfResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ShelfError::io("listing reap root", e)),
    };

    let mut reaped = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ShelfError::io("listing reap root", e))?;
        let record_path = entry.path();
        let Some(resource) = record_path
            .to_str()
            .and_then(|p| p.strip_suffix(OWNER_SUFFIX))
            .map(PathBuf::from)
        else {
            continue;
        };

        let record: OwnerRecord = match std::fs::read(&record_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        {
            Some(record) => record,
            None => {
                tracing::warn!(record = %record_path.display(), "Skipping unreadable owner record");
                continue;
            }
        };

        if record.pid.is_alive() {
            continue;
        }

        let removed = match record.kind {
            ResourceKind::Folder => std::fs::remove_dir_all(&resource),
            ResourceKind::File => std::fs::remove_file(&resource),
        };
        match removed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ShelfError::io("removing orphaned resource", e)),
        }
        match std::fs::remove_file(&record_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ShelfError::io("removing owner record", e)),
        }

        tracing::info!(
            path = %resource.display(),
            owner = %record.pid,
            "Reaped orphaned resource"
        );
        reaped.push(resource);
    }

    Ok(reaped)
}
