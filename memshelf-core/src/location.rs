// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Backing location resolution.
//!
//! Decides which directory a shelf lives in. Precedence:
//!
//! 1. an explicit override passed by the caller,
//! 2. the `MEMSHELF_TEMP_FOLDER` environment variable,
//! 3. the shared-memory filesystem (`/dev/shm`) when it has more than 2 GB
//!    free and a pool folder can be created there,
//! 4. the process-wide temporary directory.
//!
//! Probing the shared-memory mount never fails the resolution: missing
//! mount, missing statistics or permission errors only mean "not usable".

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{ShelfError, ShelfResult};
use crate::types::PoolName;

/// RAM-backed filesystem mounted by default on modern Linux distributions.
pub const SYSTEM_SHARED_MEM_FS: &str = "/dev/shm";

/// Minimum free bytes on the shared-memory mount before it is considered.
pub const SYSTEM_SHARED_MEM_FS_MIN_SIZE: u64 = 2_000_000_000;

/// Environment variable selecting an explicit root folder.
pub const TEMP_FOLDER_ENV: &str = "MEMSHELF_TEMP_FOLDER";

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Absolute `<root>/<pool>` path. Not created unless the shared-memory
    /// probe created it.
    pub path: PathBuf,
    /// Whether `<root>` is the shared-memory mount.
    pub used_shared_memory: bool,
}

/// Resolver for shelf backing locations.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    shm_mount: PathBuf,
    min_free_bytes: u64,
    honor_env: bool,
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self {
            shm_mount: PathBuf::from(SYSTEM_SHARED_MEM_FS),
            min_free_bytes: SYSTEM_SHARED_MEM_FS_MIN_SIZE,
            honor_env: true,
        }
    }
}

impl LocationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe a different shared-memory mount point.
    pub fn with_shm_mount(mut self, mount: impl Into<PathBuf>) -> Self {
        self.shm_mount = mount.into();
        self
    }

    /// Change the free-space threshold for the shared-memory mount.
    pub fn with_min_free_bytes(mut self, bytes: u64) -> Self {
        self.min_free_bytes = bytes;
        self
    }

    /// Whether `MEMSHELF_TEMP_FOLDER` is consulted.
    pub fn honor_env(mut self, honor: bool) -> Self {
        self.honor_env = honor;
        self
    }

    pub fn shm_mount(&self) -> &Path {
        &self.shm_mount
    }

    pub fn min_free_bytes(&self) -> u64 {
        self.min_free_bytes
    }

    /// Resolve the folder for `pool`.
    ///
    /// Only turning a relative root into an absolute one can fail.
    pub fn resolve(
        &self,
        explicit_override: Option<&Path>,
        pool: &PoolName,
    ) -> ShelfResult<ResolvedLocation> {
        let env_value = if self.honor_env {
            std::env::var_os(TEMP_FOLDER_ENV)
        } else {
            None
        };
        self.resolve_with_env(explicit_override, env_value, pool)
    }

    fn resolve_with_env(
        &self,
        explicit_override: Option<&Path>,
        env_value: Option<OsString>,
        pool: &PoolName,
    ) -> ShelfResult<ResolvedLocation> {
        let mut used_shared_memory = false;

        let mut root = explicit_override
            .map(Path::to_path_buf)
            .or_else(|| env_value.filter(|v| !v.is_empty()).map(PathBuf::from));

        if root.is_none() && self.shared_memory_usable(pool) {
            root = Some(self.shm_mount.clone());
            used_shared_memory = true;
        }

        let root = root.unwrap_or_else(std::env::temp_dir);
        let root = absolutize(&expand_home(&root))?;

        tracing::debug!(
            root = %root.display(),
            pool = %pool,
            used_shared_memory = used_shared_memory,
            "Resolved shelf location"
        );

        Ok(ResolvedLocation {
            path: pool.under(&root),
            used_shared_memory,
        })
    }

    /// Probe the shared-memory mount; any failure means "unusable".
    fn shared_memory_usable(&self, pool: &PoolName) -> bool {
        if !self.shm_mount.exists() {
            return false;
        }

        let available = match available_bytes(&self.shm_mount) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(
                    mount = %self.shm_mount.display(),
                    error = %e,
                    "Shared memory statistics unavailable"
                );
                return false;
            }
        };

        if available <= self.min_free_bytes {
            tracing::debug!(
                mount = %self.shm_mount.display(),
                available = available,
                required = self.min_free_bytes,
                "Shared memory mount too small"
            );
            return false;
        }

        // Large enough: check we can actually write there.
        let pool_folder = pool.under(&self.shm_mount);
        match std::fs::create_dir_all(&pool_folder) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    folder = %pool_folder.display(),
                    error = %e,
                    "Shared memory mount not writable"
                );
                false
            }
        }
    }
}

/// Free bytes available to unprivileged users on the filesystem at `path`.
pub fn available_bytes(path: &Path) -> nix::Result<u64> {
    let stats = nix::sys::statvfs::statvfs(path)?;
    Ok((stats.fragment_size() as u64).saturating_mul(stats.blocks_available() as u64))
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

pub(crate) fn absolutize(path: &Path) -> ShelfResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| ShelfError::io("reading current directory", e))?;
    Ok(cwd.join(path))
}
