// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict validation.
//!
//! Every field is optional; defaults reproduce the built-in behavior
//! (`/dev/shm` with a 2 GB threshold, local backend, `memshelf` pools).
//! Any invalid field results in a HardValidationError before a shelf opens.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::{BackendKind, BackendOptions};
use crate::error::{HardValidationError, ShelfError, ShelfResult};
use crate::location::{LocationResolver, SYSTEM_SHARED_MEM_FS, SYSTEM_SHARED_MEM_FS_MIN_SIZE};
use crate::types::PoolName;

/// Default prefix of per-process pool folders.
pub const DEFAULT_POOL_PREFIX: &str = "memshelf";

/// Longest accepted pool prefix; leaves room for `_<pid>`.
const MAX_POOL_PREFIX_LEN: usize = 40;

/// Raw shelf configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawShelfConfig {
    #[serde(default)]
    temp_folder: Option<String>,
    #[serde(default = "default_shm_mount")]
    shm_mount: String,
    #[serde(default = "default_shm_min_free_bytes")]
    shm_min_free_bytes: u64,
    #[serde(default = "default_honor_env")]
    honor_env: bool,
    #[serde(default = "default_pool_prefix")]
    pool_prefix: String,
    #[serde(default = "default_backend")]
    backend: String,
    #[serde(default)]
    sync_writes: bool,
}

fn default_shm_mount() -> String {
    SYSTEM_SHARED_MEM_FS.to_string()
}

fn default_shm_min_free_bytes() -> u64 {
    SYSTEM_SHARED_MEM_FS_MIN_SIZE
}

fn default_honor_env() -> bool {
    true
}

fn default_pool_prefix() -> String {
    DEFAULT_POOL_PREFIX.to_string()
}

fn default_backend() -> String {
    BackendKind::Local.name().to_string()
}

impl Default for RawShelfConfig {
    fn default() -> Self {
        Self {
            temp_folder: None,
            shm_mount: default_shm_mount(),
            shm_min_free_bytes: default_shm_min_free_bytes(),
            honor_env: default_honor_env(),
            pool_prefix: default_pool_prefix(),
            backend: default_backend(),
            sync_writes: false,
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    shelf: RawShelfConfig,
}

/// Validated shelf configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfConfig {
    /// Explicit root folder; skips the environment and shared-memory probe.
    pub temp_folder: Option<PathBuf>,
    pub shm_mount: PathBuf,
    pub shm_min_free_bytes: u64,
    pub honor_env: bool,
    pub pool_prefix: String,
    pub backend: BackendKind,
    pub sync_writes: bool,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            temp_folder: None,
            shm_mount: PathBuf::from(SYSTEM_SHARED_MEM_FS),
            shm_min_free_bytes: SYSTEM_SHARED_MEM_FS_MIN_SIZE,
            honor_env: true,
            pool_prefix: DEFAULT_POOL_PREFIX.to_string(),
            backend: BackendKind::Local,
            sync_writes: false,
        }
    }
}

impl ShelfConfig {
    /// Location resolver described by this configuration.
    pub fn resolver(&self) -> LocationResolver {
        LocationResolver::new()
            .with_shm_mount(&self.shm_mount)
            .with_min_free_bytes(self.shm_min_free_bytes)
            .honor_env(self.honor_env)
    }

    /// Backend options described by this configuration.
    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions::new(self.backend).sync_writes(self.sync_writes)
    }

    /// Pool name for the calling process.
    pub fn pool_name(&self) -> Result<PoolName, HardValidationError> {
        PoolName::for_process(&self.pool_prefix)
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> ShelfResult<ShelfConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ShelfError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ShelfError::io("reading config file", e))?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> ShelfResult<ShelfConfig> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| ShelfError::ConfigParse {
            message: format!("YAML parse error: {}", e),
        })?;

        Ok(Self::validate(raw.shelf)?)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawShelfConfig) -> Result<ShelfConfig, HardValidationError> {
        let temp_folder = match raw.temp_folder {
            Some(folder) if folder.trim().is_empty() => {
                return Err(HardValidationError::InvalidFieldValue {
                    field: "temp_folder",
                    value: folder,
                    reason: "Temp folder cannot be blank; omit it instead".to_string(),
                });
            }
            Some(folder) => Some(PathBuf::from(folder)),
            None => None,
        };

        let shm_mount = PathBuf::from(&raw.shm_mount);
        if !shm_mount.is_absolute() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "shm_mount",
                value: raw.shm_mount,
                reason: "Shared memory mount must be an absolute path".to_string(),
            });
        }

        if raw.pool_prefix.len() > MAX_POOL_PREFIX_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "pool_prefix",
                value: raw.pool_prefix.clone(),
                reason: format!(
                    "Too long: {} chars (max {})",
                    raw.pool_prefix.len(),
                    MAX_POOL_PREFIX_LEN
                ),
            });
        }
        PoolName::new(raw.pool_prefix.as_str()).map_err(|mut e| {
            if let HardValidationError::InvalidFieldValue { ref mut field, .. } = e {
                *field = "pool_prefix";
            }
            e
        })?;

        let backend = BackendKind::parse(&raw.backend)?;

        Ok(ShelfConfig {
            temp_folder,
            shm_mount,
            shm_min_free_bytes: raw.shm_min_free_bytes,
            honor_env: raw.honor_env,
            pool_prefix: raw.pool_prefix,
            backend,
            sync_writes: raw.sync_writes,
        })
    }
}
