// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern to ensure valid state by construction.
//! Identifiers end up as directory names inside a shared location, so every
//! type here rejects anything that could escape that directory.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum length of an item identifier or pool name.
const MAX_NAME_LEN: usize = 64;

fn validate_name(field: &'static str, value: &str) -> Result<(), HardValidationError> {
    if value.is_empty() {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value: value.to_string(),
            reason: "Value cannot be empty".to_string(),
        });
    }

    if value.len() > MAX_NAME_LEN {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value: value.to_string(),
            reason: format!("Too long: {} chars (max {})", value.len(), MAX_NAME_LEN),
        });
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value: value.to_string(),
            reason: "Must contain only ASCII alphanumeric characters, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Identifier of one item inside a shelf.
///
/// Freshly generated identifiers are random UUID v4 values rendered as 32
/// lowercase hex characters. Collision freedom comes from the 122 random
/// bits, not from checking the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parse an identifier received from elsewhere (e.g. a deserialized handle).
    pub fn new(id: impl Into<String>) -> Result<Self, HardValidationError> {
        let id = id.into();
        validate_name("item_id", &id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ItemId {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// Composite address of an item: the shelf location plus the item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub location: PathBuf,
    pub id: ItemId,
}

impl ItemKey {
    pub fn new(location: impl Into<PathBuf>, id: ItemId) -> Self {
        Self {
            location: location.into(),
            id,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.location.display(), self.id)
    }
}

/// Name of the sub-folder a shelf lives in under the resolved root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PoolName(String);

impl PoolName {
    /// Create a new PoolName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();
        validate_name("pool_name", &name)?;
        Ok(Self(name))
    }

    /// Pool name unique to the calling process: `<prefix>_<pid>`.
    pub fn for_process(prefix: &str) -> Result<Self, HardValidationError> {
        Self::new(format!("{}_{}", prefix, ProcessId::current()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of this pool under `root`.
    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for PoolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PoolName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PoolName> for String {
    fn from(name: PoolName) -> Self {
        name.0
    }
}

/// Validated process ID.
/// Must be positive (non-zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ProcessId(u32);

impl ProcessId {
    /// Create a new ProcessId with validation.
    pub fn new(pid: u32) -> Result<Self, HardValidationError> {
        if pid == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "process_id",
                value: "0".to_string(),
                reason: "Process ID 0 is reserved".to_string(),
            });
        }
        Ok(Self(pid))
    }

    /// The calling process.
    pub fn current() -> Self {
        Self(nix::unistd::getpid().as_raw() as u32)
    }

    /// Get the inner PID value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Whether a process with this ID is still running.
    ///
    /// `EPERM` means the process exists but belongs to someone else.
    pub fn is_alive(&self) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        match kill(Pid::from_raw(self.0 as i32), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for ProcessId {
    type Error = HardValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProcessId> for u32 {
    fn from(pid: ProcessId) -> Self {
        pid.0
    }
}
