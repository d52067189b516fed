// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for memshelf.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`
//! in the library - all errors are strongly typed and carry the offending
//! key or path.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ItemKey;

/// Top-level error type for shelf operations.
#[derive(Debug, Error)]
pub enum ShelfError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Store Lifecycle Errors
    // =========================================================================
    #[error("Shelf at {location} is already closed")]
    ClosedStore { location: PathBuf },

    // =========================================================================
    // Item Errors - Never Retried
    // =========================================================================
    #[error("Non-existing item: {key}")]
    ItemNotFound { key: ItemKey },

    #[error("Memoized value for {key} is not a {expected}")]
    TypeMismatch { key: ItemKey, expected: &'static str },

    #[error("Corrupt item frame: {reason}")]
    CorruptItem { reason: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    // =========================================================================
    // System Errors - Propagated Unmodified
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ShelfError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    /// Whether this error means the referenced item cannot be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound { .. })
    }
}

/// Hard validation errors reject a configuration before any store is opened.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown backend: {name} (expected one of: local, memory)")]
    UnknownBackend { name: String },
}

/// Result type alias using ShelfError.
pub type ShelfResult<T> = Result<T, ShelfError>;
