// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod info;
pub mod reap;
pub mod reduce;
pub mod validate;
pub mod worker;

use memshelf_core::{ConfigLoader, ShelfConfig, ShelfResult};

/// Load `--config` if given, otherwise the built-in defaults.
pub fn load_config(path: Option<&str>) -> ShelfResult<ShelfConfig> {
    match path {
        Some(path) => ConfigLoader::load_file(path),
        None => Ok(ShelfConfig::default()),
    }
}
