// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shelf reap` command - Reclaim locations left behind by dead processes.

use std::path::PathBuf;

use memshelf_core::location::TEMP_FOLDER_ENV;
use memshelf_core::reap_orphans;

use super::load_config;

pub async fn execute(
    config_path: Option<&str>,
    roots: Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let roots = if roots.is_empty() {
        let config = load_config(config_path)?;
        let mut defaults: Vec<PathBuf> = config.temp_folder.into_iter().collect();
        if config.honor_env {
            defaults.extend(
                std::env::var_os(TEMP_FOLDER_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from),
            );
        }
        defaults.push(config.shm_mount);
        defaults.push(std::env::temp_dir());
        defaults
    } else {
        roots
    };

    let mut total = 0;
    for root in &roots {
        let reaped = reap_orphans(root)?;
        tracing::debug!(root = %root.display(), count = reaped.len(), "Scanned root");
        for path in &reaped {
            println!("Reaped {}", path.display());
        }
        total += reaped.len();
    }

    println!("Reclaimed {} location(s)", total);
    Ok(())
}
