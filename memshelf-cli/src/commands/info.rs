// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shelf info` command - Show where a shelf would be placed.

use memshelf_core::location::available_bytes;

use super::load_config;

pub async fn execute(config_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let pool = config.pool_name()?;
    let resolved = config
        .resolver()
        .resolve(config.temp_folder.as_deref(), &pool)?;

    // The probe creates the pool folder on the mount; nothing will use it.
    if resolved.used_shared_memory {
        if let Err(e) = std::fs::remove_dir(&resolved.path) {
            tracing::debug!(
                folder = %resolved.path.display(),
                error = %e,
                "Could not remove probe folder"
            );
        }
    }

    println!("Backend:            {}", config.backend);
    println!("Pool:               {}", pool);
    println!("Location:           {}", resolved.path.display());
    println!(
        "Shared Memory:      {}",
        if resolved.used_shared_memory { "yes" } else { "no" }
    );
    match available_bytes(&config.shm_mount) {
        Ok(bytes) => println!(
            "SHM Free:           {} bytes at {} (threshold {})",
            bytes,
            config.shm_mount.display(),
            config.shm_min_free_bytes
        ),
        Err(e) => println!(
            "SHM Free:           unavailable at {} ({})",
            config.shm_mount.display(),
            e
        ),
    }

    Ok(())
}
