// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shelf validate` command - Validate configuration file.

use memshelf_core::ConfigLoader;

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Shelf Settings:");
            match &config.temp_folder {
                Some(folder) => println!("  Temp Folder:        {}", folder.display()),
                None => println!("  Temp Folder:        (resolved at runtime)"),
            }
            println!("  SHM Mount:          {}", config.shm_mount.display());
            println!("  SHM Min Free:       {} bytes", config.shm_min_free_bytes);
            println!("  Honor Environment:  {}", config.honor_env);
            println!("  Pool Prefix:        {}", config.pool_prefix);
            println!("  Backend:            {}", config.backend);
            println!("  Sync Writes:        {}", config.sync_writes);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
