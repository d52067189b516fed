// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shelf reduce` command - Sliding-window sums across worker processes.
//!
//! Shelves `n` random values once, hands the serialized handle to
//! `workers` child processes and checks that their window sums equal the
//! sequential reduction exactly.

use std::process::Stdio;

use memshelf_core::{BackendKind, ShelfService};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::load_config;

/// Sum of the window starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSum {
    pub start: usize,
    pub sum: f64,
}

/// What a worker prints on stdout.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerReport {
    pub pid: u32,
    pub sums: Vec<WindowSum>,
}

/// Sum of `data[start..start + window]`, in index order.
pub fn window_sum(data: &[f64], start: usize, window: usize) -> f64 {
    data[start..start + window].iter().sum()
}

pub async fn execute(
    config_path: Option<&str>,
    n: usize,
    window: usize,
    workers: usize,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if window == 0 || window > n {
        return Err(format!("Window must be between 1 and {} (got {})", n, window).into());
    }
    if workers == 0 {
        return Err("At least one worker is required".into());
    }

    let config = load_config(config_path)?;
    if config.backend == BackendKind::Memory {
        return Err(
            "The memory backend is private to one process; reduce needs backend: local".into(),
        );
    }
    let service = ShelfService::from_config(&config);

    let outcome = run(&service, n, window, workers, seed).await;
    service.close()?;
    outcome
}

async fn run(
    service: &ShelfService,
    n: usize,
    window: usize,
    workers: usize,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();

    let future = service.shelve(&data)?;
    let handle = serde_json::to_string(&future)?;
    tracing::info!(
        location = %future.location().display(),
        id = %future.id(),
        values = n,
        "Shelved input"
    );

    let last_start = n - window;
    let per_worker = (last_start + 1).div_ceil(workers);
    let exe = std::env::current_exe()?;

    let mut children = Vec::with_capacity(workers);
    for first in (0..=last_start).step_by(per_worker) {
        let last = (first + per_worker - 1).min(last_start);
        let child = Command::new(&exe)
            .arg("worker")
            .arg("--handle")
            .arg(&handle)
            .arg("--first")
            .arg(first.to_string())
            .arg("--last")
            .arg(last.to_string())
            .arg("--window")
            .arg(window.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to spawn worker: {}", e))?;
        tracing::debug!(pid = ?child.id(), first = first, last = last, "Spawned worker");
        children.push(child);
    }

    let mut sums = Vec::with_capacity(last_start + 1);
    let mut pids = Vec::with_capacity(children.len());
    for child in children {
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(format!("Worker exited with {}", output.status).into());
        }
        let report: WorkerReport = serde_json::from_slice(&output.stdout)?;
        pids.push(report.pid);
        sums.extend(report.sums);
    }
    sums.sort_by_key(|s| s.start);

    let expected: Vec<WindowSum> = (0..=last_start)
        .map(|start| WindowSum {
            start,
            sum: window_sum(&data, start, window),
        })
        .collect();

    pids.sort_unstable();
    pids.dedup();
    println!("Values:             {}", n);
    println!("Window:             {}", window);
    println!("Windows:            {}", expected.len());
    println!("Worker Processes:   {}", pids.len());

    if sums != expected {
        println!("Matches Sequential: no");
        return Err("Worker sums differ from the sequential reduction".into());
    }
    println!("Matches Sequential: yes");
    Ok(())
}
