// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shelf worker` command - Child side of `shelf reduce`.

use memshelf_core::ShelfFuture;

use super::reduce::{window_sum, WindowSum, WorkerReport};

pub async fn execute(
    handle: &str,
    first: usize,
    last: usize,
    window: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let future: ShelfFuture<Vec<f64>> = serde_json::from_str(handle)?;
    let data = future.result()?;

    let fits = last
        .checked_add(window)
        .is_some_and(|end| end <= data.len());
    if first > last || !fits {
        return Err(format!(
            "Windows [{}, {}] of width {} exceed {} values",
            first,
            last,
            window,
            data.len()
        )
        .into());
    }

    let sums = (first..=last)
        .map(|start| WindowSum {
            start,
            sum: window_sum(&data, start, window),
        })
        .collect();

    let report = WorkerReport {
        pid: std::process::id(),
        sums,
    };
    tracing::debug!(key = %future.key(), first = first, last = last, "Computed window sums");
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
