// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! memshelf Benchmark Support
//!
//! Payload generators shared by the criterion benches.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Element counts used across benchmark groups.
pub const PAYLOAD_LENGTHS: &[usize] = &[16, 1_024, 65_536];

/// Dense numeric payload, the common case for shared arrays.
pub fn float_payload(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen::<f64>()).collect()
}

/// One row of a record-shaped payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub label: String,
    pub score: f64,
}

/// Record-shaped payload with strings and mixed fields.
pub fn record_payload(len: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len as u64)
        .map(|id| Record {
            id,
            label: format!("record-{}", id),
            score: rng.gen_range(-1.0..1.0),
        })
        .collect()
}
