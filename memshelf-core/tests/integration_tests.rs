// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end tests for the shelf, its handles and the default service.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::thread;

use memshelf_core::{
    memo, BackendKind, BackendOptions, ItemId, Shelf, ShelfError, ShelfFuture, SidecarRegistry,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

fn open_shelf(dir: &TempDir) -> Shelf {
    Shelf::open(
        dir.path().join("pool"),
        &BackendOptions::default(),
        SidecarRegistry::new_shared(),
    )
    .expect("Failed to open shelf")
}

fn assert_round_trip<T>(shelf: &Shelf, value: T)
where
    T: Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug + Send + Sync + 'static,
{
    let future = shelf.shelve(&value).unwrap();
    assert!(!future.is_memoized());
    assert_eq!(*future.result().unwrap(), value);
    assert!(future.is_memoized());
    assert!(memo::contains(future.key()));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Experiment {
    name: String,
    weights: Vec<f64>,
    tags: BTreeMap<String, Option<u32>>,
}

#[test]
fn test_round_trip_supported_values() {
    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);

    assert_round_trip(&shelf, 42i64);
    assert_round_trip(&shelf, "text".to_string());
    assert_round_trip(&shelf, json!(["pi", 3.14, null]));
    assert_round_trip(&shelf, json!({"a": 0, "1": "b"}));
    assert_round_trip(
        &shelf,
        Experiment {
            name: "baseline".to_string(),
            weights: vec![0.5, -1.25, 1e-9],
            tags: BTreeMap::from([("seed".to_string(), Some(7)), ("gpu".to_string(), None)]),
        },
    );
    assert_round_trip(&shelf, vec![0u8; 1 << 20]);
}

#[test]
fn test_non_finite_floats_are_refused() {
    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);

    let err = shelf
        .shelve(&vec![Some(f64::NAN), Some(f64::INFINITY), Some(1.0)])
        .unwrap_err();
    assert!(matches!(err, ShelfError::Serialization { .. }));

    let err = shelf.shelve(&vec![f64::NAN, 2.0]).unwrap_err();
    assert!(matches!(err, ShelfError::Serialization { .. }));

    // Nothing was written and the shelf keeps working.
    assert!(shelf.is_empty().unwrap());
    assert_round_trip(&shelf, vec![Some(0.25f64), None, Some(-1.0)]);
}

#[test]
fn test_bad_shelf_access() {
    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);
    let sx = shelf.shelve(&42).unwrap();
    let sy = shelf.shelve(&69).unwrap();
    assert_eq!(sx.location(), sy.location());
    assert_ne!(sx.id(), sy.id());

    let fabricated_id: ShelfFuture<i32> =
        ShelfFuture::new(sx.location(), ItemId::new("abc").unwrap(), BackendKind::Local);
    let err = fabricated_id.result().unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Non-existing item"));

    let fabricated_location: ShelfFuture<i32> =
        ShelfFuture::new(dir.path().join("elsewhere"), sx.id().clone(), BackendKind::Local);
    let err = fabricated_location.result().unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Non-existing item"));
}

#[test]
fn test_identifiers_never_collide() {
    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);

    let mut seen = HashSet::new();
    for i in 0..2_000u32 {
        let future = shelf.shelve(&i).unwrap();
        assert!(seen.insert(future.id().clone()), "duplicate id at {}", i);
    }
    assert_eq!(shelf.len().unwrap(), 2_000);

    // The generator alone, far beyond what is practical on disk.
    let ids: HashSet<ItemId> = (0..100_000).map(|_| ItemId::generate()).collect();
    assert_eq!(ids.len(), 100_000);
}

#[test]
fn test_clear_keeps_shelf_usable() {
    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);
    let before = shelf.shelve(&"before".to_string()).unwrap();
    shelf.shelve(&[1, 2, 3]).unwrap();

    shelf.clear().unwrap();
    assert!(shelf.is_open());
    assert!(shelf.location().is_dir());
    assert_eq!(std::fs::read_dir(shelf.location()).unwrap().count(), 0);
    assert!(before.result().unwrap_err().is_not_found());

    // Idempotent.
    shelf.clear().unwrap();

    let after = shelf.shelve(&"after".to_string()).unwrap();
    assert_eq!(after.result().unwrap().as_str(), "after");
}

#[test]
fn test_close_is_final() {
    let dir = TempDir::new().unwrap();
    let mut shelf = open_shelf(&dir);
    let location = shelf.location().to_path_buf();
    let future = shelf.shelve(&vec![1.0f64, 2.0]).unwrap();

    shelf.close().unwrap();
    assert!(!location.exists());
    assert!(matches!(
        shelf.shelve(&1),
        Err(ShelfError::ClosedStore { .. })
    ));
    shelf.close().unwrap();

    // Never resolved before close, so nothing is memoized.
    assert!(future.result().unwrap_err().is_not_found());
}

#[test]
fn test_item_clear_leaves_memoized_value() {
    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);
    let future = shelf.shelve(&"cached".to_string()).unwrap();
    assert_eq!(future.result().unwrap().as_str(), "cached");

    future.clear().unwrap();
    assert!(!shelf.item_ids().unwrap().contains(future.id()));
    // Accepted staleness: this process still sees the memoized value.
    assert_eq!(future.result().unwrap().as_str(), "cached");

    assert!(memo::forget(future.key()));
    assert!(future.result().unwrap_err().is_not_found());

    // Clearing an already-cleared item is harmless.
    future.clear().unwrap();
}

#[test]
fn test_handles_survive_serialization() {
    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);
    let future = shelf.shelve(&json!({"k": [1, 2, 3]})).unwrap();

    let wire = serde_json::to_string(&future).unwrap();
    let received: ShelfFuture<serde_json::Value> = serde_json::from_str(&wire).unwrap();
    assert_eq!(received, future);
    assert_eq!(*received.result().unwrap(), json!({"k": [1, 2, 3]}));
}

#[test]
fn test_shared_reduction_across_threads() {
    const N: usize = 100;
    const R: usize = 40;
    const WORKERS: usize = 4;

    let dir = TempDir::new().unwrap();
    let shelf = open_shelf(&dir);
    let data: Vec<f64> = (0..N).map(|i| ((i * 7919) % 1000) as f64 / 997.0).collect();
    let shelved = shelf.shelve(&data).unwrap();
    let wire = Arc::new(serde_json::to_string(&shelved).unwrap());

    let starts: Vec<usize> = (0..=N - R).collect();
    let chunks: Vec<Vec<usize>> = starts
        .chunks(starts.len().div_ceil(WORKERS))
        .map(<[usize]>::to_vec)
        .collect();

    let handles: Vec<_> = chunks
        .into_iter()
        .map(|chunk| {
            let wire = Arc::clone(&wire);
            thread::spawn(move || {
                let future: ShelfFuture<Vec<f64>> = serde_json::from_str(&wire).unwrap();
                chunk
                    .into_iter()
                    .map(|i| (i, future.result().unwrap()[i..i + R].iter().sum::<f64>()))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut out: Vec<(usize, f64)> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("worker should not panic"))
        .collect();
    out.sort_by_key(|(i, _)| *i);

    let expected: Vec<f64> = (0..=N - R).map(|i| data[i..i + R].iter().sum()).collect();
    let actual: Vec<f64> = out.into_iter().map(|(_, sum)| sum).collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_default_service_wrappers() {
    let sx = memshelf_core::shelve(&42).unwrap();
    let sy = memshelf_core::shelve(&"text".to_string()).unwrap();
    assert_eq!(sx.location(), sy.location());
    assert_ne!(sx.id(), sy.id());
    assert_eq!(*sx.result().unwrap(), 42);
    assert_eq!(
        memshelf_core::default_service().location().as_deref(),
        Some(sx.location())
    );

    memshelf_core::clear().unwrap();
    assert!(memshelf_core::default_service().is_active());
    assert!(!sy.is_memoized());
    assert!(sy.result().unwrap_err().is_not_found());

    let location = sx.location().to_path_buf();
    memshelf_core::shutdown().unwrap();
    assert!(!location.exists());
    assert!(!memshelf_core::default_service().is_active());
}
