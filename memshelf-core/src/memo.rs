// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process-wide memoization of resolved handles.
//!
//! Maps `(location, id)` to the last successfully resolved value. Entries
//! are never evicted automatically and are not invalidated when an item is
//! cleared elsewhere: a handle resolved once keeps returning its value in
//! this process. Growth is bounded only by what callers resolve; use
//! [`forget`] or [`clear`] to drop entries out of band.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::types::ItemKey;

pub(crate) type Memoized = Arc<dyn Any + Send + Sync>;

fn futures() -> &'static DashMap<ItemKey, Memoized> {
    static FUTURES: OnceLock<DashMap<ItemKey, Memoized>> = OnceLock::new();
    FUTURES.get_or_init(DashMap::new)
}

pub(crate) fn get(key: &ItemKey) -> Option<Memoized> {
    futures().get(key).map(|entry| Arc::clone(entry.value()))
}

pub(crate) fn insert(key: ItemKey, value: Memoized) {
    futures().insert(key, value);
}

/// Whether a value is memoized for `key`.
pub fn contains(key: &ItemKey) -> bool {
    futures().contains_key(key)
}

/// Drop the memoized value for `key`. Returns `true` if one existed.
pub fn forget(key: &ItemKey) -> bool {
    futures().remove(key).is_some()
}

/// Drop every memoized value in this process.
pub fn clear() {
    futures().clear();
}

/// Number of memoized values.
pub fn len() -> usize {
    futures().len()
}

pub fn is_empty() -> bool {
    futures().is_empty()
}
