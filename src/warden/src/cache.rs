//! Per-request rule cache with single-flight semantics
//!
//! The cache maps an opaque string key to the *pending* outcome of a
//! predicate, not just to its completed result. The entry is installed
//! before the predicate makes progress, so concurrently evaluated branches
//! of a rule tree that race for the same key attach to one shared
//! computation instead of invoking the predicate twice.
//!
//! The cache is owned by a single request's context and is discarded with
//! it; nothing here ever outlives or crosses a request boundary.

use crate::types::{Fault, Verdict};
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::trace;

/// Outcome of one predicate execution: a verdict, or the fault that
/// prevented one.
pub type Resolution = std::result::Result<Verdict, Fault>;

/// A pending or completed resolution that any number of callers can await
pub type SharedResolution = Shared<BoxFuture<'static, Resolution>>;

/// Key → pending-resolution store for one request
#[derive(Default)]
pub struct RequestCache {
    entries: DashMap<String, SharedResolution>,
}

impl RequestCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared resolution for `key`, installing one with `resolve`
    /// if the key is vacant.
    ///
    /// The returned handle may still be in flight. `resolve` is called at
    /// most once per key for the lifetime of this cache: the map entry is
    /// written while the shard is exclusively held, before the future is
    /// first polled, so racing callers always observe the same handle.
    pub fn single_flight<F>(&self, key: &str, resolve: F) -> SharedResolution
    where
        F: FnOnce() -> BoxFuture<'static, Resolution>,
    {
        self.entries
            .entry(key.to_owned())
            .or_insert_with(|| {
                trace!(%key, "installing rule resolution");
                resolve().shared()
            })
            .clone()
    }

    /// Whether a resolution is installed under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of installed resolutions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no resolutions yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
