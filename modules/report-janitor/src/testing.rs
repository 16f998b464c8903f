// Test support for the janitor.
//
// - MemoryStore (ReportStore): in-memory JSON tree with all-or-nothing apply
//   and switchable read/write failures
// - SnapshotBuilder: assemble a Snapshot without a store
// - TestRun: default collections/policy plus a fixed clock for pass tests
// - fire() / report(): record fixtures

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use report_common::{Change, ChangeSet, Collections, Policy, Report, Snapshot};
use rtdb_client::children_of;

use crate::passes::RunContext;
use crate::store::ReportStore;

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

/// Fixed "now" for deterministic runs (2023-11-14T22:13:20Z).
pub const NOW: i64 = 1_700_000_000;
pub const HOUR: i64 = 3600;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A complete, cluster-eligible "fire" report.
pub fn fire(lat: f64, lng: f64, timestamp: i64, description: &str) -> Value {
    json!({
        "type": "fire",
        "latitude": lat,
        "longitude": lng,
        "timestamp": timestamp,
        "description": description,
        "icon": "flame",
        "submittingUser": "user-1",
    })
}

pub fn report(id: &str, value: Value) -> Report {
    Report::from_value(id, value)
}

// ---------------------------------------------------------------------------
// SnapshotBuilder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SnapshotBuilder {
    live: BTreeMap<String, Value>,
    merged: BTreeMap<String, Value>,
    trash: BTreeMap<String, Value>,
    users: BTreeMap<String, Value>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(mut self, id: &str, value: Value) -> Self {
        self.live.insert(id.to_string(), value);
        self
    }

    pub fn merged(mut self, id: &str, value: Value) -> Self {
        self.merged.insert(id.to_string(), value);
        self
    }

    pub fn trash(mut self, id: &str, value: Value) -> Self {
        self.trash.insert(id.to_string(), value);
        self
    }

    pub fn user(mut self, id: &str, value: Value) -> Self {
        self.users.insert(id.to_string(), value);
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot::from_raw(self.live, self.merged, self.trash, self.users)
    }
}

// ---------------------------------------------------------------------------
// TestRun
// ---------------------------------------------------------------------------

/// Owns what a `RunContext` borrows.
pub struct TestRun {
    pub collections: Collections,
    pub policy: Policy,
    pub now: i64,
}

impl Default for TestRun {
    fn default() -> Self {
        Self::with_policy(Policy::default())
    }
}

impl TestRun {
    pub fn with_policy(policy: Policy) -> Self {
        Self {
            collections: Collections::default(),
            policy,
            now: NOW,
        }
    }

    pub fn ctx(&self) -> RunContext<'_> {
        RunContext {
            collections: &self.collections,
            policy: &self.policy,
            now: self.now,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory tree store. Clones share state, so a test can keep a handle
/// while the janitor owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    root: Mutex<Map<String, Value>>,
    next_id: AtomicU64,
    writes: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: put `value` at `collection/id`.
    pub fn with(self, collection: &str, id: &str, value: Value) -> Self {
        self.put(collection, id, value);
        self
    }

    pub fn put(&self, collection: &str, id: &str, value: Value) {
        let mut root = self.lock();
        set_path(&mut root, &[collection, id], value);
    }

    /// Value at a `/`-separated path, if present.
    pub fn get(&self, path: &str) -> Option<Value> {
        let root = self.lock();
        let mut current = root.get(path.split('/').next()?)?;
        for segment in path.split('/').skip(1) {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    pub fn collection(&self, name: &str) -> BTreeMap<String, Value> {
        self.get(name).map(children_of).unwrap_or_default()
    }

    /// Number of successful `apply` calls.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Whole tree, for before/after comparisons.
    pub fn dump(&self) -> Value {
        Value::Object(self.lock().clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        match self.inner.root.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn read_collection(&self, name: &str) -> Result<BTreeMap<String, Value>> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            bail!("MemoryStore: read of '{name}' failed");
        }
        Ok(self.collection(name))
    }

    fn new_id(&self, collection: &str) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{collection}-{n:06}")
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            bail!("MemoryStore: write of {changes} failed");
        }
        let mut root = self.lock();
        let mut next = root.clone();
        for (path, change) in changes.iter() {
            let segments: Vec<&str> = path.split('/').collect();
            match change {
                Change::Set(value) => set_path(&mut next, &segments, value.clone()),
                Change::Delete => delete_path(&mut next, &segments),
            }
        }
        *root = next;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// Null writes delete, like the real database.
fn set_path(node: &mut Map<String, Value>, segments: &[&str], value: Value) {
    if value.is_null() {
        delete_path(node, segments);
        return;
    }
    match segments {
        [] => {}
        [last] => {
            node.insert(last.to_string(), value);
        }
        [head, rest @ ..] => {
            let child = node
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                set_path(map, rest, value);
            }
        }
    }
}

// Removes the leaf and any ancestors left empty.
fn delete_path(node: &mut Map<String, Value>, segments: &[&str]) {
    match segments {
        [] => {}
        [last] => {
            node.remove(*last);
        }
        [head, rest @ ..] => {
            let now_empty = match node.get_mut(*head) {
                Some(Value::Object(map)) => {
                    delete_path(map, rest);
                    map.is_empty()
                }
                _ => false,
            };
            if now_empty {
                node.remove(*head);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn apply_sets_and_deletes_paths() {
        let store = MemoryStore::new()
            .with("reports", "a", json!({ "x": 1 }))
            .with("users", "u1", json!({ "lastReportTimestamp": 5, "name": "n" }));

        let mut changes = ChangeSet::new();
        changes.delete("reports/a");
        changes.set("trash/a", json!({ "x": 1 }));
        changes.delete("users/u1/lastReportTimestamp");
        store.apply(&changes).await.unwrap();

        assert_eq!(store.get("reports"), None);
        assert_eq!(store.get("trash/a"), Some(json!({ "x": 1 })));
        assert_eq!(store.get("users/u1"), Some(json!({ "name": "n" })));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn failed_write_changes_nothing() {
        let store = MemoryStore::new().with("reports", "a", json!({ "x": 1 }));
        let before = store.dump();
        store.fail_writes(true);

        let mut changes = ChangeSet::new();
        changes.delete("reports/a");
        assert!(store.apply(&changes).await.is_err());
        assert_eq!(store.dump(), before);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_collection_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.read_collection("reports").await.unwrap().is_empty());
    }

    #[test]
    fn new_ids_are_unique_and_ordered() {
        let store = MemoryStore::new();
        let a = store.new_id("mergedReports");
        let b = store.new_id("mergedReports");
        assert!(a < b);
    }
}
