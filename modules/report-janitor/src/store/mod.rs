// Store boundary for the janitor.
//
// ReportStore: the three operations a run needs: read a whole collection,
//   mint a fresh key, and apply one atomic multi-path write.
//
// RtdbClient implements it for production; MemoryStore (testing.rs) for tests.

mod rtdb;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use report_common::ChangeSet;

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Every child of a top-level collection, keyed by id. Absent ⇒ empty.
    async fn read_collection(&self, name: &str) -> Result<BTreeMap<String, Value>>;

    /// A fresh unique key under `collection`. Nothing is written.
    fn new_id(&self, collection: &str) -> String;

    /// Apply every path in `changes` indivisibly.
    async fn apply(&self, changes: &ChangeSet) -> Result<()>;
}
