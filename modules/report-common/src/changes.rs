use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

/// A pending write at one absolute path.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Set(Value),
    Delete,
}

/// Accumulated path writes for a run, applied in one atomic update.
///
/// Paths are `/`-joined without a leading slash (`reports/abc/timestamp`).
/// Writing a path twice keeps the later value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<String, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.changes.insert(path.into(), Change::Set(value));
    }

    pub fn delete(&mut self, path: impl Into<String>) {
        self.changes.insert(path.into(), Change::Delete);
    }

    pub fn get(&self, path: &str) -> Option<&Change> {
        self.changes.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Change)> {
        self.changes.iter()
    }

    /// Fold `other` into `self`; `other` wins on conflicting paths.
    pub fn extend(&mut self, other: ChangeSet) {
        self.changes.extend(other.changes);
    }

    /// Multi-path update body: deletions become `null`.
    pub fn to_update_body(&self) -> Value {
        let mut body = Map::new();
        for (path, change) in &self.changes {
            let value = match change {
                Change::Set(v) => v.clone(),
                Change::Delete => Value::Null,
            };
            body.insert(path.clone(), value);
        }
        Value::Object(body)
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deletes = self
            .changes
            .values()
            .filter(|c| matches!(c, Change::Delete))
            .count();
        write!(
            f,
            "changes(paths={} sets={} deletes={})",
            self.changes.len(),
            self.changes.len() - deletes,
            deletes
        )
    }
}

/// Join path segments, trimming stray slashes from each.
pub fn path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
