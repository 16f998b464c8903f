use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geo::CoordKey;

/// `submittingUser` value stamped on records the janitor synthesizes.
pub const SYSTEM_USER: &str = "0";

// --- Field names as stored ---

pub const FIELD_TYPE: &str = "type";
pub const FIELD_LATITUDE: &str = "latitude";
pub const FIELD_LONGITUDE: &str = "longitude";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_ICON: &str = "icon";
pub const FIELD_SUBMITTING_USER: &str = "submittingUser";
pub const FIELD_SOURCE_IDS: &str = "sourceIds";
pub const FIELD_LAST_REPORT_TIMESTAMP: &str = "lastReportTimestamp";

/// A record as it sits in the store: its key plus an untyped field bag.
///
/// Nothing about the shape is trusted. Accessors return `None` for absent or
/// wrongly-typed fields and callers skip the record for that decision.
/// `fields` is kept verbatim so copies to trash or back to live lose nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Report {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build from a raw store value. Non-object values yield an empty bag.
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, fields)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn report_type(&self) -> Option<&str> {
        self.str_field(FIELD_TYPE)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.fields.get(FIELD_LATITUDE).and_then(Value::as_f64)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.fields.get(FIELD_LONGITUDE).and_then(Value::as_f64)
    }

    /// Both coordinates, only when both are numeric.
    pub fn coords(&self) -> Option<(f64, f64)> {
        Some((self.latitude()?, self.longitude()?))
    }

    pub fn coord_key(&self, precision: Option<u32>) -> Option<CoordKey> {
        let (lat, lng) = self.coords()?;
        Some(CoordKey::new(lat, lng, precision))
    }

    /// Seconds since epoch. Fractional values are truncated; strings are rejected.
    pub fn timestamp(&self) -> Option<i64> {
        self.fields.get(FIELD_TIMESTAMP).and_then(numeric_seconds)
    }

    /// Absent or non-string descriptions read as empty.
    pub fn description(&self) -> &str {
        self.str_field(FIELD_DESCRIPTION).unwrap_or("")
    }

    pub fn icon(&self) -> Option<&str> {
        self.str_field(FIELD_ICON)
    }

    pub fn submitting_user(&self) -> Option<&str> {
        self.str_field(FIELD_SUBMITTING_USER)
    }

    pub fn is_system_synthesized(&self) -> bool {
        self.submitting_user() == Some(SYSTEM_USER)
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.fields
            .get(FIELD_SOURCE_IDS)
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// True when every field clustering needs is present and usable.
    pub fn is_cluster_candidate(&self) -> bool {
        non_empty(self.report_type())
            && self.coords().is_some()
            && self.timestamp().is_some()
            && non_empty(self.icon())
            && non_empty(self.submitting_user())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.is_empty())
}

/// Interpret a JSON value as whole seconds. Only JSON numbers qualify.
pub fn numeric_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        _ => None,
    }
}

/// A per-user metadata record. Only `lastReportTimestamp` matters here.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl UserRecord {
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn last_report_timestamp(&self) -> Option<i64> {
        self.fields
            .get(FIELD_LAST_REPORT_TIMESTAMP)
            .and_then(numeric_seconds)
    }
}

/// Fields of a report the janitor writes when it merges a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedReport {
    #[serde(rename = "type")]
    pub report_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
    pub description: String,
    pub icon: String,
    pub submitting_user: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<String>,
}

impl SynthesizedReport {
    pub fn into_report(self, id: impl Into<String>) -> Report {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        Report::from_value(id, value)
    }
}

/// The four collections as read at the start of a run.
///
/// Maps are ordered by key, which is the iteration order every pass uses.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub live: BTreeMap<String, Report>,
    pub merged: BTreeMap<String, Report>,
    pub trash: BTreeMap<String, Report>,
    pub users: BTreeMap<String, UserRecord>,
}

impl Snapshot {
    pub fn from_raw(
        live: BTreeMap<String, Value>,
        merged: BTreeMap<String, Value>,
        trash: BTreeMap<String, Value>,
        users: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            live: reports(live),
            merged: reports(merged),
            trash: reports(trash),
            users: users
                .into_iter()
                .map(|(id, v)| (id.clone(), UserRecord::from_value(id, v)))
                .collect(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.live.len() + self.merged.len() + self.trash.len() + self.users.len()
    }
}

fn reports(raw: BTreeMap<String, Value>) -> BTreeMap<String, Report> {
    raw.into_iter()
        .map(|(id, v)| (id.clone(), Report::from_value(id, v)))
        .collect()
}
