use std::env;
use std::str::FromStr;

use chrono::Duration;
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_MAX_AGE_HOURS: i64 = 48;
pub const DEFAULT_MERGE_RADIUS_KM: f64 = 0.1;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Names of the four collections under the database root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub live: String,
    pub merged: String,
    pub trash: String,
    pub users: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            live: "reports".to_string(),
            merged: "mergedReports".to_string(),
            trash: "trash".to_string(),
            users: "users".to_string(),
        }
    }
}

/// Retention and merge thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub max_age: Duration,
    pub merge_radius_km: f64,
    /// Decimal places for "same place" keys. `None` compares coordinates exactly.
    pub coord_precision: Option<u32>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(DEFAULT_MAX_AGE_HOURS),
            merge_radius_km: DEFAULT_MERGE_RADIUS_KM,
            coord_precision: None,
        }
    }
}

impl Policy {
    /// True when `timestamp` is strictly older than the retention window at `now`.
    pub fn is_expired(&self, timestamp: i64, now: i64) -> bool {
        now.saturating_sub(timestamp) > self.max_age.num_seconds()
    }
}

/// Janitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Store
    pub rtdb_url: String,
    pub rtdb_auth: Option<String>,
    pub http_timeout_secs: u64,

    pub collections: Collections,
    pub policy: Policy,

    /// Compute the change-set but never write it.
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Collections::default();

        let max_age_hours: i64 = parse_or(&get, "MAX_AGE_HOURS", DEFAULT_MAX_AGE_HOURS)?;
        if max_age_hours <= 0 {
            return Err(invalid("MAX_AGE_HOURS", max_age_hours, "must be positive"));
        }
        let max_age = Duration::try_hours(max_age_hours)
            .ok_or_else(|| invalid("MAX_AGE_HOURS", max_age_hours, "out of range"))?;
        let merge_radius_km: f64 = parse_or(&get, "MERGE_RADIUS_KM", DEFAULT_MERGE_RADIUS_KM)?;
        if !merge_radius_km.is_finite() || merge_radius_km < 0.0 {
            return Err(invalid(
                "MERGE_RADIUS_KM",
                merge_radius_km,
                "must be a non-negative number",
            ));
        }
        let coord_precision = match get("COORD_PRECISION") {
            Some(raw) => Some(parse("COORD_PRECISION", &raw)?),
            None => None,
        };

        Ok(Self {
            rtdb_url: get("RTDB_URL").ok_or_else(|| ConfigError::Missing("RTDB_URL".into()))?,
            rtdb_auth: get("RTDB_AUTH"),
            http_timeout_secs: parse_or(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            collections: Collections {
                live: get("REPORTS_PATH").unwrap_or(defaults.live),
                merged: get("MERGED_PATH").unwrap_or(defaults.merged),
                trash: get("TRASH_PATH").unwrap_or(defaults.trash),
                users: get("USERS_PATH").unwrap_or(defaults.users),
            },
            policy: Policy {
                max_age,
                merge_radius_km,
                coord_precision,
            },
            dry_run: parse_or(&get, "DRY_RUN", false)?,
        })
    }

    /// Log the effective configuration with the auth token masked.
    pub fn log_redacted(&self) {
        info!(
            rtdb_url = self.rtdb_url.as_str(),
            rtdb_auth = if self.rtdb_auth.is_some() { "****" } else { "<unset>" },
            live = self.collections.live.as_str(),
            merged = self.collections.merged.as_str(),
            trash = self.collections.trash.as_str(),
            users = self.collections.users.as_str(),
            max_age_hours = self.policy.max_age.num_hours(),
            merge_radius_km = self.policy.merge_radius_km,
            coord_precision = ?self.policy.coord_precision,
            dry_run = self.dry_run,
            "Loaded config"
        );
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

fn invalid(key: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
