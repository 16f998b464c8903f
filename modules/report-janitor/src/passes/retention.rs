use std::collections::HashSet;

use tracing::{debug, info};

use report_common::{ChangeSet, Snapshot, FIELD_LAST_REPORT_TIMESTAMP};

use crate::types::RetentionStats;

use super::RunContext;

/// Evict records older than the retention window.
///
/// Live records whose timestamp equals any merged record's timestamp are
/// kept this run. Trash and merged records expire unconditionally. Users
/// only lose their stale `lastReportTimestamp` field. Records without a
/// numeric timestamp are left alone.
pub fn sweep(snapshot: &Snapshot, ctx: &RunContext<'_>, changes: &mut ChangeSet) -> RetentionStats {
    let mut stats = RetentionStats::default();

    let protected: HashSet<i64> = snapshot
        .merged
        .values()
        .filter_map(|r| r.timestamp())
        .collect();

    for report in snapshot.live.values() {
        let Some(ts) = report.timestamp() else {
            continue;
        };
        if !ctx.is_expired(ts) {
            continue;
        }
        if protected.contains(&ts) {
            debug!(id = report.id.as_str(), timestamp = ts, "Expired live report protected by merged timestamp");
            stats.live_protected += 1;
            continue;
        }
        changes.delete(ctx.live_path(&report.id));
        stats.live_expired += 1;
    }

    for report in snapshot.trash.values() {
        if ctx.is_report_expired(report) {
            changes.delete(ctx.trash_path(&report.id));
            stats.trash_expired += 1;
        }
    }

    for report in snapshot.merged.values() {
        if ctx.is_report_expired(report) {
            changes.delete(ctx.merged_path(&report.id));
            stats.merged_expired += 1;
        }
    }

    for user in snapshot.users.values() {
        if user.last_report_timestamp().is_some_and(|ts| ctx.is_expired(ts)) {
            changes.delete(ctx.user_field_path(&user.id, FIELD_LAST_REPORT_TIMESTAMP));
            stats.users_cleared += 1;
        }
    }

    info!("{stats}");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fire, SnapshotBuilder, TestRun, HOUR, NOW};
    use report_common::Change;
    use serde_json::json;

    fn run(snapshot: &Snapshot) -> (ChangeSet, RetentionStats) {
        let test = TestRun::default();
        let mut changes = ChangeSet::new();
        let stats = sweep(snapshot, &test.ctx(), &mut changes);
        (changes, stats)
    }

    #[test]
    fn live_report_older_than_window_is_evicted() {
        let snapshot = SnapshotBuilder::new()
            .live("old", fire(40.0, -73.0, NOW - 49 * HOUR, "stale"))
            .live("fresh", fire(41.0, -73.0, NOW - HOUR, "fresh"))
            .build();

        let (changes, stats) = run(&snapshot);
        assert_eq!(changes.get("reports/old"), Some(&Change::Delete));
        assert_eq!(changes.get("reports/fresh"), None);
        assert_eq!(stats.live_expired, 1);
    }

    #[test]
    fn exactly_window_old_is_kept() {
        let snapshot = SnapshotBuilder::new()
            .live("edge", fire(40.0, -73.0, NOW - 48 * HOUR, "edge"))
            .build();

        let (changes, _) = run(&snapshot);
        assert!(changes.is_empty());
    }

    #[test]
    fn merged_timestamp_protects_live_report() {
        let ts = NOW - 50 * HOUR;
        let snapshot = SnapshotBuilder::new()
            .live("m1", fire(40.0, -73.0, ts, "merged result"))
            .merged("m1", fire(40.0, -73.0, ts, "merged result"))
            .build();

        let (changes, stats) = run(&snapshot);
        assert_eq!(changes.get("reports/m1"), None);
        assert_eq!(changes.get("mergedReports/m1"), Some(&Change::Delete));
        assert_eq!(stats.live_protected, 1);
        assert_eq!(stats.merged_expired, 1);
    }

    #[test]
    fn trash_expires_unconditionally() {
        let ts = NOW - 72 * HOUR;
        let snapshot = SnapshotBuilder::new()
            .trash("t1", fire(40.0, -73.0, ts, "old"))
            .merged("m1", fire(40.0, -73.0, ts, "old"))
            .build();

        let (changes, stats) = run(&snapshot);
        assert_eq!(changes.get("trash/t1"), Some(&Change::Delete));
        assert_eq!(stats.trash_expired, 1);
    }

    #[test]
    fn stale_user_timestamp_is_cleared_not_deleted() {
        let snapshot = SnapshotBuilder::new()
            .user("u1", json!({ "name": "a", "lastReportTimestamp": NOW - 60 * HOUR }))
            .user("u2", json!({ "name": "b", "lastReportTimestamp": NOW - HOUR }))
            .build();

        let (changes, stats) = run(&snapshot);
        assert_eq!(changes.get("users/u1/lastReportTimestamp"), Some(&Change::Delete));
        assert_eq!(changes.get("users/u1"), None);
        assert_eq!(changes.get("users/u2/lastReportTimestamp"), None);
        assert_eq!(stats.users_cleared, 1);
    }

    #[test]
    fn missing_or_string_timestamps_are_skipped() {
        let snapshot = SnapshotBuilder::new()
            .live("no_ts", json!({ "type": "fire", "latitude": 40.0, "longitude": -73.0 }))
            .live("str_ts", json!({ "type": "fire", "timestamp": "0" }))
            .trash("t_str", json!({ "timestamp": "yesterday" }))
            .user("u1", json!({ "lastReportTimestamp": "0" }))
            .build();

        let (changes, stats) = run(&snapshot);
        assert!(changes.is_empty());
        assert_eq!(stats, RetentionStats::default());
    }

    #[test]
    fn string_merged_timestamp_protects_nothing() {
        let ts = NOW - 50 * HOUR;
        let snapshot = SnapshotBuilder::new()
            .live("l1", fire(40.0, -73.0, ts, "old"))
            .merged("m1", json!({ "timestamp": ts.to_string() }))
            .build();

        let (changes, _) = run(&snapshot);
        assert_eq!(changes.get("reports/l1"), Some(&Change::Delete));
    }
}
