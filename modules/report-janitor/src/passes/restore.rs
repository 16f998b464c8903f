use std::collections::HashSet;

use tracing::{info, warn};

use report_common::{ChangeSet, Snapshot};

use super::RunContext;

/// Copy merged records back into live when their live copy is missing.
///
/// A prior run can lose the live copy of a merge result (the live write was
/// skipped as a duplicate, or the run died after a partial publish). Merged
/// records inside the retention window are copied back unmodified.
///
/// A merged record that left live on purpose stays out:
/// - ids in `removed` are being deleted from merged this run
/// - ids already in trash were absorbed or lost a dedup in an earlier run
/// - ids listed in some merged record's `sourceIds` live on in that record
pub fn restore_orphans(
    snapshot: &Snapshot,
    ctx: &RunContext<'_>,
    removed: &HashSet<String>,
    changes: &mut ChangeSet,
) -> u64 {
    let absorbed: HashSet<&str> = snapshot
        .merged
        .values()
        .flat_map(|r| r.source_ids())
        .collect();
    let mut restored = 0u64;

    for report in snapshot.merged.values() {
        let id = report.id.as_str();
        if snapshot.live.contains_key(id)
            || removed.contains(id)
            || snapshot.trash.contains_key(id)
            || absorbed.contains(id)
        {
            continue;
        }
        let Some(ts) = report.timestamp() else {
            continue;
        };
        if ctx.is_expired(ts) {
            continue;
        }
        warn!(id = report.id.as_str(), "Merged report missing from live, restoring");
        changes.set(ctx.live_path(&report.id), report.to_value());
        restored += 1;
    }

    if restored > 0 {
        info!(restored, "Restored orphaned merged reports");
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fire, SnapshotBuilder, TestRun, HOUR, NOW};
    use report_common::Change;
    use serde_json::json;

    fn run_skipping(snapshot: &Snapshot, removed: &[&str]) -> (ChangeSet, u64) {
        let test = TestRun::default();
        let removed: HashSet<String> = removed.iter().map(|s| s.to_string()).collect();
        let mut changes = ChangeSet::new();
        let restored = restore_orphans(snapshot, &test.ctx(), &removed, &mut changes);
        (changes, restored)
    }

    fn run(snapshot: &Snapshot) -> (ChangeSet, u64) {
        run_skipping(snapshot, &[])
    }

    #[test]
    fn orphaned_merged_report_is_copied_unmodified() {
        let mut record = fire(40.0, -73.0, NOW - HOUR, "A, B");
        record["submittingUser"] = json!("0");
        record["extra"] = json!({ "kept": true });
        let snapshot = SnapshotBuilder::new().merged("m1", record.clone()).build();

        let (changes, restored) = run(&snapshot);
        assert_eq!(restored, 1);
        assert_eq!(changes.get("reports/m1"), Some(&Change::Set(record)));
    }

    #[test]
    fn merged_with_live_copy_is_not_restored() {
        let record = fire(40.0, -73.0, NOW - HOUR, "A");
        let snapshot = SnapshotBuilder::new()
            .live("m1", record.clone())
            .merged("m1", record)
            .build();

        let (changes, restored) = run(&snapshot);
        assert_eq!(restored, 0);
        assert!(changes.is_empty());
    }

    #[test]
    fn expired_merged_is_not_restored() {
        let snapshot = SnapshotBuilder::new()
            .merged("m1", fire(40.0, -73.0, NOW - 49 * HOUR, "A"))
            .build();

        let (changes, _) = run(&snapshot);
        assert!(changes.is_empty());
    }

    #[test]
    fn merged_without_timestamp_is_not_restored() {
        let snapshot = SnapshotBuilder::new()
            .merged("m1", json!({ "type": "fire", "description": "A" }))
            .build();

        let (changes, _) = run(&snapshot);
        assert!(changes.is_empty());
    }

    #[test]
    fn merged_removed_this_run_is_not_restored() {
        let snapshot = SnapshotBuilder::new()
            .merged("m1", fire(40.0, -73.0, NOW - HOUR, "A"))
            .merged("m2", fire(41.0, -73.0, NOW - HOUR, "B"))
            .build();

        let (changes, restored) = run_skipping(&snapshot, &["m1"]);
        assert_eq!(restored, 1);
        assert_eq!(changes.get("reports/m1"), None);
        assert!(changes.get("reports/m2").is_some());
    }

    #[test]
    fn merged_already_in_trash_is_not_restored() {
        let record = fire(40.0, -73.0, NOW - HOUR, "A, B");
        let snapshot = SnapshotBuilder::new()
            .merged("m1", record.clone())
            .trash("m1", record)
            .build();

        let (changes, restored) = run(&snapshot);
        assert_eq!(restored, 0);
        assert!(changes.is_empty());
    }

    #[test]
    fn merged_absorbed_by_newer_merge_is_not_restored() {
        let mut newer = fire(40.0001, -73.0001, NOW - HOUR + 5, "A, B, C");
        newer["sourceIds"] = json!(["m1", "c"]);
        let snapshot = SnapshotBuilder::new()
            .live("m2", newer.clone())
            .merged("m1", fire(40.0, -73.0, NOW - HOUR, "A, B"))
            .merged("m2", newer)
            .build();

        let (changes, restored) = run(&snapshot);
        assert_eq!(restored, 0);
        assert_eq!(changes.get("reports/m1"), None);
    }
}
