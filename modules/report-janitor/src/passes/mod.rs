//! The decision passes of a run.
//!
//! Every pass reads the snapshot taken at the start of the run and appends
//! its writes to a shared `ChangeSet`. No pass sees another's pending writes.

pub mod dedup;
pub mod merge;
pub mod restore;
pub mod retention;

use report_common::{path, ChangeSet, Collections, Policy, Report};

/// Inputs shared by all passes within one run.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub collections: &'a Collections,
    pub policy: &'a Policy,
    /// Seconds since epoch, read once per run.
    pub now: i64,
}

impl RunContext<'_> {
    pub fn live_path(&self, id: &str) -> String {
        path(&[&self.collections.live, id])
    }

    pub fn merged_path(&self, id: &str) -> String {
        path(&[&self.collections.merged, id])
    }

    pub fn trash_path(&self, id: &str) -> String {
        path(&[&self.collections.trash, id])
    }

    pub fn user_field_path(&self, id: &str, field: &str) -> String {
        path(&[&self.collections.users, id, field])
    }

    pub fn is_expired(&self, timestamp: i64) -> bool {
        self.policy.is_expired(timestamp, self.now)
    }

    /// True when the record has a numeric timestamp outside the window.
    /// Such records belong to retention; the other passes leave them alone.
    pub fn is_report_expired(&self, report: &Report) -> bool {
        report.timestamp().is_some_and(|ts| self.is_expired(ts))
    }
}

/// Move a live record to trash: full copy into trash, then remove from live.
pub(crate) fn soft_delete(ctx: &RunContext<'_>, report: &Report, changes: &mut ChangeSet) {
    changes.set(ctx.trash_path(&report.id), report.to_value());
    changes.delete(ctx.live_path(&report.id));
}
