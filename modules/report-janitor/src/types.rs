use std::fmt;

/// Stats from a janitor run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JanitorStats {
    pub retention: RetentionStats,
    pub dedup: DedupStats,
    pub restored: u64,
    pub merge: MergeStats,
    pub paths_written: u64,
    pub dry_run: bool,
}

impl JanitorStats {
    /// True when the run found nothing to change.
    pub fn is_noop(&self) -> bool {
        self.paths_written == 0
    }
}

impl fmt::Display for JanitorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} restored={} {} paths_written={} dry_run={}",
            self.retention, self.dedup, self.restored, self.merge, self.paths_written, self.dry_run,
        )
    }
}

/// Stats from the retention sweep.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RetentionStats {
    pub live_expired: u64,
    pub live_protected: u64,
    pub trash_expired: u64,
    pub merged_expired: u64,
    pub users_cleared: u64,
}

impl fmt::Display for RetentionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retention(live={} protected={} trash={} merged={} users={})",
            self.live_expired,
            self.live_protected,
            self.trash_expired,
            self.merged_expired,
            self.users_cleared,
        )
    }
}

/// Stats from the deduplication pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DedupStats {
    pub merged_duplicates_removed: u64,
    pub live_losers_trashed: u64,
    pub merged_losers_removed: u64,
}

impl fmt::Display for DedupStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dedup(merged_dupes={} live_losers={} merged_losers={})",
            self.merged_duplicates_removed, self.live_losers_trashed, self.merged_losers_removed,
        )
    }
}

/// Stats from the cluster-and-merge pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeStats {
    pub candidates: u64,
    pub clusters_merged: u64,
    pub reports_absorbed: u64,
    pub live_writes_skipped: u64,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "merge(candidates={} clusters={} absorbed={} live_skipped={})",
            self.candidates, self.clusters_merged, self.reports_absorbed, self.live_writes_skipped,
        )
    }
}
