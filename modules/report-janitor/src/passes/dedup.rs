//! Same-place deduplication.
//!
//! Two records are duplicates when they share a coordinate key (exact, or
//! rounded to `Policy::coord_precision` decimals). The record with the longer
//! description is the richer one and survives. Records outside the retention
//! window take no part: retention removes them or keeps them, never dedup.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use report_common::{ChangeSet, CoordKey, Report, Snapshot};

use crate::types::DedupStats;

use super::{soft_delete, RunContext};

/// What the pass decided: counters plus the merged ids it removes, which
/// restoration must not bring back in the same run.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub stats: DedupStats,
    pub removed_merged: HashSet<String>,
}

pub fn dedup(snapshot: &Snapshot, ctx: &RunContext<'_>, changes: &mut ChangeSet) -> DedupOutcome {
    let mut outcome = DedupOutcome::default();
    let precision = ctx.policy.coord_precision;

    let merged_dupes = dedup_merged(snapshot, ctx, precision, changes);
    outcome.stats.merged_duplicates_removed = merged_dupes.len() as u64;

    let (live_losers, merged_losers) = dedup_live_against_merged(snapshot, ctx, precision, changes);
    outcome.stats.live_losers_trashed = live_losers;
    outcome.stats.merged_losers_removed = merged_losers.len() as u64;

    outcome.removed_merged = merged_dupes.into_iter().chain(merged_losers).collect();

    info!("{}", outcome.stats);
    outcome
}

/// Within merged: one survivor per coordinate key, the longest description,
/// first in key order on ties.
fn dedup_merged(
    snapshot: &Snapshot,
    ctx: &RunContext<'_>,
    precision: Option<u32>,
    changes: &mut ChangeSet,
) -> Vec<String> {
    let mut groups: BTreeMap<CoordKey, Vec<&Report>> = BTreeMap::new();
    for report in snapshot.merged.values().filter(|r| !ctx.is_report_expired(r)) {
        if let Some(key) = report.coord_key(precision) {
            groups.entry(key).or_default().push(report);
        }
    }

    let mut removed = Vec::new();
    for group in groups.values().filter(|g| g.len() > 1) {
        let keeper = richest(group);
        for report in group.iter().filter(|r| r.id != keeper.id) {
            debug!(
                keep = keeper.id.as_str(),
                drop = report.id.as_str(),
                "Removing duplicate merged report"
            );
            changes.delete(ctx.merged_path(&report.id));
            removed.push(report.id.clone());
        }
    }
    removed
}

/// Live × merged: every same-key pair with distinct ids keeps the longer
/// description. Equal lengths are ambiguous and left alone. Live losers go
/// to trash; merged losers are removed.
fn dedup_live_against_merged(
    snapshot: &Snapshot,
    ctx: &RunContext<'_>,
    precision: Option<u32>,
    changes: &mut ChangeSet,
) -> (u64, Vec<String>) {
    let mut merged_by_key: HashMap<CoordKey, Vec<&Report>> = HashMap::new();
    for report in snapshot.merged.values().filter(|r| !ctx.is_report_expired(r)) {
        if let Some(key) = report.coord_key(precision) {
            merged_by_key.entry(key).or_default().push(report);
        }
    }

    let mut live_losers: HashSet<&str> = HashSet::new();
    let mut merged_losers: HashSet<&str> = HashSet::new();

    for live in snapshot.live.values().filter(|r| !ctx.is_report_expired(r)) {
        let Some(key) = live.coord_key(precision) else {
            continue;
        };
        let Some(candidates) = merged_by_key.get(&key) else {
            continue;
        };
        let live_len = description_len(live);

        for merged in candidates.iter().filter(|m| m.id != live.id) {
            let merged_len = description_len(merged);
            if live_len > merged_len {
                if merged_losers.insert(merged.id.as_str()) {
                    debug!(keep = live.id.as_str(), drop = merged.id.as_str(), "Live report richer than merged duplicate");
                    changes.delete(ctx.merged_path(&merged.id));
                }
            } else if merged_len > live_len && live_losers.insert(live.id.as_str()) {
                debug!(keep = merged.id.as_str(), drop = live.id.as_str(), "Merged report richer than live duplicate");
                soft_delete(ctx, live, changes);
            }
        }
    }

    let merged_losers: Vec<String> = merged_losers.into_iter().map(String::from).collect();
    (live_losers.len() as u64, merged_losers)
}

fn richest<'a>(group: &[&'a Report]) -> &'a Report {
    let mut best = group[0];
    for &report in &group[1..] {
        if description_len(report) > description_len(best) {
            best = report;
        }
    }
    best
}

fn description_len(report: &Report) -> usize {
    report.description().chars().count()
}
