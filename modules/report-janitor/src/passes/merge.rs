//! Cluster-and-merge: collapse same-type live reports within the merge
//! radius into one synthesized report.
//!
//! Clustering is single-anchor greedy: each unprocessed candidate, in key
//! order, anchors a cluster and pulls in every later unprocessed candidate of
//! its type within `merge_radius_km` of the anchor itself. Members are not
//! compared with each other, so a chain of points each near its neighbour
//! can split across clusters.

use std::collections::HashSet;

use tracing::{debug, info};

use report_common::{haversine_km, ChangeSet, Report, Snapshot, SynthesizedReport, SYSTEM_USER};

use crate::types::MergeStats;

use super::{soft_delete, RunContext};

/// A group of live reports describing one event. Always two or more members.
#[derive(Debug)]
pub struct Cluster<'a> {
    pub members: Vec<&'a Report>,
}

impl Cluster<'_> {
    pub fn ids(&self) -> Vec<String> {
        self.members.iter().map(|r| r.id.clone()).collect()
    }
}

/// Greedy single-anchor clustering over the cluster-eligible reports of
/// `live`, taken in iteration order.
pub fn find_clusters<'a, I>(live: I, radius_km: f64) -> Vec<Cluster<'a>>
where
    I: IntoIterator<Item = &'a Report>,
{
    let candidates: Vec<&Report> = live.into_iter().filter(|r| r.is_cluster_candidate()).collect();
    let mut processed = vec![false; candidates.len()];
    let mut clusters = Vec::new();

    for (i, anchor) in candidates.iter().enumerate() {
        if processed[i] {
            continue;
        }
        processed[i] = true;

        let (Some(anchor_type), Some((lat, lng))) = (anchor.report_type(), anchor.coords()) else {
            continue;
        };
        let mut members = vec![*anchor];

        for (j, other) in candidates.iter().enumerate().skip(i + 1) {
            if processed[j] || other.report_type() != Some(anchor_type) {
                continue;
            }
            let Some((other_lat, other_lng)) = other.coords() else {
                continue;
            };
            if haversine_km(lat, lng, other_lat, other_lng) <= radius_km {
                processed[j] = true;
                members.push(*other);
            }
        }

        if members.len() >= 2 {
            clusters.push(Cluster { members });
        }
    }

    clusters
}

/// Build the superseding report for a cluster.
///
/// Location, icon and type come from the newest member (first one on ties);
/// descriptions are joined in member order, skipping empty ones.
pub fn synthesize(cluster: &Cluster<'_>) -> Option<SynthesizedReport> {
    let mut newest: Option<(&Report, i64)> = None;
    for &member in &cluster.members {
        let Some(ts) = member.timestamp() else {
            continue;
        };
        match newest {
            Some((_, best)) if ts <= best => {}
            _ => newest = Some((member, ts)),
        }
    }
    let (newest, timestamp) = newest?;
    let (latitude, longitude) = newest.coords()?;

    let description = cluster
        .members
        .iter()
        .map(|r| r.description().trim())
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    Some(SynthesizedReport {
        report_type: newest.report_type()?.to_string(),
        latitude,
        longitude,
        timestamp,
        description,
        icon: newest.icon()?.to_string(),
        submitting_user: SYSTEM_USER.to_string(),
        source_ids: cluster.ids(),
    })
}

/// Merge every cluster in live.
///
/// The synthesized report is always written to merged. It is also written to
/// live unless some live report outside the cluster already sits on the same
/// coordinate key. Members are moved to trash.
pub fn merge_clusters<F>(
    snapshot: &Snapshot,
    ctx: &RunContext<'_>,
    changes: &mut ChangeSet,
    mut next_id: F,
) -> MergeStats
where
    F: FnMut() -> String,
{
    // Expired reports are left to retention.
    let current: Vec<&Report> = snapshot
        .live
        .values()
        .filter(|r| !ctx.is_report_expired(r))
        .collect();

    let mut stats = MergeStats {
        candidates: current.iter().filter(|r| r.is_cluster_candidate()).count() as u64,
        ..MergeStats::default()
    };
    let precision = ctx.policy.coord_precision;

    for cluster in find_clusters(current.iter().copied(), ctx.policy.merge_radius_km) {
        let Some(synthesized) = synthesize(&cluster) else {
            continue;
        };
        let id = next_id();
        let merged = synthesized.into_report(id.clone());

        let member_ids: HashSet<&str> = cluster.members.iter().map(|r| r.id.as_str()).collect();
        let key = merged.coord_key(precision);
        let occupied = current.iter().any(|other| {
            !member_ids.contains(other.id.as_str()) && key.is_some() && other.coord_key(precision) == key
        });

        changes.set(ctx.merged_path(&id), merged.to_value());
        if occupied {
            debug!(id = id.as_str(), "Live report already at merged location, skipping live write");
            stats.live_writes_skipped += 1;
        } else {
            changes.set(ctx.live_path(&id), merged.to_value());
        }

        for member in &cluster.members {
            soft_delete(ctx, member, changes);
        }

        info!(
            id = id.as_str(),
            report_type = merged.report_type().unwrap_or_default(),
            members = cluster.members.len(),
            timestamp = merged.timestamp().unwrap_or_default(),
            "Merged report cluster"
        );
        stats.clusters_merged += 1;
        stats.reports_absorbed += cluster.members.len() as u64;
    }

    info!("{stats}");
    stats
}
