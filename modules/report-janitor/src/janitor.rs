use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use report_common::{ChangeSet, Collections, Config, Policy, Snapshot};

use crate::loader::load_snapshot;
use crate::passes::{dedup, merge, restore, retention, RunContext};
use crate::store::ReportStore;
use crate::types::JanitorStats;

/// The report janitor: one load, every pass, one atomic write.
pub struct Janitor {
    store: Box<dyn ReportStore>,
    collections: Collections,
    policy: Policy,
    dry_run: bool,
}

impl Janitor {
    pub fn new(store: Box<dyn ReportStore>, collections: Collections, policy: Policy) -> Self {
        Self {
            store,
            collections,
            policy,
            dry_run: false,
        }
    }

    pub fn from_config(store: Box<dyn ReportStore>, config: &Config) -> Self {
        Self::new(store, config.collections.clone(), config.policy.clone()).dry_run(config.dry_run)
    }

    /// Compute and log the change-set without writing it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run against the wall clock, read once.
    pub async fn run(&self) -> Result<JanitorStats> {
        self.run_at(Utc::now().timestamp()).await
    }

    /// Run with an explicit `now` (seconds since epoch).
    pub async fn run_at(&self, now: i64) -> Result<JanitorStats> {
        let snapshot = load_snapshot(self.store.as_ref(), &self.collections).await?;

        let (changes, mut stats) = self.plan(&snapshot, now);
        stats.dry_run = self.dry_run;

        if changes.is_empty() {
            info!("Nothing to change");
            return Ok(stats);
        }

        if self.dry_run {
            for (path, change) in changes.iter() {
                info!(path = path.as_str(), change = ?change, "Dry run: would write");
            }
            info!("Dry run: skipping apply of {changes}");
            return Ok(stats);
        }

        self.store
            .apply(&changes)
            .await
            .with_context(|| format!("Failed to apply {changes}"))?;
        info!("Applied {changes}");

        Ok(stats)
    }

    /// Run every pass over `snapshot`. Pure apart from minting ids for merges.
    pub fn plan(&self, snapshot: &Snapshot, now: i64) -> (ChangeSet, JanitorStats) {
        let ctx = RunContext {
            collections: &self.collections,
            policy: &self.policy,
            now,
        };
        let mut changes = ChangeSet::new();
        let mut stats = JanitorStats::default();

        stats.retention = retention::sweep(snapshot, &ctx, &mut changes);
        let deduped = dedup::dedup(snapshot, &ctx, &mut changes);
        stats.restored =
            restore::restore_orphans(snapshot, &ctx, &deduped.removed_merged, &mut changes);
        stats.dedup = deduped.stats;
        stats.merge = merge::merge_clusters(snapshot, &ctx, &mut changes, || {
            self.store.new_id(&self.collections.merged)
        });

        stats.paths_written = changes.len() as u64;
        (changes, stats)
    }
}
