use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use report_common::{Collections, Snapshot};

use crate::store::ReportStore;

/// Read all four collections concurrently. Any failed read fails the load.
pub async fn load_snapshot(store: &dyn ReportStore, collections: &Collections) -> Result<Snapshot> {
    let (live, merged, trash, users) = futures::try_join!(
        read(store, &collections.live),
        read(store, &collections.merged),
        read(store, &collections.trash),
        read(store, &collections.users),
    )?;

    let snapshot = Snapshot::from_raw(live, merged, trash, users);
    info!(
        live = snapshot.live.len(),
        merged = snapshot.merged.len(),
        trash = snapshot.trash.len(),
        users = snapshot.users.len(),
        "Loaded snapshot"
    );
    Ok(snapshot)
}

async fn read(store: &dyn ReportStore, name: &str) -> Result<BTreeMap<String, Value>> {
    store
        .read_collection(name)
        .await
        .with_context(|| format!("Failed to read collection '{name}'"))
}
