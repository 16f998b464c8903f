use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use report_common::ChangeSet;
use rtdb_client::RtdbClient;

use super::ReportStore;

#[async_trait]
impl ReportStore for RtdbClient {
    async fn read_collection(&self, name: &str) -> Result<BTreeMap<String, Value>> {
        Ok(self.get_children(name).await?)
    }

    fn new_id(&self, _collection: &str) -> String {
        self.push_id()
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<()> {
        Ok(self.update(&changes.to_update_body()).await?)
    }
}
