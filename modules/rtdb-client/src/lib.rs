pub mod error;
pub mod push_id;

pub use error::{Result, RtdbError};
pub use push_id::PushIdGenerator;

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

/// Client for a Realtime Database over its REST API.
///
/// Every location is addressed as `{base_url}/{path}.json`; the optional auth
/// token rides along as the `auth` query parameter.
pub struct RtdbClient {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
    ids: PushIdGenerator,
}

impl RtdbClient {
    pub fn new(base_url: &str, auth: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: auth.map(String::from),
            ids: PushIdGenerator::new(),
        })
    }

    /// Read the value at `path`. A missing location reads as `Value::Null`.
    pub async fn get(&self, path: &str) -> Result<Value> {
        let resp = self
            .client
            .get(self.url(path))
            .query(&self.auth_query())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RtdbError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Read every child of `path` keyed by child name. Missing or scalar
    /// locations read as empty.
    pub async fn get_children(&self, path: &str) -> Result<BTreeMap<String, Value>> {
        let value = self.get(path).await?;
        let children = children_of(value);
        tracing::debug!(path, children = children.len(), "Read collection");
        Ok(children)
    }

    /// Multi-path update at the root. Keys are absolute paths; `null` deletes.
    /// The server applies all paths or none.
    pub async fn update(&self, body: &Value) -> Result<()> {
        let resp = self
            .client
            .patch(self.url(""))
            .query(&self.auth_query())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RtdbError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// A fresh child key. Nothing is written.
    pub fn push_id(&self) -> String {
        self.ids.next_id()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        match &self.auth {
            Some(token) => vec![("auth", token.as_str())],
            None => Vec::new(),
        }
    }
}

/// Object values become their entries; arrays (sparse integer keys) are
/// keyed by index with nulls dropped; anything else is empty.
pub fn children_of(value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(auth: Option<&str>) -> RtdbClient {
        RtdbClient::new("https://example.firebaseio.com/", auth, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn url_joins_base_and_path() {
        let c = client(None);
        assert_eq!(c.url("reports"), "https://example.firebaseio.com/reports.json");
        assert_eq!(c.url("/users/u1/"), "https://example.firebaseio.com/users/u1.json");
        assert_eq!(c.url(""), "https://example.firebaseio.com/.json");
    }

    #[test]
    fn auth_query_only_when_token_set() {
        assert!(client(None).auth_query().is_empty());
        assert_eq!(client(Some("tok")).auth_query(), vec![("auth", "tok")]);
    }

    #[test]
    fn null_collection_has_no_children() {
        assert!(children_of(Value::Null).is_empty());
        assert!(children_of(json!("scalar")).is_empty());
    }

    #[test]
    fn object_children_are_keyed_by_name() {
        let children = children_of(json!({ "b": { "x": 1 }, "a": { "x": 2 } }));
        assert_eq!(children.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn array_children_drop_holes() {
        let children = children_of(json!([null, { "x": 1 }, null, { "x": 3 }]));
        assert_eq!(children.keys().collect::<Vec<_>>(), vec!["1", "3"]);
    }

    #[test]
    fn push_ids_are_unique() {
        let c = client(None);
        assert_ne!(c.push_id(), c.push_id());
    }
}
