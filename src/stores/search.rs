//! Minimal blocking client for the Elasticsearch REST API.
//!
//! - Blocking client using `ureq` (no async).
//! - Covers only document indexing and `_search`; the query body is built by
//!   `services::indexer`, never taken from callers verbatim.

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::error::StoreError;
use crate::models::sensor::SearchDocument;

pub trait SearchStore {
    fn index_document(&self, index: &str, doc: &SearchDocument) -> Result<(), StoreError>;
    /// Run a translated query body and return the `_source` of each hit, in rank order.
    fn search(&self, index: &str, body: &Value) -> Result<Vec<SearchDocument>, StoreError>;
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: SearchDocument,
}

pub struct ElasticsearchClient {
    agent: ureq::Agent,
    base_url: String,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder().timeout_global(Some(timeout)).build();
        ElasticsearchClient {
            agent: config.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// POST a JSON body; `Ok(None)` when the target does not exist (http 404).
    fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<Option<T>, StoreError> {
        let url = self.url(path);
        match self.agent.post(&url).header("Accept", "application/json").send_json(body) {
            Ok(mut res) => res
                .body_mut()
                .read_json::<T>()
                .map(Some)
                .map_err(|e| StoreError::Decode(format!("{}: {}", url, e))),
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(ureq::Error::StatusCode(status)) => Err(StoreError::Query(format!("http {} from {}", status, url))),
            Err(e) => Err(StoreError::Unavailable(format!("{}: {}", url, e))),
        }
    }
}

impl SearchStore for ElasticsearchClient {
    fn index_document(&self, index: &str, doc: &SearchDocument) -> Result<(), StoreError> {
        // wait_for keeps a create-then-search sequence consistent
        let path = format!("/{}/_doc?refresh=wait_for", index);
        let _: Value = self
            .post_json(&path, doc)?
            .ok_or_else(|| StoreError::Query(format!("index {} rejected document", index)))?;
        Ok(())
    }

    fn search(&self, index: &str, body: &Value) -> Result<Vec<SearchDocument>, StoreError> {
        // index is created lazily by the first indexed sensor
        let resp: Option<SearchResponse> = self.post_json(&format!("/{}/_search", index), body)?;
        Ok(resp
            .map(|r| r.hits.hits.into_iter().map(|h| h.source).collect())
            .unwrap_or_default())
    }
}
