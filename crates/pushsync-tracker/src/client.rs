use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use pushsync_core::{ArtifactKind, Config, ScheduleState};

use crate::error::TrackerError;
use crate::wire::{
    CreateEnvelope, CreateResult, NewChange, NewChangeset, NewRepository, OperationEnvelope,
    OperationResult, Query, QueryEnvelope, QueryResult, StateUpdate,
};
use crate::Tracker;

/// REST API root under the tracker base URL.
const API_PATH: &str = "/slm/webservice/v2.0";

/// Header carrying the API key on every request (`ZSESSIONID`; header names
/// are case-insensitive and `HeaderMap` wants them lowercase).
const SESSION_HEADER: &str = "zsessionid";

/// HTTP client for the tracker web services API.
pub struct RallyClient {
    http: reqwest::Client,
    api_root: String,
}

impl RallyClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, TrackerError> {
        let base_url = base_url.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        // A key with bytes outside visible ASCII cannot go into a header; send
        // none and let the tracker reject the requests.
        if let Ok(mut value) = HeaderValue::from_str(api_key) {
            value.set_sensitive(true);
            headers.insert(SESSION_HEADER, value);
        } else {
            tracing::warn!("api key is not a valid header value, requests will be unauthenticated");
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| TrackerError::Http {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            api_root: format!("{base_url}{API_PATH}"),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TrackerError> {
        Self::new(
            &config.tracker_url,
            &config.api_key,
            config.request_timeout(),
        )
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn collection_url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_root)
    }

    /// Object references are absolute URLs; relative ones are resolved
    /// against the API root.
    fn object_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}/{}", self.api_root, reference.trim_start_matches('/'))
        }
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, TrackerError> {
        tracing::debug!(%url, "tracker POST");
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| TrackerError::Http {
                url: url.to_string(),
                source,
            })?;
        read_json(url, resp).await
    }

    async fn create<B: Serialize>(
        &self,
        path: &str,
        wrapper: &str,
        body: &B,
    ) -> Result<CreateResult, TrackerError> {
        let url = format!("{}/create", self.collection_url(path));
        let envelope = BTreeMap::from([(wrapper, body)]);
        let env: CreateEnvelope = self.post(&url, &envelope).await?;
        Ok(env.create_result)
    }
}

async fn read_json<T: DeserializeOwned>(
    url: &str,
    resp: reqwest::Response,
) -> Result<T, TrackerError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(TrackerError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = resp.bytes().await.map_err(|source| TrackerError::Http {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| TrackerError::Decode {
        url: url.to_string(),
        source,
    })
}

#[async_trait::async_trait]
impl Tracker for RallyClient {
    async fn query(&self, query: &Query) -> Result<QueryResult, TrackerError> {
        let url = self.collection_url(query.collection.path());
        let expression = query.expression();
        tracing::debug!(%url, query = %expression, "tracker GET");
        let resp = self
            .http
            .get(&url)
            .query(&[("query", expression.as_str())])
            .send()
            .await
            .map_err(|source| TrackerError::Http {
                url: url.clone(),
                source,
            })?;
        let env: QueryEnvelope = read_json(&url, resp).await?;
        Ok(env.query_result)
    }

    async fn create_repository(&self, repo: &NewRepository) -> Result<CreateResult, TrackerError> {
        self.create("scmrepository", "SCMRepository", repo).await
    }

    async fn create_changeset(
        &self,
        changeset: &NewChangeset,
    ) -> Result<CreateResult, TrackerError> {
        self.create("changeset", "Changeset", changeset).await
    }

    async fn create_change(&self, change: &NewChange) -> Result<CreateResult, TrackerError> {
        self.create("change", "Change", change).await
    }

    async fn update_state(
        &self,
        artifact_ref: &str,
        kind: ArtifactKind,
        state: ScheduleState,
    ) -> Result<OperationResult, TrackerError> {
        let url = self.object_url(artifact_ref);
        let update = StateUpdate {
            schedule_state: state,
        };
        let envelope = BTreeMap::from([(kind.type_name(), update)]);
        let env: OperationEnvelope = self.post(&url, &envelope).await?;
        Ok(env.operation_result)
    }
}

// ── Tests ──
