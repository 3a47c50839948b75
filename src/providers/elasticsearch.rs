//! Elasticsearch REST Client
//!
//! Thin wrapper over the four cluster-management endpoints we need:
//! - `GET /` for the node name
//! - `GET /_cluster/state` for node ids and the voting configuration
//! - `DELETE /_cluster/voting_config_exclusions` to clear exclusions
//! - `POST /_cluster/voting_config_exclusions` to exclude a voter
//!
//! Requests are plain single attempts. A failure is reported, never retried.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::config::NodeEndpoint;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{ClusterState, NodeInfoResponse};
use crate::utils::constants::{
    CLUSTER_STATE_PATH, NODE_INFO_PATH, USER_AGENT as USER_AGENT_CONST, VOTING_EXCLUSIONS_PATH,
};

/// HTTP client for the cluster REST API
#[derive(Clone)]
pub struct ElasticClient {
    client: reqwest::Client,
}

impl ElasticClient {
    /// Build a client; `timeout` of `None` leaves requests unbounded
    pub fn new(timeout: Option<Duration>) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            AppError::with_source(ErrorCode::ConfigHttpClient, "Failed to build HTTP client", e)
        })?;

        Ok(Self { client })
    }

    /// Ask a node for its name
    pub async fn node_info(&self, endpoint: &NodeEndpoint) -> AppResult<NodeInfoResponse> {
        let url = endpoint.url(NODE_INFO_PATH);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AppError::node_unreachable(&endpoint.slot, e)
                } else {
                    AppError::node_invalid_response(&endpoint.slot, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::node_invalid_response(
                &endpoint.slot,
                format!("HTTP {}", status),
            ));
        }

        response
            .json::<NodeInfoResponse>()
            .await
            .map_err(|e| AppError::node_invalid_response(&endpoint.slot, e))
    }

    /// Fetch the cluster state through a site's local master candidate
    pub async fn cluster_state(&self, endpoint: &NodeEndpoint) -> AppResult<ClusterState> {
        let site = endpoint.slot.site.as_str();
        let url = endpoint.url(CLUSTER_STATE_PATH);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::cluster_state_failed(site, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = pretty_body(response).await;
            return Err(AppError::cluster_state_failed(
                site,
                format!("HTTP {}\n{}", status, body),
            ));
        }

        response
            .json::<ClusterState>()
            .await
            .map_err(|e| AppError::cluster_state_failed(site, e))
    }

    /// Empty the site's voting configuration exclusions list
    pub async fn clear_voting_exclusions(&self, endpoint: &NodeEndpoint) -> AppResult<()> {
        let url = endpoint.url(VOTING_EXCLUSIONS_PATH);
        debug!("DELETE {}?wait_for_removal=false", url);

        let response = self
            .client
            .delete(&url)
            .query(&[("wait_for_removal", "false")])
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorCode::ExclusionsClearFailed,
                    "Failed to clear voting configuration exclusions list. Run again or try manually",
                    e,
                )
            })?;

        if response.status() != StatusCode::OK {
            let body = pretty_body(response).await;
            return Err(AppError::new(
                ErrorCode::ExclusionsClearFailed,
                format!(
                    "Failed to clear voting configuration exclusions list. Run again or try manually\n{}",
                    body
                ),
            ));
        }

        info!("🧹 Cleared voting exclusions on {}", endpoint.slot.site);
        Ok(())
    }

    /// Put `node_id` on the site's voting configuration exclusions list
    pub async fn add_voting_exclusion(&self, endpoint: &NodeEndpoint, node_id: &str) -> AppResult<()> {
        let url = endpoint.url(VOTING_EXCLUSIONS_PATH);
        debug!("POST {}?node_ids={}", url, node_id);

        let failure = || {
            format!(
                "Failed to add {} to the voting configuration exclusions list. Run again or try manually",
                node_id
            )
        };

        let response = self
            .client
            .post(&url)
            .query(&[("node_ids", node_id)])
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorCode::ExclusionsAddFailed, failure(), e))?;

        if response.status() != StatusCode::OK {
            let body = pretty_body(response).await;
            return Err(AppError::new(
                ErrorCode::ExclusionsAddFailed,
                format!("{}\n{}", failure(), body),
            ));
        }

        info!("🗳️ Excluded {} from voting on {}", node_id, endpoint.slot.site);
        Ok(())
    }
}

/// Response body, pretty-printed when it is JSON
async fn pretty_body(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(text),
        Err(_) => text,
    }
}
