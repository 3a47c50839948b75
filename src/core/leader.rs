//! Leadership change
//!
//! discover -> fetch state -> match ids -> check majority -> (clear and
//! repopulate exclusions -> re-check). Every request is awaited before the
//! next one is issued.

use tracing::{info, warn};

use crate::core::discovery::{discover_nodes, fetch_cluster_state, index_nodes_by_id, remote_voter};
use crate::core::majority::assess_leadership;
use crate::models::config::ClusterConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{ClusterSnapshot, LeadershipReport, NodesById, PlannedExclusion};
use crate::providers::elasticsearch::ElasticClient;

/// How a run ended, when it didn't fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The local machine already held the majority; nothing was changed
    AlreadyLeader(LeadershipReport),
    /// Exclusions were updated and the local machine now holds the majority
    BecameLeader {
        report: LeadershipReport,
        excluded: Vec<PlannedExclusion>,
    },
    /// Dry run: the exclusions that would have been made
    WouldExclude {
        report: LeadershipReport,
        planned: Vec<PlannedExclusion>,
    },
}

impl Outcome {
    pub fn message(&self) -> &'static str {
        match self {
            Outcome::AlreadyLeader(_) => "This machine is already the ElasticSearch cluster leader",
            Outcome::BecameLeader { .. } => "This machine is the ElasticSearch cluster leader",
            Outcome::WouldExclude { .. } => {
                "Dry run: this machine is NOT the ElasticSearch cluster leader, no changes made"
            }
        }
    }
}

/// Drives one leadership change against the deployment
pub struct LeaderElector {
    config: ClusterConfig,
    client: ElasticClient,
}

impl LeaderElector {
    pub fn new(config: ClusterConfig) -> AppResult<Self> {
        let client = ElasticClient::new(config.request_timeout)?;
        Ok(Self { config, client })
    }

    /// Make the local machine the leader, or with `dry_run` only report what
    /// would be done
    pub async fn run(&self, dry_run: bool) -> AppResult<Outcome> {
        let nodes = discover_nodes(&self.client, &self.config).await?;
        let snapshot = fetch_cluster_state(&self.client, &self.config).await?;
        let nodes_by_id = index_nodes_by_id(&nodes, &snapshot)?;

        let report = assess_leadership(&snapshot, &nodes_by_id)?;
        info!("📊 Voting majority: {}", report.summary());
        if report.local_is_leader() {
            return Ok(Outcome::AlreadyLeader(report));
        }

        if dry_run {
            let planned = self.plan_exclusions(&nodes_by_id)?;
            return Ok(Outcome::WouldExclude { report, planned });
        }

        warn!("👑 Remote machine holds the majority in {:?}, moving it", report.lagging_sites());
        let excluded = self.update_voting_configuration(&nodes_by_id).await?;

        let updated = fetch_cluster_state(&self.client, &self.config).await?;
        let report = assess_leadership(&updated, &nodes_by_id)?;
        info!("📊 Voting majority after update: {}", report.summary());
        if report.local_is_leader() {
            Ok(Outcome::BecameLeader { report, excluded })
        } else {
            Err(still_not_leader(&updated))
        }
    }

    /// The remote voter to exclude in each site
    pub fn plan_exclusions(&self, nodes_by_id: &NodesById) -> AppResult<Vec<PlannedExclusion>> {
        self.config
            .sites
            .iter()
            .map(|site| planned_exclusion(nodes_by_id, site))
            .collect()
    }

    /// For each site: clear the exclusions list, then exclude the remote voter
    pub async fn update_voting_configuration(&self, nodes_by_id: &NodesById) -> AppResult<Vec<PlannedExclusion>> {
        let mut excluded = Vec::with_capacity(self.config.sites.len());

        for site in &self.config.sites {
            let endpoint = self.config.site_endpoint(site)?;
            self.client.clear_voting_exclusions(endpoint).await?;

            let exclusion = planned_exclusion(nodes_by_id, site)?;
            self.client.add_voting_exclusion(endpoint, &exclusion.node_id).await?;
            excluded.push(exclusion);
        }

        Ok(excluded)
    }
}

fn planned_exclusion(nodes_by_id: &NodesById, site: &str) -> AppResult<PlannedExclusion> {
    let voter = remote_voter(nodes_by_id, site)?;
    let node_id = voter
        .id
        .clone()
        .ok_or_else(|| AppError::remote_voter_not_found(site))?;
    Ok(PlannedExclusion {
        site: site.to_string(),
        node_id,
        node_name: voter.name.clone(),
    })
}

/// Post-condition failure, carrying each site's coordination metadata
fn still_not_leader(snapshot: &ClusterSnapshot) -> AppError {
    let mut message = String::from("The local machine is still NOT the leader, for some reason");
    for (site, state) in snapshot.iter() {
        let coordination = serde_json::to_string_pretty(state.coordination())
            .unwrap_or_else(|e| format!("<unprintable: {}>", e));
        message.push_str(&format!("\n{}: {}", site, coordination));
    }
    AppError::new(ErrorCode::LeaderNotAcquired, message)
}
