//! Type definitions for make_leader
//! Node descriptors, cluster-state payloads and leadership tallies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::config::{Destination, NodeRole, NodeSlot};

/// An expected node, as discovered by name and later matched to its cluster id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub site: String,
    pub destination: Destination,
    pub role: NodeRole,
    /// Node name as reported by the node itself
    pub name: String,
    /// Environment variable the node's address came from
    pub env_var: String,
    /// Cluster-assigned node id, known after matching against cluster state
    pub id: Option<String>,
}

impl NodeDescriptor {
    pub fn from_slot(slot: &NodeSlot, name: impl Into<String>) -> Self {
        Self {
            site: slot.site.clone(),
            destination: slot.destination,
            role: slot.role,
            name: name.into(),
            env_var: slot.env_var(),
            id: None,
        }
    }

    /// Copy of this descriptor carrying the cluster id
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self.clone()
        }
    }

    pub fn is_remote_voter_of(&self, site: &str) -> bool {
        self.site == site && self.destination == Destination::Remote && self.role == NodeRole::Voter
    }
}

/// Node name -> descriptor
pub type NodesByName = BTreeMap<String, NodeDescriptor>;

/// Cluster node id -> descriptor (with `id` set)
pub type NodesById = BTreeMap<String, NodeDescriptor>;

/// Cluster state of every site, fetched from each site's local master
/// candidate. Iterates in the order sites were inserted.
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    sites: Vec<(String, ClusterState)>,
}

impl ClusterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a site's state; a site already present is replaced in place
    pub fn insert(&mut self, site: impl Into<String>, state: ClusterState) {
        let site = site.into();
        match self.sites.iter_mut().find(|(s, _)| *s == site) {
            Some(entry) => entry.1 = state,
            None => self.sites.push((site, state)),
        }
    }

    pub fn get(&self, site: &str) -> Option<&ClusterState> {
        self.sites.iter().find(|(s, _)| s == site).map(|(_, state)| state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClusterState)> {
        self.sites.iter().map(|(site, state)| (site.as_str(), state))
    }

    pub fn values(&self) -> impl Iterator<Item = &ClusterState> {
        self.sites.iter().map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

// ============================================
// Cluster REST payloads
// ============================================

/// `GET /` response
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfoResponse {
    pub name: String,
}

/// `GET /_cluster/state` response, reduced to the parts we read
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterState {
    /// Node id -> node
    #[serde(default)]
    pub nodes: BTreeMap<String, ClusterNode>,
    pub metadata: ClusterMetadata,
}

impl ClusterState {
    /// Ids currently holding a vote
    pub fn voting_config(&self) -> &[String] {
        &self.metadata.cluster_coordination.last_accepted_config
    }

    pub fn coordination(&self) -> &ClusterCoordination {
        &self.metadata.cluster_coordination
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterNode {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterMetadata {
    pub cluster_coordination: ClusterCoordination,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterCoordination {
    #[serde(default)]
    pub term: u64,
    #[serde(default)]
    pub last_committed_config: Vec<String>,
    #[serde(default)]
    pub last_accepted_config: Vec<String>,
    #[serde(default)]
    pub voting_config_exclusions: Vec<VotingConfigExclusion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingConfigExclusion {
    pub node_id: String,
    pub node_name: String,
}

// ============================================
// Leadership
// ============================================

/// Votes held by each machine in one site's voting configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteTally {
    pub local: usize,
    pub remote: usize,
}

impl VoteTally {
    pub fn add(&mut self, destination: Destination) {
        match destination {
            Destination::Local => self.local += 1,
            Destination::Remote => self.remote += 1,
        }
    }

    /// Strict majority; a tie does not count
    #[inline]
    pub fn local_has_majority(&self) -> bool {
        self.local > self.remote
    }
}

/// Per-site tallies for the whole deployment, in site order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadershipReport {
    pub tallies: Vec<(String, VoteTally)>,
}

impl LeadershipReport {
    pub fn push(&mut self, site: impl Into<String>, tally: VoteTally) {
        self.tallies.push((site.into(), tally));
    }

    pub fn tally(&self, site: &str) -> Option<VoteTally> {
        self.tallies.iter().find(|(s, _)| s == site).map(|(_, t)| *t)
    }

    /// The local machine leads only if it holds the majority in every site
    pub fn local_is_leader(&self) -> bool {
        self.tallies.iter().all(|(_, t)| t.local_has_majority())
    }

    /// Sites where the remote machine holds at least half the votes
    pub fn lagging_sites(&self) -> Vec<&str> {
        self.tallies
            .iter()
            .filter(|(_, t)| !t.local_has_majority())
            .map(|(site, _)| site.as_str())
            .collect()
    }

    pub fn summary(&self) -> String {
        self.tallies
            .iter()
            .map(|(site, t)| format!("{}: local {} / remote {}", site, t.local, t.remote))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A voter that is (or would be) put on a site's exclusions list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedExclusion {
    pub site: String,
    pub node_id: String,
    pub node_name: String,
}

impl fmt::Display for PlannedExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: exclude {} ({})", self.site, self.node_name, self.node_id)
    }
}
