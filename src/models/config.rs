//! Configuration module for make_leader
//!
//! Describes the two-site topology and resolves every node's address from
//! the environment. Uses constants from utils/constants.rs.

use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    build_node_url, COMPOSE_SERVICE_SUFFIX, DEFAULT_SITES, ENV_VAR_PRODUCT,
};

/// Which machine a node runs on, relative to the one running this tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Destination {
    Local,
    Remote,
}

impl Destination {
    pub const ALL: [Destination; 2] = [Destination::Local, Destination::Remote];

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Local => "local",
            Destination::Remote => "remote",
        }
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(self, Destination::Local)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a node in its site's cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRole {
    /// Master-eligible node holding data
    MasterCandidate,
    /// Voting-only node
    Voter,
}

impl NodeRole {
    pub const ALL: [NodeRole; 2] = [NodeRole::MasterCandidate, NodeRole::Voter];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::MasterCandidate => "master_candidate",
            NodeRole::Voter => "voter",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One expected node: a (site, destination, role) tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeSlot {
    pub site: String,
    pub destination: Destination,
    pub role: NodeRole,
}

impl NodeSlot {
    pub fn new(site: impl Into<String>, destination: Destination, role: NodeRole) -> Self {
        Self {
            site: site.into(),
            destination,
            role,
        }
    }

    /// Name of the environment variable holding this node's address,
    /// e.g. `REMOTE_PHY_ELASTICSEARCH_VOTER_IP`
    pub fn env_var(&self) -> String {
        let voter = match self.role {
            NodeRole::Voter => "VOTER_",
            NodeRole::MasterCandidate => "",
        };
        format!(
            "{}_{}_{}_{}IP",
            self.destination.as_str().to_uppercase(),
            self.site.to_uppercase(),
            ENV_VAR_PRODUCT,
            voter
        )
    }

    /// docker-compose service running this node, e.g. `cs-elasticsearch-voter-live`
    pub fn compose_service(&self) -> String {
        let voter = match self.role {
            NodeRole::Voter => "voter-",
            NodeRole::MasterCandidate => "",
        };
        format!(
            "{}-{}-{}{}",
            self.site.to_lowercase(),
            ENV_VAR_PRODUCT.to_lowercase(),
            voter,
            COMPOSE_SERVICE_SUFFIX
        )
    }

    /// Every slot of the topology, sites outermost, then destination, then role
    pub fn all(sites: &[String]) -> Vec<NodeSlot> {
        let mut slots = Vec::with_capacity(sites.len() * 4);
        for site in sites {
            for destination in Destination::ALL {
                for role in NodeRole::ALL {
                    slots.push(NodeSlot::new(site.clone(), destination, role));
                }
            }
        }
        slots
    }
}

impl fmt::Display for NodeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site, self.destination, self.role)
    }
}

/// A slot with its resolved base URL
#[derive(Debug, Clone)]
pub struct NodeEndpoint {
    pub slot: NodeSlot,
    pub base_url: String,
}

impl NodeEndpoint {
    /// Full URL for a REST path on this node
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Resolved configuration for one run
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Site names, in the order they are processed
    pub sites: Vec<String>,
    /// Port used for addresses without one
    pub port: u16,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    endpoints: Vec<NodeEndpoint>,
}

impl ClusterConfig {
    /// Resolve node addresses from the process environment
    pub fn from_env(sites: Vec<String>, port: u16) -> AppResult<Self> {
        Self::from_lookup(sites, port, |name| std::env::var(name).ok())
    }

    /// Resolve node addresses through `lookup` (environment variable name -> value)
    pub fn from_lookup<F>(sites: Vec<String>, port: u16, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sites: Vec<String> = sites
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if sites.is_empty() {
            return Err(AppError::invalid_config("At least one site is required"));
        }
        if let Some(dup) = sites.iter().enumerate().find_map(|(i, s)| sites[..i].contains(s).then_some(s)) {
            return Err(AppError::invalid_config(format!("Site {} listed twice", dup)));
        }
        if port == 0 {
            return Err(AppError::invalid_config("Port must be non-zero"));
        }

        let mut endpoints = Vec::with_capacity(sites.len() * 4);
        for slot in NodeSlot::all(&sites) {
            let var = slot.env_var();
            let address = lookup(&var)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::missing_env(&var))?;
            let base_url = build_node_url(&address, port).ok_or_else(|| {
                AppError::invalid_config(format!(
                    "{} = {} looks like a bare IPv6 address; write it as [{}]",
                    var,
                    address.trim(),
                    address.trim()
                ))
            })?;
            debug!("{} = {} -> {}", var, address, base_url);
            endpoints.push(NodeEndpoint { slot, base_url });
        }

        Ok(Self {
            sites,
            port,
            request_timeout: None,
            endpoints,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// All node endpoints, in slot order
    pub fn endpoints(&self) -> &[NodeEndpoint] {
        &self.endpoints
    }

    pub fn endpoint(&self, site: &str, destination: Destination, role: NodeRole) -> Option<&NodeEndpoint> {
        self.endpoints.iter().find(|e| {
            e.slot.site == site && e.slot.destination == destination && e.slot.role == role
        })
    }

    /// The local master candidate of a site; cluster-wide calls for the site go here
    pub fn site_endpoint(&self, site: &str) -> AppResult<&NodeEndpoint> {
        self.endpoint(site, Destination::Local, NodeRole::MasterCandidate)
            .ok_or_else(|| AppError::invalid_config(format!("Unknown site {}", site)))
    }
}

/// Default site list as owned strings
pub fn default_sites() -> Vec<String> {
    DEFAULT_SITES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<String, String> {
        NodeSlot::all(&default_sites())
            .into_iter()
            .enumerate()
            .map(|(i, slot)| (slot.env_var(), format!("10.0.0.{}", i + 1)))
            .collect()
    }

    #[test]
    fn test_env_var_names() {
        let name = |site: &str, d, r| NodeSlot::new(site, d, r).env_var();
        assert_eq!(name("cs", Destination::Local, NodeRole::MasterCandidate), "LOCAL_CS_ELASTICSEARCH_IP");
        assert_eq!(name("cs", Destination::Local, NodeRole::Voter), "LOCAL_CS_ELASTICSEARCH_VOTER_IP");
        assert_eq!(name("phy", Destination::Remote, NodeRole::MasterCandidate), "REMOTE_PHY_ELASTICSEARCH_IP");
        assert_eq!(name("phy", Destination::Remote, NodeRole::Voter), "REMOTE_PHY_ELASTICSEARCH_VOTER_IP");
    }

    #[test]
    fn test_compose_service_names() {
        assert_eq!(
            NodeSlot::new("cs", Destination::Local, NodeRole::MasterCandidate).compose_service(),
            "cs-elasticsearch-live"
        );
        assert_eq!(
            NodeSlot::new("PHY", Destination::Remote, NodeRole::Voter).compose_service(),
            "phy-elasticsearch-voter-live"
        );
    }

    #[test]
    fn test_slot_order() {
        let slots = NodeSlot::all(&default_sites());
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0], NodeSlot::new("cs", Destination::Local, NodeRole::MasterCandidate));
        assert_eq!(slots[1], NodeSlot::new("cs", Destination::Local, NodeRole::Voter));
        assert_eq!(slots[2], NodeSlot::new("cs", Destination::Remote, NodeRole::MasterCandidate));
        assert_eq!(slots[7], NodeSlot::new("phy", Destination::Remote, NodeRole::Voter));
    }

    #[test]
    fn test_from_lookup_resolves_all_nodes() {
        let env = full_env();
        let config = ClusterConfig::from_lookup(default_sites(), 9200, |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.endpoints().len(), 8);
        assert_eq!(config.site_endpoint("cs").unwrap().base_url, "http://10.0.0.1:9200");
        assert_eq!(config.site_endpoint("phy").unwrap().base_url, "http://10.0.0.5:9200");
        assert_eq!(
            config.site_endpoint("cs").unwrap().url("/_cluster/state"),
            "http://10.0.0.1:9200/_cluster/state"
        );
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_from_lookup_missing_variable() {
        let mut env = full_env();
        env.remove("REMOTE_CS_ELASTICSEARCH_VOTER_IP");
        let err = ClusterConfig::from_lookup(default_sites(), 9200, |k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err.code_str(), "CFG_MISSING_ENV");
        assert!(err.message.contains("REMOTE_CS_ELASTICSEARCH_VOTER_IP"));
    }

    #[test]
    fn test_from_lookup_empty_variable_is_missing() {
        let mut env = full_env();
        env.insert("LOCAL_PHY_ELASTICSEARCH_IP".to_string(), "  ".to_string());
        let err = ClusterConfig::from_lookup(default_sites(), 9200, |k| env.get(k).cloned()).unwrap_err();
        assert!(err.message.contains("LOCAL_PHY_ELASTICSEARCH_IP"));
    }

    #[test]
    fn test_from_lookup_rejects_bare_ipv6() {
        let mut env = full_env();
        env.insert("LOCAL_CS_ELASTICSEARCH_VOTER_IP".to_string(), "fe80::1".to_string());
        let err = ClusterConfig::from_lookup(default_sites(), 9200, |k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err.code_str(), "CFG_INVALID_VALUE");
        assert!(err.message.contains("LOCAL_CS_ELASTICSEARCH_VOTER_IP = fe80::1"));
        assert!(err.message.contains("[fe80::1]"));

        env.insert("LOCAL_CS_ELASTICSEARCH_VOTER_IP".to_string(), "[fe80::1]".to_string());
        let config = ClusterConfig::from_lookup(default_sites(), 9200, |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.endpoints()[1].base_url, "http://[fe80::1]:9200");
    }

    #[test]
    fn test_from_lookup_rejects_bad_sites() {
        let env = full_env();
        let lookup = |k: &str| env.get(k).cloned();
        assert!(ClusterConfig::from_lookup(vec![], 9200, lookup).is_err());
        assert!(ClusterConfig::from_lookup(vec!["cs".into(), "CS".into()], 9200, lookup).is_err());
        assert!(ClusterConfig::from_lookup(default_sites(), 0, lookup).is_err());
    }

    #[test]
    fn test_unknown_site_endpoint() {
        let env = full_env();
        let config = ClusterConfig::from_lookup(default_sites(), 9200, |k| env.get(k).cloned()).unwrap();
        assert!(config.site_endpoint("dr").is_err());
    }
}
