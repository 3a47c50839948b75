//! Node discovery and id matching
//!
//! Learns each expected node's name, fetches every site's cluster state and
//! joins the two on node name to get cluster ids.

use tracing::{debug, info};

use crate::models::config::ClusterConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{ClusterSnapshot, NodeDescriptor, NodesById, NodesByName};
use crate::providers::elasticsearch::ElasticClient;

/// Ask every expected node for its name, in slot order.
/// Fails on the first node that is down.
pub async fn discover_nodes(client: &ElasticClient, config: &ClusterConfig) -> AppResult<NodesByName> {
    let mut nodes = NodesByName::new();

    for endpoint in config.endpoints() {
        let info = client.node_info(endpoint).await?;
        debug!("{} is {} ({})", endpoint.slot, info.name, endpoint.base_url);

        let descriptor = NodeDescriptor::from_slot(&endpoint.slot, info.name.clone());
        if let Some(previous) = nodes.insert(info.name.clone(), descriptor) {
            return Err(AppError::new(
                ErrorCode::NodeDuplicateName,
                format!(
                    "Nodes at {} and {} both report the name {}",
                    previous.env_var,
                    endpoint.slot.env_var(),
                    info.name
                ),
            ));
        }
    }

    info!("🔍 Discovered {} nodes", nodes.len());
    Ok(nodes)
}

/// Fetch each site's cluster state from its local master candidate
pub async fn fetch_cluster_state(client: &ElasticClient, config: &ClusterConfig) -> AppResult<ClusterSnapshot> {
    let mut snapshot = ClusterSnapshot::new();

    for site in &config.sites {
        let endpoint = config.site_endpoint(site)?;
        let state = client.cluster_state(endpoint).await?;
        debug!(
            "{} cluster: {} nodes, voting config {:?}",
            site,
            state.nodes.len(),
            state.voting_config()
        );
        snapshot.insert(site.clone(), state);
    }

    Ok(snapshot)
}

/// Index the discovered nodes by cluster id.
///
/// Every node listed in any site's cluster state must be one we discovered.
pub fn index_nodes_by_id(nodes: &NodesByName, snapshot: &ClusterSnapshot) -> AppResult<NodesById> {
    let mut by_id = NodesById::new();

    for state in snapshot.values() {
        for (node_id, node) in &state.nodes {
            let descriptor = nodes
                .get(&node.name)
                .ok_or_else(|| AppError::unexpected_node(&node.name))?;
            by_id.insert(node_id.clone(), descriptor.with_id(node_id.clone()));
        }
    }

    Ok(by_id)
}

/// The site's remote voter, as matched in the cluster state
pub fn remote_voter<'a>(nodes_by_id: &'a NodesById, site: &str) -> AppResult<&'a NodeDescriptor> {
    nodes_by_id
        .values()
        .find(|n| n.is_remote_voter_of(site))
        .ok_or_else(|| AppError::remote_voter_not_found(site))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{default_sites, Destination, NodeRole, NodeSlot};
    use crate::models::types::ClusterState;
    use serde_json::json;

    fn nodes() -> NodesByName {
        NodeSlot::all(&default_sites())
            .iter()
            .map(|slot| {
                let name = format!("{}-{}-{}", slot.site, slot.destination, slot.role);
                (name.clone(), NodeDescriptor::from_slot(slot, name))
            })
            .collect()
    }

    fn state(nodes: serde_json::Value) -> ClusterState {
        serde_json::from_value(json!({
            "nodes": nodes,
            "metadata": { "cluster_coordination": { "last_accepted_config": [] } }
        }))
        .unwrap()
    }

    #[test]
    fn test_index_nodes_by_id() {
        let mut snapshot = ClusterSnapshot::new();
        snapshot.insert(
            "cs",
            state(json!({
                "id-1": { "name": "cs-local-master_candidate" },
                "id-2": { "name": "cs-remote-voter" }
            })),
        );
        snapshot.insert("phy", state(json!({ "id-3": { "name": "phy-local-voter" } })));

        let by_id = index_nodes_by_id(&nodes(), &snapshot).unwrap();
        assert_eq!(by_id.len(), 3);
        assert_eq!(by_id["id-1"].destination, Destination::Local);
        assert_eq!(by_id["id-2"].role, NodeRole::Voter);
        assert_eq!(by_id["id-2"].id.as_deref(), Some("id-2"));
        assert_eq!(by_id["id-3"].site, "phy");
    }

    #[test]
    fn test_unexpected_node_is_rejected() {
        let mut snapshot = ClusterSnapshot::new();
        snapshot.insert("cs", state(json!({ "id-9": { "name": "intruder" } })));

        let err = index_nodes_by_id(&nodes(), &snapshot).unwrap_err();
        assert_eq!(err.code, ErrorCode::NodeUnexpected);
        assert!(err.message.contains("with name intruder"));
    }

    #[test]
    fn test_remote_voter_lookup() {
        let mut snapshot = ClusterSnapshot::new();
        snapshot.insert(
            "cs",
            state(json!({
                "id-1": { "name": "cs-local-voter" },
                "id-2": { "name": "cs-remote-voter" }
            })),
        );
        let by_id = index_nodes_by_id(&nodes(), &snapshot).unwrap();

        assert_eq!(remote_voter(&by_id, "cs").unwrap().id.as_deref(), Some("id-2"));
        let err = remote_voter(&by_id, "phy").unwrap_err();
        assert_eq!(err.code, ErrorCode::ExclusionsVoterNotFound);
    }
}
