//! Voting majority
//!
//! The local machine leads a site when its nodes hold strictly more than half
//! of that site's voting configuration, and leads overall when it does so in
//! every site.

use tracing::debug;

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{ClusterSnapshot, LeadershipReport, NodesById, VoteTally};

/// Count local and remote votes in one site's voting configuration
pub fn tally_votes(site: &str, voting_config: &[String], nodes_by_id: &NodesById) -> AppResult<VoteTally> {
    let mut tally = VoteTally::default();
    for node_id in voting_config {
        let node = nodes_by_id
            .get(node_id)
            .ok_or_else(|| AppError::unknown_voter(site, node_id))?;
        tally.add(node.destination);
    }
    Ok(tally)
}

/// Tally every site in the snapshot
pub fn assess_leadership(snapshot: &ClusterSnapshot, nodes_by_id: &NodesById) -> AppResult<LeadershipReport> {
    let mut report = LeadershipReport::default();
    for (site, state) in snapshot.iter() {
        let tally = tally_votes(site, state.voting_config(), nodes_by_id)?;
        debug!("{}: local {} / remote {}", site, tally.local, tally.remote);
        report.push(site, tally);
    }
    Ok(report)
}

/// Whether the local machine holds the voting majority in every site
pub fn local_is_leader(snapshot: &ClusterSnapshot, nodes_by_id: &NodesById) -> AppResult<bool> {
    Ok(assess_leadership(snapshot, nodes_by_id)?.local_is_leader())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{Destination, NodeRole, NodeSlot};
    use crate::models::types::{ClusterState, NodeDescriptor};
    use serde_json::json;

    fn by_id(entries: &[(&str, &str, Destination)]) -> NodesById {
        entries
            .iter()
            .map(|(id, site, dest)| {
                let slot = NodeSlot::new(*site, *dest, NodeRole::Voter);
                (id.to_string(), NodeDescriptor::from_slot(&slot, *id).with_id(*id))
            })
            .collect()
    }

    fn config(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tally_votes() {
        let nodes = by_id(&[
            ("l1", "cs", Destination::Local),
            ("l2", "cs", Destination::Local),
            ("r1", "cs", Destination::Remote),
            ("r2", "cs", Destination::Remote),
        ]);

        let tally = tally_votes("cs", &config(&["l1", "l2", "r1"]), &nodes).unwrap();
        assert_eq!(tally, VoteTally { local: 2, remote: 1 });
        assert!(tally.local_has_majority());

        let tally = tally_votes("cs", &config(&["l1", "r1", "r2"]), &nodes).unwrap();
        assert!(!tally.local_has_majority());
    }

    #[test]
    fn test_even_split_is_not_leader() {
        let nodes = by_id(&[
            ("l1", "cs", Destination::Local),
            ("l2", "cs", Destination::Local),
            ("r1", "cs", Destination::Remote),
            ("r2", "cs", Destination::Remote),
        ]);
        let tally = tally_votes("cs", &config(&["l1", "l2", "r1", "r2"]), &nodes).unwrap();
        assert_eq!(tally, VoteTally { local: 2, remote: 2 });
        assert!(!tally.local_has_majority());
    }

    #[test]
    fn test_empty_voting_config_is_not_leader() {
        let tally = tally_votes("cs", &[], &NodesById::new()).unwrap();
        assert!(!tally.local_has_majority());
    }

    #[test]
    fn test_unknown_voter() {
        let nodes = by_id(&[("l1", "cs", Destination::Local)]);
        let err = tally_votes("cs", &config(&["l1", "ghost"]), &nodes).unwrap_err();
        assert_eq!(err.code_str(), "CLUSTER_UNKNOWN_VOTER");
        assert!(err.message.contains("ghost"));
    }

    #[test]
    fn test_report_follows_snapshot_site_order() {
        let nodes = by_id(&[("pl1", "phy", Destination::Local), ("cl1", "cs", Destination::Local)]);
        let site = |ids: &[&str]| -> ClusterState {
            serde_json::from_value(json!({
                "metadata": { "cluster_coordination": { "last_accepted_config": ids } }
            }))
            .unwrap()
        };

        let mut snapshot = ClusterSnapshot::new();
        snapshot.insert("phy", site(&["pl1"]));
        snapshot.insert("cs", site(&["cl1", "ghost"]));

        let err = assess_leadership(&snapshot, &nodes).unwrap_err();
        assert!(err.message.contains("The cs voting configuration"));

        snapshot.insert("cs", site(&["cl1"]));
        let report = assess_leadership(&snapshot, &nodes).unwrap();
        let sites: Vec<&str> = report.tallies.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(sites, vec!["phy", "cs"]);
        assert_eq!(report.summary(), "phy: local 1 / remote 0, cs: local 1 / remote 0");
    }

    #[test]
    fn test_local_is_leader_needs_every_site() {
        let nodes = by_id(&[
            ("cl1", "cs", Destination::Local),
            ("cl2", "cs", Destination::Local),
            ("cr1", "cs", Destination::Remote),
            ("pl1", "phy", Destination::Local),
            ("pr1", "phy", Destination::Remote),
            ("pr2", "phy", Destination::Remote),
        ]);
        let site = |ids: &[&str]| -> ClusterState {
            serde_json::from_value(json!({
                "metadata": { "cluster_coordination": { "last_accepted_config": ids } }
            }))
            .unwrap()
        };

        let mut snapshot = ClusterSnapshot::new();
        snapshot.insert("cs", site(&["cl1", "cl2", "cr1"]));
        snapshot.insert("phy", site(&["pl1", "pr1", "pr2"]));
        assert!(!local_is_leader(&snapshot, &nodes).unwrap());

        let report = assess_leadership(&snapshot, &nodes).unwrap();
        assert_eq!(report.lagging_sites(), vec!["phy"]);

        snapshot.insert("phy", site(&["pl1", "pr1"]));
        assert!(!local_is_leader(&snapshot, &nodes).unwrap());

        snapshot.insert("phy", site(&["pl1"]));
        assert!(local_is_leader(&snapshot, &nodes).unwrap());
    }
}
