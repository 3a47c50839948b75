//! make_leader Library
//!
//! Moves leadership of a two-site Elasticsearch deployment to the local
//! machine by managing each site's voting configuration exclusions:
//! - discover the expected nodes and match them to cluster node ids
//! - check whether the local machine holds the voting majority in every site
//! - if not, exclude each site's remote voter and verify the result

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{assess_leadership, local_is_leader, tally_votes, LeaderElector, Outcome};
pub use models::{
    AppError, AppResult, ClusterConfig, ClusterSnapshot, ClusterState, Destination, ErrorCode, LeadershipReport,
    NodeDescriptor, NodeRole, NodeSlot, NodesById, PlannedExclusion, VoteTally,
};
pub use providers::ElasticClient;
