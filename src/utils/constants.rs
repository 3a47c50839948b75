//! Constants Module - Single Source of Truth
//!
//! Topology names, REST paths and exit codes used across the crate.
//! No hardcoded values in other modules!

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "make_leader";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("make_leader/", env!("CARGO_PKG_VERSION"));

/// Process exit code on success
pub const SUCCESS_EXIT_CODE: i32 = 0;

/// Process exit code on any failure
pub const ERROR_EXIT_CODE: i32 = 1;

// ============================================
// TOPOLOGY
// ============================================

/// Sites making up the deployment, one Elasticsearch cluster each
pub const DEFAULT_SITES: [&str; 2] = ["cs", "phy"];

/// Port appended to node addresses that don't carry one
pub const DEFAULT_ELASTICSEARCH_PORT: u16 = 9200;

/// Product segment of the address environment variables
/// (`LOCAL_CS_ELASTICSEARCH_IP`, ...)
pub const ENV_VAR_PRODUCT: &str = "ELASTICSEARCH";

/// Trailing segment of the docker-compose service names
/// (`cs-elasticsearch-live`, ...)
pub const COMPOSE_SERVICE_SUFFIX: &str = "live";

// ============================================
// CLUSTER REST API
// ============================================

/// Node root endpoint, reports the node name
pub const NODE_INFO_PATH: &str = "/";

/// Full cluster state, including the coordination metadata
pub const CLUSTER_STATE_PATH: &str = "/_cluster/state";

/// Voting configuration exclusions list
pub const VOTING_EXCLUSIONS_PATH: &str = "/_cluster/voting_config_exclusions";

/// Build the base URL of a node from a raw address.
///
/// `10.0.0.5` becomes `http://10.0.0.5:9200`, `10.0.0.5:9201` keeps its port
/// and an address that already has a scheme is used as-is. IPv6 literals must
/// be bracketed (`[fe80::1]`); a bare one yields `None`.
pub fn build_node_url(address: &str, default_port: u16) -> Option<String> {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        Some(address.to_string())
    } else if address.starts_with('[') {
        if address.ends_with(']') {
            Some(format!("http://{}:{}", address, default_port))
        } else {
            Some(format!("http://{}", address))
        }
    } else if address.matches(':').count() > 1 {
        None
    } else if address.contains(':') {
        Some(format!("http://{}", address))
    } else {
        Some(format!("http://{}:{}", address, default_port))
    }
}
