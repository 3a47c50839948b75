//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so an operator can tell at a
//! glance which step of the leadership change broke.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - CFG_xxx: Configuration errors
//! - NODE_xxx: Node discovery errors
//! - CLUSTER_xxx: Cluster state errors
//! - EXCLUSIONS_xxx: Voting configuration exclusion errors
//! - LEADER_xxx: Leadership post-condition errors

use std::fmt;

use crate::models::config::NodeSlot;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging
    pub code: ErrorCode,
    /// Human-readable message, printed to the operator
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Configuration Errors
    // ============================================
    /// Node address environment variable not set
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// HTTP client could not be built
    ConfigHttpClient,

    // ============================================
    // Node Errors
    // ============================================
    /// Node did not accept a connection
    NodeUnreachable,
    /// Node answered with an error status or unreadable body
    NodeInvalidResponse,
    /// Two nodes reported the same name
    NodeDuplicateName,
    /// Cluster contains a node we don't know about
    NodeUnexpected,

    // ============================================
    // Cluster State Errors
    // ============================================
    /// Cluster state could not be fetched or parsed
    ClusterStateFailed,
    /// Voting configuration references an unknown node id
    ClusterUnknownVoter,

    // ============================================
    // Voting Exclusion Errors
    // ============================================
    /// Clearing the exclusions list failed
    ExclusionsClearFailed,
    /// Adding a node to the exclusions list failed
    ExclusionsAddFailed,
    /// No remote voter to exclude
    ExclusionsVoterNotFound,

    // ============================================
    // Leadership Errors
    // ============================================
    /// Local machine still lacks the voting majority after the update
    LeaderNotAcquired,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigHttpClient => "CFG_HTTP_CLIENT",

            Self::NodeUnreachable => "NODE_UNREACHABLE",
            Self::NodeInvalidResponse => "NODE_INVALID_RESPONSE",
            Self::NodeDuplicateName => "NODE_DUPLICATE_NAME",
            Self::NodeUnexpected => "NODE_UNEXPECTED",

            Self::ClusterStateFailed => "CLUSTER_STATE_FAILED",
            Self::ClusterUnknownVoter => "CLUSTER_UNKNOWN_VOTER",

            Self::ExclusionsClearFailed => "EXCLUSIONS_CLEAR_FAILED",
            Self::ExclusionsAddFailed => "EXCLUSIONS_ADD_FAILED",
            Self::ExclusionsVoterNotFound => "EXCLUSIONS_VOTER_NOT_FOUND",

            Self::LeaderNotAcquired => "LEADER_NOT_ACQUIRED",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Address variable missing from the environment
    pub fn missing_env(var: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Environment variable {} is not set", var),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }

    /// Node refused the connection; the message tells the operator how to start it
    pub fn node_unreachable(
        slot: &NodeSlot,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let where_ = if slot.destination.is_local() {
            ""
        } else {
            " on the REMOTE MACHINE"
        };
        Self::with_source(
            ErrorCode::NodeUnreachable,
            format!(
                "ElasticSearch node at {} is not up. \
                 Bring it up by typing the following command{}:\n\
                 export HOSTNAME && docker-compose up -d {}",
                slot.env_var(),
                where_,
                slot.compose_service()
            ),
            source,
        )
    }

    /// Node answered but not with what we expected
    pub fn node_invalid_response(slot: &NodeSlot, detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::NodeInvalidResponse,
            format!("ElasticSearch node at {} gave an invalid response: {}", slot.env_var(), detail),
        )
    }

    /// Cluster contains a node that isn't one of ours
    pub fn unexpected_node(name: &str) -> Self {
        Self::new(
            ErrorCode::NodeUnexpected,
            format!(
                "Found an unexpected node in cluster with name {}. \
                 Probably worth stopping and investigating further",
                name
            ),
        )
    }

    /// Cluster state request failed
    pub fn cluster_state_failed(site: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ClusterStateFailed,
            format!("Failed to fetch the {} cluster state: {}", site, detail),
        )
    }

    /// Voting configuration holds an id that matches no known node
    pub fn unknown_voter(site: &str, node_id: &str) -> Self {
        Self::new(
            ErrorCode::ClusterUnknownVoter,
            format!(
                "The {} voting configuration contains node id {} which matches no known node",
                site, node_id
            ),
        )
    }

    /// Remote voter of a site has no id
    pub fn remote_voter_not_found(site: &str) -> Self {
        Self::new(
            ErrorCode::ExclusionsVoterNotFound,
            format!(
                "could not find the id of the {} remote voter to be added to the voting exclusions list",
                site
            ),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::with_source(ErrorCode::NodeUnreachable, "Request timeout", err)
        } else if err.is_connect() {
            Self::with_source(ErrorCode::NodeUnreachable, "Connection failed", err)
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ClusterStateFailed, "JSON parse error", err)
    }
}
