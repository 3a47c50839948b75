//! Providers Module - External Services
//!
//! The Elasticsearch cluster REST API.

pub mod elasticsearch;

pub use elasticsearch::*;
