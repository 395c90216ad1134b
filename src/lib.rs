//! retake: provisioning and querying of neural (vector) search on top of an
//! OpenSearch-compatible backend's ML plugin.
//!
//! The core lives in [`search`]: embedding model lifecycle orchestration,
//! ingest pipeline wiring, settings/mapping mutation around close/open
//! windows, and query DSL rewriting that injects the deployed model into
//! `neural` clauses. The [`api`] module serves it over HTTP behind bearer
//! auth; [`sync`] hosts the replication sidecar.

pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod sync;
pub mod transport;

pub use error::{Error, Result};
