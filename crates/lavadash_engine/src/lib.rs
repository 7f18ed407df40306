//! # lavadash engine
//!
//! Client engine for the LAVA dashboard XML-RPC API.
//!
//! This crate provides:
//! - Endpoint resolution (scheme defaulting, `/RPC2/` and `/xml-rpc/` mounts)
//! - Token stores (in-memory and OS keyring)
//! - An authenticating XML-RPC proxy with `dashboard.` namespace probing
//! - Server version gating for newer API methods
//! - Replication: `pull` between dashboards, `backup` to disk, `restore` from disk
//! - Single-bundle commands and the `auth-add` flow
//!
//! Every remote interaction goes through the [`Dashboard`] trait, which
//! [`ServerProxy`] implements over HTTP and [`MemoryDashboard`] in memory.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod auth_add;
mod bundle_ops;
mod config;
mod dashboard;
mod endpoint;
mod error;
mod gate;
mod http;
mod memory;
mod proxy;
pub mod replication;

pub use auth::{Credential, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use auth_add::{auth_add, AuthAddOptions};
pub use bundle_ops::{deserialize_bundle, get_bundle, put_bundle, GetOutcome};
pub use config::{ClientConfig, EndpointStyle};
pub use dashboard::{ApiNamespace, Dashboard};
pub use endpoint::Endpoint;
pub use error::{
    EngineError, EngineResult, NetworkFailure, FAULT_DUPLICATE, FAULT_INTERNAL, FAULT_NOT_FOUND,
};
pub use gate::{check_server_version, require, Capability};
pub use http::{HttpClient, LoopbackClient, LoopbackServer, TransportError, UreqClient};
pub use memory::{content_sha1, DashboardCall, MemoryDashboard};
pub use proxy::ServerProxy;
pub use replication::{
    backup, pull, restore, BackupReport, PullReport, Quiet, ReplicationEvent, ReplicationObserver,
    RestoreReport, StreamPullReport,
};
