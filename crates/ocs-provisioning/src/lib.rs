//! # ocs-provisioning
//!
//! User and group administration over the OCS provisioning API.
//!
//! Calls are small request/response exchanges, so they run on the caller's
//! thread through the same transport as the streaming bridge. Failure
//! envelopes come back as the typed errors of `ocs-status`.
//!
//! ## Example
//!
//! ```ignore
//! use ocs_provisioning::ProvisioningClient;
//! use ocs_stream::ClientConfig;
//!
//! let client = ProvisioningClient::from_config(ClientConfig::load("admin.toml")?)?;
//! client.create_group("staff")?;
//! client.add_user_to_group("alice", "staff")?;
//! assert!(client.user_groups("alice")?.contains(&"staff".to_string()));
//! ```

mod client;
mod error;

pub use client::{ProvisioningClient, OCS_API_HEADER};
pub use error::{Error, Result};
