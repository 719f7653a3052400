//! # ocs-status
//!
//! Status handling for ownCloud-style OCS endpoints.
//!
//! This crate provides:
//! - The error taxonomy shared by the streaming bridge and the provisioning client
//! - JSON OCS document and status envelope parsing
//! - Translation of OCS status codes and HTTP failures into typed errors
//!
//! ## Example
//!
//! ```ignore
//! use ocs_status::{translate, Operation, StatusEnvelope, TranslationContext};
//!
//! let envelope = StatusEnvelope::from_json(body)?;
//! let ctx = TranslationContext::new("admin", "alice").with_entity("staff");
//! translate(&envelope, Operation::AddToGroup, &ctx)?;
//! ```

mod envelope;
mod error;
mod translate;

pub use envelope::{parse_document, OcsBody, OcsDocument, StatusEnvelope};
pub use error::{EntityKind, Error, Result, TransportError};
pub use translate::{
    translate, translate_http_status, translate_transport, Operation, TranslationContext,
    HTTP_INSUFFICIENT_STORAGE, HTTP_NOT_FOUND, STATUS_NOT_FOUND, STATUS_UNAUTHORISED,
};
