use std::fmt;
use std::io;
use thiserror::Error;

use crate::Operation;

/// Kind of entity a backend error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A user account.
    User,
    /// A group.
    Group,
    /// A file or folder addressed by locator.
    Resource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => f.write_str("user"),
            EntityKind::Group => f.write_str("group"),
            EntityKind::Resource => f.write_str("resource"),
        }
    }
}

/// Failures of the HTTP exchange itself, before any envelope is involved.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error while moving body bytes.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The HTTP client failed to build, connect or send.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The transfer worker went away without reporting an outcome.
    #[error("transfer worker error: {0}")]
    Worker(String),
}

/// Errors surfaced to callers of the remote service.
#[derive(Debug, Error)]
pub enum Error {
    /// The acting user lacks permission on the resource.
    #[error("user '{user}' is not allowed to access '{resource}'")]
    Forbidden {
        /// Acting user.
        user: String,
        /// Target resource.
        resource: String,
    },

    /// A user, group or resource does not exist.
    #[error("{kind} '{name}' not found: {message}")]
    NotFound {
        /// What was looked up.
        kind: EntityKind,
        /// Name of the missing entity.
        name: String,
        /// Backend message.
        message: String,
    },

    /// The entity to create already exists.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// What was created.
        kind: EntityKind,
        /// Name of the existing entity.
        name: String,
    },

    /// The backend rejected the request arguments.
    #[error("invalid argument for '{name}': {message}")]
    InvalidArgument {
        /// Offending entity name.
        name: String,
        /// Backend message.
        message: String,
    },

    /// The backend accepted the request but could not carry it out.
    #[error("{operation} failed for '{name}': {message}")]
    OperationFailed {
        /// Operation that failed.
        operation: Operation,
        /// Entity the operation targeted.
        name: String,
        /// Backend message.
        message: String,
    },

    /// The write exceeded the user's storage quota.
    #[error("quota exceeded while writing '{resource}'")]
    QuotaExceeded {
        /// Target resource.
        resource: String,
    },

    /// A status code the client has no mapping for.
    #[error("unknown backend status {code}: {message}")]
    UnknownBackend {
        /// Raw OCS status code.
        code: u32,
        /// Raw backend message.
        message: String,
    },

    /// Network or connection failure carrying no envelope.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response body was not a valid OCS document.
    #[error("malformed status envelope: {0}")]
    Envelope(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(TransportError::Io(err))
    }
}

/// Result type for OCS operations.
pub type Result<T> = std::result::Result<T, Error>;
