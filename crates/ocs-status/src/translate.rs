//! Mapping of OCS status codes and HTTP failures onto [`Error`].
//!
//! Each [`Operation`] owns a small table of operation-specific codes. The
//! codes shared by every OCS endpoint (`997`, `998`) are handled first and
//! anything left over becomes [`Error::UnknownBackend`].

use log::{error, warn};
use std::fmt;

use crate::{EntityKind, Error, Result, StatusEnvelope, TransportError};

/// OCS code: the acting user is not authorised.
pub const STATUS_UNAUTHORISED: u32 = 997;
/// OCS code: the requested entity does not exist.
pub const STATUS_NOT_FOUND: u32 = 998;

/// HTTP status for a missing WebDAV resource.
pub const HTTP_NOT_FOUND: u16 = 404;
/// HTTP status sent by WebDAV endpoints when the quota is exhausted.
pub const HTTP_INSUFFICIENT_STORAGE: u16 = 507;

/// Remote operation a status code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Any call without operation-specific codes.
    Generic,
    /// Stream a file's bytes from the server.
    ReadFile,
    /// Stream a file's bytes to the server.
    WriteFile,
    /// `POST /groups`.
    CreateGroup,
    /// `DELETE /groups/{group}`.
    DeleteGroup,
    /// `POST /users/{user}/groups`.
    AddToGroup,
    /// `DELETE /users/{user}/groups`.
    RemoveFromGroup,
    /// `POST /users`.
    CreateUser,
    /// `DELETE /users/{user}`.
    DeleteUser,
    /// `PUT /users/{user}`.
    EditUser,
    /// `GET /users/{user}/groups`.
    ListUserGroups,
}

impl Operation {
    /// Entity kind a generic "not found" refers to for this operation.
    pub fn subject(self) -> EntityKind {
        match self {
            Operation::Generic | Operation::ReadFile | Operation::WriteFile => {
                EntityKind::Resource
            }
            Operation::CreateGroup | Operation::DeleteGroup => EntityKind::Group,
            Operation::AddToGroup
            | Operation::RemoveFromGroup
            | Operation::CreateUser
            | Operation::DeleteUser
            | Operation::EditUser
            | Operation::ListUserGroups => EntityKind::User,
        }
    }

    fn codes(self) -> &'static [(u32, Outcome)] {
        match self {
            Operation::Generic
            | Operation::ReadFile
            | Operation::WriteFile
            | Operation::ListUserGroups => &[],
            Operation::CreateGroup => CREATE_GROUP,
            Operation::DeleteGroup => DELETE_GROUP,
            Operation::AddToGroup | Operation::RemoveFromGroup => GROUP_MEMBERSHIP,
            Operation::CreateUser => CREATE_USER,
            Operation::DeleteUser => DELETE_USER,
            Operation::EditUser => EDIT_USER,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Generic => "request",
            Operation::ReadFile => "read file",
            Operation::WriteFile => "write file",
            Operation::CreateGroup => "create group",
            Operation::DeleteGroup => "delete group",
            Operation::AddToGroup => "add user to group",
            Operation::RemoveFromGroup => "remove user from group",
            Operation::CreateUser => "create user",
            Operation::DeleteUser => "delete user",
            Operation::EditUser => "edit user",
            Operation::ListUserGroups => "list user groups",
        };
        f.write_str(name)
    }
}

/// Identifiers used to fill in translated errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationContext {
    /// User performing the request.
    pub user: String,
    /// Target locator or target user id.
    pub resource: String,
    /// Operation-specific entity such as a group name.
    pub entity: Option<String>,
}

impl TranslationContext {
    /// Context for a call by `user` against `resource`.
    pub fn new(user: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            resource: resource.into(),
            entity: None,
        }
    }

    /// Attach the operation-specific entity name.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    fn name_for(&self, kind: EntityKind) -> String {
        match kind {
            EntityKind::Group => self
                .entity
                .clone()
                .unwrap_or_else(|| self.resource.clone()),
            EntityKind::User | EntityKind::Resource => self.resource.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Forbidden,
    InvalidArgument,
    AlreadyExists(EntityKind),
    NotFound(EntityKind),
    OperationFailed,
}

const CREATE_GROUP: &[(u32, Outcome)] = &[
    (101, Outcome::InvalidArgument),
    (102, Outcome::AlreadyExists(EntityKind::Group)),
    (103, Outcome::OperationFailed),
];

const DELETE_GROUP: &[(u32, Outcome)] = &[
    (101, Outcome::NotFound(EntityKind::Group)),
    (102, Outcome::OperationFailed),
];

const GROUP_MEMBERSHIP: &[(u32, Outcome)] = &[
    (101, Outcome::InvalidArgument),
    (102, Outcome::NotFound(EntityKind::Group)),
    (103, Outcome::NotFound(EntityKind::User)),
    (104, Outcome::Forbidden),
    (105, Outcome::OperationFailed),
];

const CREATE_USER: &[(u32, Outcome)] = &[
    (101, Outcome::InvalidArgument),
    (102, Outcome::AlreadyExists(EntityKind::User)),
    (103, Outcome::OperationFailed),
];

const DELETE_USER: &[(u32, Outcome)] = &[(101, Outcome::OperationFailed)];

const EDIT_USER: &[(u32, Outcome)] = &[
    (101, Outcome::NotFound(EntityKind::User)),
    (102, Outcome::InvalidArgument),
];

/// Translate a status envelope into `Ok(())` or the matching error.
pub fn translate(
    envelope: &StatusEnvelope,
    operation: Operation,
    ctx: &TranslationContext,
) -> Result<()> {
    if envelope.is_ok() {
        return Ok(());
    }
    Err(translate_failure(envelope, operation, ctx))
}

fn translate_failure(
    envelope: &StatusEnvelope,
    operation: Operation,
    ctx: &TranslationContext,
) -> Error {
    let outcome = match envelope.statuscode {
        STATUS_UNAUTHORISED => Some(Outcome::Forbidden),
        STATUS_NOT_FOUND => Some(Outcome::NotFound(operation.subject())),
        code => operation
            .codes()
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, outcome)| *outcome),
    };

    let Some(outcome) = outcome else {
        error!(
            "{} by '{}' on '{}' returned unhandled status {}: {}",
            operation, ctx.user, ctx.resource, envelope.statuscode, envelope.message
        );
        return Error::UnknownBackend {
            code: envelope.statuscode,
            message: envelope.message.clone(),
        };
    };

    warn!(
        "{} by '{}' on '{}' failed with status {}: {}",
        operation, ctx.user, ctx.resource, envelope.statuscode, envelope.message
    );
    build(outcome, operation, ctx, &envelope.message)
}

fn build(outcome: Outcome, operation: Operation, ctx: &TranslationContext, message: &str) -> Error {
    match outcome {
        Outcome::Forbidden => Error::Forbidden {
            user: ctx.user.clone(),
            resource: ctx.resource.clone(),
        },
        Outcome::InvalidArgument => Error::InvalidArgument {
            name: ctx.name_for(operation.subject()),
            message: message.to_string(),
        },
        Outcome::AlreadyExists(kind) => Error::AlreadyExists {
            kind,
            name: ctx.name_for(kind),
        },
        Outcome::NotFound(kind) => Error::NotFound {
            kind,
            name: ctx.name_for(kind),
            message: message.to_string(),
        },
        Outcome::OperationFailed => Error::OperationFailed {
            operation,
            name: ctx.name_for(operation.subject()),
            message: message.to_string(),
        },
    }
}

/// Translate a non-success HTTP response that may or may not carry an envelope.
pub fn translate_http_status(
    status: u16,
    body: &str,
    operation: Operation,
    ctx: &TranslationContext,
) -> Error {
    // OCS v2 pairs HTTP errors with an envelope; its code is more specific.
    if let Ok(envelope) = StatusEnvelope::from_json(body.as_bytes()) {
        if !envelope.is_ok() {
            return translate_failure(&envelope, operation, ctx);
        }
    }

    match status {
        HTTP_NOT_FOUND => {
            warn!("{} on '{}': not found", operation, ctx.resource);
            Error::NotFound {
                kind: EntityKind::Resource,
                name: ctx.resource.clone(),
                message: format!("HTTP {}", status),
            }
        }
        HTTP_INSUFFICIENT_STORAGE => {
            warn!("{} on '{}': insufficient storage", operation, ctx.resource);
            Error::QuotaExceeded {
                resource: ctx.resource.clone(),
            }
        }
        401 | 403 => {
            warn!("{} by '{}' on '{}': HTTP {}", operation, ctx.user, ctx.resource, status);
            Error::Forbidden {
                user: ctx.user.clone(),
                resource: ctx.resource.clone(),
            }
        }
        _ => Error::Transport(TransportError::Status {
            status,
            body: body.to_string(),
        }),
    }
}

/// Translate a failure captured during an HTTP exchange.
///
/// Status-carrying failures are mapped like [`translate_http_status`]; every
/// other transport error is wrapped unchanged.
pub fn translate_transport(
    err: TransportError,
    operation: Operation,
    ctx: &TranslationContext,
) -> Error {
    match err {
        TransportError::Status { status, body } => {
            translate_http_status(status, &body, operation, ctx)
        }
        other => Error::Transport(other),
    }
}
