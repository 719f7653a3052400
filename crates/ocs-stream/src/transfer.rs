use base64::{engine::general_purpose, Engine as _};
use ocs_status::{Operation, TranslationContext};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

/// Placeholder replaced by [`substitute_username`].
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// HTTP methods used against the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username and password of the acting principal.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Arc<SecretString>,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Arc::new(SecretString::new(password.into())),
        }
    }

    /// Principal name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value for the `Authorization` header.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Rewrites a locator before the request is sent.
pub type LocatorRewrite = Arc<dyn Fn(&str, &Credentials) -> String + Send + Sync>;

/// Rewrite that replaces [`USERNAME_PLACEHOLDER`] with the percent-encoded acting username.
pub fn substitute_username() -> LocatorRewrite {
    Arc::new(|locator: &str, credentials: &Credentials| {
        locator.replace(
            USERNAME_PLACEHOLDER,
            &urlencoding::encode(credentials.username()),
        )
    })
}

/// Everything one transfer needs. Built once per stream open.
#[derive(Clone)]
pub struct TransferContext {
    /// Target URL, possibly containing placeholders.
    pub locator: String,
    /// HTTP method.
    pub method: Method,
    /// Acting principal.
    pub credentials: Credentials,
    /// `Content-Type` of the request body, if any.
    pub content_type: Option<String>,
    /// Additional request headers.
    pub headers: Vec<(String, String)>,
    /// Optional locator rewrite.
    pub rewrite: Option<LocatorRewrite>,
    /// Operation used when translating failures.
    pub operation: Operation,
    /// Operation-specific entity name used when translating failures.
    pub entity: Option<String>,
}

impl TransferContext {
    /// Context for any method.
    pub fn new(method: Method, locator: impl Into<String>, credentials: Credentials) -> Self {
        let operation = match method {
            Method::Get => Operation::ReadFile,
            Method::Put => Operation::WriteFile,
            Method::Post | Method::Delete => Operation::Generic,
        };
        Self {
            locator: locator.into(),
            method,
            credentials,
            content_type: None,
            headers: Vec::new(),
            rewrite: None,
            operation,
            entity: None,
        }
    }

    /// Context for a download.
    pub fn get(locator: impl Into<String>, credentials: Credentials) -> Self {
        Self::new(Method::Get, locator, credentials)
    }

    /// Context for an upload.
    pub fn put(locator: impl Into<String>, credentials: Credentials) -> Self {
        Self::new(Method::Put, locator, credentials)
    }

    /// Set the request content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the locator rewrite.
    pub fn with_rewrite(mut self, rewrite: LocatorRewrite) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// Override the operation used for failure translation.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Set the entity name used for failure translation.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Locator after the rewrite has been applied.
    pub fn resolved_locator(&self) -> String {
        match &self.rewrite {
            Some(rewrite) => rewrite(&self.locator, &self.credentials),
            None => self.locator.clone(),
        }
    }

    /// Identifiers for translating failures of this transfer.
    pub fn translation_context(&self) -> TranslationContext {
        let ctx = TranslationContext::new(self.credentials.username(), self.resolved_locator());
        match &self.entity {
            Some(entity) => ctx.with_entity(entity.clone()),
            None => ctx,
        }
    }
}

impl fmt::Debug for TransferContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferContext")
            .field("locator", &self.locator)
            .field("method", &self.method)
            .field("credentials", &self.credentials)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("rewrite", &self.rewrite.is_some())
            .field("operation", &self.operation)
            .finish()
    }
}
