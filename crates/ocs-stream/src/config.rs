use ocs_status::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::pipe::DEFAULT_PIPE_CAPACITY;
use crate::transfer::{Credentials, USERNAME_PLACEHOLDER};

fn default_webdav_root() -> String {
    format!("/remote.php/dav/files/{}", USERNAME_PLACEHOLDER)
}

fn default_ocs_root() -> String {
    "/ocs/v1.php/cloud".to_string()
}

fn default_pipe_capacity() -> usize {
    DEFAULT_PIPE_CAPACITY
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("ocs-bridge/", env!("CARGO_PKG_VERSION")).to_string()
}

/// The `[transport]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Connection establishment timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds; unset means unlimited.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    /// `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

/// The optional `[credentials]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,
    /// May be left out and supplied at runtime instead.
    #[serde(default)]
    pub password: Option<String>,
}

/// Client configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server root, e.g. `https://cloud.example.com`.
    pub base_url: String,
    /// WebDAV files root below `base_url`; may contain `{username}`.
    #[serde(default = "default_webdav_root")]
    pub webdav_root: String,
    /// OCS provisioning root below `base_url`.
    #[serde(default = "default_ocs_root")]
    pub ocs_root: String,
    /// Bytes buffered between caller and transfer worker.
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the server root.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            webdav_root: default_webdav_root(),
            ocs_root: default_ocs_root(),
            pipe_capacity: default_pipe_capacity(),
            transport: TransportConfig::default(),
            credentials: None,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Reject configurations the bridge cannot work with.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(Error::Config("base_url is required".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base_url must use http or https: {}",
                base
            )));
        }
        if self.pipe_capacity == 0 {
            return Err(Error::Config("pipe_capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// WebDAV locator for `path`, still containing the username placeholder.
    ///
    /// Each segment of `path` is percent-encoded; `/` separates segments.
    pub fn webdav_locator(&self, path: &str) -> String {
        join_url(&[&self.base_url, &self.webdav_root, &encode_path(path)])
    }

    /// OCS locator for `path` with JSON output requested.
    ///
    /// `path` is used as given, so its segments must already be escaped.
    pub fn ocs_locator(&self, path: &str) -> String {
        let url = join_url(&[&self.base_url, &self.ocs_root, path]);
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}format=json", url, separator)
    }

    /// Credentials from the `[credentials]` section, if complete.
    pub fn credentials(&self) -> Option<Credentials> {
        let section = self.credentials.as_ref()?;
        let password = section.password.as_ref()?;
        Some(Credentials::new(section.username.clone(), password.clone()))
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn join_url(parts: &[&str]) -> String {
    let mut url = String::new();
    for part in parts {
        let part = part.trim_matches('/');
        if part.is_empty() {
            continue;
        }
        if !url.is_empty() {
            url.push('/');
        }
        url.push_str(part);
    }
    url
}
