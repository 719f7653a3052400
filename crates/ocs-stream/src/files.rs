//! Per-principal file access on top of [`StreamSynchronizer`].

use log::{debug, info};
use ocs_status::{EntityKind, Error, Result};
use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::config::ClientConfig;
use crate::read::RemoteReader;
use crate::synchronizer::StreamSynchronizer;
use crate::transfer::{substitute_username, Credentials, Method, TransferContext};
use crate::write::RemoteWriter;

/// Looks up the credentials a principal acts with.
pub trait CredentialSource: Send + Sync {
    fn credentials_for(&self, principal: &str) -> Option<Credentials>;
}

/// Fixed map of principals to credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: HashMap<String, Credentials>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `credentials` under their own username.
    pub fn with(mut self, credentials: Credentials) -> Self {
        self.insert(credentials);
        self
    }

    pub fn insert(&mut self, credentials: Credentials) {
        self.entries
            .insert(credentials.username().to_string(), credentials);
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials_for(&self, principal: &str) -> Option<Credentials> {
        self.entries.get(principal).cloned()
    }
}

/// Remote files addressed by path below each principal's WebDAV root.
pub struct RemoteFiles<C> {
    synchronizer: StreamSynchronizer,
    config: ClientConfig,
    credentials: C,
}

impl<C: CredentialSource> RemoteFiles<C> {
    pub fn new(synchronizer: StreamSynchronizer, config: ClientConfig, credentials: C) -> Self {
        Self {
            synchronizer,
            config,
            credentials,
        }
    }

    pub fn synchronizer(&self) -> &StreamSynchronizer {
        &self.synchronizer
    }

    fn context(&self, method: Method, principal: &str, path: &str) -> Result<TransferContext> {
        let credentials =
            self.credentials
                .credentials_for(principal)
                .ok_or_else(|| Error::NotFound {
                    kind: EntityKind::User,
                    name: principal.to_string(),
                    message: "no credentials configured".to_string(),
                })?;
        Ok(
            TransferContext::new(method, self.config.webdav_locator(path), credentials)
                .with_rewrite(substitute_username()),
        )
    }

    /// Open `path` for reading as `principal`.
    pub fn open_read(&self, principal: &str, path: &str) -> Result<RemoteReader> {
        let ctx = self.context(Method::Get, principal, path)?;
        self.synchronizer.open_read_stream(ctx)
    }

    /// Open `path` for writing as `principal`, replacing any existing content.
    pub fn open_write(
        &self,
        principal: &str,
        path: &str,
        content_type: Option<&str>,
    ) -> Result<RemoteWriter> {
        let mut ctx = self.context(Method::Put, principal, path)?;
        if let Some(content_type) = content_type {
            ctx = ctx.with_content_type(content_type);
        }
        self.synchronizer.open_write_stream(ctx)
    }

    /// Copy `path` into `out` and return the number of bytes copied.
    ///
    /// A remote failure is reported as the translated error rather than the
    /// read error it caused.
    pub fn download_to<W: Write + ?Sized>(
        &self,
        principal: &str,
        path: &str,
        out: &mut W,
    ) -> Result<u64> {
        let mut reader = self.open_read(principal, path)?;
        let copied = io::copy(&mut reader, out);
        let closed = reader.close();
        match (copied, closed) {
            (_, Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err.into()),
            (Ok(bytes), Ok(())) => {
                info!("downloaded {} ({} bytes) as {}", path, bytes, principal);
                Ok(bytes)
            }
        }
    }

    /// Upload everything `input` yields to `path` and return the byte count.
    ///
    /// If `input` fails the upload is aborted, so no truncated file is committed.
    pub fn upload_from<R: Read + ?Sized>(
        &self,
        principal: &str,
        path: &str,
        input: &mut R,
        content_type: Option<&str>,
    ) -> Result<u64> {
        let mut writer = self.open_write(principal, path, content_type)?;
        let mut buffer = vec![0u8; 8 * 1024];
        let mut total = 0u64;
        loop {
            let n = match input.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!("local read failed, aborting upload of {}", path);
                    writer.abort(&err.to_string());
                    return Err(err.into());
                }
            };
            if let Err(err) = writer.write_all(&buffer[..n]) {
                // The remote side gave up; close reports why.
                writer.close()?;
                return Err(err.into());
            }
            total += n as u64;
        }
        writer.close()?;
        info!("uploaded {} ({} bytes) as {}", path, total, principal);
        Ok(total)
    }
}
