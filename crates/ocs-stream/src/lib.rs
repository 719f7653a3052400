//! # ocs-stream
//!
//! Blocking `Read`/`Write` streams over remote WebDAV transfers.
//!
//! Every stream is backed by a dedicated worker thread that runs the HTTP
//! exchange. Bytes travel between the caller and the worker through a bounded
//! in-memory pipe, so neither side ever holds a whole file.
//!
//! - [`StreamSynchronizer::open_read_stream`] returns as soon as the pipe is
//!   open; bytes arrive while the download is still running.
//! - [`StreamSynchronizer::open_write_stream`] returns a writer whose
//!   [`close`](RemoteWriter::close) blocks until the server has answered.
//!
//! Failures are reported through the typed errors of `ocs-status`, never as a
//! silently truncated stream.
//!
//! ## Example
//!
//! ```ignore
//! use ocs_stream::{ClientConfig, Credentials, StreamSynchronizer, TransferContext};
//! use std::io::Write;
//!
//! let config = ClientConfig::load("ocs.toml")?;
//! let streams = StreamSynchronizer::from_config(&config)?;
//! let ctx = TransferContext::put(config.webdav_locator("notes.txt"), Credentials::new("alice", "pw"))
//!     .with_rewrite(ocs_stream::substitute_username());
//!
//! let mut writer = streams.open_write_stream(ctx)?;
//! writer.write_all(b"hello")?;
//! writer.close()?;
//! ```

mod config;
mod exchange;
mod files;
mod handoff;
mod pipe;
mod read;
mod synchronizer;
mod transfer;
mod write;

pub use config::{ClientConfig, CredentialsConfig, TransportConfig};
#[cfg(feature = "reqwest")]
pub use exchange::ReqwestTransport;
pub use exchange::{
    ExchangeExecutor, HttpRequest, HttpResponse, RequestBody, Transport, MAX_ERROR_BODY,
};
pub use files::{CredentialSource, RemoteFiles, StaticCredentials};
pub use pipe::{pipe, PipeReader, PipeWriter, DEFAULT_PIPE_CAPACITY};
pub use read::RemoteReader;
pub use synchronizer::StreamSynchronizer;
pub use transfer::{
    substitute_username, Credentials, LocatorRewrite, Method, TransferContext,
    USERNAME_PLACEHOLDER,
};
pub use write::RemoteWriter;

// Error types live in ocs-status; re-exported so callers need one import.
pub use ocs_status::{Error, Operation, Result, TransportError};
