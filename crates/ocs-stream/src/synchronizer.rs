use log::debug;
use ocs_status::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::exchange::{ExchangeExecutor, Transport};
use crate::pipe::DEFAULT_PIPE_CAPACITY;
use crate::read::{self, RemoteReader};
use crate::transfer::{Method, TransferContext};
use crate::write::{self, RemoteWriter};

static TRANSFER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opens blocking streams whose bytes are moved by per-transfer worker threads.
///
/// A synchronizer is cheap to clone and holds no per-transfer state, so one
/// instance can serve any number of principals concurrently.
#[derive(Debug, Clone)]
pub struct StreamSynchronizer {
    executor: ExchangeExecutor,
    pipe_capacity: usize,
}

impl StreamSynchronizer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: ExchangeExecutor::new(transport),
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }

    /// Build a synchronizer over the default `reqwest` transport.
    #[cfg(feature = "reqwest")]
    pub fn from_config(config: &crate::config::ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = crate::exchange::ReqwestTransport::new(&config.transport)?;
        Ok(Self::new(Arc::new(transport)).with_pipe_capacity(config.pipe_capacity))
    }

    /// Bytes buffered between caller and worker. Zero is bumped to one.
    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    pub fn pipe_capacity(&self) -> usize {
        self.pipe_capacity
    }

    /// Executor used for the exchanges, for buffered request/response calls.
    pub fn executor(&self) -> &ExchangeExecutor {
        &self.executor
    }

    /// Start a download and return once the worker's pipe is open.
    ///
    /// Returns before the server has answered. A failing download surfaces
    /// as a read error and as the error of [`RemoteReader::close`].
    pub fn open_read_stream(&self, ctx: TransferContext) -> Result<RemoteReader> {
        expect_method(&ctx, Method::Get)?;
        let name = format!("ocs-get-{}", TRANSFER_COUNTER.fetch_add(1, Ordering::Relaxed));
        debug!("{} opening {}", name, ctx.locator);
        read::open(self.executor.clone(), ctx, self.pipe_capacity, name)
    }

    /// Start an upload and return once the caller can write the body.
    ///
    /// The upload is committed by [`RemoteWriter::close`], which blocks
    /// until the server has answered.
    pub fn open_write_stream(&self, ctx: TransferContext) -> Result<RemoteWriter> {
        expect_method(&ctx, Method::Put)?;
        let name = format!("ocs-put-{}", TRANSFER_COUNTER.fetch_add(1, Ordering::Relaxed));
        debug!("{} opening {}", name, ctx.locator);
        write::open(self.executor.clone(), ctx, self.pipe_capacity, name)
    }
}

fn expect_method(ctx: &TransferContext, method: Method) -> Result<()> {
    if ctx.method == method {
        Ok(())
    } else {
        Err(Error::InvalidArgument {
            name: ctx.locator.clone(),
            message: format!("stream needs a {} transfer, got {}", method, ctx.method),
        })
    }
}
