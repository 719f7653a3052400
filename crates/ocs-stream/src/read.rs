use log::{debug, error};
use ocs_status::{translate_transport, Operation, Result, TransportError, TranslationContext};
use std::io::{self, Read};

use crate::exchange::{ExchangeExecutor, RequestBody};
use crate::handoff::{self, Consumer, Producer};
use crate::pipe::{pipe, PipeReader};
use crate::transfer::TransferContext;

/// Blocking reader over a remote file being downloaded by a worker thread.
///
/// Bytes are available as soon as the worker receives them. If the download
/// fails, `read` returns an error once the buffered bytes are drained and
/// [`close`](RemoteReader::close) returns the translated cause.
pub struct RemoteReader {
    pipe: PipeReader,
    handoff: Consumer<PipeReader>,
    translation: TranslationContext,
    operation: Operation,
    finished: bool,
    closed: bool,
}

impl RemoteReader {
    /// Locator this stream reads from.
    pub fn resource(&self) -> &str {
        &self.translation.resource
    }

    /// Close the stream and report how the download ended.
    ///
    /// Closing before end-of-stream cancels the download; the rest of the
    /// body is discarded. Only the first call can return an error.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pipe.close();

        let outcome = if self.finished {
            // The worker reports before it closes its pipe end, so this never waits long.
            Some(self.handoff.wait_complete())
        } else {
            let outcome = self.handoff.try_complete();
            if outcome.is_none() {
                debug!("read of {} closed early, cancelling", self.translation.resource);
                self.handoff.detach();
            }
            outcome
        };

        match outcome {
            Some(Err(err)) => Err(translate_transport(err, self.operation, &self.translation)),
            _ => Ok(()),
        }
    }
}

impl Read for RemoteReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream is closed"));
        }
        match self.pipe.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.finished = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(err) => {
                self.finished = true;
                Err(err)
            }
        }
    }
}

impl Drop for RemoteReader {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            error!("read of {} failed: {}", self.translation.resource, err);
        }
    }
}

/// Start the download worker and wait until its pipe is open.
pub(crate) fn open(
    executor: ExchangeExecutor,
    ctx: TransferContext,
    capacity: usize,
    name: String,
) -> Result<RemoteReader> {
    let translation = ctx.translation_context();
    let operation = ctx.operation;

    let mut handoff = handoff::spawn(name, move |producer| {
        download(executor, ctx, capacity, producer)
    })
    .map_err(|err| translate_transport(err, operation, &translation))?;

    let pipe = handoff
        .wait_ready()
        .map_err(|err| translate_transport(err, operation, &translation))?;

    Ok(RemoteReader {
        pipe,
        handoff,
        translation,
        operation,
        finished: false,
        closed: false,
    })
}

fn download(
    executor: ExchangeExecutor,
    ctx: TransferContext,
    capacity: usize,
    mut producer: Producer<PipeReader>,
) {
    let (mut writer, reader) = pipe(capacity);
    if !producer.ready(reader) {
        debug!("caller left before {} was opened", ctx.locator);
        return;
    }

    let result = executor.execute(&ctx, RequestBody::Empty, |response| {
        let copied = io::copy(&mut response.body, &mut writer)?;
        debug!("downloaded {} bytes from {}", copied, ctx.locator);
        Ok(())
    });

    let outcome = match result {
        Err(TransportError::Io(_)) if writer.is_reader_closed() => {
            debug!("download of {} cancelled by caller", ctx.locator);
            Ok(())
        }
        other => other,
    };

    let failure = outcome.as_ref().err().map(|err| err.to_string());
    producer.complete(outcome);
    match failure {
        None => writer.close(),
        Some(reason) => writer.abort(reason),
    }
}
