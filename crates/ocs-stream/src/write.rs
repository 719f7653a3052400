use log::{debug, error, warn};
use ocs_status::{translate_transport, Operation, Result, TransportError, TranslationContext};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::exchange::{ExchangeExecutor, RequestBody};
use crate::handoff::{self, Consumer, Producer};
use crate::pipe::{pipe, PipeReader, PipeWriter};
use crate::transfer::TransferContext;

/// Blocking writer whose bytes become the body of a remote upload.
///
/// The upload is only committed by [`close`](RemoteWriter::close), which
/// waits until the server has answered. Writes fail with `BrokenPipe` if the
/// upload already ended; `close` then returns the translated cause.
pub struct RemoteWriter {
    pipe: PipeWriter,
    handoff: Consumer<PipeWriter>,
    translation: TranslationContext,
    operation: Operation,
    closed: bool,
}

impl RemoteWriter {
    /// Locator this stream writes to.
    pub fn resource(&self) -> &str {
        &self.translation.resource
    }

    /// Finish the body and block until the server has accepted or rejected it.
    ///
    /// Only the first call can return an error.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pipe.close();

        match self.handoff.wait_complete() {
            Ok(()) => {
                debug!("upload of {} completed", self.translation.resource);
                Ok(())
            }
            Err(err) => Err(translate_transport(err, self.operation, &self.translation)),
        }
    }

    /// Abandon the upload without committing a truncated body.
    pub fn abort(mut self, reason: &str) {
        self.closed = true;
        self.pipe.abort(reason);
        if let Err(err) = self.handoff.wait_complete() {
            debug!("aborted upload of {} ended with: {}", self.translation.resource, err);
        }
    }
}

fn broken_upload(err: io::Error) -> io::Error {
    if err.kind() == io::ErrorKind::BrokenPipe {
        io::Error::new(
            io::ErrorKind::BrokenPipe,
            "remote upload ended early; close the stream for the cause",
        )
    } else {
        err
    }
}

impl Write for RemoteWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream is closed"));
        }
        self.pipe.write(buf).map_err(broken_upload)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.pipe.flush().map_err(broken_upload)
    }
}

impl Drop for RemoteWriter {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if thread::panicking() {
            self.closed = true;
            self.pipe.abort("writer dropped during panic");
            warn!("upload of {} abandoned during panic", self.translation.resource);
            return;
        }
        if let Err(err) = self.close() {
            error!("upload of {} failed: {}", self.translation.resource, err);
        }
    }
}

/// Start the upload worker and wait until its pipe is open.
pub(crate) fn open(
    executor: ExchangeExecutor,
    ctx: TransferContext,
    capacity: usize,
    name: String,
) -> Result<RemoteWriter> {
    let translation = ctx.translation_context();
    let operation = ctx.operation;

    let mut handoff = handoff::spawn(name, move |producer| {
        upload(executor, ctx, capacity, producer)
    })
    .map_err(|err| translate_transport(err, operation, &translation))?;

    let pipe = handoff
        .wait_ready()
        .map_err(|err| translate_transport(err, operation, &translation))?;

    Ok(RemoteWriter {
        pipe,
        handoff,
        translation,
        operation,
        closed: false,
    })
}

fn upload(
    executor: ExchangeExecutor,
    ctx: TransferContext,
    capacity: usize,
    mut producer: Producer<PipeWriter>,
) {
    let (writer, reader) = pipe(capacity);
    if !producer.ready(writer) {
        debug!("caller left before {} was opened", ctx.locator);
        return;
    }

    // The transport owns the reader from here on; dropping it breaks the caller's writes.
    let body = BodyReader::new(reader);
    let drained = body.drained();
    let mut outcome = executor.execute(&ctx, RequestBody::Stream(Box::new(body)), |response| {
        io::copy(&mut response.body, &mut io::sink()).map(|_| ())
    });

    // A success answer only commits the upload if the server saw the whole body.
    if outcome.is_ok() && !drained.load(Ordering::Acquire) {
        outcome = Err(TransportError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "server accepted an incomplete body",
        )));
    }

    if let Err(err) = &outcome {
        debug!("upload of {} failed: {}", ctx.locator, err);
    }
    producer.complete(outcome);
}

/// Request body that records whether the transport read it to the end.
struct BodyReader {
    reader: PipeReader,
    drained: Arc<AtomicBool>,
}

impl BodyReader {
    fn new(reader: PipeReader) -> Self {
        Self {
            reader,
            drained: Arc::new(AtomicBool::new(false)),
        }
    }

    fn drained(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.drained)
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.drained.store(true, Ordering::Release);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_reader_marks_end_of_stream() {
        let (mut writer, reader) = pipe(16);
        let mut body = BodyReader::new(reader);
        let drained = body.drained();

        writer.write_all(b"abc").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(body.read(&mut buf).unwrap(), 3);
        assert_eq!(body.read(&mut []).unwrap(), 0);
        assert!(!drained.load(Ordering::Acquire));

        writer.close();
        assert_eq!(body.read(&mut buf).unwrap(), 0);
        assert!(drained.load(Ordering::Acquire));
    }

    #[test]
    fn test_body_reader_abort_is_not_end_of_stream() {
        let (mut writer, reader) = pipe(16);
        let mut body = BodyReader::new(reader);
        let drained = body.drained();

        writer.abort("local read failed");
        assert!(body.read(&mut [0u8; 4]).is_err());
        assert!(!drained.load(Ordering::Acquire));
    }
}
