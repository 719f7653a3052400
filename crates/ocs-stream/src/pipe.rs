//! Bounded in-memory byte pipe with one writer and one reader.
//!
//! The writer blocks while the buffer is full and the reader blocks while it
//! is empty. Closing the writer delivers end-of-stream once the buffer has
//! drained; aborting it (or dropping it unclosed) delivers an error instead.
//! Closing the reader discards buffered bytes and breaks the writer.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Default pipe capacity in bytes.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum WriterState {
    Open,
    Closed,
    Aborted(String),
}

#[derive(Debug)]
struct State {
    buffer: VecDeque<u8>,
    writer: WriterState,
    reader_closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // Neither side panics while holding the lock, so the state stays consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a pipe holding at most `capacity` unread bytes.
///
/// A zero capacity is bumped to one byte so the writer can always make progress.
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            buffer: VecDeque::with_capacity(capacity.min(DEFAULT_PIPE_CAPACITY)),
            writer: WriterState::Open,
            reader_closed: false,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
        capacity,
    });

    (
        PipeWriter {
            shared: Arc::clone(&shared),
            done: false,
        },
        PipeReader {
            shared,
            done: false,
        },
    )
}

/// Writing end of a [`pipe`].
#[derive(Debug)]
pub struct PipeWriter {
    shared: Arc<Shared>,
    done: bool,
}

impl PipeWriter {
    /// Signal end-of-stream to the reader.
    pub fn close(&mut self) {
        self.finish(WriterState::Closed);
    }

    /// Close abnormally; the reader gets an error carrying `reason` after draining.
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.finish(WriterState::Aborted(reason.into()));
    }

    /// Whether the reading end has been closed.
    pub fn is_reader_closed(&self) -> bool {
        self.shared.lock().reader_closed
    }

    fn finish(&mut self, end: WriterState) {
        if self.done {
            return;
        }
        self.done = true;
        let mut state = self.shared.lock();
        state.writer = end;
        drop(state);
        self.shared.readable.notify_all();
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.done {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe writer is closed"));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let shared = &self.shared;
        let mut state = shared.lock();
        loop {
            if state.reader_closed {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader is closed"));
            }
            let free = shared.capacity - state.buffer.len();
            if free > 0 {
                let n = free.min(buf.len());
                state.buffer.extend(&buf[..n]);
                drop(state);
                shared.readable.notify_all();
                return Ok(n);
            }
            state = shared
                .writable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.shared.lock().reader_closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader is closed"));
        }
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.abort("pipe writer dropped before close");
    }
}

/// Reading end of a [`pipe`].
#[derive(Debug)]
pub struct PipeReader {
    shared: Arc<Shared>,
    done: bool,
}

impl PipeReader {
    /// Stop reading; buffered bytes are discarded and the writer breaks.
    pub fn close(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let mut state = self.shared.lock();
        state.reader_closed = true;
        state.buffer.clear();
        drop(state);
        self.shared.writable.notify_all();
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader is closed"));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let shared = &self.shared;
        let mut state = shared.lock();
        loop {
            if !state.buffer.is_empty() {
                let n = buf.len().min(state.buffer.len());
                for (slot, byte) in buf.iter_mut().zip(state.buffer.drain(..n)) {
                    *slot = byte;
                }
                drop(state);
                shared.writable.notify_all();
                return Ok(n);
            }
            if let WriterState::Aborted(reason) = &state.writer {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, reason.clone()));
            }
            if state.writer == WriterState::Closed {
                return Ok(0);
            }
            state = shared
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.close();
    }
}
