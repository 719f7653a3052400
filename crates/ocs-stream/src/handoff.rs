//! Handoff between a caller thread and the worker driving its HTTP exchange.
//!
//! Every transfer spawns one named worker. The worker sends the caller's pipe
//! end over the *ready* channel as soon as the pipe exists, and later reports
//! the exchange result over the *outcome* channel. Both channels carry at most
//! one message; [`Producer::complete`] consumes the producer so the outcome
//! cannot be reported twice. If the worker dies without reporting, the caller
//! observes the disconnect instead of blocking forever.

use log::{debug, error};
use ocs_status::TransportError;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Result of a worker's HTTP exchange.
pub type Outcome = Result<(), TransportError>;

/// Worker side of a handoff.
pub struct Producer<T> {
    ready: Option<SyncSender<T>>,
    outcome: SyncSender<Outcome>,
}

impl<T> Producer<T> {
    /// Hand the caller its end of the pipe. Only the first call has an effect.
    ///
    /// Returns `false` when the caller is no longer waiting.
    pub fn ready(&mut self, end: T) -> bool {
        match self.ready.take() {
            Some(tx) => tx.send(end).is_ok(),
            None => false,
        }
    }

    /// Report the exchange result. Unblocks a caller waiting in close.
    pub fn complete(self, outcome: Outcome) {
        // The caller may already have gone away after an early close.
        let _ = self.outcome.send(outcome);
    }
}

/// Caller side of a handoff.
pub struct Consumer<T> {
    name: String,
    ready: Receiver<T>,
    outcome: Receiver<Outcome>,
    worker: Option<JoinHandle<()>>,
}

impl<T> Consumer<T> {
    /// Block until the worker has opened the pipe.
    pub fn wait_ready(&mut self) -> Result<T, TransportError> {
        match self.ready.recv() {
            Ok(end) => Ok(end),
            Err(_) => match self.outcome.recv() {
                Ok(Err(err)) => Err(err),
                Ok(Ok(())) => Err(TransportError::Worker(format!(
                    "{} finished without opening its pipe",
                    self.name
                ))),
                Err(_) => Err(self.join_failure()),
            },
        }
    }

    /// Block until the worker reports its outcome, then reap the thread.
    pub fn wait_complete(&mut self) -> Outcome {
        match self.outcome.recv() {
            Ok(outcome) => {
                self.join();
                outcome
            }
            Err(_) => Err(self.join_failure()),
        }
    }

    /// Return the outcome if the worker has already reported it.
    pub fn try_complete(&mut self) -> Option<Outcome> {
        match self.outcome.try_recv() {
            Ok(outcome) => {
                self.join();
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.join_failure())),
        }
    }

    /// Stop tracking the worker; it finishes on its own.
    pub fn detach(&mut self) {
        if self.worker.take().is_some() {
            debug!("{} detached", self.name);
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("{} panicked after reporting its outcome", self.name);
            }
        }
    }

    fn join_failure(&mut self) -> TransportError {
        let panicked = self
            .worker
            .take()
            .map(|handle| handle.join().is_err())
            .unwrap_or(false);
        if panicked {
            TransportError::Worker(format!("{} panicked", self.name))
        } else {
            TransportError::Worker(format!("{} exited without reporting", self.name))
        }
    }
}

/// Spawn a dedicated worker thread running `work`.
pub fn spawn<T, F>(name: impl Into<String>, work: F) -> Result<Consumer<T>, TransportError>
where
    T: Send + 'static,
    F: FnOnce(Producer<T>) + Send + 'static,
{
    let name = name.into();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let (outcome_tx, outcome_rx) = mpsc::sync_channel(1);

    let producer = Producer {
        ready: Some(ready_tx),
        outcome: outcome_tx,
    };

    let worker = thread::Builder::new()
        .name(name.clone())
        .spawn(move || work(producer))
        .map_err(|e| TransportError::Worker(format!("failed to spawn {}: {}", name, e)))?;
    debug!("{} started", name);

    Ok(Consumer {
        name,
        ready: ready_rx,
        outcome: outcome_rx,
        worker: Some(worker),
    })
}
