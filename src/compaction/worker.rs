//! Background merge worker
//!
//! Accepts merge requests over a channel and runs them on a dedicated thread,
//! so an administrative trigger can return before the merge finishes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, info};

use crate::engine::Engine;
use crate::error::{CaskError, Result};

use super::MergeStats;

enum Request {
    Merge { reply: Sender<Result<MergeStats>> },
}

/// Runs `Engine::merge` on a background thread
///
/// Merges still take the engine's exclusive lock, so they serialize with
/// every other write and block readers while they run.
pub struct MergeWorker {
    sender: Option<Sender<Request>>,
    handle: Option<JoinHandle<()>>,
}

impl MergeWorker {
    /// Start the worker thread for `engine`
    pub fn spawn(engine: Arc<Engine>) -> Result<Self> {
        let (sender, receiver) = channel::unbounded();

        let handle = thread::Builder::new()
            .name("caskdb-merge".to_string())
            .spawn(move || run(engine, receiver))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a merge and return immediately
    ///
    /// The returned receiver yields the merge outcome once it has run. It may
    /// be dropped; the merge still happens.
    pub fn request(&self) -> Result<Receiver<Result<MergeStats>>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| CaskError::MergeWorker("worker is shut down".to_string()))?;

        let (reply, outcome) = channel::bounded(1);
        sender
            .send(Request::Merge { reply })
            .map_err(|_| CaskError::MergeWorker("worker thread has stopped".to_string()))?;

        Ok(outcome)
    }

    /// Stop accepting requests, finish queued merges, and join the thread
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| CaskError::MergeWorker("worker thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for MergeWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = %e, "merge worker did not stop cleanly");
        }
    }
}

fn run(engine: Arc<Engine>, receiver: Receiver<Request>) {
    debug!("merge worker started");

    for request in receiver.iter() {
        match request {
            Request::Merge { reply } => {
                let outcome = engine.merge();
                match &outcome {
                    Ok(stats) => info!(
                        reclaimed = stats.bytes_reclaimed(),
                        "background merge finished"
                    ),
                    Err(e) => error!(error = %e, "background merge failed"),
                }
                // Requester may have dropped its receiver
                let _ = reply.send(outcome);
            }
        }
    }

    debug!("merge worker stopped");
}
