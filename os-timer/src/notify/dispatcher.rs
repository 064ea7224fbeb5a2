/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A single worker thread that runs timer callbacks in firing order.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, warn};

use super::Fire;
use crate::error::TimerError;

type Job = Arc<dyn Fire>;

/// Handle to a dispatcher thread.  Clones share the same thread.
///
/// The thread exits once every clone has been dropped and every timer created
/// with it has been deleted.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    thread_id: ThreadId,
    tx: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawns the worker thread under `name`.
    pub fn spawn(name: impl Into<String>) -> Result<Self, TimerError> {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(rx))
            .map_err(|source| TimerError::Dispatcher {
                name: name.clone(),
                source,
            })?;

        debug!(dispatcher = %name, "dispatcher thread started");

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                thread_id: handle.thread().id(),
                tx: Mutex::new(Some(tx)),
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Name given to the worker thread.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Id of the worker thread every callback runs on.
    pub fn thread_id(&self) -> ThreadId {
        self.inner.thread_id
    }

    pub(crate) fn submit(&self, job: Job) {
        let tx = self.inner.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = match tx.as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        };
        if !sent {
            warn!(dispatcher = %self.inner.name, "dispatcher is gone, firing dropped");
        }
    }
}

fn run(rx: Receiver<Job>) {
    for job in rx {
        job.invoke();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.tx
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let handle = self
            .handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        // The last reference can be released by a job on the worker itself.
        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(dispatcher = %self.name, "dispatcher thread panicked");
            }
        }
        debug!(dispatcher = %self.name, "dispatcher thread stopped");
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.inner.name)
            .field("thread_id", &self.inner.thread_id)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
