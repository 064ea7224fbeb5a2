/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! How a firing reaches the user callback.
//!
//! ```text
//! kernel ──(SIGEV_THREAD)──► OS thread ──► trampoline ──► registry lookup
//!                                                            │
//!                        Notify::Thread ◄────────────────────┤
//!                        (callback runs here)                │
//!                                                            ▼
//!                                         Notify::Dispatcher ──► worker thread
//!                                                               (callback runs there)
//! ```
//!
//! The OS spawns a fresh thread per firing.  `Notify::Thread` runs the
//! callback on it directly.  `Notify::Dispatcher` only uses it to enqueue the
//! firing, and the callback runs on one long-lived worker thread shared by
//! every timer created with that dispatcher.

mod dispatcher;
pub(crate) mod registry;

pub use dispatcher::Dispatcher;

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{error, trace};

use registry::Key;

// ── Strategy ──────────────────────────────────────────────────────────────────

/// Where timer callbacks execute.
#[derive(Debug, Clone, Default)]
pub enum Notify {
    /// On the thread the OS spawns for each firing.
    #[default]
    Thread,
    /// On the dispatcher's worker thread, one firing at a time.
    Dispatcher(Dispatcher),
}

// ── Callback trait ────────────────────────────────────────────────────────────

/// Handler invoked every time a timer fires.
///
/// Implemented for every `Fn(&T) + Send + Sync + 'static` closure, so most
/// callers never name this trait.
pub trait OnFire<T>: Send + Sync + 'static {
    fn on_fire(&self, context: &T);
}

impl<T, F> OnFire<T> for F
where
    F: Fn(&T) + Send + Sync + 'static,
{
    fn on_fire(&self, context: &T) {
        self(context)
    }
}

// ── Registry entries ──────────────────────────────────────────────────────────

/// A registered timer as seen from the notification side.
pub(crate) trait Fire: Send + Sync {
    /// Called on the OS notification thread.
    fn notify(self: Arc<Self>);

    /// Runs the user callback on the current thread.
    fn invoke(&self);
}

/// Callback, context and routing of one typed timer.
pub(crate) struct Slot<T> {
    key: Key,
    handler: Box<dyn OnFire<T>>,
    context: T,
    notify: Notify,
    fired: AtomicU64,
    /// Cleared when the timer is deleted; queued firings of a retired slot
    /// are skipped.
    alive: AtomicBool,
    /// Set while a firing waits in the dispatcher queue.
    pending: AtomicBool,
    coalesced: AtomicU64,
}

impl<T: Send + Sync + 'static> Slot<T> {
    pub(crate) fn new(key: Key, handler: Box<dyn OnFire<T>>, context: T, notify: Notify) -> Self {
        Self {
            key,
            handler,
            context,
            notify,
            fired: AtomicU64::new(0),
            alive: AtomicBool::new(true),
            pending: AtomicBool::new(false),
            coalesced: AtomicU64::new(0),
        }
    }

    pub(crate) fn context(&self) -> &T {
        &self.context
    }

    pub(crate) fn fire_count(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }

    pub(crate) fn coalesced_count(&self) -> u64 {
        self.coalesced.load(Ordering::Acquire)
    }

    /// Stops every later invocation, including firings already queued.
    pub(crate) fn retire(&self) {
        self.alive.store(false, Ordering::Release);
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl<T: Send + Sync + 'static> Fire for Slot<T> {
    fn notify(self: Arc<Self>) {
        if !self.is_alive() {
            return;
        }
        let dispatcher = match &self.notify {
            Notify::Thread => None,
            Notify::Dispatcher(d) => Some(d.clone()),
        };
        let Some(d) = dispatcher else {
            self.invoke();
            return;
        };

        // At most one queued job per timer; later firings fold into it.
        if self.pending.swap(true, Ordering::AcqRel) {
            let coalesced = self.coalesced.fetch_add(1, Ordering::AcqRel) + 1;
            trace!(key = self.key, coalesced, "firing coalesced into queued job");
            return;
        }
        d.submit(self);
    }

    fn invoke(&self) {
        // Firings arriving while the callback runs queue one new job.
        self.pending.store(false, Ordering::Release);
        if !self.is_alive() {
            trace!(key = self.key, "firing for a deleted timer skipped");
            return;
        }

        let count = self.fired.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(key = self.key, count, "timer fired");

        // Unwinding into the OS notification thread would abort the process.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handler.on_fire(&self.context)
        }));
        if outcome.is_err() {
            error!(key = self.key, count, "timer callback panicked");
        }
    }
}

// ── Trampoline ────────────────────────────────────────────────────────────────

/// Encodes a registry key as the `sival_ptr` handed to the kernel.
pub(crate) fn key_to_sival(key: Key) -> *mut c_void {
    key as *mut c_void
}

/// `SIGEV_THREAD` entry point for typed timers.
pub(crate) unsafe extern "C" fn trampoline(value: libc::sigval) {
    let key = value.sival_ptr as Key;
    match registry::lookup(key) {
        Some(entry) => entry.notify(),
        None => trace!(key, "firing for a deleted timer ignored"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn noop_unit(_: &()) {}

    fn slot<T: Send + Sync + 'static>(context: T, f: impl OnFire<T>) -> Arc<Slot<T>> {
        Arc::new(Slot::new(registry::next_key(), Box::new(f), context, Notify::Thread))
    }

    #[test]
    fn closures_implement_on_fire() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let s = slot(7_u32, move |c: &u32| sink.lock().unwrap().push(*c));

        s.invoke();
        s.invoke();

        assert_eq!(*seen.lock().unwrap(), vec![7, 7]);
        assert_eq!(s.fire_count(), 2);
    }

    #[test]
    fn panicking_callback_is_contained() {
        let s = slot((), |_: &()| {
            panic!("boom");
        });
        s.invoke();
        s.invoke();
        assert_eq!(s.fire_count(), 2);
    }

    #[test]
    fn trampoline_routes_by_key() {
        let s = slot(String::from("ctx"), |_: &String| {});
        registry::insert(s.key, s.clone());

        unsafe {
            trampoline(libc::sigval {
                sival_ptr: key_to_sival(s.key),
            })
        };
        assert_eq!(s.fire_count(), 1);

        registry::remove(s.key);
        unsafe {
            trampoline(libc::sigval {
                sival_ptr: key_to_sival(s.key),
            })
        };
        assert_eq!(s.fire_count(), 1, "deleted timers must not fire");
    }

    #[test]
    fn every_key_survives_the_sival_round_trip() {
        for key in [1, u32::MAX as Key, Key::MAX] {
            let value = libc::sigval {
                sival_ptr: key_to_sival(key),
            };
            assert_eq!(value.sival_ptr as Key, key);
        }
    }

    #[test]
    fn retired_slot_does_not_invoke() {
        let s = slot((), noop_unit);
        s.invoke();
        s.retire();
        s.invoke();
        s.clone().notify();
        assert_eq!(s.fire_count(), 1);
    }

    #[test]
    fn dispatched_firings_coalesce_while_queued() {
        let dispatcher = Dispatcher::spawn("coalesce-test").unwrap();
        let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
        let gate = Mutex::new(gate_rx);
        let s = Arc::new(Slot::new(
            registry::next_key(),
            Box::new(move |_: &()| {
                let _ = gate.lock().unwrap().recv();
            }),
            (),
            Notify::Dispatcher(dispatcher),
        ));

        // First job blocks the worker inside the callback.
        s.clone().notify();
        while s.fire_count() == 0 {
            std::thread::yield_now();
        }
        // One more job queues, the rest fold into it.
        for _ in 0..10 {
            s.clone().notify();
        }
        assert_eq!(s.coalesced_count(), 9);

        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();
        while s.fire_count() < 2 {
            std::thread::yield_now();
        }
        assert_eq!(s.fire_count(), 2);
    }

    #[test]
    fn struct_handlers_work_too() {
        struct Echo;
        impl OnFire<&'static str> for Echo {
            fn on_fire(&self, context: &&'static str) {
                assert_eq!(*context, "echo");
            }
        }

        let s = Arc::new(Slot::new(
            registry::next_key(),
            Box::new(Echo),
            "echo",
            Notify::Thread,
        ));
        s.invoke();
        assert_eq!(s.context(), &"echo");
    }
}
