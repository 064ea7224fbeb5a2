/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Typed timers: [`TimerFactory`] creates them, [`Timer`] owns them.
//!
//! # Lifecycle
//! ```text
//! create ──► disarmed ──schedule_*──► armed ──expiry──► callback (off-thread)
//!               ▲                       │
//!               └──────── cancel ───────┘
//! delete / drop ──► slot retired, timer_delete, registry entry removed
//! ```
//!
//! [`LazyTimer`] holds a timer that is created later, at most once, so it can
//! live in a `static`.
//!
//! A creation failure is a [`TimerError::Create`] with the classified errno.
//! Nothing is allocated in that case.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::TimerError;
use crate::notify::{self, registry, Notify, OnFire, Slot};
use crate::sys;

// ── TimerId ───────────────────────────────────────────────────────────────────

/// Opaque OS timer id.
///
/// On Linux this wraps `timer_t`.  It carries no sentinel meaning: any value
/// returned inside an `Ok` is a live timer, including a null one.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(libc::timer_t);

// The id is an integer token, never dereferenced on this side.
unsafe impl Send for TimerId {}
unsafe impl Sync for TimerId {}

impl TimerId {
    pub fn as_raw(self) -> libc::timer_t {
        self.0
    }
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({:#x})", self.0 as usize)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0 as usize)
    }
}

// ── TimerFactory ──────────────────────────────────────────────────────────────

/// Creates OS timers that notify through a thread.
///
/// # Example
/// ```rust,no_run
/// use std::time::Duration;
/// use os_timer::{Clock, TimerFactory};
///
/// let factory = TimerFactory::new();
/// let timer = factory
///     .create(Clock::Monotonic, |name: &String| println!("{name} fired"), "tick".to_string())
///     .unwrap();
/// timer.schedule_interval(Duration::from_millis(10), Duration::from_millis(100)).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimerFactory {
    notify: Notify,
}

impl TimerFactory {
    /// Callbacks run on the thread the OS spawns for each firing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks run where `notify` says.
    pub fn with_notify(notify: Notify) -> Self {
        Self { notify }
    }

    /// The strategy every timer from this factory uses.
    pub fn notify(&self) -> &Notify {
        &self.notify
    }

    /// Asks the OS for one disarmed timer on `clock` that calls `callback`
    /// with `context` each time it fires.
    ///
    /// Runs synchronously and does not arm the timer.  The callback never
    /// runs on the calling thread.
    ///
    /// # Errors
    /// [`TimerError::Create`] with the reason `timer_create` gave.  No timer
    /// exists afterwards.
    pub fn create<T, F>(&self, clock: Clock, callback: F, context: T) -> Result<Timer<T>, TimerError>
    where
        T: Send + Sync + 'static,
        F: OnFire<T>,
    {
        let key = registry::next_key();
        let slot = Arc::new(Slot::new(key, Box::new(callback), context, self.notify.clone()));

        // Registered first: the entry must exist before the kernel can fire.
        registry::insert(key, slot.clone());

        let created = unsafe {
            sys::create_thread_timer(clock.as_raw(), notify::trampoline, notify::key_to_sival(key))
        };

        match created {
            Ok(raw) => {
                let id = TimerId(raw);
                debug!(%clock, %id, key, "timer created");
                Ok(Timer {
                    id,
                    key,
                    clock,
                    slot,
                    deleted: false,
                })
            }
            Err(source) => {
                registry::remove(key);
                let err = TimerError::create(clock, source);
                warn!(%clock, error = %err, cause = ?err.create_kind(), "timer_create failed");
                Err(err)
            }
        }
    }
}

// ── Timer ─────────────────────────────────────────────────────────────────────

/// An owned OS timer with a typed context.
///
/// Deleted on drop.  All methods take `&self`, so the timer can be shared
/// across threads; only [`delete`](Self::delete) consumes it.
pub struct Timer<T: Send + Sync + 'static> {
    id: TimerId,
    key: registry::Key,
    clock: Clock,
    slot: Arc<Slot<T>>,
    deleted: bool,
}

impl<T: Send + Sync + 'static> Timer<T> {
    /// The id `timer_create` returned.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// The clock the timer was created on.
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// The context handed to every callback invocation.
    pub fn context(&self) -> &T {
        self.slot.context()
    }

    /// How many times the callback has been entered so far.
    pub fn fire_count(&self) -> u64 {
        self.slot.fire_count()
    }

    /// Dispatcher firings folded into an already queued one.  Always zero
    /// with [`Notify::Thread`].
    pub fn coalesced_count(&self) -> u64 {
        self.slot.coalesced_count()
    }

    /// Arms the timer to fire once after `timeout`.
    ///
    /// Replaces any earlier schedule.  A zero `timeout` fires as soon as
    /// possible instead of disarming.
    pub fn schedule_once(&self, timeout: Duration) -> Result<(), TimerError> {
        self.schedule_interval(timeout, Duration::ZERO)
    }

    /// Arms the timer to fire after `timeout` and then every `interval`.
    ///
    /// A zero `interval` makes it one-shot.  Replaces any earlier schedule.
    pub fn schedule_interval(&self, timeout: Duration, interval: Duration) -> Result<(), TimerError> {
        let initial = if timeout.is_zero() {
            Duration::from_nanos(1)
        } else {
            timeout
        };

        unsafe { sys::set_time(self.id.0, initial, interval) }.map_err(TimerError::Arm)?;

        debug!(id = %self.id, ?initial, ?interval, "timer armed");
        Ok(())
    }

    /// Disarms the timer.  Expiries that have not been delivered are dropped.
    pub fn cancel(&self) -> Result<(), TimerError> {
        unsafe { sys::set_time(self.id.0, Duration::ZERO, Duration::ZERO) }.map_err(TimerError::Arm)?;
        debug!(id = %self.id, "timer disarmed");
        Ok(())
    }

    /// Time until the next expiry, or `None` while disarmed.
    pub fn remaining(&self) -> Result<Option<Duration>, TimerError> {
        let (value, _) = unsafe { sys::get_time(self.id.0) }.map_err(TimerError::Query)?;
        Ok((!value.is_zero()).then_some(value))
    }

    /// The repeat interval, `Duration::ZERO` for a one-shot or disarmed timer.
    pub fn interval(&self) -> Result<Duration, TimerError> {
        let (_, interval) = unsafe { sys::get_time(self.id.0) }.map_err(TimerError::Query)?;
        Ok(interval)
    }

    pub fn is_scheduled(&self) -> Result<bool, TimerError> {
        Ok(self.remaining()?.is_some())
    }

    /// Extra expiries that elapsed before the last notification was
    /// delivered.
    pub fn overrun_count(&self) -> Result<u32, TimerError> {
        unsafe { sys::overrun(self.id.0) }.map_err(TimerError::Query)
    }

    /// Deletes the kernel timer and reports whether `timer_delete` succeeded.
    ///
    /// Dropping the timer does the same but can only log the error.
    pub fn delete(mut self) -> Result<(), TimerError> {
        let result = self.release();
        self.deleted = true;
        result
    }

    fn release(&self) -> Result<(), TimerError> {
        // Firings already queued on a dispatcher must not reach the callback.
        self.slot.retire();

        // timer_delete disarms as part of deletion.
        let deleted = unsafe { sys::delete(self.id.0) }.map_err(TimerError::Delete);

        // A callback already running finishes; it holds its own reference.
        registry::remove(self.key);

        match &deleted {
            Ok(()) => debug!(id = %self.id, fired = self.fire_count(), "timer deleted"),
            Err(err) => warn!(id = %self.id, error = %err, "timer_delete failed"),
        }
        deleted
    }
}

impl<T: Send + Sync + 'static> Drop for Timer<T> {
    fn drop(&mut self) {
        if !self.deleted {
            let _ = self.release();
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for Timer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("clock", &self.clock)
            .field("fired", &self.fire_count())
            .finish()
    }
}

// ── LazyTimer ─────────────────────────────────────────────────────────────────

/// A timer slot that starts empty and is filled once.
///
/// # Example
/// ```rust,no_run
/// use std::time::Duration;
/// use os_timer::{Clock, LazyTimer, TimerFactory};
///
/// static WATCHDOG: LazyTimer<&'static str> = LazyTimer::new();
///
/// WATCHDOG
///     .init(&TimerFactory::new(), Clock::Monotonic, |n: &&str| println!("{n}"), "watchdog")
///     .unwrap();
/// if let Some(timer) = WATCHDOG.get() {
///     timer.schedule_once(Duration::from_secs(1)).unwrap();
/// }
/// ```
pub struct LazyTimer<T: Send + Sync + 'static> {
    cell: OnceLock<Timer<T>>,
}

impl<T: Send + Sync + 'static> LazyTimer<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Creates the timer unless one is already held.
    ///
    /// Returns `Ok(true)` if this call installed the timer and `Ok(false)` if
    /// another call got there first.  A timer created by a losing racer is
    /// deleted before returning.
    ///
    /// # Errors
    /// The [`TimerError::Create`] from [`TimerFactory::create`]; the slot
    /// stays empty and a later `init` may retry.
    pub fn init<F>(
        &self,
        factory: &TimerFactory,
        clock: Clock,
        callback: F,
        context: T,
    ) -> Result<bool, TimerError>
    where
        F: OnFire<T>,
    {
        if self.cell.get().is_some() {
            return Ok(false);
        }

        let timer = factory.create(clock, callback, context)?;
        match self.cell.set(timer) {
            Ok(()) => Ok(true),
            Err(duplicate) => {
                debug!(id = %duplicate.id, "lazy timer already set, deleting duplicate");
                duplicate.delete()?;
                Ok(false)
            }
        }
    }

    pub fn get(&self) -> Option<&Timer<T>> {
        self.cell.get()
    }

    pub fn is_init(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: Send + Sync + 'static> Default for LazyTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for LazyTimer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazyTimer").field(&self.cell.get()).finish()
    }
}
