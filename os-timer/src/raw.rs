/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Untyped timer API: an `extern "C"` callback, an opaque context pointer
//! and a null id on failure.
//!
//! Prefer [`TimerFactory`](crate::TimerFactory).  This module exists for
//! callers that already hold a C callback, or that need the id to cross an
//! FFI boundary.  Nothing here owns the timer: the caller must eventually
//! pass a non-null id to [`delete_raw`].

use std::ffi::c_void;
use std::io;
use std::ptr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::CreateErrorKind;
use crate::sys;

pub use crate::sys::RawCallback;

/// Creates a disarmed timer that calls `callback(context)` on an OS-spawned
/// thread every time it fires.
///
/// Returns a null id if the OS refused.  The errno is not returned but is
/// logged at `warn` together with its classification.
///
/// # Safety
/// `callback` must be safe to call with `context` from any thread for as
/// long as the timer exists.  `context` is never dereferenced here and may be
/// null.
pub unsafe fn create_raw(clock: Clock, callback: RawCallback, context: *mut c_void) -> libc::timer_t {
    match sys::create_thread_timer(clock.as_raw(), callback, context) {
        Ok(id) => {
            debug!(%clock, id = ?id, "raw timer created");
            id
        }
        Err(err) => {
            warn!(
                %clock,
                cause = %CreateErrorKind::from_io(&err),
                error = %err,
                "timer_create failed"
            );
            ptr::null_mut()
        }
    }
}

/// Arms `id`: first expiry after `initial`, then every `interval` (zero for
/// one-shot).  A zero `initial` disarms.
///
/// # Safety
/// `id` must be a live timer from [`create_raw`].
pub unsafe fn arm_raw(id: libc::timer_t, initial: Duration, interval: Duration) -> io::Result<()> {
    sys::set_time(id, initial, interval)
}

/// Disarms `id` without deleting it.
///
/// # Safety
/// `id` must be a live timer from [`create_raw`].
pub unsafe fn disarm_raw(id: libc::timer_t) -> io::Result<()> {
    sys::set_time(id, Duration::ZERO, Duration::ZERO)
}

/// Deletes `id`.  Notifications already in flight may still reach the
/// callback after this returns.
///
/// # Safety
/// `id` must be a live timer from [`create_raw`] and is invalid afterwards.
pub unsafe fn delete_raw(id: libc::timer_t) -> io::Result<()> {
    sys::delete(id)
}
