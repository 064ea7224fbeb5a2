/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Thin syscall layer over the POSIX timer API.
//!
//! Everything here maps one-to-one onto a libc call and returns
//! `io::Result`; classification and logging happen in the callers.

use std::ffi::c_void;
use std::io;
use std::mem;
use std::ptr;
use std::time::Duration;

/// Notification function invoked by the OS on its notification thread.
pub type RawCallback = unsafe extern "C" fn(libc::sigval);

// ── SIGEV_THREAD descriptor ───────────────────────────────────────────────────

/// Size of `struct sigevent` in both glibc and musl.
const SIGEV_MAX_SIZE: usize = 64;

const SIGEV_PAD: usize = SIGEV_MAX_SIZE
    - mem::size_of::<libc::sigval>()
    - 2 * mem::size_of::<libc::c_int>()
    - 2 * mem::size_of::<usize>();

/// `struct sigevent` with the `_sigev_thread` arm of its union spelled out.
///
/// `libc::sigevent` only exposes `sigev_notify_thread_id` from that union, so
/// the function and attribute fields needed for `SIGEV_THREAD` are declared
/// here with the same layout.
#[repr(C)]
struct ThreadSigevent {
    sigev_value: libc::sigval,
    sigev_signo: libc::c_int,
    sigev_notify: libc::c_int,
    sigev_notify_function: Option<RawCallback>,
    sigev_notify_attributes: *mut libc::pthread_attr_t,
    _pad: [u8; SIGEV_PAD],
}

const _: () = assert!(mem::size_of::<ThreadSigevent>() == mem::size_of::<libc::sigevent>());

// ── Calls ─────────────────────────────────────────────────────────────────────

/// `timer_create` with `SIGEV_THREAD` notification.
///
/// The timer is created disarmed.  When it later fires, the OS calls
/// `callback` on a thread of its own with `context` in `sival_ptr`.
///
/// # Safety
/// `callback` must stay callable with `context` for as long as the timer
/// exists.
pub unsafe fn create_thread_timer(
    clock: libc::clockid_t,
    callback: RawCallback,
    context: *mut c_void,
) -> io::Result<libc::timer_t> {
    let mut event = ThreadSigevent {
        sigev_value: libc::sigval { sival_ptr: context },
        sigev_signo: 0,
        sigev_notify: libc::SIGEV_THREAD,
        sigev_notify_function: Some(callback),
        sigev_notify_attributes: ptr::null_mut(),
        _pad: [0; SIGEV_PAD],
    };
    let mut id: libc::timer_t = ptr::null_mut();

    let rc = libc::timer_create(
        clock,
        (&mut event as *mut ThreadSigevent).cast::<libc::sigevent>(),
        &mut id,
    );
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(id)
}

/// `timer_settime` with a relative initial expiry and repeat interval.
///
/// A zero `initial` disarms the timer; a zero `interval` makes it one-shot.
///
/// # Safety
/// `id` must be a live timer.
pub unsafe fn set_time(id: libc::timer_t, initial: Duration, interval: Duration) -> io::Result<()> {
    let mut spec: libc::itimerspec = mem::zeroed();
    spec.it_value = to_timespec(initial);
    spec.it_interval = to_timespec(interval);

    if libc::timer_settime(id, 0, &spec, ptr::null_mut()) == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `timer_gettime`: time until the next expiry and the repeat interval.
///
/// # Safety
/// `id` must be a live timer.
pub unsafe fn get_time(id: libc::timer_t) -> io::Result<(Duration, Duration)> {
    let mut spec: libc::itimerspec = mem::zeroed();
    if libc::timer_gettime(id, &mut spec) == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok((from_timespec(&spec.it_value), from_timespec(&spec.it_interval)))
}

/// `timer_getoverrun`.
///
/// # Safety
/// `id` must be a live timer.
pub unsafe fn overrun(id: libc::timer_t) -> io::Result<u32> {
    let rc = libc::timer_getoverrun(id);
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc as u32)
}

/// `timer_delete`.
///
/// # Safety
/// `id` must be a live timer and must not be used afterwards.
pub unsafe fn delete(id: libc::timer_t) -> io::Result<()> {
    if libc::timer_delete(id) == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// ── timespec conversion ───────────────────────────────────────────────────────

/// Saturates at `time_t::MAX` seconds.
fn to_timespec(d: Duration) -> libc::timespec {
    // zeroed() rather than a literal: some targets carry private padding.
    let mut ts: libc::timespec = unsafe { mem::zeroed() };
    ts.tv_sec = d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t;
    ts.tv_nsec = d.subsec_nanos() as _;
    ts
}

fn from_timespec(ts: &libc::timespec) -> Duration {
    let secs = ts.tv_sec.max(0) as u64;
    let nanos = ts.tv_nsec.clamp(0, 999_999_999) as u32;
    Duration::new(secs, nanos)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
