/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for timer creation and control.
//!
//! `timer_create` reports a single `-1` and leaves the reason in `errno`.
//! [`CreateErrorKind`] classifies that reason, and [`TimerError`] keeps the
//! original [`io::Error`] as its source, so nothing the kernel said is lost
//! on the way to the caller.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::clock::Clock;

// ── Creation failure causes ───────────────────────────────────────────────────

/// Why `timer_create` refused to create a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateErrorKind {
    /// The clock id is unknown, or the kernel cannot drive timers from it
    /// (`EINVAL`, `ENOTSUP`).
    InvalidClock,

    /// The per-process timer limit or kernel memory was exhausted
    /// (`EAGAIN`, `ENOMEM`).
    ResourceExhausted,

    /// The caller lacks the capability the clock needs, e.g.
    /// `CAP_WAKE_ALARM` for the alarm clocks (`EPERM`).
    PermissionDenied,

    /// Any other errno.
    Unknown,
}

impl CreateErrorKind {
    /// Classifies an error returned by `timer_create`.
    pub fn from_io(err: &io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EINVAL) | Some(libc::ENOTSUP) => CreateErrorKind::InvalidClock,
            Some(libc::EAGAIN) | Some(libc::ENOMEM) => CreateErrorKind::ResourceExhausted,
            Some(libc::EPERM) => CreateErrorKind::PermissionDenied,
            _ => CreateErrorKind::Unknown,
        }
    }
}

impl fmt::Display for CreateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateErrorKind::InvalidClock => {
                write!(f, "clock is not usable for timers")
            }
            CreateErrorKind::ResourceExhausted => {
                write!(f, "timer resources exhausted")
            }
            CreateErrorKind::PermissionDenied => {
                write!(f, "permission denied for this clock")
            }
            CreateErrorKind::Unknown => write!(f, "unclassified failure"),
        }
    }
}

// ── Top-level errors ──────────────────────────────────────────────────────────

/// Every failure the timer API can report.
///
/// Each variant keeps the OS error as its `source()` so callers that log with
/// `{:#}` or walk the chain see the errno text.
#[derive(Debug, Error)]
pub enum TimerError {
    /// `timer_create` failed.  No kernel timer exists and nothing needs
    /// cleaning up.
    #[error("failed to create timer on {clock}: {kind}")]
    Create {
        clock: Clock,
        kind: CreateErrorKind,
        #[source]
        source: io::Error,
    },

    /// `timer_settime` failed while arming or disarming.
    #[error("failed to arm timer")]
    Arm(#[source] io::Error),

    /// `timer_gettime` or `timer_getoverrun` failed.
    #[error("failed to query timer")]
    Query(#[source] io::Error),

    /// `timer_delete` failed.
    #[error("failed to delete timer")]
    Delete(#[source] io::Error),

    /// The dispatcher worker thread could not be spawned.
    #[error("failed to spawn dispatcher thread '{name}'")]
    Dispatcher {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl TimerError {
    /// Wraps a `timer_create` failure, classifying its errno.
    pub(crate) fn create(clock: Clock, source: io::Error) -> Self {
        TimerError::Create {
            clock,
            kind: CreateErrorKind::from_io(&source),
            source,
        }
    }

    /// The classified cause when this is a creation failure.
    pub fn create_kind(&self) -> Option<CreateErrorKind> {
        match self {
            TimerError::Create { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn errno_classification() {
        let kind = |errno| CreateErrorKind::from_io(&io::Error::from_raw_os_error(errno));

        assert_eq!(kind(libc::EINVAL), CreateErrorKind::InvalidClock);
        assert_eq!(kind(libc::ENOTSUP), CreateErrorKind::InvalidClock);
        assert_eq!(kind(libc::EAGAIN), CreateErrorKind::ResourceExhausted);
        assert_eq!(kind(libc::ENOMEM), CreateErrorKind::ResourceExhausted);
        assert_eq!(kind(libc::EPERM), CreateErrorKind::PermissionDenied);
        assert_eq!(kind(libc::EIO), CreateErrorKind::Unknown);
    }

    #[test]
    fn non_os_error_is_unknown() {
        let err = io::Error::new(io::ErrorKind::Other, "synthetic");
        assert_eq!(CreateErrorKind::from_io(&err), CreateErrorKind::Unknown);
    }

    #[test]
    fn create_error_keeps_source_and_kind() {
        let err = TimerError::create(Clock::Raw(4242), io::Error::from_raw_os_error(libc::EINVAL));

        assert_eq!(err.create_kind(), Some(CreateErrorKind::InvalidClock));
        assert_eq!(
            err.to_string(),
            "failed to create timer on clock#4242: clock is not usable for timers"
        );
        let source = err.source().expect("source must be kept");
        assert_eq!(
            source
                .downcast_ref::<io::Error>()
                .and_then(io::Error::raw_os_error),
            Some(libc::EINVAL)
        );
    }

    #[test]
    fn non_create_errors_have_no_create_kind() {
        let err = TimerError::Delete(io::Error::from_raw_os_error(libc::EINVAL));
        assert_eq!(err.create_kind(), None);
    }
}
