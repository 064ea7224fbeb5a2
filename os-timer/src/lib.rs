/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! os-timer – POSIX timers that notify on a thread
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── clock       – clock selectors passed to timer_create
//! ├── error       – TimerError / CreateErrorKind
//! ├── timer       – TimerFactory, owned typed Timer<T>, LazyTimer<T>
//! ├── notify/     – Notify strategies, OnFire trait, dispatcher thread,
//! │                 key registry used by the SIGEV_THREAD trampoline
//! ├── raw         – untyped API with the null-id failure sentinel
//! └── sys         – libc calls and the SIGEV_THREAD descriptor
//! ```
//!
//! # Example
//! ```rust,no_run
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use os_timer::{Clock, TimerFactory};
//!
//! let hits = Arc::new(AtomicU32::new(0));
//! let timer = TimerFactory::new()
//!     .create(Clock::Monotonic, |hits: &Arc<AtomicU32>| {
//!         hits.fetch_add(1, Ordering::Relaxed);
//!     }, hits.clone())
//!     .unwrap();
//!
//! timer.schedule_once(Duration::from_millis(50)).unwrap();
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("os-timer relies on SIGEV_THREAD timers and currently supports Linux only");

pub mod clock;
pub mod error;
pub mod notify;
pub mod raw;
mod sys;
pub mod timer;

pub use clock::{Clock, ParseClockError};
pub use error::{CreateErrorKind, TimerError};
pub use notify::{Dispatcher, Notify, OnFire};
pub use timer::{LazyTimer, Timer, TimerFactory, TimerId};
