/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Clock selectors accepted by `timer_create`.
//!
//! The selector is handed to the kernel unchanged.  No validation happens on
//! this side; a clock the kernel does not support for timers is reported by
//! [`TimerFactory::create`](crate::TimerFactory::create) as
//! [`CreateErrorKind::InvalidClock`](crate::CreateErrorKind::InvalidClock).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Which system clock a timer measures time against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Clock {
    /// `CLOCK_MONOTONIC` – never jumps, does not count suspend.
    #[default]
    Monotonic,
    /// `CLOCK_REALTIME` – wall-clock time, follows `settimeofday`.
    Realtime,
    /// `CLOCK_BOOTTIME` – monotonic, includes time spent suspended.
    Boottime,
    /// `CLOCK_REALTIME_ALARM` – like `Realtime` but wakes a suspended system.
    /// Needs `CAP_WAKE_ALARM`.
    RealtimeAlarm,
    /// `CLOCK_BOOTTIME_ALARM` – like `Boottime` but wakes a suspended system.
    /// Needs `CAP_WAKE_ALARM`.
    BoottimeAlarm,
    /// `CLOCK_TAI` – International Atomic Time.
    Tai,
    /// `CLOCK_PROCESS_CPUTIME_ID` – CPU time consumed by this process.
    ProcessCpuTime,
    /// `CLOCK_THREAD_CPUTIME_ID` – CPU time consumed by the calling thread.
    ThreadCpuTime,
    /// Any other clock id, passed through as-is.
    Raw(libc::clockid_t),
}

impl Clock {
    /// The `clockid_t` handed to the kernel.
    pub fn as_raw(self) -> libc::clockid_t {
        match self {
            Clock::Monotonic => libc::CLOCK_MONOTONIC,
            Clock::Realtime => libc::CLOCK_REALTIME,
            Clock::Boottime => libc::CLOCK_BOOTTIME,
            Clock::RealtimeAlarm => libc::CLOCK_REALTIME_ALARM,
            Clock::BoottimeAlarm => libc::CLOCK_BOOTTIME_ALARM,
            Clock::Tai => libc::CLOCK_TAI,
            Clock::ProcessCpuTime => libc::CLOCK_PROCESS_CPUTIME_ID,
            Clock::ThreadCpuTime => libc::CLOCK_THREAD_CPUTIME_ID,
            Clock::Raw(id) => id,
        }
    }

    /// Maps a raw id back onto a named variant where one exists.
    pub fn from_raw(id: libc::clockid_t) -> Self {
        match id {
            libc::CLOCK_MONOTONIC => Clock::Monotonic,
            libc::CLOCK_REALTIME => Clock::Realtime,
            libc::CLOCK_BOOTTIME => Clock::Boottime,
            libc::CLOCK_REALTIME_ALARM => Clock::RealtimeAlarm,
            libc::CLOCK_BOOTTIME_ALARM => Clock::BoottimeAlarm,
            libc::CLOCK_TAI => Clock::Tai,
            libc::CLOCK_PROCESS_CPUTIME_ID => Clock::ProcessCpuTime,
            libc::CLOCK_THREAD_CPUTIME_ID => Clock::ThreadCpuTime,
            other => Clock::Raw(other),
        }
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Clock::Monotonic => Some("monotonic"),
            Clock::Realtime => Some("realtime"),
            Clock::Boottime => Some("boottime"),
            Clock::RealtimeAlarm => Some("realtime_alarm"),
            Clock::BoottimeAlarm => Some("boottime_alarm"),
            Clock::Tai => Some("tai"),
            Clock::ProcessCpuTime => Some("process_cputime"),
            Clock::ThreadCpuTime => Some("thread_cputime"),
            Clock::Raw(_) => None,
        }
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "clock#{}", self.as_raw()),
        }
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// A clock name that is neither a known selector nor an integer id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown clock '{0}' (valid: monotonic, realtime, boottime, realtime_alarm, boottime_alarm, tai, process_cputime, thread_cputime, or a numeric clock id)")]
pub struct ParseClockError(pub String);

impl FromStr for Clock {
    type Err = ParseClockError;

    /// Accepts the lowercase names printed by `Display` (case-insensitive,
    /// `-` and `_` interchangeable) or a decimal clock id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let clock = match normalized.as_str() {
            "monotonic" => Clock::Monotonic,
            "realtime" => Clock::Realtime,
            "boottime" => Clock::Boottime,
            "realtime_alarm" => Clock::RealtimeAlarm,
            "boottime_alarm" => Clock::BoottimeAlarm,
            "tai" => Clock::Tai,
            "process_cputime" => Clock::ProcessCpuTime,
            "thread_cputime" => Clock::ThreadCpuTime,
            other => other
                .parse::<libc::clockid_t>()
                .map(Clock::from_raw)
                .map_err(|_| ParseClockError(s.to_string()))?,
        };
        Ok(clock)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_monotonic() {
        assert_eq!(Clock::default(), Clock::Monotonic);
        assert_eq!(Clock::default().as_raw(), libc::CLOCK_MONOTONIC);
    }

    #[test]
    fn named_clocks_round_trip_through_display() {
        for clock in [
            Clock::Monotonic,
            Clock::Realtime,
            Clock::Boottime,
            Clock::RealtimeAlarm,
            Clock::BoottimeAlarm,
            Clock::Tai,
            Clock::ProcessCpuTime,
            Clock::ThreadCpuTime,
        ] {
            let parsed: Clock = clock.to_string().parse().unwrap();
            assert_eq!(parsed, clock);
        }
    }

    #[test]
    fn parse_is_case_and_dash_insensitive() {
        assert_eq!("REALTIME".parse::<Clock>().unwrap(), Clock::Realtime);
        assert_eq!(
            "boottime-alarm".parse::<Clock>().unwrap(),
            Clock::BoottimeAlarm
        );
        assert_eq!(" tai ".parse::<Clock>().unwrap(), Clock::Tai);
    }

    #[test]
    fn numeric_ids_map_to_named_variants_when_known() {
        let id = libc::CLOCK_REALTIME.to_string();
        assert_eq!(id.parse::<Clock>().unwrap(), Clock::Realtime);
        assert_eq!("4242".parse::<Clock>().unwrap(), Clock::Raw(4242));
    }

    #[test]
    fn raw_clock_displays_its_id() {
        assert_eq!(Clock::Raw(4242).to_string(), "clock#4242");
    }

    #[test]
    fn garbage_is_rejected() {
        let err = "sundial".parse::<Clock>().unwrap_err();
        assert_eq!(err, ParseClockError("sundial".to_string()));
        assert!(err.to_string().contains("sundial"));
    }
}
