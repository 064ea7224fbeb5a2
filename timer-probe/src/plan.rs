//! Timer plan loading.
//!
//! A plan names the timers the probe should create and how to arm them.
//! The expected YAML structure is:
//! ```yaml
//! notify: dispatcher      # or "thread" (default)
//! timers:
//!   heartbeat:
//!     clock: monotonic    # default: monotonic
//!     initial_ms: 100     # default: 100
//!     interval_ms: 250    # default: 0 (one-shot)
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use os_timer::{Clock, ParseClockError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlanFile {
    #[serde(default)]
    notify: NotifyMode,
    #[serde(default)]
    timers: HashMap<String, TimerEntry>,
}

/// Per-timer fields as they appear in the YAML file.  All optional.
#[derive(Debug, Deserialize)]
struct TimerEntry {
    clock: Option<String>,
    #[serde(default = "default_initial_ms")]
    initial_ms: u64,
    #[serde(default)]
    interval_ms: u64,
}

fn default_initial_ms() -> u64 {
    100
}

// ── Public data structures ────────────────────────────────────────────────────

/// Where the probe runs timer callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    #[default]
    Thread,
    Dispatcher,
}

/// One timer the probe creates and arms.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSpec {
    pub name: String,
    pub clock: Clock,
    pub initial: Duration,
    /// `Duration::ZERO` for one-shot.
    pub interval: Duration,
}

impl TimerSpec {
    /// The single timer used when no plan file is given, or the plan is empty.
    pub fn builtin(clock: Clock, initial_ms: u64, interval_ms: u64) -> Self {
        Self {
            name: String::from("default"),
            clock,
            initial: Duration::from_millis(initial_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    pub fn is_periodic(&self) -> bool {
        !self.interval.is_zero()
    }
}

#[derive(Debug, Error)]
#[error("timer '{timer}' has an invalid clock")]
pub struct PlanError {
    timer: String,
    #[source]
    source: ParseClockError,
}

/// A loaded set of timers, sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerPlan {
    pub notify: NotifyMode,
    pub timers: Vec<TimerSpec>,
}

impl TimerPlan {
    pub fn single(spec: TimerSpec, notify: NotifyMode) -> Self {
        Self {
            notify,
            timers: vec![spec],
        }
    }

    /// Parses the plan at `path`.
    ///
    /// An empty `timers` section falls back to one built-in timer with the
    /// default settings.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is malformed, or
    /// a timer names an unknown clock.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading timer plan from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open plan file: {}", path.display()))?;

        let file: PlanFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let mut timers = Vec::with_capacity(file.timers.len());
        for (name, entry) in file.timers {
            let clock = match entry.clock.as_deref() {
                Some(s) => s.parse::<Clock>().map_err(|source| PlanError {
                    timer: name.clone(),
                    source,
                })?,
                None => Clock::default(),
            };
            let spec = TimerSpec {
                name,
                clock,
                initial: Duration::from_millis(entry.initial_ms),
                interval: Duration::from_millis(entry.interval_ms),
            };
            debug!(
                "  Timer: {} | clock: {} | initial: {:?} | interval: {:?}",
                spec.name, spec.clock, spec.initial, spec.interval
            );
            timers.push(spec);
        }

        if timers.is_empty() {
            warn!("No timers found in plan file, using the built-in timer");
            timers.push(TimerSpec::builtin(Clock::default(), default_initial_ms(), 0));
        }

        // Sort by name for deterministic creation order
        timers.sort_by(|a, b| a.name.cmp(&b.name));

        info!("Loaded {} timer(s), notify = {:?}", timers.len(), file.notify);

        Ok(Self {
            notify: file.notify,
            timers,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_full_plan() {
        let yaml = r#"
notify: dispatcher
timers:
  heartbeat:
    clock: monotonic
    initial_ms: 50
    interval_ms: 250
  alarm:
    clock: realtime
    initial_ms: 1000
"#;
        let f = yaml_tempfile(yaml);
        let plan = TimerPlan::load_from_file(f.path()).unwrap();

        assert_eq!(plan.notify, NotifyMode::Dispatcher);
        assert_eq!(plan.timers.len(), 2);

        // sorted by name
        let alarm = &plan.timers[0];
        assert_eq!(alarm.name, "alarm");
        assert_eq!(alarm.clock, Clock::Realtime);
        assert_eq!(alarm.initial, Duration::from_secs(1));
        assert!(!alarm.is_periodic());

        let hb = &plan.timers[1];
        assert_eq!(hb.name, "heartbeat");
        assert_eq!(hb.initial, Duration::from_millis(50));
        assert_eq!(hb.interval, Duration::from_millis(250));
        assert!(hb.is_periodic());
    }

    #[test]
    fn shipped_example_plan_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../plans/heartbeat.yaml");
        let plan = TimerPlan::load_from_file(&path).unwrap();

        let names: Vec<_> = plan.timers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["heartbeat", "wall_once", "watchdog"]);
        assert_eq!(plan.timers[2].clock, Clock::Boottime);
    }

    #[test]
    fn optional_fields_use_defaults_when_absent() {
        let yaml = "timers:\n  bare: {}\n";
        let f = yaml_tempfile(yaml);
        let plan = TimerPlan::load_from_file(f.path()).unwrap();

        assert_eq!(plan.notify, NotifyMode::Thread);
        let t = &plan.timers[0];
        assert_eq!(t.clock, Clock::Monotonic);
        assert_eq!(t.initial, Duration::from_millis(100));
        assert_eq!(t.interval, Duration::ZERO);
    }

    #[test]
    fn empty_plan_uses_builtin_timer() {
        let f = yaml_tempfile("timers: {}\n");
        let plan = TimerPlan::load_from_file(f.path()).unwrap();

        assert_eq!(plan.timers.len(), 1);
        assert_eq!(plan.timers[0].name, "default");
    }

    #[test]
    fn numeric_clock_ids_are_accepted() {
        let f = yaml_tempfile("timers:\n  t:\n    clock: \"7\"\n");
        let plan = TimerPlan::load_from_file(f.path()).unwrap();
        assert_eq!(plan.timers[0].clock, Clock::from_raw(7));
    }

    #[test]
    fn unknown_clock_returns_error() {
        let f = yaml_tempfile("timers:\n  t:\n    clock: sundial\n");
        let err = TimerPlan::load_from_file(f.path()).unwrap_err();

        let plan_err = err.downcast_ref::<PlanError>().expect("PlanError");
        assert_eq!(plan_err.timer, "t");
        assert_eq!(plan_err.source.0, "sundial");
    }

    #[test]
    fn unknown_notify_mode_returns_error() {
        let f = yaml_tempfile("notify: carrier_pigeon\n");
        assert!(TimerPlan::load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = TimerPlan::load_from_file(Path::new("/nonexistent/path/plan.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(TimerPlan::load_from_file(f.path()).is_err());
    }
}
