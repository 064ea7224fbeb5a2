/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

mod plan;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use os_timer::{Clock, Dispatcher, Notify, Timer, TimerFactory};

use plan::{NotifyMode, TimerPlan, TimerSpec};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Creates OS timers, arms them and logs every firing.
///
/// Example:
///   timer-probe -k monotonic -i 50 -r 200 -d 1500
///   timer-probe --plan plans/heartbeat.yaml --dispatcher
#[derive(Debug, Parser)]
#[command(
    name = "timer-probe",
    about = "Create, arm and observe POSIX timers",
    long_about = None,
)]
struct Cli {
    /// YAML timer plan.  Without it a single built-in timer is used.
    #[arg(short = 'c', long = "plan")]
    plan: Option<PathBuf>,

    /// Clock of the built-in timer (name or numeric id).
    #[arg(short = 'k', long = "clock", default_value = "monotonic")]
    clock: Clock,

    /// First expiry of the built-in timer, in milliseconds.
    #[arg(short = 'i', long = "initial-ms", default_value_t = 100)]
    initial_ms: u64,

    /// Repeat interval of the built-in timer, in milliseconds (0 = one-shot).
    #[arg(short = 'r', long = "interval-ms", default_value_t = 250)]
    interval_ms: u64,

    /// How long to observe before deleting every timer, in milliseconds.
    #[arg(short = 'd', long = "duration-ms", default_value_t = 2000)]
    duration_ms: u64,

    /// Run all callbacks on one dispatcher thread (overrides the plan).
    #[arg(short = 'D', long = "dispatcher", default_value_t = false)]
    dispatcher: bool,
}

// ── Probe context ─────────────────────────────────────────────────────────────

/// Context handed to every probe callback.
struct Probe {
    name: String,
    started: Instant,
    fired: AtomicU64,
}

fn on_fire(probe: &Probe) {
    let n = probe.fired.fetch_add(1, Ordering::Relaxed) + 1;
    info!(
        timer = %probe.name,
        n,
        elapsed_ms = probe.started.elapsed().as_millis() as u64,
        thread = ?thread::current().id(),
        "fired"
    );
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=os_timer=trace).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        plan        = ?cli.plan,
        clock       = %cli.clock,
        initial_ms  = cli.initial_ms,
        interval_ms = cli.interval_ms,
        duration_ms = cli.duration_ms,
        dispatcher  = cli.dispatcher,
        "Configuration"
    );

    if let Err(e) = run(&cli) {
        error!("timer-probe failed: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut plan = match &cli.plan {
        Some(path) => TimerPlan::load_from_file(path)?,
        None => {
            warn!("No plan file provided, using the built-in timer");
            TimerPlan::single(
                TimerSpec::builtin(cli.clock, cli.initial_ms, cli.interval_ms),
                NotifyMode::Thread,
            )
        }
    };
    if cli.dispatcher {
        plan.notify = NotifyMode::Dispatcher;
    }

    let notify = match plan.notify {
        NotifyMode::Thread => Notify::Thread,
        NotifyMode::Dispatcher => Notify::Dispatcher(Dispatcher::spawn("timer-probe-dispatch")?),
    };
    let factory = TimerFactory::with_notify(notify);

    let started = Instant::now();
    let mut timers: Vec<Timer<Probe>> = Vec::with_capacity(plan.timers.len());

    for spec in &plan.timers {
        let probe = Probe {
            name: spec.name.clone(),
            started,
            fired: AtomicU64::new(0),
        };
        let timer = factory
            .create(spec.clock, on_fire, probe)
            .with_context(|| format!("Cannot create timer '{}'", spec.name))?;

        timer
            .schedule_interval(spec.initial, spec.interval)
            .with_context(|| format!("Cannot arm timer '{}'", spec.name))?;

        info!(
            timer = %spec.name,
            id = %timer.id(),
            clock = %spec.clock,
            periodic = spec.is_periodic(),
            "armed"
        );
        timers.push(timer);
    }

    thread::sleep(Duration::from_millis(cli.duration_ms));

    // ── Summary ───────────────────────────────────────────────────────────────
    info!("Observed {} timer(s) for {}ms:", timers.len(), cli.duration_ms);
    for timer in timers {
        let probe = timer.context();
        let overruns = match overruns_of(&timer) {
            Some(n) => n.to_string(),
            None => String::from("n/a"),
        };
        info!(
            "  [{name}]  fired={fired}  overruns={overruns}  coalesced={coalesced}",
            name = probe.name,
            fired = probe.fired.load(Ordering::Relaxed),
            coalesced = timer.coalesced_count(),
        );
        let name = probe.name.clone();
        timer
            .delete()
            .with_context(|| format!("Cannot delete timer '{}'", name))?;
    }

    Ok(())
}

/// Overrun count for the summary, `None` if the kernel query failed.
fn overruns_of(timer: &Timer<Probe>) -> Option<u32> {
    match timer.overrun_count() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(timer = %timer.context().name, error = %e, "cannot read overrun count");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["timer-probe"]);
        assert_eq!(cli.clock, Clock::Monotonic);
        assert_eq!(cli.initial_ms, 100);
        assert_eq!(cli.interval_ms, 250);
        assert_eq!(cli.duration_ms, 2000);
        assert!(!cli.dispatcher);
        assert!(cli.plan.is_none());
    }

    #[test]
    fn cli_parses_clock_names() {
        let cli = Cli::parse_from(["timer-probe", "-k", "boottime", "-D"]);
        assert_eq!(cli.clock, Clock::Boottime);
        assert!(cli.dispatcher);
    }

    #[test]
    fn cli_rejects_unknown_clock() {
        assert!(Cli::try_parse_from(["timer-probe", "--clock", "sundial"]).is_err());
    }

    #[test]
    fn builtin_run_fires_and_cleans_up() {
        let cli = Cli::parse_from(["timer-probe", "-i", "10", "-r", "20", "-d", "100"]);
        run(&cli).unwrap();
    }

    #[test]
    fn overruns_of_an_idle_timer_is_zero() {
        let timer = TimerFactory::new()
            .create(
                Clock::Monotonic,
                on_fire,
                Probe {
                    name: String::from("idle"),
                    started: Instant::now(),
                    fired: AtomicU64::new(0),
                },
            )
            .unwrap();
        assert_eq!(overruns_of(&timer), Some(0));
    }

    #[test]
    fn invalid_clock_fails_the_run() {
        let cli = Cli::parse_from(["timer-probe", "-k", "4242", "-d", "0"]);
        let err = run(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("Cannot create timer 'default'"));
    }
}
