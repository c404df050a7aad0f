//! The monitoring loop.
//!
//! Each cycle polls every source, dispatches qualifying events, and
//! sleeps for `check_interval`. A panicking cycle is contained and
//! retried after a backoff so a single bad poll cannot take the
//! process down. Dedup state is swept every 100 cycles or whenever
//! `cleanup_interval` has elapsed, whichever comes first.
//!
//! Shutdown is latched: one listener task lives for the whole run and
//! records Ctrl+C in a watch channel, so a signal raised while a cycle
//! is in flight still stops the loop once that cycle completes.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::notify;
use crate::runtime::App;

const CLEANUP_EVERY_CYCLES: u64 = 100;
const PANIC_BACKOFF: Duration = Duration::from_secs(10);

pub async fn run(app: App) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C");
            let _ = shutdown_tx.send(true);
        }
    });
    run_until_shutdown(app, shutdown_rx).await;
}

async fn run_until_shutdown(app: App, mut shutdown: watch::Receiver<bool>) {
    let check_interval = Duration::from_secs(app.config.check_interval);
    let mut cleanup = CleanupSchedule::new(Duration::from_secs(app.config.cleanup_interval));

    loop {
        if AssertUnwindSafe(run_cycle(&app)).catch_unwind().await.is_err() {
            error!("monitoring cycle panicked, backing off before retrying");
            if wait_or_shutdown(&mut shutdown, PANIC_BACKOFF).await {
                break;
            }
            continue;
        }

        // Honour a signal that arrived mid-cycle before sleeping.
        if *shutdown.borrow() {
            break;
        }

        if cleanup.due(Instant::now()) {
            let remaining = app.scheduler.cleanup(
                Utc::now(),
                app.config.deduplication_window(),
                app.config.max_memory_entries,
            );
            debug!(remaining, "dedup tables swept");
        }

        if wait_or_shutdown(&mut shutdown, check_interval).await {
            break;
        }
    }

    info!("Shutting down, closing SSH connections");
    app.pool.close_all();
}

async fn run_cycle(app: &App) {
    let events = app.scheduler.run_cycle().await;
    if events.is_empty() {
        return;
    }
    info!(count = events.len(), "errors qualified for notification");
    notify::dispatch(&app.notifiers, &events).await;
}

/// Sleep for `duration` unless shutdown is (or becomes) pending.
/// Returns true on shutdown. A dropped sender also counts as shutdown.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.changed() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Dedup sweep cadence: every 100 cycles or `interval` elapsed,
/// whichever comes first. Both triggers reset together so a sweep is
/// never immediately followed by another.
struct CleanupSchedule {
    interval: Duration,
    cycles: u64,
    last: Instant,
}

impl CleanupSchedule {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            cycles: 0,
            last: Instant::now(),
        }
    }

    /// Called once per completed cycle.
    fn due(&mut self, now: Instant) -> bool {
        self.cycles += 1;
        if self.cycles >= CLEANUP_EVERY_CYCLES
            || now.duration_since(self.last) >= self.interval
        {
            self.cycles = 0;
            self.last = now;
            return true;
        }
        false
    }
}
