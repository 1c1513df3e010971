//! Tick clock for trivia lobby timers.
//!
//! A tick is one unit of wall-clock wait (one second by default). The lobby
//! counts countdowns, guess windows, and reveal pauses in ticks. The clock
//! is armed when a timed phase begins and stopped when the lobby goes idle.
//!
//! # Integration
//!
//! The clock sits inside the lobby actor's `tokio::select!` loop next to
//! the command channel. While stopped, [`TickClock::wait_for_tick`] pends
//! forever, so the select only wakes for commands:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = commands.recv() => { /* admit, remove, ready, guess */ }
//!         _ = clock.wait_for_tick() => { /* advance the timed phase */ }
//!     }
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Configuration for a [`TickClock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Length of one tick.
    pub tick: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}

impl TickConfig {
    /// A config with the given tick length.
    pub fn with_tick(tick: Duration) -> Self {
        Self { tick }
    }
}

/// Information about a tick that just fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Ticks fired since the clock was last started (starts at 1).
    pub tick: u64,
    /// `true` if the clock woke at least one full tick late.
    pub overrun: bool,
    /// Whole ticks skipped because of the overrun (0 in normal operation).
    pub ticks_skipped: u64,
}

/// A start/stop clock that fires once per tick while running.
#[derive(Debug)]
pub struct TickClock {
    tick: Duration,
    /// When the next tick is due; `None` while stopped.
    next: Option<Instant>,
    count: u64,
}

impl TickClock {
    /// Creates a stopped clock.
    ///
    /// A zero tick length is bumped to one millisecond so a running clock
    /// can never spin.
    pub fn new(config: TickConfig) -> Self {
        let tick = if config.tick.is_zero() {
            warn!("tick length of zero requested, using 1ms");
            Duration::from_millis(1)
        } else {
            config.tick
        };
        Self {
            tick,
            next: None,
            count: 0,
        }
    }

    /// Arms the clock: the first tick fires one tick length from now.
    ///
    /// Starting an already-running clock restarts it.
    pub fn start(&mut self) {
        self.next = Some(Instant::now() + self.tick);
        self.count = 0;
        debug!(tick_ms = self.tick.as_millis() as u64, "tick clock started");
    }

    /// Disarms the clock. [`wait_for_tick`](Self::wait_for_tick) pends
    /// until the next [`start`](Self::start).
    pub fn stop(&mut self) {
        if self.next.take().is_some() {
            debug!(ticks = self.count, "tick clock stopped");
        }
    }

    /// Whether the clock is armed.
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Ticks fired since the last start.
    pub fn tick_count(&self) -> u64 {
        self.count
    }

    /// The tick length.
    pub fn tick_duration(&self) -> Duration {
        self.tick
    }

    /// Waits until the next tick is due.
    ///
    /// Cancel-safe: dropping the future before it completes leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(due) = self.next else {
            std::future::pending::<()>().await;
            unreachable!("pending never resolves");
        };

        time::sleep_until(due).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(due);
        let ticks_skipped = (late_by.as_nanos() / self.tick.as_nanos()) as u64;
        let overrun = ticks_skipped > 0;

        self.next = Some(if overrun {
            warn!(
                tick = self.count + 1,
                skipped = ticks_skipped,
                late_ms = late_by.as_millis() as u64,
                "tick overrun, skipping ahead"
            );
            now + self.tick
        } else {
            // Keep the cadence anchored to the original schedule.
            due + self.tick
        });
        self.count += 1;

        trace!(tick = self.count, "tick fired");

        TickInfo {
            tick: self.count,
            overrun,
            ticks_skipped,
        }
    }
}
