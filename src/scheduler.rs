//! Fixed-period tick scheduling over a bounded run.
//!
//! `floor(total / period)` ticks are planned, tick `i` at offset
//! `i * period` from start. Ticks run one at a time; a tick that overruns
//! its period delays the next one but never shifts the plan: later ticks
//! still aim for their original offsets, so ticks can bunch up but never
//! fire early.

use anyhow::{Result, bail};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// One planned execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub index: u64,
    /// Nominal offset from the start of the run.
    pub offset: Duration,
}

impl Tick {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}

#[derive(Debug)]
pub struct Scheduler {
    period: Duration,
    total: Duration,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(period: Duration, total: Duration) -> Result<Self> {
        if period.is_zero() {
            bail!("poll period must be greater than zero");
        }
        Ok(Self {
            period,
            total,
            state: SchedulerState::Idle,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        let n = self.total.as_nanos() / self.period.as_nanos();
        // only reachable with a nanosecond period over centuries
        u64::try_from(n).unwrap_or(u64::MAX)
    }

    /// The planned tick at position `index`.
    pub fn tick(&self, index: u64) -> Tick {
        let nanos = self.period.as_nanos() * u128::from(index);
        let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
        let offset = Duration::new(secs, (nanos % 1_000_000_000) as u32);
        Tick { index, offset }
    }

    /// The full plan, in order, computed lazily.
    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        (0..self.tick_count()).map(|index| self.tick(index))
    }

    /// Runs every planned tick through `on_tick`, then stops.
    ///
    /// Returns the number of ticks executed. A scheduler runs once; calling
    /// this again fails.
    pub async fn run<F, Fut>(&mut self, mut on_tick: F) -> Result<u64>
    where
        F: FnMut(Tick) -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.state != SchedulerState::Idle {
            bail!("scheduler already started");
        }

        let planned = self.tick_count();
        info!(
            ticks = planned,
            period_secs = self.period.as_secs(),
            total_secs = self.total.as_secs(),
            "Scheduler starting"
        );
        self.state = SchedulerState::Running;

        let start = Instant::now();
        let mut executed = 0;

        for index in 0..planned {
            let tick = self.tick(index);
            let deadline = start + tick.offset;
            tokio::time::sleep_until(deadline).await;

            let lag = Instant::now().saturating_duration_since(deadline);
            if lag >= self.period {
                warn!(tick = tick.index, lag_secs = lag.as_secs(), "Tick running late");
            } else {
                debug!(tick = tick.index, lag_ms = lag.as_millis() as u64, "Tick due");
            }

            on_tick(tick).await;
            executed += 1;
        }

        self.state = SchedulerState::Stopped;
        info!(executed, "Scheduler stopped");
        Ok(executed)
    }
}
