//! One ingestion cycle (fetch, transform, write) and the scheduled run that repeats it.

use anyhow::Result;
use std::cell::{Cell, RefCell};
use tracing::{Instrument, info, warn};

use crate::fetch::{FeedFetcher, HttpClient};
use crate::scheduler::Scheduler;
use crate::store::Store;
use crate::transform::transform;

/// Counts from a cycle that reached the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records in the fetched payload.
    pub fetched: usize,
    /// Records dropped by the transformer.
    pub skipped: usize,
    /// New station rows, or `None` when stations were not written this cycle.
    pub stations_inserted: Option<u64>,
    pub observations_inserted: u64,
}

/// Result of one cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Every record was written (or already present).
    Success(CycleReport),
    /// Some records were malformed and dropped; the rest were written.
    Partial(CycleReport),
    /// The cycle was abandoned. Nothing from it is guaranteed to be stored.
    Failed(anyhow::Error),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Success(r) | CycleOutcome::Partial(r) => Some(r),
            CycleOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }
}

/// Totals over a scheduled run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub succeeded: u64,
    pub partial: u64,
    pub failed: u64,
    pub stations_inserted: u64,
    pub observations_inserted: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.ticks += 1;
        match outcome {
            CycleOutcome::Success(_) => self.succeeded += 1,
            CycleOutcome::Partial(_) => self.partial += 1,
            CycleOutcome::Failed(_) => self.failed += 1,
        }
        if let Some(r) = outcome.report() {
            self.stations_inserted += r.stations_inserted.unwrap_or(0);
            self.observations_inserted += r.observations_inserted;
        }
    }
}

/// Owns the fetcher and the store session for the life of the process.
pub struct Pipeline<C> {
    fetcher: FeedFetcher<C>,
    store: Box<dyn Store>,
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(fetcher: FeedFetcher<C>, store: Box<dyn Store>) -> Self {
        Self { fetcher, store }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Runs one fetch, transform and write. Never returns an error: failures
    /// are folded into [`CycleOutcome::Failed`].
    pub async fn run_cycle(&self, write_stations: bool) -> CycleOutcome {
        match self.try_cycle(write_stations).await {
            Ok(report) if report.skipped > 0 => CycleOutcome::Partial(report),
            Ok(report) => CycleOutcome::Success(report),
            Err(e) => CycleOutcome::Failed(e),
        }
    }

    async fn try_cycle(&self, write_stations: bool) -> Result<CycleReport> {
        info!("Data extract");
        let payload = self.fetcher.fetch().await?;
        let fetched = payload.records.len();

        let rows = transform(payload);

        let stations_inserted = if write_stations {
            Some(self.store.insert_stations(&rows.stations).await?)
        } else {
            None
        };
        let observations_inserted = self.store.insert_observations(&rows.observations).await?;

        Ok(CycleReport {
            fetched,
            skipped: rows.skipped.len(),
            stations_inserted,
            observations_inserted,
        })
    }

    /// Drives one cycle per scheduled tick. Stations are written until one
    /// cycle stores them successfully; after that only observations are written.
    pub async fn run(&self, scheduler: &mut Scheduler) -> Result<RunSummary> {
        let summary = RefCell::new(RunSummary::default());
        let stations_pending = Cell::new(true);

        scheduler
            .run(|tick| {
                let span = tracing::info_span!("tick", index = tick.index);
                let summary = &summary;
                let stations_pending = &stations_pending;
                async move {
                    let outcome = self.run_cycle(stations_pending.get()).await;
                    if outcome.report().is_some_and(|r| r.stations_inserted.is_some()) {
                        stations_pending.set(false);
                    }
                    log_outcome(&outcome);
                    summary.borrow_mut().record(&outcome);
                }
                .instrument(span)
            })
            .await?;

        let summary = summary.into_inner();
        info!(
            ticks = summary.ticks,
            succeeded = summary.succeeded,
            partial = summary.partial,
            failed = summary.failed,
            stations_inserted = summary.stations_inserted,
            observations_inserted = summary.observations_inserted,
            "Run complete"
        );
        Ok(summary)
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Success(r) => info!(
            fetched = r.fetched,
            stations_inserted = ?r.stations_inserted,
            observations_inserted = r.observations_inserted,
            "Cycle complete"
        ),
        CycleOutcome::Partial(r) => warn!(
            fetched = r.fetched,
            skipped = r.skipped,
            stations_inserted = ?r.stations_inserted,
            observations_inserted = r.observations_inserted,
            "Cycle complete with skipped records"
        ),
        CycleOutcome::Failed(e) => warn!(error = %format!("{e:#}"), "Data acquisition failed"),
    }
}
