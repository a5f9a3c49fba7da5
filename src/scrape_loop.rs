use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::db::Store;
use crate::error::CycleError;
use crate::extract::{extract_page, Alignment};
use crate::fetcher::PageSource;

/// Jittered idle period between cycles: a whole number of minutes drawn
/// uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    min_minutes: u64,
    max_minutes: u64,
}

impl Schedule {
    pub fn minutes(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes: min_minutes.min(max_minutes),
            max_minutes: max_minutes.max(min_minutes),
        }
    }

    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(60 * rng.gen_range(self.min_minutes..=self.max_minutes))
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    pub pages: usize,
    pub rows: usize,
    pub elapsed: Duration,
}

/// Fetch → extract → replace, over a fixed page range.
pub struct Scraper<S> {
    source: S,
    store: Store,
    pages: RangeInclusive<u32>,
    alignment: Alignment,
}

impl<S: PageSource> Scraper<S> {
    pub fn new(source: S, store: Store, pages: RangeInclusive<u32>, alignment: Alignment) -> Self {
        Self {
            source,
            store,
            pages,
            alignment,
        }
    }

    /// Run one cycle. Rows from every page are collected first; the store is
    /// only touched once all pages parsed, so a failure anywhere keeps the
    /// previous snapshot.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let mut batch = Vec::new();
        let mut pages = 0usize;

        for page in self.pages.clone() {
            let html = self
                .source
                .fetch_page(page)
                .await
                .map_err(|source| CycleError::Transport { page, source })?;
            let rows = extract_page(&html, self.alignment)
                .map_err(|source| CycleError::Parse { page, source })?;
            debug!(page, rows = rows.len(), "Parsed notice page");
            batch.extend(rows);
            pages += 1;
        }

        let rows = self.store.replace_all(&batch)?;
        Ok(CycleReport {
            pages,
            rows,
            elapsed: started.elapsed(),
        })
    }

    /// Cycle, sleep, repeat until `cancel` fires. The first cycle starts
    /// immediately. Cycle errors are logged and never end the loop.
    pub async fn run(mut self, schedule: Schedule, cancel: CancellationToken) {
        loop {
            tokio::select! {
                result = self.run_cycle() => match result {
                    Ok(report) => info!(
                        "Snapshot replaced: {} notices from {} pages in {:.1}s",
                        report.rows,
                        report.pages,
                        report.elapsed.as_secs_f64()
                    ),
                    Err(e) => error!("Scrape cycle failed, keeping previous snapshot: {}", e),
                },
                _ = cancel.cancelled() => {
                    info!("Scrape cycle abandoned for shutdown");
                    break;
                }
            }

            let delay = schedule.next_delay(&mut rand::thread_rng());
            info!("Next scrape in {} min", delay.as_secs() / 60);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    info!("Scrape loop shutting down");
                    break;
                }
            }
        }
    }
}
