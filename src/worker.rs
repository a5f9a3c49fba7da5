use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::fetcher::PageSource;
use crate::scrape_loop::{Schedule, Scraper};

/// Owned handle to the background scrape task.
///
/// Created when the process starts serving and consumed by [`shutdown`],
/// which cancels the loop and waits for the task to finish.
///
/// [`shutdown`]: ScrapeWorker::shutdown
pub struct ScrapeWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScrapeWorker {
    pub fn spawn<S>(scraper: Scraper<S>, schedule: Schedule) -> Self
    where
        S: PageSource + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scraper.run(schedule, cancel.clone()));
        info!("Scrape worker started");
        Self { cancel, handle }
    }

    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.handle.await.context("Scrape worker task panicked")?;
        info!("Scrape worker stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::db::Store;
    use crate::extract::Alignment;
    use crate::scrape_loop::tests::FakeBoard;

    async fn wait_for_rows(path: &Path, expected: usize) {
        let reader = Store::open(path).unwrap();
        for _ in 0..200 {
            if reader.read_all().unwrap().len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("snapshot never reached {} rows", expected);
    }

    #[tokio::test]
    async fn shutdown_interrupts_sleep() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notices.sqlite");
        let scraper = Scraper::new(
            FakeBoard::with_cycle("c1", 1..=2),
            Store::open(&path).unwrap(),
            1..=2,
            Alignment::Truncate,
        );

        let worker = ScrapeWorker::spawn(scraper, Schedule::minutes(10, 20));
        wait_for_rows(&path, 6).await;

        tokio::time::timeout(Duration::from_secs(5), worker.shutdown())
            .await
            .expect("shutdown should not wait for the next cycle")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_mid_cycle_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notices.sqlite");
        let board = FakeBoard::with_cycle("old", 1..=9);
        let mut scraper = Scraper::new(board.clone(), Store::open(&path).unwrap(), 1..=9, Alignment::Truncate);
        scraper.run_cycle().await.unwrap();

        // next cycle fetches pages 1-4 of fresh content, then hangs on page 5
        board.load_cycle("new", 1..=9);
        board.stall(5);
        let worker = ScrapeWorker::spawn(scraper, Schedule::minutes(10, 20));
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(2), worker.shutdown())
            .await
            .expect("shutdown should abandon the stalled cycle")
            .unwrap();

        let rows = Store::open(&path).unwrap().read_all().unwrap();
        assert_eq!(rows.len(), 27);
        assert!(rows.iter().all(|n| n.row.title.starts_with("old-")));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_cycles_do_not_stop_the_worker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notices.sqlite");
        let board = FakeBoard::with_cycle("c1", 1..=3);
        board.set(2, Err(500));
        let scraper = Scraper::new(board.clone(), Store::open(&path).unwrap(), 1..=3, Alignment::Truncate);

        let worker = ScrapeWorker::spawn(scraper, Schedule::minutes(10, 10));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(Store::open(&path).unwrap().read_all().unwrap().is_empty());

        board.load_cycle("c1", 2..=2);
        tokio::time::sleep(Duration::from_secs(11 * 60)).await;
        wait_for_rows(&path, 9).await;

        worker.shutdown().await.unwrap();
    }
}
