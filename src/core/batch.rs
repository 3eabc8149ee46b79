use crate::domain::model::{ErrorRow, MovieRecord};
use crate::domain::ports::MovieStore;
use crate::utils::error::ImportError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// 等待寫入的記錄，保留原始列號以便回報錯誤
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub row_number: u64,
    pub record: MovieRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// 線性遞增：第 n 次失敗後等待 base_delay × n
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// 整個匯入過程的累計結果
#[derive(Debug, Default)]
pub struct ImportTally {
    pub committed: u64,
    pub failed: u64,
    pub errors: Vec<ErrorRow>,
    pub batch_sizes: Vec<usize>,
}

impl ImportTally {
    pub fn record_error(&mut self, error: ErrorRow) {
        self.failed += 1;
        self.errors.push(error);
    }
}

pub type SharedTally = Arc<Mutex<ImportTally>>;

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub committed: u64,
    pub failures: Vec<ErrorRow>,
}

pub struct BatchCommitter<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: MovieStore> BatchCommitter<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    async fn upsert_with_retry(&self, record: &MovieRecord) -> Result<(), ImportError> {
        let mut attempt = 1;
        loop {
            match self.store.upsert(record).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::debug!("Movie {} upserted on attempt {}", record.id, attempt);
                    }
                    return Ok(());
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "⚠️ Upsert of movie {} failed (attempt {}/{}): {}, retrying in {:?}",
                        record.id,
                        attempt,
                        self.retry.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 逐筆 upsert，單筆失敗不會中斷整批
    pub async fn commit(&self, batch: Vec<PendingRecord>) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            attempted: batch.len(),
            ..BatchOutcome::default()
        };

        for pending in &batch {
            match self.upsert_with_retry(&pending.record).await {
                Ok(()) => outcome.committed += 1,
                Err(e) => {
                    let message = format!(
                        "Failed to upsert movie {} after {} attempts: {}",
                        pending.record.id, self.retry.max_attempts, e
                    );
                    tracing::error!("❌ Row {}: {}", pending.row_number, message);
                    outcome.failures.push(ErrorRow::row(pending.row_number, message));
                }
            }
        }

        outcome
    }
}

/// 批次累積器
///
/// 批次滿了就換成新的空批次並在背景寫入。寫入之間以單一互斥鎖
/// 序列化：同一時間最多一個批次在寫入，另一個批次可以繼續累積；
/// 只有在下一批也滿了而前一批還沒寫完時，生產者才會等待。
pub struct BatchAccumulator<S> {
    committer: Arc<BatchCommitter<S>>,
    batch: Vec<PendingRecord>,
    batch_size: usize,
    flush_guard: Arc<Mutex<()>>,
    in_flight: Option<(JoinHandle<()>, usize)>,
    tally: SharedTally,
}

impl<S: MovieStore> BatchAccumulator<S> {
    pub fn new(committer: BatchCommitter<S>, batch_size: usize, tally: SharedTally) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            committer: Arc::new(committer),
            batch: Vec::with_capacity(batch_size),
            batch_size,
            flush_guard: Arc::new(Mutex::new(())),
            in_flight: None,
            tally,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.batch.len()
    }

    pub async fn push(&mut self, row_number: u64, record: MovieRecord) {
        self.batch.push(PendingRecord { row_number, record });
        if self.batch.len() >= self.batch_size {
            self.flush().await;
        }
    }

    /// 把目前的批次交給背景寫入；前一批還在寫入時會先等它完成
    pub async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        let size = batch.len();
        let permit = Arc::clone(&self.flush_guard).lock_owned().await;

        if let Some((handle, previous_size)) = self.in_flight.take() {
            self.reap(handle, previous_size).await;
        }

        let committer = Arc::clone(&self.committer);
        let tally = Arc::clone(&self.tally);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            tracing::debug!("Flushing batch of {} records", size);
            let outcome = committer.commit(batch).await;

            let mut tally = tally.lock().await;
            tally.committed += outcome.committed;
            tally.batch_sizes.push(outcome.attempted);
            for failure in outcome.failures {
                tally.record_error(failure);
            }
            tracing::debug!(
                "Batch done: {}/{} committed, {} total so far",
                outcome.committed,
                outcome.attempted,
                tally.committed
            );
        });
        self.in_flight = Some((handle, size));
    }

    async fn reap(&self, handle: JoinHandle<()>, size: usize) {
        if let Err(e) = handle.await {
            let error = ImportError::ProcessingError {
                message: format!("Batch of {} records aborted: {}", size, e),
            };
            tracing::error!("❌ {} (Severity: {:?})", error, error.severity());
            let mut tally = self.tally.lock().await;
            tally.failed += size as u64;
            tally.errors.push(ErrorRow::batch(error.to_string()));
        }
    }

    /// 寫入剩餘的記錄並等待所有背景寫入結束
    pub async fn finish(&mut self) {
        self.flush().await;
        if let Some((handle, size)) = self.in_flight.take() {
            self.reap(handle, size).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Semaphore;

    fn movie(id: &str) -> MovieRecord {
        MovieRecord {
            id: id.to_string(),
            title: format!("Movie {}", id),
            vote_average: 0.0,
            vote_count: 0,
            status: "Released".to_string(),
            release_date: None,
            revenue: 0,
            budget: 0,
            runtime: None,
            imdb_id: None,
            original_language: None,
            original_title: None,
            overview: None,
            tagline: None,
            poster_path: None,
            popularity: None,
            imdb_rating: None,
            imdb_votes: None,
            genres: vec![],
            production_companies: vec![],
            production_countries: vec![],
            spoken_languages: vec![],
            cast: vec![],
            cast_members: vec![],
            director: vec![],
            director_of_photography: vec![],
            writers: vec![],
            producers: vec![],
            music_composer: vec![],
        }
    }

    #[derive(Default)]
    struct MockStore {
        upserted: std::sync::Mutex<Vec<String>>,
        failures_left: std::sync::Mutex<HashMap<String, u32>>,
        gate: Option<Semaphore>,
        panic_on: Option<String>,
    }

    impl MockStore {
        fn failing(id: &str, times: u32) -> Self {
            let store = Self::default();
            store.failures_left.lock().unwrap().insert(id.to_string(), times);
            store
        }

        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Self::default()
            }
        }

        fn upserted(&self) -> Vec<String> {
            self.upserted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MovieStore for MockStore {
        async fn upsert(&self, record: &MovieRecord) -> Result<()> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.panic_on.as_deref() == Some(record.id.as_str()) {
                panic!("driver crashed on movie {}", record.id);
            }
            if let Some(left) = self.failures_left.lock().unwrap().get_mut(&record.id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(ImportError::storage("database is locked"));
                }
            }
            self.upserted.lock().unwrap().push(record.id.clone());
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn reconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_batches_flush_at_threshold_and_on_finish() {
        let store = Arc::new(MockStore::default());
        let tally = SharedTally::default();
        let committer = BatchCommitter::new(Arc::clone(&store), fast_retry());
        let mut accumulator = BatchAccumulator::new(committer, 1000, Arc::clone(&tally));

        for i in 0..2500u64 {
            accumulator.push(i + 1, movie(&i.to_string())).await;
        }
        assert_eq!(accumulator.pending_len(), 500);
        accumulator.finish().await;

        let tally = tally.lock().await;
        assert_eq!(tally.batch_sizes, vec![1000, 1000, 500]);
        assert_eq!(tally.committed, 2500);
        assert_eq!(tally.failed, 0);
        assert_eq!(store.upserted().len(), 2500);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(MockStore::failing("2", 2));
        let committer = BatchCommitter::new(Arc::clone(&store), fast_retry());

        let batch = vec![
            PendingRecord { row_number: 1, record: movie("1") },
            PendingRecord { row_number: 2, record: movie("2") },
        ];
        let outcome = committer.commit(batch).await;

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.committed, 2);
        assert!(outcome.failures.is_empty());
        assert_eq!(store.upserted(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_record_error_and_continue() {
        let store = Arc::new(MockStore::failing("2", 3));
        let committer = BatchCommitter::new(Arc::clone(&store), fast_retry());

        let batch = vec![
            PendingRecord { row_number: 1, record: movie("1") },
            PendingRecord { row_number: 2, record: movie("2") },
            PendingRecord { row_number: 3, record: movie("3") },
        ];
        let outcome = committer.commit(batch).await;

        assert_eq!(outcome.committed, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].row_number, 2);
        assert!(outcome.failures[0].message.contains("movie 2 after 3 attempts"));
        assert!(outcome.failures[0].message.contains("database is locked"));
        assert_eq!(store.upserted(), vec!["1", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_grows_linearly() {
        let store = Arc::new(MockStore::failing("1", 2));
        let committer =
            BatchCommitter::new(Arc::clone(&store), RetryPolicy::new(3, Duration::from_millis(500)));

        let started = tokio::time::Instant::now();
        let outcome = committer
            .commit(vec![PendingRecord { row_number: 1, record: movie("1") }])
            .await;

        assert_eq!(outcome.committed, 1);
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(started.elapsed() < Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_accumulation_continues_while_flush_in_flight() {
        let store = Arc::new(MockStore::gated());
        let tally = SharedTally::default();
        let committer = BatchCommitter::new(Arc::clone(&store), fast_retry());
        let mut accumulator = BatchAccumulator::new(committer, 2, Arc::clone(&tally));

        accumulator.push(1, movie("1")).await;
        accumulator.push(2, movie("2")).await;

        // 第一批卡在資料庫，下一批仍可累積
        let pushed = tokio::time::timeout(Duration::from_millis(200), accumulator.push(3, movie("3"))).await;
        assert!(pushed.is_ok());
        assert_eq!(accumulator.pending_len(), 1);
        assert_eq!(tally.lock().await.committed, 0);

        store.gate.as_ref().unwrap().add_permits(3);
        accumulator.finish().await;

        let tally = tally.lock().await;
        assert_eq!(tally.committed, 3);
        assert_eq!(tally.batch_sizes, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_panicked_flush_counts_whole_batch_as_failed() {
        let store = Arc::new(MockStore {
            panic_on: Some("2".to_string()),
            ..MockStore::default()
        });
        let tally = SharedTally::default();
        let committer = BatchCommitter::new(Arc::clone(&store), fast_retry());
        let mut accumulator = BatchAccumulator::new(committer, 2, Arc::clone(&tally));

        for i in 1..=3u64 {
            accumulator.push(i, movie(&i.to_string())).await;
        }
        accumulator.finish().await;

        let tally = tally.lock().await;
        assert_eq!(tally.committed, 1);
        assert_eq!(tally.failed, 2);
        assert_eq!(tally.errors.len(), 1);
        assert_eq!(tally.errors[0].row_number, ErrorRow::BATCH_LEVEL);
        assert!(tally.errors[0].message.starts_with("Data processing error: Batch of 2 records aborted"));
    }

    #[test]
    fn test_retry_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(20, Duration::MAX);
        assert_eq!(policy.delay_for(20), Duration::MAX);

        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1500));
    }
}
