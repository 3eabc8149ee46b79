use crate::core::batch::{BatchAccumulator, BatchCommitter, RetryPolicy, SharedTally};
use crate::core::decoder::CsvRowDecoder;
use crate::core::keep_alive::KeepAlive;
use crate::core::transformer::transform_row;
use crate::domain::model::{ErrorRow, ImportSummary};
use crate::domain::ports::{ConfigProvider, CsvOptions, MovieStore};
use crate::utils::error::{ImportError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncRead;

/// 單次匯入的狀態，只會往前推進
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Idle,
    Decoding,
    Draining,
    Summarizing,
    Closed,
}

#[derive(Debug)]
struct StateTracker {
    current: PipelineState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            current: PipelineState::Idle,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.current, "pipeline state cannot go backwards");
        tracing::debug!("Pipeline state: {:?} -> {:?}", self.current, next);
        self.current = next;
    }
}

struct ProgressReporter {
    interval: Duration,
    last_report: tokio::time::Instant,
}

impl ProgressReporter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: tokio::time::Instant::now(),
        }
    }

    /// 距離上次回報超過間隔才輸出，回傳是否有輸出
    async fn maybe_report(&mut self, rows_read: u64, pending: usize, tally: &SharedTally) -> bool {
        if self.last_report.elapsed() < self.interval {
            return false;
        }
        self.last_report = tokio::time::Instant::now();

        let tally = tally.lock().await;
        tracing::info!(
            "📈 Progress: {} rows read, {} committed, {} failed, {} pending",
            rows_read,
            tally.committed,
            tally.failed,
            pending
        );
        true
    }
}

/// 串流匯入管線：解碼 → 轉換 → 批次寫入 → 摘要
///
/// 管線獨佔資料庫連線，`run` 結束時（不論成功與否）都會關閉連線並停止保活。
pub struct MovieImportPipeline<S: MovieStore, C: ConfigProvider> {
    store: Arc<S>,
    config: C,
}

impl<S: MovieStore, C: ConfigProvider> MovieImportPipeline<S, C> {
    pub fn new(store: S, config: C) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    pub fn csv_options(&self) -> CsvOptions {
        self.config.csv_options()
    }

    /// 不執行匯入直接釋放連線
    pub async fn abort(self) {
        self.store.close().await;
    }

    pub async fn run<R>(self, reader: R) -> Result<ImportSummary>
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = Instant::now();
        let mut state = StateTracker::new();
        let keep_alive = KeepAlive::spawn(Arc::clone(&self.store), self.config.keep_alive_interval());

        let result = self.ingest(reader, &mut state, started).await;

        keep_alive.stop();
        self.store.close().await;
        state.advance(PipelineState::Closed);

        result
    }

    async fn ingest<R>(
        &self,
        reader: R,
        state: &mut StateTracker,
        started: Instant,
    ) -> Result<ImportSummary>
    where
        R: AsyncRead + Unpin + Send,
    {
        let tally = SharedTally::default();
        let retry = RetryPolicy::new(self.config.max_retries(), self.config.retry_delay());
        let committer = BatchCommitter::new(Arc::clone(&self.store), retry);
        let mut accumulator =
            BatchAccumulator::new(committer, self.config.batch_size(), Arc::clone(&tally));
        let mut decoder = CsvRowDecoder::new(reader, &self.config.csv_options());
        let mut progress = ProgressReporter::new(self.config.progress_interval());

        state.advance(PipelineState::Decoding);
        tracing::info!(
            "🚀 Starting import (batch size {}, {} attempts per record)",
            self.config.batch_size(),
            retry.max_attempts
        );

        let stream_error = loop {
            let next = decoder.next_row().await;
            // 被略過的列要在後續列之前計入，錯誤樣本才會依檔案順序排列
            let malformed = decoder.take_malformed_rows();
            if !malformed.is_empty() {
                let mut tally = tally.lock().await;
                for error in malformed {
                    tally.record_error(error);
                }
            }

            match next {
                Ok(Some(row)) => {
                    match transform_row(&row) {
                        Ok(record) => accumulator.push(row.row_number, record).await,
                        Err(err) => {
                            tracing::warn!("⚠️ Skipping row {}: {}", err.row_number, err.message);
                            tally.lock().await.record_error(err.into());
                        }
                    }
                    progress
                        .maybe_report(decoder.rows_read(), accumulator.pending_len(), &tally)
                        .await;
                }
                Ok(None) => break None,
                Err(e) => break Some(e),
            }
        };

        // 串流中斷時也要把已累積的記錄寫完
        state.advance(PipelineState::Draining);
        accumulator.finish().await;

        state.advance(PipelineState::Summarizing);
        let tally = tally.lock().await;

        let mut truncation = None;
        if let Some(err) = stream_error {
            if tally.committed == 0 {
                tracing::error!("❌ Input stream failed before any record was committed: {}", err);
                return Err(ImportError::StreamError {
                    message: err.to_string(),
                });
            }
            tracing::warn!(
                "⚠️ Input stream ended early after row {}, keeping {} committed records: {}",
                decoder.rows_read(),
                tally.committed,
                err
            );
            truncation = Some(ErrorRow::batch(format!(
                "Input stream ended early after row {}: {}",
                decoder.rows_read(),
                err
            )));
        }

        // 串流中斷通知固定佔第一筆樣本，不計入 error_count
        let max_samples = self.config.max_error_samples();
        let mut sample_errors: Vec<ErrorRow> = truncation.into_iter().collect();
        let remaining = max_samples.saturating_sub(sample_errors.len());
        sample_errors.extend(tally.errors.iter().take(remaining).cloned());

        let summary = ImportSummary {
            success: tally.committed > 0 || tally.failed == 0,
            processed_count: tally.committed,
            error_count: tally.failed,
            sample_errors,
            elapsed_millis: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "✅ Import finished: {} committed, {} failed, {} batches in {}ms",
            summary.processed_count,
            summary.error_count,
            tally.batch_sizes.len(),
            summary.elapsed_millis
        );

        Ok(summary)
    }
}
