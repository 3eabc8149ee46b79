use crate::core::header_validator::validate_headers;
use crate::core::pipeline::MovieImportPipeline;
use crate::core::{ConfigProvider, ImportSummary, InputSource, MovieStore};
use crate::utils::error::{ImportError, Result};
use crate::utils::monitor::SystemMonitor;

/// 匯入引擎：先檢查標題，再重新開啟輸入執行串流匯入
pub struct ImportEngine<S: MovieStore, C: ConfigProvider, I: InputSource> {
    pipeline: MovieImportPipeline<S, C>,
    source: I,
    monitor: SystemMonitor,
}

impl<S: MovieStore, C: ConfigProvider, I: InputSource> ImportEngine<S, C, I> {
    pub fn new(pipeline: MovieImportPipeline<S, C>, source: I) -> Self {
        Self::new_with_monitoring(pipeline, source, false)
    }

    pub fn new_with_monitoring(
        pipeline: MovieImportPipeline<S, C>,
        source: I,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            pipeline,
            source,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    async fn preflight(&self) -> Result<()> {
        tracing::info!("🔍 Validating CSV headers of {}", self.source.describe());
        let reader = self.source.open().await?;
        match validate_headers(reader, &self.pipeline.csv_options()).await? {
            None => {
                tracing::info!("✅ CSV headers look good");
                Ok(())
            }
            Some(message) => {
                tracing::error!("❌ {}", message);
                Err(ImportError::HeaderValidationError { message })
            }
        }
    }

    /// 只做標題檢查，不寫入資料庫
    pub async fn validate_only(self) -> Result<()> {
        let result = self.preflight().await;
        self.pipeline.abort().await;
        result
    }

    pub async fn run(self) -> Result<ImportSummary> {
        self.monitor.log_stats("Before validation");

        if let Err(e) = self.preflight().await {
            self.pipeline.abort().await;
            return Err(e);
        }

        let reader = match self.source.open().await {
            Ok(reader) => reader,
            Err(e) => {
                self.pipeline.abort().await;
                return Err(e);
            }
        };

        tracing::info!("📥 Importing {}", self.source.describe());
        self.monitor.log_stats("Import started");
        let summary = self.pipeline.run(reader).await?;

        self.monitor.log_stats("Import finished");
        self.monitor.log_final_stats(summary.processed_count);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::core::header_validator::REQUIRED_COLUMNS;
    use crate::core::MovieRecord;
    use crate::domain::ports::InputReader;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct MockStore {
        upserts: Arc<AtomicUsize>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MovieStore for MockStore {
        async fn upsert(&self, _record: &MovieRecord) -> Result<()> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn reconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// 記憶體中的輸入，記錄被開啟幾次
    struct MemorySource {
        data: Vec<u8>,
        opens: AtomicUsize,
    }

    impl MemorySource {
        fn new(data: impl Into<Vec<u8>>) -> Self {
            Self {
                data: data.into(),
                opens: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InputSource for MemorySource {
        async fn open(&self) -> Result<InputReader> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(std::io::Cursor::new(self.data.clone())))
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn csv_with_rows(rows: &[(&str, &str)]) -> String {
        let mut csv = REQUIRED_COLUMNS.join(",");
        csv.push('\n');
        for (id, title) in rows {
            let mut cells = vec![String::new(); REQUIRED_COLUMNS.len()];
            cells[0] = id.to_string();
            cells[1] = title.to_string();
            csv.push_str(&cells.join(","));
            csv.push('\n');
        }
        csv
    }

    #[tokio::test]
    async fn test_engine_validates_then_imports() {
        let store = MockStore::default();
        let source = MemorySource::new(csv_with_rows(&[("1", "Alien"), ("2", "Heat")]));
        let pipeline = MovieImportPipeline::new(store.clone(), ImportSettings::default());
        let engine = ImportEngine::new(pipeline, source);

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.processed_count, 2);
        assert_eq!(store.upserts.load(Ordering::SeqCst), 2);
        assert!(store.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_engine_rejects_missing_columns_before_import() {
        let store = MockStore::default();
        let source = MemorySource::new("id,title,vote_average\n1,Alien,8\n");
        let pipeline = MovieImportPipeline::new(store.clone(), ImportSettings::default());
        let engine = ImportEngine::new(pipeline, source);

        let err = engine.run().await.unwrap_err();

        match err {
            ImportError::HeaderValidationError { message } => {
                assert!(message.contains("vote_count"));
                assert!(message.contains("poster_path"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
        assert!(store.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_engine_opens_source_twice() {
        let store = MockStore::default();
        let source = Arc::new(MemorySource::new(csv_with_rows(&[("1", "Alien")])));
        let pipeline = MovieImportPipeline::new(store.clone(), ImportSettings::default());
        let engine = ImportEngine::new(pipeline, SharedSource(Arc::clone(&source)));

        engine.run().await.unwrap();

        assert_eq!(source.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_validate_only_does_not_import() {
        let store = MockStore::default();
        let source = MemorySource::new(csv_with_rows(&[("1", "Alien")]));
        let pipeline = MovieImportPipeline::new(store.clone(), ImportSettings::default());

        ImportEngine::new(pipeline, source).validate_only().await.unwrap();

        assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
        assert!(store.closed.load(Ordering::SeqCst));
    }

    struct SharedSource(Arc<MemorySource>);

    #[async_trait]
    impl InputSource for SharedSource {
        async fn open(&self) -> Result<InputReader> {
            self.0.open().await
        }

        fn describe(&self) -> String {
            self.0.describe()
        }
    }
}
