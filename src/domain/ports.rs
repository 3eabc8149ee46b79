use crate::domain::model::MovieRecord;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncRead;

/// 關聯式資料庫的最小契約：以 id 為鍵的 upsert 加上連線保活
#[async_trait]
pub trait MovieStore: Send + Sync + 'static {
    async fn upsert(&self, record: &MovieRecord) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    /// 保活失敗時重建連線
    async fn reconnect(&self) -> Result<()>;

    async fn close(&self);
}

pub type InputReader = Box<dyn AsyncRead + Send + Unpin>;

/// 可重複開啟的輸入來源，標題驗證與實際匯入各讀一次
#[async_trait]
pub trait InputSource: Send + Sync {
    async fn open(&self) -> Result<InputReader>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: Option<u8>,
    pub buffer_capacity: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: Some(b'\\'),
            buffer_capacity: 64 * 1024,
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn batch_size(&self) -> usize;
    fn max_retries(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn keep_alive_interval(&self) -> Duration;
    fn progress_interval(&self) -> Duration;
    fn max_error_samples(&self) -> usize;
    fn csv_options(&self) -> CsvOptions;
}
