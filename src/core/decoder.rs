use crate::domain::model::{ErrorRow, RawRow};
use crate::domain::ports::CsvOptions;
use crate::utils::error::{ImportError, Result};
use csv_async::{AsyncReader, AsyncReaderBuilder, ErrorKind, StringRecord};
use std::collections::HashMap;
use tokio::io::AsyncRead;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// 串流式 CSV 解碼器
///
/// 只保留 csv-async 的讀取緩衝區，逐列產生 `RawRow`。第一個非空白列
/// 作為標題；之後每一列依位置對應標題。單列解析失敗會被略過，
/// I/O 錯誤則回傳給呼叫端。
pub struct CsvRowDecoder<R> {
    reader: AsyncReader<R>,
    record: StringRecord,
    headers: Option<Vec<String>>,
    row_number: u64,
    skipped_rows: u64,
    malformed: Vec<ErrorRow>,
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

impl<R: AsyncRead + Unpin + Send> CsvRowDecoder<R> {
    pub fn new(input: R, options: &CsvOptions) -> Self {
        let reader = AsyncReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .quote(options.quote)
            .escape(options.escape)
            .double_quote(true)
            .buffer_capacity(options.buffer_capacity)
            .create_reader(input);

        Self {
            reader,
            record: StringRecord::new(),
            headers: None,
            row_number: 0,
            skipped_rows: 0,
            malformed: Vec::new(),
        }
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// 已讀取的資料列數（含被略過的列）
    pub fn rows_read(&self) -> u64 {
        self.row_number
    }

    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows
    }

    /// 取出被略過的列，交由呼叫端計入錯誤
    pub fn take_malformed_rows(&mut self) -> Vec<ErrorRow> {
        std::mem::take(&mut self.malformed)
    }

    async fn read_headers(&mut self) -> Result<bool> {
        loop {
            if !self.reader.read_record(&mut self.record).await? {
                return Ok(false);
            }
            if is_blank(&self.record) {
                continue;
            }

            let headers: Vec<String> = self
                .record
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let name = if idx == 0 {
                        name.trim_start_matches(BYTE_ORDER_MARK)
                    } else {
                        name
                    };
                    name.trim().to_string()
                })
                .collect();

            tracing::debug!("CSV headers ({} columns): {:?}", headers.len(), headers);
            self.headers = Some(headers);
            return Ok(true);
        }
    }

    /// 讀取下一列；串流結束時回傳 `Ok(None)`
    pub async fn next_row(&mut self) -> Result<Option<RawRow>> {
        if self.headers.is_none() && !self.read_headers().await? {
            return Ok(None);
        }

        loop {
            match self.reader.read_record(&mut self.record).await {
                Ok(false) => return Ok(None),
                Ok(true) => {
                    if is_blank(&self.record) {
                        continue;
                    }
                    self.row_number += 1;
                    return Ok(Some(self.zip_record()));
                }
                Err(e) => {
                    if matches!(e.kind(), ErrorKind::Io(_)) {
                        return Err(ImportError::CsvStreamError(e));
                    }
                    self.row_number += 1;
                    self.skipped_rows += 1;
                    tracing::warn!("⚠️ Skipping malformed CSV row {}: {}", self.row_number, e);
                    self.malformed
                        .push(ErrorRow::row(self.row_number, format!("Malformed CSV row: {}", e)));
                }
            }
        }
    }

    fn zip_record(&self) -> RawRow {
        let headers = self.headers.as_deref().unwrap_or_default();
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(self.record.iter())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        RawRow::new(self.row_number, fields)
    }
}
