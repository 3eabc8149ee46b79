use crate::domain::ports::CsvOptions;
use crate::utils::error::Result;
use std::collections::HashSet;
use tokio::io::{AsyncRead, AsyncReadExt};

/// 匯入所需的完整欄位，順序即錯誤訊息中列出的順序
pub const REQUIRED_COLUMNS: [&str; 28] = [
    "id",
    "title",
    "vote_average",
    "vote_count",
    "status",
    "release_date",
    "revenue",
    "runtime",
    "budget",
    "imdb_id",
    "original_language",
    "original_title",
    "overview",
    "popularity",
    "tagline",
    "genres",
    "production_companies",
    "production_countries",
    "spoken_languages",
    "cast",
    "director",
    "director_of_photography",
    "writers",
    "producers",
    "music_composer",
    "imdb_rating",
    "imdb_votes",
    "poster_path",
];

pub const EMPTY_FILE_MESSAGE: &str = "CSV file is empty";
pub const NO_HEADER_MESSAGE: &str = "CSV file has no header row";

/// 依標準順序列出缺少的欄位
pub fn missing_columns<'a, I>(headers: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: HashSet<&str> = headers.into_iter().map(str::trim).collect();
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !present.contains(column))
        .collect()
}

/// 匯入前的標題檢查
///
/// 整個串流會先讀進記憶體再從緩衝區解析，因此不依賴輸入可重讀。
/// 標題完整時回傳 `Ok(None)`，否則回傳可讀的錯誤訊息；標題列本身
/// 無法解析時回傳錯誤。
pub async fn validate_headers<R>(mut reader: R, options: &CsvOptions) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let bytes_read = reader.read_to_end(&mut buffer).await?;
    if bytes_read == 0 {
        return Ok(Some(EMPTY_FILE_MESSAGE.to_string()));
    }
    tracing::debug!("Header validation buffered {} bytes", bytes_read);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .quote(options.quote)
        .escape(options.escape)
        .from_reader(buffer.as_slice());

    let mut record = csv::StringRecord::new();
    let headers = loop {
        if !csv_reader.read_record(&mut record)? {
            return Ok(Some(NO_HEADER_MESSAGE.to_string()));
        }
        if record.iter().any(|field| !field.trim().is_empty()) {
            break record
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    if idx == 0 {
                        name.trim_start_matches('\u{feff}').to_string()
                    } else {
                        name.to_string()
                    }
                })
                .collect::<Vec<_>>();
        }
    };

    let missing = missing_columns(headers.iter().map(String::as_str));
    if missing.is_empty() {
        Ok(None)
    } else {
        Ok(Some(format!("Missing required columns: {}", missing.join(", "))))
    }
}
