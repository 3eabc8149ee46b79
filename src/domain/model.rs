use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 解碼後的一列 CSV：欄位名稱對應原始字串
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 資料列編號，從 1 開始，不含標題列
    pub row_number: u64,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: u64, fields: HashMap<String, String>) -> Self {
        Self { row_number, fields }
    }

    /// 取得欄位值，缺少的欄位回傳 None
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// 取得去除空白後的非空欄位值
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionCompany {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl ProductionCompany {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
}

impl CastMember {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// 正規化後的電影記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: String,
    pub title: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub status: String,
    pub release_date: Option<NaiveDate>,
    pub revenue: i64,
    pub budget: i64,
    pub runtime: Option<i32>,
    pub imdb_id: Option<String>,
    pub original_language: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub popularity: Option<f64>,
    pub imdb_rating: Option<f64>,
    pub imdb_votes: Option<i64>,
    pub genres: Vec<String>,
    pub production_companies: Vec<ProductionCompany>,
    pub production_countries: Vec<String>,
    pub spoken_languages: Vec<String>,
    pub cast: Vec<String>,
    pub cast_members: Vec<CastMember>,
    pub director: Vec<String>,
    pub director_of_photography: Vec<String>,
    pub writers: Vec<String>,
    pub producers: Vec<String>,
    pub music_composer: Vec<String>,
}

/// 單一列或整批的失敗記錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRow {
    /// 資料列編號；整批或串流層級的錯誤為 -1
    pub row_number: i64,
    pub message: String,
}

impl ErrorRow {
    pub const BATCH_LEVEL: i64 = -1;

    pub fn row(row_number: u64, message: impl Into<String>) -> Self {
        Self {
            row_number: row_number as i64,
            message: message.into(),
        }
    }

    pub fn batch(message: impl Into<String>) -> Self {
        Self {
            row_number: Self::BATCH_LEVEL,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success: bool,
    pub processed_count: u64,
    pub error_count: u64,
    pub sample_errors: Vec<ErrorRow>,
    pub elapsed_millis: u64,
}

impl ImportSummary {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_lookup() {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), " 42 ".to_string());
        fields.insert("tagline".to_string(), "   ".to_string());
        let row = RawRow::new(1, fields);

        assert_eq!(row.get("id"), Some(" 42 "));
        assert_eq!(row.non_empty("id"), Some("42"));
        assert_eq!(row.non_empty("tagline"), None);
        assert_eq!(row.get("title"), None);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = ImportSummary {
            success: true,
            processed_count: 2,
            error_count: 1,
            sample_errors: vec![ErrorRow::row(2, "Missing required field: id")],
            elapsed_millis: 15,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["processedCount"], 2);
        assert_eq!(json["errorCount"], 1);
        assert_eq!(json["sampleErrors"][0]["rowNumber"], 2);
        assert_eq!(json["elapsedMillis"], 15);
    }
}
