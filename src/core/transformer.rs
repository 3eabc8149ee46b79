use crate::core::field_parsers::{
    parse_cast_names, parse_cast_objects, parse_date, parse_f64, parse_i64, parse_list_field,
    parse_money, parse_production_companies,
};
use crate::domain::model::{ErrorRow, MovieRecord, RawRow};
use std::fmt;

const DEFAULT_STATUS: &str = "Unknown";

/// 列層級的轉換失敗，只影響該列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_number: u64,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.message)
    }
}

impl std::error::Error for RowError {}

impl From<RowError> for ErrorRow {
    fn from(err: RowError) -> Self {
        ErrorRow::row(err.row_number, err.message)
    }
}

fn required<'a>(row: &'a RawRow, column: &str) -> Result<&'a str, RowError> {
    row.non_empty(column).ok_or_else(|| RowError {
        row_number: row.row_number,
        message: format!("Missing required field: {}", column),
    })
}

fn optional_text(row: &RawRow, column: &str) -> Option<String> {
    row.non_empty(column).map(str::to_string)
}

/// 將一列原始 CSV 轉成正規化的電影記錄
pub fn transform_row(row: &RawRow) -> Result<MovieRecord, RowError> {
    let id = required(row, "id")?.to_string();
    let title = required(row, "title")?.to_string();

    let release_date = parse_date(row.get("release_date"));
    if release_date.is_none() && row.non_empty("release_date").is_some() {
        tracing::debug!(
            "Row {} ({}): unparseable release_date {:?}, storing null",
            row.row_number,
            id,
            row.get("release_date")
        );
    }

    let vote_average = parse_f64(row.get("vote_average")).unwrap_or_else(|| {
        if row.non_empty("vote_average").is_some() {
            tracing::debug!("Row {} ({}): invalid vote_average, defaulting to 0", row.row_number, id);
        }
        0.0
    });

    let cast_field = row.get("cast");

    Ok(MovieRecord {
        vote_average,
        vote_count: parse_i64(row.get("vote_count")).unwrap_or(0),
        status: optional_text(row, "status").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        release_date,
        revenue: parse_money(row.get("revenue")),
        budget: parse_money(row.get("budget")),
        runtime: parse_i64(row.get("runtime")).and_then(|v| i32::try_from(v).ok()),
        imdb_id: optional_text(row, "imdb_id"),
        original_language: optional_text(row, "original_language"),
        original_title: optional_text(row, "original_title").or_else(|| Some(title.clone())),
        overview: optional_text(row, "overview"),
        tagline: optional_text(row, "tagline"),
        poster_path: optional_text(row, "poster_path"),
        popularity: parse_f64(row.get("popularity")),
        imdb_rating: parse_f64(row.get("imdb_rating")),
        imdb_votes: parse_i64(row.get("imdb_votes")),
        genres: parse_list_field(row.get("genres")),
        production_companies: parse_production_companies(row.get("production_companies")),
        production_countries: parse_list_field(row.get("production_countries")),
        spoken_languages: parse_list_field(row.get("spoken_languages")),
        cast: parse_cast_names(cast_field),
        cast_members: parse_cast_objects(cast_field),
        director: parse_list_field(row.get("director")),
        director_of_photography: parse_list_field(row.get("director_of_photography")),
        writers: parse_list_field(row.get("writers")),
        producers: parse_list_field(row.get("producers")),
        music_composer: parse_list_field(row.get("music_composer")),
        id,
        title,
    })
}
