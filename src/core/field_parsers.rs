//! 容錯欄位解析
//!
//! 同一個邏輯欄位在不同的 CSV 匯出中可能是 JSON 陣列、逗號清單、
//! 直線清單或 `[Name]` 簡寫。這裡的函式永遠不回傳錯誤，最差的情況
//! 是把原始字串當成單一值。

use crate::domain::model::{CastMember, ProductionCompany};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const UNKNOWN_COMPANY: &str = "Unknown";
const UNKNOWN_ACTOR: &str = "Unknown Actor";
const FALLBACK_SEPARATORS: [char; 3] = [',', '|', ';'];

/// 解析器入口的輸入型別，只在入口判斷一次
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Raw(String),
    JsonArray(Vec<Value>),
    JsonObject(Map<String, Value>),
}

impl FieldInput {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Raw(s),
            Value::Array(items) => Self::JsonArray(items),
            Value::Object(obj) => Self::JsonObject(obj),
            Value::Null => Self::Raw(String::new()),
            other => Self::Raw(other.to_string()),
        }
    }
}

impl From<&str> for FieldInput {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<Option<&str>> for FieldInput {
    fn from(raw: Option<&str>) -> Self {
        Self::Raw(raw.unwrap_or_default().to_string())
    }
}

impl From<Value> for FieldInput {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

fn bracket_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[([\p{L}\p{N}\s&.\-]+)\]$").expect("valid bracket pattern"))
}

fn list_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*").expect("valid separator pattern"))
}

fn looks_like_array(text: &str) -> bool {
    text.starts_with('[') && text.ends_with(']')
}

fn clean_name(part: &str) -> Option<String> {
    let name = part.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn split_names(text: &str, separator: char) -> Vec<String> {
    text.split(separator).filter_map(clean_name).collect()
}

fn json_scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => clean_name(&s),
        other => Some(other.to_string()),
    }
}

/// 結構化解析失敗後依序嘗試逗號、直線、分號，都沒有就整段當一個名稱
fn fallback_split(text: &str) -> Vec<String> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    for separator in FALLBACK_SEPARATORS {
        if inner.contains(separator) {
            let names = split_names(inner, separator);
            if !names.is_empty() {
                return names;
            }
        }
    }
    clean_name(inner)
        .or_else(|| clean_name(text))
        .into_iter()
        .collect()
}

fn company_from_object(obj: &Map<String, Value>) -> ProductionCompany {
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .and_then(clean_name)
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
    let id = obj.get("id").and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    });
    ProductionCompany { name, id }
}

fn companies_from_json(items: Vec<Value>) -> Vec<ProductionCompany> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(company_from_object(&obj)),
            other => json_scalar_to_string(other).map(ProductionCompany::named),
        })
        .collect()
}

fn parse_company_text(raw: &str) -> Vec<ProductionCompany> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(caps) = bracket_name_re().captures(trimmed) {
        return clean_name(&caps[1])
            .map(ProductionCompany::named)
            .into_iter()
            .collect();
    }

    let names = if looks_like_array(trimmed) {
        match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(items) => return companies_from_json(items),
            Err(e) => {
                tracing::debug!("production_companies is not valid JSON ({}), splitting instead", e);
                fallback_split(trimmed)
            }
        }
    } else if trimmed.contains('|') {
        split_names(trimmed, '|')
    } else {
        split_names(trimmed, ',')
    };

    if names.is_empty() {
        return vec![ProductionCompany::named(trimmed)];
    }
    names.into_iter().map(ProductionCompany::named).collect()
}

/// 解析製作公司欄位
pub fn parse_production_companies(input: impl Into<FieldInput>) -> Vec<ProductionCompany> {
    match input.into() {
        FieldInput::Raw(raw) => parse_company_text(&raw),
        FieldInput::JsonArray(items) => companies_from_json(items),
        FieldInput::JsonObject(obj) => vec![company_from_object(&obj)],
    }
}

fn actor_from_json(value: Value) -> Option<String> {
    match value {
        Value::Object(obj) => Some(
            obj.get("name")
                .and_then(Value::as_str)
                .and_then(clean_name)
                .unwrap_or_else(|| UNKNOWN_ACTOR.to_string()),
        ),
        // 陣列中的 null 保留成字串，和其他純量一樣
        Value::Null => Some(Value::Null.to_string()),
        other => json_scalar_to_string(other),
    }
}

/// 逗號後面接大寫字母才視為下一位演員，避免把角色名稱中的逗號切開
fn split_on_capitalised_commas(text: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(',') {
        let rest = text[idx + 1..].trim_start();
        if rest.chars().next().is_some_and(char::is_uppercase) {
            entries.push(&text[start..idx]);
            start = idx + 1;
        }
    }
    entries.push(&text[start..]);
    entries
}

fn cast_from_text(text: &str) -> Vec<String> {
    if text.contains(" as ") {
        split_on_capitalised_commas(text)
            .into_iter()
            .filter_map(|entry| entry.split(" as ").next().and_then(clean_name))
            .collect()
    } else {
        split_names(text, ',')
    }
}

fn cast_entries(input: FieldInput) -> Vec<String> {
    let raw = match input {
        FieldInput::JsonArray(items) => return items.into_iter().filter_map(actor_from_json).collect(),
        FieldInput::JsonObject(obj) => {
            return actor_from_json(Value::Object(obj)).into_iter().collect()
        }
        FieldInput::Raw(raw) => raw,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let names = if looks_like_array(trimmed) {
        match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(items) => return items.into_iter().filter_map(actor_from_json).collect(),
            Err(e) => {
                tracing::debug!("cast is not valid JSON ({}), splitting instead", e);
                fallback_split(trimmed)
            }
        }
    } else {
        cast_from_text(trimmed)
    };

    if names.is_empty() {
        return vec![trimmed.to_string()];
    }
    names
}

/// 解析演員欄位，只保留姓名
pub fn parse_cast_names(input: impl Into<FieldInput>) -> Vec<String> {
    cast_entries(input.into())
}

/// 與 `parse_cast_names` 相同的流程，但包成 `{name}` 結構
pub fn parse_cast_objects(input: impl Into<FieldInput>) -> Vec<CastMember> {
    cast_entries(input.into())
        .into_iter()
        .map(CastMember::named)
        .collect()
}

/// 一般清單欄位：JSON 陣列或逗號分隔
pub fn parse_list_field(raw: Option<&str>) -> Vec<String> {
    let trimmed = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Vec::new(),
    };

    if looks_like_array(trimmed) {
        match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(items) => return items.into_iter().filter_map(json_scalar_to_string).collect(),
            Err(e) => {
                tracing::debug!("list field is not valid JSON ({}), splitting instead", e);
                let inner = trimmed.trim_start_matches('[').trim_end_matches(']');
                return list_separator_re().split(inner).filter_map(clean_name).collect();
            }
        }
    }

    list_separator_re()
        .split(trimmed)
        .filter_map(clean_name)
        .collect()
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_f64(raw: Option<&str>) -> Option<f64> {
    non_empty(raw)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// 整數欄位，`"12.7"` 之類的小數取整數部分
pub fn parse_i64(raw: Option<&str>) -> Option<i64> {
    let value = non_empty(raw)?;
    value
        .parse::<i64>()
        .ok()
        .or_else(|| parse_f64(Some(value)).map(|v| v.trunc() as i64))
}

/// 金額欄位：截斷成整數，負數或無法解析時為 0
pub fn parse_money(raw: Option<&str>) -> i64 {
    parse_f64(raw)
        .map(f64::trunc)
        .filter(|v| *v > 0.0)
        .map(|v| v as i64)
        .unwrap_or(0)
}

/// `YYYY-MM-DD`，容許後面帶時間部分；無法解析時回傳 None
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let value = non_empty(raw)?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            value
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}
