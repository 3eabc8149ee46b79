use crate::config::{
    ImportSettings, DEFAULT_BATCH_SIZE, DEFAULT_KEEP_ALIVE_SECONDS, DEFAULT_MAX_ERROR_SAMPLES,
    DEFAULT_MAX_RETRIES, DEFAULT_PROGRESS_INTERVAL_SECONDS, DEFAULT_RETRY_DELAY_MS,
};
use crate::core::ConfigProvider;
use crate::domain::ports::CsvOptions;
use crate::utils::error::{ImportError, Result};
use crate::utils::validation::{validate_database_url, validate_single_byte, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub csv: CsvSection,
    pub database: Option<DatabaseConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSection {
    pub batch_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub keep_alive_seconds: Option<u64>,
    pub progress_interval_seconds: Option<u64>,
    pub max_error_samples: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvSection {
    pub delimiter: Option<String>,
    pub quote: Option<String>,
    /// 空字串表示停用跳脫字元
    pub escape: Option<String>,
    pub buffer_capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub create_schema: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl ImportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ImportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ImportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATABASE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ImportError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn csv_byte(field: &str, value: &Option<String>, default: u8) -> Result<u8> {
        match value {
            Some(v) => validate_single_byte(field, v),
            None => Ok(default),
        }
    }

    /// 解析 CSV 設定；字元設定錯誤時回傳錯誤
    pub fn try_csv_options(&self) -> Result<CsvOptions> {
        let defaults = CsvOptions::default();
        let escape = match self.csv.escape.as_deref() {
            None => defaults.escape,
            Some("") => None,
            Some(v) => Some(validate_single_byte("csv.escape", v)?),
        };

        Ok(CsvOptions {
            delimiter: Self::csv_byte("csv.delimiter", &self.csv.delimiter, defaults.delimiter)?,
            quote: Self::csv_byte("csv.quote", &self.csv.quote, defaults.quote)?,
            escape,
            buffer_capacity: self.csv.buffer_capacity.unwrap_or(defaults.buffer_capacity),
        })
    }

    /// 取得資料庫 URL
    pub fn database_url(&self) -> Option<&str> {
        self.database.as_ref().map(|d| d.url.as_str())
    }

    pub fn max_connections(&self) -> u32 {
        self.database
            .as_ref()
            .and_then(|d| d.max_connections)
            .unwrap_or(5)
    }

    pub fn create_schema(&self) -> bool {
        self.database
            .as_ref()
            .and_then(|d| d.create_schema)
            .unwrap_or(true)
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    /// 轉成管線使用的設定值
    pub fn settings(&self) -> Result<ImportSettings> {
        Ok(ImportSettings {
            batch_size: self.batch_size(),
            max_retries: self.max_retries(),
            retry_delay: self.retry_delay(),
            keep_alive_interval: self.keep_alive_interval(),
            progress_interval: self.progress_interval(),
            max_error_samples: self.max_error_samples(),
            csv: self.try_csv_options()?,
        })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(url) = self.database_url() {
            validate_database_url("database.url", url)?;
        }
        if let Some(database) = &self.database {
            if database.max_connections == Some(0) {
                return Err(ImportError::InvalidConfigValueError {
                    field: "database.max_connections".to_string(),
                    value: "0".to_string(),
                    reason: "At least one connection is required".to_string(),
                });
            }
        }
        self.settings()?.validate()
    }
}

#[cfg(feature = "cli")]
impl ImportConfig {
    /// 命令列參數優先於 TOML 檔案
    pub fn apply_cli(&mut self, cli: &crate::config::CliConfig) {
        if let Some(url) = &cli.database_url {
            match self.database.as_mut() {
                Some(database) => database.url = url.clone(),
                None => {
                    self.database = Some(DatabaseConfig {
                        url: url.clone(),
                        max_connections: None,
                        create_schema: None,
                    })
                }
            }
        }
        if cli.batch_size.is_some() {
            self.import.batch_size = cli.batch_size;
        }
        if cli.max_retries.is_some() {
            self.import.max_retries = cli.max_retries;
        }
        if cli.monitor || cli.json_logs {
            let monitoring = self.monitoring.get_or_insert(MonitoringConfig {
                enabled: false,
                json_logs: None,
            });
            monitoring.enabled |= cli.monitor;
            if cli.json_logs {
                monitoring.json_logs = Some(true);
            }
        }
    }
}

impl ConfigProvider for ImportConfig {
    fn batch_size(&self) -> usize {
        self.import.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    fn max_retries(&self) -> u32 {
        self.import.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.import.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(
            self.import
                .keep_alive_seconds
                .unwrap_or(DEFAULT_KEEP_ALIVE_SECONDS),
        )
    }

    fn progress_interval(&self) -> Duration {
        Duration::from_secs(
            self.import
                .progress_interval_seconds
                .unwrap_or(DEFAULT_PROGRESS_INTERVAL_SECONDS),
        )
    }

    fn max_error_samples(&self) -> usize {
        self.import
            .max_error_samples
            .unwrap_or(DEFAULT_MAX_ERROR_SAMPLES)
    }

    fn csv_options(&self) -> CsvOptions {
        // 無效的字元設定在 validate 階段就會被擋下
        self.try_csv_options().unwrap_or_default()
    }
}

impl Validate for ImportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
