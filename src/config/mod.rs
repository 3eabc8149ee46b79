pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::ports::CsvOptions;
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, validate_range, Validate};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_KEEP_ALIVE_SECONDS: u64 = 30;
pub const DEFAULT_PROGRESS_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_MAX_ERROR_SAMPLES: usize = 10;

/// 管線執行時使用的設定值
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub keep_alive_interval: Duration,
    pub progress_interval: Duration,
    pub max_error_samples: usize,
    pub csv: CsvOptions,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            keep_alive_interval: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECONDS),
            progress_interval: Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECONDS),
            max_error_samples: DEFAULT_MAX_ERROR_SAMPLES,
            csv: CsvOptions::default(),
        }
    }
}

impl ConfigProvider for ImportSettings {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    fn keep_alive_interval(&self) -> Duration {
        self.keep_alive_interval
    }

    fn progress_interval(&self) -> Duration {
        self.progress_interval
    }

    fn max_error_samples(&self) -> usize {
        self.max_error_samples
    }

    fn csv_options(&self) -> CsvOptions {
        self.csv
    }
}

impl Validate for ImportSettings {
    fn validate(&self) -> Result<()> {
        validate_positive_number("import.batch_size", self.batch_size, 1)?;
        validate_range("import.max_retries", self.max_retries, 1, 20)?;
        validate_positive_number("csv.buffer_capacity", self.csv.buffer_capacity, 1024)?;
        if self.keep_alive_interval < Duration::from_secs(1) {
            return Err(crate::utils::error::ImportError::InvalidConfigValueError {
                field: "import.keep_alive_seconds".to_string(),
                value: format!("{:?}", self.keep_alive_interval),
                reason: "Keep-alive interval must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
pub use cli_args::CliConfig;

#[cfg(feature = "cli")]
mod cli_args {
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "movie-import")]
    #[command(about = "Stream a movie CSV export into the movie database")]
    pub struct CliConfig {
        /// CSV file to import
        #[arg(short, long)]
        pub input: PathBuf,

        /// Optional TOML configuration file
        #[arg(short, long)]
        pub config: Option<PathBuf>,

        /// Database URL, overrides [database].url
        #[arg(long, env = "DATABASE_URL")]
        pub database_url: Option<String>,

        #[arg(long)]
        pub batch_size: Option<usize>,

        #[arg(long)]
        pub max_retries: Option<u32>,

        /// Only check the header row, do not import
        #[arg(long)]
        pub validate_only: bool,

        /// Emit JSON log lines
        #[arg(long)]
        pub json_logs: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage during the import")]
        pub monitor: bool,
    }
}
