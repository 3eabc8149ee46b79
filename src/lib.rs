pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::SqliteMovieStore;
pub use config::{cli::LocalFileSource, toml_config::ImportConfig, ImportSettings};
pub use core::{etl::ImportEngine, pipeline::MovieImportPipeline};
pub use domain::model::{ErrorRow, ImportSummary, MovieRecord};
pub use utils::error::{ImportError, Result};
