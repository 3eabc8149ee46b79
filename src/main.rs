use anyhow::Context;
use clap::Parser;
use movie_import::utils::error::ErrorSeverity;
use movie_import::utils::logger;
use movie_import::utils::validation::{validate_path, validate_required_field, Validate};
use movie_import::{
    CliConfig, ImportConfig, ImportEngine, ImportSummary, LocalFileSource,
    MovieImportPipeline, Result, SqliteMovieStore,
};

fn load_config(cli: &CliConfig) -> Result<ImportConfig> {
    let mut config = match &cli.config {
        Some(path) => ImportConfig::from_file(path)?,
        None => ImportConfig::default(),
    };
    config.apply_cli(cli);
    validate_path("input", &cli.input.to_string_lossy())?;
    config.validate()?;
    Ok(config)
}

async fn execute(cli: &CliConfig, config: ImportConfig) -> Result<Option<ImportSummary>> {
    let database_url = validate_required_field(
        "database.url",
        &config.database.as_ref().map(|d| d.url.clone()),
    )?
    .clone();

    let store = SqliteMovieStore::connect(&database_url, config.max_connections()).await?;
    if config.create_schema() {
        store.ensure_schema().await?;
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let source = LocalFileSource::new(cli.input.clone());
    let pipeline = MovieImportPipeline::new(store, config);
    let engine = ImportEngine::new_with_monitoring(pipeline, source, monitor_enabled);

    if cli.validate_only {
        engine.validate_only().await?;
        return Ok(None);
    }

    engine.run().await.map(Some)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = load_config(&cli);
    let json_logs = cli.json_logs || config.as_ref().map(|c| c.json_logs()).unwrap_or(false);

    // 初始化日誌
    if json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting movie-import");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    match execute(&cli, config).await {
        Ok(Some(summary)) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to render import summary")?
            );
            if !summary.success {
                tracing::error!("❌ No records were imported");
                std::process::exit(1);
            }
            if summary.has_errors() {
                tracing::warn!(
                    "⚠️ Import finished with {} failed rows",
                    summary.error_count
                );
            } else {
                tracing::info!("✅ Import completed successfully!");
            }
        }
        Ok(None) => {
            tracing::info!("✅ CSV headers are valid");
            println!("✅ CSV headers are valid");
        }
        Err(e) => {
            tracing::error!(
                "❌ Import failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
