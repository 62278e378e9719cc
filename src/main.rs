use anyhow::{Context, Result};
use flashpoint_site::catalog::{CatalogStats, JsonCatalog};
use flashpoint_site::config::Config;
use flashpoint_site::scheduler;
use flashpoint_site::server::{self, AppState};
use flashpoint_site::site::Site;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let config_path = config_path_from_args();
    let config = Config::load(&config_path)?;
    let _log_guard = init_logging(&config)?;

    if config_path.is_file() {
        info!("Loaded config file {}", config_path.display());
    } else {
        info!("No config file at {}, using defaults", config_path.display());
    }

    let catalog = JsonCatalog::open(&config.catalog_file)
        .with_context(|| format!("Failed to open catalog {}", config.catalog_file.display()))?;
    let stats = CatalogStats::collect(&catalog)
        .await
        .context("Failed to collect catalog statistics")?;

    let addr = format!("{}:{}", config.host_name, config.http_port);
    let schedule = config.stats_refresh_schedule.clone();
    let site = Site::load(config, stats)?;

    let state = Arc::new(AppState::new(site, Arc::new(catalog)));
    let _scheduler = scheduler::start_scheduler(Arc::clone(&state), &schedule).await?;

    server::serve(state, &addr).await
}

/// `--config <path>`, defaulting to `config.json`.
fn config_path_from_args() -> PathBuf {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        }
    }
    PathBuf::from("config.json")
}

/// Console and optional file logging. The returned guard flushes the file
/// writer when dropped, so it must live as long as `main`.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive("flashpoint_site=info".parse()?);
    let console = config.log_to_console.then(fmt::layer);

    let (file, guard) = match &config.log_file {
        Some(log_file) => {
            let path = Path::new(log_file);
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("logFile {log_file} has no file name"))?;

            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}
