mod config;
mod logging;
mod model;
mod normalizer;
mod notifier;
mod parser;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use clap::Parser as _;
use config::load_config;
use logging::init_logging;
use model::Platform;
use notifier::{NotifierSecrets, build_notifier};
use pipeline::Pipeline;
use crate::scraper::{HttpScraper, Scraper};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use storage::SqliteStorage;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

/// Collects storefront prices for the configured products and locations.
#[derive(Debug, clap::Parser)]
#[command(name = "price-aggregator", version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Run a single pass even if `check_interval_seconds` is set
    #[arg(long)]
    once: bool,

    /// `all`, or platform names separated by commas (e.g. `amazon,croma`)
    platforms: Option<String>,
}

/// `None` means no restriction.
fn parse_selection(arg: Option<&str>) -> Result<Option<Vec<Platform>>, String> {
    let Some(arg) = arg.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    if arg.eq_ignore_ascii_case("all") {
        return Ok(None);
    }

    let mut selected = Vec::new();
    for name in arg.split([',', ' ']).filter(|n| !n.is_empty()) {
        let platform = Platform::from_name(name).ok_or_else(|| format!("unknown platform '{}'", name))?;
        if !selected.contains(&platform) {
            selected.push(platform);
        }
    }
    Ok(Some(selected))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let cli = Cli::parse();

    // Logging is configured from the file, so these two report on stderr.
    let selection = match parse_selection(cli.platforms.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    let config = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Config load error: {}", e);
            return;
        }
    };

    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to open log directory {}: {}", config.logging.directory, e);
            return;
        }
    };

    let platforms = config.active_platforms(selection.as_deref());
    if platforms.is_empty() {
        warn!("No platforms to run in {:?} mode with the current selection", config.mode);
        return;
    }
    info!("Platforms to process: {:?}", platforms);

    let base_scraper = match HttpScraper::new(platforms[0], config.mode, config.request_delay_ms) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };
    let scrapers: HashMap<Platform, Box<dyn Scraper>> = platforms
        .iter()
        .map(|&p| (p, Box::new(base_scraper.for_platform(p)) as Box<dyn Scraper>))
        .collect();

    let storage = match SqliteStorage::new(&config.database_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return;
        }
    };
    info!("Database table 'products' is ready.");

    let secrets = NotifierSecrets {
        smtp_password: env::var("SMTP_PASSWORD").ok(),
        telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
    };
    let notifier = match build_notifier(&config.notifier, secrets) {
        Ok(n) => Arc::from(n),
        Err(e) => {
            error!("Failed to initialize notifier: {}", e);
            return;
        }
    };

    let pipeline = Pipeline {
        storage,
        notifier,
        scrapers,
        debug_dir: PathBuf::from("logs/html"),
    };

    loop {
        let today = chrono::Local::now().date_naive();
        pipeline.run_cycle(&config, &platforms, today).await;
        match pipeline.storage.lock().await.count() {
            Ok(rows) => info!("{} rows in {}", rows, config.database_path),
            Err(e) => warn!("Failed to count stored rows: {}", e),
        }

        let Some(interval) = config.check_interval_seconds.filter(|_| !cli.once) else {
            break;
        };

        info!("Waiting {}s before the next run...", interval);
        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {
                info!("Timer triggered.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down.");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_accepts_all_and_lists() {
        assert_eq!(parse_selection(None), Ok(None));
        assert_eq!(parse_selection(Some("ALL")), Ok(None));
        assert_eq!(
            parse_selection(Some("amazon,croma amazon")),
            Ok(Some(vec![Platform::Amazon, Platform::Croma]))
        );
    }

    #[test]
    fn selection_rejects_unknown_names() {
        assert!(parse_selection(Some("amazon,ebay")).is_err());
    }
}
