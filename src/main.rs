use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::signal;
use weathertech_dashboard::config::{Config, ViewKind, load_dotenv};
use weathertech_dashboard::history::HistoryBrowser;
use weathertech_dashboard::input::HttpFetcher;
use weathertech_dashboard::presentation::LogPresenter;
use weathertech_dashboard::store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use weathertech_dashboard::{Dashboard, Result};

#[derive(Parser)]
#[command(name = "weathertech-dashboard")]
#[command(about = "Live telemetry dashboard for the WeatherTech station")]
struct Cli {
    /// Directory for cached view state
    #[arg(long, env = "DASHBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep view state in memory only
    #[arg(long)]
    no_cache: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run dashboard views until Ctrl+C (all views when none given)
    Run {
        views: Vec<String>,
    },
    /// Download the full history and write it as CSV
    Export {
        /// Output file, stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }

    let result = match cli.command.unwrap_or(Commands::Run { views: Vec::new() }) {
        Commands::Run { views } => run(config, views, cli.no_cache).await,
        Commands::Export { output } => export(&config, output).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config, views: Vec<String>, no_cache: bool) -> Result<()> {
    info!("Starting WeatherTech dashboard");
    info!(
        "  Broker: {}:{} (tls: {})",
        config.mqtt.broker_host, config.mqtt.broker_port, config.mqtt.use_tls
    );

    let store: Arc<dyn KeyValueStore> = if no_cache {
        info!("  Cache: disabled");
        Arc::new(MemoryKeyValueStore::new())
    } else {
        let store = FileKeyValueStore::new(config.storage.resolve_data_dir());
        info!("  Cache: {}", store.dir().display());
        Arc::new(store)
    };

    let names: Vec<String> = if views.is_empty() {
        ViewKind::iter().map(|k| k.to_string()).collect()
    } else {
        views
    };

    let dashboard = Dashboard::new(config, store, Arc::new(HttpFetcher::new()?));
    let mut handles = Vec::new();
    for name in &names {
        let handle = dashboard.start_view(name, Box::new(LogPresenter::new()))?;
        info!("  - view '{}' started", name);
        handles.push(handle);
    }

    info!("Dashboard is running, press Ctrl+C to exit");
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    for handle in handles {
        if handle.stop().await.is_none() {
            warn!("A view task ended abnormally");
        }
    }
    info!("WeatherTech dashboard stopped");
    Ok(())
}

async fn export(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let fetcher = HttpFetcher::new()?;
    let browser = HistoryBrowser::load(&fetcher, &config.api.history).await?;
    let stats = browser.stats();
    info!("[History] {} rows", stats.count);
    if let Some(avg) = stats.avg_temperature {
        info!("[History] avg temperature {:.1}", avg);
    }

    let csv = browser.to_csv();
    match output {
        Some(path) => {
            std::fs::write(&path, csv)?;
            info!("[History] written to {}", path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}
