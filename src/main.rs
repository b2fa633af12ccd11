//! marketbot — regional hull deal scanner.
//!
//! Entry point. Loads configuration, initialises structured logging, and
//! runs one of four modes: a one-shot scan (default), the periodic scan
//! service, the HTTP dashboard, or a market dump import.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use marketbot::catalog::{parse_hull_ids, Catalog, HullCatalog, ShipClass, UniverseCatalog};
use marketbot::config::{AppConfig, ScanOverrides};
use marketbot::dashboard::{self, DashboardState};
use marketbot::engine::{DealScanner, ScanService};
use marketbot::market::build_provider;
use marketbot::market::sqlite::SqliteMarket;
use marketbot::report;
use marketbot::universe::snapshot::try_load_graph;
use marketbot::universe::LocationGraph;

const BANNER: &str = r#"
 _ __ ___   __ _ _ __| | _____| |_| |__   ___ | |_
| '_ ` _ \ / _` | '__| |/ / _ \ __| '_ \ / _ \| __|
| | | | | | (_| | |  |   <  __/ |_| |_) | (_) | |_
|_| |_| |_|\__,_|_|  |_|\_\___|\__|_.__/ \___/ \__|

  Regional hull deal scanner v0.1.0
"#;

#[derive(Debug, Parser)]
#[command(name = "marketbot", version)]
#[command(about = "Find hulls listed near you for less than the trade hub price")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, short, default_value = "config.toml", env = "MARKETBOT_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a single scan and print the results (default).
    Scan(ScanArgs),
    /// Scan periodically until interrupted.
    Service {
        #[command(flatten)]
        scan: ScanArgs,
        /// Seconds between scans (overrides `[service].interval_secs`).
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Serve the JSON API.
    Serve {
        /// Listen port (overrides `[dashboard].port`).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Load a JSON market dump into the SQLite order database.
    Import {
        /// Dump file: an array of orders, native or ESI shaped.
        #[arg(long)]
        orders: PathBuf,
        /// Database url (overrides `[data].sqlite_url`).
        #[arg(long)]
        database: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Args)]
struct ScanArgs {
    /// Reference system name or id.
    #[arg(long)]
    system: Option<String>,
    /// Maximum jumps from the reference system.
    #[arg(long)]
    jumps: Option<u32>,
    /// Ignore listings cheaper than this (ISK).
    #[arg(long)]
    min_price: Option<f64>,
    /// Comma-separated hull type ids, e.g. "24692,642".
    #[arg(long)]
    hulls: Option<String>,
    /// battleship, cruiser or command_ship.
    #[arg(long)]
    ship_type: Option<String>,
    /// Do not write the JSON export.
    #[arg(long)]
    no_export: bool,
}

impl ScanArgs {
    /// Validate flags into overrides. Fails before any scan starts.
    fn overrides(&self) -> Result<ScanOverrides> {
        let hull_ids = self.hulls.as_deref().map(parse_hull_ids).transpose()?;
        let ship_type = self
            .ship_type
            .as_deref()
            .map(str::parse::<ShipClass>)
            .transpose()?;
        Ok(ScanOverrides {
            system: self.system.clone(),
            max_jumps: self.jumps,
            min_price: self.min_price,
            hull_ids,
            ship_type,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Scan(ScanArgs::default())) {
        Commands::Scan(args) => run_scan(cfg, args).await,
        Commands::Service {
            scan,
            interval_secs,
        } => run_service(cfg, scan, interval_secs).await,
        Commands::Serve { port } => run_serve(cfg, port).await,
        Commands::Import { orders, database } => run_import(cfg, &orders, database).await,
    }
}

fn load_config(path: &str) -> Result<AppConfig> {
    if Path::new(path).exists() {
        let cfg = AppConfig::load(path)?;
        info!(path, provider = ?cfg.data.provider, "Config loaded");
        Ok(cfg)
    } else {
        warn!(path, "Config file not found, using defaults");
        Ok(AppConfig::default())
    }
}

fn load_graph(cfg: &AppConfig) -> Option<Arc<LocationGraph>> {
    try_load_graph(&cfg.data.graph_path).map(Arc::new)
}

/// One-shot scan: print a table, optionally export.
async fn run_scan(cfg: AppConfig, args: ScanArgs) -> Result<()> {
    let overrides = args.overrides()?;
    let graph = load_graph(&cfg);
    let hulls = HullCatalog::new();
    let params = cfg.scan_params(&overrides, graph.as_deref(), &hulls)?;

    let (provider, remote) = build_provider(&cfg.data).await?;
    let catalog = offline_catalog(hulls, graph.clone(), remote);
    let mut scanner = DealScanner::new(provider, catalog, graph);

    let report = scanner.scan(&params).await;
    info!(%report, "Scan finished");
    println!(
        "{}",
        report::render_table(&report.deals, &report.reference_name, &params.hub.name)
    );

    if !args.no_export && cfg.export.enabled && !report.deals.is_empty() {
        let path = report::export_deals(&report.deals, &cfg.export.output_dir, &report.reference_name)?;
        println!("Saved deals to {}", path.display());
    }
    Ok(())
}

/// Periodic scans until ctrl-c.
async fn run_service(cfg: AppConfig, args: ScanArgs, interval_secs: Option<u64>) -> Result<()> {
    println!("{BANNER}");
    let overrides = args.overrides()?;
    // Fail fast on bad parameters rather than on every tick.
    cfg.scan_params(&overrides, load_graph(&cfg).as_deref(), &HullCatalog::new())?;

    let (provider, remote) = build_provider(&cfg.data).await?;
    let interval = Duration::from_secs(interval_secs.unwrap_or(cfg.service.interval_secs).max(1));
    let mut cfg = cfg;
    if args.no_export {
        cfg.export.enabled = false;
    }
    let service = ScanService::new(cfg, overrides, provider, remote).with_interval(interval);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Finishing current scan.");
            let _ = stop_tx.send(true);
        }
    });

    info!(
        interval_secs = interval.as_secs(),
        "Entering scan loop. Press Ctrl+C to stop."
    );
    let ticks = service.run(stop_rx).await;
    info!(ticks, "marketbot shut down cleanly.");
    Ok(())
}

/// HTTP dashboard until ctrl-c.
async fn run_serve(cfg: AppConfig, port: Option<u16>) -> Result<()> {
    println!("{BANNER}");
    let port = port.unwrap_or(cfg.dashboard.port);
    let graph = load_graph(&cfg);
    let (provider, remote) = build_provider(&cfg.data).await?;

    let state = Arc::new(DashboardState::new(cfg, provider, remote, graph));
    dashboard::serve(state, port, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received.");
    })
    .await
}

/// Import a dump into SQLite.
async fn run_import(cfg: AppConfig, orders: &Path, database: Option<String>) -> Result<()> {
    let url = database.unwrap_or(cfg.data.sqlite_url);
    let market = SqliteMarket::connect(&url).await?;
    let written = market.import_file(orders).await?;
    println!("Imported {written} orders into {url}");
    Ok(())
}

fn offline_catalog(
    hulls: HullCatalog,
    graph: Option<Arc<LocationGraph>>,
    remote: Option<Arc<dyn Catalog>>,
) -> Arc<dyn Catalog> {
    let catalog = UniverseCatalog::new(hulls, graph);
    match remote {
        Some(remote) => Arc::new(catalog.with_remote(remote)),
        None => Arc::new(catalog),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("marketbot=info"));

    let json_logging = std::env::var("MARKETBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
