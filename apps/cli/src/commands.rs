//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use veglytics_core::analytics::{Direction, TrendPoint};
use veglytics_core::pipeline::{
    BulletinReport, IngestConfig, IngestReport, ProgressReporter, extract_file,
    resolve_bulletin_date, run_ingest,
};
use veglytics_core::queries::{self, CommodityReport, RECENT_DAYS};
use veglytics_discovery::{BulletinClient, DiscoveryOptions};
use veglytics_extract::PdfplumberLoader;
use veglytics_shared::{AppConfig, Market, init_config, load_config};
use veglytics_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Veglytics: daily vegetable prices from market bulletins.
#[derive(Parser)]
#[command(
    name = "veglytics",
    version,
    about = "Extract commodity prices from daily market bulletins and analyze them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Price database path (overrides `storage.db_path`).
    #[arg(long, global = true, env = "VEGLYTICS_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download the newest bulletins and store their prices.
    Ingest {
        /// Number of bulletins to process (overrides `source.bulletin_count`).
        #[arg(short, long)]
        count: Option<usize>,

        /// Directory for downloaded PDFs (overrides `source.download_dir`).
        #[arg(long)]
        downloads: Option<PathBuf>,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract prices from a local bulletin PDF without storing them.
    Extract {
        /// Bulletin PDF.
        pdf: PathBuf,

        /// Bulletin date as DD-MM-YYYY (defaults to the file name, then today).
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List the most recent bulletin dates in the database.
    Dates {
        #[arg(long, default_value_t = RECENT_DAYS)]
        limit: u32,

        #[arg(long)]
        json: bool,
    },

    /// List markets with stored prices.
    Markets {
        #[arg(long)]
        json: bool,
    },

    /// List commodities with stored prices.
    Commodities {
        #[arg(long)]
        json: bool,
    },

    /// Show a market's prices with the change since the previous bulletin.
    Prices {
        /// Market name, e.g. Dambulla.
        #[arg(short, long)]
        market: Market,

        /// Bulletin date as DD-MM-YYYY (defaults to the latest).
        #[arg(long)]
        date: Option<String>,

        /// Only commodities containing this text.
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Day-over-day price change for a commodity.
    Analyze {
        commodity: String,

        #[arg(short, long, default_value = "Dambulla")]
        market: Market,

        #[arg(long)]
        json: bool,
    },

    /// Price history and weekly trend for a commodity.
    Trend {
        commodity: String,

        #[arg(short, long, default_value = "Dambulla")]
        market: Market,

        /// Number of records to show.
        #[arg(long, default_value_t = RECENT_DAYS)]
        days: u32,

        #[arg(long)]
        json: bool,
    },

    /// Price volatility over the last week.
    Volatility {
        commodity: String,

        #[arg(short, long, default_value = "Dambulla")]
        market: Market,

        #[arg(long)]
        json: bool,
    },

    /// Compare a commodity's latest price across markets.
    Compare {
        commodity: String,

        /// Comma-separated markets (defaults to all).
        #[arg(long, value_delimiter = ',')]
        markets: Vec<Market>,

        #[arg(long)]
        json: bool,
    },

    /// Best market to sell in and whether to sell now.
    Recommend {
        commodity: String,

        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "veglytics=info",
        1 => "veglytics=debug",
        _ => "veglytics=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Ingest {
            count,
            downloads,
            json,
        } => cmd_ingest(db.as_deref(), count, downloads, json).await,
        Command::Extract { pdf, date, json } => cmd_extract(&pdf, date.as_deref(), json).await,
        Command::Dates { limit, json } => cmd_dates(db.as_deref(), limit, json).await,
        Command::Markets { json } => cmd_markets(db.as_deref(), json).await,
        Command::Commodities { json } => cmd_commodities(db.as_deref(), json).await,
        Command::Prices {
            market,
            date,
            search,
            json,
        } => cmd_prices(db.as_deref(), market, date.as_deref(), search.as_deref(), json).await,
        Command::Analyze {
            commodity,
            market,
            json,
        } => cmd_analyze(db.as_deref(), &commodity, market, json).await,
        Command::Trend {
            commodity,
            market,
            days,
            json,
        } => cmd_trend(db.as_deref(), &commodity, market, days, json).await,
        Command::Volatility {
            commodity,
            market,
            json,
        } => cmd_volatility(db.as_deref(), &commodity, market, json).await,
        Command::Compare {
            commodity,
            markets,
            json,
        } => cmd_compare(db.as_deref(), &commodity, &markets, json).await,
        Command::Recommend { commodity, json } => {
            cmd_recommend(db.as_deref(), &commodity, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn db_path(config: &AppConfig, flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.storage.db_path))
}

/// Open the price database read-only for query commands.
async fn open_for_query(flag: Option<&Path>) -> Result<Storage> {
    let config = load_config()?;
    Ok(Storage::open_readonly(&db_path(&config, flag)).await?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn price(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// Print a report's "not enough data" message; returns true if printed.
fn print_missing<T>(report: &CommodityReport<T>) -> bool {
    match (&report.result, report.message) {
        (None, Some(message)) => {
            println!("  {}: {message}", report.commodity);
            true
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Ingest / extract
// ---------------------------------------------------------------------------

async fn cmd_ingest(
    db: Option<&Path>,
    count: Option<usize>,
    downloads: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;

    let mut ingest = IngestConfig::from(&config);
    if let Some(n) = count {
        if n == 0 {
            return Err(eyre!("--count must be at least 1"));
        }
        ingest.count = n;
    }
    if let Some(dir) = downloads {
        ingest.download_dir = dir;
    }

    let db_path = db_path(&config, db);
    let client = BulletinClient::new(DiscoveryOptions::from_config(&config.source)?)?;
    let storage = Storage::open(&db_path).await?;

    info!(
        count = ingest.count,
        db = %db_path.display(),
        downloads = %ingest.download_dir.display(),
        "ingesting bulletins"
    );

    let reporter = CliProgress::new();
    let report = run_ingest(
        &client,
        &storage,
        Arc::new(PdfplumberLoader::new()),
        &ingest,
        &reporter,
    )
    .await?;

    if json {
        return print_json(&report);
    }

    println!();
    if report.bulletins.is_empty() {
        println!("  No bulletins ingested ({} found, {} skipped).", report.discovered, report.skipped);
    } else {
        println!("  {:<12} {:>7} {:>6}  {}", "Date", "Tables", "Rows", "Source");
        for b in &report.bulletins {
            let scan = if b.scanned_all { " (full scan)" } else { "" };
            println!("  {:<12} {:>7} {:>6}  {}{scan}", b.date, b.tables, b.rows_stored, b.url);
        }
        println!();
        println!("  Bulletins: {} stored, {} skipped", report.bulletins.len(), report.skipped);
        println!("  Rows:      {}", report.rows_stored());
    }
    println!("  Database:  {}", db_path.display());
    println!("  Time:      {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();

    Ok(())
}

async fn cmd_extract(pdf: &Path, date: Option<&str>, json: bool) -> Result<()> {
    if !pdf.is_file() {
        return Err(eyre!("no such file: {}", pdf.display()));
    }
    let config = load_config()?;
    let date = resolve_bulletin_date(pdf, date)?;

    let extraction = extract_file(
        Arc::new(PdfplumberLoader::new()),
        pdf.to_path_buf(),
        date,
        config.extraction.clone(),
    )
    .await?;

    if json {
        return print_json(&extraction.records);
    }

    println!(
        "  {} ({} tables{}), {} records",
        extraction.date,
        extraction.tables,
        if extraction.scanned_all { ", full scan" } else { "" },
        extraction.records.len()
    );
    for r in &extraction.records {
        println!(
            "  {:<24} {:<13} {:>12} {:>10}",
            r.commodity,
            r.market.as_str(),
            r.raw_price,
            price(r.price_avg)
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn bulletin_started(&self, date: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] bulletin {date}"));
    }

    fn bulletin_stored(&self, report: &BulletinReport) {
        self.spinner.println(format!(
            "  stored {} rows from {}",
            report.rows_stored, report.date
        ));
    }

    fn done(&self, _report: &IngestReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

async fn cmd_dates(db: Option<&Path>, limit: u32, json: bool) -> Result<()> {
    let storage = open_for_query(db).await?;
    let dates = storage.latest_dates(limit).await?;
    if json {
        return print_json(&serde_json::json!({ "dates": dates }));
    }
    for d in &dates {
        println!("{d}");
    }
    Ok(())
}

async fn cmd_markets(db: Option<&Path>, json: bool) -> Result<()> {
    let storage = open_for_query(db).await?;
    let markets = storage.list_markets().await?;
    if json {
        return print_json(&markets);
    }
    for m in &markets {
        println!("{m}");
    }
    Ok(())
}

async fn cmd_commodities(db: Option<&Path>, json: bool) -> Result<()> {
    let storage = open_for_query(db).await?;
    let commodities = storage.list_commodities().await?;
    if json {
        return print_json(&commodities);
    }
    for c in &commodities {
        println!("{c}");
    }
    Ok(())
}

async fn cmd_prices(
    db: Option<&Path>,
    market: Market,
    date: Option<&str>,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    let storage = open_for_query(db).await?;
    let listing = queries::market_listing(&storage, market, date, search).await?;
    if json {
        return print_json(&listing);
    }

    let Some(date) = &listing.date else {
        println!("  No prices stored yet. Run `veglytics ingest` first.");
        return Ok(());
    };
    println!(
        "  {} on {date} (vs {})",
        listing.market,
        listing.prev_date.as_deref().unwrap_or("-")
    );
    println!("  {:<24} {:>14} {:>10} {:>9}", "Commodity", "Price", "Avg", "Change");
    for item in &listing.items {
        let arrow = match item.direction {
            Direction::Up => "▲",
            Direction::Down => "▼",
            Direction::Same => " ",
        };
        let change = item
            .change_pct
            .map_or_else(|| "-".to_string(), |p| format!("{p:+.1}%"));
        println!(
            "  {:<24} {:>14} {:>10} {:>8} {arrow}",
            item.commodity,
            item.raw_price.as_deref().unwrap_or("-"),
            price(item.price_avg),
            change
        );
    }
    println!("  {} items", listing.items.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

async fn cmd_analyze(db: Option<&Path>, commodity: &str, market: Market, json: bool) -> Result<()> {
    let storage = open_for_query(db).await?;
    let report = queries::analyze(&storage, commodity, market).await?;
    if json {
        return print_json(&report);
    }
    if print_missing(&report) {
        return Ok(());
    }
    if let Some(r) = &report.result {
        println!("  {commodity} at {market}");
        println!("  {}: {:.2}", r.today.date, r.today.price_avg);
        println!("  {}: {:.2}", r.yesterday.date, r.yesterday.price_avg);
        println!("  Change: {:+.2}% ({:?})", r.change_percent, r.trend);
    }
    Ok(())
}

async fn cmd_trend(
    db: Option<&Path>,
    commodity: &str,
    market: Market,
    days: u32,
    json: bool,
) -> Result<()> {
    let storage = open_for_query(db).await?;
    let points = queries::trend_points(&storage, commodity, market, days).await?;
    let summary = queries::week_trend(&storage, commodity, market).await?;

    if json {
        #[derive(Serialize)]
        struct TrendOutput<'a, T: Serialize> {
            points: &'a [TrendPoint],
            summary: &'a T,
        }
        return print_json(&TrendOutput {
            points: &points,
            summary: &summary,
        });
    }

    println!("  {commodity} at {market}");
    for p in &points {
        println!("  {:<12} {:>10}  {}", p.date, price(p.price_avg), p.raw_price);
    }
    if !print_missing(&summary) {
        if let Some(w) = &summary.result {
            println!(
                "  {}-day average {:.2}, change {:+.2}% ({:?})",
                w.days, w.average_price, w.week_change_percent, w.trend
            );
        }
    }
    Ok(())
}

async fn cmd_volatility(
    db: Option<&Path>,
    commodity: &str,
    market: Market,
    json: bool,
) -> Result<()> {
    let storage = open_for_query(db).await?;
    let report = queries::volatility(&storage, commodity, market).await?;
    if json {
        return print_json(&report);
    }
    if print_missing(&report) {
        return Ok(());
    }
    if let Some(v) = &report.result {
        println!("  {commodity} at {market} over {} days", v.days_used);
        println!("  Average:    {:.2}", v.average_price);
        println!("  Volatility: {:.2}% ({:?} risk)", v.volatility_percent, v.risk_level);
    }
    Ok(())
}

async fn cmd_compare(
    db: Option<&Path>,
    commodity: &str,
    markets: &[Market],
    json: bool,
) -> Result<()> {
    let markets = if markets.is_empty() {
        &Market::ALL[..]
    } else {
        markets
    };
    let storage = open_for_query(db).await?;
    let comparison = queries::compare(&storage, commodity, markets).await?;
    if json {
        return print_json(&comparison);
    }

    let Some(date) = &comparison.date else {
        println!("  No prices stored yet. Run `veglytics ingest` first.");
        return Ok(());
    };
    println!("  {commodity} on {date}");
    for q in &comparison.markets {
        println!(
            "  {:<13} {:>14} {:>10}",
            q.market.as_str(),
            q.raw_price.as_deref().unwrap_or("-"),
            price(q.price_avg)
        );
    }
    Ok(())
}

async fn cmd_recommend(db: Option<&Path>, commodity: &str, json: bool) -> Result<()> {
    let storage = open_for_query(db).await?;
    let report = queries::recommend(&storage, commodity).await?;
    if json {
        return print_json(&report);
    }
    if print_missing(&report) {
        return Ok(());
    }
    if let Some(r) = &report.result {
        println!("  {commodity}");
        for m in &r.all_markets {
            println!("  {:<13} {:>10.2}", m.market.as_str(), m.price_avg);
        }
        println!(
            "  Best market: {} ({:.2}), {:.2} above {} [{:?} confidence]",
            r.best_market, r.best_price, r.price_difference, r.worst_market, r.confidence
        );
        println!("  Advice: {} ({})", r.advice, r.advice_reason);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_markets_and_flags() {
        let cli = Cli::try_parse_from([
            "veglytics",
            "compare",
            "Tomato",
            "--markets",
            "colombo,nuwara-eliya",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Compare {
                commodity,
                markets,
                json,
            } => {
                assert_eq!(commodity, "Tomato");
                assert_eq!(markets, vec![Market::Colombo, Market::NuwaraEliya]);
                assert!(json);
            }
            _ => panic!("expected compare"),
        }

        let cli = Cli::try_parse_from(["veglytics", "-vv", "analyze", "Carrot"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Analyze {
                market: Market::Dambulla,
                ..
            }
        ));

        assert!(Cli::try_parse_from(["veglytics", "prices", "--market", "Galle"]).is_err());
    }

    #[test]
    fn db_flag_overrides_config() {
        let config = AppConfig::default();
        assert_eq!(db_path(&config, None), PathBuf::from("veglytics.db"));
        assert_eq!(
            db_path(&config, Some(Path::new("/data/prices.db"))),
            PathBuf::from("/data/prices.db")
        );
    }
}
