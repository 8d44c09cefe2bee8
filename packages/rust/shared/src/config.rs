//! Application configuration for Veglytics.
//!
//! User config lives at `~/.veglytics/veglytics.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeglyticsError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "veglytics.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".veglytics";

// ---------------------------------------------------------------------------
// Config structs (matching veglytics.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where bulletins are published and how they are fetched.
    #[serde(default)]
    pub source: SourceConfig,

    /// Price database location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Table extraction tuning.
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing page that links every published bulletin.
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Base URL relative PDF links are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Title text that precedes each bulletin date on the index page.
    #[serde(default = "default_bulletin_title")]
    pub bulletin_title: String,

    /// How many of the newest bulletins to ingest per run.
    #[serde(default = "default_bulletin_count")]
    pub bulletin_count: usize,

    /// Timeout for the index page request, in seconds.
    #[serde(default = "default_index_timeout")]
    pub index_timeout_secs: u64,

    /// Timeout for each PDF download, in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Directory downloaded PDFs are written to.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            base_url: default_base_url(),
            bulletin_title: default_bulletin_title(),
            bulletin_count: default_bulletin_count(),
            index_timeout_secs: default_index_timeout(),
            download_timeout_secs: default_download_timeout(),
            download_dir: default_download_dir(),
        }
    }
}

fn default_index_url() -> String {
    "https://www.harti.gov.lk/index.php/en/market-information/data-food-commodities-bulletin".into()
}
fn default_base_url() -> String {
    "https://www.harti.gov.lk".into()
}
fn default_bulletin_title() -> String {
    "Daily Food Commodities Bulletin".into()
}
fn default_bulletin_count() -> usize {
    7
}
fn default_index_timeout() -> u64 {
    25
}
fn default_download_timeout() -> u64 {
    40
}
fn default_download_dir() -> String {
    "downloads".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite price database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "veglytics.db".into()
}

/// `[extraction]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Number of best-scoring pages handed to table extraction.
    #[serde(default = "default_top_pages")]
    pub top_pages: usize,

    /// Tables with fewer rows than this are discarded.
    #[serde(default = "default_min_table_rows")]
    pub min_table_rows: usize,

    /// Tolerance for treating two ruling lines as intersecting.
    #[serde(default = "default_intersection_tolerance")]
    pub intersection_tolerance: f64,

    /// Tolerance for snapping near-parallel lines together.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f64,

    /// Tolerance for joining collinear line segments.
    #[serde(default = "default_join_tolerance")]
    pub join_tolerance: f64,

    /// Shortest ruling segment considered an edge.
    #[serde(default = "default_edge_min_length")]
    pub edge_min_length: f64,

    /// Minimum words required to infer a vertical edge.
    #[serde(default = "default_min_words")]
    pub min_words_vertical: usize,

    /// Minimum words required to infer a horizontal edge.
    #[serde(default = "default_min_words")]
    pub min_words_horizontal: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            top_pages: default_top_pages(),
            min_table_rows: default_min_table_rows(),
            intersection_tolerance: default_intersection_tolerance(),
            snap_tolerance: default_snap_tolerance(),
            join_tolerance: default_join_tolerance(),
            edge_min_length: default_edge_min_length(),
            min_words_vertical: default_min_words(),
            min_words_horizontal: default_min_words(),
        }
    }
}

fn default_top_pages() -> usize {
    2
}
fn default_min_table_rows() -> usize {
    3
}
fn default_intersection_tolerance() -> f64 {
    5.0
}
fn default_snap_tolerance() -> f64 {
    3.0
}
fn default_join_tolerance() -> f64 {
    3.0
}
fn default_edge_min_length() -> f64 {
    3.0
}
fn default_min_words() -> usize {
    1
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.veglytics/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| VeglyticsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.veglytics/veglytics.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| VeglyticsError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        VeglyticsError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| VeglyticsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| VeglyticsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| VeglyticsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs the pipeline cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    for (key, value) in [
        ("source.index_url", &config.source.index_url),
        ("source.base_url", &config.source.base_url),
    ] {
        url::Url::parse(value)
            .map_err(|e| VeglyticsError::config(format!("{key} '{value}' is not a URL: {e}")))?;
    }
    if config.source.bulletin_title.trim().is_empty() {
        return Err(VeglyticsError::config("source.bulletin_title must not be empty"));
    }
    if config.source.bulletin_count == 0 {
        return Err(VeglyticsError::config("source.bulletin_count must be at least 1"));
    }
    if config.extraction.top_pages == 0 {
        return Err(VeglyticsError::config("extraction.top_pages must be at least 1"));
    }
    Ok(())
}
