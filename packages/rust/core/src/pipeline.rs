//! End-to-end `ingest` pipeline: index → download → extract → assemble → store.
//!
//! Bulletins are processed one at a time. A bulletin that cannot be fetched or
//! parsed is logged and skipped; a failed database write aborts the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use veglytics_discovery::{BulletinClient, DownloadedBulletin, date_from_file_name};
use veglytics_extract::{DocumentLoader, extract_bulletin_tables};
use veglytics_shared::{
    AppConfig, BULLETIN_DATE_FORMAT, BulletinRef, ExtractionConfig, PriceRecord, Result,
    VeglyticsError,
};
use veglytics_storage::Storage;

use crate::assembler::assemble_records;

/// Configuration for [`run_ingest`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// How many of the newest bulletins to process.
    pub count: usize,
    /// Where downloaded PDFs are written.
    pub download_dir: PathBuf,
    pub extraction: ExtractionConfig,
}

impl From<&AppConfig> for IngestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            count: config.source.bulletin_count,
            download_dir: PathBuf::from(&config.source.download_dir),
            extraction: config.extraction.clone(),
        }
    }
}

/// Outcome of one processed bulletin.
#[derive(Debug, Clone, Serialize)]
pub struct BulletinReport {
    pub date: String,
    pub url: String,
    pub tables: usize,
    pub scanned_all: bool,
    pub rows_stored: usize,
}

/// Result of the `ingest` pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Ingest run identifier.
    pub run_id: String,
    /// Bulletins located on the index page.
    pub discovered: usize,
    /// Bulletins that were stored, newest first.
    pub bulletins: Vec<BulletinReport>,
    /// Bulletins abandoned after a download or extraction failure.
    pub skipped: usize,
    pub elapsed_ms: u64,
}

impl IngestReport {
    /// Total records written across all bulletins.
    pub fn rows_stored(&self) -> usize {
        self.bulletins.iter().map(|b| b.rows_stored).sum()
    }
}

/// Records extracted from one bulletin file.
#[derive(Debug, Clone)]
pub struct BulletinExtraction {
    pub date: String,
    pub tables: usize,
    pub scanned_all: bool,
    pub records: Vec<PriceRecord>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each bulletin is downloaded.
    fn bulletin_started(&self, date: &str, current: usize, total: usize);
    /// Called after a bulletin's records are stored.
    fn bulletin_stored(&self, report: &BulletinReport);
    /// Called when the pipeline completes.
    fn done(&self, report: &IngestReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn bulletin_started(&self, _date: &str, _current: usize, _total: usize) {}
    fn bulletin_stored(&self, _report: &BulletinReport) {}
    fn done(&self, _report: &IngestReport) {}
}

/// Run the full `ingest` pipeline.
///
/// 1. Locate the newest bulletins on the index page
/// 2. Download each PDF
/// 3. Score pages and extract tables (blocking pool)
/// 4. Assemble and upsert price records
/// 5. Record the bulletin and the run
#[instrument(skip_all, fields(count = config.count))]
pub async fn run_ingest(
    client: &BulletinClient,
    storage: &Storage,
    loader: Arc<dyn DocumentLoader>,
    config: &IngestConfig,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let start = Instant::now();
    let run_id = storage.insert_ingest_run().await?;
    info!(%run_id, backend = loader.backend_name(), "starting ingest run");

    let mut report = IngestReport {
        run_id,
        ..IngestReport::default()
    };

    // --- Phase 1: Discovery ---
    progress.phase("Reading bulletin index");
    let bulletins = match client.discover(config.count).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "bulletin index unavailable, nothing to ingest");
            Vec::new()
        }
    };
    report.discovered = bulletins.len();

    // --- Phase 2: Per-bulletin processing ---
    let total = bulletins.len();
    for (i, bulletin) in bulletins.iter().enumerate() {
        let date = bulletin.date_label();
        progress.bulletin_started(&date, i + 1, total);

        let Some((downloaded, extraction)) =
            acquire(client, bulletin, loader.clone(), config).await
        else {
            report.skipped += 1;
            continue;
        };

        // Persistence failures abort the run, closing it with the error.
        let rows_stored = match store_bulletin(storage, bulletin, &downloaded, &extraction).await {
            Ok(rows) => rows,
            Err(e) => {
                report.elapsed_ms = start.elapsed().as_millis() as u64;
                let mut stats = run_stats(&report);
                stats["error"] = serde_json::Value::String(e.to_string());
                if let Err(close) = storage
                    .finish_ingest_run(&report.run_id, &stats.to_string())
                    .await
                {
                    warn!(run_id = %report.run_id, error = %close, "could not close failed ingest run");
                }
                return Err(e);
            }
        };

        info!(date = %date, rows_stored, tables = extraction.tables, "bulletin stored");
        let bulletin_report = BulletinReport {
            date,
            url: bulletin.url.clone(),
            tables: extraction.tables,
            scanned_all: extraction.scanned_all,
            rows_stored,
        };
        progress.bulletin_stored(&bulletin_report);
        report.bulletins.push(bulletin_report);
    }

    // --- Phase 3: Run bookkeeping ---
    report.elapsed_ms = start.elapsed().as_millis() as u64;
    storage
        .finish_ingest_run(&report.run_id, &run_stats(&report).to_string())
        .await?;

    progress.done(&report);

    info!(
        run_id = %report.run_id,
        processed = report.bulletins.len(),
        skipped = report.skipped,
        rows_stored = report.rows_stored(),
        elapsed_ms = report.elapsed_ms,
        "ingest run complete"
    );

    Ok(report)
}

/// Summary stored with the ingest run.
fn run_stats(report: &IngestReport) -> serde_json::Value {
    serde_json::json!({
        "discovered": report.discovered,
        "processed": report.bulletins.len(),
        "skipped": report.skipped,
        "rows_stored": report.rows_stored(),
        "elapsed_ms": report.elapsed_ms,
    })
}

/// Upsert a bulletin's records and log the bulletin; returns the row count.
async fn store_bulletin(
    storage: &Storage,
    bulletin: &BulletinRef,
    downloaded: &DownloadedBulletin,
    extraction: &BulletinExtraction,
) -> Result<usize> {
    for record in &extraction.records {
        storage.upsert_price(record).await?;
    }
    let rows_stored = extraction.records.len();
    storage
        .record_bulletin(
            &bulletin.date_label(),
            &bulletin.url,
            &downloaded.sha256,
            rows_stored as u64,
        )
        .await?;
    Ok(rows_stored)
}

/// Download and extract one bulletin, logging and swallowing failures.
async fn acquire(
    client: &BulletinClient,
    bulletin: &BulletinRef,
    loader: Arc<dyn DocumentLoader>,
    config: &IngestConfig,
) -> Option<(DownloadedBulletin, BulletinExtraction)> {
    let date = bulletin.date_label();

    let downloaded = match client.download(bulletin, &config.download_dir).await {
        Ok(d) => d,
        Err(e) => {
            warn!(date = %date, url = %bulletin.url, error = %e, "download failed, skipping bulletin");
            return None;
        }
    };

    match extract_file(
        loader,
        downloaded.path.clone(),
        date.clone(),
        config.extraction.clone(),
    )
    .await
    {
        Ok(extraction) => Some((downloaded, extraction)),
        Err(e) => {
            warn!(date = %date, path = %downloaded.path.display(), error = %e, "extraction failed, skipping bulletin");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Single-file extraction
// ---------------------------------------------------------------------------

/// Load a bulletin PDF and assemble its price records without storing them.
///
/// Parsing runs on the blocking pool.
pub async fn extract_file(
    loader: Arc<dyn DocumentLoader>,
    path: PathBuf,
    date: String,
    config: ExtractionConfig,
) -> Result<BulletinExtraction> {
    tokio::task::spawn_blocking(move || {
        let document = loader.load(&path)?;
        let report = extract_bulletin_tables(&document, &config);
        let records: Vec<PriceRecord> = report
            .tables
            .iter()
            .flat_map(|t| assemble_records(&t.table, &date))
            .collect();
        debug!(
            path = %path.display(),
            tables = report.tables.len(),
            records = records.len(),
            "bulletin extracted"
        );
        Ok(BulletinExtraction {
            date,
            tables: report.tables.len(),
            scanned_all: report.scanned_all,
            records,
        })
    })
    .await
    .map_err(|e| VeglyticsError::Extraction(format!("extraction task failed: {e}")))?
}

/// Decide the bulletin date for a local file.
///
/// An explicit `DD-MM-YYYY` date wins; otherwise the date is read from a
/// `prices_DD-MM-YYYY.pdf` file name, falling back to today.
pub fn resolve_bulletin_date(path: &Path, explicit: Option<&str>) -> Result<String> {
    if let Some(raw) = explicit {
        return normalize_bulletin_date(raw);
    }
    let date = date_from_file_name(path).unwrap_or_else(|| Local::now().date_naive());
    Ok(date.format(BULLETIN_DATE_FORMAT).to_string())
}

/// Parse a user-supplied `DD-MM-YYYY` date into its zero-padded stored form.
pub fn normalize_bulletin_date(raw: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(raw.trim(), BULLETIN_DATE_FORMAT).map_err(|e| {
        VeglyticsError::validation(format!("invalid date '{raw}', expected DD-MM-YYYY: {e}"))
    })?;
    Ok(date.format(BULLETIN_DATE_FORMAT).to_string())
}
