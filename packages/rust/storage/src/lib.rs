//! libSQL storage layer (embedded, offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding extracted prices,
//! the bulletins they came from, and the history of ingest runs.
//!
//! **Access rules:**
//! - `veglytics ingest`: read-write (sole writer) via [`Storage::open`]
//! - query and analytics commands: read-only via [`Storage::open_readonly`]
//!
//! Dates are stored as `DD-MM-YYYY` text, so every "newest first" ordering
//! sorts on [`DATE_SORT_KEY`] rather than the raw column.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use uuid::Uuid;
use veglytics_shared::{DatedPrice, Market, MarketPrice, PriceRecord, Result, VeglyticsError};

/// SQL expression turning a `DD-MM-YYYY` date column into a sortable `YYYYMMDD`.
pub const DATE_SORT_KEY: &str = "substr(date,7,4)||substr(date,4,2)||substr(date,1,2)";

fn db_err(e: libsql::Error) -> VeglyticsError {
    VeglyticsError::Storage(e.to_string())
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// A processed bulletin as recorded by the ingest pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinRecord {
    pub date: String,
    pub url: String,
    pub sha256: String,
    pub rows_stored: u64,
    pub ingested_at: String,
}

/// One ingest invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRun {
    pub id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub stats_json: Option<String>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| VeglyticsError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VeglyticsError::Storage(format!(
                "database not found at {}; run `veglytics ingest` first",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        VeglyticsError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(VeglyticsError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Price writes
    // -----------------------------------------------------------------------

    /// Insert a price, replacing any earlier one for the same
    /// `(date, commodity, market)`.
    pub async fn upsert_price(&self, record: &PriceRecord) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO prices (date, commodity, market, raw_price, price_min, price_max, price_avg)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(date, commodity, market) DO UPDATE SET
                   raw_price = excluded.raw_price,
                   price_min = excluded.price_min,
                   price_max = excluded.price_max,
                   price_avg = excluded.price_avg",
                params![
                    record.date.as_str(),
                    record.commodity.as_str(),
                    record.market.as_str(),
                    record.raw_price.as_str(),
                    record.price_min,
                    record.price_max,
                    record.price_avg,
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Price reads
    // -----------------------------------------------------------------------

    /// The `limit` most recent distinct bulletin dates, newest first.
    pub async fn latest_dates(&self, limit: u32) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT date FROM prices GROUP BY date ORDER BY {DATE_SORT_KEY} DESC LIMIT ?1"
        );
        let mut rows = self
            .conn
            .query(&sql, params![limit])
            .await
            .map_err(db_err)?;

        let mut dates = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            dates.push(row.get::<String>(0).map_err(db_err)?);
        }
        Ok(dates)
    }

    /// The newest stored date strictly before `date`.
    pub async fn previous_date(&self, date: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT date FROM prices
             WHERE {DATE_SORT_KEY} < substr(?1,7,4)||substr(?1,4,2)||substr(?1,1,2)
             GROUP BY date ORDER BY {DATE_SORT_KEY} DESC LIMIT 1"
        );
        let mut rows = self
            .conn
            .query(&sql, params![date])
            .await
            .map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(db_err)?)),
            None => Ok(None),
        }
    }

    /// Every price in `market` on `date`, sorted by commodity.
    pub async fn prices_for_market_on(&self, market: Market, date: &str) -> Result<Vec<MarketPrice>> {
        let mut rows = self
            .conn
            .query(
                "SELECT commodity, raw_price, price_min, price_max, price_avg
                 FROM prices WHERE market = ?1 AND date = ?2
                 ORDER BY commodity",
                params![market.as_str(), date],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(MarketPrice {
                commodity: row.get::<String>(0).map_err(db_err)?,
                raw_price: row.get::<String>(1).ok(),
                price_min: row.get::<f64>(2).ok(),
                price_max: row.get::<f64>(3).ok(),
                price_avg: row.get::<f64>(4).ok(),
            });
        }
        Ok(results)
    }

    /// The `limit` most recent non-null averages for a commodity in a market,
    /// newest first. Commodity matching ignores case.
    pub async fn recent_averages(
        &self,
        commodity: &str,
        market: Market,
        limit: u32,
    ) -> Result<Vec<DatedPrice>> {
        let sql = format!(
            "SELECT date, price_avg FROM prices
             WHERE commodity = ?1 COLLATE NOCASE AND market = ?2 AND price_avg IS NOT NULL
             ORDER BY {DATE_SORT_KEY} DESC LIMIT ?3"
        );
        let mut rows = self
            .conn
            .query(&sql, params![commodity, market.as_str(), limit])
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(DatedPrice {
                date: row.get::<String>(0).map_err(db_err)?,
                price_avg: row.get::<f64>(1).map_err(db_err)?,
            });
        }
        Ok(results)
    }

    /// The `limit` most recent records for a commodity in a market, including
    /// ones without a parsed price, newest first.
    pub async fn price_history(
        &self,
        commodity: &str,
        market: Market,
        limit: u32,
    ) -> Result<Vec<PriceRecord>> {
        let sql = format!(
            "SELECT date, commodity, market, raw_price, price_min, price_max, price_avg
             FROM prices WHERE commodity = ?1 COLLATE NOCASE AND market = ?2
             ORDER BY {DATE_SORT_KEY} DESC LIMIT ?3"
        );
        let mut rows = self
            .conn
            .query(&sql, params![commodity, market.as_str(), limit])
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_price_record(&row)?);
        }
        Ok(results)
    }

    /// The commodity's prices in every market on the latest date it appears.
    pub async fn latest_prices_by_market(&self, commodity: &str) -> Result<Vec<PriceRecord>> {
        let sql = format!(
            "SELECT date FROM prices WHERE commodity = ?1 COLLATE NOCASE
             ORDER BY {DATE_SORT_KEY} DESC LIMIT 1"
        );
        let mut rows = self
            .conn
            .query(&sql, params![commodity])
            .await
            .map_err(db_err)?;
        let Some(row) = rows.next().await.map_err(db_err)? else {
            return Ok(Vec::new());
        };
        let date: String = row.get(0).map_err(db_err)?;

        let mut rows = self
            .conn
            .query(
                "SELECT date, commodity, market, raw_price, price_min, price_max, price_avg
                 FROM prices WHERE commodity = ?1 COLLATE NOCASE AND date = ?2
                 ORDER BY market",
                params![commodity, date.as_str()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_price_record(&row)?);
        }
        Ok(results)
    }

    /// A single stored price, if present.
    pub async fn price_on(
        &self,
        date: &str,
        commodity: &str,
        market: Market,
    ) -> Result<Option<PriceRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT date, commodity, market, raw_price, price_min, price_max, price_avg
                 FROM prices WHERE date = ?1 AND commodity = ?2 COLLATE NOCASE AND market = ?3",
                params![date, commodity, market.as_str()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_price_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Distinct markets with at least one stored price.
    pub async fn list_markets(&self) -> Result<Vec<Market>> {
        let mut rows = self
            .conn
            .query("SELECT DISTINCT market FROM prices ORDER BY market", params![])
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let name: String = row.get(0).map_err(db_err)?;
            results.push(parse_market(&name)?);
        }
        Ok(results)
    }

    /// Distinct commodity names, A to Z.
    pub async fn list_commodities(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT commodity FROM prices ORDER BY commodity",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row.get::<String>(0).map_err(db_err)?);
        }
        Ok(results)
    }

    /// Total stored prices.
    pub async fn count_prices(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM prices", params![])
            .await
            .map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<u64>(0).map_err(db_err)?),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Ingest history
    // -----------------------------------------------------------------------

    /// Insert a new ingest run. Returns the generated run ID.
    pub async fn insert_ingest_run(&self) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    /// Mark an ingest run finished with its stats.
    pub async fn finish_ingest_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE ingest_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Ingest runs, newest first.
    pub async fn list_ingest_runs(&self, limit: u32) -> Result<Vec<IngestRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, started_at, finished_at, stats_json FROM ingest_runs
                 ORDER BY started_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(IngestRun {
                id: row.get::<String>(0).map_err(db_err)?,
                started_at: row.get::<String>(1).map_err(db_err)?,
                finished_at: row.get::<String>(2).ok(),
                stats_json: row.get::<String>(3).ok(),
            });
        }
        Ok(results)
    }

    /// Record a processed bulletin, replacing any earlier record for its date.
    pub async fn record_bulletin(
        &self,
        date: &str,
        url: &str,
        sha256: &str,
        rows_stored: u64,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO bulletins (date, url, sha256, rows_stored, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(date) DO UPDATE SET
                   url = excluded.url,
                   sha256 = excluded.sha256,
                   rows_stored = excluded.rows_stored,
                   ingested_at = excluded.ingested_at",
                params![date, url, sha256, rows_stored as i64, now.as_str()],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Processed bulletins, newest bulletin date first.
    pub async fn list_bulletins(&self) -> Result<Vec<BulletinRecord>> {
        let sql = format!(
            "SELECT date, url, sha256, rows_stored, ingested_at FROM bulletins
             ORDER BY {DATE_SORT_KEY} DESC"
        );
        let mut rows = self.conn.query(&sql, params![]).await.map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(BulletinRecord {
                date: row.get::<String>(0).map_err(db_err)?,
                url: row.get::<String>(1).map_err(db_err)?,
                sha256: row.get::<String>(2).map_err(db_err)?,
                rows_stored: row.get::<u64>(3).map_err(db_err)?,
                ingested_at: row.get::<String>(4).map_err(db_err)?,
            });
        }
        Ok(results)
    }
}

fn parse_market(name: &str) -> Result<Market> {
    name.parse::<Market>()
        .map_err(|e| VeglyticsError::Storage(format!("unexpected market in database: {e}")))
}

/// Convert a database row to a [`PriceRecord`].
fn row_to_price_record(row: &libsql::Row) -> Result<PriceRecord> {
    Ok(PriceRecord {
        date: row.get::<String>(0).map_err(db_err)?,
        commodity: row.get::<String>(1).map_err(db_err)?,
        market: parse_market(&row.get::<String>(2).map_err(db_err)?)?,
        raw_price: row.get::<String>(3).unwrap_or_default(),
        price_min: row.get::<f64>(4).ok(),
        price_max: row.get::<f64>(5).ok(),
        price_avg: row.get::<f64>(6).ok(),
    })
}
