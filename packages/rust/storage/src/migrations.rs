//! SQL migration definitions for the Veglytics database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: prices with lookup and trend indexes",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One price per (bulletin date, commodity, market); dates are DD-MM-YYYY
CREATE TABLE IF NOT EXISTS prices (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    date       TEXT NOT NULL,
    commodity  TEXT NOT NULL,
    market     TEXT NOT NULL,
    raw_price  TEXT,
    price_min  REAL,
    price_max  REAL,
    price_avg  REAL,
    UNIQUE(date, commodity, market)
);

CREATE INDEX IF NOT EXISTS idx_prices_lookup ON prices(date, market, commodity);
CREATE INDEX IF NOT EXISTS idx_prices_trend ON prices(commodity, market, date);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Ingest history: ingest_runs and bulletins",
            sql: r#"
-- One row per pipeline invocation
CREATE TABLE IF NOT EXISTS ingest_runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

-- One row per processed bulletin, replaced on re-ingest
CREATE TABLE IF NOT EXISTS bulletins (
    date        TEXT PRIMARY KEY,
    url         TEXT NOT NULL,
    sha256      TEXT NOT NULL,
    rows_stored INTEGER NOT NULL,
    ingested_at TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
