//! Table extraction strategies.
//!
//! Strategies are tried in order and the first one that yields any grid
//! wins. Grids are then filtered by row count and their cells normalized
//! into a [`RawTable`].

use std::sync::LazyLock;

use regex::Regex;
use veglytics_shared::{ExtractionConfig, RawTable};

use crate::document::{BulletinPage, CellGrid};

/// Placeholder for cells the backend reports as absent.
pub const EMPTY_CELL: &str = "-";

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Layout-detection tolerances handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSettings {
    pub intersection_tolerance: f64,
    pub snap_tolerance: f64,
    pub join_tolerance: f64,
    pub edge_min_length: f64,
    pub min_words_vertical: usize,
    pub min_words_horizontal: usize,
}

impl From<&ExtractionConfig> for GridSettings {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            intersection_tolerance: config.intersection_tolerance,
            snap_tolerance: config.snap_tolerance,
            join_tolerance: config.join_tolerance,
            edge_min_length: config.edge_min_length,
            min_words_vertical: config.min_words_vertical,
            min_words_horizontal: config.min_words_horizontal,
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One way of pulling grids out of a page.
pub trait TableStrategy: Send + Sync {
    fn extract(&self, page: &dyn BulletinPage, settings: &GridSettings) -> Vec<CellGrid>;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

/// Every grid found by ruling-line intersection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatticeStrategy;

impl TableStrategy for LatticeStrategy {
    fn extract(&self, page: &dyn BulletinPage, settings: &GridSettings) -> Vec<CellGrid> {
        page.find_grids(settings)
    }

    fn name(&self) -> &str {
        "lattice"
    }
}

/// The single best-guess (largest) grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestGridStrategy;

impl TableStrategy for LargestGridStrategy {
    fn extract(&self, page: &dyn BulletinPage, settings: &GridSettings) -> Vec<CellGrid> {
        page.largest_grid(settings).into_iter().collect()
    }

    fn name(&self) -> &str {
        "largest-grid"
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Ordered fallback list of strategies.
pub struct StrategyChain {
    strategies: Vec<Box<dyn TableStrategy>>,
    min_rows: usize,
}

impl StrategyChain {
    /// Lattice first, then the largest-grid fallback.
    pub fn new(min_rows: usize) -> Self {
        let strategies: Vec<Box<dyn TableStrategy>> =
            vec![Box::new(LatticeStrategy), Box::new(LargestGridStrategy)];
        Self::with_strategies(strategies, min_rows)
    }

    pub fn with_strategies(strategies: Vec<Box<dyn TableStrategy>>, min_rows: usize) -> Self {
        Self {
            strategies,
            min_rows,
        }
    }

    /// Extract normalized tables from `page`.
    ///
    /// The row-count filter applies after a strategy has won, so a page whose
    /// lattice grids are all too short yields nothing rather than falling
    /// through to the next strategy.
    pub fn extract(&self, page: &dyn BulletinPage, settings: &GridSettings) -> Vec<RawTable> {
        for strategy in &self.strategies {
            let grids = strategy.extract(page, settings);
            if grids.is_empty() {
                continue;
            }
            let found = grids.len();
            let tables: Vec<RawTable> = grids
                .iter()
                .filter(|g| g.len() >= self.min_rows)
                .map(normalize_grid)
                .collect();
            tracing::debug!(
                page = page.index(),
                strategy = strategy.name(),
                found,
                kept = tables.len(),
                "tables extracted"
            );
            return tables;
        }
        Vec::new()
    }
}

impl std::fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("StrategyChain")
            .field("strategies", &names)
            .field("min_rows", &self.min_rows)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Cell normalization
// ---------------------------------------------------------------------------

/// Collapse whitespace and newlines to single spaces and trim.
/// Absent cells become [`EMPTY_CELL`].
pub fn normalize_cell(cell: Option<&str>) -> String {
    match cell {
        None => EMPTY_CELL.to_string(),
        Some(text) => WHITESPACE_RE.replace_all(text, " ").trim().to_string(),
    }
}

pub fn normalize_grid(grid: &CellGrid) -> RawTable {
    RawTable::new(
        grid.iter()
            .map(|row| row.iter().map(|c| normalize_cell(c.as_deref())).collect())
            .collect(),
    )
}
