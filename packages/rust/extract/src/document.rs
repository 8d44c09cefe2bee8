//! Document abstraction over PDF backends.
//!
//! The scorer and table strategies only ever see [`BulletinPage`]s, so the
//! pipeline can be driven by the pdfplumber backend in production and by
//! [`MemoryPage`]s in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use veglytics_shared::{Result, VeglyticsError};

use crate::tables::GridSettings;

/// Raw grid as returned by a backend: rows of optional cell text.
pub type CellGrid = Vec<Vec<Option<String>>>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One page of a loaded bulletin.
pub trait BulletinPage {
    /// Zero-based position within the document.
    fn index(&self) -> usize;

    /// Plain text of the page, used for scoring.
    fn text(&self) -> String;

    /// Every grid found by ruling-line intersection.
    fn find_grids(&self, settings: &GridSettings) -> Vec<CellGrid>;

    /// The single largest grid, if any.
    fn largest_grid(&self, settings: &GridSettings) -> Option<CellGrid>;
}

/// Opens a bulletin file into pages.
///
/// Loaders are shared across the blocking pool, so they must be thread-safe;
/// the documents they produce are not required to be.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<BulletinDocument>;

    /// Human-readable backend name for tracing.
    fn backend_name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// BulletinDocument
// ---------------------------------------------------------------------------

/// A loaded bulletin: its pages in order.
pub struct BulletinDocument {
    pages: Vec<Box<dyn BulletinPage>>,
}

impl BulletinDocument {
    pub fn new(pages: Vec<Box<dyn BulletinPage>>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[Box<dyn BulletinPage>] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&dyn BulletinPage> {
        self.pages.get(index).map(|p| p.as_ref())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl std::fmt::Debug for BulletinDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulletinDocument")
            .field("pages", &self.pages.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// A page whose text and grids are supplied up front.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub index: usize,
    pub text: String,
    /// Returned by [`BulletinPage::find_grids`].
    pub grids: Vec<CellGrid>,
    /// Returned by [`BulletinPage::largest_grid`].
    pub largest: Option<CellGrid>,
}

impl MemoryPage {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_grid(mut self, grid: CellGrid) -> Self {
        self.grids.push(grid);
        self
    }

    pub fn with_largest(mut self, grid: CellGrid) -> Self {
        self.largest = Some(grid);
        self
    }
}

impl BulletinPage for MemoryPage {
    fn index(&self) -> usize {
        self.index
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn find_grids(&self, _settings: &GridSettings) -> Vec<CellGrid> {
        self.grids.clone()
    }

    fn largest_grid(&self, _settings: &GridSettings) -> Option<CellGrid> {
        self.largest.clone()
    }
}

/// Serves pre-built pages keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<PathBuf, Vec<MemoryPage>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pages` for any path whose file name equals `file_name`.
    pub fn insert(&mut self, file_name: impl Into<PathBuf>, pages: Vec<MemoryPage>) {
        self.documents.insert(file_name.into(), pages);
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<BulletinDocument> {
        let key = path.file_name().map(PathBuf::from).unwrap_or_default();
        let pages = self.documents.get(&key).ok_or_else(|| {
            VeglyticsError::Extraction(format!("no in-memory document for {}", path.display()))
        })?;
        Ok(BulletinDocument::new(
            pages
                .iter()
                .cloned()
                .map(|p| Box::new(p) as Box<dyn BulletinPage>)
                .collect(),
        ))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Build a [`CellGrid`] from string literals, treating `None` as an absent cell.
pub fn grid<const N: usize>(rows: &[[Option<&str>; N]]) -> CellGrid {
    rows.iter()
        .map(|row| row.iter().map(|c| c.map(str::to_string)).collect())
        .collect()
}
