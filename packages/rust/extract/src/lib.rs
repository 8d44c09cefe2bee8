//! Page scoring and table extraction for bulletin PDFs.
//!
//! This crate provides:
//! - [`DocumentLoader`] / [`BulletinPage`]: the seam between the pipeline and
//!   a PDF backend ([`PdfplumberLoader`] in production)
//! - [`score_page`] / [`select_pages`]: ranking pages by domain signals
//! - [`StrategyChain`]: ordered table-extraction fallbacks
//! - [`extract_bulletin_tables`]: the page plan tying them together

pub mod document;
pub mod pdf;
pub mod scorer;
pub mod tables;

use tracing::{debug, info, instrument};
use veglytics_shared::{ExtractionConfig, RawTable, ScoredPage};

pub use document::{
    BulletinDocument, BulletinPage, CellGrid, DocumentLoader, MemoryLoader, MemoryPage, grid,
};
pub use pdf::PdfplumberLoader;
pub use scorer::{BULLETIN_SCORING, ScoringTable, Signal, score_page, select_pages};
pub use tables::{
    EMPTY_CELL, GridSettings, LargestGridStrategy, LatticeStrategy, StrategyChain, TableStrategy,
    normalize_cell,
};

/// A table together with the page it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    pub page_index: usize,
    pub table: RawTable,
}

/// Outcome of extracting one bulletin.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Score of every page, in page order.
    pub scores: Vec<ScoredPage>,
    /// Pages picked by the scorer.
    pub selected: Vec<usize>,
    /// Whether every page had to be scanned.
    pub scanned_all: bool,
    pub tables: Vec<PageTable>,
}

/// Run the page plan over a loaded document.
///
/// The best-scoring pages are tried first; if none scored or they yield no
/// tables, every page is scanned. An empty report is a layout miss, not an
/// error.
#[instrument(skip_all, fields(pages = document.page_count()))]
pub fn extract_bulletin_tables(
    document: &BulletinDocument,
    config: &ExtractionConfig,
) -> ExtractionReport {
    let settings = GridSettings::from(config);
    let chain = StrategyChain::new(config.min_table_rows);

    let scores: Vec<ScoredPage> = document
        .pages()
        .iter()
        .map(|page| ScoredPage {
            page_index: page.index(),
            score: score_page(&page.text(), &BULLETIN_SCORING),
        })
        .collect();
    for s in &scores {
        debug!(page = s.page_index, score = s.score, "page scored");
    }

    let selected: Vec<usize> = select_pages(&scores, config.top_pages)
        .iter()
        .map(|s| s.page_index)
        .collect();

    let mut tables = tables_from(document, &selected, &chain, &settings);
    let mut scanned_all = false;
    if tables.is_empty() {
        debug!(selected = selected.len(), "no tables on scored pages, scanning all pages");
        let every: Vec<usize> = document.pages().iter().map(|p| p.index()).collect();
        tables = tables_from(document, &every, &chain, &settings);
        scanned_all = true;
    }

    info!(
        tables = tables.len(),
        scanned_all,
        "bulletin tables extracted"
    );

    ExtractionReport {
        scores,
        selected,
        scanned_all,
        tables,
    }
}

fn tables_from(
    document: &BulletinDocument,
    page_indices: &[usize],
    chain: &StrategyChain,
    settings: &GridSettings,
) -> Vec<PageTable> {
    let mut out = Vec::new();
    for &page_index in page_indices {
        let Some(page) = document.pages().iter().find(|p| p.index() == page_index) else {
            continue;
        };
        out.extend(
            chain
                .extract(page.as_ref(), settings)
                .into_iter()
                .map(|table| PageTable { page_index, table }),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_grid(first: &str) -> CellGrid {
        grid(&[
            [Some("Variety"), Some("Peliyagoda")],
            [Some(first), Some("180-220")],
            [Some("Carrot"), Some("300")],
        ])
    }

    fn doc(pages: Vec<MemoryPage>) -> BulletinDocument {
        BulletinDocument::new(
            pages
                .into_iter()
                .map(|p| Box::new(p) as Box<dyn BulletinPage>)
                .collect(),
        )
    }

    #[test]
    fn scored_pages_are_used_first() {
        let document = doc(vec![
            MemoryPage::new(0, "Rice and grains").with_grid(price_grid("Rice")),
            MemoryPage::new(1, "Variety Peliyagoda Dambulla tomato").with_grid(price_grid("Tomato")),
            MemoryPage::new(2, "Fish market"),
        ]);
        let report = extract_bulletin_tables(&document, &ExtractionConfig::default());

        assert_eq!(report.selected, vec![1]);
        assert!(!report.scanned_all);
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].page_index, 1);
        assert_eq!(report.tables[0].table.rows[1][0], "Tomato");
    }

    #[test]
    fn top_pages_limit() {
        let document = doc(vec![
            MemoryPage::new(0, "Dambulla tomato").with_grid(price_grid("A")),
            MemoryPage::new(1, "Dambulla Peliyagoda tomato carrot").with_grid(price_grid("B")),
            MemoryPage::new(2, "Dambulla Peliyagoda Nuwara Eliya").with_grid(price_grid("C")),
        ]);
        let report = extract_bulletin_tables(&document, &ExtractionConfig::default());
        assert_eq!(report.selected, vec![2, 1]);
        let firsts: Vec<&str> = report
            .tables
            .iter()
            .map(|t| t.table.rows[1][0].as_str())
            .collect();
        assert_eq!(firsts, vec!["C", "B"]);
    }

    #[test]
    fn unscored_document_scans_every_page() {
        let document = doc(vec![
            MemoryPage::new(0, ""),
            MemoryPage::new(1, "").with_grid(price_grid("Tomato")),
        ]);
        let report = extract_bulletin_tables(&document, &ExtractionConfig::default());
        assert!(report.selected.is_empty());
        assert!(report.scanned_all);
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].page_index, 1);
    }

    #[test]
    fn scored_pages_without_tables_fall_back() {
        let document = doc(vec![
            MemoryPage::new(0, "Dambulla Variety"),
            MemoryPage::new(1, "appendix").with_largest(price_grid("Beans")),
        ]);
        let report = extract_bulletin_tables(&document, &ExtractionConfig::default());
        assert_eq!(report.selected, vec![0]);
        assert!(report.scanned_all);
        assert_eq!(report.tables[0].table.rows[1][0], "Beans");
    }

    #[test]
    fn unrecognized_layout_yields_nothing() {
        let document = doc(vec![MemoryPage::new(0, "Dambulla"), MemoryPage::new(1, "notes")]);
        let report = extract_bulletin_tables(&document, &ExtractionConfig::default());
        assert!(report.tables.is_empty());
        assert_eq!(report.scores.len(), 2);
    }
}
