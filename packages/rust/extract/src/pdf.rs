//! pdfplumber backend.

use std::path::Path;

use pdfplumber::{Pdf, TableSettings, TextOptions};
use tracing::debug;
use veglytics_shared::{Result, VeglyticsError};

use crate::document::{BulletinDocument, BulletinPage, CellGrid, DocumentLoader};
use crate::tables::GridSettings;

/// Loads bulletins with the `pdfplumber` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfplumberLoader;

impl PdfplumberLoader {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentLoader for PdfplumberLoader {
    fn load(&self, path: &Path) -> Result<BulletinDocument> {
        let pdf = Pdf::open_file(path, None).map_err(|e| {
            VeglyticsError::Extraction(format!("failed to open {}: {e}", path.display()))
        })?;

        let mut pages: Vec<Box<dyn BulletinPage>> = Vec::new();
        for (index, page) in pdf.pages_iter().enumerate() {
            let page = page.map_err(|e| {
                VeglyticsError::Extraction(format!(
                    "failed to read page {} of {}: {e}",
                    index + 1,
                    path.display()
                ))
            })?;
            pages.push(Box::new(PdfplumberPage { index, page }));
        }

        debug!(path = %path.display(), pages = pages.len(), "pdf loaded");
        Ok(BulletinDocument::new(pages))
    }

    fn backend_name(&self) -> &'static str {
        "pdfplumber"
    }
}

struct PdfplumberPage {
    index: usize,
    page: pdfplumber::Page,
}

impl BulletinPage for PdfplumberPage {
    fn index(&self) -> usize {
        self.index
    }

    fn text(&self) -> String {
        self.page.extract_text(&TextOptions::default())
    }

    fn find_grids(&self, settings: &GridSettings) -> Vec<CellGrid> {
        self.page.extract_tables(&table_settings(settings))
    }

    fn largest_grid(&self, settings: &GridSettings) -> Option<CellGrid> {
        self.page.extract_table(&table_settings(settings))
    }
}

/// Lattice settings: ruling-line detection with the configured tolerances.
fn table_settings(settings: &GridSettings) -> TableSettings {
    TableSettings {
        snap_tolerance: settings.snap_tolerance as _,
        join_tolerance: settings.join_tolerance as _,
        intersection_tolerance: settings.intersection_tolerance as _,
        edge_min_length: settings.edge_min_length as _,
        min_words_vertical: settings.min_words_vertical as _,
        min_words_horizontal: settings.min_words_horizontal as _,
        ..TableSettings::default()
    }
}
