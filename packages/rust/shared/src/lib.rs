//! Shared types, error model, and configuration for Veglytics.
//!
//! This crate is the foundation depended on by all other Veglytics crates.
//! It provides:
//! - [`VeglyticsError`]: the unified error type
//! - Domain types ([`BulletinRef`], [`Market`], [`RawTable`], [`ColumnMap`], [`PriceRecord`])
//! - Configuration ([`AppConfig`], [`ExtractionConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractionConfig, SourceConfig, StorageConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_config,
};
pub use error::{Result, VeglyticsError};
pub use types::{
    BULLETIN_DATE_FORMAT, BulletinRef, ColumnMap, DatedPrice, Market, MarketPrice, PriceRange,
    PriceRecord, RawTable, ScoredPage,
};
