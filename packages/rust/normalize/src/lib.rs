//! Turning raw bulletin tables into clean commodity rows.
//!
//! - [`map_columns`]: which column holds which market
//! - [`classify_row`]: commodity, skipped row, or end of the vegetable section
//! - [`normalize_name`] / [`translate_name`]: bilingual name cleaning
//! - [`parse_price`]: price cell text to a numeric range
//!
//! Everything here is pure; keyword tables are constants passed in or
//! consulted explicitly.

pub mod columns;
pub mod names;
pub mod price;
pub mod rows;

pub use columns::{BULLETIN_COLUMNS, MarketColumn, map_columns};
pub use names::{
    JUNK_WORDS, LEXICON, clean_commodity_name, is_junk_name, normalize_name, title_case,
    translate_name,
};
pub use price::{is_valid_price_cell, parse_price};
pub use rows::{FRUIT_SECTION_WORDS, HEADER_WORDS, RowVerdict, SkipReason, classify_row};
