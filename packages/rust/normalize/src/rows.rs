//! Row classification: decides whether a table row is a commodity, noise,
//! or the start of a section the pipeline does not track.

use std::sync::LazyLock;

use regex::Regex;

use crate::names::{is_junk_name, normalize_name, translate_name};

/// First-cell headings that open the fruit section.
pub const FRUIT_SECTION_WORDS: &[&str] = &[
    "banana",
    "pineapple",
    "papaw",
    "mango",
    "avocado",
    "orange",
    "grapes",
    "water melon",
    "wood apple",
];

/// Bare size qualifiers that follow a commodity row.
const SIZE_WORDS: &[&str] = &["small", "medium", "large"];

/// Header phrases matched anywhere in the joined row text.
pub const HEADER_WORDS: &[&str] = &[
    "variety",
    "commodity",
    "market",
    "colombo",
    "dambulla",
    "nuwara",
    "peliyagoda",
];

/// Unit markers, matched as whole words so names like "Brinjal" or "Okra"
/// are not mistaken for headers.
static UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(rs|kg)\b").expect("unit regex"));

/// Rows need a name cell and at least one price cell.
const MIN_ROW_CELLS: usize = 2;

/// Why a row produced no commodity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer than two cells.
    TooShort,
    /// `small` / `medium` / `large` qualifier row.
    SizeVariant,
    /// Column headings or units.
    Header,
    /// Placeholder, digits, dates, boilerplate, or implausible length.
    Junk,
    /// Neither in the lexicon nor Latin script.
    Untranslatable,
}

/// Outcome of classifying one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowVerdict {
    /// A data row for the named commodity.
    Commodity(String),
    /// Not a data row; continue with the next one.
    Skip(SkipReason),
    /// The tracked section has ended; ignore the rest of the table.
    EndOfSection,
}

/// Classify a row of normalized cells.
pub fn classify_row(row: &[String]) -> RowVerdict {
    let first = row.first().map(String::as_str).unwrap_or("");
    let first_lower = first.trim().to_lowercase();

    if is_fruit_section_start(&first_lower) {
        return RowVerdict::EndOfSection;
    }
    if row.len() < MIN_ROW_CELLS {
        return RowVerdict::Skip(SkipReason::TooShort);
    }
    if is_size_variant(&first_lower) {
        return RowVerdict::Skip(SkipReason::SizeVariant);
    }
    if looks_like_header(row) {
        return RowVerdict::Skip(SkipReason::Header);
    }

    let name = normalize_name(first);
    if is_junk_name(&name) {
        return RowVerdict::Skip(SkipReason::Junk);
    }
    match translate_name(&name) {
        Some(english) => RowVerdict::Commodity(english),
        None => RowVerdict::Skip(SkipReason::Untranslatable),
    }
}

fn is_fruit_section_start(first_lower: &str) -> bool {
    FRUIT_SECTION_WORDS
        .iter()
        .any(|w| first_lower == *w || first_lower.starts_with(w))
}

fn is_size_variant(first_lower: &str) -> bool {
    SIZE_WORDS.iter().any(|size| {
        first_lower == *size
            || first_lower
                .strip_prefix("- ")
                .is_some_and(|rest| rest.starts_with(size))
    })
}

fn looks_like_header(row: &[String]) -> bool {
    let joined = row.join(" ").to_lowercase();
    HEADER_WORDS.iter().any(|w| joined.contains(w)) || UNIT_RE.is_match(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn commodity_rows() {
        assert_eq!(
            classify_row(&row(&["Tomato", "180-220"])),
            RowVerdict::Commodity("Tomato".into())
        );
        assert_eq!(
            classify_row(&row(&["කැරට්", "300"])),
            RowVerdict::Commodity("Carrot".into())
        );
        assert_eq!(
            classify_row(&row(&["bitter gourd", "-", "250"])),
            RowVerdict::Commodity("Bitter Gourd".into())
        );
    }

    #[test]
    fn fruit_heading_ends_section() {
        assert_eq!(classify_row(&row(&["Banana - Ambul", "120"])), RowVerdict::EndOfSection);
        assert_eq!(classify_row(&row(&["Water Melon"])), RowVerdict::EndOfSection);
        assert_eq!(classify_row(&row(&["  PAPAW", "90"])), RowVerdict::EndOfSection);
    }

    #[test]
    fn size_variants_skipped() {
        for first in ["- small", "Small", "medium", "- Large", "- large (imported)"] {
            assert_eq!(
                classify_row(&row(&[first, "50-60"])),
                RowVerdict::Skip(SkipReason::SizeVariant),
                "{first}"
            );
        }
        // A commodity that merely starts with a size word is kept.
        assert_eq!(
            classify_row(&row(&["Smallonion", "400"])),
            RowVerdict::Commodity("Smallonion".into())
        );
    }

    #[test]
    fn header_rows_skipped() {
        for cells in [
            &["Variety", "Colombo", "Dambulla"][..],
            &["", "Rs./kg", "Rs./kg"][..],
            &["Item", "Peliyagoda", "Nuwara Eliya"][..],
            &["Commodity", "Today", "Yesterday"][..],
        ] {
            assert_eq!(
                classify_row(&row(cells)),
                RowVerdict::Skip(SkipReason::Header),
                "{cells:?}"
            );
        }
    }

    #[test]
    fn unit_markers_need_word_boundaries() {
        assert_eq!(
            classify_row(&row(&["Brinjal", "Bananas / Marks"])),
            RowVerdict::Commodity("Brinjal".into())
        );
        assert_eq!(
            classify_row(&row(&["Brinjal", "Rs 200"])),
            RowVerdict::Skip(SkipReason::Header)
        );
        assert_eq!(
            classify_row(&row(&["Ladies Fingers", "200"])),
            RowVerdict::Commodity("Ladies Fingers".into())
        );
    }

    #[test]
    fn junk_and_untranslatable() {
        assert_eq!(classify_row(&row(&["-", "200"])), RowVerdict::Skip(SkipReason::Junk));
        assert_eq!(
            classify_row(&row(&["Up Country Vegetables", "-"])),
            RowVerdict::Skip(SkipReason::Junk)
        );
        assert_eq!(
            classify_row(&row(&["06.01.2026", "-"])),
            RowVerdict::Skip(SkipReason::Junk)
        );
        assert_eq!(
            classify_row(&row(&["කොස්", "150"])),
            RowVerdict::Skip(SkipReason::Untranslatable)
        );
    }

    #[test]
    fn short_rows_skipped() {
        assert_eq!(classify_row(&row(&["Tomato"])), RowVerdict::Skip(SkipReason::TooShort));
        assert_eq!(classify_row(&[]), RowVerdict::Skip(SkipReason::TooShort));
    }
}
