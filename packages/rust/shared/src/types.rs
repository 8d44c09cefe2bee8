//! Core domain types shared by the extraction pipeline and storage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used by the bulletin titles, file names, and stored records.
pub const BULLETIN_DATE_FORMAT: &str = "%d-%m-%Y";

// ---------------------------------------------------------------------------
// BulletinRef
// ---------------------------------------------------------------------------

/// A dated reference to one published bulletin PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletinRef {
    /// Absolute URL of the PDF.
    pub url: String,
    /// Publication date parsed from the index page.
    pub publication_date: NaiveDate,
}

impl BulletinRef {
    /// Publication date formatted as `DD-MM-YYYY`.
    pub fn date_label(&self) -> String {
        self.publication_date.format(BULLETIN_DATE_FORMAT).to_string()
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// The fixed set of trading locations whose prices are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "Colombo")]
    Colombo,
    #[serde(rename = "Dambulla")]
    Dambulla,
    #[serde(rename = "Nuwara Eliya")]
    NuwaraEliya,
}

impl Market {
    /// Number of tracked markets.
    pub const COUNT: usize = 3;

    /// All markets in bulletin column order.
    pub const ALL: [Market; Market::COUNT] = [Market::Colombo, Market::Dambulla, Market::NuwaraEliya];

    /// Display name as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Market::Colombo => "Colombo",
            Market::Dambulla => "Dambulla",
            Market::NuwaraEliya => "Nuwara Eliya",
        }
    }

    fn position(self) -> usize {
        match self {
            Market::Colombo => 0,
            Market::Dambulla => 1,
            Market::NuwaraEliya => 2,
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Market {
    type Err = crate::VeglyticsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match key.as_str() {
            "colombo" => Ok(Market::Colombo),
            "dambulla" => Ok(Market::Dambulla),
            "nuwaraeliya" => Ok(Market::NuwaraEliya),
            _ => Err(crate::VeglyticsError::validation(format!(
                "unknown market '{s}': expected Colombo, Dambulla, or Nuwara Eliya"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction intermediates
// ---------------------------------------------------------------------------

/// A page-level relevance score produced by the page scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredPage {
    /// Zero-based page index within the document.
    pub page_index: usize,
    /// Weighted signal count; higher means more likely to hold price data.
    pub score: u32,
}

/// A grid table extracted from one page, cells already normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a table from string literals (handy for tests and fixtures).
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Market → column index mapping for one [`RawTable`].
///
/// Every market always has exactly one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    columns: [usize; Market::COUNT],
}

impl ColumnMap {
    pub fn new(colombo: usize, dambulla: usize, nuwara_eliya: usize) -> Self {
        Self {
            columns: [colombo, dambulla, nuwara_eliya],
        }
    }

    /// Column index assigned to `market`.
    pub fn column(&self, market: Market) -> usize {
        self.columns[market.position()]
    }

    pub fn set(&mut self, market: Market, column: usize) {
        self.columns[market.position()] = column;
    }

    /// `(market, column)` pairs in market order.
    pub fn iter(&self) -> impl Iterator<Item = (Market, usize)> + '_ {
        Market::ALL.iter().map(|m| (*m, self.column(*m)))
    }
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Parsed numeric content of a price cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

impl PriceRange {
    /// The "no value" result.
    pub const EMPTY: PriceRange = PriceRange {
        min: None,
        max: None,
        avg: None,
    };

    /// A single price: min, max, and average all equal `value`.
    pub fn single(value: f64) -> Self {
        Self {
            min: Some(value),
            max: Some(value),
            avg: Some(value),
        }
    }

    /// A range from two bounds given in any order.
    pub fn between(a: f64, b: f64) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            min: Some(lo),
            max: Some(hi),
            avg: Some((lo + hi) / 2.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.avg.is_none()
    }
}

/// The unit that crosses into storage: one price for one commodity,
/// market, and bulletin date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Bulletin date as `DD-MM-YYYY`.
    pub date: String,
    /// Normalized English display name.
    pub commodity: String,
    pub market: Market,
    /// Original cell text.
    pub raw_price: String,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_avg: Option<f64>,
}

impl PriceRecord {
    pub fn new(
        date: impl Into<String>,
        commodity: impl Into<String>,
        market: Market,
        raw_price: impl Into<String>,
        range: PriceRange,
    ) -> Self {
        Self {
            date: date.into(),
            commodity: commodity.into(),
            market,
            raw_price: raw_price.into(),
            price_min: range.min,
            price_max: range.max,
            price_avg: range.avg,
        }
    }
}

/// One dated average price (trend and change reads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedPrice {
    pub date: String,
    pub price_avg: f64,
}

/// One commodity's price in a market on a date (market listing reads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub commodity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_price: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_avg: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulletin_date_label() {
        let bulletin = BulletinRef {
            url: "https://example.com/a.pdf".into(),
            publication_date: NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(),
        };
        assert_eq!(bulletin.date_label(), "03-01-2026");
    }

    #[test]
    fn market_parses_loosely() {
        assert_eq!("colombo".parse::<Market>().unwrap(), Market::Colombo);
        assert_eq!("Nuwara Eliya".parse::<Market>().unwrap(), Market::NuwaraEliya);
        assert_eq!("nuwara-eliya".parse::<Market>().unwrap(), Market::NuwaraEliya);
        assert!("Galle".parse::<Market>().is_err());
    }

    #[test]
    fn market_serializes_display_name() {
        let json = serde_json::to_string(&Market::NuwaraEliya).unwrap();
        assert_eq!(json, "\"Nuwara Eliya\"");
    }

    #[test]
    fn column_map_covers_every_market() {
        let mut map = ColumnMap::new(1, 3, 8);
        map.set(Market::Dambulla, 2);
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (Market::Colombo, 1),
                (Market::Dambulla, 2),
                (Market::NuwaraEliya, 8)
            ]
        );
    }

    #[test]
    fn price_range_orders_bounds() {
        let r = PriceRange::between(220.0, 180.0);
        assert_eq!(r.min, Some(180.0));
        assert_eq!(r.max, Some(220.0));
        assert_eq!(r.avg, Some(200.0));
        assert!(PriceRange::EMPTY.is_empty());
    }

    #[test]
    fn raw_table_from_literals() {
        let t = RawTable::from_rows([["Variety", "Colombo"], ["Tomato", "180-220"]]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[1][0], "Tomato");
    }
}
