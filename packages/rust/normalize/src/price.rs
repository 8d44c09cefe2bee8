//! Price cell parsing.

use std::sync::LazyLock;

use regex::Regex;
use veglytics_shared::PriceRange;

/// Cell texts that mean "no price".
const NO_VALUE: &[&str] = &["-", "N/A", "None", "none", ""];

/// `number` or `number-number`, whitespace tolerated around the dash.
/// ASCII digits only.
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?)(?:\s*-\s*([0-9]+(?:\.[0-9]+)?))?$").expect("price regex")
});

fn clean(raw: &str) -> String {
    raw.replace(',', "").trim().to_string()
}

/// Whether `raw` holds a single price or a price range.
///
/// Agrees with [`parse_price`]: a valid cell always parses to a price.
pub fn is_valid_price_cell(raw: &str) -> bool {
    !parse_price(raw).is_empty()
}

/// Parse a price cell into (min, max, avg).
///
/// Thousands separators are ignored. A single value fills all three fields;
/// a range is ordered and averaged. Anything else is [`PriceRange::EMPTY`].
pub fn parse_price(raw: &str) -> PriceRange {
    let s = clean(raw);
    if NO_VALUE.contains(&s.as_str()) {
        return PriceRange::EMPTY;
    }
    let Some(caps) = PRICE_RE.captures(&s) else {
        return PriceRange::EMPTY;
    };

    let Ok(first) = caps[1].parse::<f64>() else {
        return PriceRange::EMPTY;
    };
    match caps.get(2).map(|m| m.as_str().parse::<f64>()) {
        None => PriceRange::single(first),
        Some(Ok(second)) => PriceRange::between(first, second),
        Some(Err(_)) => PriceRange::EMPTY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range() {
        let r = parse_price("180-220");
        assert_eq!((r.min, r.max, r.avg), (Some(180.0), Some(220.0), Some(200.0)));
    }

    #[test]
    fn reversed_range_is_identical() {
        assert_eq!(parse_price("220-180"), parse_price("180-220"));
    }

    #[test]
    fn range_with_spaces_and_separators() {
        let r = parse_price(" 1,200 - 1,450 ");
        assert_eq!((r.min, r.max, r.avg), (Some(1200.0), Some(1450.0), Some(1325.0)));
    }

    #[test]
    fn single_decimal() {
        let r = parse_price("250.50");
        assert_eq!((r.min, r.max, r.avg), (Some(250.5), Some(250.5), Some(250.5)));
    }

    #[test]
    fn no_value_markers() {
        for raw in ["-", "N/A", "None", "", "   "] {
            assert_eq!(parse_price(raw), PriceRange::EMPTY, "{raw:?}");
            assert!(!is_valid_price_cell(raw), "{raw:?}");
        }
    }

    #[test]
    fn malformed_cells() {
        for raw in ["Rs. 200", "200-", "abc", "180-220-260", "1.2.3", "-200"] {
            assert!(parse_price(raw).is_empty(), "{raw:?}");
            assert!(!is_valid_price_cell(raw), "{raw:?}");
        }
    }

    #[test]
    fn non_ascii_digits_are_not_prices() {
        // Sinhala Lith digits and Arabic-Indic digits.
        for raw in ["෨෦෦", "෧෫෦-෧෭෦", "٢٠٠"] {
            assert!(!is_valid_price_cell(raw), "{raw:?}");
            assert!(parse_price(raw).is_empty(), "{raw:?}");
        }
    }

    #[test]
    fn valid_cells() {
        for raw in ["250", "250.00", "250-270", "250 - 270", "1,250"] {
            assert!(is_valid_price_cell(raw), "{raw:?}");
        }
    }
}
