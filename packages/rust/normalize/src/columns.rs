//! Column mapping: which table column holds which market's prices.

use veglytics_shared::{ColumnMap, Market, RawTable};

/// Rows concatenated into each column's header signature.
const HEADER_ROWS: usize = 3;

/// Rows inspected to decide how many columns the table has.
const WIDTH_ROWS: usize = 5;

/// How to find one market's column.
#[derive(Debug, Clone, Copy)]
pub struct MarketColumn {
    pub market: Market,
    /// Lowercase phrases that identify the column header.
    pub keywords: &'static [&'static str],
    /// Column used when no header matches.
    pub default_column: usize,
}

/// Column rules for the daily bulletin's price tables.
pub const BULLETIN_COLUMNS: [MarketColumn; Market::COUNT] = [
    MarketColumn {
        market: Market::Colombo,
        keywords: &["peliyagoda"],
        default_column: 1,
    },
    MarketColumn {
        market: Market::Dambulla,
        keywords: &["dambulla"],
        default_column: 3,
    },
    MarketColumn {
        market: Market::NuwaraEliya,
        keywords: &["nuwara", "eliya", "nuwaraeliya"],
        default_column: 8,
    },
];

/// Resolve every market to a column of `table`.
///
/// The first column (left to right) whose header signature contains one of a
/// market's keywords wins; otherwise the market's default column is used.
/// Defaults are not checked against the table width.
pub fn map_columns(table: &RawTable, rules: &[MarketColumn; Market::COUNT]) -> ColumnMap {
    let width = table
        .rows
        .iter()
        .take(WIDTH_ROWS)
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let mut signatures = vec![String::new(); width];
    for row in table.rows.iter().take(HEADER_ROWS) {
        for (signature, cell) in signatures.iter_mut().zip(row) {
            signature.push(' ');
            signature.push_str(cell);
        }
    }
    let signatures: Vec<String> = signatures.iter().map(|s| s.to_lowercase()).collect();

    let mut map = ColumnMap::new(
        rules[0].default_column,
        rules[1].default_column,
        rules[2].default_column,
    );
    for rule in rules {
        let matched = signatures
            .iter()
            .position(|sig| rule.keywords.iter().any(|k| sig.contains(k)));
        map.set(rule.market, matched.unwrap_or(rule.default_column));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_found() {
        let table = RawTable::from_rows([
            vec!["Variety", "Pettah", "Peliyagoda", "Dambulla", "Nuwara Eliya"],
            vec!["", "Rs/kg", "Rs/kg", "Rs/kg", "Rs/kg"],
            vec!["Tomato", "200", "180-220", "150-170", "210"],
        ]);
        let map = map_columns(&table, &BULLETIN_COLUMNS);
        assert_eq!(map.column(Market::Colombo), 2);
        assert_eq!(map.column(Market::Dambulla), 3);
        assert_eq!(map.column(Market::NuwaraEliya), 4);
    }

    #[test]
    fn header_split_across_rows() {
        let table = RawTable::from_rows([
            vec!["Variety", "Wholesale", "", ""],
            vec!["", "Peliyagoda", "Nuwara", "Dambulla"],
            vec!["", "", "Eliya", ""],
            vec!["Carrot", "300", "280", "290"],
        ]);
        let map = map_columns(&table, &BULLETIN_COLUMNS);
        assert_eq!(map.column(Market::Colombo), 1);
        assert_eq!(map.column(Market::NuwaraEliya), 2);
        assert_eq!(map.column(Market::Dambulla), 3);
    }

    #[test]
    fn first_matching_column_wins() {
        let table = RawTable::from_rows([
            vec!["Variety", "Dambulla (Wholesale)", "Dambulla (Retail)"],
            vec!["Beans", "400", "450"],
            vec!["Leeks", "200", "240"],
        ]);
        let map = map_columns(&table, &BULLETIN_COLUMNS);
        assert_eq!(map.column(Market::Dambulla), 1);
    }

    #[test]
    fn defaults_when_no_header() {
        let table = RawTable::from_rows([
            vec!["Tomato", "1", "2"],
            vec!["Carrot", "3", "4"],
            vec!["Beans", "5", "6"],
        ]);
        let map = map_columns(&table, &BULLETIN_COLUMNS);
        assert_eq!(map, ColumnMap::new(1, 3, 8));
    }

    #[test]
    fn empty_table_maps_to_defaults() {
        let map = map_columns(&RawTable::default(), &BULLETIN_COLUMNS);
        assert_eq!(map, ColumnMap::new(1, 3, 8));
    }

    #[test]
    fn header_beyond_first_three_rows_ignored() {
        let table = RawTable::from_rows([
            vec!["Variety", "A", "B"],
            vec!["Tomato", "1", "2"],
            vec!["Carrot", "3", "4"],
            vec!["Beans", "Dambulla", "6"],
        ]);
        let map = map_columns(&table, &BULLETIN_COLUMNS);
        assert_eq!(map.column(Market::Dambulla), 3);
    }
}
