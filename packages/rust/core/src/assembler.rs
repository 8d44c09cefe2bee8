//! Record assembly: turns an extracted table into price records.
//!
//! Column mapping, row classification and price parsing all happen here, per
//! table. Nothing is deduplicated in memory; storage upserts take care of
//! repeated keys.

use tracing::debug;
use veglytics_normalize::{
    BULLETIN_COLUMNS, RowVerdict, classify_row, is_valid_price_cell, map_columns, parse_price,
};
use veglytics_shared::{PriceRecord, RawTable};

/// Build every price record a table yields for the bulletin dated `date`.
///
/// Rows are read top to bottom until the vegetable section ends. Markets whose
/// column is past the end of a row, and cells that do not parse as a price,
/// are skipped without creating a record.
pub fn assemble_records(table: &RawTable, date: &str) -> Vec<PriceRecord> {
    let columns = map_columns(table, &BULLETIN_COLUMNS);
    debug!(?columns, rows = table.len(), "columns mapped");

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;
    let mut skipped_cells = 0usize;

    for row in &table.rows {
        let commodity = match classify_row(row) {
            RowVerdict::Commodity(name) => name,
            RowVerdict::Skip(reason) => {
                debug!(?reason, first = row.first().map(String::as_str), "row skipped");
                skipped_rows += 1;
                continue;
            }
            RowVerdict::EndOfSection => {
                debug!(first = row.first().map(String::as_str), "end of vegetable section");
                break;
            }
        };

        for (market, col) in columns.iter() {
            let Some(cell) = row.get(col) else {
                continue;
            };
            if !is_valid_price_cell(cell) {
                skipped_cells += 1;
                continue;
            }
            records.push(PriceRecord::new(
                date,
                commodity.as_str(),
                market,
                cell.as_str(),
                parse_price(cell),
            ));
        }
    }

    debug!(
        records = records.len(),
        skipped_rows, skipped_cells, "table assembled"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use veglytics_shared::Market;

    fn pairs(records: &[PriceRecord]) -> Vec<(&str, Market)> {
        records
            .iter()
            .map(|r| (r.commodity.as_str(), r.market))
            .collect()
    }

    #[test]
    fn header_and_size_rows_produce_nothing() {
        let table = RawTable::from_rows([
            ["Variety", "Colombo", "Dambulla"],
            ["Tomato", "180-220", "150-170"],
            ["- small", "50-60", "40-50"],
        ]);
        // Colombo falls back to column 1; Nuwara Eliya's default is out of bounds.
        let records = assemble_records(&table, "06-01-2026");
        assert_eq!(
            pairs(&records),
            vec![("Tomato", Market::Colombo), ("Tomato", Market::Dambulla)]
        );
        assert_eq!(records[0].price_avg, Some(200.0));
    }

    #[test]
    fn record_fields_come_from_the_cell() {
        let table = RawTable::from_rows([
            ["Variety", "Peliyagoda", "Dambulla"],
            ["Tomato", "180-220", "150-170"],
            ["- small", "50-60", "40-50"],
        ]);
        let records = assemble_records(&table, "06-01-2026");
        assert_eq!(
            pairs(&records),
            vec![("Tomato", Market::Colombo), ("Tomato", Market::Dambulla)]
        );
        let dambulla = &records[1];
        assert_eq!(dambulla.date, "06-01-2026");
        assert_eq!(dambulla.raw_price, "150-170");
        assert_eq!(dambulla.price_min, Some(150.0));
        assert_eq!(dambulla.price_max, Some(170.0));
        assert_eq!(dambulla.price_avg, Some(160.0));
    }

    #[test]
    fn fruit_heading_stops_the_table() {
        let table = RawTable::from_rows([
            ["Variety", "Peliyagoda", "Dambulla"],
            ["Carrot", "300", "280"],
            ["Banana - Ambul", "120", "110"],
            ["Beans", "400", "380"],
        ]);
        let records = assemble_records(&table, "06-01-2026");
        assert!(records.iter().all(|r| r.commodity == "Carrot"));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn invalid_and_placeholder_cells_are_skipped() {
        let table = RawTable::from_rows([
            ["Variety", "Peliyagoda", "Dambulla"],
            ["Leeks", "-", "n.a."],
            ["තක්කාලි", "1,200", "-"],
        ]);
        let records = assemble_records(&table, "06-01-2026");
        assert_eq!(pairs(&records), vec![("Tomato", Market::Colombo)]);
        assert_eq!(records[0].price_avg, Some(1200.0));
        assert_eq!(records[0].raw_price, "1,200");
    }

    #[test]
    fn nine_column_layout() {
        let table = RawTable::from_rows([
            ["Item", "Peliyagoda", "", "Dambulla", "", "", "", "", "Nuwara Eliya"],
            ["", "Rs./kg", "", "Rs./kg", "", "", "", "", "Rs./kg"],
            ["Beans", "400-450", "", "380", "", "", "", "", "420-440"],
        ]);
        let records = assemble_records(&table, "03-01-2026");
        assert_eq!(
            pairs(&records),
            vec![
                ("Beans", Market::Colombo),
                ("Beans", Market::Dambulla),
                ("Beans", Market::NuwaraEliya),
            ]
        );
        assert_eq!(records[2].price_avg, Some(430.0));
    }

    #[test]
    fn empty_table_yields_nothing() {
        assert!(assemble_records(&RawTable::default(), "06-01-2026").is_empty());
    }
}
