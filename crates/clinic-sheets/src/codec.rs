//! # Header-Keyed Row Codec
//!
//! Reads and writes records by column name rather than position, so staff
//! can reorder or add columns in the spreadsheet without breaking the app.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Row 1   │ id │ name │ Phone │ age │ notes (ignored) │ ...             │
//! │  Row 2   │ p1 │ Ravi │ 98... │ 41  │ called twice    │                 │
//! │  Row 3   │    │      │       │     │                 │  ← blank, skip  │
//! │  Row 4   │ p2 │ Meena│ 99... │ 35  │                 │                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Header matching ignores case and treats spaces and hyphens as
//! underscores (`"Patient ID"` matches `patient_id`). Columns the record
//! does not know are left empty on write and ignored on read.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::{Money, ValidationError};
use serde::de::DeserializeOwned;

use crate::error::{SheetsError, SheetsResult};

/// Canonical form of a header cell.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

// =============================================================================
// Sheet Record
// =============================================================================

/// A record stored one per row in its own tab.
pub trait SheetRecord: Sized {
    /// Tab name.
    const SHEET: &'static str;

    /// Columns written for this record, in the order used for new tabs.
    const HEADERS: &'static [&'static str];

    /// Entity name used in error messages.
    const ENTITY: &'static str;

    fn id(&self) -> &str;

    /// `(header, cell text)` pairs covering every entry of `HEADERS`.
    fn encode(&self) -> Vec<(&'static str, String)>;

    fn decode(row: &Row<'_>) -> Result<Self, String>;

    /// Business-rule check applied to every decoded row.
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// =============================================================================
// Table
// =============================================================================

/// One tab as read from the transport.
#[derive(Debug, Clone)]
pub struct Table {
    sheet: String,
    columns: HashMap<String, usize>,
    width: usize,
    rows: Vec<(u32, Vec<String>)>,
}

impl Table {
    /// Splits the header row from the data rows. Blank rows are dropped
    /// but the remaining rows keep their sheet row numbers.
    pub fn parse(sheet: &str, mut values: Vec<Vec<String>>) -> SheetsResult<Table> {
        if values.is_empty() || values[0].iter().all(|h| h.trim().is_empty()) {
            return Err(SheetsError::MissingSheet(sheet.to_string()));
        }

        let header = values.remove(0);
        let width = header.len();
        let mut columns = HashMap::new();
        for (index, cell) in header.iter().enumerate() {
            let key = normalize_header(cell);
            if !key.is_empty() {
                columns.entry(key).or_insert(index);
            }
        }

        let rows = values
            .into_iter()
            .enumerate()
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|(i, cells)| (i as u32 + 2, cells))
            .collect();

        Ok(Table {
            sheet: sheet.to_string(),
            columns,
            width,
            rows,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Number of non-blank data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fails with `MissingColumn` for the first header not present.
    pub fn require(&self, headers: &[&str]) -> SheetsResult<()> {
        match headers.iter().find(|h| !self.columns.contains_key(&normalize_header(h))) {
            Some(missing) => Err(SheetsError::MissingColumn {
                sheet: self.sheet.clone(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |(number, cells)| Row {
            table: self,
            number: *number,
            cells,
        })
    }

    /// Raw cells of one row padded to the header width, for restoring it.
    pub fn raw(&self, number: u32) -> Option<Vec<String>> {
        self.rows.iter().find(|(n, _)| *n == number).map(|(_, cells)| {
            let mut cells = cells.clone();
            if cells.len() < self.width {
                cells.resize(self.width, String::new());
            }
            cells
        })
    }

    /// Decodes and checks every row, failing on the first bad one.
    pub fn decode_all<R: SheetRecord>(&self) -> SheetsResult<Vec<(u32, R)>> {
        self.require(R::HEADERS)?;
        self.rows().map(|row| row.decode::<R>().map(|r| (row.number(), r))).collect()
    }

    /// Row whose `id` cell equals `id`.
    pub fn find<R: SheetRecord>(&self, id: &str) -> SheetsResult<Option<(u32, R)>> {
        self.require(R::HEADERS)?;
        match self.rows().find(|row| row.text("id").trim() == id) {
            Some(row) => Ok(Some((row.number(), row.decode::<R>()?))),
            None => Ok(None),
        }
    }

    /// Places cells under their headers, in sheet column order.
    pub fn layout(&self, cells: &[(&str, String)]) -> SheetsResult<Vec<String>> {
        let mut row = vec![String::new(); self.width];
        for (header, value) in cells {
            let index = self.column(header).ok_or_else(|| SheetsError::MissingColumn {
                sheet: self.sheet.clone(),
                column: header.to_string(),
            })?;
            row[index] = value.clone();
        }
        Ok(row)
    }

    fn column(&self, header: &str) -> Option<usize> {
        self.columns.get(&normalize_header(header)).copied()
    }
}

// =============================================================================
// Row
// =============================================================================

/// One data row, addressed by header.
///
/// Field accessors return `Err(reason)` naming the column; the table turns
/// that into `SheetsError::InvalidRow` with the row number.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    number: u32,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    /// 1-based sheet row number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Trimmed cell text; empty when the column or cell is absent.
    pub fn text(&self, header: &str) -> &'a str {
        self.table
            .column(header)
            .and_then(|i| self.cells.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    pub fn required(&self, header: &str) -> Result<String, String> {
        match self.text(header) {
            "" => Err(format!("{header}: is empty")),
            text => Ok(text.to_string()),
        }
    }

    pub fn optional(&self, header: &str) -> Option<String> {
        match self.text(header) {
            "" => None,
            text => Some(text.to_string()),
        }
    }

    /// Parses with `FromStr`; works for integers and the label enums.
    pub fn parse<T>(&self, header: &str) -> Result<T, String>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let text = self.required(header)?;
        text.parse::<T>().map_err(|e| format!("{header}: {e}"))
    }

    pub fn money(&self, header: &str) -> Result<Money, String> {
        Money::parse_decimal(self.text(header)).map_err(|e| format!("{header}: {e}"))
    }

    pub fn date(&self, header: &str) -> Result<NaiveDate, String> {
        parse_date(header, &self.required(header)?)
    }

    pub fn optional_date(&self, header: &str) -> Result<Option<NaiveDate>, String> {
        self.optional(header).map(|text| parse_date(header, &text)).transpose()
    }

    /// RFC 3339 timestamp; a bare `YYYY-MM-DD` reads as midnight UTC.
    pub fn timestamp(&self, header: &str) -> Result<DateTime<Utc>, String> {
        let text = self.required(header)?;
        if let Ok(at) = DateTime::parse_from_rfc3339(&text) {
            return Ok(at.with_timezone(&Utc));
        }
        let date = parse_date(header, &text)?;
        Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    pub fn json<T: DeserializeOwned>(&self, header: &str) -> Result<T, String> {
        serde_json::from_str(&self.required(header)?).map_err(|e| format!("{header}: {e}"))
    }

    /// Decodes and checks this row as `R`.
    pub fn decode<R: SheetRecord>(&self) -> SheetsResult<R> {
        let record = R::decode(self)
            .map_err(|reason| SheetsError::invalid_row(&self.table.sheet, self.number, reason))?;
        record
            .check()
            .map_err(|e| SheetsError::invalid_row(&self.table.sheet, self.number, e.to_string()))?;
        Ok(record)
    }
}

fn parse_date(header: &str, text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| format!("{header}: expected YYYY-MM-DD, got '{text}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn table() -> Table {
        Table::parse(
            "Inventory",
            vec![
                cells(&["Stock", "ID", "Name", "Remarks"]),
                cells(&["12", "i-1", "ORS"]),
                cells(&["", "", "", ""]),
                cells(&["x", "i-2", "Bandage", "check"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_header_normalization() {
        assert_eq!(normalize_header(" Patient ID "), "patient_id");
        assert_eq!(normalize_header("follow-up"), "follow_up");
    }

    #[test]
    fn test_blank_rows_skipped_numbers_kept() {
        let t = table();
        assert_eq!(t.len(), 2);
        let numbers: Vec<u32> = t.rows().map(|r| r.number()).collect();
        assert_eq!(numbers, vec![2, 4]);
    }

    #[test]
    fn test_row_accessors() {
        let t = table();
        let rows: Vec<Row<'_>> = t.rows().collect();
        assert_eq!(rows[0].text("name"), "ORS");
        assert_eq!(rows[0].parse::<i64>("stock").unwrap(), 12);
        assert_eq!(rows[0].optional("remarks"), None);
        assert!(rows[1].parse::<i64>("stock").unwrap_err().contains("stock"));
        assert!(rows[0].required("missing").is_err());
    }

    #[test]
    fn test_layout_follows_sheet_order() {
        let t = table();
        let row = t
            .layout(&[("id", "i-3".to_string()), ("name", "Gauze".to_string()), ("stock", "4".to_string())])
            .unwrap();
        assert_eq!(row, cells(&["4", "i-3", "Gauze", ""]));

        assert!(matches!(
            t.layout(&[("batch_number", "B1".to_string())]),
            Err(SheetsError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_raw_is_padded() {
        let t = table();
        assert_eq!(t.raw(2).unwrap(), cells(&["12", "i-1", "ORS", ""]));
        assert!(t.raw(3).is_none());
    }

    #[test]
    fn test_missing_header_row() {
        assert!(matches!(Table::parse("Empty", vec![]), Err(SheetsError::MissingSheet(_))));
        assert!(matches!(
            Table::parse("Blank", vec![cells(&["", ""])]),
            Err(SheetsError::MissingSheet(_))
        ));
    }

    #[test]
    fn test_timestamps_and_dates() {
        let t = Table::parse(
            "Log",
            vec![cells(&["at", "on"]), cells(&["2026-03-01T10:15:00+05:30", "2026-03-01"]), cells(&["2026-03-02", "01/03/2026"])],
        )
        .unwrap();
        let rows: Vec<Row<'_>> = t.rows().collect();

        assert_eq!(rows[0].timestamp("at").unwrap().to_rfc3339(), "2026-03-01T04:45:00+00:00");
        assert_eq!(rows[1].timestamp("at").unwrap().to_rfc3339(), "2026-03-02T00:00:00+00:00");
        assert!(rows[1].date("on").is_err());
        assert_eq!(rows[0].optional_date("missing").unwrap(), None);
    }
}
