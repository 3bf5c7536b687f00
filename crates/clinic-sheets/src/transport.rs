//! # Sheets Transport
//!
//! The raw cell operations the adapter needs, behind one trait so the
//! adapter runs unchanged against Google or an in-memory spreadsheet.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SheetsDataService ──► Arc<dyn SheetsTransport>                        │
//! │                              │                                          │
//! │              ┌───────────────┴───────────────┐                          │
//! │              ▼                               ▼                          │
//! │     GoogleSheetsClient                 MemorySheets                     │
//! │     (client.rs, reqwest)               (memory.rs, tests / demo)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are 1-based as in the Sheets UI; row 1 is the header row.

use async_trait::async_trait;
use clinic_core::RowUpdate;

use crate::error::{SheetsError, SheetsResult};

#[async_trait]
pub trait SheetsTransport: Send + Sync {
    /// Every row of a tab, header row first. Rows may be ragged; trailing
    /// empty cells are often omitted.
    async fn read(&self, sheet: &str) -> SheetsResult<Vec<Vec<String>>>;

    /// Appends one row below the last non-empty row and returns its row
    /// number.
    async fn append(&self, sheet: &str, values: Vec<String>) -> SheetsResult<u32>;

    /// Overwrites one row starting at column A.
    async fn update(&self, sheet: &str, row: u32, values: Vec<String>) -> SheetsResult<()>;

    /// Overwrites several rows in one request.
    async fn batch_update(&self, updates: Vec<RowUpdate>) -> SheetsResult<()>;

    /// Blanks every cell of one row. The row itself stays in place.
    async fn clear(&self, sheet: &str, row: u32) -> SheetsResult<()>;
}

// =============================================================================
// A1 Notation
// =============================================================================

/// Spreadsheet column letters for a 1-based column index (`1 → A`, `27 → AA`).
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A1 range covering `width` cells of one row, e.g. `Patients!A5:L5`.
pub fn row_range(sheet: &str, row: u32, width: usize) -> String {
    let last = column_letter(width.max(1));
    format!("{sheet}!A{row}:{last}{row}")
}

/// Row number of the first cell in an A1 range (`Patients!A5:L5 → 5`).
pub fn range_start_row(range: &str) -> SheetsResult<u32> {
    let cells = range.rsplit_once('!').map(|(_, cells)| cells).unwrap_or(range);
    let first = cells.split(':').next().unwrap_or_default();
    let digits: String = first.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();

    digits
        .parse::<u32>()
        .map_err(|_| SheetsError::InvalidRange(range.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(12), "L");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_row_range() {
        assert_eq!(row_range("Patients", 5, 12), "Patients!A5:L5");
        assert_eq!(row_range("UserRoles", 2, 0), "UserRoles!A2:A2");
    }

    #[test]
    fn test_range_start_row() {
        assert_eq!(range_start_row("Patients!A5:L5").unwrap(), 5);
        assert_eq!(range_start_row("'Stock Log'!B12").unwrap(), 12);
        assert_eq!(range_start_row("A7:C7").unwrap(), 7);
        assert!(range_start_row("Patients!A:L").is_err());
    }
}
