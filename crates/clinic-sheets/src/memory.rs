//! # In-Memory Spreadsheet
//!
//! A `SheetsTransport` that keeps tabs in memory. Used by the test suites
//! and for running the API without Google credentials.
//!
//! Failures can be injected per operation and tab to exercise the
//! compensating writes in `record_invoice`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use clinic_core::RowUpdate;
use tokio::sync::RwLock;

use crate::error::{SheetsError, SheetsResult};
use crate::records::all_tabs;
use crate::transport::SheetsTransport;

/// Transport operation, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Read,
    Append,
    Update,
    Clear,
}

#[derive(Debug)]
struct Fault {
    op: TransportOp,
    sheet: String,
    remaining: usize,
}

#[derive(Debug, Default)]
struct State {
    tabs: BTreeMap<String, Vec<Vec<String>>>,
    faults: Vec<Fault>,
}

impl State {
    fn check(&mut self, op: TransportOp, sheet: &str) -> SheetsResult<()> {
        let hit = self
            .faults
            .iter_mut()
            .find(|f| f.op == op && f.sheet == sheet && f.remaining > 0);

        match hit {
            Some(fault) => {
                fault.remaining -= 1;
                Err(SheetsError::Api {
                    status: 503,
                    message: format!("injected {op:?} failure on {sheet}"),
                })
            }
            None => Ok(()),
        }
    }

    fn tab_mut(&mut self, sheet: &str) -> SheetsResult<&mut Vec<Vec<String>>> {
        self.tabs
            .get_mut(sheet)
            .ok_or_else(|| SheetsError::MissingSheet(sheet.to_string()))
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn row_index(row: u32) -> SheetsResult<usize> {
    if row == 0 {
        return Err(SheetsError::InvalidRange("row 0".to_string()));
    }
    Ok(row as usize - 1)
}

#[derive(Debug, Default)]
pub struct MemorySheets {
    state: RwLock<State>,
}

impl MemorySheets {
    /// A spreadsheet with no tabs.
    pub fn new() -> Self {
        MemorySheets::default()
    }

    /// A spreadsheet with every clinic tab and its header row.
    pub fn with_clinic_tabs() -> Self {
        let tabs = all_tabs()
            .iter()
            .map(|(sheet, headers)| {
                let header_row = headers.iter().map(|h| h.to_string()).collect();
                (sheet.to_string(), vec![header_row])
            })
            .collect();

        MemorySheets {
            state: RwLock::new(State {
                tabs,
                faults: Vec::new(),
            }),
        }
    }

    /// Replaces a tab's content (header row first).
    pub async fn put_tab(&self, sheet: &str, rows: Vec<Vec<String>>) {
        self.state.write().await.tabs.insert(sheet.to_string(), rows);
    }

    /// Snapshot of a tab's rows, header first.
    pub async fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.state.read().await.tabs.get(sheet).cloned().unwrap_or_default()
    }

    /// Number of non-blank data rows (excluding the header).
    pub async fn data_row_count(&self, sheet: &str) -> usize {
        self.state
            .read()
            .await
            .tabs
            .get(sheet)
            .map(|rows| rows.iter().skip(1).filter(|r| !is_blank(r)).count())
            .unwrap_or(0)
    }

    /// Makes the next `times` calls of `op` on `sheet` fail with a 503.
    pub async fn fail_on(&self, op: TransportOp, sheet: &str, times: usize) {
        self.state.write().await.faults.push(Fault {
            op,
            sheet: sheet.to_string(),
            remaining: times,
        });
    }
}

#[async_trait]
impl SheetsTransport for MemorySheets {
    async fn read(&self, sheet: &str) -> SheetsResult<Vec<Vec<String>>> {
        let mut state = self.state.write().await;
        state.check(TransportOp::Read, sheet)?;
        state
            .tabs
            .get(sheet)
            .cloned()
            .ok_or_else(|| SheetsError::MissingSheet(sheet.to_string()))
    }

    async fn append(&self, sheet: &str, values: Vec<String>) -> SheetsResult<u32> {
        let mut state = self.state.write().await;
        state.check(TransportOp::Append, sheet)?;
        let rows = state.tab_mut(sheet)?;

        // Below the last non-blank row, reusing cleared rows at the end.
        let next = rows.iter().rposition(|r| !is_blank(r)).map_or(0, |i| i + 1);
        rows.truncate(next);
        rows.push(values);

        Ok(rows.len() as u32)
    }

    async fn update(&self, sheet: &str, row: u32, values: Vec<String>) -> SheetsResult<()> {
        let mut state = self.state.write().await;
        state.check(TransportOp::Update, sheet)?;
        let index = row_index(row)?;
        let rows = state.tab_mut(sheet)?;

        if rows.len() <= index {
            rows.resize(index + 1, Vec::new());
        }
        let target = &mut rows[index];
        if target.len() < values.len() {
            target.resize(values.len(), String::new());
        }
        for (cell, value) in target.iter_mut().zip(values) {
            *cell = value;
        }

        Ok(())
    }

    async fn batch_update(&self, updates: Vec<RowUpdate>) -> SheetsResult<()> {
        {
            let mut state = self.state.write().await;
            for u in &updates {
                state.check(TransportOp::Update, &u.sheet)?;
                state.tab_mut(&u.sheet)?;
                row_index(u.row)?;
            }
        }

        for u in updates {
            self.update(&u.sheet, u.row, u.values).await?;
        }
        Ok(())
    }

    async fn clear(&self, sheet: &str, row: u32) -> SheetsResult<()> {
        let mut state = self.state.write().await;
        state.check(TransportOp::Clear, sheet)?;
        let index = row_index(row)?;
        let rows = state.tab_mut(sheet)?;

        if let Some(target) = rows.get_mut(index) {
            target.iter_mut().for_each(String::clear);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_update_clear() {
        let sheets = MemorySheets::new();
        sheets.put_tab("Notes", vec![cells(&["id", "text"])]).await;

        assert_eq!(sheets.append("Notes", cells(&["1", "first"])).await.unwrap(), 2);
        assert_eq!(sheets.append("Notes", cells(&["2", "second"])).await.unwrap(), 3);

        sheets.update("Notes", 2, cells(&["1", "edited"])).await.unwrap();
        assert_eq!(sheets.rows("Notes").await[1], cells(&["1", "edited"]));

        // Clearing the last row lets the next append reuse it.
        sheets.clear("Notes", 3).await.unwrap();
        assert_eq!(sheets.data_row_count("Notes").await, 1);
        assert_eq!(sheets.append("Notes", cells(&["3", "third"])).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_tab() {
        let sheets = MemorySheets::new();
        assert!(matches!(sheets.read("Nope").await, Err(SheetsError::MissingSheet(_))));
        assert!(sheets.append("Nope", Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let sheets = MemorySheets::with_clinic_tabs();
        sheets.fail_on(TransportOp::Read, "Patients", 1).await;

        assert!(matches!(
            sheets.read("Patients").await,
            Err(SheetsError::Api { status: 503, .. })
        ));
        assert!(sheets.read("Patients").await.is_ok());
    }

    #[tokio::test]
    async fn test_batch_update_is_checked_before_writing() {
        let sheets = MemorySheets::new();
        sheets.put_tab("Notes", vec![cells(&["id", "text"]), cells(&["1", "a"])]).await;

        let result = sheets
            .batch_update(vec![
                RowUpdate { sheet: "Notes".to_string(), row: 2, values: cells(&["1", "b"]) },
                RowUpdate { sheet: "Missing".to_string(), row: 2, values: cells(&["x"]) },
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(sheets.rows("Notes").await[1], cells(&["1", "a"]));
    }
}
