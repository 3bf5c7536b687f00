//! # Compensating Writes
//!
//! Google Sheets has no transactions. Multi-row writes go through a
//! [`Saga`], which remembers how to undo each completed step.
//!
//! ## Rollback
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  step 1: append Invoices row 8          undo: clear Invoices!8:8        │
//! │  step 2: append Transactions row 31     undo: clear Transactions!31:31  │
//! │  step 3: update Inventory row 5         undo: rewrite previous cells    │
//! │  step 4: append StockAdjustments  ✗ fails                              │
//! │                                                                         │
//! │  abort(): undo 3, then 2, then 1                                        │
//! │    all undone      → original error                                     │
//! │    an undo fails   → SheetsError::Compensation { step, .. }             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{error, warn};

use crate::error::{SheetsError, SheetsResult};
use crate::transport::SheetsTransport;

#[derive(Debug)]
enum Undo {
    Clear { sheet: String, row: u32 },
    Restore { sheet: String, row: u32, previous: Vec<String> },
}

#[derive(Debug)]
struct Step {
    name: String,
    undo: Undo,
}

pub(crate) struct Saga<'a> {
    transport: &'a dyn SheetsTransport,
    done: Vec<Step>,
}

impl<'a> Saga<'a> {
    pub(crate) fn new(transport: &'a dyn SheetsTransport) -> Self {
        Saga {
            transport,
            done: Vec::new(),
        }
    }

    /// Appends a row; undone by clearing it.
    pub(crate) async fn append(&mut self, sheet: &str, values: Vec<String>) -> SheetsResult<u32> {
        let row = self.transport.append(sheet, values).await?;
        self.done.push(Step {
            name: format!("append {sheet} row {row}"),
            undo: Undo::Clear {
                sheet: sheet.to_string(),
                row,
            },
        });
        Ok(row)
    }

    /// Overwrites a row; undone by writing `previous` back.
    pub(crate) async fn replace(
        &mut self,
        sheet: &str,
        row: u32,
        previous: Vec<String>,
        values: Vec<String>,
    ) -> SheetsResult<()> {
        self.transport.update(sheet, row, values).await?;
        self.done.push(Step {
            name: format!("update {sheet} row {row}"),
            undo: Undo::Restore {
                sheet: sheet.to_string(),
                row,
                previous,
            },
        });
        Ok(())
    }

    /// Number of completed steps.
    pub(crate) fn len(&self) -> usize {
        self.done.len()
    }

    /// Undoes completed steps newest first and returns the error to report.
    pub(crate) async fn abort(self, cause: SheetsError) -> SheetsError {
        warn!(steps = self.done.len(), error = %cause, "Rolling back partial write");

        for step in self.done.into_iter().rev() {
            let result = match step.undo {
                Undo::Clear { ref sheet, row } => self.transport.clear(sheet, row).await,
                Undo::Restore {
                    ref sheet,
                    row,
                    ref previous,
                } => self.transport.update(sheet, row, previous.clone()).await,
            };

            if let Err(e) = result {
                error!(step = %step.name, error = %e, cause = %cause, "Compensation failed");
                return SheetsError::Compensation {
                    step: step.name,
                    message: format!("{e} (while undoing after: {cause})"),
                };
            }
        }

        cause
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySheets, TransportOp};

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn sheets() -> MemorySheets {
        let sheets = MemorySheets::new();
        sheets.put_tab("A", vec![cells(&["id", "v"]), cells(&["1", "old"])]).await;
        sheets.put_tab("B", vec![cells(&["id"])]).await;
        sheets
    }

    #[tokio::test]
    async fn test_abort_undoes_in_reverse() {
        let sheets = sheets().await;
        let mut saga = Saga::new(&sheets);

        saga.replace("A", 2, cells(&["1", "old"]), cells(&["1", "new"])).await.unwrap();
        saga.append("B", cells(&["b1"])).await.unwrap();
        assert_eq!(saga.len(), 2);

        let err = saga.abort(SheetsError::Network("boom".to_string())).await;
        assert!(matches!(err, SheetsError::Network(_)));
        assert_eq!(sheets.rows("A").await[1], cells(&["1", "old"]));
        assert_eq!(sheets.data_row_count("B").await, 0);
    }

    #[tokio::test]
    async fn test_failed_undo_names_the_step() {
        let sheets = sheets().await;
        let mut saga = Saga::new(&sheets);

        saga.append("B", cells(&["b1"])).await.unwrap();
        sheets.fail_on(TransportOp::Clear, "B", 1).await;

        let err = saga.abort(SheetsError::Network("boom".to_string())).await;
        match err {
            SheetsError::Compensation { step, message } => {
                assert_eq!(step, "append B row 2");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
