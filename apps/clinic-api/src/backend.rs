//! Backend selection.
//!
//! Exactly one `DataService` is built at startup; every handler shares it
//! through `AppState`.

use std::sync::Arc;

use clinic_core::DataService;
use clinic_db::{DbError, SqliteDataService};
use clinic_sheets::{ServiceAccount, SheetsDataService, SheetsError};
use tracing::info;

use crate::config::BackendConfig;

/// Failure to bring up the configured backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("SQLite backend: {0}")]
    Sqlite(#[from] DbError),

    #[error("Google Sheets backend: {0}")]
    Sheets(#[from] SheetsError),
}

/// Builds the configured backend.
pub async fn connect_backend(config: &BackendConfig) -> Result<Arc<dyn DataService>, BackendError> {
    let service: Arc<dyn DataService> = match config {
        BackendConfig::Sqlite { path } => {
            info!(path = %path.display(), "Opening SQLite backend");
            Arc::new(SqliteDataService::connect(path.clone()).await?)
        }
        BackendConfig::GoogleSheets {
            spreadsheet_id,
            client_email,
            private_key,
        } => {
            let account = ServiceAccount::new(client_email.clone(), private_key);
            Arc::new(SheetsDataService::connect(spreadsheet_id.clone(), account)?)
        }
    };

    info!(backend = %service.backend(), "Data backend ready");
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::BackendKind;

    const TEST_KEY: &str =
        include_str!("../../../crates/clinic-sheets/testdata/test_service_account_key.pem");

    #[tokio::test]
    async fn test_sqlite_selected() {
        let path = std::env::temp_dir().join(format!("clinic-api-{}.db", uuid::Uuid::new_v4()));
        let service = connect_backend(&BackendConfig::Sqlite { path: path.clone() })
            .await
            .unwrap();

        assert_eq!(service.backend(), BackendKind::Sqlite);
        assert!(service.user_accounts().is_some());
        assert!(service.sheet_rows().is_none());

        drop(service);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_sheets_selected_without_network() {
        let service = connect_backend(&BackendConfig::GoogleSheets {
            spreadsheet_id: "1AbC".to_string(),
            client_email: "clinic@project.iam.gserviceaccount.com".to_string(),
            private_key: TEST_KEY.to_string(),
        })
        .await
        .unwrap();

        assert_eq!(service.backend(), BackendKind::GoogleSheets);
        assert!(service.sheet_rows().is_some());
        assert!(service.user_accounts().is_none());
    }

    #[tokio::test]
    async fn test_bad_key_is_a_startup_error() {
        let result = connect_backend(&BackendConfig::GoogleSheets {
            spreadsheet_id: "1AbC".to_string(),
            client_email: "clinic@project.iam.gserviceaccount.com".to_string(),
            private_key: "not a key".to_string(),
        })
        .await;
        assert!(matches!(result, Err(BackendError::Sheets(_))));
    }
}
