//! # Google Sheets v4 Client
//!
//! `SheetsTransport` over the Sheets REST API.
//!
//! ## Endpoints Used
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read          GET  /v4/spreadsheets/{id}/values/{sheet}                │
//! │  append        POST /v4/spreadsheets/{id}/values/{sheet}!A1:append      │
//! │  update        PUT  /v4/spreadsheets/{id}/values/{range}                │
//! │  batch_update  POST /v4/spreadsheets/{id}/values:batchUpdate            │
//! │  clear         POST /v4/spreadsheets/{id}/values/{range}:clear          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Values are written `RAW` so the text read back is exactly the text
//! written; reads use `UNFORMATTED_VALUE` so currency formatting applied in
//! the spreadsheet UI does not leak into parsed amounts.

use async_trait::async_trait;
use clinic_core::RowUpdate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::TokenProvider;
use crate::error::{SheetsError, SheetsResult};
use crate::transport::{range_start_row, row_range, SheetsTransport};

/// Sheets API base URL.
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Authenticated client for one spreadsheet.
#[derive(Debug)]
pub struct GoogleSheetsClient {
    client: reqwest::Client,
    auth: TokenProvider,
    spreadsheet_id: String,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(client: reqwest::Client, auth: TokenProvider, spreadsheet_id: impl Into<String>) -> Self {
        GoogleSheetsClient {
            client,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            base_url: SHEETS_API_URL.to_string(),
        }
    }

    /// Overrides the API base URL (for a local emulator).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn values_url(&self, suffix: &str) -> String {
        format!("{}/{}/values{}", self.base_url, self.spreadsheet_id, suffix)
    }

    fn range_url(&self, range: &str, action: &str) -> SheetsResult<reqwest::Url> {
        range_url(&self.values_url(""), range, action)
    }

    /// Sends a request with a bearer token and checks the status.
    async fn send(&self, request: reqwest::RequestBuilder) -> SheetsResult<reqwest::Response> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(response)
    }
}

/// Pulls `error.message` out of a Google error body, falling back to the
/// raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// `{values}/{range}{action}` with the range percent-encoded as a single
/// path segment. Tab names may contain `/`, `?` or `#`.
fn range_url(values_url: &str, range: &str, action: &str) -> SheetsResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(values_url)
        .map_err(|e| SheetsError::InvalidRange(format!("{values_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| SheetsError::InvalidRange(format!("{values_url}: not a path URL")))?
        .push(&format!("{range}{action}"));
    Ok(url)
}

/// Renders one unformatted cell value as text.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => if b { "TRUE" } else { "FALSE" }.to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsTransport for GoogleSheetsClient {
    async fn read(&self, sheet: &str) -> SheetsResult<Vec<Vec<String>>> {
        debug!(sheet = %sheet, "Reading sheet");

        let request = self.client.get(self.range_url(sheet, "")?).query(&[
            ("majorDimension", "ROWS"),
            ("valueRenderOption", "UNFORMATTED_VALUE"),
            ("dateTimeRenderOption", "FORMATTED_STRING"),
        ]);
        let range: ValueRange = self.send(request).await?.json().await?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append(&self, sheet: &str, values: Vec<String>) -> SheetsResult<u32> {
        debug!(sheet = %sheet, cells = values.len(), "Appending row");

        let request = self
            .client
            .post(self.range_url(&format!("{sheet}!A1"), ":append")?)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "majorDimension": "ROWS", "values": [values] }));
        let appended: AppendResponse = self.send(request).await?.json().await?;

        range_start_row(&appended.updates.updated_range)
    }

    async fn update(&self, sheet: &str, row: u32, values: Vec<String>) -> SheetsResult<()> {
        let range = row_range(sheet, row, values.len());
        debug!(range = %range, "Updating row");

        let request = self
            .client
            .put(self.range_url(&range, "")?)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [values] }));
        self.send(request).await?;
        Ok(())
    }

    async fn batch_update(&self, updates: Vec<RowUpdate>) -> SheetsResult<()> {
        debug!(rows = updates.len(), "Batch updating rows");

        let data: Vec<Value> = updates
            .into_iter()
            .map(|u| {
                json!({
                    "range": row_range(&u.sheet, u.row, u.values.len()),
                    "majorDimension": "ROWS",
                    "values": [u.values],
                })
            })
            .collect();

        let request = self
            .client
            .post(self.values_url(":batchUpdate"))
            .json(&json!({ "valueInputOption": "RAW", "data": data }));
        self.send(request).await?;
        Ok(())
    }

    async fn clear(&self, sheet: &str, row: u32) -> SheetsResult<()> {
        let range = format!("{sheet}!{row}:{row}");
        debug!(range = %range, "Clearing row");

        let request = self
            .client
            .post(self.range_url(&range, ":clear")?)
            .json(&json!({}));
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(json!("Ravi")), "Ravi");
        assert_eq!(cell_text(json!(41)), "41");
        assert_eq!(cell_text(json!(12.5)), "12.5");
        assert_eq!(cell_text(json!(true)), "TRUE");
        assert_eq!(cell_text(Value::Null), "");
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"Unable to parse range: Nope!A1","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "Unable to parse range: Nope!A1");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_range_url_keeps_tab_name_in_path() {
        let values = "https://sheets.googleapis.com/v4/spreadsheets/abc123/values";

        let url = range_url(values, "Patients!A5:L5", "").unwrap();
        assert_eq!(url.as_str(), format!("{values}/Patients!A5:L5"));

        let url = range_url(values, "Q1/Q2 #2?x=1!A1", ":append").unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path_segments().unwrap().count(), 5);
        assert!(url.path().ends_with("/Q1%2FQ2%20%232%3Fx=1!A1:append"));

        assert!(range_url("not a url", "Patients", "").is_err());
    }

    #[test]
    fn test_value_range_without_values() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"Empty!A1:Z1000","majorDimension":"ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
    }
}
