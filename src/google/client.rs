use super::types::{SendMessageRequest, SentMessage};
use super::{DriveOperations, MailOperations, SpreadsheetOperations};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use google_drive3::api::{DriveHub, File, Scope as DriveScope};
use google_sheets4::api::{Scope as SheetsScope, Sheets, ValueRange};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::Value;
use tracing::{debug, instrument};

const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";
const PDF_MIME_TYPE: &str = "application/pdf";

/// Written values are parsed as if typed into the sheet, so numbers and dates keep their type
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// Authenticated access to the Sheets, Drive and Gmail APIs with one bearer token
#[derive(Clone)]
pub struct GoogleClient {
    sheets: Sheets<HttpsConnector<HttpConnector>>,
    drive: DriveHub<HttpsConnector<HttpConnector>>,
    http: reqwest::Client,
    access_token: String,
}

impl GoogleClient {
    pub fn new(access_token: String) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

        // The hubs accept a plain access token as their authenticator
        let sheets = Sheets::new(client.clone(), access_token.clone());
        let drive = DriveHub::new(client, access_token.clone());

        Ok(Self {
            sheets,
            drive,
            http: reqwest::Client::new(),
            access_token,
        })
    }

    pub fn spreadsheet_url(spreadsheet_id: &str) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", spreadsheet_id)
    }
}

/// Render a cell value from the Sheets API as the string shown to the user
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Body for a `values.update` of one cell
fn single_cell(cell: &str, value: &str) -> ValueRange {
    ValueRange {
        major_dimension: Some("ROWS".to_string()),
        range: Some(cell.to_string()),
        values: Some(vec![vec![Value::String(value.to_string())]]),
    }
}

#[async_trait]
impl SpreadsheetOperations for GoogleClient {
    #[instrument(name = "Reading invoice range", skip(self))]
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let (_, response) = self
            .sheets
            .spreadsheets()
            .values_get(spreadsheet_id, range)
            .major_dimension("ROWS")
            .add_scope(SheetsScope::Spreadsheet)
            .doit()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to read range '{}': {}", range, e)))?;

        let rows = response
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();

        Ok(rows)
    }

    #[instrument(name = "Updating cell", skip(self))]
    async fn set_cell(&self, spreadsheet_id: &str, cell: &str, value: &str) -> Result<()> {
        self.sheets
            .spreadsheets()
            .values_update(single_cell(cell, value), spreadsheet_id, cell)
            .value_input_option(VALUE_INPUT_OPTION)
            .add_scope(SheetsScope::Spreadsheet)
            .doit()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to update cell {}: {}", cell, e)))?;

        Ok(())
    }
}

#[async_trait]
impl DriveOperations for GoogleClient {
    #[instrument(name = "Copying spreadsheet", skip(self))]
    async fn copy_file(&self, file_id: &str, title: &str) -> Result<String> {
        let request = File {
            name: Some(title.to_string()),
            ..Default::default()
        };

        let (_, copied) = self
            .drive
            .files()
            .copy(request, file_id)
            .add_scope(DriveScope::Full)
            .doit()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to copy file {}: {}", file_id, e)))?;

        copied
            .id
            .ok_or_else(|| AppError::Drive("Copied file has empty ID".to_string()))
    }

    #[instrument(name = "Exporting PDF", skip(self))]
    async fn export_pdf(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}/export", DRIVE_API_URL, file_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("mimeType", PDF_MIME_TYPE)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Drive(format!(
                "Failed to export file {}: {} - {}",
                file_id, status, body
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl MailOperations for GoogleClient {
    #[instrument(name = "Sending email", skip_all)]
    async fn send_raw(&self, raw: &str) -> Result<String> {
        let url = format!("{}/users/me/messages/send", GMAIL_API_URL);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&SendMessageRequest { raw })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!(
                "Failed to send message: {} - {}",
                status, body
            )));
        }

        let sent: SentMessage = response.json().await?;
        debug!(thread_id = ?sent.thread_id, "Message accepted");

        Ok(sent.id)
    }
}
