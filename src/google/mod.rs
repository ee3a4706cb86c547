mod auth;
mod client;
mod types;

pub use auth::{authenticate, clear_tokens};
pub use client::GoogleClient;

use crate::error::Result;
use async_trait::async_trait;

/// Scopes requested for the Sheets, Drive and Gmail calls made by a run
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/gmail.send",
];

#[async_trait]
pub trait SpreadsheetOperations {
    /// Read `range` as rows of formatted cell strings
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Write one cell as if the value had been typed by a user
    async fn set_cell(&self, spreadsheet_id: &str, cell: &str, value: &str) -> Result<()>;
}

#[async_trait]
pub trait DriveOperations {
    /// Copy a file and return the id of the copy
    async fn copy_file(&self, file_id: &str, title: &str) -> Result<String>;

    async fn export_pdf(&self, file_id: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait MailOperations {
    /// Send a base64url-encoded RFC 5322 message and return its message id
    async fn send_raw(&self, raw: &str) -> Result<String>;
}
