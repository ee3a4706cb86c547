use crate::error::{AppError, Result};
use crate::google::{DriveOperations, MailOperations, SpreadsheetOperations};
use crate::models::invoice::CellPosition;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Records every remote call; spreadsheets live in memory and copies duplicate them
#[derive(Default)]
pub(crate) struct MockState {
    pub sheets: HashMap<String, Vec<Vec<String>>>,
    /// (source id, title, copy id)
    pub copies: Vec<(String, String, String)>,
    pub reads: Vec<String>,
    /// (spreadsheet id, cell, value)
    pub writes: Vec<(String, String, String)>,
    pub exports: Vec<String>,
    pub sent: Vec<String>,
    pub next_id: usize,
    pub copy_returns_source: bool,
    pub fail_export: bool,
    pub fail_send: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MockGoogle {
    pub state: Arc<Mutex<MockState>>,
}

impl MockGoogle {
    pub(crate) fn with_sheet(spreadsheet_id: &str, grid: Vec<Vec<String>>) -> Self {
        let google = Self::default();
        google
            .state
            .lock()
            .unwrap()
            .sheets
            .insert(spreadsheet_id.to_string(), grid);
        google
    }

    pub(crate) fn cell(&self, spreadsheet_id: &str, cell: &str) -> Option<String> {
        let position = CellPosition::parse(cell).unwrap();
        let state = self.state.lock().unwrap();
        position
            .lookup(state.sheets.get(spreadsheet_id)?)
            .map(str::to_string)
    }
}

/// A template grid with `number` at F12 and padding around it
pub(crate) fn grid_with_number(number: &str) -> Vec<Vec<String>> {
    let mut grid = vec![vec!["".to_string(); 8]; 25];
    grid[0][0] = "INVOICE".to_string();
    grid[11][4] = "Invoice #".to_string();
    grid[11][5] = number.to_string();
    grid
}

#[async_trait]
impl SpreadsheetOperations for MockGoogle {
    async fn read_range(&self, spreadsheet_id: &str, _range: &str) -> Result<Vec<Vec<String>>> {
        let mut state = self.state.lock().unwrap();
        state.reads.push(spreadsheet_id.to_string());
        state
            .sheets
            .get(spreadsheet_id)
            .cloned()
            .ok_or_else(|| AppError::Sheets(format!("Requested entity was not found: {}", spreadsheet_id)))
    }

    async fn set_cell(&self, spreadsheet_id: &str, cell: &str, value: &str) -> Result<()> {
        let position = CellPosition::parse(cell)?;
        let mut state = self.state.lock().unwrap();
        state.writes.push((
            spreadsheet_id.to_string(),
            cell.to_string(),
            value.to_string(),
        ));

        let grid = state
            .sheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| AppError::Sheets(format!("Requested entity was not found: {}", spreadsheet_id)))?;
        if grid.len() <= position.row {
            grid.resize(position.row + 1, Vec::new());
        }
        let row = &mut grid[position.row];
        if row.len() <= position.column {
            row.resize(position.column + 1, String::new());
        }
        row[position.column] = value.to_string();

        Ok(())
    }
}

#[async_trait]
impl DriveOperations for MockGoogle {
    async fn copy_file(&self, file_id: &str, title: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let grid = state
            .sheets
            .get(file_id)
            .cloned()
            .ok_or_else(|| AppError::Drive(format!("File not found: {}", file_id)))?;

        let returns_source = state.copy_returns_source;
        let copy_id = match returns_source {
            true => file_id.to_string(),
            false => {
                state.next_id += 1;
                format!("copy_{}", state.next_id)
            }
        };
        state.sheets.insert(copy_id.clone(), grid);
        state
            .copies
            .push((file_id.to_string(), title.to_string(), copy_id.clone()));

        Ok(copy_id)
    }

    async fn export_pdf(&self, file_id: &str) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_export {
            return Err(AppError::Drive("Export quota exceeded".to_string()));
        }
        state.exports.push(file_id.to_string());
        Ok(format!("%PDF-1.4 {}", file_id).into_bytes())
    }
}

#[async_trait]
impl MailOperations for MockGoogle {
    async fn send_raw(&self, raw: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_send {
            return Err(AppError::Mail("Insufficient Permission".to_string()));
        }
        state.sent.push(raw.to_string());
        Ok(format!("msg_{}", state.sent.len()))
    }
}
