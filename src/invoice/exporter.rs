use crate::error::Result;
use crate::google::DriveOperations;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub(super) fn pdf_file_name(spreadsheet_id: &str) -> String {
    format!("spreadsheet_{}.pdf", spreadsheet_id)
}

/// Export the whole spreadsheet as PDF into `output_dir`, replacing any earlier export
#[instrument(name = "Downloading PDF", skip(drive, output_dir))]
pub async fn export_pdf<D>(drive: &D, spreadsheet_id: &str, output_dir: &Path) -> Result<PathBuf>
where
    D: DriveOperations + Sync,
{
    let bytes = drive.export_pdf(spreadsheet_id).await?;

    let path = output_dir.join(pdf_file_name(spreadsheet_id));
    fs::write(&path, &bytes)?;
    info!(path = ?path, size = bytes.len(), "Spreadsheet downloaded as PDF");

    Ok(path)
}
