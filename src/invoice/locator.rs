use crate::error::{AppError, Result};
use crate::google::DriveOperations;
use crate::store::Store;
use chrono::NaiveDate;
use tracing::{info, instrument};

/// Drive title of the working copy, e.g. `Invoice Mar-07-2024`
pub(super) fn copy_title(date: NaiveDate) -> String {
    format!("Invoice {}", date.format("%b-%d-%Y"))
}

/// Copy the last working spreadsheet (or `fallback_id` on first run) and record the copy.
///
/// The previous working copy is only ever read from; the returned id is always new.
#[instrument(name = "Resolving working copy", skip_all)]
pub async fn resolve_working_copy<S, D>(
    id_store: &S,
    fallback_id: Option<&str>,
    drive: &D,
    today: NaiveDate,
) -> Result<String>
where
    S: Store<String> + Sync,
    D: DriveOperations + Sync,
{
    let source_id = match id_store.load()? {
        Some(id) => {
            info!(spreadsheet_id = %id, "Using spreadsheet ID from previous run");
            id
        }
        None => {
            let id = fallback_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    AppError::Config(
                        "No previous spreadsheet recorded and SPREADSHEET_ID is not set"
                            .to_string(),
                    )
                })?;
            info!(spreadsheet_id = %id, "Using spreadsheet ID from environment");
            id.to_string()
        }
    };

    let copy_id = drive.copy_file(&source_id, &copy_title(today)).await?;
    if copy_id.is_empty() || copy_id == source_id {
        return Err(AppError::Drive(format!(
            "Copy of {} did not produce a new spreadsheet",
            source_id
        )));
    }

    id_store.save(&copy_id)?;
    info!(spreadsheet_id = %copy_id, "New spreadsheet ID saved");

    Ok(copy_id)
}
