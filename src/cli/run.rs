use crate::config::Config;
use crate::error::Result;
use crate::google::{GoogleClient, authenticate};
use crate::invoice::{InvoiceEngine, RunOutcome};
use crate::store::TextFile;
use tracing::info;

pub async fn execute() -> Result<()> {
    let config = Config::load()?;

    // Nothing remote is touched until a valid credential exists
    let credential = authenticate(&config.paths).await?;
    let client = GoogleClient::new(credential.access_token)?;
    let id_store = TextFile::new(&config.paths.spreadsheet_id_file);

    let engine = InvoiceEngine::new(config, client.clone(), client.clone(), client, id_store);

    match engine.run().await? {
        RunOutcome::NoData { spreadsheet_id } => {
            info!(
                url = GoogleClient::spreadsheet_url(&spreadsheet_id),
                "No data found, nothing sent"
            );
        }
        RunOutcome::Sent(receipt) => {
            info!(
                url = GoogleClient::spreadsheet_url(&receipt.spreadsheet_id),
                invoice_number = %receipt.values.number,
                pdf = ?receipt.pdf_path,
                message_id = %receipt.message_id,
                "Invoice completed"
            );
        }
    }

    Ok(())
}
