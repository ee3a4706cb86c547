use super::exporter::export_pdf;
use super::locator::resolve_working_copy;
use super::notifier::send_invoice_email;
use super::populator::{InvoiceValues, populate};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::google::{DriveOperations, MailOperations, SpreadsheetOperations};
use crate::models::InvoiceLayout;
use crate::store::Store;
use chrono::{Local, NaiveDate};
use indicatif::ProgressStyle;
use std::path::PathBuf;
use tracing::{Span, info, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Copy, read, populate, export, send
const PIPELINE_STEPS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceReceipt {
    pub spreadsheet_id: String,
    pub values: InvoiceValues,
    pub pdf_path: PathBuf,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The working copy had no values in the invoice range; nothing was written or sent
    NoData { spreadsheet_id: String },
    Sent(InvoiceReceipt),
}

pub struct InvoiceEngine<SC, DC, MC, IS> {
    config: Config,
    layout: InvoiceLayout,
    today: NaiveDate,
    sheets_client: SC,
    drive_client: DC,
    mail_client: MC,
    id_store: IS,
}

impl<SC, DC, MC, IS> InvoiceEngine<SC, DC, MC, IS>
where
    SC: SpreadsheetOperations + Sync,
    DC: DriveOperations + Sync,
    MC: MailOperations + Sync,
    IS: Store<String> + Sync,
{
    pub fn new(
        config: Config,
        sheets_client: SC,
        drive_client: DC,
        mail_client: MC,
        id_store: IS,
    ) -> Self {
        Self {
            config,
            layout: InvoiceLayout::default(),
            today: Local::now().date_naive(),
            sheets_client,
            drive_client,
            mail_client,
            id_store,
        }
    }

    /// Date used for the copy title, invoice date and email subject
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Run the whole pipeline. Any failing step stops the run and is returned.
    ///
    /// The recorded working-copy id is updated as soon as the copy exists and is not
    /// rolled back if a later step fails.
    #[instrument(name = "Invoice", skip_all)]
    pub async fn run(&self) -> Result<RunOutcome> {
        let span = Span::current();
        span.pb_set_style(
            &ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
            )
            .map_err(|e| AppError::Other(e.into()))?,
        );
        span.pb_set_length(PIPELINE_STEPS);

        span.pb_set_message("Copying spreadsheet");
        let spreadsheet_id = resolve_working_copy(
            &self.id_store,
            self.config.spreadsheet_id.as_deref(),
            &self.drive_client,
            self.today,
        )
        .await?;
        span.pb_inc(1);

        span.pb_set_message("Reading invoice");
        let grid = self
            .sheets_client
            .read_range(&spreadsheet_id, self.layout.range)
            .await?;
        span.pb_inc(1);

        if grid.is_empty() {
            info!(spreadsheet_id = %spreadsheet_id, "No data found");
            return Ok(RunOutcome::NoData { spreadsheet_id });
        }

        // Computed before any write, so a bad invoice number leaves the copy untouched
        let values = InvoiceValues::compute(&grid, &self.layout, self.today, &self.config.salary)?;

        span.pb_set_message("Populating invoice");
        populate(&self.sheets_client, &spreadsheet_id, &self.layout, &values).await?;
        span.pb_inc(1);

        span.pb_set_message("Exporting PDF");
        let pdf_path = export_pdf(
            &self.drive_client,
            &spreadsheet_id,
            &self.config.paths.output_dir,
        )
        .await?;
        span.pb_inc(1);

        span.pb_set_message("Sending email");
        let message_id =
            send_invoice_email(&self.mail_client, &pdf_path, &self.config.email, self.today)
                .await?;
        span.pb_inc(1);

        info!(
            spreadsheet_id = %spreadsheet_id,
            invoice_number = %values.number,
            "Invoice sent"
        );

        Ok(RunOutcome::Sent(InvoiceReceipt {
            spreadsheet_id,
            values,
            pdf_path,
            message_id,
        }))
    }
}
