use super::populator::invoice_date;
use crate::config::EmailConfig;
use crate::error::{AppError, Result};
use crate::google::MailOperations;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::NaiveDate;
use lettre::Message;
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Attachment, Body, Mailbox, MultiPart};
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Parse a comma-separated address list
fn parse_mailboxes(field: &str, value: &str) -> Result<Vec<Mailbox>> {
    let mailboxes = value
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(|address| {
            address.parse::<Mailbox>().map_err(|e| {
                AppError::Mail(format!("Invalid {} address {:?}: {}", field, address, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if mailboxes.is_empty() {
        return Err(AppError::Mail(format!("No {} address configured", field)));
    }

    Ok(mailboxes)
}

/// Multipart message carrying the invoice PDF as its only part
pub(super) fn build_message(
    file_name: &str,
    pdf: Vec<u8>,
    email: &EmailConfig,
    today: NaiveDate,
) -> Result<Message> {
    let sender = parse_mailboxes("sender", &email.sender)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Mail("No sender address configured".to_string()))?;

    let mut builder = Message::builder()
        .from(sender)
        .subject(format!("Invoice {}", invoice_date(today)));
    for mailbox in parse_mailboxes("recipient", &email.recipient)? {
        builder = builder.to(mailbox);
    }
    for mailbox in parse_mailboxes("cc", &email.cc)? {
        builder = builder.cc(mailbox);
    }

    let content_type = ContentType::parse(PDF_CONTENT_TYPE)
        .map_err(|e| AppError::Mail(format!("Invalid content type: {}", e)))?;
    let body = Body::new_with_encoding(pdf, ContentTransferEncoding::Base64)
        .map_err(|_| AppError::Mail("Failed to base64-encode attachment".to_string()))?;
    let attachment = Attachment::new(file_name.to_string()).body(body, content_type);

    builder
        .multipart(MultiPart::mixed().singlepart(attachment))
        .map_err(|e| AppError::Mail(format!("Failed to build message: {}", e)))
}

/// Whole message as the URL-safe base64 string expected in Gmail's `raw` field
pub(super) fn encode_raw(message: &Message) -> String {
    URL_SAFE.encode(message.formatted())
}

/// Email the exported invoice and return the provider's message id
#[instrument(name = "Sending invoice email", skip(mail, email))]
pub async fn send_invoice_email<M>(
    mail: &M,
    pdf_path: &Path,
    email: &EmailConfig,
    today: NaiveDate,
) -> Result<String>
where
    M: MailOperations + Sync,
{
    let file_name = pdf_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AppError::Mail(format!("Invalid attachment path {:?}", pdf_path)))?;
    let pdf = fs::read(pdf_path)?;

    let message = build_message(file_name, pdf, email, today)?;
    let message_id = mail.send_raw(&encode_raw(&message)).await?;
    info!(message_id = %message_id, "Email sent");

    Ok(message_id)
}
