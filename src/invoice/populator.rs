use crate::error::{AppError, Result};
use crate::google::SpreadsheetOperations;
use crate::models::InvoiceLayout;
use chrono::NaiveDate;
use tracing::{debug, instrument};

/// Date as written into the invoice and the email subject, e.g. `Mar 07, 2024`
pub(crate) fn invoice_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Increment the invoice number found in `grid`.
///
/// Missing or non-numeric values are errors; nothing is defaulted.
pub(crate) fn next_invoice_number(grid: &[Vec<String>], layout: &InvoiceLayout) -> Result<String> {
    let position = layout.number_position()?;

    let current = position.lookup(grid).ok_or_else(|| {
        AppError::Data(format!(
            "Invoice number cell {} is outside the {} rows read",
            layout.number_cell,
            grid.len()
        ))
    })?;

    let number: i64 = current.trim().parse().map_err(|e| {
        AppError::Data(format!(
            "Invoice number {:?} in {} is not an integer: {}",
            current, layout.number_cell, e
        ))
    })?;

    let next = number.checked_add(1).ok_or_else(|| {
        AppError::Data(format!("Invoice number {} cannot be incremented", number))
    })?;

    Ok(next.to_string())
}

/// Values written into the working copy, all derived from the initial read
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceValues {
    pub date: String,
    pub number: String,
    pub total: String,
}

impl InvoiceValues {
    pub fn compute(
        grid: &[Vec<String>],
        layout: &InvoiceLayout,
        today: NaiveDate,
        total: &str,
    ) -> Result<Self> {
        Ok(Self {
            date: invoice_date(today),
            number: next_invoice_number(grid, layout)?,
            total: total.to_string(),
        })
    }
}

/// Write date, invoice number and total, in that order
#[instrument(name = "Populating invoice", skip(sheets, layout, values))]
pub async fn populate<S>(
    sheets: &S,
    spreadsheet_id: &str,
    layout: &InvoiceLayout,
    values: &InvoiceValues,
) -> Result<()>
where
    S: SpreadsheetOperations + Sync,
{
    for (cell, value) in [
        (layout.date_cell, &values.date),
        (layout.number_cell, &values.number),
        (layout.total_cell, &values.total),
    ] {
        sheets.set_cell(spreadsheet_id, cell, value).await?;
        debug!(cell, value = %value, "Cell updated");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::mocks::{MockGoogle, grid_with_number};

    #[test]
    fn test_invoice_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(invoice_date(date), "Mar 07, 2024");

        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(invoice_date(date), "Dec 31, 2025");
    }

    #[test]
    fn test_next_invoice_number() {
        let layout = InvoiceLayout::default();

        assert_eq!(next_invoice_number(&grid_with_number("42"), &layout).unwrap(), "43");
        assert_eq!(next_invoice_number(&grid_with_number(" 9 "), &layout).unwrap(), "10");
    }

    #[test]
    fn test_next_invoice_number_negative() {
        let layout = InvoiceLayout::default();

        assert_eq!(next_invoice_number(&grid_with_number("-1"), &layout).unwrap(), "0");
        assert_eq!(next_invoice_number(&grid_with_number("-5"), &layout).unwrap(), "-4");
    }

    #[test]
    fn test_next_invoice_number_non_numeric() {
        let layout = InvoiceLayout::default();

        for value in ["abc", "", "4.5", "1e3"] {
            let result = next_invoice_number(&grid_with_number(value), &layout);
            assert!(
                matches!(result, Err(AppError::Data(_))),
                "{:?} should be rejected, got {:?}",
                value,
                result
            );
        }
    }

    #[test]
    fn test_next_invoice_number_short_grid() {
        let layout = InvoiceLayout::default();

        // Too few rows
        let grid = vec![vec!["INVOICE".to_string()]; 5];
        assert!(matches!(
            next_invoice_number(&grid, &layout),
            Err(AppError::Data(_))
        ));

        // Sheets omits trailing empty cells, leaving row 12 too narrow
        let mut grid = grid_with_number("1");
        grid[11].truncate(5);
        assert!(matches!(
            next_invoice_number(&grid, &layout),
            Err(AppError::Data(_))
        ));
    }

    #[test]
    fn test_compute_values() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let values = InvoiceValues::compute(
            &grid_with_number("7"),
            &InvoiceLayout::default(),
            today,
            "1500.00",
        )
        .unwrap();

        assert_eq!(
            values,
            InvoiceValues {
                date: "Mar 07, 2024".to_string(),
                number: "8".to_string(),
                total: "1500.00".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_populate_writes_in_order() {
        let google = MockGoogle::with_sheet("sheet", grid_with_number("7"));
        let values = InvoiceValues {
            date: "Mar 07, 2024".to_string(),
            number: "8".to_string(),
            total: "0".to_string(),
        };

        populate(&google, "sheet", &InvoiceLayout::default(), &values)
            .await
            .unwrap();

        let cells: Vec<(String, String)> = google
            .state
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|(_, cell, value)| (cell.clone(), value.clone()))
            .collect();
        assert_eq!(
            cells,
            vec![
                ("C9".to_string(), "Mar 07, 2024".to_string()),
                ("F12".to_string(), "8".to_string()),
                ("F19".to_string(), "0".to_string()),
            ]
        );
        assert_eq!(google.cell("sheet", "F12").as_deref(), Some("8"));
    }
}
