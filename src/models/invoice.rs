use crate::error::{AppError, Result};

/// Fixed cell addresses of the invoice template, in A1 notation
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLayout {
    /// Range read once at the start of a run
    pub range: &'static str,
    pub date_cell: &'static str,
    pub number_cell: &'static str,
    pub total_cell: &'static str,
}

impl Default for InvoiceLayout {
    fn default() -> Self {
        Self {
            range: "A1:H25",
            date_cell: "C9",
            number_cell: "F12",
            total_cell: "F19",
        }
    }
}

impl InvoiceLayout {
    /// Position of the current invoice number inside the grid read from `range`
    pub fn number_position(&self) -> Result<CellPosition> {
        CellPosition::parse(self.number_cell)
    }
}

/// Zero-based row/column of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    pub row: usize,
    pub column: usize,
}

impl CellPosition {
    /// Parse a single-cell A1 reference such as `F12` or `AA3`
    pub fn parse(cell: &str) -> Result<Self> {
        let invalid = || AppError::Config(format!("Invalid cell reference: {:?}", cell));

        let split = cell
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cell.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let column = letters
            .chars()
            .fold(0usize, |acc, c| {
                acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1)
            })
            - 1;
        let row: usize = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        Ok(Self {
            row: row - 1,
            column,
        })
    }

    /// Cell value at this position, or `None` when the grid is too short
    pub fn lookup<'a>(&self, grid: &'a [Vec<String>]) -> Option<&'a str> {
        grid.get(self.row)
            .and_then(|row| row.get(self.column))
            .map(String::as_str)
    }
}
