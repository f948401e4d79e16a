//! Spreadsheet rendering of a table.

use rust_xlsxwriter::Workbook;

use super::DeriveError;
use crate::table::{ColumnValues, Table};

/// Render the table as a single-worksheet XLSX document: a header row with
/// the column names, then one row per table row in column order. Numeric
/// cells keep their numeric type; nulls become blank cells.
pub fn render_export(table: &Table) -> Result<Vec<u8>, DeriveError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, column) in table.columns().iter().enumerate() {
        let col = col as u16;
        sheet.write_string(0, col, &column.name)?;
        match &column.values {
            ColumnValues::Numeric(values) => {
                for (row, value) in values.iter().enumerate() {
                    if let Some(v) = value {
                        sheet.write_number(row as u32 + 1, col, *v)?;
                    }
                }
            }
            ColumnValues::Text(values) => {
                for (row, value) in values.iter().enumerate() {
                    if let Some(v) = value {
                        sheet.write_string(row as u32 + 1, col, v)?;
                    }
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
