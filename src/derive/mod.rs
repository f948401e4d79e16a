//! Pure derivation of the EXPORT and PLOT artifacts from a table.
//!
//! Both functions are total for any well-formed table and perform no I/O;
//! the dataset save path is their only caller.

mod export;
mod plot;

pub use export::render_export;
pub use plot::render_plot;

use thiserror::Error;

/// Errors raised while rendering a derived artifact.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("spreadsheet rendering failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("plot rendering failed: {0}")]
    Plot(String),
}
