//! Summary statistics over numeric columns.
//!
//! Reports the classic describe() shape per numeric column: count, mean,
//! sample standard deviation, min, quartiles, max. Quantiles use linear
//! interpolation between closest ranks. Nulls and non-finite values are
//! excluded from every figure.

use serde::Serialize;

use super::Table;

/// Statistics for one numeric column. Moments are `None` when the column
/// has too few non-null values to define them (count=0, or count=1 for the
/// sample standard deviation).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Summarize every numeric column of the table, in column order.
pub fn summarize(table: &Table) -> Vec<ColumnSummary> {
    table
        .numeric_columns()
        .map(|(name, values)| summarize_column(name, values))
        .collect()
}

fn summarize_column(name: &str, values: &[Option<f64>]) -> ColumnSummary {
    let mut xs: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    xs.sort_by(f64::total_cmp);

    let count = xs.len();
    if count == 0 {
        return ColumnSummary {
            name: name.to_string(),
            count: 0,
            mean: None,
            std: None,
            min: None,
            q25: None,
            median: None,
            q75: None,
            max: None,
        };
    }

    let mean = xs.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let var = xs.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        Some(var.sqrt())
    } else {
        None
    };

    ColumnSummary {
        name: name.to_string(),
        count,
        mean: Some(mean),
        std,
        min: xs.first().copied(),
        q25: quantile(&xs, 0.25),
        median: quantile(&xs, 0.5),
        q75: quantile(&xs, 0.75),
        max: xs.last().copied(),
    }
}

/// Linear-interpolation quantile of an ascending-sorted slice.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
