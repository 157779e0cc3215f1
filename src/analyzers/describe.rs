//! Descriptive statistics for the numeric columns of the report.

use serde::Serialize;

use crate::analyzers::utility::{mean, present, quantile_sorted, sample_stddev, sorted};
use crate::table::{DistrictRecord, DistrictTable};

/// Summary of one numeric column. Missing values are excluded from every field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

pub fn summarize(column: &'static str, values: &[f64]) -> ColumnSummary {
    let values = present(values);
    let ordered = sorted(&values);
    let avg = mean(&values);

    ColumnSummary {
        column,
        count: values.len(),
        mean: avg,
        std: sample_stddev(&values, avg),
        min: ordered.first().copied().unwrap_or(f64::NAN),
        q25: quantile_sorted(&ordered, 0.25),
        median: quantile_sorted(&ordered, 0.5),
        q75: quantile_sorted(&ordered, 0.75),
        max: ordered.last().copied().unwrap_or(f64::NAN),
    }
}

/// Summaries of the derived size columns, the ratio and the temperature.
pub fn describe(table: &DistrictTable) -> Vec<ColumnSummary> {
    let column = |f: fn(&DistrictRecord) -> f64| -> Vec<f64> {
        table.rows.iter().map(f).collect()
    };

    vec![
        summarize("area_km2", &column(|r| r.area_km2)),
        summarize("green_km2", &column(|r| r.green_km2)),
        summarize("green_ratio_pct", &column(|r| r.green_ratio_pct)),
        summarize("avg_temp", &column(|r| r.avg_temp)),
    ]
}
