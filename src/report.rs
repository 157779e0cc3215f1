//! Human-readable console report.
//!
//! Every function writes to a caller-supplied [`Write`] so the report can go to
//! stdout or be captured in memory.

use std::io::{self, Write};
use std::path::Path;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

use crate::analyzers::describe::ColumnSummary;
use crate::analyzers::grouping::GroupMeans;
use crate::analyzers::regression::{MIN_SAMPLES, Regression};
use crate::table::DistrictTable;

/// Rows shown in the data sample.
pub const HEAD_ROWS: usize = 5;

#[derive(Tabled)]
struct DescribeRow {
    #[tabled(rename = "column")]
    column: &'static str,
    #[tabled(rename = "count")]
    count: usize,
    #[tabled(rename = "mean")]
    mean: String,
    #[tabled(rename = "std")]
    std: String,
    #[tabled(rename = "min")]
    min: String,
    #[tabled(rename = "25%")]
    q25: String,
    #[tabled(rename = "50%")]
    median: String,
    #[tabled(rename = "75%")]
    q75: String,
    #[tabled(rename = "max")]
    max: String,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "group")]
    group: String,
    #[tabled(rename = "rows")]
    rows: usize,
    #[tabled(rename = "mean avg_temp")]
    mean_temp: String,
}

/// Formats `value` with `significant` significant digits, switching to
/// exponent notation for very small or large magnitudes. Trailing zeros are
/// dropped and the exponent has a sign and at least two digits (`1.23e-05`).
pub fn format_general(value: f64, significant: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let significant = significant.max(1);
    let exponent = value.abs().log10().floor() as i32;

    if exponent < -4 || exponent >= significant as i32 {
        let formatted = format!("{:.*e}", significant - 1, value);
        match formatted
            .split_once('e')
            .and_then(|(mantissa, exp)| Some((mantissa, exp.parse::<i32>().ok()?)))
        {
            Some((mantissa, exp)) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
            }
            None => formatted,
        }
    } else {
        let decimals = (significant as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn cell(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

fn fixed(value: f64) -> String {
    format!("{value:.6}")
}

fn heading(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out, "\n=== {title} ===")
}

/// Prints the first [`HEAD_ROWS`] rows with every column.
pub fn write_head(out: &mut impl Write, table: &DistrictTable) -> io::Result<()> {
    heading(out, "Data sample")?;

    let mut builder = Builder::default();
    builder.push_record(table.headers());
    for row in table.rows.iter().take(HEAD_ROWS) {
        let mut record = vec![
            row.district.clone(),
            cell(row.area_m2),
            cell(row.green_area_m2),
            cell(row.avg_temp),
        ];
        record.extend(row.passthrough.iter().cloned());
        record.extend([
            cell(row.area_km2),
            cell(row.green_km2),
            cell(row.green_ratio_pct),
            row.green_group.map(|g| g.to_string()).unwrap_or_default(),
        ]);
        builder.push_record(record);
    }

    writeln!(out, "{}", builder.build())
}

/// Prints count, mean, std, min, quartiles and max per column.
pub fn write_description(out: &mut impl Write, summaries: &[ColumnSummary]) -> io::Result<()> {
    heading(out, "Descriptive statistics")?;

    let rows: Vec<DescribeRow> = summaries
        .iter()
        .map(|s| DescribeRow {
            column: s.column,
            count: s.count,
            mean: fixed(s.mean),
            std: fixed(s.std),
            min: fixed(s.min),
            q25: fixed(s.q25),
            median: fixed(s.median),
            q75: fixed(s.q75),
            max: fixed(s.max),
        })
        .collect();

    writeln!(out, "{}", Table::new(rows))
}

/// Prints the correlation and regression results, or why they were skipped.
pub fn write_regression(out: &mut impl Write, regression: &Regression) -> io::Result<()> {
    heading(out, "Correlation and regression")?;

    match regression {
        Regression::Computed(fit) => {
            writeln!(
                out,
                "Pearson correlation: r = {:.4}, p-value = {}",
                fit.r,
                format_general(fit.r_p_value, 4)
            )?;
            writeln!(
                out,
                "Simple linear regression: slope = {:.4}, intercept = {:.4}, R^2 = {:.4}, p-value = {}, stderr = {:.4}",
                fit.slope,
                fit.intercept,
                fit.r_squared,
                format_general(fit.slope_p_value, 4),
                fit.stderr
            )?;
            writeln!(out, "Complete observations: {}", fit.n)
        }
        Regression::Insufficient { n } => writeln!(
            out,
            "Sample size too small for reliable inference (n = {n} < {MIN_SAMPLES}); correlation and regression skipped"
        ),
    }
}

/// Prints mean temperature per green-ratio group in Low, Medium, High order.
pub fn write_group_means(out: &mut impl Write, means: &GroupMeans) -> io::Result<()> {
    heading(out, "Mean temperature by green ratio group")?;

    let rows: Vec<GroupRow> = means
        .iter()
        .map(|m| GroupRow {
            group: m.group.to_string(),
            rows: m.rows,
            mean_temp: m.mean_temp.map(fixed).unwrap_or_else(|| "NaN".to_string()),
        })
        .collect();

    writeln!(out, "{}", Table::new(rows))
}

/// Prints the generated files, absolute where the path can be resolved.
pub fn write_outputs(out: &mut impl Write, outputs: &[(&str, &Path)]) -> io::Result<()> {
    heading(out, "Generated files")?;

    for (label, path) in outputs {
        let shown = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        writeln!(out, "- {label}: {}", shown.display())?;
    }
    Ok(())
}
