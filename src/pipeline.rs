//! End-to-end analysis run: load, derive, analyze, report, plot, persist.

use anyhow::{Context, Result};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzers::describe::describe;
use crate::analyzers::grouping::{group_means, tercile_groups};
use crate::analyzers::regression::{Regression, complete_pairs, linregress};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::{area_violations, derive_features};
use crate::loader::load_table;
use crate::output::{
    OutputFiles, RunSummary, SUMMARY_SCHEMA_VERSION, write_processed_csv, write_summary,
};
use crate::plot::{group_bar_chart, scatter_with_fit};
use crate::report;

pub const PROCESSED_CSV_FILE: &str = "processed.csv";
pub const SCATTER_FILE: &str = "scatter_regression.png";
pub const BAR_FILE: &str = "group_bar.png";
pub const SUMMARY_FILE: &str = "summary.json";

/// Everything a run needs; nothing is read from fixed locations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    /// Defaults to `<out_dir>/processed.csv`.
    pub output_csv: Option<PathBuf>,
    pub config: AnalysisConfig,
    /// Abort when a district's green area exceeds its total area.
    pub strict: bool,
    pub render_plots: bool,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            out_dir: out_dir.into(),
            output_csv: None,
            config: AnalysisConfig::default(),
            strict: false,
            render_plots: true,
        }
    }

    fn processed_csv_path(&self) -> PathBuf {
        self.output_csv
            .clone()
            .unwrap_or_else(|| self.out_dir.join(PROCESSED_CSV_FILE))
    }
}

/// Runs the full analysis, writing the human-readable report to `out`.
///
/// Any failure aborts the run before the steps that depend on it; a sample
/// too small for regression is reported and the scatter is drawn without a
/// fitted line. With no complete rows at all the scatter is skipped and the
/// grouping step reports the shortage.
#[tracing::instrument(skip_all, fields(input = %options.input.display(), out_dir = %options.out_dir.display()))]
pub fn run(options: &RunOptions, out: &mut impl Write) -> Result<RunSummary> {
    debug!(cwd = ?std::env::current_dir().ok(), "Starting analysis run");

    std::fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("creating output directory {}", options.out_dir.display()))?;

    let table = load_table(
        &options.input,
        &options.config.sheet,
        &options.config.columns,
    )
    .map_err(AnalysisError::from)?;
    let mut table = derive_features(table);

    let violations = area_violations(&table);
    for district in &violations {
        warn!(district, "Green area exceeds total area");
    }
    if options.strict && !violations.is_empty() {
        return Err(AnalysisError::InconsistentArea {
            districts: violations.iter().map(|d| d.to_string()).collect(),
        }
        .into());
    }

    report::write_head(out, &table)?;
    report::write_description(out, &describe(&table))?;

    let ratios = table.green_ratios();
    let temps = table.avg_temps();

    let (x, y, dropped) = complete_pairs(&ratios, &temps);
    if dropped > 0 {
        warn!(
            dropped,
            "Rows with a missing green ratio or temperature excluded from regression"
        );
    }
    let regression = linregress(&x, &y)?;
    log_regression(&regression);
    report::write_regression(out, &regression)?;

    let scatter_png = if options.render_plots && x.is_empty() {
        warn!("No complete rows to plot; scatter plot skipped");
        None
    } else if options.render_plots {
        let path = options.out_dir.join(SCATTER_FILE);
        let points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        scatter_with_fit(&points, &regression, &options.config.plot, &path)
            .with_context(|| format!("rendering {}", path.display()))?;
        info!(path = %path.display(), "Scatter plot written");
        Some(path)
    } else {
        None
    };

    let groups = tercile_groups(&ratios)?;
    for (row, group) in table.rows.iter_mut().zip(&groups) {
        row.green_group = *group;
    }
    let means = group_means(&groups, &temps);
    report::write_group_means(out, &means)?;

    let bar_png = if options.render_plots {
        let path = options.out_dir.join(BAR_FILE);
        group_bar_chart(&means, &options.config.plot, &path)
            .with_context(|| format!("rendering {}", path.display()))?;
        info!(path = %path.display(), "Group bar chart written");
        Some(path)
    } else {
        None
    };

    let processed_csv = options.processed_csv_path();
    if let Some(parent) = processed_csv.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_processed_csv(&processed_csv, &table)?;

    let summary = RunSummary {
        schema_version: SUMMARY_SCHEMA_VERSION,
        generated_at: Utc::now(),
        input: options.input.clone(),
        rows: table.len(),
        complete_rows: x.len(),
        regression,
        group_means: means,
        outputs: OutputFiles {
            processed_csv,
            scatter_png,
            bar_png,
            summary_json: options.out_dir.join(SUMMARY_FILE),
        },
    };
    write_summary(&summary.outputs.summary_json, &summary)?;

    let mut generated: Vec<(&str, &Path)> =
        vec![("Processed CSV", summary.outputs.processed_csv.as_path())];
    if let Some(path) = &summary.outputs.scatter_png {
        generated.push(("Scatter with regression line", path.as_path()));
    }
    if let Some(path) = &summary.outputs.bar_png {
        generated.push(("Group bar chart", path.as_path()));
    }
    generated.push(("Run summary", summary.outputs.summary_json.as_path()));
    report::write_outputs(out, &generated)?;

    info!(rows = summary.rows, "Analysis complete");
    Ok(summary)
}

fn log_regression(regression: &Regression) {
    match regression {
        Regression::Computed(fit) => info!(
            n = fit.n,
            r = fit.r,
            p_value = fit.r_p_value,
            slope = fit.slope,
            intercept = fit.intercept,
            r_squared = fit.r_squared,
            "Regression computed"
        ),
        Regression::Insufficient { n } => {
            warn!(n, "Sample too small for correlation and regression")
        }
    }
}
