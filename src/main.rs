//! CLI entry point for the green-space / temperature analysis.
//!
//! `analyze` runs the full pipeline on one spreadsheet; `inspect` lists the
//! sheets and headers of a file so a column mapping can be written for it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use green_temp::config::AnalysisConfig;
use green_temp::loader::list_sheets;
use green_temp::pipeline::{RunOptions, run};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "green_temp")]
#[command(about = "Correlate district green-space ratio with average temperature", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis on a spreadsheet or CSV file
    Analyze {
        /// Input file (xlsx, xlsm, xlsb, xls, ods or csv)
        #[arg(value_name = "FILE", env = "GREEN_TEMP_INPUT")]
        input: PathBuf,

        /// Directory for the plots and the run summary
        #[arg(short = 'd', long, env = "GREEN_TEMP_OUT_DIR", default_value = "output_images")]
        out_dir: PathBuf,

        /// Processed CSV path (defaults to <OUT_DIR>/processed.csv)
        #[arg(short, long, env = "GREEN_TEMP_OUTPUT_CSV")]
        output_csv: Option<PathBuf>,

        /// Sheet to read; overrides the config file
        #[arg(short, long)]
        sheet: Option<String>,

        /// JSON file with the sheet name, column mapping and plot style
        #[arg(short, long, env = "GREEN_TEMP_CONFIG")]
        config: Option<PathBuf>,

        /// Fail when a district's green area exceeds its total area
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Skip rendering the PNG charts
        #[arg(long, default_value_t = false)]
        no_plots: bool,
    },
    /// List the sheets and header rows of an input file
    Inspect {
        /// Input file (xlsx, xlsm, xlsb, xls, ods or csv)
        #[arg(value_name = "FILE", env = "GREEN_TEMP_INPUT")]
        input: PathBuf,

        /// JSON config whose column mapping is checked against the headers
        #[arg(short, long, env = "GREEN_TEMP_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/green_temp.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("green_temp.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            out_dir,
            output_csv,
            sheet,
            config,
            strict,
            no_plots,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(sheet) = sheet {
                config.sheet = sheet;
            }

            let options = RunOptions {
                input,
                out_dir,
                output_csv,
                config,
                strict,
                render_plots: !no_plots,
            };

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            run(&options, &mut out)?;
        }
        Commands::Inspect { input, config } => {
            let config = load_config(config.as_deref())?;
            let sheets = list_sheets(&input)
                .with_context(|| format!("inspecting {}", input.display()))?;

            info!(total = sheets.len(), "Sheets found");

            for sheet in &sheets {
                info!(
                    sheet = %sheet.name,
                    rows = sheet.rows,
                    headers = ?sheet.headers,
                    "Sheet"
                );

                let mapped: Vec<_> = sheet
                    .headers
                    .iter()
                    .filter_map(|h| config.columns.resolve(h).map(|c| (h.as_str(), c.name())))
                    .collect();
                let missing: Vec<_> = green_temp::table::Column::ALL
                    .iter()
                    .filter(|c| !mapped.iter().any(|(_, name)| name == &c.name()))
                    .map(|c| c.name())
                    .collect();

                if missing.is_empty() {
                    info!(sheet = %sheet.name, mapped = ?mapped, "All required columns mapped");
                } else {
                    warn!(sheet = %sheet.name, mapped = ?mapped, missing = ?missing, "Sheet is missing required columns");
                }
            }
        }
    }

    Ok(())
}

/// Reads the JSON config if one was given, otherwise uses the defaults.
fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            let config = AnalysisConfig::load(path)?;
            info!(path = %path.display(), sheet = %config.sheet, "Config loaded");
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}
