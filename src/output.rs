//! Persistence of the processed table and the run summary.
//!
//! The table goes to CSV (UTF-8 with a byte-order mark so spreadsheet
//! applications detect the encoding), the summary to pretty-printed JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::grouping::GroupMeans;
use crate::analyzers::regression::Regression;
use crate::table::DistrictTable;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Bumped whenever a field of [`RunSummary`] changes meaning.
pub const SUMMARY_SCHEMA_VERSION: u8 = 1;

/// Files written by a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputFiles {
    pub processed_csv: PathBuf,
    pub scatter_png: Option<PathBuf>,
    pub bar_png: Option<PathBuf>,
    pub summary_json: PathBuf,
}

/// Everything a run computed, written as `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub input: PathBuf,
    pub rows: usize,
    /// Rows with both a finite green ratio and a finite temperature.
    pub complete_rows: usize,
    pub regression: Regression,
    pub group_means: GroupMeans,
    pub outputs: OutputFiles,
}

fn number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Writes `table` as CSV to `writer`, prefixed with a UTF-8 byte-order mark.
///
/// Missing values are written as empty fields.
pub fn write_records<W: Write>(mut writer: W, table: &DistrictTable) -> Result<()> {
    writer.write_all(UTF8_BOM)?;

    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(table.headers())?;

    for row in &table.rows {
        let mut record = vec![
            row.district.clone(),
            number(row.area_m2),
            number(row.green_area_m2),
            number(row.avg_temp),
        ];
        record.extend(row.passthrough.iter().cloned());
        record.extend([
            number(row.area_km2),
            number(row.green_km2),
            number(row.green_ratio_pct),
            row.green_group
                .map(|g| g.as_str().to_string())
                .unwrap_or_default(),
        ]);
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the processed table to `path`, replacing any existing file.
pub fn write_processed_csv(path: &Path, table: &DistrictTable) -> Result<()> {
    debug!(path = %path.display(), rows = table.len(), "Writing processed CSV");

    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_records(BufWriter::new(file), table)?;

    info!(path = %path.display(), "Processed CSV written");
    Ok(())
}

/// Writes the run summary as pretty-printed JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush()?;

    info!(path = %path.display(), "Run summary written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::grouping::{group_means, tercile_groups};
    use crate::analyzers::regression::linregress;
    use crate::features::derive_features;
    use crate::table::{DistrictRecord, GreenGroup};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn table() -> DistrictTable {
        let mut table = derive_features(DistrictTable::new(vec![
            DistrictRecord::new("A", 1e6, 1e5, 15.0),
            DistrictRecord::new("B, north", 2e6, 4e5, f64::NAN),
        ]));
        table.rows[0].green_group = Some(GreenGroup::Low);
        table
    }

    #[test]
    fn test_write_records_starts_with_bom() {
        let mut buf = Vec::new();
        write_records(&mut buf, &table()).unwrap();

        assert!(buf.starts_with(UTF8_BOM));
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "district,area_m2,green_area_m2,avg_temp,area_km2,green_km2,green_ratio_pct,green_group"
        );
        assert_eq!(lines[1], "A,1000000,100000,15,1,0.1,10,Low");
        assert_eq!(lines[2], "\"B, north\",2000000,400000,,2,0.4,20,");
    }

    #[test]
    fn test_write_processed_csv_replaces_file() {
        let path = temp_path("green_temp_test_processed.csv");
        fs::write(&path, "stale").unwrap();

        write_processed_csv(&path, &table()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        // header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_summary() {
        let path = temp_path("green_temp_test_summary.json");
        let x = [10.0, 20.0, 30.0];
        let y = [15.0, 14.0, 12.0];
        let groups = tercile_groups(&x).unwrap();

        let summary = RunSummary {
            schema_version: SUMMARY_SCHEMA_VERSION,
            generated_at: Utc::now(),
            input: PathBuf::from("data.xlsx"),
            rows: 3,
            complete_rows: 3,
            regression: linregress(&x, &y).unwrap(),
            group_means: group_means(&groups, &y),
            outputs: OutputFiles {
                processed_csv: PathBuf::from("processed.csv"),
                scatter_png: None,
                bar_png: None,
                summary_json: path.clone(),
            },
        };
        write_summary(&path, &summary).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["regression"]["status"], "computed");
        assert_eq!(json["group_means"][0]["group"], "Low");
        assert!(json["outputs"]["scatter_png"].is_null());

        fs::remove_file(&path).unwrap();
    }
}
