use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::plot::PlotStyle;
use crate::table::Column;

/// Run configuration read from an optional JSON file.
///
/// Every field has a default, so a partial file is fine:
/// ```json
/// {
///   "sheet": "Sheet1",
///   "columns": {
///     "Unnamed: 0": "district",
///     "면적(제곱미터)": "area_m2",
///     "녹지면적": "green_area_m2",
///     "평균기온": "avg_temp"
///   },
///   "plot": { "font_family": "NanumGothic", "dpi": 150 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sheet: String,
    pub columns: ColumnMapping,
    pub plot: PlotStyle,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sheet: "Sheet1".to_string(),
            columns: ColumnMapping::default(),
            plot: PlotStyle::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

/// Maps source sheet headers to canonical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    entries: HashMap<String, Column>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::from_pairs([
            ("Unnamed: 0", Column::District),
            ("면적(제곱미터)", Column::AreaM2),
            ("녹지면적", Column::GreenAreaM2),
            ("평균기온", Column::AvgTemp),
        ])
    }
}

impl ColumnMapping {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Column)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(header, column)| (header.to_string(), column))
                .collect(),
        }
    }

    /// Resolves a source header. Canonical names always map to themselves.
    pub fn resolve(&self, header: &str) -> Option<Column> {
        let header = header.trim();
        self.entries
            .get(header)
            .copied()
            .or_else(|| Column::from_name(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_default_mapping_resolves_korean_headers() {
        let mapping = ColumnMapping::default();
        assert_eq!(mapping.resolve("Unnamed: 0"), Some(Column::District));
        assert_eq!(mapping.resolve(" 녹지면적 "), Some(Column::GreenAreaM2));
        assert_eq!(mapping.resolve("avg_temp"), Some(Column::AvgTemp));
        assert_eq!(mapping.resolve("population"), None);
    }

    #[test]
    fn test_load_partial_config() {
        let path = env::temp_dir().join("green_temp_test_config.json");
        fs::write(
            &path,
            r#"{ "sheet": "Data", "columns": { "Gu": "district", "Temp": "avg_temp" } }"#,
        )
        .unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.sheet, "Data");
        assert_eq!(config.columns.resolve("Gu"), Some(Column::District));
        assert_eq!(config.columns.resolve("면적(제곱미터)"), None);
        assert_eq!(config.plot, PlotStyle::default());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_unknown_column() {
        let path = env::temp_dir().join("green_temp_test_bad_config.json");
        fs::write(&path, r#"{ "columns": { "Gu": "ward" } }"#).unwrap();

        assert!(AnalysisConfig::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
