//! In-memory district table shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical input columns the analysis needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    District,
    AreaM2,
    GreenAreaM2,
    AvgTemp,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::District,
        Column::AreaM2,
        Column::GreenAreaM2,
        Column::AvgTemp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::District => "district",
            Column::AreaM2 => "area_m2",
            Column::GreenAreaM2 => "green_area_m2",
            Column::AvgTemp => "avg_temp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Tercile label for a district's green ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GreenGroup {
    Low,
    Medium,
    High,
}

impl GreenGroup {
    /// Labels in reporting order.
    pub const ORDER: [GreenGroup; 3] = [GreenGroup::Low, GreenGroup::Medium, GreenGroup::High];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GreenGroup::Low => "Low",
            GreenGroup::Medium => "Medium",
            GreenGroup::High => "High",
        }
    }
}

impl fmt::Display for GreenGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per district. Derived fields are `NaN` until
/// [`crate::features::derive_features`] runs; `green_group` is `None` until
/// the grouper assigns it.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictRecord {
    pub district: String,
    pub area_m2: f64,
    pub green_area_m2: f64,
    pub avg_temp: f64,

    // source columns outside the mapping, in header order
    pub passthrough: Vec<String>,

    pub area_km2: f64,
    pub green_km2: f64,
    pub green_ratio_pct: f64,
    pub green_group: Option<GreenGroup>,
}

impl DistrictRecord {
    pub fn new(district: &str, area_m2: f64, green_area_m2: f64, avg_temp: f64) -> Self {
        Self {
            district: district.to_string(),
            area_m2,
            green_area_m2,
            avg_temp,
            passthrough: Vec::new(),
            area_km2: f64::NAN,
            green_km2: f64::NAN,
            green_ratio_pct: f64::NAN,
            green_group: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictTable {
    /// Header names of the passthrough columns.
    pub passthrough_headers: Vec<String>,
    pub rows: Vec<DistrictRecord>,
}

impl DistrictTable {
    pub fn new(rows: Vec<DistrictRecord>) -> Self {
        Self {
            passthrough_headers: Vec::new(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn green_ratios(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.green_ratio_pct).collect()
    }

    pub fn avg_temps(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.avg_temp).collect()
    }

    /// Full header row in output order.
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = Column::ALL.iter().map(|c| c.name().to_string()).collect();
        headers.extend(self.passthrough_headers.iter().cloned());
        headers.extend(
            ["area_km2", "green_km2", "green_ratio_pct", "green_group"]
                .iter()
                .map(|h| h.to_string()),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
        assert_eq!(Column::from_name("평균기온"), None);
    }

    #[test]
    fn test_group_order_matches_index() {
        for (i, group) in GreenGroup::ORDER.iter().enumerate() {
            assert_eq!(group.index(), i);
        }
        assert!(GreenGroup::Low < GreenGroup::High);
    }

    #[test]
    fn test_headers_include_passthrough_before_derived() {
        let mut table = DistrictTable::new(vec![]);
        table.passthrough_headers.push("note".to_string());

        let headers = table.headers();
        assert_eq!(headers.len(), 9);
        assert_eq!(headers[4], "note");
        assert_eq!(headers.last().map(String::as_str), Some("green_group"));
    }
}
