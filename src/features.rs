//! Unit conversions and the green-space ratio.

use crate::table::DistrictTable;

const M2_PER_KM2: f64 = 1e6;

/// Adds `area_km2`, `green_km2` and `green_ratio_pct` to every row.
///
/// A zero `area_m2` yields `NaN`/`inf` for the ratio rather than an error.
pub fn derive_features(mut table: DistrictTable) -> DistrictTable {
    for row in &mut table.rows {
        row.area_km2 = row.area_m2 / M2_PER_KM2;
        row.green_km2 = row.green_area_m2 / M2_PER_KM2;
        row.green_ratio_pct = green_ratio_pct(row.green_area_m2, row.area_m2);
    }
    table
}

pub fn green_ratio_pct(green_area_m2: f64, area_m2: f64) -> f64 {
    green_area_m2 / area_m2 * 100.0
}

/// Districts whose green area is larger than their total area.
pub fn area_violations(table: &DistrictTable) -> Vec<&str> {
    table
        .rows
        .iter()
        .filter(|r| r.green_area_m2 > r.area_m2)
        .map(|r| r.district.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DistrictRecord;

    fn sample_table() -> DistrictTable {
        DistrictTable::new(vec![
            DistrictRecord::new("A", 1e6, 1e5, 15.0),
            DistrictRecord::new("B", 2.5e6, 4e5, 14.0),
            DistrictRecord::new("C", 7.3e6, 3.1e6, 13.0),
        ])
    }

    #[test]
    fn test_derive_features_units() {
        let table = derive_features(sample_table());

        assert_eq!(table.rows[0].area_km2, 1.0);
        assert_eq!(table.rows[1].green_km2, 0.4);
        assert_eq!(table.rows[0].green_ratio_pct, 10.0);
    }

    #[test]
    fn test_ratio_reproduces_from_stored_columns() {
        let table = derive_features(sample_table());

        for row in &table.rows {
            assert_eq!(
                row.green_ratio_pct,
                row.green_area_m2 / row.area_m2 * 100.0
            );
            assert!((0.0..=100.0).contains(&row.green_ratio_pct));
        }
    }

    #[test]
    fn test_zero_area_passes_through() {
        let table = derive_features(DistrictTable::new(vec![
            DistrictRecord::new("empty", 0.0, 0.0, 12.0),
            DistrictRecord::new("odd", 0.0, 5.0, 12.0),
        ]));

        assert!(table.rows[0].green_ratio_pct.is_nan());
        assert!(table.rows[1].green_ratio_pct.is_infinite());
    }

    #[test]
    fn test_area_violations() {
        let mut table = sample_table();
        table.rows[1].green_area_m2 = 3e6;

        assert_eq!(area_violations(&table), vec!["B"]);
        assert!(area_violations(&sample_table()).is_empty());
    }
}
