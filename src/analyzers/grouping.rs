//! Tercile binning of the green ratio and per-bin temperature means.

use serde::Serialize;

use crate::analyzers::utility::{mean, quantile_sorted, sorted};
use crate::error::AnalysisError;
use crate::table::GreenGroup;

/// Mean temperature for one bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: GreenGroup,
    pub rows: usize,
    /// `None` when the bin is empty or holds no temperatures.
    pub mean_temp: Option<f64>,
}

/// Per-bin means, always in the order Low, Medium, High.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMeans(pub [GroupMean; 3]);

impl GroupMeans {
    pub fn iter(&self) -> impl Iterator<Item = &GroupMean> {
        self.0.iter()
    }

    pub fn get(&self, group: GreenGroup) -> &GroupMean {
        &self.0[group.index()]
    }
}

/// Assigns each value to an equal-frequency tercile.
///
/// Bin edges are the 0, 1/3, 2/3 and 1 quantiles; the lowest edge is inclusive
/// and every bin is closed on the right. When two edges coincide the bins are
/// instead assigned by stable rank, so ties keep their row order. Values that
/// are not finite get `None`.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] if fewer than three distinct
/// finite values exist.
pub fn tercile_groups(values: &[f64]) -> Result<Vec<Option<GreenGroup>>, AnalysisError> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let ordered = sorted(&finite);

    let mut distinct = ordered.clone();
    distinct.dedup();
    if distinct.len() < 3 {
        return Err(AnalysisError::InsufficientData(format!(
            "{} distinct green ratio value(s); at least 3 are needed to form terciles",
            distinct.len()
        )));
    }

    let e1 = quantile_sorted(&ordered, 1.0 / 3.0);
    let e2 = quantile_sorted(&ordered, 2.0 / 3.0);
    let (e0, e3) = (ordered[0], ordered[ordered.len() - 1]);

    if e0 < e1 && e1 < e2 && e2 < e3 {
        Ok(values
            .iter()
            .map(|&v| {
                if !v.is_finite() {
                    None
                } else if v <= e1 {
                    Some(GreenGroup::Low)
                } else if v <= e2 {
                    Some(GreenGroup::Medium)
                } else {
                    Some(GreenGroup::High)
                }
            })
            .collect())
    } else {
        Ok(rank_groups(values, finite.len()))
    }
}

fn rank_groups(values: &[f64], count: usize) -> Vec<Option<GreenGroup>> {
    let mut order: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].is_finite())
        .collect();
    // stable, so equal values keep row order
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut groups = vec![None; values.len()];
    for (rank, &row) in order.iter().enumerate() {
        groups[row] = Some(GreenGroup::ORDER[rank * 3 / count]);
    }
    groups
}

/// Means of `temps` per group, skipping missing temperatures.
pub fn group_means(groups: &[Option<GreenGroup>], temps: &[f64]) -> GroupMeans {
    GroupMeans(GreenGroup::ORDER.map(|group| {
        let members: Vec<f64> = groups
            .iter()
            .zip(temps)
            .filter(|(g, _)| **g == Some(group))
            .map(|(_, t)| *t)
            .collect();
        let present: Vec<f64> = members.iter().copied().filter(|t| !t.is_nan()).collect();

        GroupMean {
            group,
            rows: members.len(),
            mean_temp: if present.is_empty() {
                None
            } else {
                Some(mean(&present))
            },
        }
    }))
}
