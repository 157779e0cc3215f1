//! Statistical analysis of the district table.
//!
//! [`regression`] correlates green ratio with temperature and fits a line,
//! [`grouping`] splits districts into green-ratio terciles, and [`describe`]
//! produces the per-column summaries printed by the report.

pub mod describe;
pub mod grouping;
pub mod regression;
pub mod utility;
