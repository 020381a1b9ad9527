//! Per-team analyses of weekly MLB power rankings against league standings.
//!
//! Every analysis reads one season's immutable tables ([`table::SeasonSnapshot`]),
//! resolves teams through a validated [`team::TeamDirectory`] and returns plain
//! serializable rows. Insufficient data never fails: it yields empty tables or
//! null fields. Only unknown teams, inconsistent identity maps and invalid
//! parameters are errors ([`error::AnalysisError`]).
//!
//! # Analyses
//!
//! - [`series`]: Per-team rank series and the wide plot table
//! - [`distribution`]: KDE and histogram of week-over-week rank changes
//! - [`volatility`]: Expanding standard deviation of rank
//! - [`stability`]: Expanding-window autocorrelation and its Fisher-z difference
//! - [`causality`]: Granger test of power rank leading league rank
//! - [`similarity`]: Correlation and DTW between two teams' trajectories
//! - [`clustering`]: Hierarchical clustering of season stats with outcome summary
//! - [`regime`]: Good / Mediocre / Bad regimes from a Gaussian HMM
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use chrono::NaiveDate;
//! use powerrank_analysis::{
//!     table::{PowerRankRow, SeasonSnapshot},
//!     volatility::{VolatilityParams, build_rank_volatility},
//! };
//!
//! let date = |d| NaiveDate::from_ymd_opt(2025, 4, d).unwrap();
//! let snapshot = SeasonSnapshot {
//!     teams: BTreeMap::from([("119".to_owned(), "Dodgers".to_owned())]),
//!     codes: BTreeMap::from([("119".to_owned(), "LAD".to_owned())]),
//!     power: [(1, 4), (8, 2), (15, 6)]
//!         .into_iter()
//!         .map(|(d, rank)| PowerRankRow {
//!             date: date(d),
//!             team: "Dodgers".to_owned(),
//!             rank,
//!         })
//!         .collect(),
//!     ..SeasonSnapshot::default()
//! };
//!
//! let directory = snapshot.directory().unwrap();
//! let rows = build_rank_volatility(
//!     snapshot.rank_tables(),
//!     &directory,
//!     &["LAD"],
//!     &VolatilityParams::default(),
//! )
//! .unwrap();
//! assert_eq!(rows.len(), 3);
//! assert_eq!(rows[0].sigma, 0.0);
//! ```

pub mod causality;
pub mod clustering;
pub mod distribution;
pub mod error;
pub mod regime;
pub mod series;
pub mod similarity;
pub mod stability;
pub mod table;
pub mod team;
pub mod volatility;

#[cfg(test)]
mod test_util;
