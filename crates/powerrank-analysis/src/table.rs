//! Raw input tables as produced by the data collectors.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::AnalysisError, team::TeamDirectory};

/// One row of the editorial power-rank table, keyed by display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerRankRow {
    pub date: NaiveDate,
    /// Team display name.
    pub team: String,
    pub rank: u32,
}

/// One row of the league standings table, keyed by team id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub date: NaiveDate,
    /// Team id.
    pub team_name: String,
    pub mlb_rank: u32,
}

/// One row of the playoff odds table, keyed by team id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRow {
    pub date: NaiveDate,
    /// Team id.
    pub team_name: String,
    /// Probability of reaching the playoffs, in `[0, 1]`.
    #[serde(alias = "make_playoff_odds")]
    pub make_playoffs_odds: f64,
}

/// The two rank tables a per-team series can be drawn from.
#[derive(Debug, Clone, Copy)]
pub struct RankTables<'a> {
    pub power: &'a [PowerRankRow],
    pub standings: &'a [StandingsRow],
}

/// The season stat tables available for clustering.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatTables<'a> {
    pub batting: Option<&'a StatTable>,
    pub pitching: Option<&'a StatTable>,
    pub fielding: Option<&'a StatTable>,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StatTableError {
    #[display("row {row} has no `team_name`")]
    MissingTeamName { row: usize },
}

/// A season stat table (batting, pitching or fielding) keyed by team id.
///
/// Deserializes from an array of JSON objects. A column is kept when it holds
/// at least one number and every non-null value in it is a number; all other
/// columns are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Map<String, Value>>", into = "Vec<Map<String, Value>>")]
pub struct StatTable {
    columns: Vec<String>,
    rows: Vec<StatRow>,
}

/// Numeric values of one team; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub team_name: String,
    pub values: Vec<Option<f64>>,
}

impl StatTable {
    /// Builds a table from column names and rows aligned with them.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<StatRow>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[StatRow] {
        &self.rows
    }
}

impl TryFrom<Vec<Map<String, Value>>> for StatTable {
    type Error = StatTableError;

    fn try_from(records: Vec<Map<String, Value>>) -> Result<Self, Self::Error> {
        // candidate columns in first-seen key order
        let mut columns: Vec<String> = vec![];
        for record in &records {
            for key in record.keys() {
                if key != "team_name" && !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        columns.retain(|column| {
            let mut has_number = false;
            for record in &records {
                match record.get(column) {
                    None | Some(Value::Null) => {}
                    Some(Value::Number(_)) => has_number = true,
                    Some(_) => return false,
                }
            }
            has_number
        });

        let rows = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let team_name = match record.get("team_name") {
                    Some(Value::String(name)) => name.clone(),
                    Some(Value::Number(id)) => id.to_string(),
                    _ => return Err(StatTableError::MissingTeamName { row }),
                };
                let values = columns
                    .iter()
                    .map(|column| record.get(column).and_then(Value::as_f64))
                    .collect();
                Ok(StatRow { team_name, values })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { columns, rows })
    }
}

impl From<StatTable> for Vec<Map<String, Value>> {
    fn from(table: StatTable) -> Self {
        table
            .rows
            .into_iter()
            .map(|row| {
                let mut record = Map::new();
                record.insert("team_name".to_owned(), Value::String(row.team_name));
                for (column, value) in table.columns.iter().zip(row.values) {
                    record.insert(column.clone(), value.map_or(Value::Null, Value::from));
                }
                record
            })
            .collect()
    }
}

/// Everything one season's analyses read, as loaded from a snapshot file.
///
/// Snapshots are immutable inputs; caching them is up to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonSnapshot {
    /// Team id to display name.
    pub teams: BTreeMap<String, String>,
    /// Team id to short code.
    pub codes: BTreeMap<String, String>,
    pub power: Vec<PowerRankRow>,
    pub standings: Vec<StandingsRow>,
    pub odds: Vec<OddsRow>,
    pub batting: Option<StatTable>,
    pub pitching: Option<StatTable>,
    pub fielding: Option<StatTable>,
}

impl SeasonSnapshot {
    /// Validates the identity maps and builds the team directory.
    pub fn directory(&self) -> Result<TeamDirectory, AnalysisError> {
        TeamDirectory::new(self.teams.clone(), self.codes.clone())
    }

    #[must_use]
    pub fn rank_tables(&self) -> RankTables<'_> {
        RankTables {
            power: &self.power,
            standings: &self.standings,
        }
    }

    #[must_use]
    pub fn stat_tables(&self) -> StatTables<'_> {
        StatTables {
            batting: self.batting.as_ref(),
            pitching: self.pitching.as_ref(),
            fielding: self.fielding.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_stat_table_keeps_numeric_columns() {
        let table: StatTable = serde_json::from_value(json!([
            {"team_name": "147", "hr": 200, "avg": 0.251, "note": "x", "era": null},
            {"team_name": "141", "hr": 180, "avg": null, "note": "y", "era": null},
        ]))
        .unwrap();
        assert_eq!(table.columns(), &["avg".to_owned(), "hr".to_owned()]);
        assert_eq!(table.rows()[0].values, vec![Some(0.251), Some(200.0)]);
        assert_eq!(table.rows()[1].values, vec![None, Some(180.0)]);
    }

    #[test]
    fn test_stat_table_requires_team_name() {
        let result: Result<StatTable, _> = serde_json::from_value(json!([{"hr": 1}]));
        assert!(result.is_err());
    }

    #[test]
    fn test_odds_alias() {
        let row: OddsRow = serde_json::from_value(json!({
            "date": "2025-09-28", "team_name": "147", "make_playoff_odds": 1.0
        }))
        .unwrap();
        assert_eq!(row.make_playoffs_odds, 1.0);
    }

    #[test]
    fn test_snapshot_defaults_to_empty() {
        let snapshot: SeasonSnapshot = serde_json::from_value(json!({})).unwrap();
        assert!(snapshot.power.is_empty());
        assert!(snapshot.batting.is_none());
        assert!(snapshot.directory().unwrap().is_empty());
    }

    #[test]
    fn test_stat_table_serializes_back_to_records() {
        let table = StatTable::new(
            vec!["hr".to_owned()],
            vec![StatRow {
                team_name: "1".to_owned(),
                values: vec![None],
            }],
        );
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value, json!([{"team_name": "1", "hr": null}]));
    }
}
