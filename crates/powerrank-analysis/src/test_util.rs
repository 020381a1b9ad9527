//! Shared fixtures for unit tests.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::{
    table::{PowerRankRow, StandingsRow},
    team::TeamDirectory,
};

/// Three teams: id "1" = "Alphas" (AAA), "2" = "Betas" (BBB), "3" = "Gammas" (CCC).
pub fn directory() -> TeamDirectory {
    let names = BTreeMap::from([
        ("1".to_owned(), "Alphas".to_owned()),
        ("2".to_owned(), "Betas".to_owned()),
        ("3".to_owned(), "Gammas".to_owned()),
    ]);
    let codes = BTreeMap::from([
        ("1".to_owned(), "AAA".to_owned()),
        ("2".to_owned(), "BBB".to_owned()),
        ("3".to_owned(), "CCC".to_owned()),
    ]);
    TeamDirectory::new(names, codes).unwrap()
}

/// The `i`-th weekly date of the test season.
pub fn week(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1)
        .unwrap()
        .checked_add_days(Days::new(7 * i as u64))
        .unwrap()
}

/// Power rows for one team, one per week in order.
pub fn power_rows(name: &str, ranks: &[u32]) -> Vec<PowerRankRow> {
    ranks
        .iter()
        .enumerate()
        .map(|(i, &rank)| PowerRankRow {
            date: week(i),
            team: name.to_owned(),
            rank,
        })
        .collect()
}

/// Standings rows for one team id, one per week in order.
pub fn standings_rows(team_id: &str, ranks: &[u32]) -> Vec<StandingsRow> {
    ranks
        .iter()
        .enumerate()
        .map(|(i, &mlb_rank)| StandingsRow {
            date: week(i),
            team_name: team_id.to_owned(),
            mlb_rank,
        })
        .collect()
}
