use chrono::{Days, NaiveDate};
use powerrank_analysis::{
    causality::{CausalityParams, granger_power_to_mlb},
    clustering::{ClusterParams, FeatureSelection, cluster_and_summarize_season_stats},
    distribution::{KdeParams, build_delta_kde_and_hist},
    regime::{FallbackReason, InitKind, RegimeFit, RegimeParams, fit_team_hmm},
    similarity::{SimilarityParams, compute_trajectory_similarity},
    stability::{StabilityParams, build_acf_stability},
    table::{OddsRow, PowerRankRow, SeasonSnapshot, StandingsRow},
    volatility::{VolatilityParams, build_rank_volatility},
};
use serde_json::json;

const TEAMS: [(&str, &str, &str); 4] = [
    ("108", "Angels", "LAA"),
    ("111", "Red Sox", "BOS"),
    ("147", "Yankees", "NYY"),
    ("119", "Dodgers", "LAD"),
];

fn week(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 31)
        .unwrap()
        .checked_add_days(Days::new(7 * i as u64))
        .unwrap()
}

fn snapshot() -> SeasonSnapshot {
    SeasonSnapshot {
        teams: TEAMS
            .iter()
            .map(|(id, name, _)| ((*id).to_owned(), (*name).to_owned()))
            .collect(),
        codes: TEAMS
            .iter()
            .map(|(id, _, code)| ((*id).to_owned(), (*code).to_owned()))
            .collect(),
        ..SeasonSnapshot::default()
    }
}

fn power(name: &str, ranks: &[u32]) -> Vec<PowerRankRow> {
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

fn standings(team_id: &str, ranks: &[u32]) -> Vec<StandingsRow> {
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

#[test]
fn test_identical_trajectories_are_fully_similar() {
    let mut season = snapshot();
    season.power = power("Angels", &[1, 2, 3, 4]);
    season.power.extend(power("Red Sox", &[1, 2, 3, 4]));
    let directory = season.directory().unwrap();

    let report = compute_trajectory_similarity(
        season.rank_tables(),
        &directory,
        "LAA",
        "BOS",
        &SimilarityParams::default(),
    )
    .unwrap();
    assert_eq!(report.overlap, 4);
    assert_eq!(report.avg_abs_rank_gap, Some(0.0));
    assert!((report.corr_levels.unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(report.dtw_similarity_raw_0_100, Some(100.0));
    assert_eq!(report.team_a, "Angels");
    assert_eq!(report.team_b, "Red Sox");
}

#[test]
fn test_constant_rank_takes_regime_fallback() {
    let mut season = snapshot();
    season.power = power("Yankees", &[5; 8]);
    let directory = season.directory().unwrap();

    let report = fit_team_hmm(&season.power, &directory, "NYY", &RegimeParams::default()).unwrap();
    let stats = report.model_stats();
    assert_eq!(stats.init, InitKind::Fallback);
    assert!(stats.transition.iter().flatten().all(Option::is_none));
    assert!(stats.stationary.is_none());
    assert!(matches!(report.fit, RegimeFit::Heuristic { .. }));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["init"], "fallback");
    assert!(json["transition"][0][0].is_null());
}

#[test]
fn test_constant_rank_above_threshold_is_variance_degenerate() {
    let mut season = snapshot();
    season.power = power("Yankees", &[5; 20]);
    let directory = season.directory().unwrap();

    let report = fit_team_hmm(&season.power, &directory, "NYY", &RegimeParams::default()).unwrap();
    assert!(matches!(
        report.fit,
        RegimeFit::Heuristic {
            reason: FallbackReason::ConstantFeatures,
            ..
        }
    ));
}

#[test]
fn test_regime_model_path_over_league() {
    let mut season = snapshot();
    let weeks = 26;
    for (t, (_, name, _)) in TEAMS.iter().enumerate() {
        let ranks = (0..weeks)
            .map(|i| {
                let swing = [0, 2, 5, 9, 12, 10, 6, 3, 1][(i + 2 * t) % 9];
                u32::try_from((swing + 7 * t) % 30 + 1).unwrap()
            })
            .collect::<Vec<_>>();
        season.power.extend(power(name, &ranks));
    }
    let directory = season.directory().unwrap();

    let report = fit_team_hmm(&season.power, &directory, "LAD", &RegimeParams::default()).unwrap();
    let stats = report.model_stats();
    assert_eq!(stats.init, InitKind::Quantile, "{:?}", stats.fallback_reason);
    assert_eq!(stats.n_used, weeks - 1);
    for row in stats.transition {
        let sum = row.iter().map(|p| p.unwrap()).sum::<f64>();
        assert!((sum - 1.0).abs() < 1e-6);
    }
    assert_eq!(report.states.len(), weeks - 1);
}

#[test]
fn test_only_certain_playoff_odds_count() {
    let season: SeasonSnapshot = serde_json::from_value(json!({
        "teams": {"108": "Angels", "111": "Red Sox", "147": "Yankees", "119": "Dodgers"},
        "codes": {"108": "LAA", "111": "BOS", "147": "NYY", "119": "LAD"},
        "batting": [
            {"team_name": "108", "hr": 150, "avg": 0.231, "league": "AL"},
            {"team_name": "111", "hr": 190, "avg": 0.262, "league": "AL"},
            {"team_name": 147, "hr": 240, "avg": 0.254, "league": "AL"},
            {"team_name": "119", "hr": 230, "avg": 0.253, "league": "NL"}
        ],
        "standings": [
            {"date": "2025-09-28", "team_name": "108", "mlb_rank": 25},
            {"date": "2025-09-28", "team_name": "111", "mlb_rank": 12},
            {"date": "2025-09-28", "team_name": "147", "mlb_rank": 3},
            {"date": "2025-09-28", "team_name": "119", "mlb_rank": 5}
        ],
        "odds": [
            {"date": "2025-09-20", "team_name": "111", "make_playoffs_odds": 1.0},
            {"date": "2025-09-28", "team_name": "111", "make_playoffs_odds": 0.4},
            {"date": "2025-09-28", "team_name": "147", "make_playoff_odds": 1.0},
            {"date": "2025-09-28", "team_name": "119", "make_playoffs_odds": 1.0},
            {"date": "2025-09-28", "team_name": "108", "make_playoffs_odds": 0.0}
        ]
    }))
    .unwrap();
    let columns = season.batting.as_ref().unwrap().columns();
    assert_eq!(columns.len(), 2);
    assert!(!columns.iter().any(|c| c == "league"));

    let params = ClusterParams {
        selection: FeatureSelection::Batting,
        k: 4,
        ..ClusterParams::default()
    };
    let report = cluster_and_summarize_season_stats(
        season.stat_tables(),
        &season.standings,
        &season.odds,
        &params,
    )
    .unwrap();
    assert_eq!(report.summary.len(), 4);
    let playoff_teams = report
        .summary
        .iter()
        .filter(|row| row.made_playoffs == 1)
        .flat_map(|row| row.teams.iter().map(String::as_str))
        .collect::<Vec<_>>();
    assert!(playoff_teams.contains(&"147"));
    assert!(playoff_teams.contains(&"119"));
    assert!(!playoff_teams.contains(&"111"));
    assert!(
        report
            .summary
            .windows(2)
            .all(|w| w[0].avg_last_mlb_rank <= w[1].avg_last_mlb_rank)
    );
}

#[test]
fn test_cluster_count_matches_k() {
    let mut rows = vec![];
    for (i, (id, _, _)) in TEAMS.iter().enumerate() {
        rows.push(json!({"team_name": id, "era": 3.5 + i as f64 * 0.4, "so": 1200 + 37 * i}));
    }
    let season: SeasonSnapshot = serde_json::from_value(json!({
        "teams": {"108": "Angels", "111": "Red Sox", "147": "Yankees", "119": "Dodgers"},
        "codes": {"108": "LAA", "111": "BOS", "147": "NYY", "119": "LAD"},
        "pitching": rows,
    }))
    .unwrap();
    for k in 1..=4 {
        let params = ClusterParams {
            k,
            ..ClusterParams::default()
        };
        let report =
            cluster_and_summarize_season_stats(season.stat_tables(), &[], &[], &params).unwrap();
        assert_eq!(report.summary.len(), k);
        assert_eq!(report.assignments.len(), 4);
        assert!(report.features.columns.iter().all(|c| c.starts_with("pit_")));
    }
}

#[test]
fn test_first_volatility_point_is_zero() {
    let mut season = snapshot();
    season.power = power("Dodgers", &[3, 1, 8, 2]);
    season.standings = standings("119", &[10, 4, 6]);
    let directory = season.directory().unwrap();

    for params in [
        VolatilityParams::default(),
        VolatilityParams {
            source: "mlb".parse().unwrap(),
            ..VolatilityParams::default()
        },
    ] {
        let rows =
            build_rank_volatility(season.rank_tables(), &directory, &["LAD"], &params).unwrap();
        assert!(!rows.is_empty());
        assert_eq!(rows[0].sigma, 0.0);
    }
}

#[test]
fn test_single_delta_kde_peaks_at_sample() {
    let mut season = snapshot();
    season.power = power("Angels", &[10, 14]);
    let directory = season.directory().unwrap();

    let out = build_delta_kde_and_hist(
        season.rank_tables(),
        &directory,
        &["LAA", "BOS"],
        &KdeParams::default(),
    )
    .unwrap();
    assert!(out.kde.iter().all(|row| row.density >= 0.0));
    let peak = out.peaks["LAA"].unwrap();
    assert!((peak - 4.0).abs() < 0.06);
    assert_eq!(out.peaks["BOS"], None);
    assert!(out.kde.iter().all(|row| row.team_code == "LAA"));
}

#[test]
fn test_granger_caps_lag() {
    let mut season = snapshot();
    let power_ranks = [4, 6, 3, 8, 5, 9, 7, 10, 6, 12];
    let mlb_ranks = [5, 4, 6, 3, 8, 5, 9, 7, 10, 6];
    season.power = power("Red Sox", &power_ranks);
    season.standings = standings("111", &mlb_ranks);
    let directory = season.directory().unwrap();

    let params = CausalityParams {
        max_lag: 12,
        ..CausalityParams::default()
    };
    let report =
        granger_power_to_mlb(season.rank_tables(), &directory, "BOS", &params).unwrap();
    let summary = &report.summary;
    assert_eq!(summary.max_lag_requested, 12);
    assert!(summary.max_lag_effective <= summary.max_lag_requested);
    assert!(summary.max_lag_effective >= 1);
    assert_eq!(report.rows.len(), summary.max_lag_effective);
}

#[test]
fn test_constant_series_stability_does_not_fail() {
    let mut season = snapshot();
    season.power = power("Yankees", &[2; 9]);
    let directory = season.directory().unwrap();

    let report = build_acf_stability(
        season.rank_tables(),
        &directory,
        "NYY",
        &StabilityParams::default(),
    )
    .unwrap();
    assert!(report.acf.iter().all(|row| row.value.is_finite()));
    assert!(report.stability.iter().all(|row| row.value.is_finite()));
}

#[test]
fn test_unknown_code_is_rejected() {
    let season = snapshot();
    let directory = season.directory().unwrap();
    assert!(
        build_rank_volatility(
            season.rank_tables(),
            &directory,
            &["XXX"],
            &VolatilityParams::default()
        )
        .is_err()
    );
}

#[test]
fn test_odds_without_playoff_team_has_zero_share() {
    let odds = [OddsRow {
        date: week(0),
        team_name: "108".to_owned(),
        make_playoffs_odds: 0.99,
    }];
    let season: SeasonSnapshot = serde_json::from_value(json!({
        "teams": {"108": "Angels"},
        "codes": {"108": "LAA"},
        "fielding": [{"team_name": "108", "errors": 80}],
    }))
    .unwrap();
    let params = ClusterParams {
        selection: FeatureSelection::Fielding,
        k: 1,
        ..ClusterParams::default()
    };
    let report =
        cluster_and_summarize_season_stats(season.stat_tables(), &[], &odds, &params).unwrap();
    assert_eq!(report.summary[0].made_playoffs, 0);
    assert_eq!(report.summary[0].pct_playoffs, 0.0);
    assert_eq!(report.summary[0].avg_last_mlb_rank, None);
}
