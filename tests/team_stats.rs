use std::fs;
use std::path::PathBuf;

use panel_pitch::football_data::{MatchRecord, Winner, parse_matches_json, process_matches};
use panel_pitch::goal_stats::{DEFAULT_GOAL_THRESHOLD, goal_histogram, goal_threshold};
use panel_pitch::team_stats::{Outcome, classify, team_goal_histogram, team_outcomes};

const ARSENAL: u64 = 57;
const CHELSEA: u64 = 61;
const MAN_CITY: u64 = 65;

fn fixture_matches() -> Vec<MatchRecord> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("football_data_matches.json");
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    process_matches(&parse_matches_json(&raw).expect("fixture should parse"))
}

fn game(home: u64, away: u64, home_goals: u32, away_goals: u32, winner: Option<Winner>) -> MatchRecord {
    MatchRecord {
        id: 1,
        date: "2024-01-01 12:00".to_string(),
        home_team_id: home,
        home_team: format!("T{home}"),
        away_team_id: away,
        away_team: format!("T{away}"),
        home_goals,
        away_goals,
        total_goals: home_goals + away_goals,
        winner,
    }
}

#[test]
fn outcome_depends_on_role() {
    let home_win = game(1, 2, 2, 0, Some(Winner::HomeTeam));
    assert_eq!(classify(&home_win, 1), Some(Outcome::Win));
    assert_eq!(classify(&home_win, 2), Some(Outcome::Loss));
    assert_eq!(classify(&home_win, 3), None);

    let away_win = game(1, 2, 0, 1, Some(Winner::AwayTeam));
    assert_eq!(classify(&away_win, 1), Some(Outcome::Loss));
    assert_eq!(classify(&away_win, 2), Some(Outcome::Win));
}

#[test]
fn draw_or_missing_winner_is_a_draw_for_both_sides() {
    for winner in [Some(Winner::Draw), None] {
        let m = game(1, 2, 1, 1, winner);
        assert_eq!(classify(&m, 1), Some(Outcome::Draw));
        assert_eq!(classify(&m, 2), Some(Outcome::Draw));
    }
}

#[test]
fn arsenal_splits_evenly() {
    let summary = team_outcomes(&fixture_matches(), ARSENAL).expect("arsenal played");
    assert_eq!(summary.matches, 3);
    for outcome in Outcome::ALL {
        assert_eq!(summary.count(outcome), 1);
        assert!((summary.pct(outcome) - 100.0 / 3.0).abs() < 1e-9);
    }
}

#[test]
fn absent_categories_are_reported_as_zero() {
    let summary = team_outcomes(&fixture_matches(), CHELSEA).expect("chelsea played");
    let order: Vec<_> = summary.shares.iter().map(|s| s.outcome).collect();
    assert_eq!(order, vec![Outcome::Win, Outcome::Draw, Outcome::Loss]);
    assert_eq!(summary.count(Outcome::Win), 0);
    assert_eq!(summary.pct(Outcome::Win), 0.0);
    assert_eq!(summary.count(Outcome::Draw), 1);
    assert_eq!(summary.count(Outcome::Loss), 2);
    let total: f64 = summary.shares.iter().map(|s| s.pct).sum();
    assert!((total - 100.0).abs() < 1e-9);
}

#[test]
fn team_without_matches_has_no_summary() {
    assert!(team_outcomes(&fixture_matches(), 9999).is_none());
    assert!(team_outcomes(&[], ARSENAL).is_none());
}

#[test]
fn team_goal_histogram_covers_only_its_matches() {
    let hist = team_goal_histogram(&fixture_matches(), MAN_CITY);
    assert_eq!(hist, vec![(0, 0), (1, 1), (2, 0), (3, 1)]);
}

#[test]
fn over_under_shares_from_fixture() {
    let matches = fixture_matches();
    let p = goal_threshold(&matches, DEFAULT_GOAL_THRESHOLD);
    assert_eq!(p.matches, 5);
    assert!((p.over_pct - 60.0).abs() < 1e-9);
    assert!((p.under_or_equal_pct - 40.0).abs() < 1e-9);
    assert_eq!(
        goal_histogram(&matches),
        vec![(0, 0), (1, 1), (2, 1), (3, 2), (4, 1)]
    );
}

#[test]
fn one_to_four_goals_split_in_half() {
    let matches: Vec<_> = [(1, 0), (1, 1), (2, 1), (2, 2)]
        .into_iter()
        .map(|(h, a)| game(1, 2, h, a, None))
        .collect();
    let p = goal_threshold(&matches, 2.5);
    assert_eq!(p.over_pct, 50.0);
    assert_eq!(p.under_or_equal_pct, 50.0);
}

#[test]
fn empty_match_set_is_zero_percent() {
    let p = goal_threshold(&[], 2.5);
    assert_eq!((p.over_pct, p.under_or_equal_pct), (0.0, 0.0));
}
