use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use panel_pitch::AnalysisError;
use panel_pitch::data_load::load_panel;
use panel_pitch::fingerprint::fingerprint;
use panel_pitch::football_data::{parse_matches_json, process_matches};
use panel_pitch::pipeline::{
    DidRequest, EconomicKey, EconomicQuery, Memo, OlsRequest, SoccerQuery, SweepRequest,
    economic_report, soccer_key, soccer_report,
};
use panel_pitch::table::Table;
use panel_pitch::team_stats::Outcome;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn panel() -> (String, Table) {
    let bytes = fs::read(fixture_path("panel.csv")).expect("fixture file should be readable");
    (fingerprint([&bytes]), load_panel(&bytes).expect("panel should load"))
}

fn did_request(post: &str) -> DidRequest {
    DidRequest {
        dependent: "gdp_growth".to_string(),
        treatment: "treatment".to_string(),
        post: post.to_string(),
    }
}

#[test]
fn missing_did_indicator_becomes_a_warning() {
    let (_, table) = panel();
    let query = EconomicQuery {
        did: Some(did_request("after_2016")),
        ..Default::default()
    };
    let report = economic_report(&table, &query).expect("request should not fail");
    assert!(report.did.is_none());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("after_2016"));
}

#[test]
fn sole_model_fit_failure_is_returned() {
    let (_, table) = panel();
    let query = EconomicQuery {
        ols: Some(OlsRequest {
            dependent: "gdp_growth".to_string(),
            independents: vec!["fdi".to_string()],
            filter: Some(("department".to_string(), "Guaviare".to_string())),
        }),
        ..Default::default()
    };
    let err = economic_report(&table, &query).unwrap_err();
    assert!(matches!(err, AnalysisError::ModelFit(_)));
}

#[test]
fn failing_model_among_several_is_only_a_warning() {
    let (_, table) = panel();
    let query = EconomicQuery {
        fields: vec!["gdp_growth".to_string()],
        key_values: vec!["2015".to_string(), "2019".to_string()],
        ols: Some(OlsRequest {
            dependent: "department".to_string(),
            independents: vec!["fdi".to_string()],
            filter: None,
        }),
        sweep: Some(SweepRequest {
            dependent: "gdp_growth".to_string(),
            independent: "fdi".to_string(),
            group_field: "department".to_string(),
        }),
        did: Some(did_request("post")),
        ..Default::default()
    };
    let report = economic_report(&table, &query).unwrap();
    assert!(report.regression.is_none());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.comparison.is_some());
    assert_eq!(report.sweep.len(), 4);
    assert_eq!(report.sweep[0].group, "Meta");
    assert!(report.did.as_ref().unwrap().significant);
}

#[test]
fn memo_computes_once_per_fingerprint() {
    let (source, table) = panel();
    let memo: Memo<EconomicKey, _> = Memo::new();
    let calls = Cell::new(0);
    let query = EconomicQuery {
        did: Some(did_request("post")),
        ..Default::default()
    };

    for _ in 0..3 {
        let report = memo
            .get_or_try_insert(&(source.clone(), query.clone()), || {
                calls.set(calls.get() + 1);
                economic_report(&table, &query)
            })
            .unwrap();
        assert!(report.did.is_some());
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(memo.len(), 1);
}

#[test]
fn memo_does_not_store_errors() {
    let memo: Memo<String, u32> = Memo::new();
    let key = "k".to_string();
    let first: Result<_, &str> = memo.get_or_try_insert(&key, || Err("boom"));
    assert!(first.is_err());
    assert!(memo.is_empty());
    let second: Result<_, &str> = memo.get_or_try_insert(&key, || Ok(7));
    assert_eq!(*second.unwrap(), 7);
}

#[test]
fn soccer_report_for_a_team() {
    let raw = fs::read_to_string(fixture_path("football_data_matches.json")).unwrap();
    let matches = process_matches(&parse_matches_json(&raw).unwrap());
    let query = SoccerQuery {
        threshold: 2.5,
        team_id: Some(64),
    };
    let report = soccer_report(&matches, &query);
    assert_eq!(report.matches, 5);
    assert_eq!(report.teams.len(), 4);
    let team = report.team.expect("team requested");
    assert_eq!(team.team.name, "Liverpool FC");
    let outcomes = team.outcomes.expect("liverpool played");
    assert_eq!(outcomes.count(Outcome::Win), 1);
    assert_eq!(outcomes.count(Outcome::Draw), 1);
    assert_eq!(outcomes.count(Outcome::Loss), 0);

    let key = soccer_key("PL", &query);
    assert_eq!(key, soccer_key("PL", &query));
    assert_ne!(key, soccer_key("PL", &SoccerQuery { team_id: None, ..query }));
}
