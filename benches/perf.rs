use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use panel_pitch::data_load::parse_csv;
use panel_pitch::football_data::{MatchRecord, Winner};
use panel_pitch::ols::fit_ols;
use panel_pitch::sweep::sweep_by_group;
use panel_pitch::table::Table;
use panel_pitch::team_stats::team_outcomes;

fn synthetic_panel(rows: usize) -> Table {
    let mut csv = String::from("year,department,x1,x2,x3,y\n");
    for i in 0..rows {
        let x1 = (i % 17) as f64 * 0.5;
        let x2 = ((i * 7) % 23) as f64 * 0.25;
        let x3 = ((i * 13) % 11) as f64;
        let noise = ((i * 31) % 19) as f64 / 19.0 - 0.5;
        let y = 1.0 + 0.8 * x1 - 0.3 * x2 + 0.1 * x3 + noise;
        csv.push_str(&format!(
            "{},D{},{x1},{x2},{x3},{y}\n",
            2010 + i % 10,
            i % 32
        ));
    }
    parse_csv(&csv).expect("synthetic csv")
}

fn synthetic_matches(n: usize) -> Vec<MatchRecord> {
    (0..n)
        .map(|i| {
            let home = (i % 20) as u64;
            let away = ((i * 7 + 3) % 20) as u64;
            let home_goals = (i % 4) as u32;
            let away_goals = ((i / 3) % 3) as u32;
            let winner = match home_goals.cmp(&away_goals) {
                std::cmp::Ordering::Greater => Some(Winner::HomeTeam),
                std::cmp::Ordering::Less => Some(Winner::AwayTeam),
                std::cmp::Ordering::Equal => Some(Winner::Draw),
            };
            MatchRecord {
                id: i as u64,
                date: "2024-01-01 15:00".to_string(),
                home_team_id: home,
                home_team: format!("Team {home}"),
                away_team_id: away,
                away_team: format!("Team {away}"),
                home_goals,
                away_goals,
                total_goals: home_goals + away_goals,
                winner,
            }
        })
        .collect()
}

fn bench_ols_fit(c: &mut Criterion) {
    let table = synthetic_panel(5_000);
    c.bench_function("ols_fit_three_independents", |b| {
        b.iter(|| {
            let fit = fit_ols(black_box(&table), "y", &["x1", "x2", "x3"]).unwrap();
            black_box(fit.r_squared);
        })
    });
}

fn bench_group_sweep(c: &mut Criterion) {
    let table = synthetic_panel(5_000);
    c.bench_function("sweep_by_department", |b| {
        b.iter(|| {
            let fits = sweep_by_group(black_box(&table), "y", "x1", "department").unwrap();
            black_box(fits.len());
        })
    });
}

fn bench_team_outcomes(c: &mut Criterion) {
    let matches = synthetic_matches(10_000);
    c.bench_function("team_outcomes", |b| {
        b.iter(|| {
            let summary = team_outcomes(black_box(&matches), 7);
            black_box(summary.map(|s| s.matches));
        })
    });
}

criterion_group!(benches, bench_ols_fit, bench_group_sweep, bench_team_outcomes);
criterion_main!(benches);
