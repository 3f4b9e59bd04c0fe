use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use panel_pitch::config::Config;
use panel_pitch::data_load::{TableCache, TableKind, YEAR_COLUMN};
use panel_pitch::did::{DEFAULT_POST_FIELD, DEFAULT_TREATMENT_FIELD, DidEstimate};
use panel_pitch::football_data::{COMPETITIONS, FootballDataClient, MatchQuery, competition_name};
use panel_pitch::geo::{DEPARTMENT_FIELD, municipality_points};
use panel_pitch::goal_stats::DEFAULT_GOAL_THRESHOLD;
use panel_pitch::ols::RegressionResult;
use panel_pitch::pipeline::{
    DidRequest, EconomicQuery, EconomicReport, GeoRequest, OlsRequest, SoccerQuery, SweepRequest,
    economic_report, soccer_report,
};
use panel_pitch::table::Table;
use panel_pitch::team_stats::Outcome;

#[derive(Debug, Parser)]
#[command(author, version, about = "Panel-data regressions and football outcome statistics")]
struct Opt {
    /// Log directive, e.g. `info` or `panel_pitch=debug`. Added on top of `RUST_LOG`.
    #[arg(long, global = true)]
    log: Option<String>,

    /// Print reports as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Exploratory analysis over a panel CSV.
    #[command(subcommand)]
    Econ(EconCommand),
    /// Match statistics from football-data.org.
    #[command(subcommand)]
    Soccer(SoccerCommand),
}

#[derive(Debug, Subcommand)]
enum EconCommand {
    /// Column list and the first rows.
    Preview {
        path: PathBuf,
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Compare field means between two years.
    Compare {
        path: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        /// Exactly two values of the key field.
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<String>,
        #[arg(long, default_value = YEAR_COLUMN)]
        key_field: String,
    },
    /// OLS fit of a dependent field on one or more independents.
    Ols {
        path: PathBuf,
        #[arg(long)]
        dependent: String,
        #[arg(long, value_delimiter = ',', required = true)]
        independents: Vec<String>,
        /// Only fit rows of this department.
        #[arg(long)]
        department: Option<String>,
        #[arg(long, default_value = DEPARTMENT_FIELD)]
        department_field: String,
    },
    /// Single-independent fit inside every group.
    Sweep {
        path: PathBuf,
        #[arg(long)]
        dependent: String,
        #[arg(long)]
        independent: String,
        #[arg(long, default_value = DEPARTMENT_FIELD)]
        group_field: String,
    },
    /// Difference-in-differences with treatment and post indicators.
    Did {
        path: PathBuf,
        #[arg(long)]
        dependent: String,
        #[arg(long, default_value = DEFAULT_TREATMENT_FIELD)]
        treatment: String,
        #[arg(long, default_value = DEFAULT_POST_FIELD)]
        post: String,
    },
    /// Per-region means for a choropleth, or a point layer with --points.
    Geo {
        path: PathBuf,
        #[arg(long)]
        value: String,
        #[arg(long, default_value = DEPARTMENT_FIELD)]
        region_field: String,
        #[arg(long)]
        points: bool,
    },
}

#[derive(Debug, Args)]
struct FetchArgs {
    #[arg(long, default_value = "PL")]
    competition: String,
    #[arg(long)]
    date_from: Option<NaiveDate>,
    #[arg(long)]
    date_to: Option<NaiveDate>,
    #[arg(long, env = "FOOTBALL_DATA_API_KEY")]
    api_key: Option<String>,
}

#[derive(Debug, Subcommand)]
enum SoccerCommand {
    /// Supported competition codes.
    Competitions,
    /// Finished matches with scores.
    Matches {
        #[command(flatten)]
        fetch: FetchArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Over/under probability for total goals.
    Goals {
        #[command(flatten)]
        fetch: FetchArgs,
        #[arg(long, default_value_t = DEFAULT_GOAL_THRESHOLD)]
        threshold: f64,
    },
    /// Win/draw/loss shares for a team; lists teams when --team is omitted.
    Team {
        #[command(flatten)]
        fetch: FetchArgs,
        #[arg(long)]
        team: Option<u64>,
        #[arg(long, default_value_t = DEFAULT_GOAL_THRESHOLD)]
        threshold: f64,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Opt { log, json, command } = Opt::parse();
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    if let Some(log) = log {
        filter = filter.add_directive(
            log.parse()
                .with_context(|| format!("invalid log directive `{log}`"))?,
        );
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::Econ(cmd) => run_econ(cmd, json),
        Command::Soccer(cmd) => run_soccer(cmd, json),
    }
}

fn run_econ(cmd: EconCommand, json: bool) -> Result<()> {
    let cache = TableCache::new();
    let load = |path: &PathBuf| {
        cache
            .load_path(path, TableKind::Panel)
            .with_context(|| format!("loading {}", path.display()))
    };

    match cmd {
        EconCommand::Preview { path, rows } => {
            let table = load(&path)?;
            if json {
                return print_json(&table.head(rows));
            }
            println!("{} rows, columns: {}", table.len(), table.columns().join(", "));
            println!("numeric: {}", table.numeric_columns().join(", "));
            print_table(&table.head(rows));
            Ok(())
        }
        EconCommand::Compare {
            path,
            fields,
            years,
            key_field,
        } => {
            let table = load(&path)?;
            if years.len() != 2 {
                eprintln!("select exactly two {key_field} values to compare");
                return Ok(());
            }
            let query = EconomicQuery {
                fields,
                key_field,
                key_values: years,
                ..Default::default()
            };
            emit_report(&economic_report(&table, &query)?, json)
        }
        EconCommand::Ols {
            path,
            dependent,
            independents,
            department,
            department_field,
        } => {
            let table = load(&path)?;
            let query = EconomicQuery {
                ols: Some(OlsRequest {
                    dependent,
                    independents,
                    filter: department.map(|d| (department_field, d)),
                }),
                ..Default::default()
            };
            emit_report(&economic_report(&table, &query)?, json)
        }
        EconCommand::Sweep {
            path,
            dependent,
            independent,
            group_field,
        } => {
            let table = load(&path)?;
            let query = EconomicQuery {
                sweep: Some(SweepRequest {
                    dependent,
                    independent,
                    group_field,
                }),
                ..Default::default()
            };
            emit_report(&economic_report(&table, &query)?, json)
        }
        EconCommand::Did {
            path,
            dependent,
            treatment,
            post,
        } => {
            let table = load(&path)?;
            let query = EconomicQuery {
                did: Some(DidRequest {
                    dependent,
                    treatment,
                    post,
                }),
                ..Default::default()
            };
            emit_report(&economic_report(&table, &query)?, json)
        }
        EconCommand::Geo {
            path,
            value,
            region_field,
            points,
        } => {
            let table = cache
                .load_path(&path, TableKind::Plain)
                .with_context(|| format!("loading {}", path.display()))?;
            if points {
                match municipality_points(&table, &value) {
                    Ok(points) if json => print_json(&points),
                    Ok(points) => {
                        for p in points {
                            println!(
                                "{:<24} {:>9.4} {:>9.4} {}",
                                p.label.unwrap_or_default(),
                                p.latitude,
                                p.longitude,
                                fmt_opt(p.value)
                            );
                        }
                        Ok(())
                    }
                    Err(err) if err.is_missing_column() => {
                        eprintln!("[WARN] map points skipped: {err}");
                        Ok(())
                    }
                    Err(err) => Err(err.into()),
                }
            } else {
                let query = EconomicQuery {
                    geo: Some(GeoRequest {
                        region_field,
                        value_field: value,
                    }),
                    ..Default::default()
                };
                emit_report(&economic_report(&table, &query)?, json)
            }
        }
    }
}

fn run_soccer(cmd: SoccerCommand, json: bool) -> Result<()> {
    let fetch_matches = |fetch: &FetchArgs| -> Result<Vec<_>> {
        let config = Config::from_env().with_api_key(fetch.api_key.clone());
        let client = FootballDataClient::new(config);
        let query = MatchQuery::new(&fetch.competition).between(fetch.date_from, fetch.date_to);
        let matches = client
            .finished_matches(&query)
            .with_context(|| format!("fetching {} matches", fetch.competition))?;
        if matches.is_empty() {
            eprintln!(
                "[WARN] no finished matches with scores for {}",
                competition_name(&fetch.competition).unwrap_or(fetch.competition.as_str())
            );
        }
        Ok(matches)
    };

    match cmd {
        SoccerCommand::Competitions => {
            if json {
                let list: Vec<_> = COMPETITIONS
                    .iter()
                    .map(|(code, name)| serde_json::json!({ "code": code, "name": name }))
                    .collect();
                return print_json(&list);
            }
            for (code, name) in COMPETITIONS {
                println!("{code:<4} {name}");
            }
            Ok(())
        }
        SoccerCommand::Matches { fetch, limit } => {
            let matches = fetch_matches(&fetch)?;
            let shown: Vec<_> = matches.iter().take(limit).collect();
            if json {
                return print_json(&shown);
            }
            for m in shown {
                println!(
                    "{}  {:<28} {:>2}-{:<2} {:<28} {:?}",
                    m.date, m.home_team, m.home_goals, m.away_goals, m.away_team, m.winner
                );
            }
            Ok(())
        }
        SoccerCommand::Goals { fetch, threshold } => {
            let matches = fetch_matches(&fetch)?;
            let report = soccer_report(
                &matches,
                &SoccerQuery {
                    threshold,
                    team_id: None,
                },
            );
            if json {
                return print_json(&report);
            }
            println!("{} finished matches", report.matches);
            println!(
                "Over {} goals: {:.2}%",
                report.threshold.threshold, report.threshold.over_pct
            );
            println!(
                "Under/equal {} goals: {:.2}%",
                report.threshold.threshold, report.threshold.under_or_equal_pct
            );
            print_goal_histogram(&report.goal_histogram);
            Ok(())
        }
        SoccerCommand::Team {
            fetch,
            team,
            threshold,
        } => {
            let matches = fetch_matches(&fetch)?;
            let report = soccer_report(
                &matches,
                &SoccerQuery {
                    threshold,
                    team_id: team,
                },
            );
            if json {
                return print_json(&report);
            }
            let Some(section) = report.team else {
                for t in &report.teams {
                    println!("{:>6}  {}", t.id, t.name);
                }
                return Ok(());
            };
            println!("Performance of {}", section.team.name);
            let Some(outcomes) = section.outcomes else {
                println!("No match data found for {} in the selected dataset.", section.team.name);
                return Ok(());
            };
            for outcome in Outcome::ALL {
                println!(
                    "{:<5} {:>3}  {:6.2}%",
                    outcome.label(),
                    outcomes.count(outcome),
                    outcomes.pct(outcome)
                );
            }
            print_goal_histogram(&section.goal_histogram);
            Ok(())
        }
    }
}

fn emit_report(report: &EconomicReport, json: bool) -> Result<()> {
    for warning in &report.warnings {
        eprintln!("[WARN] {warning}");
    }
    if json {
        return print_json(report);
    }

    if let Some(cmp) = &report.comparison {
        println!(
            "{:<24} {:>14} {:>14}",
            "field",
            format!("{}={}", cmp.key_field, cmp.key_a),
            format!("{}={}", cmp.key_field, cmp.key_b)
        );
        for f in &cmp.fields {
            println!("{:<24} {:>14.4} {:>14.4}", f.field, f.mean_a, f.mean_b);
        }
    }
    if let Some(fit) = &report.regression {
        print_regression(fit);
    }
    if !report.sweep.is_empty() {
        println!("{:<24} {:>12} {:>10} {:>6}", "group", "coef", "p", "n");
        for g in &report.sweep {
            println!(
                "{:<24} {:>12.4} {:>10.4} {:>6}",
                g.group, g.coefficient, g.p_value, g.n_obs
            );
        }
    }
    if let Some(did) = &report.did {
        print_did(did);
    }
    for r in &report.regions {
        println!("{:<24} {:>12.4} {:>6}", r.region, r.mean, r.observations);
    }
    Ok(())
}

fn print_regression(fit: &RegressionResult) {
    println!("{}", fit.formula());
    println!(
        "n = {}, R² = {:.4}, adj. R² = {:.4}",
        fit.n_obs, fit.r_squared, fit.adj_r_squared
    );
    println!("{:<24} {:>12} {:>10} {:>10}", "term", "coef", "std err", "p");
    for c in std::iter::once(&fit.intercept).chain(&fit.coefficients) {
        println!(
            "{:<24} {:>12.4} {:>10.4} {:>10.4}",
            c.term, c.estimate, c.std_error, c.p_value
        );
    }
}

fn print_did(did: &DidEstimate) {
    print_regression(&did.regression);
    println!(
        "Treatment effect ({}): {:.4}, p = {:.4} ({})",
        did.interaction,
        did.effect,
        did.p_value,
        if did.significant {
            "significant at 5%"
        } else {
            "not significant at 5%"
        }
    );
}

fn print_table(table: &Table) {
    println!("{}", table.columns().join("\t"));
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
}

fn print_goal_histogram(hist: &[(u32, usize)]) {
    for (goals, count) in hist {
        println!("{goals:>2} | {} {count}", "#".repeat(*count));
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serialize report")?
    );
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.4}")).unwrap_or_default()
}
