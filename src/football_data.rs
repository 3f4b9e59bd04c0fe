use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;

/// Competitions offered for selection, by football-data.org code.
pub const COMPETITIONS: &[(&str, &str)] = &[
    ("PL", "Premier League (England)"),
    ("BL1", "Bundesliga (Germany)"),
    ("SA", "Serie A (Italy)"),
    ("PD", "La Liga (Spain)"),
    ("FL1", "Ligue 1 (France)"),
    ("CL", "UEFA Champions League"),
];

pub fn competition_name(code: &str) -> Option<&'static str> {
    COMPETITIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    HomeTeam,
    AwayTeam,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub id: u64,
    /// UTC kickoff, `YYYY-MM-DD HH:MM`.
    pub date: String,
    pub home_team_id: u64,
    pub home_team: String,
    pub away_team_id: u64,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub total_goals: u32,
    pub winner: Option<Winner>,
}

impl MatchRecord {
    pub fn involves(&self, team_id: u64) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMatch {
    pub id: u64,
    #[serde(rename = "utcDate")]
    pub utc_date: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "homeTeam")]
    pub home_team: ApiTeam,
    #[serde(rename = "awayTeam")]
    pub away_team: ApiTeam,
    pub score: ApiScore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTeam {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiScore {
    #[serde(default)]
    pub winner: Option<Winner>,
    #[serde(rename = "fullTime", default)]
    pub full_time: ApiGoals,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiGoals {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchQuery {
    pub competition: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl MatchQuery {
    pub fn new(competition: impl Into<String>) -> Self {
        Self {
            competition: competition.into(),
            date_from: None,
            date_to: None,
        }
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// `competitions/{code}/matches` with optional `dateFrom`/`dateTo` parameters.
    pub fn endpoint(&self) -> String {
        let mut params = Vec::new();
        if let Some(from) = self.date_from {
            params.push(format!("dateFrom={}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = self.date_to {
            params.push(format!("dateTo={}", to.format("%Y-%m-%d")));
        }
        let code = self.competition.trim().to_ascii_uppercase();
        if params.is_empty() {
            format!("competitions/{code}/matches")
        } else {
            format!("competitions/{code}/matches?{}", params.join("&"))
        }
    }
}

pub struct FootballDataClient {
    config: Config,
}

impl FootballDataClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Raw match list for a competition. Served from the fetch cache within the TTL.
    pub fn fetch_matches(&self, query: &MatchQuery) -> Result<Vec<ApiMatch>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::RemoteFetch {
                status: None,
                message: "no API key configured (set FOOTBALL_DATA_API_KEY or pass --api-key)"
                    .to_string(),
                hint: None,
            })?;
        let client = http_client(self.config.timeout)?;
        let url = format!("{}{}", self.config.base_url, query.endpoint());
        let body = fetch_json_cached(client, &url, api_key, self.config.cache_ttl)?;
        parse_matches_json(&body)
    }

    /// Finished matches with full-time scores.
    pub fn finished_matches(&self, query: &MatchQuery) -> Result<Vec<MatchRecord>> {
        let raw = self.fetch_matches(query)?;
        let total = raw.len();
        let processed = process_matches(&raw);
        log::info!(
            "{}: {} of {} matches finished with scores",
            query.competition,
            processed.len(),
            total
        );
        Ok(processed)
    }
}

pub fn parse_matches_json(raw: &str) -> Result<Vec<ApiMatch>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let resp: MatchesResponse = serde_json::from_str(trimmed)?;
    Ok(resp.matches)
}

/// Keeps finished matches that carry both full-time scores and both team ids.
/// Scores whose sum overflows are treated as absent.
pub fn process_matches(matches: &[ApiMatch]) -> Vec<MatchRecord> {
    matches
        .iter()
        .filter(|m| m.status == "FINISHED")
        .filter_map(|m| {
            let home_goals = m.score.full_time.home?;
            let away_goals = m.score.full_time.away?;
            let total_goals = home_goals.checked_add(away_goals)?;
            Some(MatchRecord {
                id: m.id,
                date: format_kickoff(&m.utc_date),
                home_team_id: m.home_team.id?,
                home_team: m.home_team.name.clone().unwrap_or_default(),
                away_team_id: m.away_team.id?,
                away_team: m.away_team.name.clone().unwrap_or_default(),
                home_goals,
                away_goals,
                total_goals,
                winner: m.score.winner,
            })
        })
        .collect()
}

/// Distinct teams seen in the matches, sorted by name.
pub fn teams(matches: &[MatchRecord]) -> Vec<TeamRef> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in matches {
        for (id, name) in [
            (m.home_team_id, &m.home_team),
            (m.away_team_id, &m.away_team),
        ] {
            if seen.insert(id) {
                out.push(TeamRef {
                    id,
                    name: name.clone(),
                });
            }
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    out
}

fn format_kickoff(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
