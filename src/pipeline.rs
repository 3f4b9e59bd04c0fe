use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::compare::{GroupComparison, compare_groups};
use crate::data_load::YEAR_COLUMN;
use crate::did::{DidEstimate, estimate_did};
use crate::error::{AnalysisError, Result};
use crate::football_data::{MatchRecord, TeamRef, teams};
use crate::geo::{RegionValue, department_means};
use crate::goal_stats::{ThresholdProbability, goal_histogram, goal_threshold};
use crate::ols::{RegressionResult, fit_ols, fit_ols_filtered};
use crate::sweep::{GroupFit, sort_by_coefficient, sweep_by_group};
use crate::table::Table;
use crate::team_stats::{OutcomeSummary, team_goal_histogram, team_outcomes};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OlsRequest {
    pub dependent: String,
    pub independents: Vec<String>,
    /// Restrict the fit to rows where `(field, value)` matches.
    pub filter: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SweepRequest {
    pub dependent: String,
    pub independent: String,
    pub group_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DidRequest {
    pub dependent: String,
    pub treatment: String,
    pub post: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GeoRequest {
    pub region_field: String,
    pub value_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EconomicQuery {
    pub fields: Vec<String>,
    pub key_field: String,
    pub key_values: Vec<String>,
    pub ols: Option<OlsRequest>,
    pub sweep: Option<SweepRequest>,
    pub did: Option<DidRequest>,
    pub geo: Option<GeoRequest>,
}

impl Default for EconomicQuery {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            key_field: YEAR_COLUMN.to_string(),
            key_values: Vec::new(),
            ols: None,
            sweep: None,
            did: None,
            geo: None,
        }
    }
}

impl EconomicQuery {
    fn model_count(&self) -> usize {
        usize::from(self.ols.is_some()) + usize::from(self.did.is_some())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EconomicReport {
    pub rows: usize,
    pub columns: Vec<String>,
    pub comparison: Option<GroupComparison>,
    pub regression: Option<RegressionResult>,
    pub sweep: Vec<GroupFit>,
    pub did: Option<DidEstimate>,
    pub regions: Vec<RegionValue>,
    pub warnings: Vec<String>,
}

/// Runs every section the query asks for.
///
/// A section that fails for a recoverable reason (missing column, unestimable
/// model) becomes a warning. The exception is a model fit failure when that
/// model is the only one requested; it is returned as the error.
pub fn economic_report(table: &Table, query: &EconomicQuery) -> Result<EconomicReport> {
    let sole_model = query.model_count() == 1;
    let mut report = EconomicReport {
        rows: table.len(),
        columns: table.columns().to_vec(),
        ..Default::default()
    };

    match compare_groups(table, &query.fields, &query.key_field, &query.key_values) {
        Ok(comparison) => report.comparison = comparison,
        Err(err) => recover(&mut report.warnings, "comparison", err, false)?,
    }

    if let Some(req) = &query.ols {
        let fit = match &req.filter {
            Some((field, value)) => {
                fit_ols_filtered(table, field, value, &req.dependent, &req.independents)
            }
            None => fit_ols(table, &req.dependent, &req.independents),
        };
        match fit {
            Ok(fit) => report.regression = Some(fit),
            Err(err) => recover(&mut report.warnings, "regression", err, sole_model)?,
        }
    }

    if let Some(req) = &query.sweep {
        match sweep_by_group(table, &req.dependent, &req.independent, &req.group_field) {
            Ok(mut fits) => {
                sort_by_coefficient(&mut fits, true);
                report.sweep = fits;
            }
            Err(err) => recover(&mut report.warnings, "group sweep", err, false)?,
        }
    }

    if let Some(req) = &query.did {
        match estimate_did(table, &req.dependent, &req.treatment, &req.post) {
            Ok(est) => report.did = Some(est),
            Err(err) => recover(&mut report.warnings, "difference-in-differences", err, sole_model)?,
        }
    }

    if let Some(req) = &query.geo {
        match department_means(table, &req.region_field, &req.value_field) {
            Ok(regions) => report.regions = regions,
            Err(err) => recover(&mut report.warnings, "map", err, false)?,
        }
    }

    Ok(report)
}

fn recover(
    warnings: &mut Vec<String>,
    section: &str,
    err: AnalysisError,
    fatal_model_fit: bool,
) -> Result<()> {
    match err {
        AnalysisError::ModelFit(_) if fatal_model_fit => Err(err),
        AnalysisError::ModelFit(_) | AnalysisError::MissingColumn(_) => {
            log::warn!("{section} skipped: {err}");
            warnings.push(format!("{section} skipped: {err}"));
            Ok(())
        }
        other => Err(other),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoccerQuery {
    pub threshold: f64,
    pub team_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSection {
    pub team: TeamRef,
    /// `None` when the team played no finished match in the set.
    pub outcomes: Option<OutcomeSummary>,
    pub goal_histogram: Vec<(u32, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SoccerReport {
    pub matches: usize,
    pub threshold: ThresholdProbability,
    pub goal_histogram: Vec<(u32, usize)>,
    pub teams: Vec<TeamRef>,
    pub team: Option<TeamSection>,
}

pub fn soccer_report(matches: &[MatchRecord], query: &SoccerQuery) -> SoccerReport {
    let teams = teams(matches);
    let team = query.team_id.map(|team_id| {
        let team = teams
            .iter()
            .find(|t| t.id == team_id)
            .cloned()
            .unwrap_or(TeamRef {
                id: team_id,
                name: format!("team {team_id}"),
            });
        TeamSection {
            team,
            outcomes: team_outcomes(matches, team_id),
            goal_histogram: team_goal_histogram(matches, team_id),
        }
    });

    SoccerReport {
        matches: matches.len(),
        threshold: goal_threshold(matches, query.threshold),
        goal_histogram: goal_histogram(matches),
        teams,
        team,
    }
}

/// Results memoized by an input fingerprint.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: Mutex<HashMap<K, Arc<V>>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value for `key`, computing it on first use.
    /// Errors are not stored, so a failed computation runs again next time.
    pub fn get_or_try_insert<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> std::result::Result<V, E>,
    ) -> std::result::Result<Arc<V>, E> {
        if let Some(hit) = self.lock().get(key) {
            return Ok(Arc::clone(hit));
        }
        let value = Arc::new(compute()?);
        self.lock().insert(key.clone(), Arc::clone(&value));
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, Arc<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Memo key for an economic report: source fingerprint plus the query.
pub type EconomicKey = (String, EconomicQuery);

/// Memo key for a soccer report: fetch fingerprint, threshold bits, team.
pub type SoccerKey = (String, u64, Option<u64>);

pub fn soccer_key(source: &str, query: &SoccerQuery) -> SoccerKey {
    (source.to_string(), query.threshold.to_bits(), query.team_id)
}
