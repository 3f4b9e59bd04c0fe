use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::stats::student_t_two_sided_p;
use crate::table::Table;

const INTERCEPT: &str = "Intercept";
/// Smallest accepted ratio between the extreme singular values of the design.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Term {
    Field(String),
    /// Product of two fields, written `a:b`.
    Interaction(String, String),
}

impl Term {
    pub fn field(name: impl Into<String>) -> Self {
        Term::Field(name.into())
    }

    pub fn interaction(a: impl Into<String>, b: impl Into<String>) -> Self {
        Term::Interaction(a.into(), b.into())
    }

    pub fn name(&self) -> String {
        self.to_string()
    }

    fn fields(&self) -> Vec<&str> {
        match self {
            Term::Field(f) => vec![f.as_str()],
            Term::Interaction(a, b) => vec![a.as_str(), b.as_str()],
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Field(name) => f.write_str(name),
            Term::Interaction(a, b) => write!(f, "{a}:{b}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionResult {
    pub dependent: String,
    pub independents: Vec<String>,
    pub intercept: Coefficient,
    /// One entry per term, in the order the terms were given.
    pub coefficients: Vec<Coefficient>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub n_obs: usize,
    pub df_resid: usize,
}

impl RegressionResult {
    pub fn coefficient(&self, term: &str) -> Option<f64> {
        self.term(term).map(|c| c.estimate)
    }

    pub fn p_value(&self, term: &str) -> Option<f64> {
        self.term(term).map(|c| c.p_value)
    }

    pub fn term(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// `y ~ a + b` style description of the fitted model.
    pub fn formula(&self) -> String {
        format!("{} ~ {}", self.dependent, self.independents.join(" + "))
    }
}

/// Additive model `dependent ~ independents[0] + ...` with an intercept.
pub fn fit_ols<S: AsRef<str>>(
    table: &Table,
    dependent: &str,
    independents: &[S],
) -> Result<RegressionResult> {
    let terms = independents
        .iter()
        .map(|s| Term::field(s.as_ref()))
        .collect::<Vec<_>>();
    fit_terms(table, dependent, &terms)
}

/// Same as [`fit_ols`] over the rows whose `filter_field` equals `filter_value`.
pub fn fit_ols_filtered<S: AsRef<str>>(
    table: &Table,
    filter_field: &str,
    filter_value: &str,
    dependent: &str,
    independents: &[S],
) -> Result<RegressionResult> {
    let subset = table.filter_eq(filter_field, filter_value)?;
    fit_ols(&subset, dependent, independents)
}

pub fn fit_terms(table: &Table, dependent: &str, terms: &[Term]) -> Result<RegressionResult> {
    if terms.is_empty() {
        return Err(AnalysisError::model_fit("no independent fields selected"));
    }

    table.require_column(dependent)?;
    for term in terms {
        for field in term.fields() {
            table.require_column(field)?;
        }
    }
    if !table.is_numeric_column(dependent) {
        return Err(AnalysisError::model_fit(format!(
            "dependent field `{dependent}` is not numeric"
        )));
    }
    for term in terms {
        for field in term.fields() {
            if !table.is_numeric_column(field) {
                return Err(AnalysisError::model_fit(format!(
                    "independent field `{field}` is not numeric"
                )));
            }
        }
    }

    let (y, x) = design(table, dependent, terms)?;
    let n = y.len();
    let p = x.ncols();
    if n <= p {
        return Err(AnalysisError::model_fit(format!(
            "{n} complete observations for {p} parameters"
        )));
    }

    // Unit-norm columns keep the rank test and the solve independent of units.
    let norms = x.column_iter().map(|c| c.norm()).collect::<Vec<_>>();
    if norms.iter().any(|n| !n.is_finite() || *n <= 0.0) {
        return Err(rank_deficient());
    }
    let mut scaled = x.clone();
    for (mut col, norm) in scaled.column_iter_mut().zip(&norms) {
        col /= *norm;
    }

    let svd = scaled.svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if s_max.is_nan() || s_max <= 0.0 || s_min / s_max < RANK_TOLERANCE {
        return Err(rank_deficient());
    }
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| AnalysisError::model_fit("singular value decomposition incomplete"))?;
    let beta_scaled = svd.solve(&y, 0.0).map_err(AnalysisError::model_fit)?;
    let inv_sq = svd.singular_values.map(|s| 1.0 / (s * s));
    let cov_scaled = v_t.transpose() * DMatrix::from_diagonal(&inv_sq) * v_t;

    let beta = DVector::from_iterator(
        p,
        beta_scaled.iter().zip(&norms).map(|(b, norm)| b / norm),
    );
    let unscaled_var = |j: usize| cov_scaled[(j, j)] / (norms[j] * norms[j]);

    let fitted = &x * &beta;
    let resid = &y - fitted;
    let ssr = resid.dot(&resid);
    let y_mean = y.mean();
    let sst = y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>();
    if sst <= 0.0 {
        return Err(AnalysisError::model_fit(format!(
            "dependent field `{dependent}` has no variation"
        )));
    }

    let df_resid = n - p;
    let r_squared = 1.0 - ssr / sst;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_resid as f64;
    let sigma2 = ssr / df_resid as f64;

    let coefficient = |j: usize, term: String| {
        let estimate = beta[j];
        let std_error = (sigma2 * unscaled_var(j)).max(0.0).sqrt();
        let t_value = estimate / std_error;
        Coefficient {
            term,
            estimate,
            std_error,
            t_value,
            p_value: student_t_two_sided_p(t_value, df_resid as f64),
        }
    };

    let intercept = coefficient(0, INTERCEPT.to_string());
    let coefficients = terms
        .iter()
        .enumerate()
        .map(|(i, term)| coefficient(i + 1, term.name()))
        .collect();

    Ok(RegressionResult {
        dependent: dependent.to_string(),
        independents: terms.iter().map(Term::name).collect(),
        intercept,
        coefficients,
        r_squared,
        adj_r_squared,
        n_obs: n,
        df_resid,
    })
}

fn rank_deficient() -> AnalysisError {
    AnalysisError::model_fit("design matrix is rank deficient (constant or collinear independents)")
}

/// Response vector and design matrix (intercept first) after listwise deletion.
fn design(table: &Table, dependent: &str, terms: &[Term]) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let y_all = table.numeric(dependent)?;
    let term_cols = terms
        .iter()
        .map(|term| term_values(table, term))
        .collect::<Result<Vec<_>>>()?;

    let mut y = Vec::with_capacity(y_all.len());
    let mut rows: Vec<f64> = Vec::with_capacity(y_all.len() * (terms.len() + 1));
    'rows: for (i, yv) in y_all.iter().enumerate() {
        let Some(yv) = yv else {
            continue;
        };
        let start = rows.len();
        rows.push(1.0);
        for col in &term_cols {
            match col[i] {
                Some(v) => rows.push(v),
                None => {
                    rows.truncate(start);
                    continue 'rows;
                }
            }
        }
        y.push(*yv);
    }

    let n = y.len();
    let x = DMatrix::from_row_slice(n, terms.len() + 1, &rows);
    Ok((DVector::from_vec(y), x))
}

fn term_values(table: &Table, term: &Term) -> Result<Vec<Option<f64>>> {
    match term {
        Term::Field(name) => table.numeric(name),
        Term::Interaction(a, b) => {
            let a = table.numeric(a)?;
            let b = table.numeric(b)?;
            Ok(a.iter()
                .zip(&b)
                .map(|(a, b)| Some((*a)? * (*b)?))
                .collect())
        }
    }
}
