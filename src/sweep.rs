use std::cmp::Ordering;

use serde::Serialize;

use crate::error::Result;
use crate::ols::{RegressionResult, fit_ols};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupFit {
    pub group: String,
    pub coefficient: f64,
    pub p_value: f64,
    pub n_obs: usize,
}

/// Fits `dependent ~ independent` inside every group of `group_field`.
///
/// Groups whose fit is not estimable are left out. Missing columns are still
/// an error for the whole request.
pub fn sweep_by_group(
    table: &Table,
    dependent: &str,
    independent: &str,
    group_field: &str,
) -> Result<Vec<GroupFit>> {
    table.require_column(dependent)?;
    table.require_column(independent)?;

    let mut out = Vec::new();
    for (group, subset) in table.group_by(group_field)? {
        match fit_ols(&subset, dependent, &[independent]) {
            Ok(fit) => {
                let Some(coef) = fit.term(independent) else {
                    continue;
                };
                out.push(GroupFit {
                    group,
                    coefficient: coef.estimate,
                    p_value: coef.p_value,
                    n_obs: fit.n_obs,
                });
            }
            Err(err) if err.is_model_fit() => {
                log::debug!("skipping group {group_field}={group}: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}

/// Orders by coefficient; NaN coefficients sort last either way.
pub fn sort_by_coefficient(fits: &mut [GroupFit], descending: bool) {
    fits.sort_by(|a, b| {
        match (a.coefficient.is_nan(), b.coefficient.is_nan()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        let ord = a.coefficient.total_cmp(&b.coefficient);
        if descending { ord.reverse() } else { ord }
    });
}

/// One single-independent regression per field. Unestimable fields are skipped.
pub fn sweep_fields<S: AsRef<str>>(
    table: &Table,
    dependent: &str,
    independents: &[S],
) -> Result<Vec<RegressionResult>> {
    let mut out = Vec::new();
    for field in independents {
        let field = field.as_ref();
        match fit_ols(table, dependent, &[field]) {
            Ok(fit) => out.push(fit),
            Err(err) if err.is_model_fit() => {
                log::debug!("skipping {dependent} ~ {field}: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}
