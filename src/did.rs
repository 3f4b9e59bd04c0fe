use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::ols::{RegressionResult, Term, fit_terms};
use crate::table::Table;

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;
pub const DEFAULT_TREATMENT_FIELD: &str = "treatment";
pub const DEFAULT_POST_FIELD: &str = "post";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectDirection {
    Positive,
    Negative,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct DidEstimate {
    pub interaction: String,
    pub effect: f64,
    pub p_value: f64,
    pub significant: bool,
    pub direction: EffectDirection,
    pub regression: RegressionResult,
}

/// Fits `dependent ~ treatment + post + treatment:post`.
///
/// The interaction coefficient is the differential effect of treatment after
/// the cutoff. Both indicators must exist and hold only 0/1 values.
pub fn estimate_did(
    table: &Table,
    dependent: &str,
    treatment: &str,
    post: &str,
) -> Result<DidEstimate> {
    table.require_column(treatment)?;
    table.require_column(post)?;
    require_binary(table, treatment)?;
    require_binary(table, post)?;

    let terms = [
        Term::field(treatment),
        Term::field(post),
        Term::interaction(treatment, post),
    ];
    let regression = fit_terms(table, dependent, &terms)?;
    let interaction = terms[2].name();
    let coef = regression
        .term(&interaction)
        .ok_or_else(|| AnalysisError::model_fit("interaction term missing from fit"))?;

    let effect = coef.estimate;
    let p_value = coef.p_value;
    let direction = if effect > 0.0 {
        EffectDirection::Positive
    } else if effect < 0.0 {
        EffectDirection::Negative
    } else {
        EffectDirection::None
    };

    Ok(DidEstimate {
        interaction,
        effect,
        p_value,
        significant: p_value < SIGNIFICANCE_LEVEL,
        direction,
        regression,
    })
}

fn require_binary(table: &Table, field: &str) -> Result<()> {
    let values = table.numeric(field)?;
    let idx = table.require_column(field)?;
    for (row, v) in values.iter().enumerate() {
        match v {
            Some(v) if *v == 0.0 || *v == 1.0 => {}
            None if table.rows()[row][idx].is_missing() => {}
            _ => {
                return Err(AnalysisError::model_fit(format!(
                    "indicator `{field}` must be 0/1 (row {})",
                    row + 1
                )));
            }
        }
    }
    Ok(())
}
