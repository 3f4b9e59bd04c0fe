use serde::Serialize;

use crate::football_data::MatchRecord;
use crate::stats::integer_histogram;

pub const DEFAULT_GOAL_THRESHOLD: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdProbability {
    pub threshold: f64,
    pub matches: usize,
    pub over_pct: f64,
    pub under_or_equal_pct: f64,
}

/// Share of matches whose total goals exceed `threshold`, and the rest.
/// An empty match set reports 0% for both sides.
pub fn goal_threshold(matches: &[MatchRecord], threshold: f64) -> ThresholdProbability {
    let totals: Vec<u32> = matches.iter().map(|m| m.total_goals).collect();
    threshold_from_totals(&totals, threshold)
}

pub fn threshold_from_totals(totals: &[u32], threshold: f64) -> ThresholdProbability {
    if totals.is_empty() {
        return ThresholdProbability {
            threshold,
            matches: 0,
            over_pct: 0.0,
            under_or_equal_pct: 0.0,
        };
    }
    let over = totals.iter().filter(|t| f64::from(**t) > threshold).count();
    let n = totals.len() as f64;
    ThresholdProbability {
        threshold,
        matches: totals.len(),
        over_pct: over as f64 / n * 100.0,
        under_or_equal_pct: (totals.len() - over) as f64 / n * 100.0,
    }
}

pub fn goal_histogram(matches: &[MatchRecord]) -> Vec<(u32, usize)> {
    let totals: Vec<u32> = matches.iter().map(|m| m.total_goals).collect();
    integer_histogram(&totals)
}
