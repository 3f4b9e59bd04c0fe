use serde::Serialize;

use crate::football_data::{MatchRecord, Winner};
use crate::stats::integer_histogram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Reporting order.
    pub const ALL: [Outcome; 3] = [Outcome::Win, Outcome::Draw, Outcome::Loss];

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Win => "Win",
            Outcome::Draw => "Draw",
            Outcome::Loss => "Loss",
        }
    }

    fn index(self) -> usize {
        match self {
            Outcome::Win => 0,
            Outcome::Draw => 1,
            Outcome::Loss => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeShare {
    pub outcome: Outcome,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSummary {
    pub team_id: u64,
    pub matches: usize,
    /// Always Win, Draw, Loss, with zero entries kept.
    pub shares: [OutcomeShare; 3],
}

impl OutcomeSummary {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.shares[outcome.index()].count
    }

    pub fn pct(&self, outcome: Outcome) -> f64 {
        self.shares[outcome.index()].pct
    }
}

/// Result of a match from the point of view of `team_id`; `None` if the team did not play.
///
/// Anything other than a recorded win for either side (draw or no winner) is a draw.
pub fn classify(m: &MatchRecord, team_id: u64) -> Option<Outcome> {
    let outcome = if m.home_team_id == team_id {
        match m.winner {
            Some(Winner::HomeTeam) => Outcome::Win,
            Some(Winner::AwayTeam) => Outcome::Loss,
            _ => Outcome::Draw,
        }
    } else if m.away_team_id == team_id {
        match m.winner {
            Some(Winner::AwayTeam) => Outcome::Win,
            Some(Winner::HomeTeam) => Outcome::Loss,
            _ => Outcome::Draw,
        }
    } else {
        return None;
    };
    Some(outcome)
}

pub fn team_matches(matches: &[MatchRecord], team_id: u64) -> Vec<&MatchRecord> {
    matches.iter().filter(|m| m.involves(team_id)).collect()
}

/// Win/draw/loss counts and percentages. `None` when the team has no matches.
pub fn team_outcomes(matches: &[MatchRecord], team_id: u64) -> Option<OutcomeSummary> {
    let mut counts = [0usize; 3];
    for outcome in matches.iter().filter_map(|m| classify(m, team_id)) {
        counts[outcome.index()] += 1;
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return None;
    }

    let shares = Outcome::ALL.map(|outcome| {
        let count = counts[outcome.index()];
        OutcomeShare {
            outcome,
            count,
            pct: count as f64 / total as f64 * 100.0,
        }
    });
    Some(OutcomeSummary {
        team_id,
        matches: total,
        shares,
    })
}

/// Total-goal distribution over the matches the team played.
pub fn team_goal_histogram(matches: &[MatchRecord], team_id: u64) -> Vec<(u32, usize)> {
    let totals: Vec<u32> = matches
        .iter()
        .filter(|m| m.involves(team_id))
        .map(|m| m.total_goals)
        .collect();
    integer_histogram(&totals)
}
