//! # Evidence relevance
//!
//! Scores how much each observed variable moves the goal distributions. For every
//! evidence variable the goal joint is queried twice, once with the full evidence
//! and once with that variable withheld, and each goal's two marginals are
//! compared with the Jensen–Shannon divergence.
//!
//! `overall_relevance` is the mean of the per-goal divergences in bits
//! (`JSD / ln 2`), so it is zero when withholding the variable changes nothing,
//! grows with every goal's divergence, and stays in `[0, 1]` for binary goals.
//! Each goal also reports a signed `effect`: the change in its named state's
//! probability caused by the observation, negated for MINIMIZE goals so that a
//! positive effect always means "helps the goal".

use std::f64::consts::LN_2;

use doctorbn_frontend::Network;

use crate::engine::divergence::jensen_shannon_divergence;
use crate::engine::errors::ExecError;
use crate::engine::oracle::{query_checked, InferenceOracle};
use crate::engine::parallel::try_map_indices;
use crate::engine::reducer::marginalize;
use crate::engine::scenario::{check_evidence, check_goals, goal_variables, Evidence, Goal};
use crate::engine::table::ProbabilityTable;

/// Configuration for relevance scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RelevanceConfig {
    /// Variables at or above this `overall_relevance` count as material.
    pub relevance_threshold: f64,
    /// Divergences below this are reported as exactly zero.
    pub divergence_floor: f64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.2,
            divergence_floor: 1e-12,
        }
    }
}

impl RelevanceConfig {
    pub fn validate(self) -> Result<Self, ExecError> {
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ExecError::ValidationError(
                "relevance: relevance_threshold must be in [0, 1]".into(),
            ));
        }
        if !self.divergence_floor.is_finite() || self.divergence_floor < 0.0 {
            return Err(ExecError::ValidationError(
                "relevance: divergence_floor must be finite and >= 0".into(),
            ));
        }
        Ok(self)
    }
}

/// Influence of one observation on one goal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoalInfluence {
    pub goal: String,
    /// Jensen–Shannon divergence (nats) between the goal marginals with and
    /// without the observation.
    pub divergence: f64,
    pub probability_with: f64,
    pub probability_without: f64,
    /// Direction-adjusted change of the named state's probability.
    pub effect: f64,
}

/// Relevance of one evidence variable to the goals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelevanceRecord {
    pub node_name: String,
    /// The observed state.
    pub state: String,
    pub overall_relevance: f64,
    pub goal_influences: Vec<GoalInfluence>,
}

/// Score every evidence variable's influence on `goals`, most relevant first
/// (ties by name).
pub fn score_relevance<O: InferenceOracle + ?Sized>(
    network: &Network,
    evidence: &Evidence,
    goals: &[Goal],
    oracle: &O,
    config: &RelevanceConfig,
) -> Result<Vec<RelevanceRecord>, ExecError> {
    let config = config.validate()?;
    check_evidence(network, evidence)?;
    check_goals(network, goals, evidence)?;

    let goal_vars = goal_variables(goals);
    let with_all = query_checked(oracle, network, &goal_vars, evidence)?;
    let candidates: Vec<(&String, &String)> = evidence.iter().collect();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        candidates = candidates.len(),
        goals = goals.len(),
        "scoring evidence relevance"
    );

    let mut records = try_map_indices(candidates.len(), |i| {
        let (variable, state) = candidates[i];
        let mut withheld = evidence.clone();
        withheld.remove(variable);
        let without = query_checked(oracle, network, &goal_vars, &withheld)?;

        let goal_influences = compare_goal_marginals(&with_all, &without, goals, &config)?;
        let overall_relevance = goal_influences
            .iter()
            .map(|g| g.divergence / LN_2)
            .sum::<f64>()
            / goals.len() as f64;

        Ok(RelevanceRecord {
            node_name: variable.clone(),
            state: state.clone(),
            overall_relevance,
            goal_influences,
        })
    })?;

    records.sort_by(|a, b| {
        b.overall_relevance
            .total_cmp(&a.overall_relevance)
            .then_with(|| a.node_name.cmp(&b.node_name))
    });
    Ok(records)
}

fn compare_goal_marginals(
    with: &ProbabilityTable,
    without: &ProbabilityTable,
    goals: &[Goal],
    config: &RelevanceConfig,
) -> Result<Vec<GoalInfluence>, ExecError> {
    goals
        .iter()
        .map(|goal| {
            let (p, p_state) = goal_marginal(with, goal)?;
            let (q, q_state) = goal_marginal(without, goal)?;
            let mut divergence = jensen_shannon_divergence(&p, &q)?;
            if divergence < config.divergence_floor {
                divergence = 0.0;
            }
            Ok(GoalInfluence {
                goal: goal.variable.clone(),
                divergence,
                probability_with: p[p_state],
                probability_without: q[q_state],
                effect: goal.direction.sign() * (p[p_state] - q[q_state]),
            })
        })
        .collect()
}

/// Marginal of `goal` in `table` and the index of its named state.
fn goal_marginal(
    table: &ProbabilityTable,
    goal: &Goal,
) -> Result<(Vec<f64>, usize), ExecError> {
    let axis = table
        .axis_of(&goal.variable)
        .ok_or_else(|| ExecError::UnknownVariable {
            variable: goal.variable.clone(),
        })?;
    let state = table
        .state_index(axis, &goal.state)
        .ok_or_else(|| ExecError::UnknownState {
            variable: goal.variable.clone(),
            state: goal.state.clone(),
        })?;
    Ok((marginalize(table, axis), state))
}
