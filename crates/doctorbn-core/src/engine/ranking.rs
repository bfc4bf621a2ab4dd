//! # Option ranking
//!
//! Enumerates every joint setting of a scenario's targets, treats each setting as
//! extra evidence, asks the oracle for the goal joint, and scores the setting with
//! the directional goal reduction ([`reduce_goals`]). Options come back sorted by
//! score, best first.
//!
//! Combinations are indexed with a mixed-radix number system ([`MixedRadix`]):
//! the first declared target is the most significant digit and the last declared
//! target the least significant, so for state counts `[2, 3]` indices `0..6`
//! decode to `(0,0), (0,1), (0,2), (1,0), (1,1), (1,2)`.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::engine::errors::ExecError;
use crate::engine::oracle::{query_checked, InferenceOracle};
use crate::engine::parallel::try_map_indices;
use crate::engine::reducer::{desired_mass, reduce_goals};
use crate::engine::scenario::{goal_variables, Evidence, Goal, Scenario};
use doctorbn_frontend::Network;

/// Digits of one decoded combination; inline for up to eight targets.
pub type Digits = SmallVec<[usize; 8]>;

/// Configuration for option ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RankingConfig {
    /// Upper bound on the number of target combinations one call may enumerate.
    pub max_combinations: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            max_combinations: 4096,
        }
    }
}

impl RankingConfig {
    pub fn validate(self) -> Result<Self, ExecError> {
        if self.max_combinations == 0 {
            return Err(ExecError::ValidationError(
                "ranking: max_combinations must be > 0".into(),
            ));
        }
        Ok(self)
    }
}

/// Mixed-radix indexing over a product of state spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedRadix {
    cardinalities: Vec<usize>,
    weights: Vec<usize>,
    total: usize,
}

impl MixedRadix {
    /// Radix system for the given per-digit cardinalities (most significant first).
    pub fn new(cardinalities: Vec<usize>) -> Result<Self, ExecError> {
        let mut weights = vec![1usize; cardinalities.len()];
        let mut total = 1usize;
        for (k, &card) in cardinalities.iter().enumerate().rev() {
            if card == 0 {
                return Err(ExecError::ValidationError(format!(
                    "digit {} has no states",
                    k
                )));
            }
            weights[k] = total;
            total = total.checked_mul(card).ok_or_else(|| {
                ExecError::ValidationError("combination space overflows usize".into())
            })?;
        }
        Ok(Self {
            cardinalities,
            weights,
            total,
        })
    }

    /// Number of distinct combinations (1 for zero digits).
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn weights(&self) -> &[usize] {
        &self.weights
    }

    /// Digits of combination `index`, most significant first.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn decode(&self, index: usize) -> Digits {
        assert!(
            index < self.total,
            "combination index {} out of range ({} combinations)",
            index,
            self.total
        );
        let mut rest = index;
        self.weights
            .iter()
            .map(|&weight| {
                let digit = rest / weight;
                rest %= weight;
                digit
            })
            .collect()
    }

    /// Inverse of [`MixedRadix::decode`].
    pub fn encode(&self, digits: &[usize]) -> usize {
        digits
            .iter()
            .zip(&self.weights)
            .map(|(digit, weight)| digit * weight)
            .sum()
    }

    pub fn cardinalities(&self) -> &[usize] {
        &self.cardinalities
    }
}

/// One ranked setting of the decision variables.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OptionRecord {
    /// Target → chosen state.
    pub option: BTreeMap<String, String>,
    /// Directional goal score; higher is better.
    pub value: f64,
    /// Goal → marginal probability of its named state under this option.
    pub goal_values: BTreeMap<String, f64>,
}

/// Score and per-goal diagnostics under one evidence set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GoalEvaluation {
    pub value: f64,
    pub goal_values: BTreeMap<String, f64>,
}

/// Rank every combination of the scenario's target states, best first.
///
/// Any oracle failure aborts the whole ranking. Ties keep generation order.
pub fn rank_options<O: InferenceOracle + ?Sized>(
    scenario: &Scenario,
    oracle: &O,
    config: &RankingConfig,
) -> Result<Vec<OptionRecord>, ExecError> {
    let config = config.validate()?;
    let network = scenario.network();

    let target_states: Vec<&[String]> = scenario
        .targets()
        .iter()
        .map(|t| {
            network
                .states(t)
                .ok_or_else(|| ExecError::UnknownVariable {
                    variable: t.clone(),
                })
        })
        .collect::<Result<_, _>>()?;
    let space = MixedRadix::new(target_states.iter().map(|s| s.len()).collect())?;
    if space.len() > config.max_combinations {
        return Err(ExecError::ValidationError(format!(
            "ranking: {} target combinations exceed the limit of {}",
            space.len(),
            config.max_combinations
        )));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        targets = scenario.targets().len(),
        combinations = space.len(),
        goals = scenario.goals().len(),
        "ranking target combinations"
    );

    let goal_vars = scenario.goal_variables();
    let mut records = try_map_indices(space.len(), |index| {
        let digits = space.decode(index);
        let mut evidence = scenario.evidence().clone();
        let mut option = BTreeMap::new();
        for ((target, states), &digit) in scenario.targets().iter().zip(&target_states).zip(&digits)
        {
            evidence.insert(target.clone(), states[digit].clone());
            option.insert(target.clone(), states[digit].clone());
        }

        let scored = score_goals(network, scenario.goals(), &goal_vars, oracle, &evidence)?;
        Ok(OptionRecord {
            option,
            value: scored.value,
            goal_values: scored.goal_values,
        })
    })?;

    records.sort_by(|a, b| b.value.total_cmp(&a.value));
    Ok(records)
}

/// Score the scenario's goals under its evidence alone, with no target set.
pub fn evaluate_goals<O: InferenceOracle + ?Sized>(
    scenario: &Scenario,
    oracle: &O,
) -> Result<GoalEvaluation, ExecError> {
    score_goals(
        scenario.network(),
        scenario.goals(),
        &scenario.goal_variables(),
        oracle,
        scenario.evidence(),
    )
}

fn score_goals<O: InferenceOracle + ?Sized>(
    network: &Network,
    goals: &[Goal],
    goal_vars: &[String],
    oracle: &O,
    evidence: &Evidence,
) -> Result<GoalEvaluation, ExecError> {
    debug_assert_eq!(goal_vars, goal_variables(goals).as_slice());
    let joint = query_checked(oracle, network, goal_vars, evidence)?;
    let value = reduce_goals(&joint, goals)?;
    let goal_values = goals
        .iter()
        .map(|goal| Ok((goal.variable.clone(), desired_mass(&joint, goal)?)))
        .collect::<Result<_, ExecError>>()?;
    Ok(GoalEvaluation { value, goal_values })
}
