//! # Explanation synthesis
//!
//! Turns a scenario into a ranked list of contributing factors and a per-goal
//! verdict. A factor is a candidate variable in a concrete state (its observed
//! or forced state, otherwise its most probable posterior state). Its
//! contribution to a goal is the change in the goal's named-state probability
//! between conditioning on the factor and leaving it out:
//!
//! ```text
//! contribution = sign(direction) · (P(desired | E ∪ {v}) − P(desired | E ∖ {v}))
//! ```
//!
//! Interventions are applied by graph surgery ([`Network::intervene`]) on a
//! private copy of the network. An intervened candidate is compared against the
//! network with every other intervention applied but its own left out, since
//! removing it from the evidence alone would still leave the forced CPT behind.

use std::borrow::Cow;
use std::cmp::Ordering;

use doctorbn_frontend::Network;

use crate::engine::errors::ExecError;
use crate::engine::nodes::NodeRecord;
use crate::engine::oracle::{query_checked, InferenceOracle};
use crate::engine::parallel::try_map_indices;
use crate::engine::reducer::desired_mass;
use crate::engine::scenario::{
    check_assignment, check_evidence, check_goals, goal_variables, Evidence, Goal, GoalDirection,
};

/// Configuration for explanation synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExplanationConfig {
    /// A MAXIMIZE goal is achieved at or above this probability, a MINIMIZE goal
    /// at or below its complement.
    pub achievement_threshold: f64,
    /// Contributions smaller than this in magnitude count as neutral.
    pub contribution_epsilon: f64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            achievement_threshold: 0.5,
            contribution_epsilon: 1e-9,
        }
    }
}

impl ExplanationConfig {
    pub fn validate(self) -> Result<Self, ExecError> {
        if !(0.0..=1.0).contains(&self.achievement_threshold) {
            return Err(ExecError::ValidationError(
                "explanation: achievement_threshold must be in [0, 1]".into(),
            ));
        }
        if !self.contribution_epsilon.is_finite() || self.contribution_epsilon < 0.0 {
            return Err(ExecError::ValidationError(
                "explanation: contribution_epsilon must be finite and >= 0".into(),
            ));
        }
        Ok(self)
    }
}

/// Inputs of [`synthesize_explanation`].
#[derive(Debug, Clone, Copy)]
pub struct ExplanationRequest<'a> {
    pub network: &'a Network,
    pub evidence: &'a Evidence,
    /// Forced settings (do-operator), applied before conditioning.
    pub interventions: &'a Evidence,
    pub goals: &'a [Goal],
    pub candidate_nodes: &'a [String],
    /// Posterior summaries used to pick the state of unobserved candidates.
    pub node_records: &'a [NodeRecord],
}

/// One goal's share of a factor's contribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoalContribution {
    pub goal: String,
    pub contribution: f64,
}

/// A candidate variable in a concrete state and its effect on the goals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Factor {
    pub node_name: String,
    pub state: String,
    pub intervened: bool,
    /// Sum of the per-goal contributions; positive helps the goals.
    pub contribution: f64,
    pub per_goal: Vec<GoalContribution>,
}

/// Verdict for one goal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoalExplanation {
    pub goal: String,
    pub desired_state: String,
    pub direction: GoalDirection,
    /// Probability of `desired_state` under the evidence and interventions.
    pub probability: f64,
    pub achieved: bool,
    /// Factors that help this goal, strongest first.
    pub supporting: Vec<String>,
    /// Factors that hurt this goal, strongest first.
    pub opposing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Explanation {
    pub factors: Vec<Factor>,
    pub goals: Vec<GoalExplanation>,
}

impl Explanation {
    pub fn factor(&self, node_name: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.node_name == node_name)
    }
}

/// Build the explanation for `request`.
///
/// Every candidate appears exactly once among the factors, ordered by the
/// magnitude of its total contribution (ties by name).
pub fn synthesize_explanation<O: InferenceOracle + ?Sized>(
    request: &ExplanationRequest<'_>,
    oracle: &O,
    config: &ExplanationConfig,
) -> Result<Explanation, ExecError> {
    let config = config.validate()?;
    let network = request.network;
    check_evidence(network, request.evidence)?;
    check_evidence(network, request.interventions)?;

    let mut working = request.evidence.clone();
    working.extend(
        request
            .interventions
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    check_goals(network, request.goals, &working)?;

    let intervened = apply_interventions(network, request.interventions, None)?;
    let candidates = resolve_candidates(request, &working)?;
    let goal_vars = goal_variables(request.goals);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        candidates = candidates.len(),
        interventions = request.interventions.len(),
        goals = request.goals.len(),
        "synthesizing explanation"
    );

    let current = query_checked(oracle, &intervened, &goal_vars, &working)?;

    let mut factors = try_map_indices(candidates.len(), |i| {
        let (name, state) = &candidates[i];
        let is_intervened = request.interventions.contains_key(name);

        let mut with = working.clone();
        with.insert(name.clone(), state.clone());
        let mut without = working.clone();
        without.remove(name);

        let baseline = if is_intervened {
            apply_interventions(network, request.interventions, Some(name.as_str()))?
        } else {
            Cow::Borrowed(&*intervened)
        };

        let p_with = query_checked(oracle, &intervened, &goal_vars, &with)?;
        let p_without = query_checked(oracle, &baseline, &goal_vars, &without)?;

        let per_goal = request
            .goals
            .iter()
            .map(|goal| {
                let delta = desired_mass(&p_with, goal)? - desired_mass(&p_without, goal)?;
                Ok(GoalContribution {
                    goal: goal.variable.clone(),
                    contribution: flush(goal.direction.sign() * delta, config.contribution_epsilon),
                })
            })
            .collect::<Result<Vec<_>, ExecError>>()?;
        let contribution = flush(
            per_goal.iter().map(|g| g.contribution).sum(),
            config.contribution_epsilon,
        );

        Ok(Factor {
            node_name: name.clone(),
            state: state.clone(),
            intervened: is_intervened,
            contribution,
            per_goal,
        })
    })?;

    factors.sort_by(|a, b| by_magnitude(a.contribution, b.contribution, &a.node_name, &b.node_name));

    let goals = request
        .goals
        .iter()
        .enumerate()
        .map(|(g, goal)| {
            let probability = desired_mass(&current, goal)?;
            let achieved = match goal.direction {
                GoalDirection::Maximize => probability >= config.achievement_threshold,
                GoalDirection::Minimize => probability <= 1.0 - config.achievement_threshold,
            };

            let mut ranked: Vec<(&str, f64)> = factors
                .iter()
                .map(|f| (f.node_name.as_str(), f.per_goal[g].contribution))
                .collect();
            ranked.sort_by(|a, b| by_magnitude(a.1, b.1, a.0, b.0));
            let supporting = ranked
                .iter()
                .filter(|(_, c)| *c > 0.0)
                .map(|(n, _)| n.to_string())
                .collect();
            let opposing = ranked
                .iter()
                .filter(|(_, c)| *c < 0.0)
                .map(|(n, _)| n.to_string())
                .collect();

            Ok(GoalExplanation {
                goal: goal.variable.clone(),
                desired_state: goal.state.clone(),
                direction: goal.direction,
                probability,
                achieved,
                supporting,
                opposing,
            })
        })
        .collect::<Result<Vec<_>, ExecError>>()?;

    Ok(Explanation { factors, goals })
}

/// `network` with every intervention applied except `skip`.
fn apply_interventions<'n>(
    network: &'n Network,
    interventions: &Evidence,
    skip: Option<&str>,
) -> Result<Cow<'n, Network>, ExecError> {
    let mut out = Cow::Borrowed(network);
    for (variable, state) in interventions {
        if Some(variable.as_str()) == skip {
            continue;
        }
        out = Cow::Owned(out.intervene(variable, state)?);
    }
    Ok(out)
}

/// Pair each candidate with the state it is explained in.
fn resolve_candidates(
    request: &ExplanationRequest<'_>,
    working: &Evidence,
) -> Result<Vec<(String, String)>, ExecError> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(request.candidate_nodes.len());
    for name in request.candidate_nodes {
        if out.iter().any(|(n, _)| n == name) {
            return Err(ExecError::ValidationError(format!(
                "candidate '{}' listed twice",
                name
            )));
        }
        if request.goals.iter().any(|g| &g.variable == name) {
            return Err(ExecError::ValidationError(format!(
                "goal '{}' cannot explain itself",
                name
            )));
        }
        let state = match working.get(name) {
            Some(state) => state.clone(),
            None => request
                .node_records
                .iter()
                .find(|r| &r.name == name)
                .map(|r| r.state.clone())
                .ok_or_else(|| {
                    ExecError::ValidationError(format!(
                        "candidate '{}' is neither observed nor summarized",
                        name
                    ))
                })?,
        };
        check_assignment(request.network, name, &state)?;
        out.push((name.clone(), state));
    }
    Ok(out)
}

fn flush(value: f64, epsilon: f64) -> f64 {
    if value.abs() < epsilon {
        0.0
    } else {
        value
    }
}

fn by_magnitude(a: f64, b: f64, a_name: &str, b_name: &str) -> Ordering {
    b.abs().total_cmp(&a.abs()).then_with(|| a_name.cmp(b_name))
}
