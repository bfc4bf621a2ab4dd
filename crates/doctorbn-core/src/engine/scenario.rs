//! # Scenario context
//!
//! A [`Scenario`] holds the per-request inputs of a decision query: evidence,
//! ordered targets (decision variables), ordered goals with directions, and a
//! shared read-only handle to the network they refer to. It is built through
//! [`ScenarioBuilder`], which validates every name against the network, and is
//! immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use doctorbn_frontend::Network;

use crate::engine::errors::ExecError;

/// Observed facts: variable → observed state.
pub type Evidence = BTreeMap<String, String>;

/// Whether a goal seeks or avoids its named state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GoalDirection {
    /// Drive probability mass toward the desired state.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "max", alias = "maximize"))]
    Maximize,
    /// Drive probability mass away from the named (undesired) state.
    #[cfg_attr(feature = "serde", serde(rename = "min", alias = "minimize"))]
    Minimize,
}

impl GoalDirection {
    /// `+1.0` for MAXIMIZE, `-1.0` for MINIMIZE.
    pub fn sign(self) -> f64 {
        match self {
            Self::Maximize => 1.0,
            Self::Minimize => -1.0,
        }
    }
}

impl fmt::Display for GoalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maximize => write!(f, "max"),
            Self::Minimize => write!(f, "min"),
        }
    }
}

/// An outcome variable with its named state and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Goal {
    pub variable: String,
    pub state: String,
    pub direction: GoalDirection,
}

impl Goal {
    pub fn new(
        variable: impl Into<String>,
        state: impl Into<String>,
        direction: GoalDirection,
    ) -> Self {
        Self {
            variable: variable.into(),
            state: state.into(),
            direction,
        }
    }
}

/// Validated, immutable inputs of one decision query.
#[derive(Debug, Clone)]
pub struct Scenario {
    network: Arc<Network>,
    evidence: Evidence,
    targets: Vec<String>,
    goals: Vec<Goal>,
}

impl Scenario {
    pub fn builder(network: Arc<Network>) -> ScenarioBuilder {
        ScenarioBuilder::new(network)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Shared handle to the network, for building related scenarios.
    pub fn network_handle(&self) -> Arc<Network> {
        Arc::clone(&self.network)
    }

    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Goal variable names in declared order.
    pub fn goal_variables(&self) -> Vec<String> {
        goal_variables(&self.goals)
    }
}

pub(crate) fn goal_variables(goals: &[Goal]) -> Vec<String> {
    goals.iter().map(|g| g.variable.clone()).collect()
}

/// Builder for [`Scenario`]; all checks run in [`ScenarioBuilder::build`].
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    network: Arc<Network>,
    evidence: Vec<(String, String)>,
    targets: Vec<String>,
    goals: Vec<Goal>,
}

impl ScenarioBuilder {
    pub fn new(network: Arc<Network>) -> Self {
        Self {
            network,
            evidence: Vec::new(),
            targets: Vec::new(),
            goals: Vec::new(),
        }
    }

    pub fn evidence(mut self, variable: impl Into<String>, state: impl Into<String>) -> Self {
        self.evidence.push((variable.into(), state.into()));
        self
    }

    pub fn evidences<I, K, V>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.evidence
            .extend(items.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn target(mut self, variable: impl Into<String>) -> Self {
        self.targets.push(variable.into());
        self
    }

    pub fn targets<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn goal(
        mut self,
        variable: impl Into<String>,
        state: impl Into<String>,
        direction: GoalDirection,
    ) -> Self {
        self.goals.push(Goal::new(variable, state, direction));
        self
    }

    pub fn goals(mut self, goals: impl IntoIterator<Item = Goal>) -> Self {
        self.goals.extend(goals);
        self
    }

    pub fn build(self) -> Result<Scenario, ExecError> {
        let network = &self.network;

        let mut evidence = Evidence::new();
        for (variable, state) in self.evidence {
            check_assignment(network, &variable, &state)?;
            if let Some(previous) = evidence.get(&variable) {
                if *previous != state {
                    return Err(ExecError::ValidationError(format!(
                        "evidence for '{}' given as both '{}' and '{}'",
                        variable, previous, state
                    )));
                }
            }
            evidence.insert(variable, state);
        }

        let mut targets: Vec<String> = Vec::with_capacity(self.targets.len());
        for target in self.targets {
            check_variable(network, &target)?;
            if targets.contains(&target) {
                return Err(ExecError::ValidationError(format!(
                    "target '{}' listed twice",
                    target
                )));
            }
            if evidence.contains_key(&target) {
                return Err(ExecError::ValidationError(format!(
                    "target '{}' is already fixed by evidence",
                    target
                )));
            }
            targets.push(target);
        }

        check_goals(network, &self.goals, &evidence)?;
        if let Some(goal) = self.goals.iter().find(|g| targets.contains(&g.variable)) {
            return Err(ExecError::ValidationError(format!(
                "'{}' cannot be both a target and a goal",
                goal.variable
            )));
        }

        Ok(Scenario {
            network: self.network,
            evidence,
            targets,
            goals: self.goals,
        })
    }
}

pub(crate) fn check_variable(network: &Network, variable: &str) -> Result<(), ExecError> {
    if network.contains(variable) {
        Ok(())
    } else {
        Err(ExecError::UnknownVariable {
            variable: variable.to_string(),
        })
    }
}

pub(crate) fn check_assignment(
    network: &Network,
    variable: &str,
    state: &str,
) -> Result<(), ExecError> {
    check_variable(network, variable)?;
    match network.state_index(variable, state) {
        Some(_) => Ok(()),
        None => Err(ExecError::UnknownState {
            variable: variable.to_string(),
            state: state.to_string(),
        }),
    }
}

pub(crate) fn check_evidence(network: &Network, evidence: &Evidence) -> Result<(), ExecError> {
    evidence
        .iter()
        .try_for_each(|(variable, state)| check_assignment(network, variable, state))
}

/// Goals must exist, be unique, and not be fixed by `evidence`.
pub(crate) fn check_goals(
    network: &Network,
    goals: &[Goal],
    evidence: &Evidence,
) -> Result<(), ExecError> {
    if goals.is_empty() {
        return Err(ExecError::ValidationError(
            "at least one goal is required".into(),
        ));
    }
    for (i, goal) in goals.iter().enumerate() {
        check_assignment(network, &goal.variable, &goal.state)?;
        if goals[..i].iter().any(|g| g.variable == goal.variable) {
            return Err(ExecError::ValidationError(format!(
                "goal '{}' listed twice",
                goal.variable
            )));
        }
        if evidence.contains_key(&goal.variable) {
            return Err(ExecError::ValidationError(format!(
                "goal '{}' is already fixed by evidence",
                goal.variable
            )));
        }
    }
    Ok(())
}

/// Request-shaped scenario description, as received from a client.
///
/// Goal directions default to MAXIMIZE when omitted.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ScenarioSpec {
    #[cfg_attr(feature = "serde", serde(alias = "evidences"))]
    pub evidence: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(alias = "target"))]
    pub targets: Vec<String>,
    pub goals: BTreeMap<String, String>,
    pub goal_directions: BTreeMap<String, GoalDirection>,
}

impl ScenarioSpec {
    /// Goals in name order with their directions resolved.
    pub fn goal_list(&self) -> Result<Vec<Goal>, ExecError> {
        if let Some(orphan) = self
            .goal_directions
            .keys()
            .find(|k| !self.goals.contains_key(*k))
        {
            return Err(ExecError::ValidationError(format!(
                "direction given for '{}', which is not a goal",
                orphan
            )));
        }
        Ok(self
            .goals
            .iter()
            .map(|(variable, state)| {
                let direction = self
                    .goal_directions
                    .get(variable)
                    .copied()
                    .unwrap_or_default();
                Goal::new(variable.clone(), state.clone(), direction)
            })
            .collect())
    }

    pub fn into_scenario(self, network: Arc<Network>) -> Result<Scenario, ExecError> {
        let goals = self.goal_list()?;
        Scenario::builder(network)
            .evidences(self.evidence)
            .targets(self.targets)
            .goals(goals)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::chain_network;

    #[test]
    fn build_validates_names_against_network() {
        let net = chain_network();

        let unknown = Scenario::builder(net.clone())
            .goal("C", "true", GoalDirection::Maximize)
            .build();
        assert!(matches!(unknown, Err(ExecError::UnknownVariable { .. })));

        let bad_state = Scenario::builder(net.clone())
            .evidence("A", "maybe")
            .goal("B", "true", GoalDirection::Maximize)
            .build();
        match bad_state {
            Err(ExecError::UnknownState { variable, state }) => {
                assert_eq!(variable, "A");
                assert_eq!(state, "maybe");
            }
            other => panic!("expected UnknownState, got {:?}", other),
        }
    }

    #[test]
    fn build_rejects_overlapping_roles() {
        let net = chain_network();
        let target_is_evidence = Scenario::builder(net.clone())
            .evidence("A", "true")
            .target("A")
            .goal("B", "true", GoalDirection::Maximize)
            .build();
        assert!(matches!(
            target_is_evidence,
            Err(ExecError::ValidationError(_))
        ));

        let goal_is_target = Scenario::builder(net.clone())
            .target("B")
            .goal("B", "true", GoalDirection::Maximize)
            .build();
        assert!(matches!(goal_is_target, Err(ExecError::ValidationError(_))));

        let no_goals = Scenario::builder(net).target("A").build();
        assert!(matches!(no_goals, Err(ExecError::ValidationError(_))));
    }

    #[test]
    fn scenarios_do_not_share_state() {
        let net = chain_network();
        let first = Scenario::builder(net.clone())
            .target("A")
            .goal("B", "true", GoalDirection::Maximize)
            .build()
            .expect("first");
        let second = Scenario::builder(net)
            .goal("B", "false", GoalDirection::Minimize)
            .build()
            .expect("second");

        assert_eq!(first.targets(), &["A".to_string()]);
        assert!(second.targets().is_empty());
        assert_eq!(first.goals()[0].state, "true");
        assert_eq!(second.goals()[0].direction, GoalDirection::Minimize);
    }

    #[test]
    fn spec_defaults_missing_directions_to_maximize() {
        let spec = ScenarioSpec {
            targets: vec!["A".into()],
            goals: BTreeMap::from([("B".to_string(), "true".to_string())]),
            ..ScenarioSpec::default()
        };
        let scenario = spec.into_scenario(chain_network()).expect("scenario");
        assert_eq!(scenario.goals()[0].direction, GoalDirection::Maximize);
    }
}
