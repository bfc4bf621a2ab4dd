//! Per-variable posterior summaries ("all nodes").

use doctorbn_frontend::Network;

use crate::engine::divergence::jensen_shannon_divergence;
use crate::engine::errors::ExecError;
use crate::engine::oracle::{query_checked, InferenceOracle};
use crate::engine::parallel::try_map_indices;
use crate::engine::scenario::{check_evidence, Evidence, Scenario};

/// Posterior summary of one variable.
///
/// Observed variables carry only their observed state with probability one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRecord {
    pub name: String,
    /// Most probable state under the evidence.
    pub state: String,
    pub probability: f64,
    /// Jensen–Shannon divergence between the posterior and the prior marginal.
    pub divergence: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "stateNames"))]
    pub state_names: Vec<String>,
    pub distribution: Option<Vec<f64>>,
    pub distribution_wo_evidence: Option<Vec<f64>>,
}

impl NodeRecord {
    /// Whether the record was fixed by evidence rather than inferred.
    pub fn is_observed(&self) -> bool {
        self.distribution.is_none()
    }
}

/// Summaries for every variable of the scenario's network, in model order.
pub fn compute_all_nodes<O: InferenceOracle + ?Sized>(
    scenario: &Scenario,
    oracle: &O,
) -> Result<Vec<NodeRecord>, ExecError> {
    compute_nodes(scenario.network(), scenario.evidence(), oracle)
}

/// Summaries for every variable of `network` under `evidence`, in model order.
///
/// Observed variables are not queried. Every other variable costs two marginal
/// queries, one under `evidence` and one under no evidence at all.
pub fn compute_nodes<O: InferenceOracle + ?Sized>(
    network: &Network,
    evidence: &Evidence,
    oracle: &O,
) -> Result<Vec<NodeRecord>, ExecError> {
    check_evidence(network, evidence)?;
    let variables = network.variables();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        variables = variables.len(),
        observed = evidence.len(),
        "computing node posteriors"
    );

    let prior_evidence = Evidence::new();
    try_map_indices(variables.len(), |i| {
        let variable = &variables[i];
        let name = variable.name().to_string();
        let state_names = variable.states().to_vec();

        if let Some(observed) = evidence.get(&name) {
            return Ok(NodeRecord {
                name,
                state: observed.clone(),
                probability: 1.0,
                divergence: None,
                state_names,
                distribution: None,
                distribution_wo_evidence: None,
            });
        }

        let query = [name.clone()];
        let posterior = query_checked(oracle, network, &query, evidence)?
            .values()
            .to_vec();
        let prior = query_checked(oracle, network, &query, &prior_evidence)?
            .values()
            .to_vec();
        let divergence = jensen_shannon_divergence(&posterior, &prior)?;

        let (best, probability) = argmax(&posterior);
        Ok(NodeRecord {
            name,
            state: state_names[best].clone(),
            probability,
            divergence: Some(divergence),
            state_names,
            distribution: Some(posterior),
            distribution_wo_evidence: Some(prior),
        })
    })
}

/// Index and value of the largest entry; the lowest index wins ties.
fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scenario::GoalDirection;
    use crate::testing::{chain_network, EnumerationOracle, RecordingOracle};

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.25, 0.5, 0.25]), (1, 0.5));
        assert_eq!(argmax(&[0.5, 0.5]), (0, 0.5));
    }

    #[test]
    fn chain_posteriors_and_priors() {
        let net = chain_network();
        let evidence = Evidence::from([("B".to_string(), "true".to_string())]);
        let nodes = compute_nodes(&net, &evidence, &EnumerationOracle).expect("nodes");

        assert_eq!(nodes.len(), 2);
        let a = &nodes[0];
        assert_eq!(a.name, "A");
        // P(A = true | B = true) = 0.27 / 0.41
        let posterior = a.distribution.as_ref().expect("posterior");
        assert!((posterior[0] - 0.27 / 0.41).abs() < 1e-12);
        let prior = a.distribution_wo_evidence.as_ref().expect("prior");
        assert!((prior[0] - 0.3).abs() < 1e-12);
        assert_eq!(a.state, "true");
        assert!(a.divergence.expect("divergence") > 0.0);
        assert!(!a.is_observed());

        let b = &nodes[1];
        assert!(b.is_observed());
        assert_eq!(b.state, "true");
        assert_eq!(b.probability, 1.0);
        assert_eq!(b.divergence, None);
        assert_eq!(b.state_names, vec!["true".to_string(), "false".to_string()]);
    }

    #[test]
    fn observed_variables_are_never_queried() {
        let scenario = Scenario::builder(chain_network())
            .evidence("A", "false")
            .goal("B", "true", GoalDirection::Maximize)
            .build()
            .expect("scenario");
        let oracle = RecordingOracle::new(EnumerationOracle);
        compute_all_nodes(&scenario, &oracle).expect("nodes");

        let queries = oracle.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|(vars, _)| vars == &["B".to_string()]));
    }

    #[test]
    fn unobserved_without_evidence_has_zero_divergence() {
        let net = chain_network();
        let nodes = compute_nodes(&net, &Evidence::new(), &EnumerationOracle).expect("nodes");
        for node in nodes {
            assert_eq!(node.divergence, Some(0.0));
            assert_eq!(node.distribution, node.distribution_wo_evidence);
        }
    }
}
