//! Caller-facing operations.
//!
//! Each function is one request: it validates its inputs against the network,
//! runs the engine stages it needs and returns a report that serializes as a
//! whole. Nothing is cached between calls.

use std::borrow::Cow;
use std::collections::BTreeMap;

use doctorbn_frontend::Network;

use crate::engine::config::AdvisorConfig;
use crate::engine::errors::ExecError;
use crate::engine::explanation::{synthesize_explanation, Explanation, ExplanationRequest};
use crate::engine::nodes::{compute_nodes, NodeRecord};
use crate::engine::oracle::InferenceOracle;
use crate::engine::ranking::{evaluate_goals, rank_options, GoalEvaluation, OptionRecord};
use crate::engine::relevance::{score_relevance, RelevanceRecord};
use crate::engine::scenario::{check_evidence, Evidence, Goal, Scenario};

/// Shape of a network: variables in model order, their states, edges and labels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkSummary {
    pub name: Option<String>,
    pub variables: Vec<String>,
    pub states: BTreeMap<String, Vec<String>>,
    /// `(parent, child)` pairs.
    pub edges: Vec<(String, String)>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RankingReport {
    /// Every target setting, best first.
    pub option_results: Vec<OptionRecord>,
    /// Goal scores under the evidence alone.
    pub likely_results: GoalEvaluation,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplanationReport {
    pub relevance: Vec<RelevanceRecord>,
    pub nodes: Vec<NodeRecord>,
    pub explanation: Explanation,
}

pub fn network_summary(network: &Network) -> NetworkSummary {
    NetworkSummary {
        name: network.name().map(str::to_string),
        variables: network
            .variables()
            .iter()
            .map(|v| v.name().to_string())
            .collect(),
        states: network
            .variables()
            .iter()
            .map(|v| (v.name().to_string(), v.states().to_vec()))
            .collect(),
        edges: network.edges(),
        labels: network.labels(),
    }
}

/// Rank the scenario's target settings and score its goals under the evidence alone.
pub fn rank_scenario<O: InferenceOracle + ?Sized>(
    scenario: &Scenario,
    oracle: &O,
    config: &AdvisorConfig,
) -> Result<RankingReport, ExecError> {
    let config = config.validate()?;
    let option_results = rank_options(scenario, oracle, &config.ranking)?;
    let likely_results = evaluate_goals(scenario, oracle)?;
    Ok(RankingReport {
        option_results,
        likely_results,
    })
}

/// Explain why the goals look the way they do once `options` are applied.
///
/// `options` are merged into `evidence`, overriding it where both name a variable.
pub fn explain_options<O: InferenceOracle + ?Sized>(
    network: &Network,
    evidence: &Evidence,
    options: &Evidence,
    goals: &[Goal],
    oracle: &O,
    config: &AdvisorConfig,
) -> Result<ExplanationReport, ExecError> {
    explain_with_interventions(
        network,
        evidence,
        options,
        &Evidence::new(),
        goals,
        oracle,
        config,
    )
}

/// [`explain_options`] with forced settings applied by graph surgery first.
///
/// Node summaries and relevance are computed on the intervened network. The
/// factors are the sufficiently relevant observations, the options and the
/// interventions, each listed once.
pub fn explain_with_interventions<O: InferenceOracle + ?Sized>(
    network: &Network,
    evidence: &Evidence,
    options: &Evidence,
    interventions: &Evidence,
    goals: &[Goal],
    oracle: &O,
    config: &AdvisorConfig,
) -> Result<ExplanationReport, ExecError> {
    let config = config.validate()?;
    check_evidence(network, evidence)?;
    check_evidence(network, options)?;
    check_evidence(network, interventions)?;

    let mut observed = evidence.clone();
    observed.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
    for variable in interventions.keys() {
        if observed.contains_key(variable) {
            return Err(ExecError::ValidationError(format!(
                "'{}' is both observed and intervened on",
                variable
            )));
        }
    }

    let mut surgery = Cow::Borrowed(network);
    for (variable, state) in interventions {
        surgery = Cow::Owned(surgery.intervene(variable, state)?);
    }
    let mut conditioned = observed.clone();
    conditioned.extend(interventions.iter().map(|(k, v)| (k.clone(), v.clone())));

    let nodes = compute_nodes(&surgery, &conditioned, oracle)?;
    let relevance = score_relevance(&surgery, &observed, goals, oracle, &config.relevance)?;

    let mut candidates: Vec<String> = Vec::new();
    let relevant = relevance
        .iter()
        .filter(|r| r.overall_relevance >= config.relevance.relevance_threshold)
        .map(|r| &r.node_name);
    for name in relevant.chain(options.keys()).chain(interventions.keys()) {
        if !candidates.contains(name) {
            candidates.push(name.clone());
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        observed = observed.len(),
        candidates = candidates.len(),
        threshold = config.relevance.relevance_threshold,
        "explaining options"
    );

    let explanation = synthesize_explanation(
        &ExplanationRequest {
            network,
            evidence: &observed,
            interventions,
            goals,
            candidate_nodes: &candidates,
            node_records: &nodes,
        },
        oracle,
        &config.explanation,
    )?;

    Ok(ExplanationReport {
        relevance,
        nodes,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scenario::GoalDirection;
    use crate::testing::{chain_network, diamond_network, EnumerationOracle};

    #[test]
    fn summary_lists_variables_edges_and_labels() {
        let summary = network_summary(&diamond_network());
        assert_eq!(
            summary.variables,
            vec!["Treatment", "Diet", "Severity", "Recovery", "SideEffect", "Symptom"]
        );
        assert_eq!(summary.states["Treatment"], vec!["none", "drugA", "drugB"]);
        assert!(summary
            .edges
            .contains(&("Treatment".to_string(), "Recovery".to_string())));
        assert!(summary
            .edges
            .contains(&("Severity".to_string(), "Symptom".to_string())));
        assert_eq!(
            summary.labels.get("Recovery").map(String::as_str),
            Some("Recovered within 30 days")
        );
    }

    #[test]
    fn rank_scenario_reports_options_and_likely_results() {
        let scenario = Scenario::builder(chain_network())
            .target("A")
            .goal("B", "true", GoalDirection::Maximize)
            .build()
            .expect("scenario");
        let report =
            rank_scenario(&scenario, &EnumerationOracle, &AdvisorConfig::default()).expect("rank");
        assert_eq!(report.option_results.len(), 2);
        assert!((report.likely_results.value - 0.41).abs() < 1e-12);
    }

    #[test]
    fn explain_options_lists_every_option_as_a_factor() {
        let net = diamond_network();
        let evidence = Evidence::from([("Symptom".to_string(), "high".to_string())]);
        let options = Evidence::from([
            ("Treatment".to_string(), "drugA".to_string()),
            ("Diet".to_string(), "lowsalt".to_string()),
        ]);
        let goals = [Goal::new("Recovery", "yes", GoalDirection::Maximize)];
        let report = explain_options(
            &net,
            &evidence,
            &options,
            &goals,
            &EnumerationOracle,
            &AdvisorConfig::default(),
        )
        .expect("explain");

        assert_eq!(report.nodes.len(), net.len());
        assert_eq!(report.relevance.len(), 3);
        for option in options.keys() {
            let factor = report.explanation.factor(option).expect("option factor");
            assert!(!factor.intervened);
        }
        assert_eq!(report.explanation.factor("Treatment").map(|f| f.state.as_str()), Some("drugA"));
    }

    #[test]
    fn interventions_become_factors() {
        let net = diamond_network();
        let interventions = Evidence::from([("Treatment".to_string(), "drugB".to_string())]);
        let goals = [Goal::new("Recovery", "yes", GoalDirection::Maximize)];
        let report = explain_with_interventions(
            &net,
            &Evidence::new(),
            &Evidence::new(),
            &interventions,
            &goals,
            &EnumerationOracle,
            &AdvisorConfig::default(),
        )
        .expect("explain");

        let treatment = report.explanation.factor("Treatment").expect("treatment");
        assert!(treatment.intervened);
        assert!(report.relevance.is_empty());
        let node = report
            .nodes
            .iter()
            .find(|n| n.name == "Treatment")
            .expect("node");
        assert_eq!(node.state, "drugB");
        assert!(node.is_observed());
    }

    #[test]
    fn observed_and_intervened_variable_is_rejected() {
        let net = diamond_network();
        let both = Evidence::from([("Diet".to_string(), "normal".to_string())]);
        let err = explain_with_interventions(
            &net,
            &both,
            &Evidence::new(),
            &both,
            &[Goal::new("Recovery", "yes", GoalDirection::Maximize)],
            &EnumerationOracle,
            &AdvisorConfig::default(),
        )
        .expect_err("conflict");
        assert!(matches!(err, ExecError::ValidationError(_)));
    }
}
