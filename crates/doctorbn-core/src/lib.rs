//! # DoctorBN Core
//!
//! Decision support over discrete Bayesian networks: option ranking, evidence
//! relevance, node summaries and explanations. Posteriors come from a caller
//! supplied [`InferenceOracle`].

pub mod engine;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export commonly used types
pub use doctorbn_frontend::{load_network, Network, NetworkFormat};
pub use engine::config::AdvisorConfig;
pub use engine::errors::ExecError;
pub use engine::explanation::{
    synthesize_explanation, Explanation, ExplanationConfig, ExplanationRequest, Factor,
    GoalContribution, GoalExplanation,
};
pub use engine::nodes::{compute_all_nodes, compute_nodes, NodeRecord};
pub use engine::oracle::InferenceOracle;
pub use engine::ranking::{
    evaluate_goals, rank_options, GoalEvaluation, OptionRecord, RankingConfig,
};
pub use engine::reducer::{marginalize, reduce_goal_step, reduce_goals};
pub use engine::relevance::{score_relevance, GoalInfluence, RelevanceConfig, RelevanceRecord};
pub use engine::scenario::{
    Evidence, Goal, GoalDirection, Scenario, ScenarioBuilder, ScenarioSpec,
};
pub use engine::table::ProbabilityTable;

/// Load a network and convert loader errors to core errors.
pub fn parse_network(source: &str, format: NetworkFormat) -> Result<Network, ExecError> {
    Ok(load_network(source, format)?)
}
