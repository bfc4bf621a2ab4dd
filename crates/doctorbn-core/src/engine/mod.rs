//! The decision-support engine over discrete Bayesian networks.
//!
//! This module provides:
//! - **errors**: Error types for validation and computation failures
//! - **table**: Labeled N-dimensional probability tables
//! - **reducer**: Marginalization and the directional goal reduction
//! - **scenario**: Evidence, targets and goals, validated against a network
//! - **oracle**: The inference seam every posterior comes through
//! - **ranking**: Enumeration and scoring of target settings
//! - **divergence**: KL and Jensen–Shannon divergences
//! - **relevance**: Influence of each observation on the goals
//! - **nodes**: Posterior summaries for every variable
//! - **explanation**: Contributing factors and per-goal verdicts
//! - **config**: Policy thresholds for all of the above

pub mod config;
pub mod divergence;
pub mod errors;
pub mod explanation;
pub mod nodes;
pub mod oracle;
pub(crate) mod parallel;
pub mod ranking;
pub mod reducer;
pub mod relevance;
pub mod scenario;
pub mod table;
