//! Test support: a brute-force inference oracle and small fixture networks.
//!
//! Compiled for unit tests and behind the `test-support` feature, for the
//! integration tests and benches.

use std::sync::{Arc, Mutex};

use doctorbn_frontend::{parse_bif, Network};

use crate::engine::errors::ExecError;
use crate::engine::oracle::InferenceOracle;
use crate::engine::scenario::Evidence;
use crate::engine::table::ProbabilityTable;

/// Largest joint space [`EnumerationOracle`] agrees to walk.
pub const MAX_ENUMERATED_ASSIGNMENTS: usize = 1 << 20;

/// Exact inference by summing the full joint over every unobserved variable.
///
/// Exponential in the number of free variables; meant for small fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerationOracle;

impl InferenceOracle for EnumerationOracle {
    fn query(
        &self,
        network: &Network,
        variables: &[String],
        evidence: &Evidence,
    ) -> Result<ProbabilityTable, ExecError> {
        let vars = network.variables();
        let mut query_idx = Vec::with_capacity(variables.len());
        for (i, name) in variables.iter().enumerate() {
            if variables[..i].contains(name) {
                return Err(ExecError::ValidationError(format!(
                    "variable '{}' queried twice",
                    name
                )));
            }
            let idx = network
                .variable_index(name)
                .ok_or_else(|| ExecError::UnknownVariable {
                    variable: name.clone(),
                })?;
            query_idx.push(idx);
        }

        // `None` marks a free variable.
        let mut fixed: Vec<Option<usize>> = vec![None; vars.len()];
        for (name, state) in evidence {
            let idx = network
                .variable_index(name)
                .ok_or_else(|| ExecError::UnknownVariable {
                    variable: name.clone(),
                })?;
            let s = network
                .state_index(name, state)
                .ok_or_else(|| ExecError::UnknownState {
                    variable: name.clone(),
                    state: state.clone(),
                })?;
            fixed[idx] = Some(s);
        }

        let free: Vec<usize> = (0..vars.len()).filter(|&i| fixed[i].is_none()).collect();
        let space = free.iter().try_fold(1usize, |acc, &i| {
            acc.checked_mul(vars[i].cardinality())
                .filter(|&n| n <= MAX_ENUMERATED_ASSIGNMENTS)
        });
        if space.is_none() {
            return Err(ExecError::Inference(format!(
                "joint space over {} free variables is too large to enumerate",
                free.len()
            )));
        }

        let out_cards: Vec<usize> = query_idx.iter().map(|&i| vars[i].cardinality()).collect();
        let mut out = vec![0.0; out_cards.iter().product()];
        let mut assignment: Vec<usize> = fixed.iter().map(|f| f.unwrap_or(0)).collect();

        loop {
            let weight: f64 = (0..vars.len())
                .map(|v| network.local_probability(v, &assignment))
                .product();
            if weight > 0.0 {
                let cell = query_idx
                    .iter()
                    .zip(&out_cards)
                    .fold(0, |acc, (&v, &card)| acc * card + assignment[v]);
                out[cell] += weight;
            }

            // Odometer step over the free variables, last one fastest.
            let mut carry = true;
            for &v in free.iter().rev() {
                assignment[v] += 1;
                if assignment[v] < vars[v].cardinality() {
                    carry = false;
                    break;
                }
                assignment[v] = 0;
            }
            if carry {
                break;
            }
        }

        let mass: f64 = out.iter().sum();
        if mass <= 0.0 {
            return Err(ExecError::Inference(
                "evidence has zero probability".into(),
            ));
        }
        out.iter_mut().for_each(|p| *p /= mass);

        let axes = query_idx
            .iter()
            .map(|&i| (vars[i].name().to_string(), vars[i].states().to_vec()))
            .collect();
        ProbabilityTable::new(axes, out)
    }
}

/// Wraps an oracle and records every query it answers.
#[derive(Debug, Default)]
pub struct RecordingOracle<O> {
    inner: O,
    log: Mutex<Vec<(Vec<String>, Evidence)>>,
}

impl<O> RecordingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    /// `(variables, evidence)` of every query so far, in arrival order.
    pub fn queries(&self) -> Vec<(Vec<String>, Evidence)> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<O: InferenceOracle> InferenceOracle for RecordingOracle<O> {
    fn query(
        &self,
        network: &Network,
        variables: &[String],
        evidence: &Evidence,
    ) -> Result<ProbabilityTable, ExecError> {
        let entry = (variables.to_vec(), evidence.clone());
        match self.log.lock() {
            Ok(mut log) => log.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        self.inner.query(network, variables, evidence)
    }
}

/// Answers with the inner oracle's table, axes reversed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermutingOracle<O>(pub O);

impl<O: InferenceOracle> InferenceOracle for PermutingOracle<O> {
    fn query(
        &self,
        network: &Network,
        variables: &[String],
        evidence: &Evidence,
    ) -> Result<ProbabilityTable, ExecError> {
        let table = self.0.query(network, variables, evidence)?;
        let order: Vec<usize> = (0..table.rank()).rev().collect();
        Ok(table.permuted(&order))
    }
}

/// `A -> B`, both `{true, false}`.
pub const CHAIN_BIF: &str = r#"
network "chain" { }
variable A { type discrete [ 2 ] { true, false }; }
variable B { type discrete [ 2 ] { true, false }; }
probability ( A ) { table 0.3, 0.7; }
probability ( B | A ) {
    (true) 0.9, 0.1;
    (false) 0.2, 0.8;
}
"#;

/// A small treatment model.
///
/// `Treatment`, `Diet` and `Severity` drive `Recovery`; `Treatment` alone drives
/// `SideEffect`; `Severity` alone drives `Symptom`.
pub const DIAMOND_BIF: &str = r#"
network "treatment" { }
variable Treatment {
    type discrete [ 3 ] { none, drugA, drugB };
    property label = "Prescribed treatment";
}
variable Diet { type discrete [ 2 ] { normal, lowsalt }; }
variable Severity { type discrete [ 2 ] { mild, severe }; }
variable Recovery {
    type discrete [ 2 ] { yes, no };
    property label = "Recovered within 30 days";
}
variable SideEffect { type discrete [ 2 ] { present, absent }; }
variable Symptom { type discrete [ 2 ] { high, low }; }

probability ( Treatment ) { table 0.4, 0.35, 0.25; }
probability ( Diet ) { table 0.6, 0.4; }
probability ( Severity ) { table 0.7, 0.3; }
probability ( Recovery | Treatment, Diet, Severity ) {
    (none, normal, mild) 0.6, 0.4;
    (none, normal, severe) 0.2, 0.8;
    (none, lowsalt, mild) 0.7, 0.3;
    (none, lowsalt, severe) 0.3, 0.7;
    (drugA, normal, mild) 0.85, 0.15;
    (drugA, normal, severe) 0.5, 0.5;
    (drugA, lowsalt, mild) 0.9, 0.1;
    (drugA, lowsalt, severe) 0.6, 0.4;
    (drugB, normal, mild) 0.75, 0.25;
    (drugB, normal, severe) 0.4, 0.6;
    (drugB, lowsalt, mild) 0.8, 0.2;
    (drugB, lowsalt, severe) 0.45, 0.55;
}
probability ( SideEffect | Treatment ) {
    (none) 0.05, 0.95;
    (drugA) 0.3, 0.7;
    (drugB) 0.1, 0.9;
}
probability ( Symptom | Severity ) {
    (mild) 0.2, 0.8;
    (severe) 0.75, 0.25;
}
"#;

fn fixture(source: &str) -> Arc<Network> {
    match parse_bif(source) {
        Ok(network) => Arc::new(network),
        Err(err) => panic!("fixture network does not load: {}", err),
    }
}

pub fn chain_network() -> Arc<Network> {
    fixture(CHAIN_BIF)
}

pub fn diamond_network() -> Arc<Network> {
    fixture(DIAMOND_BIF)
}
