//! # Discrete Bayesian network model
//!
//! [`Network`] is the in-memory form of a loaded model: variables in declaration
//! order, each with ordered state names, ordered parents, a conditional probability
//! table and an optional display label.
//!
//! ## CPT layout
//!
//! Each table is stored flat and row-major over `(parent_1, ..., parent_k, child)`,
//! so the child's state index varies fastest and one "row" holds the child
//! distribution for a fixed parent configuration. Every row sums to one within
//! [`ROW_SUM_TOLERANCE`].
//!
//! A `Network` is immutable once built. Interventions produce a new network via
//! [`Network::intervene`].

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::errors::FrontendError;

/// Allowed deviation of a CPT row sum from one.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// A variable as declared by a parser, before its potential is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub states: Vec<String>,
    pub label: Option<String>,
}

/// A potential as declared by a parser: child, ordered parents and the flat table
/// in the layout described in the module docs.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialDecl {
    pub child: String,
    pub parents: Vec<String>,
    pub values: Vec<f64>,
}

/// One discrete random variable of a [`Network`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Variable {
    name: String,
    states: Vec<String>,
    parents: Vec<usize>,
    cpt: Vec<f64>,
    label: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    state_index: FxHashMap<String, usize>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    /// Indices (into [`Network::variables`]) of this variable's parents, in CPT order.
    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    pub fn cpt(&self) -> &[f64] {
        &self.cpt
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.state_index.get(state).copied()
    }
}

/// A validated discrete Bayesian network.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Network {
    name: Option<String>,
    variables: Vec<Variable>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: FxHashMap<String, usize>,
}

impl Network {
    /// Assemble and validate a network from parsed declarations.
    ///
    /// Every variable needs exactly one potential. Parents must be declared, the
    /// parent graph must be acyclic, table sizes must match the state counts and
    /// every row must be a probability distribution.
    pub fn from_declarations(
        name: Option<String>,
        variables: Vec<VariableDecl>,
        potentials: Vec<PotentialDecl>,
    ) -> Result<Self, FrontendError> {
        let mut index = FxHashMap::default();
        for (idx, decl) in variables.iter().enumerate() {
            if decl.states.is_empty() {
                return Err(FrontendError::invalid(format!(
                    "variable '{}' declares no states",
                    decl.name
                )));
            }
            if index.insert(decl.name.clone(), idx).is_some() {
                return Err(FrontendError::invalid(format!(
                    "variable '{}' is declared more than once",
                    decl.name
                )));
            }
        }

        let mut by_child: FxHashMap<String, PotentialDecl> = FxHashMap::default();
        for potential in potentials {
            if !index.contains_key(&potential.child) {
                return Err(FrontendError::invalid(format!(
                    "potential for undeclared variable '{}'",
                    potential.child
                )));
            }
            let child = potential.child.clone();
            if by_child.insert(child.clone(), potential).is_some() {
                return Err(FrontendError::invalid(format!(
                    "variable '{}' has more than one potential",
                    child
                )));
            }
        }

        let mut built = Vec::with_capacity(variables.len());
        for decl in variables {
            let potential = by_child.remove(&decl.name).ok_or_else(|| {
                FrontendError::invalid(format!("variable '{}' has no potential", decl.name))
            })?;

            let mut state_index = FxHashMap::default();
            for (s, state) in decl.states.iter().enumerate() {
                if state_index.insert(state.clone(), s).is_some() {
                    return Err(FrontendError::invalid(format!(
                        "variable '{}' declares state '{}' twice",
                        decl.name, state
                    )));
                }
            }

            let mut parents = Vec::with_capacity(potential.parents.len());
            for parent in &potential.parents {
                let p = *index.get(parent).ok_or_else(|| {
                    FrontendError::invalid(format!(
                        "variable '{}' has undeclared parent '{}'",
                        decl.name, parent
                    ))
                })?;
                if parents.contains(&p) {
                    return Err(FrontendError::invalid(format!(
                        "variable '{}' lists parent '{}' twice",
                        decl.name, parent
                    )));
                }
                parents.push(p);
            }

            built.push(Variable {
                name: decl.name,
                states: decl.states,
                parents,
                cpt: potential.values,
                label: decl.label,
                state_index,
            });
        }

        for variable in &built {
            let expected = variable
                .parents
                .iter()
                .map(|&p| built[p].cardinality())
                .product::<usize>()
                * variable.cardinality();
            if variable.cpt.len() != expected {
                return Err(FrontendError::invalid(format!(
                    "variable '{}' expects {} table entries, found {}",
                    variable.name,
                    expected,
                    variable.cpt.len()
                )));
            }
            check_rows(&variable.name, &variable.cpt, variable.cardinality())?;
        }

        let network = Self {
            name,
            variables: built,
            index,
        };
        network.check_acyclic()?;
        Ok(network)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variable_index(name).map(|idx| &self.variables[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Ordered state names of `name`, if it exists.
    pub fn states(&self, name: &str) -> Option<&[String]> {
        self.variable(name).map(Variable::states)
    }

    /// Index of `state` within `variable`'s state list.
    pub fn state_index(&self, variable: &str, state: &str) -> Option<usize> {
        self.variable(variable)?.state_index(state)
    }

    /// Dependency edges `(parent, child)`, grouped by child in declaration order.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.variables
            .iter()
            .flat_map(|child| {
                child
                    .parents
                    .iter()
                    .map(move |&p| (self.variables[p].name.clone(), child.name.clone()))
            })
            .collect()
    }

    /// Display labels for variables that declare one.
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .filter_map(|v| v.label.as_ref().map(|l| (v.name.clone(), l.clone())))
            .collect()
    }

    /// `P(variable = assignment[variable] | parents = assignment[parents])`.
    ///
    /// `assignment` holds one state index per network variable, in declaration order.
    pub fn local_probability(&self, variable: usize, assignment: &[usize]) -> f64 {
        let var = &self.variables[variable];
        let mut offset = 0;
        for &p in &var.parents {
            offset = offset * self.variables[p].cardinality() + assignment[p];
        }
        var.cpt[offset * var.cardinality() + assignment[variable]]
    }

    /// Graph surgery for `do(variable = state)`.
    ///
    /// Returns a copy in which `variable` has no parents and a point-mass table at
    /// `state`. Every other variable keeps its table; `self` is left untouched.
    pub fn intervene(&self, variable: &str, state: &str) -> Result<Network, FrontendError> {
        let idx = self.variable_index(variable).ok_or_else(|| {
            FrontendError::invalid(format!("cannot intervene on unknown variable '{}'", variable))
        })?;
        let forced = self.variables[idx].state_index(state).ok_or_else(|| {
            FrontendError::invalid(format!(
                "cannot intervene on '{}': unknown state '{}'",
                variable, state
            ))
        })?;

        let mut out = self.clone();
        let target = &mut out.variables[idx];
        target.parents.clear();
        target.cpt = (0..target.cardinality())
            .map(|s| if s == forced { 1.0 } else { 0.0 })
            .collect();
        Ok(out)
    }

    fn check_acyclic(&self) -> Result<(), FrontendError> {
        // Kahn's algorithm over parent -> child edges.
        let n = self.variables.len();
        let mut in_degree: Vec<usize> = self.variables.iter().map(|v| v.parents.len()).collect();
        let mut children = vec![Vec::new(); n];
        for (child, variable) in self.variables.iter().enumerate() {
            for &p in &variable.parents {
                children[p].push(child);
            }
        }

        let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;
        while let Some(node) = ready.pop() {
            visited += 1;
            for &child in &children[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push(child);
                }
            }
        }

        if visited != n {
            let stuck: Vec<&str> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.variables[i].name.as_str())
                .collect();
            return Err(FrontendError::invalid(format!(
                "network contains a cycle through: {}",
                stuck.join(", ")
            )));
        }
        Ok(())
    }
}

fn check_rows(name: &str, cpt: &[f64], cardinality: usize) -> Result<(), FrontendError> {
    if let Some(bad) = cpt.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(FrontendError::invalid(format!(
            "variable '{}' has invalid probability {}",
            name, bad
        )));
    }
    for (row, chunk) in cpt.chunks(cardinality).enumerate() {
        let sum: f64 = chunk.iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(FrontendError::invalid(format!(
                "variable '{}': table row {} sums to {:.9}, expected 1",
                name, row, sum
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, states: &[&str]) -> VariableDecl {
        VariableDecl {
            name: name.into(),
            states: states.iter().map(|s| s.to_string()).collect(),
            label: None,
        }
    }

    fn potential(child: &str, parents: &[&str], values: &[f64]) -> PotentialDecl {
        PotentialDecl {
            child: child.into(),
            parents: parents.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    fn chain() -> Network {
        Network::from_declarations(
            Some("chain".into()),
            vec![decl("A", &["true", "false"]), decl("B", &["true", "false"])],
            vec![
                potential("A", &[], &[0.3, 0.7]),
                potential("B", &["A"], &[0.9, 0.1, 0.2, 0.8]),
            ],
        )
        .expect("chain network")
    }

    #[test]
    fn builds_chain_with_edges_and_lookup() {
        let net = chain();
        assert_eq!(net.len(), 2);
        assert_eq!(net.edges(), vec![("A".to_string(), "B".to_string())]);
        assert_eq!(net.state_index("B", "false"), Some(1));
        assert_eq!(net.state_index("B", "maybe"), None);
        assert!(net.labels().is_empty());
    }

    #[test]
    fn local_probability_reads_row_for_parent_state() {
        let net = chain();
        // A = false (1), B = true (0)
        assert!((net.local_probability(1, &[1, 0]) - 0.2).abs() < 1e-12);
        assert!((net.local_probability(0, &[0, 1]) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn rejects_rows_that_do_not_normalize() {
        let err = Network::from_declarations(
            None,
            vec![decl("A", &["t", "f"])],
            vec![potential("A", &[], &[0.3, 0.6])],
        )
        .expect_err("row sums to 0.9");
        assert!(err.to_string().contains("sums to"), "unexpected: {}", err);
    }

    #[test]
    fn rejects_cycles() {
        let err = Network::from_declarations(
            None,
            vec![decl("A", &["t", "f"]), decl("B", &["t", "f"])],
            vec![
                potential("A", &["B"], &[0.5, 0.5, 0.5, 0.5]),
                potential("B", &["A"], &[0.5, 0.5, 0.5, 0.5]),
            ],
        )
        .expect_err("cycle");
        assert!(err.to_string().contains("cycle"), "unexpected: {}", err);
    }

    #[test]
    fn rejects_wrong_table_size_and_missing_potential() {
        let size = Network::from_declarations(
            None,
            vec![decl("A", &["t", "f"])],
            vec![potential("A", &[], &[1.0])],
        )
        .expect_err("size");
        assert!(size.to_string().contains("table entries"));

        let missing = Network::from_declarations(None, vec![decl("A", &["t", "f"])], vec![])
            .expect_err("missing");
        assert!(missing.to_string().contains("no potential"));
    }

    #[test]
    fn intervene_cuts_parents_without_touching_original() {
        let net = chain();
        let cut = net.intervene("B", "false").expect("intervene");

        assert!(cut.variable("B").expect("B").parents().is_empty());
        assert_eq!(cut.variable("B").expect("B").cpt(), &[0.0, 1.0]);
        assert!(cut.edges().is_empty());

        assert_eq!(net.variable("B").expect("B").parents(), &[0]);
        assert_eq!(net.edges().len(), 1);
    }

    #[test]
    fn intervene_rejects_unknown_state() {
        let err = chain().intervene("A", "maybe").expect_err("unknown state");
        assert!(err.to_string().contains("maybe"));
    }
}
