//! # BIF parser
//!
//! Parses the Bayesian Interchange Format using the Pest grammar in `bif.pest`.
//!
//! Conditional probabilities may be given as explicit rows keyed by parent states,
//! as a single `table` in the crate's row-major layout (parents outermost, child
//! fastest), or as rows plus a `default` row for the remaining parent
//! configurations. A `property label = "..."` entry inside a variable block sets
//! its display label.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rustc_hash::FxHashMap;

use crate::errors::FrontendError;
use crate::network::{Network, PotentialDecl, VariableDecl};

#[derive(Parser)]
#[grammar = "../bif.pest"]
struct BifParser;

struct ProbabilityBlock {
    child: String,
    parents: Vec<String>,
    table: Option<Vec<f64>>,
    default_row: Option<Vec<f64>>,
    rows: Vec<(Vec<String>, Vec<f64>)>,
}

/// Parses BIF source text into a validated [`Network`].
pub fn parse_bif(source: &str) -> Result<Network, FrontendError> {
    let mut pairs = BifParser::parse(Rule::network, source)
        .map_err(|e| FrontendError::parse(e.to_string()))?;

    let mut name = None;
    let mut variables = Vec::new();
    let mut blocks = Vec::new();

    if let Some(root) = pairs.next() {
        for inner in root.into_inner() {
            match inner.as_rule() {
                Rule::network_decl => {
                    name = inner
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::name)
                        .map(name_text);
                }
                Rule::variable_decl => variables.push(build_variable(inner)?),
                Rule::probability_decl => blocks.push(build_probability(inner)?),
                _ => {}
            }
        }
    }

    let states: FxHashMap<&str, &[String]> = variables
        .iter()
        .map(|v: &VariableDecl| (v.name.as_str(), v.states.as_slice()))
        .collect();
    let potentials = blocks
        .into_iter()
        .map(|block| resolve_potential(block, &states))
        .collect::<Result<Vec<_>, _>>()?;

    Network::from_declarations(name, variables, potentials)
}

fn name_text(pair: Pair<Rule>) -> String {
    match pair.into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::quoted => inner
            .into_inner()
            .next()
            .map(|q| q.as_str().to_string())
            .unwrap_or_default(),
        Some(inner) => inner.as_str().to_string(),
        None => String::new(),
    }
}

fn parse_number(pair: Pair<Rule>) -> Result<f64, FrontendError> {
    pair.as_str()
        .parse::<f64>()
        .map_err(|e| FrontendError::parse(format!("invalid number '{}': {}", pair.as_str(), e)))
}

fn parse_values(pair: Pair<Rule>) -> Result<Vec<f64>, FrontendError> {
    pair.into_inner().map(parse_number).collect()
}

/// Extracts `label` from the raw text of a `property` entry, if it is one.
fn property_label(pair: Pair<Rule>) -> Option<String> {
    let text = pair.into_inner().next()?.as_str().trim();
    let rest = text.strip_prefix("label")?.trim_start();
    let value = rest.strip_prefix('=')?.trim();
    Some(value.trim_matches('"').to_string())
}

fn build_variable(pair: Pair<Rule>) -> Result<VariableDecl, FrontendError> {
    let mut name = String::new();
    let mut states = None;
    let mut label = None;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::name => name = name_text(p),
            Rule::variable_type => {
                let mut declared = None;
                let mut list = Vec::new();
                for t in p.into_inner() {
                    match t.as_rule() {
                        Rule::number => {
                            declared = Some(t.as_str().parse::<usize>().map_err(|e| {
                                FrontendError::parse(format!(
                                    "variable '{}': invalid state count '{}': {}",
                                    name,
                                    t.as_str(),
                                    e
                                ))
                            })?)
                        }
                        Rule::state_list => list = t.into_inner().map(name_text).collect(),
                        _ => {}
                    }
                }
                if declared.is_some_and(|n| n != list.len()) {
                    return Err(FrontendError::invalid(format!(
                        "variable '{}' declares {} states but lists {}",
                        name,
                        declared.unwrap_or_default(),
                        list.len()
                    )));
                }
                states = Some(list);
            }
            Rule::property => {
                if let Some(l) = property_label(p) {
                    label = Some(l);
                }
            }
            _ => {}
        }
    }

    let states = states.ok_or_else(|| {
        FrontendError::parse(format!("variable '{}' has no discrete type", name))
    })?;
    Ok(VariableDecl {
        name,
        states,
        label,
    })
}

fn build_probability(pair: Pair<Rule>) -> Result<ProbabilityBlock, FrontendError> {
    let mut block = ProbabilityBlock {
        child: String::new(),
        parents: Vec::new(),
        table: None,
        default_row: None,
        rows: Vec::new(),
    };

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::name => block.child = name_text(p),
            Rule::parent_list => block.parents = p.into_inner().map(name_text).collect(),
            Rule::table_entry => {
                let values = p.into_inner().next().ok_or_else(|| {
                    FrontendError::parse(format!("empty table for '{}'", block.child))
                })?;
                block.table = Some(parse_values(values)?);
            }
            Rule::default_entry => {
                let values = p.into_inner().next().ok_or_else(|| {
                    FrontendError::parse(format!("empty default row for '{}'", block.child))
                })?;
                block.default_row = Some(parse_values(values)?);
            }
            Rule::row_entry => {
                let mut parts = p.into_inner();
                let key = parts
                    .next()
                    .map(|k| k.into_inner().map(name_text).collect())
                    .unwrap_or_default();
                let values = parts.next().ok_or_else(|| {
                    FrontendError::parse(format!("row without values for '{}'", block.child))
                })?;
                block.rows.push((key, parse_values(values)?));
            }
            _ => {}
        }
    }
    Ok(block)
}

/// Lays explicit rows out in the row-major order `Network` expects.
fn resolve_potential(
    block: ProbabilityBlock,
    states: &FxHashMap<&str, &[String]>,
) -> Result<PotentialDecl, FrontendError> {
    let lookup = |var: &str| -> Result<&[String], FrontendError> {
        states.get(var).copied().ok_or_else(|| {
            FrontendError::invalid(format!(
                "probability block for '{}' references undeclared variable '{}'",
                block.child, var
            ))
        })
    };

    let child_card = lookup(block.child.as_str())?.len();
    let parent_states = block
        .parents
        .iter()
        .map(|p| lookup(p.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(table) = block.table {
        if !block.rows.is_empty() {
            return Err(FrontendError::invalid(format!(
                "probability block for '{}' mixes 'table' with explicit rows",
                block.child
            )));
        }
        return Ok(PotentialDecl {
            child: block.child,
            parents: block.parents,
            values: table,
        });
    }

    let row_count: usize = parent_states.iter().map(|s| s.len()).product();
    let mut rows: Vec<Option<Vec<f64>>> = vec![None; row_count];
    for (key, values) in block.rows {
        if key.len() != parent_states.len() {
            return Err(FrontendError::invalid(format!(
                "row ({}) for '{}' names {} parent states, expected {}",
                key.join(", "),
                block.child,
                key.len(),
                parent_states.len()
            )));
        }
        let mut offset = 0;
        for ((state, options), parent) in key.iter().zip(&parent_states).zip(&block.parents) {
            let s = options.iter().position(|o| o == state).ok_or_else(|| {
                FrontendError::invalid(format!(
                    "row for '{}' uses unknown state '{}' of parent '{}'",
                    block.child, state, parent
                ))
            })?;
            offset = offset * options.len() + s;
        }
        rows[offset] = Some(values);
    }

    let mut values = Vec::with_capacity(row_count * child_card);
    for (offset, row) in rows.into_iter().enumerate() {
        let row = row.or_else(|| block.default_row.clone()).ok_or_else(|| {
            FrontendError::invalid(format!(
                "probability block for '{}' is missing parent configuration #{}",
                block.child, offset
            ))
        })?;
        if row.len() != child_card {
            return Err(FrontendError::invalid(format!(
                "row #{} for '{}' has {} entries, expected {}",
                offset,
                block.child,
                row.len(),
                child_card
            )));
        }
        values.extend(row);
    }

    Ok(PotentialDecl {
        child: block.child,
        parents: block.parents,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASIA_FRAGMENT: &str = r#"
        network "fragment" {
            property software = "test";
        }
        // smoking and cancer
        variable smoke {
            type discrete [ 2 ] { yes, no };
            property label = "Smoker";
        }
        variable lung {
            type discrete [ 2 ] { yes, no };
        }
        probability ( smoke ) {
            table 0.5, 0.5;
        }
        probability ( lung | smoke ) {
            (yes) 0.1, 0.9;
            (no) 0.01, 0.99;
        }
    "#;

    #[test]
    fn parses_variables_rows_and_labels() {
        let net = parse_bif(ASIA_FRAGMENT).expect("parse");
        assert_eq!(net.name(), Some("fragment"));
        assert_eq!(net.len(), 2);
        assert_eq!(net.states("smoke").expect("smoke"), &["yes", "no"]);
        assert_eq!(net.labels().get("smoke").map(String::as_str), Some("Smoker"));
        assert_eq!(
            net.variable("lung").expect("lung").cpt(),
            &[0.1, 0.9, 0.01, 0.99]
        );
    }

    #[test]
    fn rows_are_reordered_by_parent_state() {
        let src = r#"
            variable a { type discrete [ 2 ] { x, y }; }
            variable b { type discrete [ 2 ] { t, f }; }
            probability ( a ) { table 0.4, 0.6; }
            probability ( b | a ) {
                (y) 0.7, 0.3;
                (x) 0.2, 0.8;
            }
        "#;
        let net = parse_bif(src).expect("parse");
        assert_eq!(net.variable("b").expect("b").cpt(), &[0.2, 0.8, 0.7, 0.3]);
    }

    #[test]
    fn default_row_fills_missing_configurations() {
        let src = r#"
            variable a { type discrete [ 3 ] { p, q, r }; }
            variable b { type discrete [ 2 ] { t, f }; }
            probability ( a ) { table 0.2, 0.3, 0.5; }
            probability ( b | a ) {
                (q) 0.9, 0.1;
                default 0.5, 0.5;
            }
        "#;
        let net = parse_bif(src).expect("parse");
        assert_eq!(
            net.variable("b").expect("b").cpt(),
            &[0.5, 0.5, 0.9, 0.1, 0.5, 0.5]
        );
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let err = parse_bif("variable a { type discrete [ 2 ] { x, y } }").expect_err("no ;");
        assert!(matches!(err, FrontendError::ParseError(_)), "got {:?}", err);
    }

    #[test]
    fn state_count_mismatch_is_rejected() {
        let src = r#"
            variable a { type discrete [ 3 ] { x, y }; }
            probability ( a ) { table 0.5, 0.5; }
        "#;
        let err = parse_bif(src).expect_err("count mismatch");
        assert!(matches!(err, FrontendError::ValidationError(_)));
    }
}
