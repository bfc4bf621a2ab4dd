//! # Hugin NET parser
//!
//! Parses the Hugin `.net` format using the Pest grammar in `net.pest`. Only
//! discrete chance nodes are supported; `continuous`, `decision` and `utility`
//! nodes are rejected.
//!
//! Potential `data` is a nested list whose nesting follows the parent order with
//! the child innermost, which flattens directly into the row-major CPT layout.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::errors::FrontendError;
use crate::network::{Network, PotentialDecl, VariableDecl};

#[derive(Parser)]
#[grammar = "../net.pest"]
struct NetParser;

#[derive(Debug)]
enum Value {
    Text(String),
    Number(f64),
    List(Vec<Value>),
}

impl Value {
    fn flatten_numbers(&self, out: &mut Vec<f64>) -> Result<(), FrontendError> {
        match self {
            Value::Number(n) => out.push(*n),
            Value::List(items) => {
                for item in items {
                    item.flatten_numbers(out)?;
                }
            }
            Value::Text(t) => {
                return Err(FrontendError::invalid(format!(
                    "expected numbers in potential data, found '{}'",
                    t
                )))
            }
        }
        Ok(())
    }
}

/// Parses Hugin NET source text into a validated [`Network`].
pub fn parse_net(source: &str) -> Result<Network, FrontendError> {
    let mut pairs = NetParser::parse(Rule::net_file, source)
        .map_err(|e| FrontendError::parse(e.to_string()))?;

    let mut name = None;
    let mut variables = Vec::new();
    let mut potentials = Vec::new();

    if let Some(root) = pairs.next() {
        for inner in root.into_inner() {
            match inner.as_rule() {
                Rule::net_block => {
                    for (key, value) in attributes(inner)? {
                        if key == "name" {
                            if let Value::Text(text) = value {
                                name = Some(text);
                            }
                        }
                    }
                }
                Rule::node_decl => variables.push(build_node(inner)?),
                Rule::potential_decl => potentials.push(build_potential(inner)?),
                _ => {}
            }
        }
    }

    Network::from_declarations(name, variables, potentials)
}

fn build_value(pair: Pair<Rule>) -> Result<Value, FrontendError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| FrontendError::parse("empty attribute value"))?;
    match inner.as_rule() {
        Rule::string => Ok(Value::Text(
            inner
                .into_inner()
                .next()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        )),
        Rule::number => inner.as_str().parse::<f64>().map(Value::Number).map_err(|e| {
            FrontendError::parse(format!("invalid number '{}': {}", inner.as_str(), e))
        }),
        Rule::list => inner
            .into_inner()
            .map(build_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        _ => Ok(Value::Text(inner.as_str().to_string())),
    }
}

fn attributes(pair: Pair<Rule>) -> Result<Vec<(String, Value)>, FrontendError> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::attribute)
        .map(|attr| {
            let mut parts = attr.into_inner();
            let key = parts
                .next()
                .map(|k| k.as_str().to_string())
                .ok_or_else(|| FrontendError::parse("attribute without name"))?;
            let value = parts
                .next()
                .ok_or_else(|| FrontendError::parse(format!("attribute '{}' without value", key)))
                .and_then(build_value)?;
            Ok((key, value))
        })
        .collect()
}

fn build_node(pair: Pair<Rule>) -> Result<VariableDecl, FrontendError> {
    let mut name = String::new();
    let mut kind = "discrete";
    let mut states = None;
    let mut label = None;

    let span = pair.clone();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::node_kind => kind = p.as_str(),
            Rule::ident => name = p.as_str().to_string(),
            _ => {}
        }
    }
    if kind != "discrete" {
        return Err(FrontendError::invalid(format!(
            "node '{}' is a {} node; only discrete chance nodes are supported",
            name, kind
        )));
    }

    for (key, value) in attributes(span)? {
        match (key.as_str(), value) {
            ("states", Value::List(items)) => {
                let names = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Text(t) => Ok(t),
                        other => Err(FrontendError::invalid(format!(
                            "node '{}': state names must be strings, found {:?}",
                            name, other
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                states = Some(names);
            }
            ("label", Value::Text(text)) if !text.is_empty() => label = Some(text),
            _ => {}
        }
    }

    let states = states
        .ok_or_else(|| FrontendError::invalid(format!("node '{}' has no states", name)))?;
    Ok(VariableDecl {
        name,
        states,
        label,
    })
}

fn build_potential(pair: Pair<Rule>) -> Result<PotentialDecl, FrontendError> {
    let mut child = String::new();
    let mut parents = Vec::new();
    let mut data = None;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::ident => child = p.as_str().to_string(),
            Rule::potential_parents => {
                parents = p.into_inner().map(|i| i.as_str().to_string()).collect()
            }
            Rule::attribute => {
                let mut parts = p.into_inner();
                let is_data = parts.next().is_some_and(|k| k.as_str() == "data");
                if let (true, Some(value)) = (is_data, parts.next()) {
                    let mut values = Vec::new();
                    build_value(value)?.flatten_numbers(&mut values)?;
                    data = Some(values);
                }
            }
            _ => {}
        }
    }

    let values = data.ok_or_else(|| {
        FrontendError::invalid(format!("potential for '{}' has no data", child))
    })?;
    Ok(PotentialDecl {
        child,
        parents,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = r#"
        net
        {
            node_size = (80 40);
            name = "chain";
        }
        % a comment
        node A
        {
            label = "Cause";
            position = (0 0);
            states = ("true" "false");
        }
        discrete node B
        {
            label = "";
            states = ("true" "false");
        }
        potential ( A )
        {
            data = ( 0.3 0.7 );
        }
        potential ( B | A )
        {
            data = (( 0.9 0.1 )   % A = true
                    ( 0.2 0.8 )); % A = false
        }
    "#;

    #[test]
    fn parses_nodes_potentials_and_labels() {
        let net = parse_net(CHAIN).expect("parse");
        assert_eq!(net.name(), Some("chain"));
        assert_eq!(net.states("A").expect("A"), &["true", "false"]);
        assert_eq!(net.labels().len(), 1);
        assert_eq!(net.labels().get("A").map(String::as_str), Some("Cause"));
        assert_eq!(net.variable("B").expect("B").cpt(), &[0.9, 0.1, 0.2, 0.8]);
        assert_eq!(net.edges(), vec![("A".to_string(), "B".to_string())]);
    }

    #[test]
    fn rejects_decision_nodes() {
        let src = r#"
            decision node D { states = ("go" "stay"); }
            potential ( D ) { data = ( 1 0 ); }
        "#;
        let err = parse_net(src).expect_err("decision node");
        assert!(err.to_string().contains("decision"), "unexpected: {}", err);
    }

    #[test]
    fn unbalanced_data_is_a_parse_error() {
        let src = r#"
            node A { states = ("t" "f"); }
            potential ( A ) { data = (( 0.5 0.5 ); }
        "#;
        assert!(matches!(
            parse_net(src).expect_err("unbalanced"),
            FrontendError::ParseError(_)
        ));
    }
}
