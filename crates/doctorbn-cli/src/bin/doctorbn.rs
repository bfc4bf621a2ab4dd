//! DoctorBN CLI - inspect Bayesian networks and check decision scenarios
//!
//! Usage:
//!   doctorbn <file>                         # Summarize a .bif or .net network
//!   doctorbn <file> -o json                 # Summary as JSON
//!   doctorbn <file> --scenario <json>       # Also validate a scenario against it

use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;
use doctorbn_core::service::{network_summary, NetworkSummary};
use doctorbn_core::{parse_network, AdvisorConfig, NetworkFormat, Scenario, ScenarioSpec};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "doctorbn")]
#[command(version)]
#[command(about = "DoctorBN - decision support over discrete Bayesian networks")]
#[command(long_about = "Load a BIF or Hugin NET network, summarize it and validate scenarios against it")]
struct Cli {
    /// Input network file (.bif or .net)
    #[arg(value_name = "FILE")]
    file: String,

    /// Network format; guessed from the file extension when omitted
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<NetworkFormat>,

    /// Output format: summary or json
    #[arg(short, long, default_value = "summary", value_name = "FORMAT")]
    output: String,

    /// Scenario JSON (evidence, targets, goals, goalDirections) to validate
    #[arg(short, long, value_name = "FILE")]
    scenario: Option<String>,

    /// Advisor configuration JSON; defaults are used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Log engine activity to stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format.or_else(|| guess_format(&cli.file)) {
        Some(f) => f,
        None => {
            eprintln!(
                "Cannot tell the format of '{}'; pass --format bif or --format net",
                cli.file
            );
            process::exit(2);
        }
    };

    let source = read_or_exit(&cli.file);
    let network = match parse_network(&source, format) {
        Ok(n) => Arc::new(n),
        Err(e) => {
            eprintln!("Error loading network: {}", e);
            process::exit(1);
        }
    };
    tracing::info!(variables = network.len(), %format, "network loaded");

    let config = match &cli.config {
        Some(path) => {
            let parsed: AdvisorConfig = parse_json_or_exit(path);
            match parsed.validate() {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Invalid configuration '{}': {}", path, e);
                    process::exit(1);
                }
            }
        }
        None => AdvisorConfig::default(),
    };

    let scenario = cli.scenario.as_ref().map(|path| {
        let spec: ScenarioSpec = parse_json_or_exit(path);
        match spec.into_scenario(network.clone()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Invalid scenario '{}': {}", path, e);
                process::exit(1);
            }
        }
    });

    let summary = network_summary(&network);
    match cli.output.as_str() {
        "json" => {
            let report = serde_json::json!({
                "network": summary,
                "scenario": scenario.as_ref().map(|s| scenario_json(s, &config)),
            });
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing to JSON: {}", e);
                    process::exit(1);
                }
            }
        }
        "summary" => {
            print_summary(&cli.file, &summary);
            if let Some(s) = &scenario {
                print_scenario(s, &config);
            }
        }
        other => {
            eprintln!("Unknown output format '{}'; use summary or json", other);
            process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn guess_format(file: &str) -> Option<NetworkFormat> {
    Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(NetworkFormat::from_extension)
}

fn read_or_exit(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn parse_json_or_exit<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let text = read_or_exit(path);
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error parsing JSON '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn combinations(scenario: &Scenario) -> usize {
    scenario
        .targets()
        .iter()
        .filter_map(|t| scenario.network().states(t))
        .map(|s| s.len())
        .product()
}

fn scenario_json(scenario: &Scenario, config: &AdvisorConfig) -> serde_json::Value {
    serde_json::json!({
        "evidence": scenario.evidence(),
        "targets": scenario.targets(),
        "goals": scenario.goals(),
        "combinations": combinations(scenario),
        "maxCombinations": config.ranking.max_combinations,
    })
}

fn print_summary(file: &str, summary: &NetworkSummary) {
    println!(
        "Network '{}' ({}): {} variables, {} edges",
        summary.name.as_deref().unwrap_or("unnamed"),
        file,
        summary.variables.len(),
        summary.edges.len()
    );
    for variable in &summary.variables {
        let states = summary
            .states
            .get(variable)
            .map(|s| s.join(", "))
            .unwrap_or_default();
        let parents: Vec<&str> = summary
            .edges
            .iter()
            .filter(|(_, child)| child == variable)
            .map(|(parent, _)| parent.as_str())
            .collect();
        match summary.labels.get(variable) {
            Some(label) => println!("  {} \"{}\" {{ {} }}", variable, label, states),
            None => println!("  {} {{ {} }}", variable, states),
        }
        if !parents.is_empty() {
            println!("    parents: {}", parents.join(", "));
        }
    }
}

fn print_scenario(scenario: &Scenario, config: &AdvisorConfig) {
    println!("Scenario OK");
    for (variable, state) in scenario.evidence() {
        println!("  evidence {} = {}", variable, state);
    }
    for goal in scenario.goals() {
        println!("  goal {} {} = {}", goal.direction, goal.variable, goal.state);
    }
    let combos = combinations(scenario);
    println!(
        "  targets: [{}] ({} combinations, limit {})",
        scenario.targets().join(", "),
        combos,
        config.ranking.max_combinations
    );
    if combos > config.ranking.max_combinations {
        println!("  warning: ranking this scenario would exceed the combination limit");
    }
}
