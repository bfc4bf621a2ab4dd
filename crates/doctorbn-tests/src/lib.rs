//! Shared fixtures for the DoctorBN integration tests.

use std::sync::Arc;

pub use doctorbn_core::testing::{
    chain_network, diamond_network, EnumerationOracle, PermutingOracle, RecordingOracle,
    CHAIN_BIF, DIAMOND_BIF,
};
use doctorbn_core::{GoalDirection, Network, Scenario};

/// The treatment model of [`DIAMOND_BIF`] in Hugin NET syntax.
pub const DIAMOND_NET: &str = r#"
net
{
    name = "treatment";
}
node Treatment
{
    label = "Prescribed treatment";
    states = ("none" "drugA" "drugB");
}
node Diet { states = ("normal" "lowsalt"); }
node Severity { states = ("mild" "severe"); }
node Recovery
{
    label = "Recovered within 30 days";
    states = ("yes" "no");
}
node SideEffect { states = ("present" "absent"); }
node Symptom { states = ("high" "low"); }

potential ( Treatment ) { data = ( 0.4 0.35 0.25 ); }
potential ( Diet ) { data = ( 0.6 0.4 ); }
potential ( Severity ) { data = ( 0.7 0.3 ); }
potential ( Recovery | Treatment Diet Severity )
{
    data = ((((0.6 0.4) (0.2 0.8))      % none, normal
             ((0.7 0.3) (0.3 0.7)))     % none, lowsalt
            (((0.85 0.15) (0.5 0.5))    % drugA, normal
             ((0.9 0.1) (0.6 0.4)))     % drugA, lowsalt
            (((0.75 0.25) (0.4 0.6))    % drugB, normal
             ((0.8 0.2) (0.45 0.55)))); % drugB, lowsalt
}
potential ( SideEffect | Treatment ) { data = ((0.05 0.95) (0.3 0.7) (0.1 0.9)); }
potential ( Symptom | Severity ) { data = ((0.2 0.8) (0.75 0.25)); }
"#;

/// Treatment and diet choice for recovery without side effects, given a high
/// symptom score.
pub fn treatment_scenario(network: Arc<Network>) -> Scenario {
    match Scenario::builder(network)
        .evidence("Symptom", "high")
        .targets(["Treatment", "Diet"])
        .goal("Recovery", "yes", GoalDirection::Maximize)
        .goal("SideEffect", "present", GoalDirection::Minimize)
        .build()
    {
        Ok(scenario) => scenario,
        Err(err) => panic!("treatment scenario does not validate: {}", err),
    }
}
