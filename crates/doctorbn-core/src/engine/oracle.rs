//! The inference oracle seam.
//!
//! DoctorBN never computes posteriors itself. Every conditional probability comes
//! from an [`InferenceOracle`], which answers "joint distribution of these
//! variables given this evidence" against a network. Implementations may be
//! arbitrarily expensive; they must be deterministic for a fixed network,
//! variable set and evidence, and safe to call from several threads at once.

use std::sync::Arc;

use doctorbn_frontend::Network;

use crate::engine::errors::ExecError;
use crate::engine::scenario::Evidence;
use crate::engine::table::{ProbabilityTable, NORMALIZATION_TOLERANCE};

/// Answers conditional joint-distribution queries against a network.
pub trait InferenceOracle: Send + Sync {
    /// Joint distribution over `variables` conditioned on `evidence`.
    ///
    /// The returned table has exactly one axis per requested variable, in any
    /// order, and sums to one. Inconsistent (zero-probability) evidence and unknown
    /// variables or states are reported as errors, typically
    /// [`ExecError::Inference`].
    fn query(
        &self,
        network: &Network,
        variables: &[String],
        evidence: &Evidence,
    ) -> Result<ProbabilityTable, ExecError>;
}

impl<T: InferenceOracle + ?Sized> InferenceOracle for &T {
    fn query(
        &self,
        network: &Network,
        variables: &[String],
        evidence: &Evidence,
    ) -> Result<ProbabilityTable, ExecError> {
        (**self).query(network, variables, evidence)
    }
}

impl<T: InferenceOracle + ?Sized> InferenceOracle for Arc<T> {
    fn query(
        &self,
        network: &Network,
        variables: &[String],
        evidence: &Evidence,
    ) -> Result<ProbabilityTable, ExecError> {
        (**self).query(network, variables, evidence)
    }
}

impl<T: InferenceOracle + ?Sized> InferenceOracle for Box<T> {
    fn query(
        &self,
        network: &Network,
        variables: &[String],
        evidence: &Evidence,
    ) -> Result<ProbabilityTable, ExecError> {
        (**self).query(network, variables, evidence)
    }
}

/// Query `oracle` and check that the answer has the requested axes, the network's
/// state lists and unit mass.
pub(crate) fn query_checked<O: InferenceOracle + ?Sized>(
    oracle: &O,
    network: &Network,
    variables: &[String],
    evidence: &Evidence,
) -> Result<ProbabilityTable, ExecError> {
    let table = match oracle.query(network, variables, evidence) {
        Ok(table) => table,
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                variables = ?variables,
                evidence = ?evidence,
                error = %err,
                "oracle query failed"
            );
            return Err(err);
        }
    };

    if table.rank() != variables.len() {
        return Err(ExecError::Internal(format!(
            "oracle returned a rank-{} table for {} variables",
            table.rank(),
            variables.len()
        )));
    }
    for variable in variables {
        let axis = table.axis_of(variable).ok_or_else(|| {
            ExecError::Internal(format!("oracle result is missing axis '{}'", variable))
        })?;
        let expected = network.states(variable).ok_or_else(|| ExecError::UnknownVariable {
            variable: variable.clone(),
        })?;
        if table.states(axis) != expected {
            return Err(ExecError::Internal(format!(
                "oracle result for '{}' has states [{}], network declares [{}]",
                variable,
                table.states(axis).join(", "),
                expected.join(", ")
            )));
        }
    }
    table.check_distribution(NORMALIZATION_TOLERANCE)?;
    Ok(table)
}
