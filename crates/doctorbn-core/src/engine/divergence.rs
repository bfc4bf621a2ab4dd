//! Divergences between discrete distributions (natural log, `0 · ln 0 = 0`).

use std::f64::consts::LN_2;

use crate::engine::errors::ExecError;

/// Kullback–Leibler divergence `KL(P ‖ Q)`.
///
/// Terms with `p = 0` contribute nothing. A term with `p > 0` and `q = 0` makes the
/// divergence infinite.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<f64, ExecError> {
    check_pair(p, q)?;
    Ok(p.iter()
        .zip(q)
        .filter(|(&pi, _)| pi > 0.0)
        .map(|(&pi, &qi)| {
            if qi > 0.0 {
                pi * (pi / qi).ln()
            } else {
                f64::INFINITY
            }
        })
        .sum())
}

/// Jensen–Shannon divergence `0.5 KL(P ‖ M) + 0.5 KL(Q ‖ M)` with `M = (P + Q) / 2`.
///
/// Symmetric, zero iff `P == Q`, and bounded by `ln 2`.
pub fn jensen_shannon_divergence(p: &[f64], q: &[f64]) -> Result<f64, ExecError> {
    check_pair(p, q)?;
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| 0.5 * (a + b)).collect();
    let js = 0.5 * kl_divergence(p, &m)? + 0.5 * kl_divergence(q, &m)?;
    // Rounding can push the sum a hair outside [0, ln 2].
    Ok(js.clamp(0.0, LN_2))
}

fn check_pair(p: &[f64], q: &[f64]) -> Result<(), ExecError> {
    if p.len() != q.len() {
        return Err(ExecError::ValidationError(format!(
            "divergence between distributions of length {} and {}",
            p.len(),
            q.len()
        )));
    }
    if p.is_empty() {
        return Err(ExecError::ValidationError(
            "divergence of empty distributions".into(),
        ));
    }
    if let Some(bad) = p.iter().chain(q).find(|v| !v.is_finite() || **v < 0.0) {
        return Err(ExecError::Numerical(format!(
            "invalid probability {} in divergence input",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsd_of_identical_distributions_is_zero() {
        let p = [0.2, 0.3, 0.5];
        assert_eq!(jensen_shannon_divergence(&p, &p).expect("jsd"), 0.0);
    }

    #[test]
    fn jsd_is_symmetric() {
        let p = [0.9, 0.1];
        let q = [0.35, 0.65];
        let pq = jensen_shannon_divergence(&p, &q).expect("pq");
        let qp = jensen_shannon_divergence(&q, &p).expect("qp");
        assert!((pq - qp).abs() < 1e-15);
        assert!(pq > 0.0);
    }

    #[test]
    fn jsd_of_disjoint_supports_is_ln_two() {
        let js = jensen_shannon_divergence(&[1.0, 0.0], &[0.0, 1.0]).expect("jsd");
        assert!((js - LN_2).abs() < 1e-12);
    }

    #[test]
    fn kl_is_infinite_off_support() {
        let kl = kl_divergence(&[0.5, 0.5], &[1.0, 0.0]).expect("kl");
        assert!(kl.is_infinite());
        let finite = kl_divergence(&[1.0, 0.0], &[0.5, 0.5]).expect("kl");
        assert!((finite - LN_2).abs() < 1e-15);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(matches!(
            jensen_shannon_divergence(&[1.0], &[0.5, 0.5]),
            Err(ExecError::ValidationError(_))
        ));
    }
}
