//! # Probability tables
//!
//! [`ProbabilityTable`] is the N-dimensional array the inference oracle returns:
//! row-major values (last axis fastest), an ordered list of axis variables and,
//! per axis, ordered state names with a name→index map. Axis order is whatever
//! the producer chose; every read goes through the axis metadata.
//!
//! Tables are never modified in place. Slicing operations return new tables.

use rustc_hash::FxHashMap;

use crate::engine::errors::ExecError;

/// Tolerance for "sums to one" checks on oracle output.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
struct Axis {
    variable: String,
    states: Vec<String>,
    index: FxHashMap<String, usize>,
}

/// A dense table of non-negative probabilities over named discrete axes.
#[derive(Debug, Clone)]
pub struct ProbabilityTable {
    axes: Vec<Axis>,
    values: Vec<f64>,
}

impl ProbabilityTable {
    /// Build a table from `(variable, states)` axes and row-major values.
    pub fn new(axes: Vec<(String, Vec<String>)>, values: Vec<f64>) -> Result<Self, ExecError> {
        let mut built: Vec<Axis> = Vec::with_capacity(axes.len());
        for (variable, states) in axes {
            if states.is_empty() {
                return Err(ExecError::ValidationError(format!(
                    "table axis '{}' has no states",
                    variable
                )));
            }
            if built.iter().any(|a| a.variable == variable) {
                return Err(ExecError::ValidationError(format!(
                    "table axis '{}' appears twice",
                    variable
                )));
            }
            let index = states
                .iter()
                .enumerate()
                .map(|(i, s)| (s.clone(), i))
                .collect();
            built.push(Axis {
                variable,
                states,
                index,
            });
        }

        let expected: usize = built.iter().map(|a| a.states.len()).product();
        if values.len() != expected {
            return Err(ExecError::ValidationError(format!(
                "table has {} values but its axes span {}",
                values.len(),
                expected
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(ExecError::Numerical(format!(
                "table contains invalid probability {}",
                bad
            )));
        }

        Ok(Self {
            axes: built,
            values,
        })
    }

    /// A rank-0 table holding one value.
    pub fn scalar(value: f64) -> Self {
        Self {
            axes: Vec::new(),
            values: vec![value],
        }
    }

    pub fn rank(&self) -> usize {
        self.axes.len()
    }

    /// Axis variables in storage order.
    pub fn variables(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.axes.iter().map(|a| a.variable.as_str())
    }

    pub fn variable(&self, axis: usize) -> &str {
        &self.axes[axis].variable
    }

    pub fn states(&self, axis: usize) -> &[String] {
        &self.axes[axis].states
    }

    pub fn cardinality(&self, axis: usize) -> usize {
        self.axes[axis].states.len()
    }

    pub fn cardinalities(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.states.len()).collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn axis_of(&self, variable: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.variable == variable)
    }

    pub fn state_index(&self, axis: usize, state: &str) -> Option<usize> {
        self.axes[axis].index.get(state).copied()
    }

    /// Total probability mass.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// The value of a rank-0 table.
    pub fn as_scalar(&self) -> Option<f64> {
        if self.axes.is_empty() {
            self.values.first().copied()
        } else {
            None
        }
    }

    /// Fails unless the table's mass is one within `tolerance`.
    pub fn check_distribution(&self, tolerance: f64) -> Result<(), ExecError> {
        let total = self.total();
        if (total - 1.0).abs() > tolerance {
            return Err(ExecError::Numerical(format!(
                "table over [{}] sums to {:.9}, expected 1",
                self.variables().collect::<Vec<_>>().join(", "),
                total
            )));
        }
        Ok(())
    }

    /// `(outer, size, inner)` extents around `axis` in row-major order.
    fn extents(&self, axis: usize) -> (usize, usize, usize) {
        let cards = self.cardinalities();
        let outer = cards[..axis].iter().product();
        let inner = cards[axis + 1..].iter().product();
        (outer, cards[axis], inner)
    }

    fn without_axis(&self, axis: usize, values: Vec<f64>) -> Self {
        let mut axes = self.axes.clone();
        axes.remove(axis);
        Self { axes, values }
    }

    /// Slice fixing `axis` to `index`; the axis is dropped.
    ///
    /// Panics if `axis` or `index` is out of range.
    pub fn select(&self, axis: usize, index: usize) -> Self {
        let (outer, size, inner) = self.extents(axis);
        assert!(index < size, "state index {} out of range for axis {}", index, axis);
        let mut values = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let start = (o * size + index) * inner;
            values.extend_from_slice(&self.values[start..start + inner]);
        }
        self.without_axis(axis, values)
    }

    /// Sum of every slice along `axis` except `index`; the axis is dropped.
    ///
    /// Panics if `axis` or `index` is out of range.
    pub fn sum_excluding(&self, axis: usize, index: usize) -> Self {
        let (outer, size, inner) = self.extents(axis);
        assert!(index < size, "state index {} out of range for axis {}", index, axis);
        let mut values = vec![0.0; outer * inner];
        for o in 0..outer {
            for s in (0..size).filter(|&s| s != index) {
                let start = (o * size + s) * inner;
                for (acc, v) in values[o * inner..(o + 1) * inner]
                    .iter_mut()
                    .zip(&self.values[start..start + inner])
                {
                    *acc += v;
                }
            }
        }
        self.without_axis(axis, values)
    }

    /// The same table with axes reordered so that new axis `k` is old axis `order[k]`.
    ///
    /// Panics unless `order` is a permutation of `0..rank`.
    pub fn permuted(&self, order: &[usize]) -> Self {
        let rank = self.rank();
        let mut seen = vec![false; rank];
        assert_eq!(order.len(), rank, "permutation length must equal rank");
        for &o in order {
            assert!(o < rank && !seen[o], "invalid axis permutation {:?}", order);
            seen[o] = true;
        }

        let old_cards = self.cardinalities();
        let mut old_strides = vec![1usize; rank];
        for k in (0..rank.saturating_sub(1)).rev() {
            old_strides[k] = old_strides[k + 1] * old_cards[k + 1];
        }
        let new_cards: Vec<usize> = order.iter().map(|&o| old_cards[o]).collect();

        let mut values = Vec::with_capacity(self.values.len());
        let mut digits = vec![0usize; rank];
        for _ in 0..self.values.len() {
            let offset: usize = digits
                .iter()
                .zip(order)
                .map(|(&d, &o)| d * old_strides[o])
                .sum();
            values.push(self.values[offset]);
            // Odometer increment over the new axis order.
            for k in (0..rank).rev() {
                digits[k] += 1;
                if digits[k] < new_cards[k] {
                    break;
                }
                digits[k] = 0;
            }
        }

        Self {
            axes: order.iter().map(|&o| self.axes[o].clone()).collect(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(name: &str) -> (String, Vec<String>) {
        (name.to_string(), vec!["t".to_string(), "f".to_string()])
    }

    fn table_ab() -> ProbabilityTable {
        // P(A, B): rows A, columns B
        ProbabilityTable::new(vec![binary("A"), binary("B")], vec![0.1, 0.2, 0.3, 0.4])
            .expect("table")
    }

    #[test]
    fn new_rejects_shape_mismatch_and_negative_values() {
        let short = ProbabilityTable::new(vec![binary("A")], vec![1.0]);
        assert!(matches!(short, Err(ExecError::ValidationError(_))));

        let negative = ProbabilityTable::new(vec![binary("A")], vec![1.5, -0.5]);
        assert!(matches!(negative, Err(ExecError::Numerical(_))));

        let duplicate = ProbabilityTable::new(vec![binary("A"), binary("A")], vec![0.25; 4]);
        assert!(matches!(duplicate, Err(ExecError::ValidationError(_))));
    }

    #[test]
    fn select_fixes_axis() {
        let t = table_ab();
        let b_false = t.select(1, 1);
        assert_eq!(b_false.rank(), 1);
        assert_eq!(b_false.variable(0), "A");
        assert_eq!(b_false.values(), &[0.2, 0.4]);

        let a_true = t.select(0, 0);
        assert_eq!(a_true.variable(0), "B");
        assert_eq!(a_true.values(), &[0.1, 0.2]);
    }

    #[test]
    fn sum_excluding_drops_one_state() {
        let three = ProbabilityTable::new(
            vec![
                ("G".to_string(), vec!["lo".into(), "mid".into(), "hi".into()]),
                binary("B"),
            ],
            vec![0.05, 0.15, 0.2, 0.1, 0.3, 0.2],
        )
        .expect("table");
        let not_hi = three.sum_excluding(0, 2);
        assert_eq!(not_hi.variable(0), "B");
        assert!((not_hi.values()[0] - 0.25).abs() < 1e-12);
        assert!((not_hi.values()[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn permuted_transposes_values_and_axes() {
        let t = table_ab().permuted(&[1, 0]);
        assert_eq!(t.variables().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(t.values(), &[0.1, 0.3, 0.2, 0.4]);
        assert_eq!(t.axis_of("A"), Some(1));
    }

    #[test]
    fn scalar_and_distribution_checks() {
        let s = table_ab().select(0, 1).select(0, 0);
        assert_eq!(s.as_scalar(), Some(0.3));
        assert!(table_ab().check_distribution(1e-9).is_ok());
        assert!(ProbabilityTable::scalar(0.5).check_distribution(1e-9).is_err());
    }
}
