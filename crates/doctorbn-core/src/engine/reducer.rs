//! # Probability table reducer
//!
//! Pure tensor arithmetic over [`ProbabilityTable`]s:
//!
//! - [`marginalize`]: distribution over one axis, summing every other axis out
//! - [`reduce_goal_step`]: consume one goal axis according to its direction
//! - [`reduce_goals`]: explicit fold of [`reduce_goal_step`] over all goals
//!
//! A MAXIMIZE step keeps the slice at the desired state. A MINIMIZE step sums
//! every slice except the desired state, for any number of states. Folding all
//! goal axes of a goal-joint table yields the joint probability of landing in
//! every MAXIMIZE goal's desired state while avoiding every MINIMIZE goal's state.

use crate::engine::errors::ExecError;
use crate::engine::scenario::{Goal, GoalDirection};
use crate::engine::table::ProbabilityTable;

/// Marginal distribution over `keep_axis`.
///
/// The result has one entry per state of `keep_axis` and carries the table's full
/// mass. A rank-1 table comes back unchanged.
///
/// # Panics
///
/// Panics if `keep_axis >= table.rank()`.
pub fn marginalize(table: &ProbabilityTable, keep_axis: usize) -> Vec<f64> {
    assert!(
        keep_axis < table.rank(),
        "marginalize: axis {} out of range for rank-{} table",
        keep_axis,
        table.rank()
    );
    let cards = table.cardinalities();
    let size = cards[keep_axis];
    let inner: usize = cards[keep_axis + 1..].iter().product();

    let mut out = vec![0.0; size];
    for (flat, value) in table.values().iter().enumerate() {
        out[(flat / inner) % size] += value;
    }
    out
}

/// Probability mass of `goal`'s desired state in its marginal.
pub fn desired_mass(table: &ProbabilityTable, goal: &Goal) -> Result<f64, ExecError> {
    let (axis, state) = locate(table, goal)?;
    Ok(marginalize(table, axis)[state])
}

/// Consume `goal`'s axis: select the desired state (MAXIMIZE) or sum every other
/// state (MINIMIZE). The returned table has rank one lower.
pub fn reduce_goal_step(
    table: &ProbabilityTable,
    goal: &Goal,
) -> Result<ProbabilityTable, ExecError> {
    let (axis, state) = locate(table, goal)?;
    Ok(match goal.direction {
        GoalDirection::Maximize => table.select(axis, state),
        GoalDirection::Minimize => table.sum_excluding(axis, state),
    })
}

/// Fold [`reduce_goal_step`] over `goals` in order and return the final scalar.
///
/// Every axis of `table` must belong to exactly one goal.
pub fn reduce_goals(table: &ProbabilityTable, goals: &[Goal]) -> Result<f64, ExecError> {
    let mut current = table.clone();
    for goal in goals {
        current = reduce_goal_step(&current, goal)?;
    }
    current.as_scalar().ok_or_else(|| {
        ExecError::ValidationError(format!(
            "goal reduction left axes [{}] unconsumed",
            current.variables().collect::<Vec<_>>().join(", ")
        ))
    })
}

fn locate(table: &ProbabilityTable, goal: &Goal) -> Result<(usize, usize), ExecError> {
    let axis = table
        .axis_of(&goal.variable)
        .ok_or_else(|| ExecError::UnknownVariable {
            variable: goal.variable.clone(),
        })?;
    let state = table
        .state_index(axis, &goal.state)
        .ok_or_else(|| ExecError::UnknownState {
            variable: goal.variable.clone(),
            state: goal.state.clone(),
        })?;
    Ok((axis, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(name: &str, states: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            states.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// P(X, Y, Z) with X binary, Y ternary, Z binary.
    fn joint_xyz() -> ProbabilityTable {
        let values = vec![
            0.02, 0.08, 0.10, 0.05, 0.03, 0.12, // X = x0
            0.07, 0.13, 0.04, 0.16, 0.09, 0.11, // X = x1
        ];
        ProbabilityTable::new(
            vec![
                axis("X", &["x0", "x1"]),
                axis("Y", &["y0", "y1", "y2"]),
                axis("Z", &["z0", "z1"]),
            ],
            values,
        )
        .expect("joint")
    }

    fn goal(variable: &str, state: &str, direction: GoalDirection) -> Goal {
        Goal::new(variable, state, direction)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn marginalize_each_axis() {
        let t = joint_xyz();
        let x = marginalize(&t, 0);
        assert_close(x[0], 0.40);
        assert_close(x[1], 0.60);

        let y = marginalize(&t, 1);
        assert_eq!(y.len(), 3);
        assert_close(y[0], 0.02 + 0.08 + 0.07 + 0.13);
        assert_close(y[2], 0.03 + 0.12 + 0.09 + 0.11);

        let z = marginalize(&t, 2);
        assert_close(z.iter().sum::<f64>(), 1.0);
        assert_close(z[0], 0.02 + 0.10 + 0.03 + 0.07 + 0.04 + 0.09);
    }

    #[test]
    fn marginalize_rank_one_is_identity() {
        let t = ProbabilityTable::new(vec![axis("A", &["a", "b", "c"])], vec![0.2, 0.5, 0.3])
            .expect("table");
        assert_eq!(marginalize(&t, 0), vec![0.2, 0.5, 0.3]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn marginalize_panics_on_bad_axis() {
        marginalize(&joint_xyz(), 3);
    }

    #[test]
    fn reduce_goals_mixes_directions() {
        let t = joint_xyz();
        // X = x1 (max), Y != y1 (min), Z = z0 (max)
        let goals = [
            goal("X", "x1", GoalDirection::Maximize),
            goal("Y", "y1", GoalDirection::Minimize),
            goal("Z", "z0", GoalDirection::Maximize),
        ];
        let value = reduce_goals(&t, &goals).expect("reduce");
        assert_close(value, 0.07 + 0.09);
    }

    #[test]
    fn reduce_goal_step_drops_one_axis_at_a_time() {
        let t = joint_xyz();
        let step = reduce_goal_step(&t, &goal("Y", "y0", GoalDirection::Minimize)).expect("step");
        assert_eq!(step.rank(), 2);
        assert_eq!(step.variables().collect::<Vec<_>>(), vec!["X", "Z"]);
        assert_close(step.values()[0], 0.10 + 0.03);
    }

    #[test]
    fn reduction_order_does_not_change_the_score() {
        let t = joint_xyz();
        let forward = [
            goal("X", "x0", GoalDirection::Minimize),
            goal("Y", "y2", GoalDirection::Maximize),
            goal("Z", "z1", GoalDirection::Minimize),
        ];
        let mut backward = forward.clone();
        backward.reverse();
        assert_close(
            reduce_goals(&t, &forward).expect("forward"),
            reduce_goals(&t, &backward).expect("backward"),
        );
    }

    #[test]
    fn reduce_goals_rejects_leftover_axes_and_unknown_states() {
        let t = joint_xyz();
        let partial = reduce_goals(&t, &[goal("X", "x0", GoalDirection::Maximize)]);
        assert!(matches!(partial, Err(ExecError::ValidationError(_))));

        let bad_state = reduce_goals(&t, &[goal("X", "x9", GoalDirection::Maximize)]);
        assert!(matches!(bad_state, Err(ExecError::UnknownState { .. })));
    }

    #[test]
    fn desired_mass_reads_marginal() {
        let t = joint_xyz();
        let mass = desired_mass(&t, &goal("X", "x1", GoalDirection::Minimize)).expect("mass");
        assert_close(mass, 0.60);
    }
}
