//! Fan-out of independent oracle queries within one call.
//!
//! With the `parallel` feature the work items run on the rayon pool; without it
//! they run in index order. Either way results come back in index order and the
//! first error aborts the whole batch.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::engine::errors::ExecError;

/// Evaluate `f(0..len)` and collect the results in index order.
pub(crate) fn try_map_indices<T, F>(len: usize, f: F) -> Result<Vec<T>, ExecError>
where
    T: Send,
    F: Fn(usize) -> Result<T, ExecError> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..len).into_par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..len).map(f).collect()
    }
}
