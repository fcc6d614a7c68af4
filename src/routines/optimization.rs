//! Exhaustive grid-search estimation of CL and V
//!
//! The optimizer evaluates every pair on a fixed log-spaced grid and keeps
//! the pair with the lowest sum of squared errors. There is no pruning and
//! no early exit; correctness and reproducibility take priority over speed
//! at this grid size (625 candidate pairs).

use crate::data::Observation;
use crate::simulator::{logspace, predict};
use serde::{Deserialize, Serialize};

/// Grid bounds for clearance (L/h)
pub const CL_RANGE: (f64, f64) = (0.1, 50.0);
/// Grid bounds for volume of distribution (L)
pub const V_RANGE: (f64, f64) = (1.0, 300.0);
/// Points per parameter axis
pub const GRID_POINTS: usize = 25;

/// The best grid point found by [fit]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Sum of squared errors at the selected grid point
    pub sse: f64,
    /// Clearance (L/h)
    pub cl: f64,
    /// Volume of distribution (L)
    pub v: f64,
}

impl FitResult {
    /// Root-mean-square error over `n_obs` observations
    ///
    /// RMSE is always derived from the stored SSE, never stored itself.
    pub fn rmse(&self, n_obs: usize) -> f64 {
        (self.sse / n_obs.max(1) as f64).sqrt()
    }
}

/// Sum of squared residuals between observed and predicted concentrations
pub fn sum_squared_error(observations: &[&Observation], cl: f64, v: f64) -> f64 {
    observations
        .iter()
        .map(|obs| {
            let pred = predict(obs.time, obs.dose, obs.infusion_duration, cl, v);
            let residual = obs.conc - pred;
            residual * residual
        })
        .sum()
}

/// Fit CL and V to the observations by exhaustive grid search
///
/// Deterministic for a fixed observation sequence: ties are broken by
/// iteration order, so the first grid pair reaching the minimal SSE wins.
/// An empty observation sequence therefore yields the first grid pair,
/// `(cl = 0.1, v = 1.0)`, with an SSE of zero.
pub fn fit(observations: &[&Observation]) -> FitResult {
    let cl_grid = logspace(CL_RANGE.0, CL_RANGE.1, GRID_POINTS);
    let v_grid = logspace(V_RANGE.0, V_RANGE.1, GRID_POINTS);

    let mut best = FitResult {
        sse: f64::INFINITY,
        cl: 0.0,
        v: 0.0,
    };
    for &cl in &cl_grid {
        for &v in &v_grid {
            let sse = sum_squared_error(observations, cl, v);
            if sse < best.sse {
                best = FitResult { sse, cl, v };
            }
        }
    }
    best
}
