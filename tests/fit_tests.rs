use pkfit::prelude::*;
use pkfit::routines::optimization::{sum_squared_error, CL_RANGE, GRID_POINTS, V_RANGE};

use approx::assert_relative_eq;

/// The fitted grid pair must beat or tie every other grid pair
#[test]
fn fitted_sse_is_minimal_over_the_whole_grid() {
    let obs = Observation::new("A", 1.0, 5.0, 100.0, 0.0, "");
    let rows = vec![&obs];
    let best = fit(&rows);

    for &cl in &logspace(CL_RANGE.0, CL_RANGE.1, GRID_POINTS) {
        for &v in &logspace(V_RANGE.0, V_RANGE.1, GRID_POINTS) {
            let sse = sum_squared_error(&rows, cl, v);
            assert!(
                best.sse <= sse,
                "grid pair (cl={cl}, v={v}) has sse {sse} below the fitted {}",
                best.sse
            );
        }
    }
}

/// The brute-force optimum for a single bolus observation agrees with the
/// residual formula `(5 - (100/v) * exp(-(cl/v) * 1))^2`
#[test]
fn fitted_sse_matches_the_residual_formula() {
    let obs = Observation::new("A", 1.0, 5.0, 100.0, 0.0, "");
    let best = fit(&[&obs]);

    let residual = 5.0 - (100.0 / best.v) * (-(best.cl / best.v) * 1.0).exp();
    assert_relative_eq!(best.sse, residual * residual, max_relative = 1e-12);
}

/// Empty input returns the exact degenerate result
#[test]
fn empty_fit_returns_the_first_grid_pair() {
    let best = fit(&[]);
    assert_eq!(best.sse, 0.0);
    assert_relative_eq!(best.cl, 0.1, max_relative = 1e-12);
    assert_relative_eq!(best.v, 1.0, max_relative = 1e-12);
}

/// Grid search is deterministic: identical input, bit-identical output
#[test]
fn fit_is_deterministic() {
    let observations: Vec<Observation> = (0..10)
        .map(|i| Observation::new("A", i as f64, 10.0 / (i + 1) as f64, 100.0, 2.0, ""))
        .collect();
    let rows: Vec<&Observation> = observations.iter().collect();

    let first = fit(&rows);
    let second = fit(&rows);
    assert_eq!(first.sse.to_bits(), second.sse.to_bits());
    assert_eq!(first.cl.to_bits(), second.cl.to_bits());
    assert_eq!(first.v.to_bits(), second.v.to_bits());
}

/// Increasing V at fixed CL strictly decreases the bolus prediction once V
/// exceeds CL times the observation time, where `(dose/v) * exp(-cl*t/v)`
/// peaks
#[test]
fn bolus_prediction_is_monotone_in_volume() {
    let volumes = [10.0, 20.0, 50.0, 100.0, 300.0];
    for pair in volumes.windows(2) {
        let low = predict(2.0, 100.0, 0.0, 5.0, pair[0]);
        let high = predict(2.0, 100.0, 0.0, 5.0, pair[1]);
        assert!(
            high < low,
            "prediction did not decrease from v={} to v={}",
            pair[0],
            pair[1]
        );
    }
}

/// At time zero a bolus gives dose/V and an infusion gives zero
#[test]
fn time_zero_predictions() {
    for &(cl, v) in &[(0.5, 10.0), (5.0, 50.0), (50.0, 300.0)] {
        assert_relative_eq!(predict(0.0, 100.0, 0.0, cl, v), 100.0 / v);
        assert_eq!(predict(0.0, 100.0, 2.0, cl, v), 0.0);
    }
}
