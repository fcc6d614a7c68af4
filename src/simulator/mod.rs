//! Closed-form simulation of a one-compartment model with IV input and
//! first-order elimination.
//!
//! This is the only structural model in the crate. It is a pure function of
//! the dosing regimen and the two parameters of interest, clearance (CL) and
//! volume of distribution (V), with elimination rate constant `k = CL / V`.

/// Predict the concentration at `time` for a one-compartment IV model.
///
/// A non-positive `infusion_duration` is interpreted as a bolus dose. During
/// an infusion the concentration rises towards steady state, and after the
/// end of infusion it declines mono-exponentially from the concentration
/// reached at the end of infusion.
///
/// Non-positive `cl` or `v` are outside the parameter domain and yield a
/// concentration of `0.0` rather than an error, so that invalid grid points
/// are never competitive during fitting.
pub fn predict(time: f64, dose: f64, infusion_duration: f64, cl: f64, v: f64) -> f64 {
    if cl <= 0.0 || v <= 0.0 {
        return 0.0;
    }
    let k = cl / v;
    if infusion_duration <= 0.0 {
        return (dose / v) * (-k * time).exp();
    }
    let rate = dose / infusion_duration;
    if time <= infusion_duration {
        (rate / cl) * (1.0 - (-k * time).exp())
    } else {
        (rate / cl)
            * (1.0 - (-k * infusion_duration).exp())
            * (-k * (time - infusion_duration)).exp()
    }
}

/// Generate `n` log-spaced values between `min` and `max`, inclusive.
///
/// `n <= 1` degenerates to a single point at `min`.
pub fn logspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![min];
    }
    let log_min = min.log10();
    let step = (max.log10() - log_min) / (n - 1) as f64;
    (0..n)
        .map(|i| 10_f64.powf(log_min + i as f64 * step))
        .collect()
}
