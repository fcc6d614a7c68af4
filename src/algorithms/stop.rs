//! Stop criteria for the fitting loop
//!
//! Two independent predicates are evaluated after each iteration: an
//! iteration limit and a no-improvement streak. A third, the quality gate,
//! only applies in concurrent mode and is checked by the orchestrator at the
//! join point.

use crate::algorithms::Status;
use crate::routines::settings::Settings;

/// Encapsulates the stopping predicate and its state
#[derive(Debug, Clone)]
pub struct StopCriteria {
    max_iterations: usize,
    no_improvement_stop_threshold: usize,
    quality_gate_max_rmse: Option<f64>,
    best_rmse: Option<f64>,
    no_improve_count: usize,
}

impl StopCriteria {
    pub fn new(settings: &Settings) -> Self {
        StopCriteria {
            max_iterations: settings.config.max_iterations,
            no_improvement_stop_threshold: settings.config.no_improvement_stop_threshold,
            quality_gate_max_rmse: settings.config.quality_gate_max_rmse,
            best_rmse: None,
            no_improve_count: 0,
        }
    }

    /// Record the pooled RMSE of a completed iteration
    ///
    /// A strictly lower RMSE than the previous best resets the
    /// no-improvement counter; anything else, including a tie, increments
    /// it. The first measurement is always an improvement, since no prior
    /// best exists.
    pub fn observe(&mut self, pooled_rmse: f64) {
        match self.best_rmse {
            Some(best) if pooled_rmse >= best => self.no_improve_count += 1,
            _ => {
                self.best_rmse = Some(pooled_rmse);
                self.no_improve_count = 0;
            }
        }
    }

    /// Evaluate the stopping predicate after iteration `iteration` (0-based)
    pub fn evaluate(&self, iteration: usize) -> Option<Status> {
        if iteration >= self.max_iterations {
            return Some(Status::MaxIterations);
        }
        if self.no_improve_count >= self.no_improvement_stop_threshold {
            return Some(Status::NoImprovement);
        }
        None
    }

    /// Whether the quality gate passes for the given pooled RMSE
    ///
    /// An absent threshold always passes. A configured threshold fails on a
    /// missing pooled fit; the loop must not proceed without one.
    pub fn gate_passes(&self, pooled_rmse: Option<f64>) -> bool {
        match self.quality_gate_max_rmse {
            None => true,
            Some(max_rmse) => pooled_rmse.is_some_and(|rmse| rmse <= max_rmse),
        }
    }

    pub fn best_rmse(&self) -> Option<f64> {
        self.best_rmse
    }

    pub fn no_improve_count(&self) -> usize {
        self.no_improve_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Status;
    use crate::routines::settings::Settings;

    fn criteria(max_iterations: usize, no_improvement: usize) -> StopCriteria {
        let mut settings = Settings::new("data.csv");
        settings.config.max_iterations = max_iterations;
        settings.config.no_improvement_stop_threshold = no_improvement;
        StopCriteria::new(&settings)
    }

    #[test]
    fn halts_at_the_iteration_limit_regardless_of_improvement() {
        let mut criteria = criteria(3, 100);
        for (iteration, rmse) in [5.0, 4.0, 3.0, 2.0].iter().enumerate() {
            criteria.observe(*rmse);
            let stop = criteria.evaluate(iteration);
            if iteration < 3 {
                assert_eq!(stop, None);
            } else {
                assert_eq!(stop, Some(Status::MaxIterations));
            }
        }
    }

    #[test]
    fn halts_after_the_configured_no_improvement_streak() {
        let mut criteria = criteria(100, 2);
        let mut stopped_at = None;
        for (iteration, rmse) in [10.0, 10.0, 10.0].iter().enumerate() {
            criteria.observe(*rmse);
            if criteria.evaluate(iteration).is_some() {
                stopped_at = Some((iteration, criteria.no_improve_count()));
                break;
            }
        }
        // Counter runs 0 -> 1 -> 2; the loop halts on the second repeat
        assert_eq!(stopped_at, Some((2, 2)));
    }

    #[test]
    fn first_measurement_is_always_an_improvement() {
        let mut criteria = criteria(100, 2);
        criteria.observe(42.0);
        assert_eq!(criteria.no_improve_count(), 0);
        assert_eq!(criteria.best_rmse(), Some(42.0));
    }

    #[test]
    fn strict_improvement_resets_the_counter() {
        let mut criteria = criteria(100, 5);
        criteria.observe(10.0);
        criteria.observe(10.0);
        criteria.observe(12.0);
        assert_eq!(criteria.no_improve_count(), 2);
        criteria.observe(9.0);
        assert_eq!(criteria.no_improve_count(), 0);
        assert_eq!(criteria.best_rmse(), Some(9.0));
    }

    #[test]
    fn gate_always_passes_without_a_threshold() {
        let criteria = criteria(3, 2);
        assert!(criteria.gate_passes(Some(1e9)));
        assert!(criteria.gate_passes(None));
    }

    #[test]
    fn gate_compares_against_the_threshold_and_fails_closed() {
        let mut settings = Settings::new("data.csv");
        settings.config.quality_gate_max_rmse = Some(2.0);
        let criteria = StopCriteria::new(&settings);

        assert!(criteria.gate_passes(Some(2.0)));
        assert!(criteria.gate_passes(Some(1.5)));
        assert!(!criteria.gate_passes(Some(2.1)));
        // No pooled fit available: do not proceed
        assert!(!criteria.gate_passes(None));
    }
}
