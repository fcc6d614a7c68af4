//! The iterative fitting loop
//!
//! Each cycle runs the inspection step, the per-subject fits, the pooled
//! fit, and the paper-insight step, then asks the stop criteria whether to
//! continue. In concurrent mode the insight step runs on its own thread
//! alongside the fitting steps and is joined before the cycle completes.

use crate::algorithms::stop::StopCriteria;
use crate::algorithms::Status;
use crate::data::{Data, Observation};
use crate::insights::{InsightExtractor, InsightPayload};
use crate::routines::optimization::{self, FitResult};
use crate::routines::output::{RunResult, SubjectFit};
use crate::routines::settings::Settings;
use anyhow::Result;
use std::sync::Arc;
use std::thread;

/// Orchestrates repeated fitting over a fixed dataset
///
/// The loop owns all mutable run state. The only write performed on behalf
/// of the background insight task is the merge of its payload at the join
/// point, so no field is ever written by two tasks at once.
pub struct AgentLoop {
    settings: Settings,
    data: Data,
    extractor: Arc<dyn InsightExtractor>,
    criteria: StopCriteria,
    cycle: usize,
    status: Status,
    subject_fits: Vec<SubjectFit>,
    pooled: Option<FitResult>,
    insights: Option<InsightPayload>,
}

impl AgentLoop {
    pub fn new(settings: Settings, data: Data, extractor: Arc<dyn InsightExtractor>) -> Self {
        let criteria = StopCriteria::new(&settings);
        AgentLoop {
            settings,
            data,
            extractor,
            criteria,
            cycle: 0,
            status: Status::Starting,
            subject_fits: Vec::new(),
            pooled: None,
            insights: None,
        }
    }

    /// Run the loop to completion and write the configured outputs
    pub fn fit(mut self) -> Result<RunResult> {
        self.initialize();
        loop {
            let stop = self.next_cycle()?;
            self.cycle += 1;
            if let Some(status) = stop {
                self.status = status;
                break;
            }
        }
        tracing::info!("Run ended: {} after {} cycles", self.status, self.cycle);

        let settings = self.settings.clone();
        let result = self.into_result();
        result.write_outputs(&settings);
        Ok(result)
    }

    fn initialize(&mut self) {
        self.status = Status::InProgress;
        tracing::info!(
            "Fitting {} observations from {} subjects",
            self.data.len(),
            self.data.n_subjects()
        );
    }

    /// Run one iteration; `Some(status)` means the loop is done
    fn next_cycle(&mut self) -> Result<Option<Status>> {
        let span = tracing::info_span!("", "{}", format!("Cycle {}", self.cycle));
        let _enter = span.enter();

        if self.settings.config.concurrency_enabled {
            self.run_cycle_concurrent();
        } else {
            self.inspect();
            self.fit_subjects();
            self.fit_pooled();
            self.read_paper();
        }

        if self.settings.config.output {
            let snapshot = self.snapshot();
            snapshot.write_results(&self.settings);
            snapshot.write_report(&self.settings);
        }

        let pooled_rmse = self.pooled.map(|fit| fit.rmse(self.data.len()));
        if let Some(rmse) = pooled_rmse {
            self.criteria.observe(rmse);
            tracing::debug!(
                "Best pooled RMSE so far: {:?} ({} non-improving cycles)",
                self.criteria.best_rmse(),
                self.criteria.no_improve_count()
            );
        }

        // The gate outranks the regular predicates: once it fails, the run
        // ends no matter what they would decide.
        if self.settings.config.concurrency_enabled && !self.criteria.gate_passes(pooled_rmse) {
            tracing::warn!("Pooled RMSE {:?} failed the quality gate", pooled_rmse);
            return Ok(Some(Status::QualityGate));
        }

        Ok(self.criteria.evaluate(self.cycle))
    }

    /// Concurrent variant of a cycle
    ///
    /// Insight extraction is I/O-bound and independent of the fitting steps,
    /// so it runs on its own thread while they proceed. The join is
    /// unconditional: the cycle does not finish before both tasks have.
    fn run_cycle_concurrent(&mut self) {
        let handle = self.insights.is_none().then(|| {
            let extractor = Arc::clone(&self.extractor);
            thread::spawn(move || extractor.extract())
        });

        self.inspect();
        self.fit_subjects();
        self.fit_pooled();

        if let Some(handle) = handle {
            match handle.join() {
                Ok(outcome) => self.absorb_insights(outcome),
                Err(_) => {
                    tracing::warn!("Insight extraction panicked; continuing without insights")
                }
            }
        }
    }

    /// Inspection step, an extension point for data-quality checks ahead of
    /// fitting; currently only logs a summary
    fn inspect(&self) {
        tracing::debug!("Inspecting {} observations", self.data.len());
    }

    fn fit_subjects(&mut self) {
        let groups = self.data.group_by_subject();
        let mut fits = Vec::with_capacity(groups.len());
        for (subject_id, rows) in groups {
            let fit = optimization::fit(&rows);
            let subject = SubjectFit::new(subject_id, fit, rows.len());
            tracing::debug!(
                "Subject {}: CL={:.3}, V={:.3}, RMSE={:.4}",
                subject.subject_id,
                fit.cl,
                fit.v,
                subject.rmse
            );
            fits.push(subject);
        }
        self.subject_fits = fits;
    }

    fn fit_pooled(&mut self) {
        let rows: Vec<&Observation> = self.data.observations().iter().collect();
        let fit = optimization::fit(&rows);
        tracing::info!(
            "Pooled fit: CL={:.3}, V={:.3}, RMSE={:.4}",
            fit.cl,
            fit.v,
            fit.rmse(rows.len())
        );
        self.pooled = Some(fit);
    }

    /// Sequential insight step, idempotent once a payload is populated
    fn read_paper(&mut self) {
        if self.insights.is_some() {
            return;
        }
        let outcome = self.extractor.extract();
        self.absorb_insights(outcome);
    }

    /// Merge an extraction outcome into the run state
    ///
    /// Failures and empty payloads both degrade to "no insights"; neither is
    /// fatal, and a later cycle may try again.
    fn absorb_insights(&mut self, outcome: Result<InsightPayload>) {
        match outcome {
            Ok(payload) if payload.is_empty() => {
                tracing::debug!("No insights available");
            }
            Ok(payload) => {
                tracing::info!("Extracted {} insight fields", payload.len());
                self.insights = Some(payload);
            }
            Err(e) => {
                tracing::warn!(
                    "Insight extraction failed: {:#}; continuing without insights",
                    e
                );
            }
        }
    }

    fn snapshot(&self) -> RunResult {
        RunResult {
            data: self.data.clone(),
            subject_fits: self.subject_fits.clone(),
            pooled: self.pooled,
            insights: self.insights.clone(),
            cycles: self.cycle,
            status: self.status,
        }
    }

    fn into_result(self) -> RunResult {
        RunResult {
            data: self.data,
            subject_fits: self.subject_fits,
            pooled: self.pooled,
            insights: self.insights,
            cycles: self.cycle,
            status: self.status,
        }
    }
}
