use crate::algorithms::Status;
use crate::data::{parse, Data};
use crate::insights::InsightPayload;
use crate::routines::optimization::FitResult;
use crate::routines::settings::Settings;
use crate::simulator::predict;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Per-subject fit summary, one row of `results.csv`
#[derive(Debug, Clone)]
pub struct SubjectFit {
    pub subject_id: String,
    pub fit: FitResult,
    /// RMSE over this subject's observations, derived from the fit's SSE
    pub rmse: f64,
    pub n_obs: usize,
}

impl SubjectFit {
    pub fn new(subject_id: impl Into<String>, fit: FitResult, n_obs: usize) -> Self {
        SubjectFit {
            subject_id: subject_id.into(),
            rmse: fit.rmse(n_obs),
            fit,
            n_obs,
        }
    }
}

/// Defines the result object from a fitting run
///
/// A [RunResult] contains everything the reporting side needs: the data, the
/// per-subject and pooled fits, the optional paper-derived insights, and how
/// the loop ended.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub data: Data,
    pub subject_fits: Vec<SubjectFit>,
    pub pooled: Option<FitResult>,
    pub insights: Option<InsightPayload>,
    pub cycles: usize,
    pub status: Status,
}

impl RunResult {
    /// Pooled RMSE over all observations, if a pooled fit exists
    pub fn pooled_rmse(&self) -> Option<f64> {
        self.pooled.map(|fit| fit.rmse(self.data.len()))
    }

    pub fn write_outputs(&self, settings: &Settings) {
        if settings.config.output {
            self.write_results(settings);
            self.write_report(settings);
            self.write_residuals(settings);
            self.write_meta(settings);
        }
    }

    /// Writes `results.csv` with the per-subject fits
    pub fn write_results(&self, settings: &Settings) {
        let result = (|| -> Result<()> {
            let file = File::create(output_path(settings, "results.csv")?)?;
            let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

            writer.write_record(["subject_id", "cl", "v", "rmse", "n_obs"])?;
            for subject in &self.subject_fits {
                writer.write_record(&[
                    subject.subject_id.clone(),
                    subject.fit.cl.to_string(),
                    subject.fit.v.to_string(),
                    subject.rmse.to_string(),
                    subject.n_obs.to_string(),
                ])?;
            }
            writer.flush()?;
            Ok(())
        })();

        if let Err(e) = result {
            tracing::error!("Error while writing results: {}", e);
        }
    }

    /// Writes `report.md`, a short markdown summary of the run
    pub fn write_report(&self, settings: &Settings) {
        let result = (|| -> Result<()> {
            let metadata = settings
                .paths
                .metadata
                .as_ref()
                .map(parse::read_metadata)
                .unwrap_or_default();

            let mut report = String::new();
            writeln!(report, "# PK grid-search fitting report")?;
            writeln!(report)?;
            writeln!(
                report,
                "Generated {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            )?;
            writeln!(report)?;

            writeln!(report, "## Data summary")?;
            writeln!(report, "- Subjects: {}", self.data.n_subjects())?;
            writeln!(report, "- Observations: {}", self.data.len())?;
            if let Some((first, last)) = self.data.time_range() {
                writeln!(report, "- Time range (h): {} to {}", first, last)?;
            }
            writeln!(report, "- Doses (mg): {}", join(&self.data.doses()))?;
            writeln!(
                report,
                "- Infusion durations (h): {}",
                join(&self.data.infusion_durations())
            )?;
            if !metadata.is_empty() {
                writeln!(
                    report,
                    "- Units: time={}, conc={}",
                    metadata
                        .get("time_unit")
                        .and_then(|v| v.as_str())
                        .unwrap_or("?"),
                    metadata
                        .get("conc_unit")
                        .and_then(|v| v.as_str())
                        .unwrap_or("?"),
                )?;
            }
            writeln!(report)?;

            writeln!(report, "## Model")?;
            writeln!(
                report,
                "- One-compartment IV infusion with first-order elimination"
            )?;
            writeln!(report, "- Parameters: CL, V, k = CL/V")?;
            writeln!(report)?;

            writeln!(report, "## Results (grid search)")?;
            writeln!(report, "- Run ended: {} after {} cycles", self.status, self.cycles)?;
            if let (Some(pooled), Some(rmse)) = (self.pooled, self.pooled_rmse()) {
                writeln!(
                    report,
                    "- Pooled fit: CL={:.3}, V={:.3}, RMSE={:.3}",
                    pooled.cl, pooled.v, rmse
                )?;
            }
            writeln!(report, "- Best individual fits (lowest RMSE):")?;
            let mut best = self.subject_fits.clone();
            best.sort_by(|a, b| {
                a.rmse
                    .partial_cmp(&b.rmse)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            for subject in best.iter().take(5) {
                writeln!(
                    report,
                    "  - Subject {}: CL={:.3}, V={:.3}, RMSE={:.3}",
                    subject.subject_id, subject.fit.cl, subject.fit.v, subject.rmse
                )?;
            }
            writeln!(report)?;

            writeln!(report, "## Limitations")?;
            writeln!(report, "- No population model (no mixed effects)")?;
            writeln!(report, "- Coarse grid search only (no CI, no diagnostics)")?;
            writeln!(report, "- No plots")?;

            if let Some(insights) = &self.insights {
                writeln!(report)?;
                writeln!(report, "## Paper-derived model notes")?;
                let mut keys: Vec<&String> = insights.keys().collect();
                keys.sort();
                for key in keys {
                    writeln!(report, "- {}: {}", key, insights[key])?;
                }
            }

            std::fs::write(output_path(settings, "report.md")?, report)?;
            Ok(())
        })();

        if let Err(e) = result {
            tracing::error!("Error while writing report: {}", e);
        }
    }

    /// Writes `residuals.csv` with per-observation predictions under each
    /// subject's fitted parameters
    pub fn write_residuals(&self, settings: &Settings) {
        let result = (|| -> Result<()> {
            let fits: HashMap<&str, FitResult> = self
                .subject_fits
                .iter()
                .map(|subject| (subject.subject_id.as_str(), subject.fit))
                .collect();

            let file = File::create(output_path(settings, "residuals.csv")?)?;
            let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
            writer.write_record(["subject_id", "time_h", "conc_obs", "conc_pred", "residual"])?;
            for obs in self.data.observations() {
                let Some(fit) = fits.get(obs.subject_id.as_str()) else {
                    continue;
                };
                let pred = predict(obs.time, obs.dose, obs.infusion_duration, fit.cl, fit.v);
                writer.write_record(&[
                    obs.subject_id.clone(),
                    obs.time.to_string(),
                    obs.conc.to_string(),
                    pred.to_string(),
                    (obs.conc - pred).to_string(),
                ])?;
            }
            writer.flush()?;
            Ok(())
        })();

        if let Err(e) = result {
            tracing::error!("Error while writing residuals: {}", e);
        }
    }

    /// Writes `meta.csv` with the stop status and cycle count
    pub fn write_meta(&self, settings: &Settings) {
        let result = (|| -> Result<()> {
            let file = File::create(output_path(settings, "meta.csv")?)?;
            let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
            writer.write_record(["status", "cycles"])?;
            writer.write_record(&[self.status.to_string(), self.cycles.to_string()])?;
            writer.flush()?;
            Ok(())
        })();

        if let Err(e) = result {
            tracing::error!("Error while writing meta: {}", e);
        }
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

fn output_path(settings: &Settings, file_name: &str) -> Result<PathBuf> {
    let folder = Path::new(&settings.paths.output);
    create_dir_all(folder)
        .with_context(|| format!("Failed to create output directory {:?}", folder))?;
    Ok(folder.join(file_name))
}

/// An output file, whose parent directory is created on demand
#[derive(Debug)]
pub struct OutputFile {
    pub file: File,
    pub path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let path = Path::new(folder).join(file_name);
        if let Some(parent) = path.parent() {
            create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Failed to open file {:?}", path))?;

        Ok(OutputFile { file, path })
    }
}
