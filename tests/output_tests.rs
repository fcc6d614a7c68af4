use anyhow::Result;
use pkfit::prelude::*;
use std::sync::Arc;

fn example_data() -> Data {
    Data::new(vec![
        Observation::new("A", 1.0, 5.0, 100.0, 0.0, "bolus"),
        Observation::new("A", 2.0, 3.2, 100.0, 0.0, "bolus"),
        Observation::new("B", 1.0, 6.1, 100.0, 2.0, "100 mg, 2 h infusion"),
        Observation::new("B", 3.0, 3.0, 100.0, 2.0, "100 mg, 2 h infusion"),
    ])
}

/// Extractor double returning a fixed one-entry payload
struct UnitsExtractor;

impl InsightExtractor for UnitsExtractor {
    fn extract(&self) -> Result<InsightPayload> {
        let mut payload = InsightPayload::new();
        payload.insert("units".into(), "mg/L".into());
        Ok(payload)
    }
}

fn run_into(output_dir: &std::path::Path) -> Result<RunResult> {
    let mut settings = Settings::new("unused.csv");
    settings.paths.output = output_dir.to_string_lossy().to_string();
    settings.config.max_iterations = 1;
    settings.config.no_improvement_stop_threshold = 100;

    AgentLoop::new(settings, example_data(), Arc::new(UnitsExtractor)).fit()
}

#[test]
fn run_writes_all_output_files() -> Result<()> {
    let dir = std::env::temp_dir().join("pkfit_output_test");
    std::fs::remove_dir_all(&dir).ok();

    let result = run_into(&dir)?;
    assert_eq!(result.status, Status::MaxIterations);

    let results = std::fs::read_to_string(dir.join("results.csv"))?;
    let mut lines = results.lines();
    assert_eq!(lines.next(), Some("subject_id,cl,v,rmse,n_obs"));
    assert_eq!(results.lines().count(), 1 + result.subject_fits.len());
    assert!(results.lines().nth(1).unwrap().starts_with("A,"));

    let report = std::fs::read_to_string(dir.join("report.md"))?;
    assert!(report.contains("# PK grid-search fitting report"));
    assert!(report.contains("- Subjects: 2"));
    assert!(report.contains("- Observations: 4"));
    assert!(report.contains("Pooled fit: CL="));
    assert!(report.contains("## Paper-derived model notes"));
    assert!(report.contains("- units: \"mg/L\""));

    let residuals = std::fs::read_to_string(dir.join("residuals.csv"))?;
    assert_eq!(
        residuals.lines().next(),
        Some("subject_id,time_h,conc_obs,conc_pred,residual")
    );
    assert_eq!(residuals.lines().count(), 1 + result.data.len());

    let meta = std::fs::read_to_string(dir.join("meta.csv"))?;
    assert!(meta.starts_with("status,cycles"));
    assert!(meta.contains("Maximum iterations reached"));

    std::fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn output_can_be_disabled() -> Result<()> {
    let dir = std::env::temp_dir().join("pkfit_output_disabled_test");
    std::fs::remove_dir_all(&dir).ok();

    let mut settings = Settings::new("unused.csv");
    settings.paths.output = dir.to_string_lossy().to_string();
    settings.config.output = false;
    settings.config.max_iterations = 1;
    settings.config.no_improvement_stop_threshold = 100;

    AgentLoop::new(settings, example_data(), Arc::new(pkfit::insights::Disabled)).fit()?;
    assert!(!dir.join("results.csv").exists());

    std::fs::remove_dir_all(&dir).ok();
    Ok(())
}
