//! pkfit estimates one-compartment PK parameters (clearance and volume of
//! distribution) from concentration-time data by exhaustive grid search,
//! per-subject and pooled, inside an iterative loop with configurable stop
//! criteria and an optional concurrent paper-insight step.

pub mod algorithms;
pub mod data;
pub mod insights;
pub mod routines {
    pub mod logger;
    pub mod optimization;
    pub mod output;
    pub mod settings;
}
pub mod simulator;

pub mod prelude {
    pub use crate::algorithms::{AgentLoop, Status, StopCriteria};
    pub use crate::data::parse::{read_csv, DataError};
    pub use crate::data::{Data, Observation};
    pub use crate::insights::{InsightExtractor, InsightPayload};
    pub use crate::routines::logger::setup_log;
    pub use crate::routines::optimization::{fit, FitResult};
    pub use crate::routines::output::{RunResult, SubjectFit};
    pub use crate::routines::settings::{read_settings, Provider, Settings};
    pub use crate::simulator::{logspace, predict};
}

use crate::algorithms::AgentLoop;
use crate::insights::InsightExtractor;
use crate::routines::logger::setup_log;
use crate::routines::output::RunResult;
use crate::routines::settings::{self, Settings};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

/// Run a complete fitting loop with the extractor selected by the settings
pub fn start(settings: Settings) -> Result<RunResult> {
    let extractor = insights::from_settings(&settings);
    start_with_extractor(settings, extractor)
}

/// Run a complete fitting loop with a caller-supplied insight extractor
///
/// Sets up logging, reads the datafile, writes the effective settings to the
/// output directory, and runs the loop to completion.
pub fn start_with_extractor(
    settings: Settings,
    extractor: Arc<dyn InsightExtractor>,
) -> Result<RunResult> {
    let now = Instant::now();
    setup_log(&settings)?;
    tracing::info!("Reading observations from {}", settings.paths.data);

    let data = data::parse::read_csv(&settings.paths.data)?;
    if settings.config.output {
        settings::write_settings_to_file(&settings)?;
    }

    let result = AgentLoop::new(settings, data, extractor).fit()?;
    tracing::info!("Total time: {:.2?}", now.elapsed());
    Ok(result)
}
