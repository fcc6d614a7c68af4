use config::Config as eConfig;
use serde::{Deserialize, Serialize};

/// Full configuration for a run
///
/// Settings are read from a TOML file layered with `PKFIT`-prefixed
/// environment variables, or constructed programmatically via
/// [Settings::new].
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Settings {
    pub paths: Paths,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub insights: Insights,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Paths {
    /// Path to the observation CSV file
    pub data: String,
    /// Optional path to a metadata JSON file (units, provenance)
    pub metadata: Option<String>,
    /// Optional path to the source paper, handed to the insight extractor
    pub paper: Option<String>,
    /// Output directory for results, reports and logs
    #[serde(default = "default_output_dir")]
    pub output: String,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Config {
    /// Maximum number of loop iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Stop after this many consecutive iterations without a strictly
    /// improved pooled RMSE
    #[serde(default = "default_no_improvement")]
    pub no_improvement_stop_threshold: usize,
    /// Run insight extraction concurrently with the fitting pipeline
    #[serde(default = "default_false")]
    pub concurrency_enabled: bool,
    /// Abort the loop if the pooled RMSE exceeds this ceiling after a
    /// concurrent iteration. Absent means the gate always passes.
    pub quality_gate_max_rmse: Option<f64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Write results, report and residuals to the output directory
    #[serde(default = "default_true")]
    pub output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_iterations: default_max_iterations(),
            no_improvement_stop_threshold: default_no_improvement(),
            concurrency_enabled: false,
            quality_gate_max_rmse: None,
            log_level: default_log_level(),
            log_file: default_log_file(),
            output: true,
        }
    }
}

/// Which insight-extraction collaborator to use
///
/// The selection is made by configuration, never by runtime probing of what
/// happens to be installed. `Remote` and `Local` name external collaborators
/// supplied by the caller; the crate itself only ships the disabled variant.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Remote,
    Local,
    #[default]
    Disabled,
}

#[derive(Debug, Deserialize, Clone, Serialize, Default)]
pub struct Insights {
    #[serde(default)]
    pub provider: Provider,
    /// Model identifier passed through to the collaborator
    pub model: Option<String>,
}

impl Settings {
    /// Settings for the given datafile with all defaults
    pub fn new(data: impl Into<String>) -> Self {
        Settings {
            paths: Paths {
                data: data.into(),
                metadata: None,
                paper: None,
                output: default_output_dir(),
            },
            config: Config::default(),
            insights: Insights::default(),
        }
    }
}

/// Read settings from a TOML file, layered with environment variables
///
/// Environment variables use the `PKFIT` prefix and `__` as the nesting
/// separator, e.g. `PKFIT_CONFIG__MAX_ITERATIONS=5`.
pub fn read_settings(path: impl Into<String>) -> Result<Settings, config::ConfigError> {
    let settings_path = path.into();

    let parsed = eConfig::builder()
        .add_source(config::File::with_name(&settings_path).format(config::FileFormat::Toml))
        .add_source(config::Environment::with_prefix("PKFIT").separator("__"))
        .build()?;

    parsed.try_deserialize()
}

/// Write the effective settings to `settings.json` in the output directory
pub fn write_settings_to_file(settings: &Settings) -> Result<(), std::io::Error> {
    let serialized = serde_json::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::create_dir_all(&settings.paths.output)?;
    let file_path = std::path::Path::new(&settings.paths.output).join("settings.json");
    let mut file = std::fs::File::create(file_path)?;
    std::io::Write::write_all(&mut file, serialized.as_bytes())?;
    Ok(())
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "run.log".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_max_iterations() -> usize {
    3
}

fn default_no_improvement() -> usize {
    2
}
