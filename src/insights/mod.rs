//! Boundary to the paper-insight extraction collaborator
//!
//! The fitting loop can enrich its report with model details extracted from
//! the paper a dataset was digitized from. Extraction is an external,
//! I/O-bound service (typically an LLM reading the PDF); this module only
//! defines the boundary contract and the built-in disabled variant. Callers
//! supply real extractors through [crate::start_with_extractor].

use crate::routines::settings::{Provider, Settings};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque key-value payload returned by an extractor
///
/// Keys are whatever the collaborator reports, e.g. `model_structure`,
/// `dosing`, `parameters`, `units`, `estimation_method`.
pub type InsightPayload = HashMap<String, serde_json::Value>;

/// Extracts structured model insights from a source document
///
/// An empty payload means "no insights available"; the loop proceeds without
/// them and may try again on a later iteration. Errors are recovered locally
/// by the orchestrator and are never fatal to the fitting pipeline.
pub trait InsightExtractor: Send + Sync {
    fn extract(&self) -> Result<InsightPayload>;
}

/// Extractor used when insight extraction is disabled
pub struct Disabled;

impl InsightExtractor for Disabled {
    fn extract(&self) -> Result<InsightPayload> {
        Ok(InsightPayload::new())
    }
}

/// Select an extractor from the configured provider
///
/// The crate ships no remote or local collaborator of its own; selecting one
/// without injecting an implementation through
/// [crate::start_with_extractor] degrades to the disabled extractor with a
/// warning.
pub fn from_settings(settings: &Settings) -> Arc<dyn InsightExtractor> {
    match settings.insights.provider {
        Provider::Disabled => Arc::new(Disabled),
        provider => {
            tracing::warn!(
                "No {:?} insight collaborator registered; insights are disabled",
                provider
            );
            Arc::new(Disabled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_extractor_returns_an_empty_payload() {
        let payload = Disabled.extract().unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn remote_provider_without_a_collaborator_degrades_to_disabled() {
        let mut settings = Settings::new("data.csv");
        settings.insights.provider = Provider::Remote;
        let extractor = from_settings(&settings);
        assert!(extractor.extract().unwrap().is_empty());
    }
}
