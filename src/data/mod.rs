//! Data structures for concentration-time observations

pub mod parse;

use std::collections::BTreeMap;

/// A single concentration-time observation for one subject
///
/// Duplicate `(subject_id, time)` pairs are legal and contribute
/// independently to the fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub subject_id: String,
    /// Time since start of dosing (hours)
    pub time: f64,
    /// Observed concentration
    pub conc: f64,
    /// Administered dose (mg)
    pub dose: f64,
    /// Duration of the infusion (hours), `0.0` for a bolus
    pub infusion_duration: f64,
    /// Raw condition label from the source dataset
    pub condition: String,
}

impl Observation {
    pub fn new(
        subject_id: impl Into<String>,
        time: f64,
        conc: f64,
        dose: f64,
        infusion_duration: f64,
        condition: impl Into<String>,
    ) -> Self {
        Observation {
            subject_id: subject_id.into(),
            time,
            conc,
            dose,
            infusion_duration,
            condition: condition.into(),
        }
    }
}

/// An ordered collection of [Observation]s, covering all subjects
#[derive(Debug, Clone, Default)]
pub struct Data {
    observations: Vec<Observation>,
}

impl Data {
    pub fn new(observations: Vec<Observation>) -> Self {
        Data { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Partition the observations by subject identifier
    ///
    /// The map iterates in sorted subject order, and each group preserves the
    /// first-seen relative order of its observations. Nothing is sorted by
    /// time or deduplicated.
    pub fn group_by_subject(&self) -> BTreeMap<&str, Vec<&Observation>> {
        let mut groups: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
        for obs in &self.observations {
            groups.entry(obs.subject_id.as_str()).or_default().push(obs);
        }
        groups
    }

    pub fn n_subjects(&self) -> usize {
        self.group_by_subject().len()
    }

    /// Unique doses (mg), sorted ascending
    pub fn doses(&self) -> Vec<f64> {
        Self::sorted_unique(self.observations.iter().map(|obs| obs.dose))
    }

    /// Unique infusion durations (hours), sorted ascending
    pub fn infusion_durations(&self) -> Vec<f64> {
        Self::sorted_unique(self.observations.iter().map(|obs| obs.infusion_duration))
    }

    /// Earliest and latest observation time, if any observations exist
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let mut times = self.observations.iter().map(|obs| obs.time);
        let first = times.next()?;
        let (min, max) = times.fold((first, first), |(min, max), t| (min.min(t), max.max(t)));
        Some((min, max))
    }

    fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
        let mut values: Vec<f64> = values.collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        values
    }
}
