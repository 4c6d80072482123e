//! Known optimal (or best known) objective values used as early-stop targets.

use crate::error::Result;
use crate::graph::Length;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Source of reference objectives, in instance units
pub trait TargetLookup {
    fn reference(&self, instance: &str, center_count: usize) -> Option<f64>;
}

/// Lookup that never knows a target
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTargets;

impl TargetLookup for NoTargets {
    fn reference(&self, _instance: &str, _center_count: usize) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReferenceRecord {
    instance: String,
    value: f64,
}

/// Reference values keyed by instance name, read from an `instance,value` CSV.
///
/// Coordinate instances whose P is given separately are keyed `name.pP`
/// (e.g. `u1060.p10`).
#[derive(Debug, Clone, Default)]
pub struct ReferenceValues {
    values: HashMap<String, f64>,
}

impl ReferenceValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut references = Self::new();
        for record in reader.deserialize() {
            let record: ReferenceRecord = record?;
            references.insert(record.instance.trim(), record.value);
        }
        log::debug!("loaded {} reference values", references.len());
        Ok(references)
    }

    pub fn insert(&mut self, instance: &str, value: f64) {
        self.values.insert(instance.to_string(), value);
    }

    pub fn get(&self, instance: &str) -> Option<f64> {
        self.values.get(instance).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TargetLookup for ReferenceValues {
    fn reference(&self, instance: &str, center_count: usize) -> Option<f64> {
        let base = instance.strip_prefix("tsp.").unwrap_or(instance);
        self.get(&format!("{}.p{}", base, center_count))
            .or_else(|| self.get(base))
    }
}

/// Reference objective converted to an integral radius target.
///
/// Scaled instances publish references rounded to the instance precision
/// while radii are rounded scaled distances, so the two may differ by one
/// scaled unit; the target allows that unit.
pub fn target_radius(value: f64, objective_scale: f64) -> Length {
    let slack = if objective_scale > 1.0 { 1.0 } else { 0.0 };
    ((value * objective_scale).round() + slack).max(0.0) as Length
}

/// Whether a radius matches or beats the reference objective
pub fn reaches_reference(radius: Length, reference: f64, objective_scale: f64) -> bool {
    radius <= target_radius(reference, objective_scale)
}

/// Relative gap to a reference value, in percent
pub fn gap_percent(objective: f64, reference: f64) -> Option<f64> {
    if reference > 0.0 {
        Some((objective - reference) / reference * 100.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "instance,value\npmed1,127\nu1060.p10,2273.08\n";

    #[test]
    fn test_parse_csv() {
        let references = ReferenceValues::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(references.len(), 2);
        assert_eq!(references.get("pmed1"), Some(127.0));
    }

    #[test]
    fn test_lookup_by_name_and_center_count() {
        let references = ReferenceValues::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(references.reference("pmed1", 5), Some(127.0));
        assert_eq!(references.reference("u1060", 10), Some(2273.08));
        assert_eq!(references.reference("tsp.u1060", 10), Some(2273.08));
        assert_eq!(references.reference("u1060.p10", 10), Some(2273.08));
        assert_eq!(references.reference("u1060", 20), None);
        assert_eq!(NoTargets.reference("pmed1", 5), None);
    }

    #[test]
    fn test_target_radius_uses_scale() {
        assert_eq!(target_radius(2273.08, 100.0), 227309);
        assert_eq!(target_radius(127.0, 1.0), 127);
        assert_eq!(target_radius(-3.0, 1.0), 0);
    }

    #[test]
    fn test_rounded_reference_is_reached() {
        // an optimum of 2273.089 published with two decimals as 2273.08
        let radius = (2273.089_f64 * 100.0).round() as Length;
        assert_eq!(radius, 227309);
        assert!(reaches_reference(radius, 2273.08, 100.0));
        assert!(!reaches_reference(227310, 2273.08, 100.0));

        // topological radii are exact
        assert!(reaches_reference(127, 127.0, 1.0));
        assert!(!reaches_reference(128, 127.0, 1.0));
    }

    #[test]
    fn test_gap() {
        assert!((gap_percent(110.0, 100.0).unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(gap_percent(1.0, 0.0), None);
    }

    #[test]
    fn test_shipped_reference_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/reference_values.csv");
        let references = ReferenceValues::from_csv_path(path).unwrap();
        assert_eq!(references.reference("pmed40", 90), Some(13.0));
        assert_eq!(references.reference("pcb3038", 500), Some(85.0));
    }
}
