//! Scenario loading and plain-text flight plan output.

use anyhow::Context;
use std::fs;
use std::path::Path;
use survey_core::{FlightPlan, Move, Scenario};

/// Read and validate a scenario file.
pub fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    Scenario::from_json(&json).with_context(|| format!("Invalid scenario {}", path.display()))
}

/// One move as `index,lng,lat,heading,lng,lat,sensor`, with `null` when the
/// move reads no sensor. Indices start at 1.
pub fn move_line(index: usize, step: &Move) -> String {
    let sensor = step
        .visited_sensor
        .map_or_else(|| "null".to_string(), |s| s.to_string());
    format!(
        "{},{},{},{},{},{},{}",
        index, step.start.lng, step.start.lat, step.heading, step.end.lng, step.end.lat, sensor
    )
}

pub fn move_lines(plan: &FlightPlan) -> Vec<String> {
    plan.moves
        .iter()
        .enumerate()
        .map(|(i, step)| move_line(i + 1, step))
        .collect()
}
