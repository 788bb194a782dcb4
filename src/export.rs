//! Session report for the reporting and plotting collaborators.
//!
//! The report holds the structured records only:
//! - **Rep records**: one per completed rep, label plus metric lines
//! - **Set record**: session-level lines (time under tension, angle extremes,
//!   velocity lost)
//! - **Resistance profile**: equal-length angle and torque sequences
//!
//! It serializes to JSON and renders to a plain-text layout (one rep label
//! followed by its lines, then the set lines).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::FrameStats;
use crate::types::{MeasureFailure, MetricLine, RepRecord, ResistanceProfile, SetRecord, Side};

/// Everything a session produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub exercise: String,
    pub muscle: String,
    pub side: Side,
    /// Final rep count, in half reps.
    pub rep_count: f64,
    pub reps: Vec<RepRecord>,
    pub set: SetRecord,
    /// Present only when the resistance profile was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resistance_profile: Option<ResistanceProfile>,
    pub frames: FrameStats,
}

impl SessionReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_compact_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resistance profile only, as `{"angles": [...], "torques": [...]}`.
    pub fn profile_json(&self) -> Result<Option<String>> {
        self.resistance_profile
            .as_ref()
            .map(|profile| serde_json::to_string(profile).map_err(Into::into))
            .transpose()
    }

    /// Plain-text rendering.
    pub fn render_text(&self) -> String {
        let mut lines = vec![
            format!("{} ({}, {} side)", self.exercise, self.muscle, self.side),
            format!("Reps: {}", self.rep_count),
        ];

        for rep in &self.reps {
            lines.push(String::new());
            lines.push(rep.label.clone());
            lines.extend(metric_lines(&rep.lines, &rep.failures));
        }

        if !self.set.lines.is_empty() || !self.set.failures.is_empty() {
            lines.push(String::new());
            lines.push("Set".to_string());
            lines.extend(metric_lines(&self.set.lines, &self.set.failures));
        }

        if let Some(profile) = &self.resistance_profile {
            lines.push(String::new());
            lines.push(format!("Resistance profile: {} samples", profile.len()));
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn write_text(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.render_text())?;
        Ok(())
    }
}

/// Indented record lines, then one line per unavailable measure.
fn metric_lines<'a>(
    lines: &'a [MetricLine],
    failures: &'a [MeasureFailure],
) -> impl Iterator<Item = String> + 'a {
    lines.iter().map(|line| format!("  {line}")).chain(
        failures
            .iter()
            .map(|failure| format!("  {} unavailable: {}", failure.measure, failure.reason)),
    )
}
