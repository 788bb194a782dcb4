//! Core data types for the rep kinematics engine.
//!
//! Input types (landmarks, samples) are small `Copy` values created once per
//! frame and dropped when the frame is done. Output types (records, profile)
//! are owned, serializable collections handed to the reporting collaborator.
//!
//! Design principle: if a concept exists, it gets a type. Measures are a
//! closed enum rather than strings so every match over them is exhaustive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;

// ============================================================================
// INPUT TYPES
// ============================================================================

/// A named 2D body point reported by the pose provider for one frame.
///
/// Coordinates are pixels with the y axis pointing down, as produced by
/// image-space pose estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    /// Anatomical point id (see `constants::landmarks`).
    pub id: u32,
    pub x: i32,
    pub y: i32,
}

impl Landmark {
    pub fn new(id: u32, x: i32, y: i32) -> Self {
        Self { id, x, y }
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x as f64, self.y as f64)
    }
}

/// A point in image space, in floating point for geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One processed frame of joint kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Joint angle in degrees, [0, 180].
    pub angle_deg: f64,
    /// Fraction of limb length perpendicular to gravity, [0, 1].
    pub effective_length: f64,
    /// Monotonic timestamp in seconds.
    pub timestamp_s: f64,
}

impl Sample {
    pub fn new(angle_deg: f64, effective_length: f64, timestamp_s: f64) -> Self {
        Self {
            angle_deg,
            effective_length,
            timestamp_s,
        }
    }
}

/// Side of the athlete facing the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Front,
    Back,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Front => "front",
            Side::Back => "back",
        }
    }

    /// Left/right views see the tracked limb in profile.
    pub fn is_profile(&self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = KinematicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "front" => Ok(Side::Front),
            "back" => Ok(Side::Back),
            other => Err(KinematicsError::InvalidConfig(format!(
                "'{other}' is not a valid side; options are 'left', 'right', 'front' and 'back'"
            ))),
        }
    }
}

// ============================================================================
// PHASE AND EVENT TYPES
// ============================================================================

/// Movement phase of the target muscle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// Muscle shortening under load (concentric).
    Shortening,
    /// Muscle lengthening under load (eccentric).
    Lengthening,
}

impl MovementPhase {
    pub fn opposite(&self) -> Self {
        match self {
            MovementPhase::Shortening => MovementPhase::Lengthening,
            MovementPhase::Lengthening => MovementPhase::Shortening,
        }
    }

    pub fn is_concentric(&self) -> bool {
        matches!(self, MovementPhase::Shortening)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MovementPhase::Shortening => "concentric",
            MovementPhase::Lengthening => "eccentric",
        }
    }
}

/// Events emitted by the phase segmenter on a sampling tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentEvent {
    /// A half rep completed and the phase flipped.
    PhaseChanged {
        from: MovementPhase,
        to: MovementPhase,
        /// Rep count after the increment.
        rep_count: f64,
        /// Seconds spent in the phase that just ended.
        phase_duration_s: f64,
    },
    /// The rep count reached a whole number not flushed before.
    RepCompleted { rep: u32 },
}

// ============================================================================
// MEASURES
// ============================================================================

/// Metrics that can be requested for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measure {
    Torque,
    Power,
    Speed,
    TimeUnderTension,
    Angles,
    ResistanceProfile,
    VelocityLost,
    Work,
    Tempo,
    Parallel,
    GravityAngle,
}

impl Measure {
    pub const ALL: [Measure; 11] = [
        Measure::Torque,
        Measure::Power,
        Measure::Speed,
        Measure::TimeUnderTension,
        Measure::Angles,
        Measure::ResistanceProfile,
        Measure::VelocityLost,
        Measure::Work,
        Measure::Tempo,
        Measure::Parallel,
        Measure::GravityAngle,
    ];

    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Measure::Torque => "torque",
            Measure::Power => "power",
            Measure::Speed => "speed",
            Measure::TimeUnderTension => "time under tension",
            Measure::Angles => "angles",
            Measure::ResistanceProfile => "resistance profile",
            Measure::VelocityLost => "velocity lost",
            Measure::Work => "work",
            Measure::Tempo => "tempo",
            Measure::Parallel => "parallel",
            Measure::GravityAngle => "angle with gravity",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measure {
    type Err = KinematicsError;

    /// Case-insensitive; underscores and hyphens are read as spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ");
        Measure::ALL
            .iter()
            .copied()
            .find(|m| m.name() == normalized)
            .ok_or_else(|| KinematicsError::InvalidMeasureName(s.to_string()))
    }
}

impl Serialize for Measure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Measure {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// OUTPUT RECORDS
// ============================================================================

/// Value carried by a metric line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
}

/// A single labelled metric in a rep or set record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLine {
    pub measure: Measure,
    pub label: String,
    pub value: MetricValue,
    pub unit: String,
}

impl MetricLine {
    pub fn number(measure: Measure, label: &str, value: f64, unit: &str) -> Self {
        Self {
            measure,
            label: label.to_string(),
            value: MetricValue::Number(value),
            unit: unit.to_string(),
        }
    }

    pub fn flag(measure: Measure, label: &str, value: bool) -> Self {
        Self {
            measure,
            label: label.to_string(),
            value: MetricValue::Flag(value),
            unit: String::new(),
        }
    }

    /// Numeric value, if this line carries one.
    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            MetricValue::Number(v) => Some(v),
            MetricValue::Flag(_) => None,
        }
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            MetricValue::Number(v) => match self.unit.as_str() {
                "" => write!(f, "{}: {}", self.label, v),
                "%" => write!(f, "{}: {}%", self.label, v),
                unit => write!(f, "{}: {} {}", self.label, v, unit),
            },
            MetricValue::Flag(b) => write!(f, "{}: {}", self.label, b),
        }
    }
}

/// A measure that could not be computed for a rep or the set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureFailure {
    pub measure: Measure,
    pub reason: String,
}

impl MeasureFailure {
    pub fn new(measure: Measure, error: &KinematicsError) -> Self {
        Self {
            measure,
            reason: error.to_string(),
        }
    }
}

/// Results flushed when a rep completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepRecord {
    pub rep: u32,
    pub label: String,
    pub lines: Vec<MetricLine>,
    pub failures: Vec<MeasureFailure>,
}

impl RepRecord {
    pub fn new(rep: u32) -> Self {
        Self {
            rep,
            label: format!("Rep #{rep}"),
            lines: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// First line with the given label.
    pub fn line(&self, label: &str) -> Option<&MetricLine> {
        self.lines.iter().find(|l| l.label == label)
    }
}

/// Results computed once at the end of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub lines: Vec<MetricLine>,
    pub failures: Vec<MeasureFailure>,
}

impl SetRecord {
    pub fn line(&self, label: &str) -> Option<&MetricLine> {
        self.lines.iter().find(|l| l.label == label)
    }
}

/// Torque against joint angle, sampled over the designated rep window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResistanceProfile {
    pub angles: Vec<f64>,
    pub torques: Vec<f64>,
}

impl ResistanceProfile {
    pub fn push(&mut self, angle_deg: f64, torque: f64) {
        self.angles.push(angle_deg);
        self.torques.push(torque);
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}
