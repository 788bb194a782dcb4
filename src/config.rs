//! Exercise configuration.
//!
//! Loaded from JSON (string or file) and validated when a session is created.
//! Measure names stay strings until validation so an unknown name surfaces as
//! `InvalidMeasureName` rather than a generic parse error.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, KILOGRAMS_PER_POUND, METRES_PER_INCH};
use crate::error::{KinematicsError, Result};
use crate::profile::PhaseThresholds;
use crate::signal::WindowConfig;
use crate::types::{Measure, Side};

/// Unit system for athlete measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Metres and kilograms.
    #[default]
    Metric,
    /// Inches and pounds.
    Imperial,
}

/// Athlete measurements as entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteConfig {
    pub height: f64,
    pub body_weight: f64,
    /// Length of the loaded limb segment.
    pub limb_length: f64,
    /// External load.
    pub load: f64,
    #[serde(default)]
    pub units: Units,
    /// Side of the athlete facing the camera.
    pub side: Side,
}

/// Athlete measurements in metres and kilograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AthleteMetrics {
    pub height_m: f64,
    pub body_weight_kg: f64,
    pub limb_length_m: f64,
    pub load_kg: f64,
}

impl AthleteConfig {
    pub fn to_metric(&self) -> AthleteMetrics {
        let (length, mass) = match self.units {
            Units::Metric => (1.0, 1.0),
            Units::Imperial => (METRES_PER_INCH, KILOGRAMS_PER_POUND),
        };
        AthleteMetrics {
            height_m: self.height * length,
            body_weight_kg: self.body_weight * mass,
            limb_length_m: self.limb_length * length,
            load_kg: self.load * mass,
        }
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("height", self.height),
            ("body_weight", self.body_weight),
            ("limb_length", self.limb_length),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(KinematicsError::InvalidConfig(format!(
                    "athlete {name} must be positive, got {value}"
                )));
            }
        }
        if !(self.load.is_finite() && self.load >= 0.0) {
            return Err(KinematicsError::InvalidConfig(format!(
                "load must be zero or positive, got {}",
                self.load
            )));
        }
        Ok(())
    }
}

/// Sampling cadence and velocity window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Processed frames per sampling tick. Typical: 4.
    pub cadence_frames: u32,
    /// Lag of the velocity finite difference, in processed frames. Typical: 3.
    pub velocity_lag: usize,
    /// Processed frames kept in the rolling window. Typical: 8.
    pub window_depth: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            cadence_frames: defaults::CADENCE_FRAMES,
            velocity_lag: defaults::VELOCITY_LAG,
            window_depth: defaults::WINDOW_DEPTH,
        }
    }
}

impl SamplingConfig {
    pub fn window(&self) -> WindowConfig {
        WindowConfig {
            depth: self.window_depth,
            lag: self.velocity_lag,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.cadence_frames == 0 {
            return Err(KinematicsError::InvalidConfig(
                "cadence_frames must be at least 1".into(),
            ));
        }
        self.window().validate()
    }
}

fn default_tension_threshold() -> f64 {
    defaults::TENSION_THRESHOLD
}

fn default_profile_window() -> (f64, f64) {
    defaults::PROFILE_REP_WINDOW
}

/// One exercise to analyse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    /// Exercise name, e.g. "Back squat". Drives load placement.
    pub name: String,
    /// Muscle group, optionally with a modifier ("quadriceps extension").
    pub muscle: String,
    pub athlete: AthleteConfig,
    /// Track the right limb in front/back views.
    #[serde(default)]
    pub right_side: bool,
    /// Requested measure names.
    pub measures: Vec<String>,
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Effective-length fraction counted as significant tension.
    #[serde(default = "default_tension_threshold")]
    pub tension_threshold: f64,
    /// Open rep-count interval sampled for the resistance profile.
    #[serde(default = "default_profile_window")]
    pub profile_window: (f64, f64),
    /// Replaces the muscle group's phase thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<PhaseThresholds>,
}

impl ExerciseConfig {
    pub fn new(
        name: impl Into<String>,
        muscle: impl Into<String>,
        athlete: AthleteConfig,
        measures: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            muscle: muscle.into(),
            athlete,
            right_side: false,
            measures: measures.iter().map(|m| m.to_string()).collect(),
            sampling: SamplingConfig::default(),
            tension_threshold: defaults::TENSION_THRESHOLD,
            profile_window: defaults::PROFILE_REP_WINDOW,
            thresholds: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parsed measures in request order, duplicates dropped.
    pub fn requested_measures(&self) -> Result<Vec<Measure>> {
        let mut measures = Vec::with_capacity(self.measures.len());
        for raw in &self.measures {
            let measure: Measure = raw.parse()?;
            if !measures.contains(&measure) {
                measures.push(measure);
            }
        }
        Ok(measures)
    }

    /// Structural checks that do not need the policy table.
    pub fn validate(&self) -> Result<()> {
        self.athlete.validate()?;
        self.sampling.validate()?;
        if !(0.0..=1.0).contains(&self.tension_threshold) {
            return Err(KinematicsError::InvalidConfig(format!(
                "tension_threshold must be within [0, 1], got {}",
                self.tension_threshold
            )));
        }
        let (low, high) = self.profile_window;
        if low >= high {
            return Err(KinematicsError::InvalidConfig(format!(
                "profile_window ({low}, {high}) is empty"
            )));
        }
        if let Some(thresholds) = &self.thresholds {
            thresholds.validate()?;
        }
        self.requested_measures()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn athlete(units: Units) -> AthleteConfig {
        AthleteConfig {
            height: 70.0,
            body_weight: 180.0,
            limb_length: 12.0,
            load: 25.0,
            units,
            side: Side::Left,
        }
    }

    #[test]
    fn test_imperial_conversion() {
        let metrics = athlete(Units::Imperial).to_metric();
        assert_abs_diff_eq!(metrics.height_m, 1.778, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.limb_length_m, 0.3048, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.body_weight_kg, 81.64656, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.load_kg, 11.3398, epsilon = 1e-9);
    }

    #[test]
    fn test_metric_passthrough() {
        let metrics = athlete(Units::Metric).to_metric();
        assert_eq!(metrics.limb_length_m, 12.0);
        assert_eq!(metrics.load_kg, 25.0);
    }

    #[test]
    fn test_from_json_with_defaults() {
        let json = r#"{
            "name": "Dumbbell curl",
            "muscle": "biceps",
            "athlete": {
                "height": 1.8, "body_weight": 80, "limb_length": 0.3,
                "load": 12, "side": "left"
            },
            "measures": ["torque", "time_under_tension", "Velocity Lost"]
        }"#;
        let config = ExerciseConfig::from_json_str(json).unwrap();
        assert_eq!(config.athlete.units, Units::Metric);
        assert_eq!(config.sampling, SamplingConfig::default());
        assert_eq!(config.tension_threshold, 0.05);
        assert_eq!(config.profile_window, (1.0, 3.0));
        assert!(config.thresholds.is_none());
        assert_eq!(
            config.requested_measures().unwrap(),
            vec![Measure::Torque, Measure::TimeUnderTension, Measure::VelocityLost]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_override_from_json() {
        let json = r#"{
            "name": "Curl", "muscle": "biceps",
            "athlete": {"height": 1.8, "body_weight": 80, "limb_length": 0.3, "load": 12, "side": "right"},
            "measures": [],
            "thresholds": {"strategy": "hysteresis", "low": 70, "high": 110}
        }"#;
        let config = ExerciseConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.thresholds,
            Some(PhaseThresholds::Hysteresis { low: 70.0, high: 110.0 })
        );
    }

    #[test]
    fn test_unknown_measure_rejected() {
        let config = ExerciseConfig::new("Curl", "biceps", athlete(Units::Metric), &["torque", "stimulus"]);
        assert!(matches!(
            config.validate(),
            Err(KinematicsError::InvalidMeasureName(ref name)) if name == "stimulus"
        ));
    }

    #[test]
    fn test_duplicate_measures_collapsed() {
        let config = ExerciseConfig::new("Curl", "biceps", athlete(Units::Metric), &["speed", "Speed"]);
        assert_eq!(config.requested_measures().unwrap(), vec![Measure::Speed]);
    }

    #[test]
    fn test_structural_validation() {
        let mut config = ExerciseConfig::new("Curl", "biceps", athlete(Units::Metric), &[]);
        config.sampling.cadence_frames = 0;
        assert!(config.validate().is_err());

        let mut config = ExerciseConfig::new("Curl", "biceps", athlete(Units::Metric), &[]);
        config.profile_window = (3.0, 1.0);
        assert!(config.validate().is_err());

        let mut config = ExerciseConfig::new("Curl", "biceps", athlete(Units::Metric), &[]);
        config.athlete.limb_length = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_config() {
        let config = ExerciseConfig::new("Back squat", "glutes", athlete(Units::Imperial), &["parallel"]);
        let restored = ExerciseConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_missing_file() {
        let err = ExerciseConfig::from_path("/nonexistent/exercise.json").unwrap_err();
        assert!(matches!(err, KinematicsError::Io(_)));
        assert!(err.is_configuration_error());
    }
}
