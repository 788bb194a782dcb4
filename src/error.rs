//! Error types for the kinematics engine.
//!
//! Two classes of failure exist. Configuration failures (unknown measure,
//! unknown muscle group, unsupported view) are returned from
//! `ExerciseSession::new` and stop the run before any frame is processed.
//! Runtime failures (empty sample set, insufficient window depth) are scoped to
//! a single measure or a single tick and are recorded, not propagated.

use thiserror::Error;

use crate::types::Measure;

/// Errors produced by the engine.
#[derive(Debug, Error)]
pub enum KinematicsError {
    /// Mean requested over zero samples.
    #[error("No samples accumulated for {measure}; the clip may include set-up frames outside the lift")]
    EmptySampleSet { measure: String },

    /// Rolling window has not reached the depth needed for a lagged difference.
    #[error("Insufficient samples: need {required}, have {available}")]
    InsufficientSamples { required: usize, available: usize },

    /// A ratio whose denominator is exactly zero.
    #[error("Division by zero: {0}")]
    DivisionByZero(&'static str),

    /// Configuration references a measure name outside the supported set.
    #[error("'{0}' is not a valid measure")]
    InvalidMeasureName(String),

    /// A valid measure that does not apply to this exercise.
    #[error("Measure '{measure}' is not available for exercise '{exercise}'")]
    UnsupportedMeasure { measure: Measure, exercise: String },

    /// No landmark mapping for this side/muscle combination.
    #[error("Side '{side}' is not supported for '{muscle}': {reason}")]
    UnsupportedViewingSide {
        muscle: String,
        side: String,
        reason: &'static str,
    },

    /// Muscle group not present in the policy table.
    #[error("Unknown muscle group '{0}'")]
    UnknownMuscleGroup(String),

    /// Structurally invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pose provider returned landmarks but not the one a role needs.
    #[error("Landmark {0} missing from frame")]
    MissingLandmark(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl KinematicsError {
    pub(crate) fn empty(measure: impl Into<String>) -> Self {
        KinematicsError::EmptySampleSet {
            measure: measure.into(),
        }
    }

    /// True for failures that must abort the run before frame processing.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            KinematicsError::InvalidMeasureName(_)
                | KinematicsError::UnsupportedMeasure { .. }
                | KinematicsError::UnsupportedViewingSide { .. }
                | KinematicsError::UnknownMuscleGroup(_)
                | KinematicsError::InvalidConfig(_)
                | KinematicsError::Io(_)
                | KinematicsError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, KinematicsError>;
