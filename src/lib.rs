//! Rep Kinematics Engine Library
//!
//! Turns a per-frame stream of 2D body landmarks into resistance-training
//! metrics: joint angle, torque, power, angular velocity, time under
//! significant tension, rep boundaries and a resistance profile.
//!
//! # Design Philosophy
//!
//! - **Frame-synchronous**: each frame runs geometry, windowing, segmentation
//!   and aggregation to completion before the next one is accepted.
//! - **Fail at configuration, isolate at run time**: unknown measures, muscle
//!   groups and views stop a session before the first frame; a measure that
//!   cannot be computed for a rep is recorded as a failure on that rep only.
//! - **No silent zeros**: averaging an empty sample set is an error.
//! - **Approximate by construction**: vision-derived kinematics, with
//!   documented guards for degenerate geometry.
//!
//! # Example
//!
//! ```ignore
//! use rep_kinematics::{AthleteConfig, ExerciseConfig, ExerciseSession, Side, Units};
//!
//! let athlete = AthleteConfig {
//!     height: 1.8,
//!     body_weight: 80.0,
//!     limb_length: 0.3,
//!     load: 12.0,
//!     units: Units::Metric,
//!     side: Side::Left,
//! };
//! let config = ExerciseConfig::new("Dumbbell curl", "biceps", athlete, &["torque", "speed"]);
//! let mut session = ExerciseSession::new(config)?;
//!
//! for (landmarks, timestamp_s) in frames {
//!     session.process_frame(&landmarks, timestamp_s);
//! }
//! let report = session.finish();
//! println!("{}", report.render_text());
//! ```

pub mod aggregation;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod geometry;
pub mod pipeline;
pub mod profile;
pub mod segmentation;
pub mod signal;
pub mod types;

#[cfg(test)]
mod integration_tests;

// Re-export commonly used types
pub use config::{AthleteConfig, ExerciseConfig, SamplingConfig, Units};
pub use error::{KinematicsError, Result};
pub use export::SessionReport;
pub use pipeline::{ExerciseSession, FrameSnapshot, FrameStats, PoseProvider};
pub use profile::{ExercisePolicy, ExerciseProfile, MuscleGroup, PhaseThresholds, PolicyTable};
pub use types::{
    Landmark, Measure, MeasureFailure, MetricLine, MetricValue, MovementPhase, RepRecord,
    ResistanceProfile, SegmentEvent, SetRecord, Side,
};
