//! Complete per-exercise pipeline from landmarks to rep and set records.
//!
//! This module sequences every stage for one frame before the next frame is
//! accepted:
//! 1. **Geometry**: joint angle and effective length from the frame landmarks
//! 2. **Signal window**: store every processed sample; estimate velocity on
//!    sampling ticks
//! 3. **Segmentation**: phase flips and rep boundaries
//! 4. **Aggregation**: per-measure accumulation, flushed on each rep boundary
//!
//! Frames without the required landmarks are skipped entirely: they produce no
//! tick, no transition and no accumulator update.
//!
//! # Ownership
//! An [`ExerciseSession`] owns all of its state. Analysing several videos at
//! once needs one session per video; nothing is shared between sessions.

use log::{debug, info};

use crate::aggregation::{
    AggregatorConfig, FrameInput, LoadParameters, MetricAggregator, TickInput,
};
use crate::config::{AthleteMetrics, ExerciseConfig, SamplingConfig};
use crate::constants::PhysicalConstants;
use crate::error::{KinematicsError, Result};
use crate::export::SessionReport;
use crate::geometry::Kinematics;
use crate::profile::{ExerciseProfile, LandmarkFrame, MassDistribution, PolicyTable};
use crate::signal::SignalWindow;
use crate::segmentation::PhaseSegmenter;
use crate::types::{Landmark, Measure, MovementPhase, RepRecord, Sample, SegmentEvent};

/// Source of landmarks for a video frame.
///
/// Implemented by the host around its pose estimator. An empty result means no
/// person was detected in the frame.
pub trait PoseProvider {
    type Frame;

    fn locate(&mut self, frame: &Self::Frame) -> Vec<Landmark>;
}

/// Frame accounting for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameStats {
    /// Frames offered to the session.
    pub seen: u64,
    /// Frames with the landmarks the exercise needs.
    pub processed: u64,
    /// Frames dropped for missing landmarks.
    pub skipped: u64,
    /// Sampling ticks run.
    pub ticks: u64,
}

/// What one processed frame produced, for overlay drawing by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub timestamp_s: f64,
    pub angle_deg: f64,
    pub effective_length: f64,
    pub phase: MovementPhase,
    pub rep_count: f64,
    /// True if this frame was a sampling tick.
    pub ticked: bool,
    pub events: Vec<SegmentEvent>,
    /// Rep records completed by this frame.
    pub completed: Vec<RepRecord>,
}

/// One exercise run: owns window, segmenter and aggregator.
#[derive(Debug, Clone)]
pub struct ExerciseSession {
    config: ExerciseConfig,
    profile: ExerciseProfile,
    athlete: AthleteMetrics,
    measures: Vec<Measure>,
    sampling: SamplingConfig,
    gravity_angle_supported: bool,

    window: SignalWindow,
    segmenter: PhaseSegmenter,
    aggregator: MetricAggregator,

    reps: Vec<RepRecord>,
    stats: FrameStats,
}

impl ExerciseSession {
    /// Validate the configuration against the built-in policy table.
    ///
    /// Every configuration error surfaces here, before any frame.
    pub fn new(config: ExerciseConfig) -> Result<Self> {
        Self::with_parts(config, &PolicyTable::standard(), PhysicalConstants::default())
    }

    pub fn with_parts(
        config: ExerciseConfig,
        table: &PolicyTable,
        constants: PhysicalConstants,
    ) -> Result<Self> {
        config.validate()?;
        table.validate()?;

        let measures = config.requested_measures()?;
        let mut profile = ExerciseProfile::resolve(
            table,
            &config.name,
            &config.muscle,
            config.athlete.side,
            config.right_side,
        )?;
        if let Some(thresholds) = config.thresholds {
            profile = profile.with_thresholds(thresholds);
        }

        if measures.contains(&Measure::Parallel) && !profile.supports_depth_check() {
            return Err(KinematicsError::UnsupportedMeasure {
                measure: Measure::Parallel,
                exercise: config.name.clone(),
            });
        }

        let athlete = config.athlete.to_metric();
        let sampling = config.sampling;
        let window = SignalWindow::new(sampling.window())?;
        let segmenter = PhaseSegmenter::new(profile.policy);

        let mut aggregator_config = AggregatorConfig::new(
            measures.clone(),
            LoadParameters {
                limb_length_m: athlete.limb_length_m,
                load_kg: athlete.load_kg,
            },
            profile.policy.concentric_velocity_negative(),
        );
        aggregator_config.tension_threshold = config.tension_threshold;
        aggregator_config.profile_window = config.profile_window;
        let mut aggregator = MetricAggregator::new(aggregator_config, Kinematics::new(constants));

        let mut gravity_angle_supported = true;
        if measures.contains(&Measure::GravityAngle) {
            if let Err(error) = profile.supports_gravity_angle() {
                aggregator.mark_gravity_angle_unsupported(&error);
                gravity_angle_supported = false;
            }
        }

        info!(
            "Session '{}' ({} {} view): measures [{}]",
            config.name,
            profile.muscle.name(),
            profile.side,
            measures
                .iter()
                .map(Measure::name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            config,
            profile,
            athlete,
            measures,
            sampling,
            gravity_angle_supported,
            window,
            segmenter,
            aggregator,
            reps: Vec::new(),
            stats: FrameStats::default(),
        })
    }

    fn wants(&self, measure: Measure) -> bool {
        self.measures.contains(&measure)
    }

    /// Process one frame's landmarks.
    ///
    /// Returns `None` if the frame was skipped for missing landmarks.
    pub fn process_frame(&mut self, landmarks: &[Landmark], timestamp_s: f64) -> Option<FrameSnapshot> {
        self.stats.seen += 1;

        let frame = LandmarkFrame::new(landmarks);
        let masses = MassDistribution {
            body_weight_kg: self.athlete.body_weight_kg,
            load_kg: self.athlete.load_kg,
        };
        let measured = self.profile.joint_angle(&frame).and_then(|angle| {
            self.profile
                .effective_length(&frame, masses)
                .map(|eff| (angle, eff))
        });
        let (angle_deg, effective_length) = match measured {
            Ok(values) => values,
            Err(error) => {
                debug!("Skipping frame at {timestamp_s:.3}s: {error}");
                self.stats.skipped += 1;
                return None;
            }
        };

        let frame_index = self.stats.processed;
        self.stats.processed += 1;
        self.window
            .push_sample(Sample::new(angle_deg, effective_length, timestamp_s));
        let input = FrameInput {
            angle_deg,
            effective_length,
            timestamp_s,
            gravity_angle_deg: self.gravity_angle(&frame),
            reached_parallel: self.reached_parallel(&frame),
        };
        self.aggregator.on_frame(&input);

        let ticked = frame_index % u64::from(self.sampling.cadence_frames) == 0;
        let mut events = Vec::new();
        let mut completed = Vec::new();
        if ticked {
            self.stats.ticks += 1;
            events = self.tick(angle_deg, effective_length, timestamp_s);
            for event in &events {
                if let SegmentEvent::RepCompleted { rep } = *event {
                    let phase_times = self.segmenter.take_phase_times();
                    let record = self.aggregator.flush_rep(rep, phase_times);
                    completed.push(record.clone());
                    self.reps.push(record);
                }
            }
        }

        Some(FrameSnapshot {
            timestamp_s,
            angle_deg,
            effective_length,
            phase: self.segmenter.phase(),
            rep_count: self.segmenter.rep_count(),
            ticked,
            events,
            completed,
        })
    }

    fn gravity_angle(&self, frame: &LandmarkFrame<'_>) -> Option<f64> {
        if self.gravity_angle_supported && self.wants(Measure::GravityAngle) {
            self.profile.gravity_angle(frame).ok()
        } else {
            None
        }
    }

    fn reached_parallel(&self, frame: &LandmarkFrame<'_>) -> Option<bool> {
        if self.wants(Measure::Parallel) {
            self.profile.reached_parallel(frame).ok()
        } else {
            None
        }
    }

    fn tick(&mut self, angle_deg: f64, effective_length: f64, timestamp_s: f64) -> Vec<SegmentEvent> {
        let angular_velocity = match self.window.angular_velocity() {
            Ok(velocity) => Some(velocity),
            Err(error) => {
                debug!("No velocity this tick: {error}");
                None
            }
        };

        let events = self.segmenter.update(angle_deg, timestamp_s);

        self.aggregator.on_tick(&TickInput {
            angle_deg,
            effective_length,
            angular_velocity,
            rep_count: self.segmenter.rep_count(),
        });
        events
    }

    /// Pull frames through a pose provider until the input ends.
    pub fn run<P, I>(mut self, provider: &mut P, frames: I) -> SessionReport
    where
        P: PoseProvider,
        I: IntoIterator<Item = (P::Frame, f64)>,
    {
        for (frame, timestamp_s) in frames {
            let landmarks = provider.locate(&frame);
            self.process_frame(&landmarks, timestamp_s);
        }
        self.finish()
    }

    /// End the session and assemble the report. An unfinished rep is dropped.
    pub fn finish(self) -> SessionReport {
        let set = self.aggregator.finish();
        info!(
            "Session '{}' finished: {} reps, {} of {} frames processed",
            self.config.name,
            self.reps.len(),
            self.stats.processed,
            self.stats.seen
        );
        let resistance_profile = self
            .wants(Measure::ResistanceProfile)
            .then(|| self.aggregator.resistance_profile().clone());

        SessionReport {
            exercise: self.config.name,
            muscle: self.profile.muscle.name().to_string(),
            side: self.profile.side,
            rep_count: self.segmenter.rep_count(),
            reps: self.reps,
            set,
            resistance_profile,
            frames: self.stats,
        }
    }

    pub fn reps(&self) -> &[RepRecord] {
        &self.reps
    }

    pub fn rep_count(&self) -> f64 {
        self.segmenter.rep_count()
    }

    pub fn phase(&self) -> MovementPhase {
        self.segmenter.phase()
    }

    pub fn profile(&self) -> &ExerciseProfile {
        &self.profile
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
