//! Per-measure accumulators and rep/set flushing.
//!
//! The aggregator receives two kinds of input from the session:
//! - every processed frame (time under tension, angle extremes, squat depth,
//!   angle with gravity)
//! - every sampling tick (torque, power, speed, profile samples)
//!
//! On a rep boundary it turns the accumulators into a [`RepRecord`] and clears
//! them; at session end it produces the [`SetRecord`]. A measure that cannot be
//! computed is recorded as a [`MeasureFailure`] on the record and the other
//! measures flush normally.

use log::{debug, warn};

use crate::constants::{defaults, MEAN_DECIMALS, PERCENT_DECIMALS};
use crate::error::{KinematicsError, Result};
use crate::geometry::Kinematics;
use crate::types::{
    Measure, MeasureFailure, MetricLine, RepRecord, ResistanceProfile, SetRecord,
};

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// ACCUMULATORS
// ============================================================================

/// Growable sample set for one quantity, cleared on every rep flush.
#[derive(Debug, Clone, Default)]
pub struct SampleAccumulator {
    label: &'static str,
    values: Vec<f64>,
}

impl SampleAccumulator {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    /// Magnitude of the mean, rounded to four decimals.
    ///
    /// Signed buckets hold values of one sign, so the magnitude is the mean
    /// speed or power in that direction.
    pub fn mean(&self) -> Result<f64> {
        if self.values.is_empty() {
            return Err(KinematicsError::empty(self.label));
        }
        let sum: f64 = self.values.iter().sum();
        Ok(round_to(sum.abs() / self.values.len() as f64, MEAN_DECIMALS))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A signed quantity split into concentric and eccentric sample sets.
#[derive(Debug, Clone)]
pub struct PhaseBuckets {
    pub concentric: SampleAccumulator,
    pub eccentric: SampleAccumulator,
    concentric_negative: bool,
}

impl PhaseBuckets {
    /// `concentric_negative`: negative values belong to the concentric phase.
    pub fn new(concentric: &'static str, eccentric: &'static str, concentric_negative: bool) -> Self {
        Self {
            concentric: SampleAccumulator::new(concentric),
            eccentric: SampleAccumulator::new(eccentric),
            concentric_negative,
        }
    }

    pub fn push(&mut self, value: f64) {
        let concentric = if self.concentric_negative {
            value < 0.0
        } else {
            value > 0.0
        };
        if concentric {
            self.concentric.push(value);
        } else {
            self.eccentric.push(value);
        }
    }

    pub fn clear(&mut self) {
        self.concentric.clear();
        self.eccentric.clear();
    }
}

/// Running min/max of an angle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngleRange {
    bounds: Option<(f64, f64)>,
}

impl AngleRange {
    pub fn push(&mut self, angle_deg: f64) {
        self.bounds = Some(match self.bounds {
            Some((min, max)) => (min.min(angle_deg), max.max(angle_deg)),
            None => (angle_deg, angle_deg),
        });
    }

    pub fn min(&self) -> Option<f64> {
        self.bounds.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<f64> {
        self.bounds.map(|(_, max)| max)
    }

    /// Max minus min.
    pub fn span(&self) -> Option<f64> {
        self.bounds.map(|(min, max)| max - min)
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn clear(&mut self) {
        self.bounds = None;
    }
}

/// Frame-level significant-tension indicator sum.
#[derive(Debug, Clone)]
pub struct TensionCounter {
    threshold: f64,
    indicator_sum: u64,
    frames: u64,
    first_ts: Option<f64>,
    last_ts: Option<f64>,
}

impl TensionCounter {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            indicator_sum: 0,
            frames: 0,
            first_ts: None,
            last_ts: None,
        }
    }

    pub fn push(&mut self, effective_length: f64, timestamp_s: f64) {
        if effective_length >= self.threshold {
            self.indicator_sum += 1;
        }
        self.frames += 1;
        self.first_ts.get_or_insert(timestamp_s);
        self.last_ts = Some(timestamp_s);
    }

    pub fn indicator_sum(&self) -> u64 {
        self.indicator_sum
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Seconds spent at or above the threshold: indicator sum times the mean
    /// time per processed frame.
    pub fn seconds(&self) -> Result<f64> {
        let (first, last) = match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) if self.frames > 0 => (first, last),
            _ => return Err(KinematicsError::empty(Measure::TimeUnderTension.name())),
        };
        let per_frame = (last - first) / self.frames as f64;
        Ok(round_to(self.indicator_sum as f64 * per_frame, MEAN_DECIMALS))
    }
}

/// Per-rep mean concentric velocities for the fatigue estimate.
#[derive(Debug, Clone, Default)]
pub struct VelocityLossTracker {
    rep_means: Vec<f64>,
}

impl VelocityLossTracker {
    pub fn record(&mut self, mean_concentric_velocity: f64) {
        self.rep_means.push(mean_concentric_velocity);
    }

    pub fn rep_means(&self) -> &[f64] {
        &self.rep_means
    }

    /// `(max - min) / max × 100`, rounded to two decimals.
    pub fn velocity_lost(&self) -> Result<f64> {
        let max = self
            .rep_means
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or_else(|| KinematicsError::empty(Measure::VelocityLost.name()))?;
        let min = self.rep_means.iter().copied().fold(max, f64::min);
        if max == 0.0 {
            return Err(KinematicsError::DivisionByZero("fastest rep velocity is zero"));
        }
        Ok(round_to((max - min) / max * 100.0, PERCENT_DECIMALS))
    }
}

/// Collects (angle, torque) pairs while the rep count is strictly inside an
/// open interval.
#[derive(Debug, Clone)]
pub struct ProfileCollector {
    window: (f64, f64),
    profile: ResistanceProfile,
}

impl ProfileCollector {
    pub fn new(window: (f64, f64)) -> Self {
        Self {
            window,
            profile: ResistanceProfile::default(),
        }
    }

    pub fn sample(&mut self, rep_count: f64, angle_deg: f64, torque: f64) {
        if rep_count > self.window.0 && rep_count < self.window.1 {
            self.profile.push(angle_deg, torque);
        }
    }

    pub fn profile(&self) -> &ResistanceProfile {
        &self.profile
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// Athlete and load parameters in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadParameters {
    pub limb_length_m: f64,
    pub load_kg: f64,
}

/// Aggregator settings.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Requested measures, in report order, without duplicates.
    pub measures: Vec<Measure>,
    pub load: LoadParameters,
    /// Concentric samples have negative velocity.
    pub concentric_negative: bool,
    /// Effective-length fraction counted as significant tension.
    /// Typical: 0.05.
    pub tension_threshold: f64,
    /// Open rep-count interval sampled for the resistance profile.
    /// Typical: (1, 3).
    pub profile_window: (f64, f64),
}

impl AggregatorConfig {
    pub fn new(measures: Vec<Measure>, load: LoadParameters, concentric_negative: bool) -> Self {
        Self {
            measures,
            load,
            concentric_negative,
            tension_threshold: defaults::TENSION_THRESHOLD,
            profile_window: defaults::PROFILE_REP_WINDOW,
        }
    }
}

/// Values observed on one sampling tick.
/// What the aggregator sees of every processed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub angle_deg: f64,
    pub effective_length: f64,
    pub timestamp_s: f64,
    /// `None` when the measure is off or unsupported for this exercise.
    pub gravity_angle_deg: Option<f64>,
    pub reached_parallel: Option<bool>,
}

impl FrameInput {
    pub fn new(angle_deg: f64, effective_length: f64, timestamp_s: f64) -> Self {
        Self {
            angle_deg,
            effective_length,
            timestamp_s,
            gravity_angle_deg: None,
            reached_parallel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    pub angle_deg: f64,
    pub effective_length: f64,
    /// `None` until the rolling window holds a lagged pair.
    pub angular_velocity: Option<f64>,
    /// Rep count after this tick's segmenter update.
    pub rep_count: f64,
}

/// Accumulates per-measure statistics and flushes them per rep and per set.
#[derive(Debug, Clone)]
pub struct MetricAggregator {
    config: AggregatorConfig,
    kinematics: Kinematics,

    // Rep-scoped
    torque: SampleAccumulator,
    power: PhaseBuckets,
    speed: PhaseBuckets,
    rep_angles: AngleRange,
    gravity_angles: AngleRange,
    reached_parallel: bool,

    // Set-scoped
    tension: TensionCounter,
    set_angles: AngleRange,
    velocity_loss: VelocityLossTracker,
    profile: ProfileCollector,
    gravity_failure: Option<MeasureFailure>,
    flushed_reps: u32,
}

impl MetricAggregator {
    pub fn new(config: AggregatorConfig, kinematics: Kinematics) -> Self {
        let negative = config.concentric_negative;
        Self {
            torque: SampleAccumulator::new("torque"),
            power: PhaseBuckets::new("concentric power", "eccentric power", negative),
            speed: PhaseBuckets::new("concentric velocity", "eccentric velocity", negative),
            rep_angles: AngleRange::default(),
            gravity_angles: AngleRange::default(),
            reached_parallel: false,
            tension: TensionCounter::new(config.tension_threshold),
            set_angles: AngleRange::default(),
            velocity_loss: VelocityLossTracker::default(),
            profile: ProfileCollector::new(config.profile_window),
            gravity_failure: None,
            flushed_reps: 0,
            config,
            kinematics,
        }
    }

    pub fn wants(&self, measure: Measure) -> bool {
        self.config.measures.contains(&measure)
    }

    fn tracks_speed(&self) -> bool {
        self.wants(Measure::Speed) || self.wants(Measure::VelocityLost)
    }

    fn tracks_power(&self) -> bool {
        self.wants(Measure::Power) || self.wants(Measure::Work)
    }

    pub fn measures(&self) -> &[Measure] {
        &self.config.measures
    }

    /// Torque for an effective length with the configured limb and load.
    pub fn torque_at(&self, effective_length: f64) -> f64 {
        self.kinematics.torque(
            self.config.load.limb_length_m,
            self.config.load.load_kg,
            effective_length,
        )
    }

    /// Every processed frame, ticked or not.
    pub fn on_frame(&mut self, frame: &FrameInput) {
        self.tension.push(frame.effective_length, frame.timestamp_s);
        self.rep_angles.push(frame.angle_deg);
        self.set_angles.push(frame.angle_deg);

        if let Some(angle) = frame.gravity_angle_deg {
            self.gravity_angles.push(angle);
        }
        if frame.reached_parallel == Some(true) {
            self.reached_parallel = true;
        }
    }

    /// One sampling tick.
    pub fn on_tick(&mut self, tick: &TickInput) {
        let torque = self.torque_at(tick.effective_length);

        if self.wants(Measure::Torque) {
            self.torque.push(torque);
        }

        match tick.angular_velocity {
            Some(velocity) => {
                if self.tracks_speed() {
                    self.speed.push(velocity);
                }
                if self.tracks_power() {
                    self.power.push(self.kinematics.power(torque, velocity));
                }
            }
            None if self.tracks_speed() || self.tracks_power() => {
                debug!("Velocity not yet available; skipping speed and power for this tick");
            }
            None => {}
        }

        if self.wants(Measure::ResistanceProfile) {
            self.profile.sample(tick.rep_count, tick.angle_deg, torque);
        }
    }

    /// Disable the angle-with-gravity measure for the rest of the session.
    ///
    /// The failure is reported on every rep and on the set record.
    pub fn mark_gravity_angle_unsupported(&mut self, error: &KinematicsError) {
        if self.gravity_failure.is_none() {
            warn!("{}: {}", Measure::GravityAngle, error);
            self.gravity_failure = Some(MeasureFailure::new(Measure::GravityAngle, error));
        }
    }

    /// Build the record for a completed rep and clear rep-scoped state.
    ///
    /// `phase_times` is (concentric, eccentric) seconds for the rep.
    pub fn flush_rep(&mut self, rep: u32, phase_times: (f64, f64)) -> RepRecord {
        let mut record = RepRecord::new(rep);
        let measures = self.config.measures.clone();

        for measure in measures {
            if let Err(error) = self.flush_measure(measure, phase_times, &mut record) {
                warn!("{} for rep {}: {}", measure, rep, error);
                record.failures.push(MeasureFailure::new(measure, &error));
            }
        }

        self.clear_rep();
        self.flushed_reps = rep;
        record
    }

    fn flush_measure(
        &mut self,
        measure: Measure,
        (concentric_s, eccentric_s): (f64, f64),
        record: &mut RepRecord,
    ) -> Result<()> {
        let lines = &mut record.lines;
        match measure {
            Measure::Torque => {
                lines.push(MetricLine::number(measure, "Torque", self.torque.mean()?, "Nm"));
            }
            Measure::Power => {
                // Evaluate both before pushing so a record never holds half a pair.
                let conc = self.power.concentric.mean()?;
                let ecc = self.power.eccentric.mean()?;
                lines.push(MetricLine::number(measure, "Conc. power", conc, "W"));
                lines.push(MetricLine::number(measure, "Ecc. power", ecc, "W"));
            }
            Measure::Speed => {
                let conc = self.speed.concentric.mean()?;
                let ecc = self.speed.eccentric.mean()?;
                lines.push(MetricLine::number(measure, "Conc. velocity", conc, "rad/s"));
                lines.push(MetricLine::number(measure, "Ecc. velocity", ecc, "rad/s"));
            }
            Measure::VelocityLost => {
                self.velocity_loss.record(self.speed.concentric.mean()?);
            }
            Measure::Work => {
                let power = self.power.concentric.mean()?;
                let span = self
                    .rep_angles
                    .span()
                    .ok_or_else(|| KinematicsError::empty("rep angles"))?;
                lines.push(MetricLine::number(
                    measure,
                    "Work",
                    round_to(power * span, MEAN_DECIMALS),
                    "W·deg",
                ));
            }
            Measure::Angles => {
                let (min, max) = self
                    .rep_angles
                    .min()
                    .zip(self.rep_angles.max())
                    .ok_or_else(|| KinematicsError::empty("rep angles"))?;
                lines.push(MetricLine::number(measure, "Min angle", round_to(min, MEAN_DECIMALS), "deg"));
                lines.push(MetricLine::number(measure, "Max angle", round_to(max, MEAN_DECIMALS), "deg"));
            }
            Measure::Tempo => {
                lines.push(MetricLine::number(
                    measure,
                    "Concentric time",
                    round_to(concentric_s, MEAN_DECIMALS),
                    "s",
                ));
                lines.push(MetricLine::number(
                    measure,
                    "Eccentric time",
                    round_to(eccentric_s, MEAN_DECIMALS),
                    "s",
                ));
            }
            Measure::Parallel => {
                lines.push(MetricLine::flag(measure, "Parallel", self.reached_parallel));
            }
            Measure::GravityAngle => {
                if let Some(failure) = &self.gravity_failure {
                    record.failures.push(failure.clone());
                    return Ok(());
                }
                let (min, max) = self
                    .gravity_angles
                    .min()
                    .zip(self.gravity_angles.max())
                    .ok_or_else(|| KinematicsError::empty("angle with gravity"))?;
                lines.push(MetricLine::number(
                    measure,
                    "Min angle with gravity",
                    round_to(min, MEAN_DECIMALS),
                    "deg",
                ));
                lines.push(MetricLine::number(
                    measure,
                    "Max angle with gravity",
                    round_to(max, MEAN_DECIMALS),
                    "deg",
                ));
            }
            // Reported once per set.
            Measure::TimeUnderTension | Measure::ResistanceProfile => {}
        }
        Ok(())
    }

    fn clear_rep(&mut self) {
        self.torque.clear();
        self.power.clear();
        self.speed.clear();
        self.rep_angles.clear();
        self.gravity_angles.clear();
        self.reached_parallel = false;
    }

    /// Number of reps flushed so far.
    pub fn flushed_reps(&self) -> u32 {
        self.flushed_reps
    }

    /// Samples currently held for the rep in progress.
    pub fn pending_samples(&self) -> usize {
        self.torque.len()
            + self.power.concentric.len()
            + self.power.eccentric.len()
            + self.speed.concentric.len()
            + self.speed.eccentric.len()
    }

    pub fn resistance_profile(&self) -> &ResistanceProfile {
        self.profile.profile()
    }

    pub fn velocity_loss(&self) -> &VelocityLossTracker {
        &self.velocity_loss
    }

    pub fn tension(&self) -> &TensionCounter {
        &self.tension
    }

    /// Set-level record. Samples of an unfinished rep are not reported.
    pub fn finish(&self) -> SetRecord {
        let mut record = SetRecord::default();

        for &measure in &self.config.measures {
            if let Err(error) = self.finish_measure(measure, &mut record) {
                warn!("{} for set: {}", measure, error);
                record.failures.push(MeasureFailure::new(measure, &error));
            }
        }
        record
    }

    fn finish_measure(&self, measure: Measure, record: &mut SetRecord) -> Result<()> {
        match measure {
            Measure::TimeUnderTension => {
                record.lines.push(MetricLine::number(
                    measure,
                    "Time under significant tension",
                    self.tension.seconds()?,
                    "s",
                ));
            }
            Measure::Angles => {
                let (min, max) = self
                    .set_angles
                    .min()
                    .zip(self.set_angles.max())
                    .ok_or_else(|| KinematicsError::empty("set angles"))?;
                record.lines.push(MetricLine::number(measure, "Min angle", round_to(min, MEAN_DECIMALS), "deg"));
                record.lines.push(MetricLine::number(measure, "Max angle", round_to(max, MEAN_DECIMALS), "deg"));
            }
            Measure::VelocityLost => {
                record.lines.push(MetricLine::number(
                    measure,
                    "Velocity lost",
                    self.velocity_loss.velocity_lost()?,
                    "%",
                ));
            }
            Measure::ResistanceProfile => {
                if self.profile.profile().is_empty() {
                    return Err(KinematicsError::empty(measure.name()));
                }
            }
            Measure::GravityAngle => {
                if let Some(failure) = &self.gravity_failure {
                    record.failures.push(failure.clone());
                }
            }
            Measure::Torque
            | Measure::Power
            | Measure::Speed
            | Measure::Work
            | Measure::Tempo
            | Measure::Parallel => {}
        }
        Ok(())
    }
}
