//! Phase segmentation and rep counting.
//!
//! This module turns the sampled joint angle into movement phases and rep
//! boundaries.
//!
//! Design: two-state machine (Shortening / Lengthening) + half-rep counter
//! - One update per sampling tick, comparing the current and previous angle
//! - Each phase flip adds half a rep
//! - A boundary event fires when the count reaches a whole number that has not
//!   been flushed yet
//! - Time between ticks accrues to the phase in progress (tempo)
//!
//! Frames without landmarks never reach the segmenter, so a detection gap is
//! not a transition.

use log::{debug, info};

use crate::profile::{ExercisePolicy, PhaseThresholds};
use crate::types::{MovementPhase, SegmentEvent};

/// Mutable per-session phase state.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseState {
    pub phase: MovementPhase,
    /// Angle from the previous tick; `None` before the first tick.
    pub last_angle: Option<f64>,
    last_timestamp: Option<f64>,
    /// Seconds accumulated in the concentric phase since the last take.
    pub concentric_s: f64,
    /// Seconds accumulated in the eccentric phase since the last take.
    pub eccentric_s: f64,
    /// Seconds spent in the current phase.
    pub phase_elapsed_s: f64,
}

impl PhaseState {
    fn new(initial: MovementPhase) -> Self {
        Self {
            phase: initial,
            last_angle: None,
            last_timestamp: None,
            concentric_s: 0.0,
            eccentric_s: 0.0,
            phase_elapsed_s: 0.0,
        }
    }

    fn accrue(&mut self, dt: f64) {
        if self.phase.is_concentric() {
            self.concentric_s += dt;
        } else {
            self.eccentric_s += dt;
        }
        self.phase_elapsed_s += dt;
    }
}

/// Half-rep counter with once-only boundary detection.
///
/// Counts in half reps so the count is exact; `rep_count()` converts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepCounter {
    half_reps: u32,
    last_flushed: u32,
}

impl RepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rep_count(&self) -> f64 {
        f64::from(self.half_reps) / 2.0
    }

    pub fn half_reps(&self) -> u32 {
        self.half_reps
    }

    pub fn last_flushed(&self) -> u32 {
        self.last_flushed
    }

    /// Add half a rep. Returns the rep number if a new whole rep was reached.
    pub fn increment_half(&mut self) -> Option<u32> {
        self.half_reps += 1;
        let whole = self.half_reps / 2;
        if self.half_reps % 2 == 0 && whole > self.last_flushed {
            self.last_flushed = whole;
            Some(whole)
        } else {
            None
        }
    }
}

/// Rep-counting state machine.
#[derive(Debug, Clone)]
pub struct PhaseSegmenter {
    policy: ExercisePolicy,
    state: PhaseState,
    counter: RepCounter,

    // Diagnostics
    ticks: u64,
}

impl PhaseSegmenter {
    pub fn new(policy: ExercisePolicy) -> Self {
        Self {
            state: PhaseState::new(policy.initial_phase()),
            policy,
            counter: RepCounter::new(),
            ticks: 0,
        }
    }

    /// Process one sampling tick.
    ///
    /// Returns the events produced by this tick: at most one phase change,
    /// followed by a rep completion if the change closed a whole rep. The
    /// first tick only records the angle.
    pub fn update(&mut self, angle_deg: f64, timestamp_s: f64) -> Vec<SegmentEvent> {
        self.ticks += 1;
        let mut events = Vec::new();

        let previous = match (self.state.last_angle, self.state.last_timestamp) {
            (Some(angle), Some(ts)) => Some((angle, ts)),
            _ => None,
        };
        self.state.last_angle = Some(angle_deg);
        self.state.last_timestamp = Some(timestamp_s);

        let Some((prev_angle, prev_ts)) = previous else {
            return events;
        };

        self.state.accrue((timestamp_s - prev_ts).max(0.0));

        if !self.phase_complete(prev_angle, angle_deg) {
            return events;
        }

        let from = self.state.phase;
        let to = from.opposite();
        let phase_duration_s = self.state.phase_elapsed_s;
        self.state.phase = to;
        self.state.phase_elapsed_s = 0.0;

        let completed = self.counter.increment_half();
        debug!(
            "Phase {} -> {} at {:.1} deg (count {})",
            from.label(),
            to.label(),
            angle_deg,
            self.counter.rep_count()
        );

        events.push(SegmentEvent::PhaseChanged {
            from,
            to,
            rep_count: self.counter.rep_count(),
            phase_duration_s,
        });
        if let Some(rep) = completed {
            info!("Rep {rep} completed");
            events.push(SegmentEvent::RepCompleted { rep });
        }
        events
    }

    /// True if the angle is falling during the current phase.
    fn angle_falling(&self) -> bool {
        match self.state.phase {
            MovementPhase::Shortening => self.policy.angle_decreasing_on_concentric,
            MovementPhase::Lengthening => !self.policy.angle_decreasing_on_concentric,
        }
    }

    fn phase_complete(&self, prev: f64, angle: f64) -> bool {
        match self.policy.thresholds {
            PhaseThresholds::Hysteresis { low, high } => {
                if self.angle_falling() {
                    // Bottom reversal, only once the angle has come down past the band top.
                    angle > prev && prev <= high
                } else {
                    angle < prev && prev >= low
                }
            }
            PhaseThresholds::Crossing { start, end } => {
                let dir = (end - start).signum();
                if self.state.phase == self.policy.initial_phase() {
                    (angle - end) * dir >= 0.0 && (prev - end) * dir < 0.0
                } else {
                    (angle - start) * dir <= 0.0 && (prev - start) * dir > 0.0
                }
            }
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MovementPhase {
        self.state.phase
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn counter(&self) -> &RepCounter {
        &self.counter
    }

    pub fn rep_count(&self) -> f64 {
        self.counter.rep_count()
    }

    pub fn policy(&self) -> &ExercisePolicy {
        &self.policy
    }

    /// Concentric and eccentric seconds since the last call, then zeroed.
    pub fn take_phase_times(&mut self) -> (f64, f64) {
        let times = (self.state.concentric_s, self.state.eccentric_s);
        self.state.concentric_s = 0.0;
        self.state.eccentric_s = 0.0;
        times
    }

    /// Get total ticks processed.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Return to the initial phase with a zero count.
    pub fn reset(&mut self) {
        self.state = PhaseState::new(self.policy.initial_phase());
        self.counter = RepCounter::new();
        self.ticks = 0;
    }
}
