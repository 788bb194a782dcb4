//! Per-exercise policy: phase thresholds, landmark roles and load placement.
//!
//! The policy table maps a muscle-group key to an immutable
//! [`ExercisePolicy`]. It is built once and validated as a whole; a lookup for
//! a muscle group that is not in the table is a configuration error, never a
//! silent default.
//!
//! [`ExerciseProfile`] resolves a policy against a concrete exercise (name,
//! viewing side, limb choice) and answers the per-frame geometry questions:
//! joint angle, effective length, angle with gravity and squat depth.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, landmarks as lm};
use crate::error::{KinematicsError, Result};
use crate::geometry::{
    angle_degrees, effective_length_fraction, gravity_reference_angle, weighted_center_1d,
};
use crate::types::{Landmark, MovementPhase, Point2, Side};

// ============================================================================
// THRESHOLDS AND POLICY
// ============================================================================

/// Strategy deciding when a half rep is complete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum PhaseThresholds {
    /// A direction reversal ends the phase, provided the angle before the
    /// reversal lies on the correct side of the band. Tolerates noise inside
    /// the band but counts any qualifying reversal.
    Hysteresis { low: f64, high: f64 },
    /// The phase ends when the angle crosses `end` moving away from `start`;
    /// the return phase ends when it crosses back over `start`.
    Crossing { start: f64, end: f64 },
}

impl PhaseThresholds {
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| (0.0..=180.0).contains(&v);
        match *self {
            PhaseThresholds::Hysteresis { low, high } => {
                if !(in_range(low) && in_range(high) && low <= high) {
                    return Err(KinematicsError::InvalidConfig(format!(
                        "hysteresis band [{low}, {high}] must satisfy 0 <= low <= high <= 180"
                    )));
                }
            }
            PhaseThresholds::Crossing { start, end } => {
                if !(in_range(start) && in_range(end)) || start == end {
                    return Err(KinematicsError::InvalidConfig(format!(
                        "crossing angles {start}/{end} must be distinct and within [0, 180]"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Movement conventions of a muscle group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExercisePolicy {
    /// The movement starts with the muscle shortening.
    pub concentric_motion_first: bool,
    /// The joint angle decreases while the muscle shortens.
    pub angle_decreasing_on_concentric: bool,
    pub thresholds: PhaseThresholds,
}

impl ExercisePolicy {
    /// Policy using the default band, with the crossing strategy oriented
    /// along the direction of the first phase.
    pub fn new(concentric_motion_first: bool, angle_decreasing_on_concentric: bool) -> Self {
        let mut policy = Self {
            concentric_motion_first,
            angle_decreasing_on_concentric,
            thresholds: PhaseThresholds::Hysteresis {
                low: defaults::BAND_LOW_DEG,
                high: defaults::BAND_HIGH_DEG,
            },
        };
        policy.thresholds = policy.crossing_from_band(defaults::BAND_LOW_DEG, defaults::BAND_HIGH_DEG);
        policy
    }

    pub fn with_thresholds(mut self, thresholds: PhaseThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn initial_phase(&self) -> MovementPhase {
        if self.concentric_motion_first {
            MovementPhase::Shortening
        } else {
            MovementPhase::Lengthening
        }
    }

    /// True if the joint angle falls during the first phase of a rep.
    pub fn first_phase_decreases_angle(&self) -> bool {
        self.concentric_motion_first == self.angle_decreasing_on_concentric
    }

    /// Crossing thresholds spanning the band in the direction of travel.
    pub fn crossing_from_band(&self, low: f64, high: f64) -> PhaseThresholds {
        if self.first_phase_decreases_angle() {
            PhaseThresholds::Crossing { start: high, end: low }
        } else {
            PhaseThresholds::Crossing { start: low, end: high }
        }
    }

    /// True if a negative angular velocity means the concentric phase.
    ///
    /// Follows the start convention: groups that start shortening report
    /// concentric samples with a negative sign.
    pub fn concentric_velocity_negative(&self) -> bool {
        self.concentric_motion_first
    }
}

/// Muscle group targeted by an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroup {
    Chest,
    Biceps,
    Triceps,
    Deltoids,
    Back,
    Quadriceps,
    Hamstrings,
    Glutes,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 8] = [
        MuscleGroup::Chest,
        MuscleGroup::Biceps,
        MuscleGroup::Triceps,
        MuscleGroup::Deltoids,
        MuscleGroup::Back,
        MuscleGroup::Quadriceps,
        MuscleGroup::Hamstrings,
        MuscleGroup::Glutes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Deltoids => "deltoids",
            MuscleGroup::Back => "back",
            MuscleGroup::Quadriceps => "quadriceps",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Glutes => "glutes",
        }
    }

    pub fn is_upper_body(&self) -> bool {
        !self.is_lower_body()
    }

    pub fn is_lower_body(&self) -> bool {
        matches!(
            self,
            MuscleGroup::Quadriceps | MuscleGroup::Hamstrings | MuscleGroup::Glutes
        )
    }

    /// Base group named anywhere in a muscle description such as
    /// "quadriceps extension".
    pub fn parse(description: &str) -> Result<Self> {
        let lowered = description.trim().to_lowercase();
        lowered
            .split_whitespace()
            .find_map(|word| MuscleGroup::ALL.iter().copied().find(|g| g.name() == word))
            .ok_or_else(|| KinematicsError::UnknownMuscleGroup(description.to_string()))
    }
}

/// Muscle-group key → policy. Keys are lowercase; variant keys carry a
/// modifier ("chest stretch").
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: BTreeMap<String, ExercisePolicy>,
}

impl PolicyTable {
    /// The built-in table.
    pub fn standard() -> Self {
        let entries = [
            ("chest", ExercisePolicy::new(false, false)),
            ("chest stretch", ExercisePolicy::new(true, false)),
            ("biceps", ExercisePolicy::new(true, true)),
            ("triceps", ExercisePolicy::new(false, true)),
            ("deltoids", ExercisePolicy::new(true, false)),
            ("deltoids high", ExercisePolicy::new(false, false)),
            ("back", ExercisePolicy::new(true, true)),
            ("quadriceps", ExercisePolicy::new(false, false)),
            ("quadriceps extension", ExercisePolicy::new(true, false)),
            ("hamstrings", ExercisePolicy::new(true, true)),
            ("glutes", ExercisePolicy::new(false, true)),
        ];
        Self {
            policies: entries
                .into_iter()
                .map(|(key, policy)| (key.to_string(), policy))
                .collect(),
        }
    }

    /// Build a table from explicit entries and validate it.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, ExercisePolicy)>,
    {
        let table = Self {
            policies: entries
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Every base muscle group must be present and every policy well-formed.
    pub fn validate(&self) -> Result<()> {
        for group in MuscleGroup::ALL {
            if !self.policies.contains_key(group.name()) {
                return Err(KinematicsError::InvalidConfig(format!(
                    "policy table has no entry for '{}'",
                    group.name()
                )));
            }
        }
        for (key, policy) in &self.policies {
            MuscleGroup::parse(key)?;
            policy.thresholds.validate()?;
        }
        Ok(())
    }

    /// Resolve a muscle description: a variant key if one matches a modifier
    /// in the description, otherwise the base group.
    pub fn lookup(&self, description: &str) -> Result<(MuscleGroup, ExercisePolicy)> {
        let group = MuscleGroup::parse(description)?;
        let lowered = description.trim().to_lowercase();

        let variant = self.policies.iter().find(|(key, _)| {
            key.as_str() != group.name()
                && key.starts_with(group.name())
                && key[group.name().len()..]
                    .split_whitespace()
                    .all(|modifier| lowered.contains(modifier))
        });

        let policy = match variant {
            Some((_, policy)) => *policy,
            None => *self
                .policies
                .get(group.name())
                .ok_or_else(|| KinematicsError::UnknownMuscleGroup(description.to_string()))?,
        };
        Ok((group, policy))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// LANDMARK ROLES
// ============================================================================

/// Landmarks of one frame, addressed by id.
#[derive(Debug, Clone, Copy)]
pub struct LandmarkFrame<'a> {
    landmarks: &'a [Landmark],
}

impl<'a> LandmarkFrame<'a> {
    pub fn new(landmarks: &'a [Landmark]) -> Self {
        Self { landmarks }
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn get(&self, id: u32) -> Result<Point2> {
        self.landmarks
            .iter()
            .find(|l| l.id == id)
            .map(Landmark::point)
            .ok_or(KinematicsError::MissingLandmark(id))
    }
}

/// The three points tracked for the joint angle; `joint` is the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkRoles {
    pub proximal: u32,
    pub joint: u32,
    pub distal: u32,
}

impl LandmarkRoles {
    const fn new(proximal: u32, joint: u32, distal: u32) -> Self {
        Self {
            proximal,
            joint,
            distal,
        }
    }
}

/// How the load acts on the tracked limb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPoint {
    /// Load at the distal landmark (dumbbell in hand for curls).
    LimbEnd,
    /// Load at another landmark (bar held at the wrist for chest work).
    Landmark(u32),
    /// Load travels with the body: its x is blended with the hip x, weighted
    /// by body mass and external load.
    BlendedWithHip { load: u32, hip: u32 },
}

/// Exercise-name driven placement of the load.
fn load_point_for(exercise: &str, muscle: MuscleGroup, right: bool) -> LoadPoint {
    let name = exercise.to_lowercase();
    let pick = |left_id: u32, right_id: u32| if right { right_id } else { left_id };
    let hip = pick(lm::LEFT_HIP, lm::RIGHT_HIP);

    if name.contains("squat") {
        LoadPoint::BlendedWithHip {
            load: pick(lm::LEFT_SHOULDER, lm::RIGHT_SHOULDER),
            hip,
        }
    } else if name.contains("deadlift") {
        LoadPoint::BlendedWithHip {
            load: pick(lm::LEFT_WRIST, lm::RIGHT_WRIST),
            hip,
        }
    } else if name.contains("hip") || name.contains("bridge") {
        LoadPoint::BlendedWithHip { load: hip, hip }
    } else if matches!(
        muscle,
        MuscleGroup::Chest | MuscleGroup::Back | MuscleGroup::Deltoids
    ) {
        LoadPoint::Landmark(pick(lm::LEFT_WRIST, lm::RIGHT_WRIST))
    } else {
        LoadPoint::LimbEnd
    }
}

/// Side-view roles for a muscle group.
fn profile_roles(muscle: MuscleGroup, right: bool) -> LandmarkRoles {
    use MuscleGroup::*;
    match (muscle, right) {
        (Chest | Biceps | Triceps, true) => {
            LandmarkRoles::new(lm::RIGHT_SHOULDER, lm::RIGHT_ELBOW, lm::RIGHT_WRIST)
        }
        (Chest | Biceps | Triceps, false) => {
            LandmarkRoles::new(lm::LEFT_SHOULDER, lm::LEFT_ELBOW, lm::LEFT_WRIST)
        }
        (Deltoids | Back, true) => {
            LandmarkRoles::new(lm::RIGHT_ELBOW, lm::RIGHT_SHOULDER, lm::RIGHT_HIP)
        }
        (Deltoids | Back, false) => {
            LandmarkRoles::new(lm::LEFT_ELBOW, lm::LEFT_SHOULDER, lm::LEFT_HIP)
        }
        (Quadriceps | Hamstrings, true) => {
            LandmarkRoles::new(lm::RIGHT_HIP, lm::RIGHT_KNEE, lm::RIGHT_ANKLE)
        }
        (Quadriceps | Hamstrings, false) => {
            LandmarkRoles::new(lm::LEFT_HIP, lm::LEFT_KNEE, lm::LEFT_ANKLE)
        }
        (Glutes, true) => LandmarkRoles::new(lm::RIGHT_SHOULDER, lm::RIGHT_HIP, lm::RIGHT_KNEE),
        (Glutes, false) => LandmarkRoles::new(lm::LEFT_SHOULDER, lm::LEFT_HIP, lm::LEFT_KNEE),
    }
}

/// Geometry used to read the joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewGeometry {
    /// Limb seen in profile: angle between the three role landmarks.
    Profile { roles: LandmarkRoles, load: LoadPoint },
    /// Upper body seen from the front or back: upper arm against a vertical
    /// dropped from the shoulder; effective length from the wrist.
    Frontal { elbow: u32, shoulder: u32, wrist: u32 },
}

// ============================================================================
// RESOLVED EXERCISE PROFILE
// ============================================================================

/// Body and load masses needed to place a blended load point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassDistribution {
    pub body_weight_kg: f64,
    pub load_kg: f64,
}

/// A policy resolved for one concrete exercise and camera view.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseProfile {
    pub exercise: String,
    pub muscle: MuscleGroup,
    pub side: Side,
    pub policy: ExercisePolicy,
    pub view: ViewGeometry,
    vertical_offset_px: f64,
}

impl ExerciseProfile {
    /// Resolve against the policy table. Fails for lower-body muscles viewed
    /// from the front or back, which have no joint mapping.
    pub fn resolve(
        table: &PolicyTable,
        exercise: &str,
        muscle_description: &str,
        side: Side,
        right_side: bool,
    ) -> Result<Self> {
        let (muscle, policy) = table.lookup(muscle_description)?;

        let view = if side.is_profile() {
            let right = side == Side::Right;
            ViewGeometry::Profile {
                roles: profile_roles(muscle, right),
                load: load_point_for(exercise, muscle, right),
            }
        } else if muscle.is_upper_body() {
            if right_side {
                ViewGeometry::Frontal {
                    elbow: lm::RIGHT_ELBOW,
                    shoulder: lm::RIGHT_SHOULDER,
                    wrist: lm::RIGHT_WRIST,
                }
            } else {
                ViewGeometry::Frontal {
                    elbow: lm::LEFT_ELBOW,
                    shoulder: lm::LEFT_SHOULDER,
                    wrist: lm::LEFT_WRIST,
                }
            }
        } else {
            return Err(KinematicsError::UnsupportedViewingSide {
                muscle: muscle.name().to_string(),
                side: side.to_string(),
                reason: "front and back views are only supported for upper body muscles",
            });
        };

        Ok(Self {
            exercise: exercise.to_string(),
            muscle,
            side,
            policy,
            view,
            vertical_offset_px: defaults::VERTICAL_OFFSET_PX,
        })
    }

    pub fn with_thresholds(mut self, thresholds: PhaseThresholds) -> Self {
        self.policy = self.policy.with_thresholds(thresholds);
        self
    }

    fn is_squat(&self) -> bool {
        self.exercise.to_lowercase().contains("squat")
    }

    fn is_deadlift(&self) -> bool {
        self.exercise.to_lowercase().contains("deadlift")
    }

    /// Joint angle in degrees for one frame.
    pub fn joint_angle(&self, frame: &LandmarkFrame<'_>) -> Result<f64> {
        match self.view {
            ViewGeometry::Profile { roles, .. } => Ok(angle_degrees(
                frame.get(roles.proximal)?,
                frame.get(roles.joint)?,
                frame.get(roles.distal)?,
            )),
            ViewGeometry::Frontal {
                elbow, shoulder, ..
            } => {
                let shoulder = frame.get(shoulder)?;
                Ok(gravity_reference_angle(
                    shoulder,
                    frame.get(elbow)?,
                    self.vertical_offset_px,
                ))
            }
        }
    }

    /// Fraction of the loaded limb perpendicular to gravity for one frame.
    pub fn effective_length(&self, frame: &LandmarkFrame<'_>, masses: MassDistribution) -> Result<f64> {
        match self.view {
            ViewGeometry::Profile { roles, load } => {
                let joint = frame.get(roles.joint)?;
                let load_point = match load {
                    LoadPoint::LimbEnd => frame.get(roles.distal)?,
                    LoadPoint::Landmark(id) => frame.get(id)?,
                    LoadPoint::BlendedWithHip { load, hip } => {
                        let load_point = frame.get(load)?;
                        let hip = frame.get(hip)?;
                        let x = weighted_center_1d(
                            hip.x,
                            masses.body_weight_kg,
                            load_point.x,
                            masses.load_kg,
                        );
                        Point2::new(x, load_point.y)
                    }
                };
                Ok(effective_length_fraction(load_point, joint))
            }
            ViewGeometry::Frontal {
                shoulder, wrist, ..
            } => Ok(effective_length_fraction(frame.get(wrist)?, frame.get(shoulder)?)),
        }
    }

    /// Whether the angle with gravity has a definition for this exercise.
    pub fn supports_gravity_angle(&self) -> Result<()> {
        if self.is_squat() || self.is_deadlift() {
            return Err(KinematicsError::UnsupportedViewingSide {
                muscle: self.muscle.name().to_string(),
                side: self.side.to_string(),
                reason: "no gravity-relative limb for squats and deadlifts",
            });
        }
        Ok(())
    }

    /// Angle between the moving limb and the vertical for one frame.
    pub fn gravity_angle(&self, frame: &LandmarkFrame<'_>) -> Result<f64> {
        self.supports_gravity_angle()?;
        match self.view {
            ViewGeometry::Profile { roles, .. } => Ok(gravity_reference_angle(
                frame.get(roles.joint)?,
                frame.get(roles.distal)?,
                self.vertical_offset_px,
            )),
            ViewGeometry::Frontal { .. } => self.joint_angle(frame),
        }
    }

    /// Whether squat depth can be judged for this exercise.
    pub fn supports_depth_check(&self) -> bool {
        self.is_squat() && self.side.is_profile() && self.muscle.is_lower_body()
    }

    /// True if the hip is level with or below the knee (image y grows down).
    pub fn reached_parallel(&self, frame: &LandmarkFrame<'_>) -> Result<bool> {
        let (hip, knee) = match (self.muscle, self.view) {
            (MuscleGroup::Quadriceps | MuscleGroup::Hamstrings, ViewGeometry::Profile { roles, .. }) => {
                (roles.proximal, roles.joint)
            }
            (MuscleGroup::Glutes, ViewGeometry::Profile { roles, .. }) => (roles.joint, roles.distal),
            _ => return Ok(false),
        };
        Ok(frame.get(hip)?.y >= frame.get(knee)?.y)
    }
}
