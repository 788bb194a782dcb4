//! Physical and numeric constants shared by every stage of the engine.
//!
//! There is exactly one definition of each value here. Geometry, torque and
//! velocity code reads them either directly (pure helpers) or through an
//! injected [`PhysicalConstants`] value so tests can pin gravity to a round
//! number.

/// Standard gravity in m/s² (CGPM 1901 conventional value).
pub const STANDARD_GRAVITY: f64 = 9.806_65;

/// Substitute for a zero law-of-cosines denominator (coincident landmarks).
///
/// This keeps the frame loop alive on degenerate input. It does not make the
/// resulting angle meaningful.
pub const DEGENERATE_DENOMINATOR: f64 = 0.001;

/// Inches to metres.
pub const METRES_PER_INCH: f64 = 0.0254;

/// Pounds to kilograms.
pub const KILOGRAMS_PER_POUND: f64 = 0.453_592;

/// Decimal places kept when averaging accumulated samples.
pub const MEAN_DECIMALS: i32 = 4;

/// Decimal places kept for the velocity-lost percentage.
pub const PERCENT_DECIMALS: i32 = 2;

/// Pose provider landmark ids (33-point body topology).
pub mod landmarks {
    pub const LEFT_SHOULDER: u32 = 11;
    pub const RIGHT_SHOULDER: u32 = 12;
    pub const LEFT_ELBOW: u32 = 13;
    pub const RIGHT_ELBOW: u32 = 14;
    pub const LEFT_WRIST: u32 = 15;
    pub const RIGHT_WRIST: u32 = 16;
    pub const LEFT_HIP: u32 = 23;
    pub const RIGHT_HIP: u32 = 24;
    pub const LEFT_KNEE: u32 = 25;
    pub const RIGHT_KNEE: u32 = 26;
    pub const LEFT_ANKLE: u32 = 27;
    pub const RIGHT_ANKLE: u32 = 28;
}

/// Defaults for the phase segmenter and aggregator.
pub mod defaults {
    /// Lower edge of the phase-transition band (degrees).
    pub const BAND_LOW_DEG: f64 = 80.0;
    /// Upper edge of the phase-transition band (degrees).
    pub const BAND_HIGH_DEG: f64 = 100.0;
    /// Frames between two sampling ticks.
    pub const CADENCE_FRAMES: u32 = 4;
    /// Lag (in processed frames) for the finite-difference velocity estimate.
    pub const VELOCITY_LAG: usize = 3;
    /// Rolling window depth. Must exceed the velocity lag.
    pub const WINDOW_DEPTH: usize = 8;
    /// Minimum effective-length fraction that counts as significant tension.
    pub const TENSION_THRESHOLD: f64 = 0.05;
    /// Vertical offset (pixels) of the synthetic gravity reference point.
    pub const VERTICAL_OFFSET_PX: f64 = 100.0;
    /// Resistance profile samples are taken while the rep count is strictly
    /// inside this interval. The first rep is a set-up rep.
    pub const PROFILE_REP_WINDOW: (f64, f64) = (1.0, 3.0);
}

/// Constants injected into the kinematics kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    /// Gravitational acceleration in m/s².
    pub gravity: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
        }
    }
}
