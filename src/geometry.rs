//! Joint geometry from 2D landmarks.
//!
//! Pure functions over image-space points:
//! - Law-of-cosines joint angle
//! - Limb angle against a synthetic vertical (angle with gravity)
//! - Effective length: fraction of the limb perpendicular to gravity
//! - 1-D weighted centre of two point masses
//!
//! Plus [`Kinematics`], which turns an effective length into torque and power
//! using injected physical constants.
//!
//! Degenerate input (coincident points) never fails. The law-of-cosines
//! denominator is replaced by a small epsilon and a zero-length limb reports a
//! zero moment arm.

use log::debug;

use crate::constants::{PhysicalConstants, DEGENERATE_DENOMINATOR};
use crate::types::Point2;

/// Cosine of the angle at `p2` between segments `p2→p1` and `p2→p3`.
///
/// Computed from the three side lengths. When either segment at `p2` has zero
/// length the denominator is replaced by [`DEGENERATE_DENOMINATOR`]; the result
/// is then an approximation, not a precise value.
pub fn law_of_cosines_cos(p1: Point2, p2: Point2, p3: Point2) -> f64 {
    let side_a = p1.distance_to(&p2);
    let side_c = p3.distance_to(&p2);
    let side_b = p1.distance_to(&p3);

    let mut denominator = 2.0 * side_a * side_c;
    if denominator == 0.0 {
        debug!("Degenerate joint geometry at ({}, {}); substituting epsilon", p2.x, p2.y);
        denominator = DEGENERATE_DENOMINATOR;
    }

    (side_a * side_a + side_c * side_c - side_b * side_b) / denominator
}

/// Joint angle at `p2` in degrees, in [0, 180].
///
/// The cosine is clamped to [-1, 1] before the inverse cosine so floating
/// error on nearly collinear points cannot produce NaN.
pub fn angle_degrees(p1: Point2, p2: Point2, p3: Point2) -> f64 {
    law_of_cosines_cos(p1, p2, p3)
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees()
}

/// Angle in degrees between the limb `joint→limb_end` and the vertical.
///
/// A reference point is placed `vertical_offset_px` pixels below the joint
/// (image y grows downward; a negative offset places it above).
pub fn gravity_reference_angle(joint: Point2, limb_end: Point2, vertical_offset_px: f64) -> f64 {
    let reference = Point2::new(joint.x, joint.y + vertical_offset_px);
    angle_degrees(reference, joint, limb_end)
}

/// Fraction of the limb `joint→load_point` perpendicular to gravity.
///
/// Equal to `|Δx| / distance`, i.e. the sine of the limb's angle with the
/// vertical. Returns 0 for a zero-length limb. Always in [0, 1].
pub fn effective_length_fraction(load_point: Point2, joint: Point2) -> f64 {
    let total_length = load_point.distance_to(&joint);
    if total_length == 0.0 {
        debug!("Zero-length limb; reporting no moment arm");
        return 0.0;
    }
    ((load_point.x - joint.x).abs() / total_length).clamp(0.0, 1.0)
}

/// Weighted centre of two point masses along one axis.
///
/// Used to move the load application point toward the athlete's centre of
/// mass for lifts where the load travels with the body (squats, deadlifts).
/// With zero total mass the plain midpoint is returned.
pub fn weighted_center_1d(body_axis: f64, body_weight: f64, load_axis: f64, load_weight: f64) -> f64 {
    let total = body_weight + load_weight;
    if total == 0.0 {
        return (body_axis + load_axis) / 2.0;
    }
    (body_axis * body_weight + load_axis * load_weight) / total
}

/// Angle difference in degrees to radians.
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Torque and power from effective length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kinematics {
    constants: PhysicalConstants,
}

impl Kinematics {
    pub fn new(constants: PhysicalConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// Moment about the joint in N·m: `limb × load × effective_length × g`.
    pub fn torque(&self, limb_length_m: f64, load_kg: f64, effective_length: f64) -> f64 {
        limb_length_m * load_kg * effective_length * self.constants.gravity
    }

    /// Mechanical power in W: torque × angular velocity (rad/s).
    ///
    /// Signed; the sign follows the angular velocity.
    pub fn power(&self, torque_nm: f64, angular_velocity: f64) -> f64 {
        torque_nm * angular_velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn test_straight_limb_is_180() {
        let angle = angle_degrees(p(0.0, 0.0), p(50.0, 0.0), p(100.0, 0.0));
        assert_abs_diff_eq!(angle, 180.0, epsilon = 1e-6);
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_degrees(p(0.0, 0.0), p(50.0, 0.0), p(50.0, 50.0));
        assert_abs_diff_eq!(angle, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_folded_limb_is_zero() {
        let angle = angle_degrees(p(100.0, 0.0), p(0.0, 0.0), p(50.0, 0.0));
        assert_abs_diff_eq!(angle, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_coincident_points_use_epsilon() {
        let cos = law_of_cosines_cos(p(10.0, 10.0), p(10.0, 10.0), p(10.0, 10.0));
        assert_eq!(cos, 0.0);
        let angle = angle_degrees(p(10.0, 10.0), p(10.0, 10.0), p(10.0, 10.0));
        assert!(angle.is_finite());
    }

    #[test]
    fn test_gravity_angle_hanging_limb() {
        // Limb hanging straight down from the joint.
        let angle = gravity_reference_angle(p(100.0, 100.0), p(100.0, 300.0), 100.0);
        assert_abs_diff_eq!(angle, 0.0, epsilon = 1e-6);

        // Limb held horizontally.
        let angle = gravity_reference_angle(p(100.0, 100.0), p(300.0, 100.0), 100.0);
        assert_abs_diff_eq!(angle, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_effective_length_horizontal_is_one() {
        let fraction = effective_length_fraction(p(200.0, 100.0), p(100.0, 100.0));
        assert_abs_diff_eq!(fraction, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_effective_length_vertical_is_zero() {
        let fraction = effective_length_fraction(p(100.0, 300.0), p(100.0, 100.0));
        assert_abs_diff_eq!(fraction, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_effective_length_is_sine() {
        // 30 degrees from vertical.
        let theta = 30f64.to_radians();
        let load = p(100.0 + 200.0 * theta.sin(), 100.0 + 200.0 * theta.cos());
        let fraction = effective_length_fraction(load, p(100.0, 100.0));
        assert_abs_diff_eq!(fraction, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_effective_length_zero_limb() {
        assert_eq!(effective_length_fraction(p(5.0, 5.0), p(5.0, 5.0)), 0.0);
    }

    #[test]
    fn test_weighted_center() {
        // 80 kg athlete at x=100, 20 kg load at x=200.
        let x = weighted_center_1d(100.0, 80.0, 200.0, 20.0);
        assert_abs_diff_eq!(x, 120.0, epsilon = 1e-12);
        assert_eq!(weighted_center_1d(100.0, 0.0, 200.0, 0.0), 150.0);
    }

    #[test]
    fn test_torque_and_power() {
        let kin = Kinematics::new(PhysicalConstants { gravity: 10.0 });
        let torque = kin.torque(0.3, 15.0, 0.5);
        assert_abs_diff_eq!(torque, 22.5, epsilon = 1e-12);
        assert_abs_diff_eq!(kin.power(torque, -2.0), -45.0, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_angle_in_range(
            x1 in -2000.0f64..2000.0, y1 in -2000.0f64..2000.0,
            x2 in -2000.0f64..2000.0, y2 in -2000.0f64..2000.0,
            x3 in -2000.0f64..2000.0, y3 in -2000.0f64..2000.0,
        ) {
            let angle = angle_degrees(p(x1, y1), p(x2, y2), p(x3, y3));
            prop_assert!(angle.is_finite());
            prop_assert!((0.0..=180.0).contains(&angle));
        }

        #[test]
        fn prop_effective_length_in_unit_interval(
            x1 in -2000.0f64..2000.0, y1 in -2000.0f64..2000.0,
            x2 in -2000.0f64..2000.0, y2 in -2000.0f64..2000.0,
        ) {
            let fraction = effective_length_fraction(p(x1, y1), p(x2, y2));
            prop_assert!((0.0..=1.0).contains(&fraction));
        }
    }
}
