//! Soft joint constraints.
//!
//! Stateless helpers that act on a single bone's local rotation. The
//! FABRIK solver applies them per joint; they are also exported
//! standalone for callers building custom solve loops.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::skeleton::Bone;

/// Preferred bend side of a joint relative to a center angle.
///
/// Keeps knees and elbows from folding the wrong way during iterative
/// solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BendDirection {
    /// Positive (counter-clockwise) deviation from the center angle.
    CounterClockwise,
    /// Negative (clockwise) deviation from the center angle.
    Clockwise,
}

impl BendDirection {
    /// Returns the deviation sign for this direction (+1 or -1).
    pub fn sign(self) -> f32 {
        match self {
            BendDirection::CounterClockwise => 1.0,
            BendDirection::Clockwise => -1.0,
        }
    }
}

/// Pulls a bone's local rotation back toward `[min_angle, max_angle]`.
///
/// An out-of-range rotation is corrected by `spring_factor` (0..=1) of
/// the violation distance rather than hard-clamped, so one application
/// may leave the bone slightly out of range; repeated application over
/// solver iterations converges it. A factor of 0 disables correction, 1
/// clamps immediately.
pub fn apply_soft_angle_limit(bone: &mut Bone, min_angle: f32, max_angle: f32, spring_factor: f32) {
    let angle = bone.rotation;
    if angle < min_angle {
        bone.rotation += (min_angle - angle) * spring_factor;
    } else if angle > max_angle {
        bone.rotation -= (angle - max_angle) * spring_factor;
    }
}

/// Mirrors a bone's local rotation onto the preferred side of
/// `center_angle`.
///
/// A deviation on the wrong side is reflected to the preferred side at
/// the same magnitude; a rotation already on the preferred side is left
/// untouched.
pub fn apply_bend_direction(bone: &mut Bone, center_angle: f32, direction: BendDirection) {
    let offset = bone.rotation - center_angle;
    if offset * direction.sign() < 0.0 {
        bone.rotation = center_angle + direction.sign() * offset.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::BoneId;

    fn bone_with_rotation(rotation: f32) -> Bone {
        Bone::new(BoneId(0), "joint").with_rotation(rotation)
    }

    #[test]
    fn test_soft_limit_within_range_untouched() {
        let mut bone = bone_with_rotation(0.3);
        apply_soft_angle_limit(&mut bone, -0.5, 0.5, 0.2);
        assert_eq!(bone.rotation, 0.3);
    }

    #[test]
    fn test_soft_limit_converges_without_overshoot() {
        let mut bone = bone_with_rotation(2.0);
        let max = 0.5;
        let mut violation = bone.rotation - max;
        for _ in 0..50 {
            apply_soft_angle_limit(&mut bone, -0.5, max, 0.2);
            let next = bone.rotation - max;
            assert!(next >= 0.0, "spring-back must not cross the bound");
            assert!(next < violation, "violation must shrink every step");
            violation = next;
        }
        assert!(violation < 1e-4);
    }

    #[test]
    fn test_soft_limit_full_spring_clamps() {
        let mut bone = bone_with_rotation(-3.0);
        apply_soft_angle_limit(&mut bone, -0.5, 0.5, 1.0);
        assert!((bone.rotation - (-0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_soft_limit_zero_spring_disables() {
        let mut bone = bone_with_rotation(2.0);
        apply_soft_angle_limit(&mut bone, -0.5, 0.5, 0.0);
        assert_eq!(bone.rotation, 2.0);
    }

    #[test]
    fn test_bend_direction_mirrors_wrong_side() {
        let mut bone = bone_with_rotation(-0.4);
        apply_bend_direction(&mut bone, 0.0, BendDirection::CounterClockwise);
        assert!((bone.rotation - 0.4).abs() < 1e-6);

        let mut bone = bone_with_rotation(0.4);
        apply_bend_direction(&mut bone, 0.0, BendDirection::Clockwise);
        assert!((bone.rotation - (-0.4)).abs() < 1e-6);
    }

    #[test]
    fn test_bend_direction_keeps_preferred_side() {
        let mut bone = bone_with_rotation(0.7);
        apply_bend_direction(&mut bone, 0.2, BendDirection::CounterClockwise);
        assert_eq!(bone.rotation, 0.7);
    }

    #[test]
    fn test_bend_direction_respects_center() {
        // 0.1 is below the 0.5 center, so it is on the clockwise side.
        let mut bone = bone_with_rotation(0.1);
        apply_bend_direction(&mut bone, 0.5, BendDirection::CounterClockwise);
        assert!((bone.rotation - 0.9).abs() < 1e-6);
    }
}
