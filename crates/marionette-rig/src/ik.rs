//! Inverse kinematics solvers.
//!
//! Three strategies over a root-to-effector bone chain: iterative FABRIK
//! with optional soft constraints, closed-form two-bone solving via the
//! law of cosines, and CCD. All of them write each bone's local
//! `rotation` in place; callers re-run
//! [`Skeleton::update_world_transform`] afterward to refresh world poses.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constraint::{BendDirection, apply_bend_direction, apply_soft_angle_limit};
use crate::skeleton::{BoneId, Skeleton};

/// Configuration for iterative IK solving.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkConfig {
    /// Maximum iterations.
    pub max_iterations: u32,
    /// Distance threshold for success.
    pub tolerance: f32,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 0.001,
        }
    }
}

/// Result of an IK solve.
///
/// `iterations` is a diagnostic for UI metrics: 0 for an empty chain, 1
/// when FABRIK short-circuits on an unreachable target, otherwise the
/// iteration the solve stopped at (or the configured cap).
#[derive(Debug, Clone, Copy)]
pub struct IkResult {
    /// Whether the target was reached within tolerance.
    pub reached: bool,
    /// Final distance from end-effector to target.
    pub distance: f32,
    /// Number of iterations used.
    pub iterations: u32,
}

impl IkResult {
    fn aborted() -> Self {
        Self {
            reached: false,
            distance: f32::MAX,
            iterations: 0,
        }
    }
}

/// Per-joint soft constraints for a FABRIK solve.
///
/// Each array, when supplied, must have length >= the chain length;
/// shorter arrays panic on index rather than silently truncating.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChainConstraints {
    /// Minimum local angle per bone (radians). Applied only when
    /// `max_angles` is also present.
    pub min_angles: Option<Vec<f32>>,
    /// Maximum local angle per bone (radians).
    pub max_angles: Option<Vec<f32>>,
    /// Preferred bend side per bone, centered on zero.
    pub bend_directions: Option<Vec<BendDirection>>,
    /// Soft limit correction factor per iteration (0..=1).
    pub spring_factor: f32,
}

impl Default for ChainConstraints {
    fn default() -> Self {
        Self {
            min_angles: None,
            max_angles: None,
            bend_directions: None,
            spring_factor: 0.2,
        }
    }
}

/// A chain of bones for IK solving, ordered root to end-effector.
///
/// Consecutive entries must be parent and child in the skeleton.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkChain {
    /// Bones in the chain, root first.
    pub bones: Vec<BoneId>,
}

impl IkChain {
    /// Creates a new IK chain.
    pub fn new(bones: Vec<BoneId>) -> Self {
        Self { bones }
    }

    /// Creates a chain by walking up from `end_bone` at most `length`
    /// bones, then reversing into root-to-effector order.
    pub fn from_end_bone(skeleton: &Skeleton, end_bone: BoneId, length: usize) -> Self {
        let mut bones = Vec::with_capacity(length);
        let mut current = Some(end_bone);

        while let Some(id) = current {
            bones.push(id);
            if bones.len() >= length {
                break;
            }
            current = skeleton.bone(id).and_then(|b| b.parent());
        }

        bones.reverse();
        Self { bones }
    }

    /// Returns the root bone of the chain.
    pub fn root_bone(&self) -> Option<BoneId> {
        self.bones.first().copied()
    }

    /// Returns the end-effector bone.
    pub fn end_bone(&self) -> Option<BoneId> {
        self.bones.last().copied()
    }

    /// Returns the chain length.
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

/// Snapshots the chain's joint origins plus the synthesized end-effector
/// point (the last bone's tip), from current world poses.
///
/// Returns `None` (with a warning) if any chain id is not in the
/// skeleton.
fn joint_positions(skeleton: &Skeleton, chain: &IkChain) -> Option<Vec<Vec2>> {
    let n = chain.len();
    let mut positions = Vec::with_capacity(n + 1);
    for (i, &id) in chain.bones.iter().enumerate() {
        let Some(bone) = skeleton.bone(id) else {
            warn!(bone = ?id, "ik chain references a bone not in the skeleton");
            return None;
        };
        positions.push(bone.world_position);
        if i == n - 1 {
            positions.push(bone.tail_world());
        }
    }
    Some(positions)
}

/// Writes solved joint positions back as local bone rotations.
///
/// Each bone's rotation becomes the world angle of its segment minus its
/// parent's world rotation. The chain entry uses the real parent's
/// (pre-solve) world rotation; inside the chain the accumulated
/// post-constraint rotation of the previous bone is used, so re-running
/// FK reproduces the solved positions exactly when no constraints are
/// active.
fn apply_joint_positions(
    skeleton: &mut Skeleton,
    chain: &IkChain,
    positions: &[Vec2],
    constraints: Option<&ChainConstraints>,
) {
    let mut parent_rotation = chain
        .root_bone()
        .and_then(|id| skeleton.bone(id))
        .and_then(|b| b.parent())
        .and_then(|pid| skeleton.bone(pid))
        .map(|p| p.world_rotation)
        .unwrap_or(0.0);

    for (i, &id) in chain.bones.iter().enumerate() {
        let segment = positions[i + 1] - positions[i];
        let world_angle = segment.y.atan2(segment.x);
        let Some(bone) = skeleton.bone_mut(id) else {
            continue;
        };
        bone.rotation = world_angle - parent_rotation;
        if let Some(constraints) = constraints {
            if let (Some(min), Some(max)) = (&constraints.min_angles, &constraints.max_angles) {
                apply_soft_angle_limit(bone, min[i], max[i], constraints.spring_factor);
            }
            if let Some(directions) = &constraints.bend_directions {
                apply_bend_direction(bone, 0.0, directions[i]);
            }
        }
        parent_rotation += bone.rotation;
    }
}

// ============================================================================
// FABRIK (Forward And Backward Reaching Inverse Kinematics)
// ============================================================================

/// Solves a chain toward `target` with the FABRIK algorithm.
///
/// Joint positions are snapshotted from the current (pre-solve) world
/// poses, which must be up to date
/// ([`Skeleton::update_world_transform`]). A target beyond the chain's
/// total length skips iteration entirely: every joint is stretched in a
/// straight line toward it and the result reports one iteration.
/// Otherwise forward passes (pin the effector at the target, walk to the
/// root) alternate with backward passes (pin the root at its anchor,
/// walk out) until the effector is within `tolerance` or the iteration
/// cap is hit. Soft limits and bend hints from `constraints` are applied
/// per bone during rotation write-back.
///
/// Zero-length bones are tolerated; the degenerate direction falls back
/// to zero instead of producing NaN.
pub fn solve_fabrik(
    skeleton: &mut Skeleton,
    chain: &IkChain,
    target: Vec2,
    config: &IkConfig,
    constraints: Option<&ChainConstraints>,
) -> IkResult {
    let n = chain.len();
    if n == 0 {
        return IkResult::aborted();
    }
    let Some(mut positions) = joint_positions(skeleton, chain) else {
        return IkResult::aborted();
    };
    let lengths: Vec<f32> = chain
        .bones
        .iter()
        .filter_map(|&id| skeleton.bone(id).map(|b| b.length))
        .collect();
    let total_length: f32 = lengths.iter().sum();
    let root_position = positions[0];

    if root_position.distance(target) > total_length {
        // Unreachable: stretch every joint along the ray to the target.
        for i in 0..n {
            let direction = (target - positions[i]).normalize_or_zero();
            positions[i + 1] = positions[i] + direction * lengths[i];
        }
        apply_joint_positions(skeleton, chain, &positions, constraints);
        return IkResult {
            reached: false,
            distance: positions[n].distance(target),
            iterations: 1,
        };
    }

    let mut iterations = config.max_iterations;
    for iteration in 0..config.max_iterations {
        // Forward reaching: fix the effector at the target, walk to the
        // root re-placing each joint at bone length from its successor.
        positions[n] = target;
        for i in (0..n).rev() {
            let direction = (positions[i] - positions[i + 1]).normalize_or_zero();
            positions[i] = positions[i + 1] + direction * lengths[i];
        }
        // Backward reaching: re-fix the root at its anchor, walk outward.
        positions[0] = root_position;
        for i in 0..n {
            let direction = (positions[i + 1] - positions[i]).normalize_or_zero();
            positions[i + 1] = positions[i] + direction * lengths[i];
        }
        if positions[n].distance(target) < config.tolerance {
            iterations = iteration + 1;
            break;
        }
    }

    apply_joint_positions(skeleton, chain, &positions, constraints);
    let distance = positions[n].distance(target);
    IkResult {
        reached: distance < config.tolerance,
        distance,
        iterations,
    }
}

// ============================================================================
// Analytical two-bone solve
// ============================================================================

/// Solves a two-bone parent/child chain in closed form via the law of
/// cosines, elbow-up branch.
///
/// The distance from `bone1`'s origin to the target is clamped into
/// `[|l1 - l2|, l1 + l2]` before the trig, so unreachable targets
/// resolve to the closest reachable configuration (fully extended or
/// fully folded) instead of failing. `bone1`'s rotation is stored
/// relative to its parent's (pre-solve) world rotation, `bone2`'s
/// relative to `bone1`. World poses must be up to date before calling;
/// re-run FK afterward.
///
/// Both lengths must be positive; degenerate bones are reported and left
/// unmodified.
pub fn solve_analytical(skeleton: &mut Skeleton, bone1: BoneId, bone2: BoneId, target: Vec2) {
    let (base, l1, parent_rotation) = match skeleton.bone(bone1) {
        Some(b) => (
            b.world_position,
            b.length,
            b.parent()
                .and_then(|pid| skeleton.bone(pid))
                .map(|p| p.world_rotation)
                .unwrap_or(0.0),
        ),
        None => {
            warn!(bone = ?bone1, "solve_analytical: bone not in skeleton");
            return;
        }
    };
    let Some(l2) = skeleton.bone(bone2).map(|b| b.length) else {
        warn!(bone = ?bone2, "solve_analytical: bone not in skeleton");
        return;
    };
    if l1 <= 0.0 || l2 <= 0.0 {
        warn!(%l1, %l2, "solve_analytical: bone lengths must be positive");
        return;
    }

    let delta = target - base;
    let distance = delta
        .length()
        .clamp((l1 - l2).abs(), l1 + l2)
        .max(f32::EPSILON);

    // Interior angle at the joint between the bones.
    let cos_joint = (distance * distance - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
    let joint_angle = cos_joint.clamp(-1.0, 1.0).acos();

    // Angle from the base toward the target, pulled back by the angle
    // the first bone makes with the base-target line.
    let base_angle = delta.y.atan2(delta.x);
    let cos_base = (l1 * l1 + distance * distance - l2 * l2) / (2.0 * l1 * distance);
    let base_offset = cos_base.clamp(-1.0, 1.0).acos();

    if let Some(b) = skeleton.bone_mut(bone1) {
        b.rotation = base_angle - base_offset - parent_rotation;
    }
    if let Some(b) = skeleton.bone_mut(bone2) {
        b.rotation = joint_angle;
    }
}

// ============================================================================
// CCD (Cyclic Coordinate Descent)
// ============================================================================

/// Solves a chain toward `target` with cyclic coordinate descent.
///
/// Per iteration, walks the chain end to root, rotating each joint's
/// downstream segment so the effector swings toward the target. Uses the
/// same position snapshot and rotation write-back as
/// [`solve_fabrik`]; world poses must be up to date before calling.
pub fn solve_ccd(
    skeleton: &mut Skeleton,
    chain: &IkChain,
    target: Vec2,
    config: &IkConfig,
) -> IkResult {
    let n = chain.len();
    if n == 0 {
        return IkResult::aborted();
    }
    let Some(mut positions) = joint_positions(skeleton, chain) else {
        return IkResult::aborted();
    };

    let mut iterations = config.max_iterations;
    for iteration in 0..config.max_iterations {
        for i in (0..n).rev() {
            let pivot = positions[i];
            let to_end = positions[n] - pivot;
            let to_target = target - pivot;
            if to_end.length_squared() < 1e-8 || to_target.length_squared() < 1e-8 {
                continue;
            }
            let delta = to_target.y.atan2(to_target.x) - to_end.y.atan2(to_end.x);
            let rotation = Vec2::from_angle(delta);
            for position in positions.iter_mut().skip(i + 1) {
                *position = pivot + rotation.rotate(*position - pivot);
            }
        }
        if positions[n].distance(target) < config.tolerance {
            iterations = iteration + 1;
            break;
        }
    }

    apply_joint_positions(skeleton, chain, &positions, None);
    let distance = positions[n].distance(target);
    IkResult {
        reached: distance < config.tolerance,
        distance,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Bone;
    use std::f32::consts::FRAC_PI_2;

    fn chain_skeleton(lengths: &[f32]) -> (Skeleton, IkChain) {
        let mut skel = Skeleton::new();
        let mut bones = Vec::new();
        let mut parent = None;
        for (i, &length) in lengths.iter().enumerate() {
            let id = BoneId(i as u32);
            skel.add_bone(Bone::new(id, format!("bone{i}")).with_length(length), parent);
            bones.push(id);
            parent = Some(id);
        }
        skel.update_world_transform();
        (skel, IkChain::new(bones))
    }

    fn effector_tip(skeleton: &Skeleton, chain: &IkChain) -> Vec2 {
        let end = chain.end_bone().unwrap();
        skeleton.bone(end).unwrap().tail_world()
    }

    #[test]
    fn test_chain_from_end_bone() {
        let (skel, _) = chain_skeleton(&[50.0, 50.0, 50.0]);

        let chain = IkChain::from_end_bone(&skel, BoneId(2), 3);
        assert_eq!(chain.bones, vec![BoneId(0), BoneId(1), BoneId(2)]);

        let short = IkChain::from_end_bone(&skel, BoneId(2), 2);
        assert_eq!(short.bones, vec![BoneId(1), BoneId(2)]);
        assert_eq!(short.root_bone(), Some(BoneId(1)));
        assert_eq!(short.end_bone(), Some(BoneId(2)));
    }

    #[test]
    fn test_fabrik_empty_chain() {
        let mut skel = Skeleton::new();
        let result = solve_fabrik(
            &mut skel,
            &IkChain::new(vec![]),
            Vec2::new(10.0, 0.0),
            &IkConfig::default(),
            None,
        );
        assert_eq!(result.iterations, 0);
        assert!(!result.reached);
    }

    #[test]
    fn test_fabrik_converges_on_reachable_target() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 50.0, 50.0]);
        // Distance 140 of a 150 reach, off the chain axis.
        let target = Vec2::new(121.24356, 70.0);
        let config = IkConfig {
            max_iterations: 100,
            tolerance: 0.001,
        };

        let result = solve_fabrik(&mut skel, &chain, target, &config, None);
        assert!(result.reached);
        assert!(result.iterations <= config.max_iterations);
        assert!(result.distance < config.tolerance);

        // Re-running FK reproduces the solved pose.
        skel.update_world_transform();
        assert!((effector_tip(&skel, &chain) - target).length() < 2e-3);
    }

    #[test]
    fn test_fabrik_unreachable_stretches_straight() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 50.0, 50.0]);
        let target = Vec2::new(300.0, 400.0);

        let result = solve_fabrik(&mut skel, &chain, target, &IkConfig::default(), None);
        assert_eq!(result.iterations, 1);
        assert!(!result.reached);

        // Fully stretched: effector sits 150 units along the root-target
        // ray.
        skel.update_world_transform();
        let tip = effector_tip(&skel, &chain);
        assert!((tip - Vec2::new(90.0, 120.0)).length() < 1e-3);
        assert!((tip.length() - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_fabrik_single_bone_points_at_target() {
        let (mut skel, chain) = chain_skeleton(&[50.0]);
        let result = solve_fabrik(
            &mut skel,
            &chain,
            Vec2::new(0.0, 80.0),
            &IkConfig::default(),
            None,
        );
        assert_eq!(result.iterations, 1);

        skel.update_world_transform();
        let tip = effector_tip(&skel, &chain);
        assert!((tip - Vec2::new(0.0, 50.0)).length() < 1e-3);
    }

    #[test]
    fn test_fabrik_tolerates_zero_length_bone() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 0.0, 50.0]);
        solve_fabrik(
            &mut skel,
            &chain,
            Vec2::new(60.0, 30.0),
            &IkConfig::default(),
            None,
        );

        skel.update_world_transform();
        for &id in &chain.bones {
            let bone = skel.bone(id).unwrap();
            assert!(bone.rotation.is_finite());
            assert!(bone.world_position.is_finite());
        }
    }

    #[test]
    fn test_fabrik_missing_bone_is_reported_not_fatal() {
        let (mut skel, _) = chain_skeleton(&[50.0]);
        let chain = IkChain::new(vec![BoneId(0), BoneId(9)]);
        let result = solve_fabrik(
            &mut skel,
            &chain,
            Vec2::new(10.0, 10.0),
            &IkConfig::default(),
            None,
        );
        assert_eq!(result.iterations, 0);
        // The resolvable bone is left untouched.
        assert_eq!(skel.bone(BoneId(0)).unwrap().rotation, 0.0);
    }

    #[test]
    fn test_fabrik_soft_limits_pull_rotations_inward() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 50.0, 50.0]);
        let constraints = ChainConstraints {
            min_angles: Some(vec![-0.1; 3]),
            max_angles: Some(vec![0.1; 3]),
            spring_factor: 1.0,
            ..ChainConstraints::default()
        };
        solve_fabrik(
            &mut skel,
            &chain,
            Vec2::new(0.0, 120.0),
            &IkConfig::default(),
            Some(&constraints),
        );

        for &id in &chain.bones {
            let rotation = skel.bone(id).unwrap().rotation;
            assert!(rotation.abs() <= 0.1 + 1e-5);
        }
    }

    #[test]
    fn test_fabrik_bend_direction_keeps_joints_on_one_side() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 50.0, 50.0]);
        let constraints = ChainConstraints {
            bend_directions: Some(vec![BendDirection::CounterClockwise; 3]),
            ..ChainConstraints::default()
        };
        solve_fabrik(
            &mut skel,
            &chain,
            Vec2::new(80.0, -40.0),
            &IkConfig::default(),
            Some(&constraints),
        );

        for &id in &chain.bones {
            assert!(skel.bone(id).unwrap().rotation >= 0.0);
        }
    }

    #[test]
    fn test_analytical_fully_extended() {
        let (mut skel, _) = chain_skeleton(&[50.0, 50.0]);
        solve_analytical(&mut skel, BoneId(0), BoneId(1), Vec2::new(100.0, 0.0));

        assert!(skel.bone(BoneId(0)).unwrap().rotation.abs() < 1e-3);
        assert!(skel.bone(BoneId(1)).unwrap().rotation.abs() < 1e-3);
    }

    #[test]
    fn test_analytical_unreachable_clamps_to_extension() {
        let (mut skel, _) = chain_skeleton(&[50.0, 50.0]);
        solve_analytical(&mut skel, BoneId(0), BoneId(1), Vec2::new(1000.0, 0.0));

        let r0 = skel.bone(BoneId(0)).unwrap().rotation;
        let r1 = skel.bone(BoneId(1)).unwrap().rotation;
        assert!(r0.is_finite() && r1.is_finite());
        assert!(r0.abs() < 1e-3);
        assert!(r1.abs() < 1e-3);
    }

    #[test]
    fn test_analytical_right_angle_elbow() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 50.0]);
        let target = Vec2::new(50.0, 50.0);
        solve_analytical(&mut skel, BoneId(0), BoneId(1), target);

        // l1 = l2 = 50 against a distance of 50*sqrt(2): the elbow sits at
        // a right angle and the base angle cancels exactly.
        assert!(skel.bone(BoneId(0)).unwrap().rotation.abs() < 1e-3);
        assert!((skel.bone(BoneId(1)).unwrap().rotation - FRAC_PI_2).abs() < 1e-3);

        skel.update_world_transform();
        assert!((effector_tip(&skel, &chain) - target).length() < 1e-3);
    }

    #[test]
    fn test_analytical_inside_minimum_reach_folds() {
        let (mut skel, chain) = chain_skeleton(&[60.0, 30.0]);
        solve_analytical(&mut skel, BoneId(0), BoneId(1), Vec2::new(10.0, 0.0));

        skel.update_world_transform();
        // Closest reachable point is at the minimum reach of 30 units.
        let tip = effector_tip(&skel, &chain);
        assert!((tip - Vec2::new(30.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_analytical_respects_parent_rotation() {
        let mut skel = Skeleton::new();
        let anchor = BoneId(10);
        skel.add_bone(
            Bone::new(anchor, "anchor")
                .with_length(20.0)
                .with_rotation(FRAC_PI_2),
            None,
        );
        skel.add_bone(Bone::new(BoneId(0), "upper").with_length(50.0), Some(anchor));
        skel.add_bone(Bone::new(BoneId(1), "lower").with_length(50.0), Some(BoneId(0)));
        skel.update_world_transform();

        // Base sits at (0, 20) with the parent frame rotated 90 degrees.
        let target = Vec2::new(100.0, 20.0);
        solve_analytical(&mut skel, BoneId(0), BoneId(1), target);
        skel.update_world_transform();

        let tip = skel.bone(BoneId(1)).unwrap().tail_world();
        assert!((tip - target).length() < 1e-3);
        // Local rotation absorbs the parent's 90 degrees.
        assert!((skel.bone(BoneId(0)).unwrap().rotation + FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn test_analytical_degenerate_length_is_reported_not_fatal() {
        let (mut skel, _) = chain_skeleton(&[0.0, 50.0]);
        solve_analytical(&mut skel, BoneId(0), BoneId(1), Vec2::new(10.0, 10.0));

        assert_eq!(skel.bone(BoneId(0)).unwrap().rotation, 0.0);
        assert_eq!(skel.bone(BoneId(1)).unwrap().rotation, 0.0);
    }

    #[test]
    fn test_ccd_reachable() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 50.0]);
        let target = Vec2::new(60.0, 40.0);
        let config = IkConfig {
            max_iterations: 50,
            tolerance: 0.01,
        };

        let result = solve_ccd(&mut skel, &chain, target, &config);
        assert!(result.reached);

        skel.update_world_transform();
        assert!((effector_tip(&skel, &chain) - target).length() < 0.1);
    }

    #[test]
    fn test_ccd_unreachable() {
        let (mut skel, chain) = chain_skeleton(&[50.0, 50.0]);
        let result = solve_ccd(
            &mut skel,
            &chain,
            Vec2::new(500.0, 0.0),
            &IkConfig::default(),
        );
        assert!(!result.reached);
        assert_eq!(result.iterations, IkConfig::default().max_iterations);
    }
}
