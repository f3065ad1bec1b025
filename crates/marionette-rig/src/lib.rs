//! 2D bone hierarchies with forward kinematics and IK solving.
//!
//! Provides the skeletal core of a 2D animation editor: bones with
//! parent-relative transforms, full-tree FK propagation, and
//! inverse-kinematics solvers (FABRIK with soft angle limits and bend
//! hints, closed-form two-bone, CCD).
//!
//! The expected flow per frame: build or mutate a [`Skeleton`], run
//! [`Skeleton::update_world_transform`] to refresh world poses, hand a
//! root-to-effector [`IkChain`] to a solver, then re-run FK to read the
//! result. Solvers write each bone's local `rotation` in place.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use marionette_rig::{Bone, BoneId, IkChain, IkConfig, Skeleton, solve_fabrik};
//!
//! // A two-bone arm along +X.
//! let mut skeleton = Skeleton::new();
//! let upper = BoneId(0);
//! let lower = BoneId(1);
//! skeleton.add_bone(Bone::new(upper, "upper").with_length(50.0), None);
//! skeleton.add_bone(Bone::new(lower, "lower").with_length(50.0), Some(upper));
//! skeleton.update_world_transform();
//!
//! // Reach for a point, then refresh world poses to read the pose back.
//! let target = Vec2::new(50.0, 50.0);
//! let chain = IkChain::new(vec![upper, lower]);
//! let result = solve_fabrik(&mut skeleton, &chain, target, &IkConfig::default(), None);
//! assert!(result.reached);
//!
//! skeleton.update_world_transform();
//! let tip = skeleton.bone(lower).unwrap().tail_world();
//! assert!((tip - target).length() < 0.01);
//! ```

mod constraint;
mod ik;
mod skeleton;
mod transform;

pub use constraint::{BendDirection, apply_bend_direction, apply_soft_angle_limit};
pub use ik::{
    ChainConstraints, IkChain, IkConfig, IkResult, solve_analytical, solve_ccd, solve_fabrik,
};
pub use skeleton::{Bone, BoneId, Skeleton};
pub use transform::Transform2D;
