//! Rigid 2D transforms for bone hierarchies.

use glam::{Mat3, Vec2};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid 2D transform (position and rotation, no scale).
///
/// Bones do not model scale, so composing two transforms reduces to an
/// angle sum and a rotated offset. Rotations are in radians,
/// counter-clockwise under the usual right-handed convention;
/// screen-space callers account for their Y-axis inversion themselves.
/// [`Transform2D::to_matrix`] bridges to a homogeneous 3x3 matrix when a
/// caller needs one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform2D {
    /// Position in parent space.
    pub position: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    /// Identity transform (no translation, no rotation).
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
    };

    /// Creates a new transform.
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    /// Creates a transform with only position.
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Creates a transform with only rotation.
    pub fn from_rotation(rotation: f32) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Combines two transforms (self then other).
    ///
    /// `parent.then(&local)` places `local` in `parent`'s frame; this is
    /// the matrix product `parent * local` and is not commutative.
    pub fn then(&self, other: &Transform2D) -> Transform2D {
        Transform2D {
            position: self.position + Vec2::from_angle(self.rotation).rotate(other.position),
            rotation: self.rotation + other.rotation,
        }
    }

    /// Returns the inverse transform.
    pub fn inverse(&self) -> Transform2D {
        Transform2D {
            position: Vec2::from_angle(-self.rotation).rotate(-self.position),
            rotation: -self.rotation,
        }
    }

    /// Transforms a point from local space to parent space.
    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        self.position + Vec2::from_angle(self.rotation).rotate(point)
    }

    /// Transforms a direction (ignores position).
    pub fn transform_vector(&self, vector: Vec2) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(vector)
    }

    /// Converts to a homogeneous 3x3 matrix.
    pub fn to_matrix(&self) -> Mat3 {
        Mat3::from_translation(self.position) * Mat3::from_angle(self.rotation)
    }

    /// Creates a transform from a homogeneous 3x3 matrix.
    ///
    /// Note: This assumes the matrix is rigid (rotation + translation
    /// only, no scale or shear).
    pub fn from_matrix(matrix: Mat3) -> Self {
        Self {
            position: matrix.z_axis.truncate(),
            rotation: matrix.x_axis.y.atan2(matrix.x_axis.x),
        }
    }
}

impl From<Transform2D> for Mat3 {
    fn from(t: Transform2D) -> Self {
        t.to_matrix()
    }
}

impl From<Mat3> for Transform2D {
    fn from(m: Mat3) -> Self {
        Transform2D::from_matrix(m)
    }
}
