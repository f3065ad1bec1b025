//! Bone and skeleton types.

use std::collections::HashMap;

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::transform::Transform2D;

/// A bone identifier.
///
/// Ids are opaque tokens generated by the caller (typically the editor
/// layer that owns entity identity); a skeleton only requires them to be
/// unique within itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoneId(pub u32);

impl BoneId {
    /// Creates a new bone ID.
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A bone in a 2D skeleton.
///
/// A bone extends `length` units along its local +X axis. `position` is
/// an offset from the parent's tip and `rotation` is relative to the
/// parent's world rotation. `world_position` locates the bone's origin
/// (not its tip).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bone {
    /// Unique identity token.
    pub id: BoneId,
    /// Human-readable name (uniqueness is enforced by callers).
    pub name: String,
    /// Bone length along the local +X axis (>= 0).
    pub length: f32,
    /// Local rotation in radians, relative to the parent's world rotation.
    pub rotation: f32,
    /// Local offset from the parent's bone tip.
    pub position: Vec2,
    /// Parent bone, if any. Non-owning back-reference; the skeleton's map
    /// owns bone lifetimes.
    parent: Option<BoneId>,
    /// Child bones, in insertion order.
    children: Vec<BoneId>,
    /// World position of the bone's origin. Recomputed by every FK pass,
    /// never hand-edited.
    pub world_position: Vec2,
    /// World rotation in radians. Recomputed by every FK pass, never
    /// hand-edited.
    pub world_rotation: f32,
}

impl Bone {
    /// Creates a new bone with the editor default length of 50 units.
    pub fn new(id: BoneId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            length: 50.0,
            rotation: 0.0,
            position: Vec2::ZERO,
            parent: None,
            children: Vec::new(),
            world_position: Vec2::ZERO,
            world_rotation: 0.0,
        }
    }

    /// Builder: set length.
    pub fn with_length(mut self, length: f32) -> Self {
        self.length = length;
        self
    }

    /// Builder: set local rotation (radians).
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: set local position offset.
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Returns the parent bone id, or `None` for a root.
    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    /// Returns the child bone ids, in insertion order.
    pub fn children(&self) -> &[BoneId] {
        &self.children
    }

    /// Returns the tip position in local space.
    pub fn tail_local(&self) -> Vec2 {
        Vec2::new(self.length, 0.0)
    }

    /// Returns the tip position in world space.
    ///
    /// Valid after an FK pass ([`Skeleton::update_world_transform`]).
    pub fn tail_world(&self) -> Vec2 {
        Transform2D::new(self.world_position, self.world_rotation).transform_point(self.tail_local())
    }

    /// Recomputes this bone's world pose from the supplied parent pose.
    ///
    /// `world_rotation` becomes `parent_rotation + rotation`;
    /// `world_position` is the local offset placed in the parent's frame.
    /// Children are not visited; the skeleton drives tree traversal,
    /// passing each bone's tip and world rotation down.
    pub fn update_world_transform(&mut self, parent_position: Vec2, parent_rotation: f32) {
        let world = Transform2D::new(parent_position, parent_rotation)
            .then(&Transform2D::new(self.position, self.rotation));
        self.world_position = world.position;
        self.world_rotation = world.rotation;
    }
}

/// A 2D skeleton: a forest of bone trees keyed by [`BoneId`].
///
/// The skeleton owns every bone's lifetime; `parent`/`children` links are
/// ids into its map. Rebuilding a skeleton wholesale each frame from
/// external editor state (`clear` then `add_bone` per entity) is an
/// expected usage pattern, not an anti-pattern.
///
/// Bone graphs must stay acyclic. Nothing here detects cycles (bones are
/// always built from an acyclic editor model); introducing one is a
/// caller bug and FK will not terminate on it.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Skeleton {
    bones: HashMap<BoneId, Bone>,
    roots: Vec<BoneId>,
}

impl Skeleton {
    /// Creates an empty skeleton.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bone, linking it under `parent` when given.
    ///
    /// A supplied parent id that does not resolve is reported as a
    /// warning and the bone is added as a root instead (recoverable, not
    /// fatal).
    pub fn add_bone(&mut self, mut bone: Bone, parent: Option<BoneId>) {
        let id = bone.id;
        let resolved = match parent {
            Some(pid) if self.bones.contains_key(&pid) => Some(pid),
            Some(pid) => {
                warn!(parent = ?pid, bone = ?id, "parent bone not found, adding as root");
                None
            }
            None => None,
        };
        bone.parent = resolved;
        bone.children.clear();
        self.bones.insert(id, bone);
        match resolved {
            Some(pid) => {
                if let Some(p) = self.bones.get_mut(&pid) {
                    p.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
    }

    /// Removes a bone and its entire subtree.
    ///
    /// No-op (with a warning) if the id is unknown.
    pub fn remove_bone(&mut self, id: BoneId) {
        let Some(parent) = self.bones.get(&id).map(|b| b.parent) else {
            warn!(bone = ?id, "remove_bone: unknown bone id");
            return;
        };
        match parent {
            Some(pid) => {
                if let Some(p) = self.bones.get_mut(&pid) {
                    p.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
        self.remove_subtree(id);
    }

    fn remove_subtree(&mut self, id: BoneId) {
        if let Some(bone) = self.bones.remove(&id) {
            for child in bone.children {
                self.remove_subtree(child);
            }
        }
    }

    /// Drops all bones; equivalent to a freshly constructed skeleton.
    pub fn clear(&mut self) {
        self.bones.clear();
        self.roots.clear();
    }

    /// Returns a bone by id.
    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(&id)
    }

    /// Returns a mutable bone by id.
    pub fn bone_mut(&mut self, id: BoneId) -> Option<&mut Bone> {
        self.bones.get_mut(&id)
    }

    /// Returns the number of bones.
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Returns true if the skeleton has no bones.
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Returns the root bone ids, in insertion order.
    pub fn roots(&self) -> &[BoneId] {
        &self.roots
    }

    /// Iterates over all bones (map order, not hierarchy order).
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.values()
    }

    /// Finds a bone by name.
    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.bones
            .values()
            .find(|b| b.name == name)
            .map(|b| b.id)
    }

    /// Recomputes world transforms for every bone, roots first.
    ///
    /// Each bone's children are evaluated from its tip (origin plus
    /// `length` along its world-rotated +X axis) and its world rotation;
    /// roots start at the origin with zero rotation. Must be called after
    /// any structural or rotational change before world poses are read.
    /// Cost is O(bone count).
    pub fn update_world_transform(&mut self) {
        let roots = self.roots.clone();
        for root in roots {
            self.update_subtree(root, Vec2::ZERO, 0.0);
        }
    }

    fn update_subtree(&mut self, id: BoneId, parent_position: Vec2, parent_rotation: f32) {
        let (tip, rotation, children) = match self.bones.get_mut(&id) {
            Some(bone) => {
                bone.update_world_transform(parent_position, parent_rotation);
                (bone.tail_world(), bone.world_rotation, bone.children.clone())
            }
            None => return,
        };
        for child in children {
            self.update_subtree(child, tip, rotation);
        }
    }
}
