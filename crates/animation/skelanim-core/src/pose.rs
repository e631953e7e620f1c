//! Pose buffers: flat arrays of local bone transforms sized to a bone container.

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::bone_container::BoneContainer;
use crate::transform::Transform;

/// Shared behaviour of pose buffers. The validation passes are O(bones) and
/// meant for tests and guards, not the per-tick path.
pub trait BasePose {
    fn bones(&self) -> &[Transform];
    fn bones_mut(&mut self) -> &mut [Transform];

    #[inline]
    fn num_bones(&self) -> usize {
        self.bones().len()
    }

    /// Identity rotation and zero scale on every bone.
    fn reset_to_additive_identity(&mut self) {
        for bone in self.bones_mut() {
            *bone = Transform::additive_identity();
        }
    }

    /// Identity rotation and unit scale on every bone.
    fn reset_to_identity(&mut self) {
        for bone in self.bones_mut() {
            *bone = Transform::identity();
        }
    }

    fn normalize_rotations(&mut self) {
        for bone in self.bones_mut() {
            bone.normalize_rotation();
        }
    }

    fn contains_nan(&self) -> bool {
        self.bones().iter().any(Transform::contains_nan)
    }

    fn is_normalized(&self) -> bool {
        self.bones().iter().all(Transform::is_rotation_normalized)
    }
}

/// Local transforms for every compact bone of a [`BoneContainer`].
#[derive(Clone, Debug)]
pub struct CompactPose {
    bones: Vec<Transform>,
    container: Arc<BoneContainer>,
}

impl CompactPose {
    /// A pose in the container's reference pose.
    pub fn new(container: Arc<BoneContainer>) -> Self {
        let mut pose = Self {
            bones: Vec::with_capacity(container.num_bones()),
            container,
        };
        pose.reset_to_ref_pose();
        pose
    }

    #[inline]
    pub fn container(&self) -> &Arc<BoneContainer> {
        &self.container
    }

    /// Rebind to another container and reset to its reference pose.
    pub fn set_bone_container(&mut self, container: Arc<BoneContainer>) {
        self.container = container;
        self.reset_to_ref_pose();
    }

    /// Re-derive every bone. An installed override or the cached compact
    /// reference pose is used unless the container carries a mesh skeleton,
    /// in which case the mesh's bind pose is read through the skeleton-index
    /// indirection.
    pub fn reset_to_ref_pose(&mut self) {
        match self.container.mesh() {
            Some(mesh) if !self.container.has_ref_pose_override() => {
                let bind = mesh.bind_pose();
                self.bones.clear();
                self.bones.extend(
                    self.container
                        .compact_to_skeleton_indices()
                        .iter()
                        .map(|&skel| bind[skel]),
                );
            }
            _ => self.container.fill_with_compact_ref_pose(&mut self.bones),
        }
    }

    #[inline]
    pub fn get(&self, compact_index: usize) -> Option<&Transform> {
        self.bones.get(compact_index)
    }

    #[inline]
    pub fn get_mut(&mut self, compact_index: usize) -> Option<&mut Transform> {
        self.bones.get_mut(compact_index)
    }

    /// Copy bone transforms from a pose of the same size. Returns false and
    /// leaves `self` untouched on a size mismatch.
    pub fn copy_from(&mut self, other: &CompactPose) -> bool {
        if other.bones.len() != self.bones.len() {
            tracing::warn!(
                expected = self.bones.len(),
                actual = other.bones.len(),
                "pose copy size mismatch"
            );
            return false;
        }
        self.bones.copy_from_slice(&other.bones);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transform> {
        self.bones.iter()
    }
}

impl BasePose for CompactPose {
    #[inline]
    fn bones(&self) -> &[Transform] {
        &self.bones
    }

    #[inline]
    fn bones_mut(&mut self) -> &mut [Transform] {
        &mut self.bones
    }
}

impl Index<usize> for CompactPose {
    type Output = Transform;

    fn index(&self, index: usize) -> &Transform {
        &self.bones[index]
    }
}

impl IndexMut<usize> for CompactPose {
    fn index_mut(&mut self, index: usize) -> &mut Transform {
        &mut self.bones[index]
    }
}
