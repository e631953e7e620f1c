//! Bone container: the ordered subset of skeleton bones one evaluation
//! context works with, plus the index tables between skeleton indices and
//! compact pose indices.

use std::sync::Arc;

use crate::error::AnimError;
use crate::skeleton::ReferenceSkeleton;
use crate::transform::Transform;

#[derive(Clone, Debug)]
pub struct BoneContainer {
    skeleton: Arc<ReferenceSkeleton>,
    /// Reference skeleton of the mesh being animated, when it differs from the
    /// skeleton asset. Same topology, possibly different bind values.
    mesh: Option<Arc<ReferenceSkeleton>>,
    compact_to_skeleton: Vec<usize>,
    skeleton_to_compact: Vec<Option<usize>>,
    compact_parents: Vec<Option<usize>>,
    compact_ref_pose: Vec<Transform>,
    ref_pose_override: Option<Vec<Transform>>,
}

impl BoneContainer {
    /// Build from skeleton indices. The list is sorted, deduplicated and
    /// closed over parents, so every compact bone's parent is also compact
    /// and precedes it.
    pub fn new(
        skeleton: Arc<ReferenceSkeleton>,
        required_bones: &[usize],
    ) -> Result<Self, AnimError> {
        let count = skeleton.num_bones();
        let mut included = vec![false; count];
        for &index in required_bones {
            if index >= count {
                return Err(AnimError::InvalidBoneIndex { index, count });
            }
            let mut current = Some(index);
            while let Some(i) = current {
                if included[i] {
                    break;
                }
                included[i] = true;
                current = skeleton.parent_index(i);
            }
        }

        let compact_to_skeleton: Vec<usize> = included
            .iter()
            .enumerate()
            .filter_map(|(i, inc)| inc.then_some(i))
            .collect();
        Ok(Self::from_compact_list(skeleton, compact_to_skeleton))
    }

    /// Every bone of the skeleton, in skeleton order.
    pub fn full(skeleton: Arc<ReferenceSkeleton>) -> Self {
        let all = (0..skeleton.num_bones()).collect();
        Self::from_compact_list(skeleton, all)
    }

    fn from_compact_list(
        skeleton: Arc<ReferenceSkeleton>,
        compact_to_skeleton: Vec<usize>,
    ) -> Self {
        let mut skeleton_to_compact = vec![None; skeleton.num_bones()];
        for (compact, &skel) in compact_to_skeleton.iter().enumerate() {
            skeleton_to_compact[skel] = Some(compact);
        }
        let compact_parents = compact_to_skeleton
            .iter()
            .map(|&skel| skeleton.parent_index(skel).and_then(|p| skeleton_to_compact[p]))
            .collect();
        let bind = skeleton.bind_pose();
        let compact_ref_pose = compact_to_skeleton.iter().map(|&skel| bind[skel]).collect();
        Self {
            skeleton,
            mesh: None,
            compact_to_skeleton,
            skeleton_to_compact,
            compact_parents,
            compact_ref_pose,
            ref_pose_override: None,
        }
    }

    /// Attach the mesh reference skeleton used by [`crate::pose::CompactPose::reset_to_ref_pose`].
    pub fn with_mesh(mut self, mesh: Arc<ReferenceSkeleton>) -> Result<Self, AnimError> {
        if mesh.num_bones() != self.skeleton.num_bones() {
            return Err(AnimError::RefPoseSizeMismatch {
                expected: self.skeleton.num_bones(),
                actual: mesh.num_bones(),
            });
        }
        self.mesh = Some(mesh);
        Ok(self)
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.compact_to_skeleton.len()
    }

    #[inline]
    pub fn skeleton(&self) -> &Arc<ReferenceSkeleton> {
        &self.skeleton
    }

    #[inline]
    pub fn mesh(&self) -> Option<&Arc<ReferenceSkeleton>> {
        self.mesh.as_ref()
    }

    #[inline]
    pub fn compact_to_skeleton_indices(&self) -> &[usize] {
        &self.compact_to_skeleton
    }

    #[inline]
    pub fn get_skeleton_index(&self, compact_index: usize) -> Option<usize> {
        self.compact_to_skeleton.get(compact_index).copied()
    }

    #[inline]
    pub fn get_compact_index(&self, skeleton_index: usize) -> Option<usize> {
        self.skeleton_to_compact.get(skeleton_index).copied().flatten()
    }

    /// Compact index of the parent of `compact_index`; `None` for roots.
    #[inline]
    pub fn get_parent_bone_index(&self, compact_index: usize) -> Option<usize> {
        self.compact_parents.get(compact_index).copied().flatten()
    }

    /// Install a compact reference pose used instead of the skeleton's bind pose.
    pub fn set_ref_pose_override(&mut self, pose: Vec<Transform>) -> Result<(), AnimError> {
        if pose.len() != self.num_bones() {
            return Err(AnimError::RefPoseSizeMismatch {
                expected: self.num_bones(),
                actual: pose.len(),
            });
        }
        self.ref_pose_override = Some(pose);
        Ok(())
    }

    pub fn clear_ref_pose_override(&mut self) {
        self.ref_pose_override = None;
    }

    #[inline]
    pub fn has_ref_pose_override(&self) -> bool {
        self.ref_pose_override.is_some()
    }

    /// The override when installed, otherwise the skeleton bind pose remapped
    /// through `compact_to_skeleton`.
    #[inline]
    pub fn ref_pose_compact(&self) -> &[Transform] {
        self.ref_pose_override
            .as_deref()
            .unwrap_or(&self.compact_ref_pose)
    }

    pub fn fill_with_compact_ref_pose(&self, out: &mut Vec<Transform>) {
        out.clear();
        out.extend_from_slice(self.ref_pose_compact());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::MeshBone;
    use nalgebra::Vector3;

    fn skeleton() -> Arc<ReferenceSkeleton> {
        let t = |y: f32| Transform::from_translation(Vector3::new(0.0, y, 0.0));
        Arc::new(
            ReferenceSkeleton::new(vec![
                MeshBone::new("root", None, t(0.0)),
                MeshBone::new("pelvis", Some(0), t(1.0)),
                MeshBone::new("thigh_l", Some(1), t(2.0)),
                MeshBone::new("thigh_r", Some(1), t(3.0)),
                MeshBone::new("calf_r", Some(3), t(4.0)),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn required_bones_pull_in_parents() {
        let container = BoneContainer::new(skeleton(), &[4]).unwrap();
        assert_eq!(container.compact_to_skeleton_indices(), &[0, 1, 3, 4]);
        assert_eq!(container.get_skeleton_index(2), Some(3));
        assert_eq!(container.get_compact_index(2), None);
        assert_eq!(container.get_parent_bone_index(3), Some(2));
        assert_eq!(container.get_parent_bone_index(0), None);
    }

    #[test]
    fn ref_pose_is_remapped_or_overridden() {
        let mut container = BoneContainer::new(skeleton(), &[3, 1]).unwrap();
        let mut out = Vec::new();
        container.fill_with_compact_ref_pose(&mut out);
        let ys: Vec<f32> = out.iter().map(|t| t.translation.y).collect();
        assert_eq!(ys, vec![0.0, 1.0, 3.0]);

        let custom = vec![Transform::additive_identity(); 3];
        container.set_ref_pose_override(custom.clone()).unwrap();
        container.fill_with_compact_ref_pose(&mut out);
        assert_eq!(out, custom);

        assert!(container.set_ref_pose_override(vec![Transform::identity()]).is_err());
        container.clear_ref_pose_override();
        assert!(!container.has_ref_pose_override());
    }

    #[test]
    fn out_of_range_required_bone_is_rejected() {
        let err = BoneContainer::new(skeleton(), &[9]).unwrap_err();
        assert_eq!(err, AnimError::InvalidBoneIndex { index: 9, count: 5 });
    }
}
