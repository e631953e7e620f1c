//! Reference skeleton: an index arena of bones with their bind pose.
//!
//! Bones are stored parent-before-child. Construction rejects any other
//! order, so a single forward pass can compose global bind matrices.

use hashbrown::HashMap;
use nalgebra::Matrix4;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::AnimError;
use crate::transform::Transform;

/// Name and parent of one bone. `parent_index` is `None` for roots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoneInfo {
    pub name: String,
    pub parent_index: Option<usize>,
}

/// Construction input: a bone plus its local bind transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshBone {
    pub name: String,
    pub parent_index: Option<usize>,
    pub bind_pose: Transform,
}

impl MeshBone {
    pub fn new(name: impl Into<String>, parent_index: Option<usize>, bind_pose: Transform) -> Self {
        Self {
            name: name.into(),
            parent_index,
            bind_pose,
        }
    }
}

#[derive(Clone, Debug)]
struct BindMatrices {
    global: Vec<Matrix4<f32>>,
    inverse: Vec<Matrix4<f32>>,
}

/// Immutable bone hierarchy shared by every instance animating a mesh.
#[derive(Clone, Debug)]
pub struct ReferenceSkeleton {
    bones: Vec<BoneInfo>,
    bind_pose_local: Vec<Transform>,
    name_to_index: HashMap<String, usize>,
    bind_matrices: OnceCell<BindMatrices>,
}

impl ReferenceSkeleton {
    /// Validate and build. Fails on duplicate names or on a parent index that
    /// does not precede its child.
    pub fn new(bones: Vec<MeshBone>) -> Result<Self, AnimError> {
        let mut infos = Vec::with_capacity(bones.len());
        let mut bind_pose_local = Vec::with_capacity(bones.len());
        let mut name_to_index = HashMap::with_capacity(bones.len());

        for (index, bone) in bones.into_iter().enumerate() {
            if let Some(parent) = bone.parent_index {
                if parent >= index {
                    return Err(AnimError::ParentAfterChild {
                        bone: index,
                        name: bone.name,
                        parent,
                    });
                }
            }
            if name_to_index.insert(bone.name.clone(), index).is_some() {
                return Err(AnimError::DuplicateBoneName { name: bone.name });
            }
            infos.push(BoneInfo {
                name: bone.name,
                parent_index: bone.parent_index,
            });
            bind_pose_local.push(bone.bind_pose);
        }

        Ok(Self {
            bones: infos,
            bind_pose_local,
            name_to_index,
            bind_matrices: OnceCell::new(),
        })
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn bones(&self) -> &[BoneInfo] {
        &self.bones
    }

    #[inline]
    pub fn bone_info(&self, index: usize) -> Option<&BoneInfo> {
        self.bones.get(index)
    }

    #[inline]
    pub fn bone_name(&self, index: usize) -> Option<&str> {
        self.bones.get(index).map(|b| b.name.as_str())
    }

    #[inline]
    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent_index)
    }

    #[inline]
    pub fn find_bone_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    #[inline]
    pub fn is_valid_index(&self, index: usize) -> bool {
        index < self.bones.len()
    }

    /// Local-space bind transforms, index-aligned with [`Self::bones`].
    #[inline]
    pub fn bind_pose(&self) -> &[Transform] {
        &self.bind_pose_local
    }

    /// True when `parent` is a strict ancestor of `child`.
    pub fn is_child_of(&self, child: usize, parent: usize) -> bool {
        let mut current = self.parent_index(child);
        while let Some(index) = current {
            if index == parent {
                return true;
            }
            current = self.parent_index(index);
        }
        false
    }

    /// Compose global bind matrices and their inverses. Runs once; later
    /// calls and the accessors below reuse the cached result.
    pub fn initialize_inverse_bind_pose(&self) {
        self.bind_matrices();
    }

    pub fn global_bind_pose(&self) -> &[Matrix4<f32>] {
        &self.bind_matrices().global
    }

    pub fn inverse_bind_pose(&self) -> &[Matrix4<f32>] {
        &self.bind_matrices().inverse
    }

    fn bind_matrices(&self) -> &BindMatrices {
        self.bind_matrices.get_or_init(|| {
            let mut global: Vec<Matrix4<f32>> = Vec::with_capacity(self.bones.len());
            for (bone, local) in self.bones.iter().zip(&self.bind_pose_local) {
                let local = local.to_matrix();
                // Parents precede children, so global[parent] is already filled.
                let matrix = match bone.parent_index {
                    Some(parent) => global[parent] * local,
                    None => local,
                };
                global.push(matrix);
            }
            let inverse = global
                .iter()
                .zip(&self.bones)
                .map(|(m, bone)| {
                    m.try_inverse().unwrap_or_else(|| {
                        tracing::warn!(
                            bone = %bone.name,
                            "singular bind matrix, using identity inverse"
                        );
                        Matrix4::identity()
                    })
                })
                .collect();
            BindMatrices { global, inverse }
        })
    }
}
