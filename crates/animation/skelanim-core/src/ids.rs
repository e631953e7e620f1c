//! Identifiers for the collaborators a playback instance reports to.

use serde::{Deserialize, Serialize};

/// Opaque handle of the mesh component an instance animates. Passed through to
/// notify targets untouched.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MeshComponentId(pub u32);

/// Monotonic allocator for mesh component handles.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_mesh: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_mesh_component(&mut self) -> MeshComponentId {
        let id = MeshComponentId(self.next_mesh);
        self.next_mesh = self.next_mesh.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
