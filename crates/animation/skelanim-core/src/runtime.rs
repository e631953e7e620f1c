//! Stateless pose blending.

use crate::pose::{BasePose, CompactPose};
use crate::transform::Transform;

/// Blend two poses bone by bone: `out[i] = lerp(a[i], b[i], 1 - weight_of_a)`,
/// with shortest-path slerp on rotations. A weight of 1 copies `pose_a`, a
/// weight of 0 copies `pose_b`. Poses of different sizes leave `out` untouched
/// and return false.
pub fn blend_two_poses_together(
    pose_a: &CompactPose,
    pose_b: &CompactPose,
    weight_of_a: f32,
    out: &mut CompactPose,
) -> bool {
    let count = pose_a.num_bones();
    if pose_b.num_bones() != count || out.num_bones() != count {
        tracing::warn!(
            a = count,
            b = pose_b.num_bones(),
            out = out.num_bones(),
            "blend_two_poses_together: pose sizes differ"
        );
        return false;
    }
    let alpha = 1.0 - weight_of_a;
    for ((dst, a), b) in out
        .bones_mut()
        .iter_mut()
        .zip(pose_a.bones())
        .zip(pose_b.bones())
    {
        *dst = Transform::blend(a, b, alpha);
    }
    true
}
