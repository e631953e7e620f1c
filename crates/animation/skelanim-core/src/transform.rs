//! Local bone transform (translation, rotation, scale) and interpolation helpers.

use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Allowed deviation of a rotation's squared length from 1.
const QUAT_NORMALIZED_THRESHOLD: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(
        translation: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Regular identity: no offset, no rotation, unit scale.
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    /// "No change" under additive blending. Scale is zero, not one.
    pub fn additive_identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::zeros(),
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn from_rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Build from raw `[x, y, z]`, `[x, y, z, w]`, `[x, y, z]` arrays. The
    /// rotation is normalized; a zero quaternion becomes identity.
    pub fn from_arrays(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            translation: Vector3::from(translation),
            rotation: quat_from_xyzw(rotation),
            scale: Vector3::from(scale),
        }
    }

    /// Column-vector matrix: translate * rotate * scale.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Interpolate from `a` towards `b`. Translation and scale are linear,
    /// rotation uses shortest-path slerp. `alpha <= 0` returns `a` and
    /// `alpha >= 1` returns `b` unchanged.
    pub fn blend(a: &Transform, b: &Transform, alpha: f32) -> Transform {
        if alpha <= 0.0 {
            return *a;
        }
        if alpha >= 1.0 {
            return *b;
        }
        Transform {
            translation: a.translation.lerp(&b.translation, alpha),
            rotation: slerp_shortest(&a.rotation, &b.rotation, alpha),
            scale: a.scale.lerp(&b.scale, alpha),
        }
    }

    pub fn contains_nan(&self) -> bool {
        self.translation.iter().any(|v| v.is_nan())
            || self.rotation.coords.iter().any(|v| v.is_nan())
            || self.scale.iter().any(|v| v.is_nan())
    }

    pub fn is_rotation_normalized(&self) -> bool {
        (self.rotation.coords.norm_squared() - 1.0).abs() <= QUAT_NORMALIZED_THRESHOLD
    }

    pub fn normalize_rotation(&mut self) {
        self.rotation = normalize_quat(*self.rotation.quaternion());
    }

    pub fn rotation_xyzw(&self) -> [f32; 4] {
        let q = self.rotation.coords;
        [q.x, q.y, q.z, q.w]
    }
}

/// Normalize a raw quaternion, falling back to identity for zero or NaN input.
pub fn normalize_quat(q: Quaternion<f32>) -> UnitQuaternion<f32> {
    let n = q.norm();
    if n > 0.0 && n.is_finite() {
        UnitQuaternion::new_unchecked(q / n)
    } else {
        UnitQuaternion::identity()
    }
}

/// `[x, y, z, w]` to a normalized rotation.
pub fn quat_from_xyzw(q: [f32; 4]) -> UnitQuaternion<f32> {
    normalize_quat(Quaternion::new(q[3], q[0], q[1], q[2]))
}

/// Spherical interpolation with shortest-arc sign correction: when the dot
/// product is negative, `b` is negated before interpolating.
pub fn slerp_shortest(
    a: &UnitQuaternion<f32>,
    b: &UnitQuaternion<f32>,
    t: f32,
) -> UnitQuaternion<f32> {
    let b = if a.coords.dot(&b.coords) < 0.0 {
        UnitQuaternion::new_unchecked(-b.into_inner())
    } else {
        *b
    };
    // Nearly parallel inputs have no well-defined arc; nlerp is exact enough there.
    a.try_slerp(&b, t, f32::EPSILON)
        .unwrap_or_else(|| a.nlerp(&b, t))
}
