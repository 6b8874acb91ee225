//! Conversion from the right-handed, Z-up source space to the left-handed
//! target space. Every decoded position and rotation passes through here once.

use glam::{Quat, Vec3};
use rose_file_readers::types::{Quat4, Vec3 as RoseVec3};
use serde::{Deserialize, Serialize};

/// Meshes, skeletons and animation samples are stored in meters.
pub const UNIT_SCALE: f32 = 100.0;

/// Translations beyond this are treated as corrupt.
pub const MAX_TRANSLATION: f32 = 1.0e7;

const MIN_SCALE: f32 = 1.0e-8;

pub fn flip_vector(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.y, v.z)
}

pub fn flip_position(v: RoseVec3<f32>) -> Vec3 {
    flip_vector(Vec3::new(v.x, v.y, v.z))
}

pub fn flip_array(v: [f32; 3]) -> Vec3 {
    flip_vector(Vec3::from_array(v))
}

/// Normalises `q`, falling back to identity for degenerate input.
pub fn normalize_quat(q: Quat) -> Quat {
    let length = q.length();
    if !length.is_finite() || length < f32::EPSILON {
        Quat::IDENTITY
    } else {
        q / length
    }
}

pub fn flip_quat(q: Quat) -> Quat {
    let q = normalize_quat(q);
    Quat::from_xyzw(-q.x, q.y, -q.z, q.w)
}

/// Converts a decoded quaternion, already in X, Y, Z, W order.
pub fn flip_rotation(q: Quat4<f32>) -> Quat {
    flip_quat(Quat::from_xyzw(q.x, q.y, q.z, q.w))
}

pub fn to_vec3(v: RoseVec3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Scale, then rotation, then translation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self::new(translation, rotation, Vec3::ONE)
    }

    /// Applies `self` first, then `parent`.
    pub fn compose(&self, parent: &Transform) -> Transform {
        Transform {
            translation: parent.rotation * (parent.scale * self.translation) + parent.translation,
            rotation: normalize_quat(parent.rotation * self.rotation),
            scale: self.scale * parent.scale,
        }
    }

    /// Exact for uniform scale. With non-uniform scale the translation
    /// matches the matrix inverse while rotation and scale are approximate.
    pub fn inverse(&self) -> Transform {
        let inv_scale = Vec3::new(
            safe_reciprocal(self.scale.x),
            safe_reciprocal(self.scale.y),
            safe_reciprocal(self.scale.z),
        );
        let inv_rotation = self.rotation.conjugate();
        Transform {
            translation: inv_scale * (inv_rotation * -self.translation),
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// Expresses `self` relative to `parent`, so that
    /// `self.relative_to(p).compose(p) == self`.
    pub fn relative_to(&self, parent: &Transform) -> Transform {
        self.compose(&parent.inverse())
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.translation
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// False for NaN components, runaway translations or collapsed scale.
    pub fn is_valid(&self) -> bool {
        self.translation.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
            && self.translation.length() <= MAX_TRANSLATION
            && self.scale.abs().min_element() > MIN_SCALE
    }
}

fn safe_reciprocal(value: f32) -> f32 {
    if value.abs() <= MIN_SCALE {
        0.0
    } else {
        1.0 / value
    }
}
