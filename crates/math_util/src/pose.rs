//! Rigid transforms (rotation + translation)

use glam::{Mat4, Quat, Vec3};
use std::ops::Mul;

/// Orientation and position of an object relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub const fn new(rotation: Quat, translation: Vec3) -> Self {
        Self { rotation, translation }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation,
        }
    }

    /// Map a point from this pose's local space into the parent space
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// Map a point from the parent space into this pose's local space
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.translation)
    }

    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose {
            rotation,
            translation: rotation * -self.translation,
        }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}

/// `parent * child` places `child` (expressed in parent space) into the parent's frame
impl Mul for Pose {
    type Output = Pose;

    fn mul(self, child: Pose) -> Pose {
        Pose {
            rotation: self.rotation * child.rotation,
            translation: self.rotation * child.translation + self.translation,
        }
    }
}
