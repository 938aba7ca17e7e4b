//! Axis-aligned bounds
//!
//! Menu objects describe their hit volume with a local-space box that is
//! scaled by the object's world scale before ray tests.

use glam::Vec3;
use std::ops::Mul;

/// Axis-aligned bounding box stored as min/max corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::cleared()
    }
}

impl Bounds3 {
    /// Create bounds from two corners
    pub const fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Create bounds from center and half-extents
    pub fn from_center_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            mins: center - half_extents,
            maxs: center + half_extents,
        }
    }

    /// Inverted bounds that any added point will replace
    pub fn cleared() -> Self {
        Self {
            mins: Vec3::splat(f32::MAX),
            maxs: Vec3::splat(-f32::MAX),
        }
    }

    /// True when no point has been added since `cleared()`
    pub fn is_cleared(&self) -> bool {
        self.mins.x > self.maxs.x || self.mins.y > self.maxs.y || self.mins.z > self.maxs.z
    }

    pub fn add_point(&mut self, p: Vec3) {
        self.mins = self.mins.min(p);
        self.maxs = self.maxs.max(p);
    }

    /// Grow to enclose `other`; cleared bounds are ignored
    pub fn expand(&mut self, other: &Bounds3) {
        if other.is_cleared() {
            return;
        }
        self.add_point(other.mins);
        self.add_point(other.maxs);
    }

    pub fn size(&self) -> Vec3 {
        self.maxs - self.mins
    }

    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    /// Point containment with the box grown by `expand` on every side
    pub fn contains(&self, p: Vec3, expand: f32) -> bool {
        p.x >= self.mins.x - expand
            && p.y >= self.mins.y - expand
            && p.z >= self.mins.z - expand
            && p.x <= self.maxs.x + expand
            && p.y <= self.maxs.y + expand
            && p.z <= self.maxs.z + expand
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            mins: self.mins + offset,
            maxs: self.maxs + offset,
        }
    }
}

/// Component-wise scale of both corners
impl Mul<Vec3> for Bounds3 {
    type Output = Bounds3;

    fn mul(self, scale: Vec3) -> Bounds3 {
        Bounds3 {
            mins: self.mins * scale,
            maxs: self.maxs * scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_bounds_accept_first_point() {
        let mut b = Bounds3::cleared();
        assert!(b.is_cleared());
        b.add_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(!b.is_cleared());
        assert_eq!(b.mins, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.maxs, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_contains_with_tolerance() {
        let b = Bounds3::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(b.contains(Vec3::ZERO, 0.0));
        assert!(!b.contains(Vec3::new(1.05, 0.0, 0.0), 0.0));
        assert!(b.contains(Vec3::new(1.05, 0.0, 0.0), 0.1));
    }

    #[test]
    fn test_scale_and_expand() {
        let b = Bounds3::new(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(1.0, 2.0, 0.0)) * Vec3::splat(2.0);
        assert_eq!(b.size(), Vec3::new(4.0, 8.0, 0.0));

        let mut total = Bounds3::cleared();
        total.expand(&Bounds3::cleared());
        assert!(total.is_cleared());
        total.expand(&b);
        assert_eq!(total, b);
    }
}
