//! Ray intersection tests
//!
//! Slab test against axis-aligned bounds and a back-face culled
//! ray/triangle test returning barycentric coordinates.

use crate::pose::Pose;
use glam::{Mat4, Vec3};

const SMALLEST_NON_DENORMAL: f32 = 1.175_494_4e-38;
const HUGE_NUMBER: f32 = 1.844_674_4e19;

/// A ray with a normalized direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    /// Gaze ray from a trace matrix: origin at its translation, direction along its -Z axis
    pub fn from_trace_matrix(m: &Mat4) -> Self {
        let origin = m.w_axis.truncate();
        let dir = m.transform_vector3(Vec3::NEG_Z).normalize_or_zero();
        Self { origin, dir }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Express this ray in the local space of `pose`
    pub fn to_local(&self, pose: &Pose) -> Ray {
        let inv = pose.rotation.inverse();
        Ray {
            origin: inv * (self.origin - pose.translation),
            dir: inv * self.dir,
        }
    }
}

/// Entry and exit distances of a ray through a box
///
/// The ray misses when `t1 < t0`; callers decide what to do with negative values.
pub fn intersect_ray_bounds(start: Vec3, dir: Vec3, mins: Vec3, maxs: Vec3) -> (f32, f32) {
    let rcp = |d: f32| {
        if d.abs() > SMALLEST_NON_DENORMAL {
            1.0 / d
        } else {
            HUGE_NUMBER
        }
    };
    let rcp_dir = Vec3::new(rcp(dir.x), rcp(dir.y), rcp(dir.z));

    let s = (mins - start) * rcp_dir;
    let t = (maxs - start) * rcp_dir;
    let near = s.min(t);
    let far = s.max(t);

    let t0 = near.x.max(near.y.max(near.z));
    let t1 = far.x.min(far.y.min(far.z));
    (t0, t1)
}

/// Distance and barycentrics of a ray/triangle hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Moller-Trumbore test; triangles facing away from the ray never hit
pub fn intersect_ray_triangle(start: Vec3, dir: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let tv = start - v0;
    let pv = dir.cross(edge2);
    let qv = tv.cross(edge1);
    let det = edge1.dot(pv);

    if det <= 0.0 {
        return None;
    }

    // divide only once the hit is known
    let u = tv.dot(pv);
    if u < 0.0 || u > det {
        return None;
    }
    let v = dir.dot(qv);
    if v < 0.0 || u + v > det {
        return None;
    }

    let t = edge2.dot(qv);
    if t < 0.0 {
        return None;
    }

    let rcp_det = 1.0 / det;
    Some(TriangleHit {
        t: t * rcp_det,
        u: u * rcp_det,
        v: v * rcp_det,
    })
}
