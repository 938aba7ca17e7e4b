//! Collision shapes used by gaze hit-testing
//!
//! Every object gets a bounds test; objects with a [`TriCollision`] refine
//! the hit against their triangles and report the texture coordinate under
//! the ray.

use glam::{Vec2, Vec3};
use math_util::{intersect_ray_bounds, intersect_ray_triangle, Bounds3};

/// Start points this close to a box count as inside it
const INSIDE_TOLERANCE: f32 = 0.1;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContentFlags: u32 {
        const SOLID = 1 << 0;
        const ALL = u32::MAX;
    }
}

/// Distance along the ray where it first touches `bounds` (already in the ray's space)
pub fn ray_hits_bounds(start: Vec3, dir: Vec3, bounds: &Bounds3) -> Option<f32> {
    if bounds.contains(start, INSIDE_TOLERANCE) {
        return Some(0.0);
    }
    let (t0, t1) = intersect_ray_bounds(start, dir, bounds.mins, bounds.maxs);
    if t0 >= 0.0 && t1 >= 0.0 && t1 >= t0 {
        Some(t0)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    pub t: f32,
    pub tri_index: usize,
    pub uv: Vec2,
    pub barycentric: Vec2,
}

/// Indexed triangle soup with per-vertex texture coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TriCollision {
    vertices: Vec<Vec3>,
    indices: Vec<u16>,
    uvs: Vec<Vec2>,
    bounds: Bounds3,
    content: ContentFlags,
}

impl TriCollision {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u16>, uvs: Vec<Vec2>, content: ContentFlags) -> Self {
        let uvs = if uvs.len() == vertices.len() {
            uvs
        } else {
            if !uvs.is_empty() {
                tracing::warn!(vertices = vertices.len(), uvs = uvs.len(), "uv count mismatch, ignoring uvs");
            }
            vec![Vec2::ZERO; vertices.len()]
        };
        let mut bounds = Bounds3::cleared();
        for v in &vertices {
            bounds.add_point(*v);
        }
        Self {
            vertices,
            indices,
            uvs,
            bounds,
            content,
        }
    }

    /// Unit-uv quad of `width` x `height` centered on the origin, facing +Z
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self::new(
            vec![
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
            vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ],
            ContentFlags::SOLID,
        )
    }

    pub fn bounds(&self) -> &Bounds3 {
        &self.bounds
    }

    pub fn content(&self) -> ContentFlags {
        self.content
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Closest triangle hit for a ray already in the primitive's local space
    pub fn intersect(&self, start: Vec3, dir: Vec3, scale: Vec3, content: ContentFlags) -> Option<CollisionResult> {
        if !self.content.intersects(content) {
            return None;
        }

        let mut best: Option<CollisionResult> = None;
        for (tri_index, tri) in self.indices.chunks_exact(3).enumerate() {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (Some(v0), Some(v1), Some(v2)) = (self.vertices.get(i0), self.vertices.get(i1), self.vertices.get(i2))
            else {
                continue;
            };
            let Some(hit) = intersect_ray_triangle(start, dir, *v0 * scale, *v1 * scale, *v2 * scale) else {
                continue;
            };
            if best.map_or(true, |b| hit.t < b.t) {
                let w = 1.0 - hit.u - hit.v;
                best = Some(CollisionResult {
                    t: hit.t,
                    tri_index,
                    uv: self.uvs[i0] * w + self.uvs[i1] * hit.u + self.uvs[i2] * hit.v,
                    barycentric: Vec2::new(hit.u, hit.v),
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_inside_bounds_hits_at_zero() {
        let b = Bounds3::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(ray_hits_bounds(Vec3::new(1.05, 0.0, 0.0), Vec3::X, &b), Some(0.0));
    }

    #[test]
    fn test_box_behind_ray_is_missed() {
        let b = Bounds3::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(ray_hits_bounds(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, &b), None);
        let t = ray_hits_bounds(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, &b);
        assert!((t.unwrap_or(-1.0) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_quad_hit_reports_uv() {
        let quad = TriCollision::quad(2.0, 2.0);
        assert_eq!(quad.triangle_count(), 2);
        let hit = quad
            .intersect(Vec3::new(0.5, -0.5, 3.0), Vec3::NEG_Z, Vec3::ONE, ContentFlags::ALL)
            .expect("quad hit");
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!((hit.uv - Vec2::new(0.75, 0.75)).length() < 1e-5);
    }

    #[test]
    fn test_scale_grows_triangles() {
        let quad = TriCollision::quad(1.0, 1.0);
        let start = Vec3::new(0.9, 0.0, 1.0);
        assert!(quad.intersect(start, Vec3::NEG_Z, Vec3::ONE, ContentFlags::ALL).is_none());
        assert!(quad.intersect(start, Vec3::NEG_Z, Vec3::splat(2.0), ContentFlags::ALL).is_some());
    }

    #[test]
    fn test_uv_mismatch_zero_fills() {
        let tri = TriCollision::new(
            vec![Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            vec![0, 1, 2],
            vec![Vec2::ONE],
            ContentFlags::SOLID,
        );
        let hit = tri
            .intersect(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z, Vec3::ONE, ContentFlags::SOLID)
            .expect("hit");
        assert_eq!(hit.uv, Vec2::ZERO);
        assert_eq!(tri.bounds().size(), Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_content_mask_filters() {
        let quad = TriCollision::quad(1.0, 1.0);
        assert!(quad
            .intersect(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z, Vec3::ONE, ContentFlags::empty())
            .is_none());
    }
}
