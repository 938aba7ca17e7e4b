//! Geometry helpers shared by the renderer and the menu system
//!
//! Poses, axis-aligned bounds and the ray intersection tests used by
//! gaze hit-testing.

pub mod bounds;
pub mod intersect;
pub mod pose;

pub use bounds::Bounds3;
pub use intersect::{intersect_ray_bounds, intersect_ray_triangle, Ray, TriangleHit};
pub use pose::Pose;
