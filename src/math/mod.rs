/// Ray, line and sphere collision against polygons
pub mod collision;
/// Polygon normals and vector angles
pub mod vector;

pub use glam::{Vec2, Vec3};
