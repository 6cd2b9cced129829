//! Small vector helpers on top of [`glam::Vec3`] shared by collision and
//! normal generation.

use glam::Vec3;

/// Unit normal of a planar polygon, taken from its first three vertices.
///
/// Counter-clockwise winding (seen from the side the normal points to) gives
/// the right-handed normal. Polygons with fewer than three vertices, or whose
/// first three vertices are collinear, return [`Vec3::ZERO`].
pub fn polygon_normal(polygon: &[Vec3]) -> Vec3 {
    face_normal(polygon).normalize_or_zero()
}

/// Unnormalized polygon normal; its length is twice the area of the triangle
/// formed by the first three vertices.
pub fn face_normal(polygon: &[Vec3]) -> Vec3 {
    match polygon {
        [a, b, c, ..] => (*b - *a).cross(*c - *a),
        _ => Vec3::ZERO,
    }
}

/// Angle in radians between two vectors.
///
/// A zero-length input has no direction, so the angle is reported as 0.
pub fn angle_between(a: Vec3, b: Vec3) -> f64 {
    let magnitude = f64::from(a.length()) * f64::from(b.length());
    if magnitude == 0.0 {
        return 0.0;
    }
    let cos = f64::from(a.dot(b)) / magnitude;
    cos.clamp(-1.0, 1.0).acos()
}
