//! Line and sphere collision against planar polygons.
//!
//! Every function here is pure: it reads the caller's vertex data and returns
//! booleans, points or offset vectors. Degenerate input (zero-length
//! directions, lines parallel to a plane, polygons without a normal) never
//! panics; each function documents the fallback it returns instead.
//!
//! Polygons are slices of at least three coplanar vertices. Their winding
//! decides which side is "front": counter-clockwise as seen from the front.

use std::f64::consts::TAU;

use glam::Vec3;
use itertools::Itertools;

use crate::math::vector::{angle_between, polygon_normal};

/// Fraction of a full turn the summed angles must reach for a point to count
/// as inside a polygon. Absorbs the rounding error of the `acos` sum.
pub const MATCH_FACTOR: f64 = 0.9999;

/// Signed distance at or below which a sphere is treated as colliding from
/// behind when computing its push-out offset.
pub const FRONT_EPSILON: f32 = 0.00001;

/// A plane in `Ax + By + Cz + D = 0` form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// `(A, B, C)`, a unit vector unless the plane is degenerate.
    pub normal: Vec3,
    /// The `D` coefficient.
    pub origin_distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, point_on_plane: Vec3) -> Self {
        Self {
            normal,
            origin_distance: plane_distance_from_origin(normal, point_on_plane),
        }
    }

    /// Plane through the first vertex of `polygon`, facing along its winding
    /// normal.
    pub fn from_polygon(polygon: &[Vec3]) -> Self {
        let point = polygon.first().copied().unwrap_or(Vec3::ZERO);
        Self::new(polygon_normal(polygon), point)
    }

    /// Positive on the side the normal points to, negative on the other.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.origin_distance
    }

    /// True when the source polygon had no usable normal.
    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::ZERO
    }
}

/// Where a line meets a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinePlaneHit {
    /// The line crosses the plane at this point.
    Point(Vec3),
    /// The line is parallel to the plane (or has zero length). The value is
    /// the line's first endpoint, a best-effort stand-in and not a true
    /// intersection.
    Parallel(Vec3),
}

impl LinePlaneHit {
    pub fn point(self) -> Vec3 {
        match self {
            LinePlaneHit::Point(p) | LinePlaneHit::Parallel(p) => p,
        }
    }

    pub fn is_degenerate(self) -> bool {
        matches!(self, LinePlaneHit::Parallel(_))
    }
}

/// Position of a sphere relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SphereClass {
    Front,
    Behind,
    Intersects,
}

/// The `D` coefficient of the plane with `normal` passing through `point`.
pub fn plane_distance_from_origin(normal: Vec3, point_on_plane: Vec3) -> f32 {
    -normal.dot(point_on_plane)
}

/// Test whether the segment `line` crosses the plane of `polygon`.
///
/// Returns the crossing flag together with the polygon's plane. An endpoint
/// lying exactly on the plane (a zero distance product) counts as a crossing.
/// A polygon without a normal never reports a crossing.
pub fn line_intersects_plane(polygon: &[Vec3], line: [Vec3; 2]) -> (bool, Plane) {
    let plane = Plane::from_polygon(polygon);
    if plane.is_degenerate() {
        return (false, plane);
    }

    let start = plane.signed_distance(line[0]);
    let end = plane.signed_distance(line[1]);
    (start * end <= 0.0, plane)
}

/// Point where the infinite line through `line` meets the plane
/// `(normal, origin_distance)`.
///
/// The line is walked from its first endpoint along its normalized direction.
/// When that direction is perpendicular to the normal, there is no single
/// answer and [`LinePlaneHit::Parallel`] carries the first endpoint.
pub fn intersection_point(normal: Vec3, line: [Vec3; 2], origin_distance: f32) -> LinePlaneHit {
    let direction = (line[1] - line[0]).normalize_or_zero();

    let numerator = -(f64::from(normal.dot(line[0])) + f64::from(origin_distance));
    let denominator = f64::from(normal.dot(direction));
    if denominator == 0.0 {
        return LinePlaneHit::Parallel(line[0]);
    }

    let t = numerator / denominator;
    LinePlaneHit::Point(line[0] + direction * t as f32)
}

/// Test whether `point`, assumed to lie in the polygon's plane, is inside the
/// polygon.
///
/// Sums the angles subtended at `point` by each edge; only an interior point
/// sees a full turn. Works for convex polygons in O(n).
pub fn point_inside_polygon(point: Vec3, polygon: &[Vec3]) -> bool {
    let angle: f64 = polygon
        .iter()
        .circular_tuple_windows::<(&Vec3, &Vec3)>()
        .map(|(a, b)| angle_between(*a - point, *b - point))
        .sum();

    angle >= MATCH_FACTOR * TAU
}

/// Intersect the segment `line` with `polygon`.
///
/// Returns the intersection point when the segment crosses the polygon's
/// plane inside its boundary.
pub fn line_intersects_polygon(polygon: &[Vec3], line: [Vec3; 2]) -> Option<Vec3> {
    let (crosses, plane) = line_intersects_plane(polygon, line);
    if !crosses {
        return None;
    }

    let point = intersection_point(plane.normal, line, plane.origin_distance).point();
    point_inside_polygon(point, polygon).then_some(point)
}

/// Point on segment `a`-`b` closest to `point`.
pub fn closest_point_on_segment(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let direction = (b - a).normalize_or_zero();
    let length = a.distance(b);
    let t = direction.dot(point - a);

    if t <= 0.0 {
        return a;
    }
    if t >= length {
        return b;
    }
    a + direction * t
}

/// Classify a sphere against the plane `(normal, point_on_plane)`.
///
/// Also returns the signed distance from the sphere's center to the plane.
pub fn classify_sphere(
    center: Vec3,
    normal: Vec3,
    point_on_plane: Vec3,
    radius: f32,
) -> (SphereClass, f32) {
    let distance = Plane::new(normal, point_on_plane).signed_distance(center);

    let class = if distance.abs() < radius {
        SphereClass::Intersects
    } else if distance >= radius {
        SphereClass::Front
    } else {
        SphereClass::Behind
    };
    (class, distance)
}

/// Test whether a sphere touches any edge of `polygon`.
pub fn edge_sphere_collision(center: Vec3, polygon: &[Vec3], radius: f32) -> bool {
    polygon
        .iter()
        .circular_tuple_windows::<(&Vec3, &Vec3)>()
        .any(|(a, b)| closest_point_on_segment(*a, *b, center).distance(center) < radius)
}

/// Signed distance of a sphere overlapping the polygon, with the plane used.
fn sphere_polygon_overlap(polygon: &[Vec3], center: Vec3, radius: f32) -> Option<(Plane, f32)> {
    let plane = Plane::from_polygon(polygon);
    if plane.is_degenerate() {
        return None;
    }

    let (class, distance) = classify_sphere(center, plane.normal, polygon[0], radius);
    if class != SphereClass::Intersects {
        return None;
    }

    let projected = center - plane.normal * distance;
    let touches = point_inside_polygon(projected, polygon)
        || edge_sphere_collision(center, polygon, radius);
    touches.then_some((plane, distance))
}

/// Test whether a sphere collides with `polygon`.
///
/// The sphere has to straddle the polygon's plane, and then either its center
/// projects inside the polygon or it reaches over one of the edges.
pub fn sphere_polygon_collision(polygon: &[Vec3], center: Vec3, radius: f32) -> bool {
    sphere_polygon_overlap(polygon, center, radius).is_some()
}

/// Minimal translation that moves a sphere out of a plane it penetrates.
///
/// A sphere whose center is in front of the plane is pushed along the normal;
/// anything else is treated as colliding from behind and pushed against it.
/// A fast sphere that has already passed through the front face therefore
/// gets pushed out the back.
pub fn collision_offset(normal: Vec3, radius: f32, distance: f32) -> Vec3 {
    if distance > FRONT_EPSILON {
        normal * (radius - distance)
    } else {
        normal * -(radius + distance)
    }
}

/// Collide a sphere with `polygon` and return the push-out offset on a hit.
pub fn sphere_polygon_contact(polygon: &[Vec3], center: Vec3, radius: f32) -> Option<Vec3> {
    sphere_polygon_overlap(polygon, center, radius)
        .map(|(plane, distance)| collision_offset(plane.normal, radius, distance))
}
