//! Plane-projected geometry helpers
//!
//! The manifold lives on an XZ grid with Y up, so most predicates here work
//! on the XZ projection of 3D points. Winding is counter-clockwise seen from
//! above: the unit square (0,0) (1,0) (1,1) (0,1) has positive signed area.

use glam::Vec3;

/// XZ-plane cross product of two direction vectors (u.x*v.z - u.z*v.x)
#[inline]
pub fn perp_xz(u: Vec3, v: Vec3) -> f32 {
    u.x * v.z - u.z * v.x
}

/// Twice the signed XZ-plane area of the triangle ABC; positive for CCW
#[inline]
pub fn tri_area_xz(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    perp_xz(b - a, c - a)
}

/// Squared distance between two points on the XZ plane
#[inline]
pub fn dist_sqr_xz(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    dx * dx + dz * dz
}

/// Distance between two points on the XZ plane
#[inline]
pub fn dist_xz(a: Vec3, b: Vec3) -> f32 {
    dist_sqr_xz(a, b).sqrt()
}

/// Closest point on the 3D segment [a, b] to `p` by parametric projection,
/// with the parameter clamped to [0, 1]. Returns the point and the parameter.
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len_sqr = ab.length_squared();
    if len_sqr <= f32::EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sqr).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Intersects the lines `p + t*u` and `q + s*w` on the XZ plane.
///
/// Returns `(t, s)`, or `None` when the directions are parallel within
/// `f32::EPSILON` of determinant.
pub fn intersect_lines_xz(p: Vec3, u: Vec3, q: Vec3, w: Vec3) -> Option<(f32, f32)> {
    let denom = perp_xz(u, w);
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let d = q - p;
    let t = perp_xz(d, w) / denom;
    let s = perp_xz(d, u) / denom;
    Some((t, s))
}

/// Sine of the XZ angle between two directions, from their normalised cross
/// product. Used to detect near-parallel line pairs.
pub fn sin_angle_xz(u: Vec3, v: Vec3) -> f32 {
    let lu = (u.x * u.x + u.z * u.z).sqrt();
    let lv = (v.x * v.x + v.z * v.z).sqrt();
    if lu <= f32::EPSILON || lv <= f32::EPSILON {
        return 0.0;
    }
    (perp_xz(u, v) / (lu * lv)).abs()
}

/// Signed angle in radians such that `rotate_y(from, angle)` points along `to`
pub fn signed_angle_xz(from: Vec3, to: Vec3) -> f32 {
    let cross = perp_xz(to, from);
    let dot = from.x * to.x + from.z * to.z;
    cross.atan2(dot)
}

/// Rotates a vector about the Y axis by `angle` radians
pub fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(v.x * cos + v.z * sin, v.y, -v.x * sin + v.z * cos)
}

/// Linear interpolation between two points
#[inline]
pub fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}
