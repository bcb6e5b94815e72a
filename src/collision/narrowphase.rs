//! Narrow-phase geometric tests.
//!
//! Every function here is pure: it takes primitive geometry and returns a
//! boolean, a scalar or a vector. None of them panic, including on degenerate
//! input (zero-length directions, parallel segments, coincident centres).
//!
//! The broad phase ([`Quadtree`](super::quadtree::Quadtree)) only produces
//! candidates; [`aabb_overlap`] is what decides whether two bodies actually
//! collide this frame.

use glam::Vec2;

use super::rect::Rect;

/// Below this magnitude a segment cross product is treated as parallel.
const PARALLEL_EPSILON: f32 = 1e-10;

/// AABB vs AABB overlap on half-open ranges. Rectangles that only touch do
/// not overlap.
pub fn aabb_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Circle vs circle, compared on squared distance.
pub fn circle_overlap(c1: Vec2, r1: f32, c2: Vec2, r2: f32) -> bool {
    let radius_sum = r1 + r2;
    c1.distance_squared(c2) <= radius_sum * radius_sum
}

/// Circle vs rectangle: clamp the centre onto the rectangle and compare the
/// squared distance to that closest point against `r²`.
pub fn circle_rect_overlap(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = center.clamp(rect.min(), rect.max());
    center.distance_squared(closest) <= radius * radius
}

/// Inclusive point containment.
pub fn point_in_rect(point: Vec2, rect: &Rect) -> bool {
    point.x >= rect.x && point.x <= rect.right() && point.y >= rect.y && point.y <= rect.bottom()
}

/// Inclusive point containment.
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// Signed penetration on the X axis. Positive means overlapping by that
/// amount, zero means touching and negative means separated.
pub fn overlap_x(a: &Rect, b: &Rect) -> f32 {
    a.right().min(b.right()) - a.x.max(b.x)
}

/// Signed penetration on the Y axis, see [`overlap_x`].
pub fn overlap_y(a: &Rect, b: &Rect) -> f32 {
    a.bottom().min(b.bottom()) - a.y.max(b.y)
}

/// Minimum translation vector that moves `a` out of `b`.
///
/// Returns [`Vec2::ZERO`] when the rectangles do not overlap. Otherwise each
/// axis gets the shorter of its two push-out distances, and the axis with the
/// smaller one wins (ties go to Y). Translating `a` by the result always
/// clears the overlap, also when one rectangle contains the other.
pub fn compute_mtv(a: &Rect, b: &Rect) -> Vec2 {
    if !aabb_overlap(a, b) {
        return Vec2::ZERO;
    }

    let px = push_out(a.x, a.right(), b.x, b.right());
    let py = push_out(a.y, a.bottom(), b.y, b.bottom());

    if px.abs() < py.abs() {
        Vec2::new(px, 0.0)
    } else {
        Vec2::new(0.0, py)
    }
}

/// Signed shortest move of `[a_min, a_max)` off `[b_min, b_max)` along one
/// axis. Negative moves towards `b_min`.
fn push_out(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> f32 {
    let towards_min = a_max - b_min;
    let towards_max = b_max - a_min;
    if towards_min < towards_max {
        -towards_min
    } else {
        towards_max
    }
}

/// Unit vector from the centre of `a` to the centre of `b`.
///
/// Coincident centres have no direction, so `(1, 0)` is returned instead.
pub fn collision_normal(a: &Rect, b: &Rect) -> Vec2 {
    let delta = b.center() - a.center();
    let length = delta.length();
    if length == 0.0 || !length.is_finite() {
        return Vec2::X;
    }
    delta / length
}

/// `outer` fully contains `inner`, edges included.
pub fn rect_contains(outer: &Rect, inner: &Rect) -> bool {
    outer.contains_rect(inner)
}

pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

pub fn distance_squared(a: Vec2, b: Vec2) -> f32 {
    a.distance_squared(b)
}

/// Ray vs rectangle slab test.
///
/// Returns the distance along `dir` (in units of `dir`'s length) to the first
/// hit, the exit distance when the origin is already inside, or
/// [`f32::INFINITY`] on a miss.
///
/// A zero direction component never divides: the ray is parallel to that
/// slab, so it either always lies within it or never reaches it. A zero
/// direction vector hits nothing.
pub fn ray_rect_intersection(origin: Vec2, dir: Vec2, rect: &Rect) -> f32 {
    if dir == Vec2::ZERO || !dir.is_finite() {
        return f32::INFINITY;
    }

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for (o, d, lo, hi) in [
        (origin.x, dir.x, rect.x, rect.right()),
        (origin.y, dir.y, rect.y, rect.bottom()),
    ] {
        if d == 0.0 {
            if o < lo || o > hi {
                return f32::INFINITY;
            }
            continue;
        }
        let inv = 1.0 / d;
        let t1 = (lo - o) * inv;
        let t2 = (hi - o) * inv;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }

    if t_max < 0.0 || t_min > t_max {
        return f32::INFINITY;
    }

    if t_min < 0.0 { t_max } else { t_min }
}

/// Intersection point of segments `p1-p2` and `p3-p4`, if any.
/// Parallel and collinear segments report no intersection.
pub fn segment_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<Vec2> {
    let denom = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = ((p1.x - p3.x) * (p3.y - p4.y) - (p1.y - p3.y) * (p3.x - p4.x)) / denom;
    let u = -((p1.x - p2.x) * (p1.y - p3.y) - (p1.y - p2.y) * (p1.x - p3.x)) / denom;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(p1 + (p2 - p1) * t)
    } else {
        None
    }
}

pub fn segments_intersect(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    segment_intersection(p1, p2, p3, p4).is_some()
}
