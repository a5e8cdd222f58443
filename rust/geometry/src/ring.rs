// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar ring primitives
//!
//! Rings are stored open (the closing edge from the last to the first point
//! is implicit). All predicates here work on plain point slices so they can be
//! shared by the assembler, the cleaner and the renderer.

use nalgebra::Point2;

/// Tolerance for orientation tests (m²)
const ORIENT_EPSILON: f64 = 1e-14;

/// Tolerance for "point lies on segment" tests (m)
const ON_SEGMENT_EPSILON: f64 = 1e-9;

/// Axis-aligned 2D bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Bounds2 {
    /// Bounds of a point set, `None` when empty
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            min: *first,
            max: *first,
        };
        for p in &points[1..] {
            bounds.include(p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: &Point2<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn union(&self, other: &Bounds2) -> Bounds2 {
        let mut merged = *self;
        merged.include(&other.min);
        merged.include(&other.max);
        merged
    }

    /// Grow on every side by `margin`
    pub fn expanded(&self, margin: f64) -> Bounds2 {
        Bounds2 {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Check if two boxes overlap (touching counts)
    pub fn overlaps(&self, other: &Bounds2) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Check if `other` lies within this box, allowing `tolerance` of slack
    pub fn contains(&self, other: &Bounds2, tolerance: f64) -> bool {
        other.min.x >= self.min.x - tolerance
            && other.min.y >= self.min.y - tolerance
            && other.max.x <= self.max.x + tolerance
            && other.max.y <= self.max.y + tolerance
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }
}

/// Compute the signed area of a ring.
/// Positive = counter-clockwise, Negative = clockwise
pub fn signed_area(ring: &[Point2<f64>]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let n = ring.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i].x * ring[j].y;
        area -= ring[j].x * ring[i].y;
    }

    area * 0.5
}

/// Reverse the ring in place if its winding does not match `ccw`
pub fn orient(ring: &mut [Point2<f64>], ccw: bool) {
    let area = signed_area(ring);
    if (ccw && area < 0.0) || (!ccw && area > 0.0) {
        ring.reverse();
    }
}

/// Twice the signed area of triangle `a b c`
#[inline]
fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Check if `p` lies within the box spanned by `a b` (inclusive)
#[inline]
fn within_span(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> bool {
    p.x >= a.x.min(b.x) - ON_SEGMENT_EPSILON
        && p.x <= a.x.max(b.x) + ON_SEGMENT_EPSILON
        && p.y >= a.y.min(b.y) - ON_SEGMENT_EPSILON
        && p.y <= a.y.max(b.y) + ON_SEGMENT_EPSILON
}

/// Check if segments `a1 a2` and `b1 b2` share at least one point.
///
/// Touching endpoints and collinear overlap both count.
pub fn segments_intersect(
    a1: &Point2<f64>,
    a2: &Point2<f64>,
    b1: &Point2<f64>,
    b2: &Point2<f64>,
) -> bool {
    let d1 = orient2d(b1, b2, a1);
    let d2 = orient2d(b1, b2, a2);
    let d3 = orient2d(a1, a2, b1);
    let d4 = orient2d(a1, a2, b2);

    let opposite = |u: f64, v: f64| {
        (u > ORIENT_EPSILON && v < -ORIENT_EPSILON) || (u < -ORIENT_EPSILON && v > ORIENT_EPSILON)
    };
    if opposite(d1, d2) && opposite(d3, d4) {
        return true;
    }

    (d1.abs() <= ORIENT_EPSILON && within_span(a1, b1, b2))
        || (d2.abs() <= ORIENT_EPSILON && within_span(a2, b1, b2))
        || (d3.abs() <= ORIENT_EPSILON && within_span(b1, a1, a2))
        || (d4.abs() <= ORIENT_EPSILON && within_span(b2, a1, a2))
}

/// Distance from `p` to the segment `a b`
pub fn point_segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Shortest distance between two segments
pub fn segment_distance(
    a1: &Point2<f64>,
    a2: &Point2<f64>,
    b1: &Point2<f64>,
    b2: &Point2<f64>,
) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    point_segment_distance(a1, b1, b2)
        .min(point_segment_distance(a2, b1, b2))
        .min(point_segment_distance(b1, a1, a2))
        .min(point_segment_distance(b2, a1, a2))
}

/// Iterate the edges of a closed ring as `(index, start, end)`
pub fn edges(ring: &[Point2<f64>]) -> impl Iterator<Item = (usize, &Point2<f64>, &Point2<f64>)> {
    let n = ring.len();
    (0..n).map(move |i| (i, &ring[i], &ring[(i + 1) % n]))
}

/// Check if a point is inside a ring using ray casting
pub fn point_in_ring(point: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = ring.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &ring[i];
        let pj = &ring[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Distance from `point` to the nearest edge of `ring`
pub fn distance_to_boundary(point: &Point2<f64>, ring: &[Point2<f64>]) -> f64 {
    edges(ring)
        .map(|(_, a, b)| point_segment_distance(point, a, b))
        .fold(f64::INFINITY, f64::min)
}

/// A point strictly inside the ring, found on a horizontal scanline.
///
/// Works for concave and very thin rings where the centroid may fall outside.
pub fn interior_point(ring: &[Point2<f64>]) -> Option<Point2<f64>> {
    let bounds = Bounds2::from_points(ring)?;
    if ring.len() < 3 || bounds.height() <= 0.0 {
        return None;
    }

    // Off-centre scanline so it rarely passes exactly through a vertex
    let y = bounds.min.y + bounds.height() * 0.5 + bounds.height() * 0.013_7;
    let mut xs: Vec<f64> = edges(ring)
        .filter(|(_, a, b)| (a.y > y) != (b.y > y))
        .map(|(_, a, b)| a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
        .collect();
    xs.sort_by(f64::total_cmp);

    xs.chunks_exact(2)
        .max_by(|l, r| (l[1] - l[0]).total_cmp(&(r[1] - r[0])))
        .map(|pair| Point2::new((pair[0] + pair[1]) * 0.5, y))
}

/// Check if `inner` lies inside `outer`.
///
/// Every vertex of `inner` must be inside `outer` or within `tolerance` of its
/// boundary, and a representative interior point of `inner` must be strictly
/// inside.
pub fn ring_contains_ring(outer: &[Point2<f64>], inner: &[Point2<f64>], tolerance: f64) -> bool {
    let (Some(ob), Some(ib)) = (Bounds2::from_points(outer), Bounds2::from_points(inner)) else {
        return false;
    };
    if !ob.contains(&ib, tolerance) {
        return false;
    }

    let vertices_inside = inner
        .iter()
        .all(|p| point_in_ring(p, outer) || distance_to_boundary(p, outer) <= tolerance);

    vertices_inside
        && interior_point(inner).is_some_and(|p| point_in_ring(&p, outer))
}

/// Check if any two non-adjacent edges of a ring touch or cross
pub fn ring_self_intersects(ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }

    for i in 0..n {
        let (a1, a2) = (&ring[i], &ring[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b1, b2) = (&ring[j], &ring[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }

    false
}

/// Check if any edge of `a` touches or crosses any edge of `b`
pub fn rings_touch(a: &[Point2<f64>], b: &[Point2<f64>]) -> bool {
    edges(a).any(|(_, a1, a2)| edges(b).any(|(_, b1, b2)| segments_intersect(a1, a2, b1, b2)))
}

/// Shortest distance between the boundaries of two rings
pub fn ring_distance(a: &[Point2<f64>], b: &[Point2<f64>]) -> f64 {
    let mut best = f64::INFINITY;
    for (_, a1, a2) in edges(a) {
        for (_, b1, b2) in edges(b) {
            best = best.min(segment_distance(a1, a2, b1, b2));
            if best == 0.0 {
                return 0.0;
            }
        }
    }
    best
}

/// Drop consecutive points closer than `epsilon`, including the wrap-around
pub fn dedup_points(ring: &mut Vec<Point2<f64>>, epsilon: f64) {
    ring.dedup_by(|b, a| (*b - *a).norm() <= epsilon);
    while ring.len() > 1 {
        let (first, last) = (ring[0], ring[ring.len() - 1]);
        if (first - last).norm() <= epsilon {
            ring.pop();
        } else {
            break;
        }
    }
}

/// Round every coordinate to a multiple of `grid`
pub fn snap(ring: &mut [Point2<f64>], grid: f64) {
    for p in ring.iter_mut() {
        p.x = snap_value(p.x, grid);
        p.y = snap_value(p.y, grid);
    }
}

#[inline]
fn snap_value(v: f64, grid: f64) -> f64 {
    let snapped = (v / grid).round() * grid;
    // Avoid emitting "-0" in exports
    if snapped == 0.0 {
        0.0
    } else {
        snapped
    }
}

/// Rotate the ring so it starts at its lexicographically smallest vertex
pub fn rotate_to_min(ring: &mut [Point2<f64>]) {
    let start = ring
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
        .map(|(i, _)| i);
    if let Some(start) = start {
        ring.rotate_left(start);
    }
}
