// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint cleaning
//!
//! Turns raw assembled footprints into valid, simplified, canonical polygons:
//!
//! 1. rings below the minimum area are discarded
//! 2. same-category footprints whose boundaries touch or overlap are unioned
//! 3. footprints that are still invalid (self-intersecting rings, holes
//!    touching their outer) are rebuilt through a boolean difference. An
//!    opening that would cut the outer in two is kept as an attributed
//!    boundary opening instead
//! 4. vertices closer to their neighbours' chord than the simplification
//!    tolerance are removed, unless that would change the topology
//!
//! Footprints that interact with nothing never go through the boolean engine,
//! and every output is snapped and rotated into canonical form, so cleaning a
//! cleaned set returns it unchanged.

use crate::polygon::{ElementId, Footprint, Ring, RingRole};
use crate::ring::{self, Bounds2};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;
use std::collections::BTreeSet;

/// Canonical coordinate grid (m)
const SNAP_GRID: f64 = 1e-9;

/// Counters gathered while cleaning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Outer or hole rings discarded for lack of area
    pub dropped_rings: usize,
    /// Groups of two or more footprints that were unioned
    pub merged_groups: usize,
    /// Footprints rebuilt to fix self-intersections
    pub repaired: usize,
    /// Openings kept as boundary gaps instead of splitting their outer
    pub boundary_openings: usize,
    /// Vertices removed by simplification
    pub removed_vertices: usize,
}

/// Cleaned footprints of one storey
#[derive(Debug, Clone, Default)]
pub struct Cleaned {
    pub footprints: Vec<Footprint>,
    pub stats: CleanStats,
}

/// Validates, merges and simplifies footprints
#[derive(Debug, Clone, Copy)]
pub struct GeometryCleaner {
    /// Rings with less area are discarded (m²)
    min_area: f64,
    /// Boundaries closer than this interact (m)
    merge_tolerance: f64,
    /// Maximum vertex deviation removed by simplification (m)
    simplify_tolerance: f64,
}

impl Default for GeometryCleaner {
    fn default() -> Self {
        Self {
            min_area: 1e-6,
            merge_tolerance: 1e-4,
            simplify_tolerance: 1e-3,
        }
    }
}

impl GeometryCleaner {
    pub fn new(min_area: f64, merge_tolerance: f64, simplify_tolerance: f64) -> Self {
        Self {
            min_area,
            merge_tolerance,
            simplify_tolerance,
        }
    }

    /// Clean one storey's footprints
    pub fn clean(&self, footprints: Vec<Footprint>) -> Cleaned {
        let mut stats = CleanStats::default();

        let prepared: Vec<Footprint> = footprints
            .into_iter()
            .filter_map(|fp| self.discard_degenerate(fp, &mut stats))
            .collect();

        let merged = self.union_interacting(prepared, &mut stats);

        let mut cleaned = Vec::with_capacity(merged.len());
        for fp in merged {
            for mut fp in self.repair(fp, &mut stats) {
                self.simplify(&mut fp, &mut stats);
                canonicalize(&mut fp);
                if fp.outer.area() >= self.min_area {
                    cleaned.push(fp);
                } else {
                    stats.dropped_rings += 1;
                }
            }
        }

        cleaned.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.first_element().cmp(&b.first_element()))
                .then_with(|| compare_points(&a.outer.points, &b.outer.points))
        });

        tracing::debug!(
            footprints = cleaned.len(),
            dropped = stats.dropped_rings,
            merged_groups = stats.merged_groups,
            repaired = stats.repaired,
            "Cleaned footprints"
        );

        Cleaned {
            footprints: cleaned,
            stats,
        }
    }

    /// Snap, drop repeated points and discard rings without area
    fn discard_degenerate(&self, mut fp: Footprint, stats: &mut CleanStats) -> Option<Footprint> {
        prepare_ring(&mut fp.outer);
        if fp.outer.points.len() < 3 || fp.outer.area() < self.min_area {
            stats.dropped_rings += 1 + fp.holes.len();
            return None;
        }

        let before = fp.holes.len();
        fp.holes.retain_mut(|hole| {
            prepare_ring(hole);
            hole.points.len() >= 3 && hole.area() >= self.min_area
        });
        stats.dropped_rings += before - fp.holes.len();
        fp.openings.retain_mut(|opening| {
            prepare_ring(opening);
            opening.points.len() >= 3
        });

        Some(fp)
    }

    /// Union connected groups of interacting same-category footprints
    fn union_interacting(&self, footprints: Vec<Footprint>, stats: &mut CleanStats) -> Vec<Footprint> {
        let groups = self.interaction_groups(&footprints);
        let mut slots: Vec<Option<Footprint>> = footprints.into_iter().map(Some).collect();

        let mut result = Vec::with_capacity(slots.len());
        for group in groups {
            let members: Vec<Footprint> = group.iter().filter_map(|&i| slots[i].take()).collect();
            if members.len() == 1 {
                result.extend(members);
                continue;
            }

            stats.merged_groups += 1;
            let subject = footprint_paths(&members[0]);
            let clip: Vec<Vec<[f64; 2]>> = members[1..].iter().flat_map(footprint_paths).collect();
            let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

            tracing::trace!(members = members.len(), shapes = shapes.len(), "Unioned footprint group");
            result.extend(shapes_to_footprints(&shapes, &members));
        }

        result
    }

    /// Connected components of the interaction graph, in input order
    fn interaction_groups(&self, footprints: &[Footprint]) -> Vec<Vec<usize>> {
        let n = footprints.len();
        let bounds: Vec<Option<Bounds2>> = footprints
            .iter()
            .map(|fp| fp.bounds().map(|b| b.expanded(self.merge_tolerance)))
            .collect();

        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if footprints[i].category != footprints[j].category {
                    continue;
                }
                let (Some(bi), Some(bj)) = (bounds[i], bounds[j]) else {
                    continue;
                };
                if !bi.overlaps(&bj) || !self.interacts(&footprints[i], &footprints[j]) {
                    continue;
                }
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of_root = vec![usize::MAX; n];
        for i in 0..n {
            let root = find(&mut parent, i);
            if group_of_root[root] == usize::MAX {
                group_of_root[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[group_of_root[root]].push(i);
        }
        groups
    }

    fn interacts(&self, a: &Footprint, b: &Footprint) -> bool {
        ring::ring_distance(&a.outer.points, &b.outer.points) <= self.merge_tolerance
            || ring::ring_contains_ring(&a.outer.points, &b.outer.points, 0.0)
            || ring::ring_contains_ring(&b.outer.points, &a.outer.points, 0.0)
    }

    /// Rebuild a footprint through the boolean engine if any ring
    /// self-intersects or a hole touches another ring
    fn repair(&self, mut fp: Footprint, stats: &mut CleanStats) -> Vec<Footprint> {
        if is_valid(&fp) {
            return vec![fp];
        }

        stats.repaired += 1;
        tracing::trace!(storey = %fp.storey_id, holes = fp.holes.len(), "Repairing footprint");

        let (crossing, holes): (Vec<Ring>, Vec<Ring>) = std::mem::take(&mut fp.holes)
            .into_iter()
            .partition(|hole| hole.category.is_opening() && splits_outer(&fp.outer, hole));
        fp.holes = holes;
        if !crossing.is_empty() {
            stats.boundary_openings += crossing.len();
            fp.openings.extend(crossing);
            if is_valid(&fp) {
                return vec![fp];
            }
        }

        let subject = vec![ring_path(&fp.outer.points, true)];
        let clip: Vec<Vec<[f64; 2]>> = fp.holes.iter().map(|h| ring_path(&h.points, true)).collect();
        let shapes = subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero);

        let mut repaired = shapes_to_footprints(&shapes, std::slice::from_ref(&fp));
        for out in &mut repaired {
            out.holes.retain_mut(|hole| {
                prepare_ring(hole);
                hole.points.len() >= 3
            });
            prepare_ring(&mut out.outer);
        }
        repaired.retain(|out| out.outer.points.len() >= 3);
        repaired
    }

    /// Remove near-collinear vertices until nothing more can go
    fn simplify(&self, fp: &mut Footprint, stats: &mut CleanStats) {
        loop {
            let mut changed = false;
            for r in 0..=fp.holes.len() {
                let mut i = 0;
                while i < ring_at(fp, r).points.len() {
                    if self.removable(fp, r, i) {
                        ring_at_mut(fp, r).points.remove(i);
                        stats.removed_vertices += 1;
                        changed = true;
                    } else {
                        i += 1;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Check if vertex `i` of ring `r` can be dropped without moving the
    /// boundary more than the tolerance or changing the topology
    fn removable(&self, fp: &Footprint, r: usize, i: usize) -> bool {
        let points = &ring_at(fp, r).points;
        let n = points.len();
        if n <= 3 {
            return false;
        }

        let prev = points[(i + n - 1) % n];
        let next = points[(i + 1) % n];
        let vertex = points[i];
        if ring::point_segment_distance(&vertex, &prev, &next) >= self.simplify_tolerance {
            return false;
        }

        // The new chord must not touch the rest of this ring
        for (j, a, b) in ring::edges(points) {
            let adjacent = [(i + n - 2) % n, (i + n - 1) % n, i, (i + 1) % n];
            if adjacent.contains(&j) {
                continue;
            }
            if ring::segments_intersect(&prev, &next, a, b) {
                return false;
            }
        }

        // ...nor any other ring, and no other ring may sit in the cut-off sliver
        let sliver = [prev, vertex, next];
        for (k, other) in fp.rings().enumerate() {
            if k == r {
                continue;
            }
            let crosses = ring::edges(&other.points)
                .any(|(_, a, b)| ring::segments_intersect(&prev, &next, a, b));
            if crosses || other.points.iter().any(|p| ring::point_in_ring(p, &sliver)) {
                return false;
            }
        }

        // Winding and minimum area survive
        let mut remaining = points.clone();
        remaining.remove(i);
        let before = ring::signed_area(points);
        let after = ring::signed_area(&remaining);
        before.signum() == after.signum() && after.abs() >= self.min_area
    }
}

#[inline]
fn ring_at(fp: &Footprint, r: usize) -> &Ring {
    if r == 0 {
        &fp.outer
    } else {
        &fp.holes[r - 1]
    }
}

#[inline]
fn ring_at_mut(fp: &mut Footprint, r: usize) -> &mut Ring {
    if r == 0 {
        &mut fp.outer
    } else {
        &mut fp.holes[r - 1]
    }
}

/// Snap to the canonical grid and drop repeated points
fn prepare_ring(ring: &mut Ring) {
    ring::snap(&mut ring.points, SNAP_GRID);
    ring::dedup_points(&mut ring.points, SNAP_GRID * 0.5);
    ring.normalize_orientation();
}

/// Orient, rotate and order rings into canonical form
fn canonicalize(fp: &mut Footprint) {
    fp.outer.normalize_orientation();
    ring::rotate_to_min(&mut fp.outer.points);
    for hole in &mut fp.holes {
        hole.normalize_orientation();
        ring::rotate_to_min(&mut hole.points);
    }
    fp.holes.sort_by(|a, b| compare_points(&a.points, &b.points));
    for opening in &mut fp.openings {
        opening.normalize_orientation();
        ring::rotate_to_min(&mut opening.points);
    }
    fp.openings.sort_by(|a, b| compare_points(&a.points, &b.points));
    fp.category = fp.outer.category;
}

fn compare_points(a: &[Point2<f64>], b: &[Point2<f64>]) -> std::cmp::Ordering {
    for (p, q) in a.iter().zip(b) {
        let ord = p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y));
        if ord.is_ne() {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Check the ring-level validity rules of a footprint
fn is_valid(fp: &Footprint) -> bool {
    if fp.rings().any(|r| ring::ring_self_intersects(&r.points)) {
        return false;
    }

    for (i, hole) in fp.holes.iter().enumerate() {
        if ring::rings_touch(&hole.points, &fp.outer.points)
            || !ring::ring_contains_ring(&fp.outer.points, &hole.points, 0.0)
        {
            return false;
        }
        if fp.holes[i + 1..].iter().any(|other| {
            ring::rings_touch(&hole.points, &other.points)
                || ring::ring_contains_ring(&hole.points, &other.points, 0.0)
                || ring::ring_contains_ring(&other.points, &hole.points, 0.0)
        }) {
            return false;
        }
    }

    true
}

/// Check if cutting `hole` out of `outer` leaves more pieces than the outer
/// alone. Holes strictly inside the outer never split it.
fn splits_outer(outer: &Ring, hole: &Ring) -> bool {
    if !ring::rings_touch(&hole.points, &outer.points)
        && ring::ring_contains_ring(&outer.points, &hole.points, 0.0)
    {
        return false;
    }

    let subject = vec![ring_path(&outer.points, true)];
    let nothing: Vec<Vec<[f64; 2]>> = Vec::new();
    let clip = vec![ring_path(&hole.points, true)];
    let before = subject.overlay(&nothing, OverlayRule::Difference, FillRule::NonZero).len();
    let after = subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero).len();
    after > before
}

/// Convert a ring to i_overlay path format with the requested winding
fn ring_path(points: &[Point2<f64>], ccw: bool) -> Vec<[f64; 2]> {
    let mut path: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
    let area = ring::signed_area(points);
    if (ccw && area < 0.0) || (!ccw && area > 0.0) {
        path.reverse();
    }
    path
}

/// Outer counter-clockwise, holes clockwise, so the non-zero rule subtracts
/// holes
fn footprint_paths(fp: &Footprint) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(ring_path(&fp.outer.points, true))
        .chain(fp.holes.iter().map(|h| ring_path(&h.points, false)))
        .collect()
}

/// Convert i_overlay result shapes back to footprints, carrying provenance
/// over from the `sources` that produced them.
///
/// i_overlay returns `Vec<Vec<Vec<[f64; 2]>>>`: shapes, each a list of
/// contours where the first is the outer boundary and the rest are holes.
fn shapes_to_footprints(shapes: &[Vec<Vec<[f64; 2]>>], sources: &[Footprint]) -> Vec<Footprint> {
    let Some(first) = sources.first() else {
        return Vec::new();
    };
    let category = first.category;
    let storey_id = first.storey_id.as_str();

    let mut footprints = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let Some((outer, holes)) = shape.split_first() else {
            continue;
        };
        let outer = to_points(outer);
        if outer.len() < 3 {
            continue;
        }

        // Sources whose material lies inside this shape
        let mut elements: BTreeSet<ElementId> = BTreeSet::new();
        for source in sources {
            let inside = ring::interior_point(&source.outer.points)
                .is_some_and(|p| ring::point_in_ring(&p, &outer));
            if inside {
                elements.extend(source.elements().iter().cloned());
            }
        }
        if elements.is_empty() {
            elements = sources.iter().flat_map(|s| s.elements().iter().cloned()).collect();
        }

        let holes: Vec<Ring> = holes
            .iter()
            .map(|contour| to_points(contour))
            .filter(|points| points.len() >= 3)
            .map(|points| {
                // A surviving source hole keeps its own provenance
                let origin = ring::interior_point(&points).and_then(|p| {
                    sources
                        .iter()
                        .flat_map(|s| s.holes.iter())
                        .find(|h| ring::point_in_ring(&p, &h.points))
                });
                match origin {
                    Some(h) => Ring::new(points, RingRole::Hole, h.category, h.elements.clone()),
                    None => Ring::new(points, RingRole::Hole, category, elements.clone()),
                }
            })
            .collect();

        let openings: Vec<Ring> = sources
            .iter()
            .flat_map(|s| s.openings.iter())
            .filter(|opening| {
                ring::interior_point(&opening.points).is_some_and(|p| ring::point_in_ring(&p, &outer))
            })
            .cloned()
            .collect();

        let outer = Ring::new(outer, RingRole::Outer, category, elements);
        let mut footprint = Footprint::new(storey_id, outer, holes);
        footprint.openings = openings;
        footprints.push(footprint);
    }

    footprints
}

fn to_points(contour: &[[f64; 2]]) -> Vec<Point2<f64>> {
    contour.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use batchplan_model::Category;
    use std::sync::Arc;

    fn rect_ring(x0: f64, y0: f64, x1: f64, y1: f64, role: RingRole, id: &str, category: Category) -> Ring {
        Ring::new(
            vec![
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ],
            role,
            category,
            BTreeSet::from([Arc::from(id)]),
        )
    }

    fn wall(x0: f64, y0: f64, x1: f64, y1: f64, id: &str) -> Footprint {
        Footprint::new("L0", rect_ring(x0, y0, x1, y1, RingRole::Outer, id, Category::Wall), Vec::new())
    }

    #[test]
    fn test_drops_zero_area() {
        let sliver = wall(0.0, 0.0, 1.0, 1e-9, "W1");
        let cleaned = GeometryCleaner::default().clean(vec![sliver, wall(5.0, 5.0, 6.0, 6.0, "W2")]);
        assert_eq!(cleaned.footprints.len(), 1);
        assert_eq!(cleaned.stats.dropped_rings, 1);
    }

    #[test]
    fn test_unions_overlapping_walls() {
        let cleaned = GeometryCleaner::default().clean(vec![
            wall(0.0, 0.0, 5.0, 0.3, "W1"),
            wall(4.0, 0.0, 10.0, 0.3, "W2"),
        ]);
        assert_eq!(cleaned.footprints.len(), 1);
        assert_eq!(cleaned.stats.merged_groups, 1);
        let fp = &cleaned.footprints[0];
        assert_relative_eq!(fp.area(), 3.0, epsilon = 1e-6);
        assert_eq!(fp.elements().len(), 2);
        assert_eq!(fp.outer.points.len(), 4);
    }

    #[test]
    fn test_different_categories_do_not_merge() {
        let slab = Footprint::new(
            "L0",
            rect_ring(0.0, 0.0, 5.0, 5.0, RingRole::Outer, "S1", Category::Slab),
            Vec::new(),
        );
        let cleaned = GeometryCleaner::default().clean(vec![slab, wall(0.0, 0.0, 5.0, 0.3, "W1")]);
        assert_eq!(cleaned.footprints.len(), 2);
        assert_eq!(cleaned.stats.merged_groups, 0);
    }

    #[test]
    fn test_frame_of_walls_becomes_annulus() {
        let cleaned = GeometryCleaner::default().clean(vec![
            wall(0.0, 0.0, 10.0, 0.3, "W1"),
            wall(9.7, 0.0, 10.0, 8.0, "W2"),
            wall(0.0, 7.7, 10.0, 8.0, "W3"),
            wall(0.0, 0.0, 0.3, 8.0, "W4"),
        ]);
        assert_eq!(cleaned.footprints.len(), 1);
        let fp = &cleaned.footprints[0];
        assert_eq!(fp.holes.len(), 1);
        assert_eq!(fp.holes[0].category, Category::Wall);
        assert_relative_eq!(fp.area(), 80.0 - 9.4 * 7.4, epsilon = 1e-5);
        assert!(fp.outer.signed_area() > 0.0);
        assert!(fp.holes[0].signed_area() < 0.0);
    }

    #[test]
    fn test_simplify_removes_collinear_points() {
        let mut fp = wall(0.0, 0.0, 4.0, 1.0, "W1");
        fp.outer.points.insert(1, Point2::new(2.0, 0.0002));
        fp.outer.points.insert(1, Point2::new(1.0, 0.0));
        let cleaned = GeometryCleaner::default().clean(vec![fp]);
        assert_eq!(cleaned.footprints[0].outer.points.len(), 4);
        assert_eq!(cleaned.stats.removed_vertices, 2);
    }

    #[test]
    fn test_simplify_keeps_real_corners() {
        let l_shape = Ring::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 0.01),
                Point2::new(1.0, 0.01),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            RingRole::Outer,
            Category::Wall,
            BTreeSet::from([Arc::from("W1")]),
        );
        let cleaned = GeometryCleaner::default().clean(vec![Footprint::new("L0", l_shape, Vec::new())]);
        assert_eq!(cleaned.footprints[0].outer.points.len(), 6);
    }

    #[test]
    fn test_hole_touching_outer_becomes_notch() {
        let mut fp = wall(0.0, 0.0, 10.0, 0.3, "W1");
        fp.holes.push(rect_ring(4.0, 0.0, 5.0, 0.2, RingRole::Hole, "D1", Category::Door));
        let cleaned = GeometryCleaner::default().clean(vec![fp]);

        assert_eq!(cleaned.stats.repaired, 1);
        assert_eq!(cleaned.footprints.len(), 1);
        let fp = &cleaned.footprints[0];
        assert!(fp.holes.is_empty());
        assert_relative_eq!(fp.area(), 3.0 - 0.2, epsilon = 1e-6);
        assert_eq!(fp.outer.points.len(), 8);
    }

    #[test]
    fn test_full_thickness_door_keeps_wall_whole() {
        let mut fp = wall(0.0, 0.0, 10.0, 0.3, "W1");
        fp.holes.push(rect_ring(4.0, 0.0, 5.0, 0.3, RingRole::Hole, "D1", Category::Door));
        let cleaned = GeometryCleaner::default().clean(vec![fp]);

        assert_eq!(cleaned.footprints.len(), 1);
        assert_eq!(cleaned.stats.boundary_openings, 1);
        let fp = &cleaned.footprints[0];
        assert!(fp.holes.is_empty());
        assert_eq!(fp.openings.len(), 1);
        assert_eq!(fp.openings[0].category, Category::Door);
        assert_eq!(fp.openings[0].first_element(), Some("D1"));
        assert_relative_eq!(fp.outer.area(), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_boundary_opening_survives_union() {
        let mut with_door = wall(0.0, 0.0, 10.0, 0.3, "W1");
        with_door.holes.push(rect_ring(4.0, 0.0, 5.0, 0.3, RingRole::Hole, "D1", Category::Door));
        let cleaner = GeometryCleaner::default();
        let once = cleaner.clean(vec![with_door]).footprints;

        let mut input = once.clone();
        input.push(wall(9.7, 0.0, 10.0, 8.0, "W2"));
        let merged = cleaner.clean(input).footprints;
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].elements().len(), 2);
        assert_eq!(merged[0].openings, once[0].openings);
    }

    #[test]
    fn test_bowtie_is_repaired() {
        // Edges cross at (1.2, 1.2); the two lobes have areas 1.8 and 0.8
        let bowtie = Ring {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 2.0),
                Point2::new(2.0, 0.0),
                Point2::new(0.0, 3.0),
            ],
            role: RingRole::Outer,
            category: Category::Other,
            elements: BTreeSet::from([Arc::from("X")]),
        };
        let cleaned = GeometryCleaner::default().clean(vec![Footprint::new("L0", bowtie, Vec::new())]);
        assert_eq!(cleaned.stats.repaired, 1);
        assert!(!cleaned.footprints.is_empty());
        let total: f64 = cleaned.footprints.iter().map(Footprint::area).sum();
        assert_relative_eq!(total, 2.6, epsilon = 1e-6);
        assert!(cleaned.footprints.iter().all(|fp| fp.first_element() == Some("X")));
    }

    #[test]
    fn test_canonical_start_and_orientation() {
        let mut fp = wall(0.0, 0.0, 2.0, 1.0, "W1");
        fp.outer.points.rotate_left(2);
        fp.outer.points.reverse();
        let cleaned = GeometryCleaner::default().clean(vec![fp]);
        let outer = &cleaned.footprints[0].outer;
        assert_eq!(outer.points[0], Point2::new(0.0, 0.0));
        assert_eq!(outer.points[1], Point2::new(2.0, 0.0));
        assert!(outer.signed_area() > 0.0);
    }

    #[test]
    fn test_idempotent() {
        let mut with_door = wall(20.0, 0.0, 30.0, 0.3, "W9");
        with_door.holes.push(rect_ring(24.0, 0.05, 25.0, 0.25, RingRole::Hole, "D1", Category::Door));
        let mut cut_through = wall(40.0, 0.0, 50.0, 0.3, "W8");
        cut_through.holes.push(rect_ring(44.0, 0.0, 45.0, 0.3, RingRole::Hole, "D2", Category::Door));
        let input = vec![
            cut_through,
            wall(0.0, 0.0, 10.0, 0.3, "W1"),
            wall(9.7, 0.0, 10.0, 8.0, "W2"),
            wall(0.0, 7.7, 10.0, 8.0, "W3"),
            wall(0.0, 0.0, 0.3, 8.0, "W4"),
            with_door,
        ];

        let cleaner = GeometryCleaner::default();
        let once = cleaner.clean(input).footprints;
        let twice = cleaner.clean(once.clone()).footprints;
        assert_eq!(once, twice);
    }
}
