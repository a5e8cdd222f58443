// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh slicing
//!
//! Intersects element meshes with a horizontal plane and emits one 2D segment
//! per triangle that straddles it. An edge lying in the plane is emitted by the
//! triangle above it only, so faces split at the cut height still close.
//! Triangles coplanar with the plane contribute nothing.

use crate::polygon::{ElementId, SliceSegment};
use batchplan_model::BuildingElement;
use nalgebra::{Point2, Point3, Vector3};
use std::sync::Arc;

/// Plane definition
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Point on the plane
    pub point: Point3<f64>,
    /// Normal vector (must be normalized)
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Create a new plane
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Horizontal plane at height `z`, normal pointing up
    pub fn horizontal(z: f64) -> Self {
        Self::new(Point3::new(0.0, 0.0, z), Vector3::z())
    }

    /// Calculate signed distance from point to plane
    /// Positive = above, Negative = below
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.point).dot(&self.normal)
    }

    /// Height of the plane (meaningful for horizontal planes)
    #[inline]
    pub fn z(&self) -> f64 {
        self.point.z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Above,
    Below,
    On,
}

/// Counters gathered while slicing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceStats {
    /// Elements whose vertical extent reaches the plane
    pub elements_cut: usize,
    /// Elements rejected by the extent pre-check
    pub elements_skipped: usize,
    pub triangles_visited: usize,
    pub segments: usize,
    /// Segments discarded for being shorter than the minimum length
    pub degenerate: usize,
}

/// Segments cut from a set of elements
#[derive(Debug, Clone, Default)]
pub struct SliceOutput {
    pub segments: Vec<SliceSegment>,
    pub stats: SliceStats,
}

/// Cuts triangle meshes with a horizontal plane
#[derive(Debug, Clone, Copy)]
pub struct MeshSlicer {
    /// Vertices closer than this to the plane count as on it
    plane_epsilon: f64,
    /// Segments shorter than this are degenerate
    min_segment_length: f64,
}

impl Default for MeshSlicer {
    fn default() -> Self {
        Self {
            plane_epsilon: 1e-9,
            min_segment_length: 1e-7,
        }
    }
}

impl MeshSlicer {
    pub fn new(plane_epsilon: f64, min_segment_length: f64) -> Self {
        Self {
            plane_epsilon,
            min_segment_length,
        }
    }

    /// Slice every element with the plane, in iteration order
    pub fn slice_all<'a, I>(&self, elements: I, plane: &Plane) -> SliceOutput
    where
        I: IntoIterator<Item = &'a BuildingElement>,
    {
        let mut output = SliceOutput::default();
        for element in elements {
            self.slice_into(element, plane, &mut output);
        }

        tracing::debug!(
            z = plane.z(),
            elements_cut = output.stats.elements_cut,
            segments = output.stats.segments,
            degenerate = output.stats.degenerate,
            "Sliced elements"
        );

        output
    }

    /// Slice a single element
    pub fn slice_element(&self, element: &BuildingElement, plane: &Plane) -> SliceOutput {
        let mut output = SliceOutput::default();
        self.slice_into(element, plane, &mut output);
        output
    }

    fn slice_into(&self, element: &BuildingElement, plane: &Plane, output: &mut SliceOutput) {
        let vertices = element.world_vertices();
        let distances: Vec<f64> = vertices.iter().map(|v| plane.signed_distance(v)).collect();

        // Bounds pre-check: skip elements entirely above or below the plane.
        // Vertices within epsilon count as touching it.
        let reaches_above = distances.iter().any(|&d| d > self.plane_epsilon);
        let touches = distances.iter().any(|&d| d <= self.plane_epsilon);
        if !(reaches_above && touches) {
            output.stats.elements_skipped += 1;
            return;
        }
        output.stats.elements_cut += 1;

        let sides: Vec<Side> = distances.iter().map(|&d| self.side(d)).collect();
        let element_id: ElementId = Arc::from(element.id.as_str());

        for tri in &element.mesh.triangles {
            output.stats.triangles_visited += 1;

            let Some((start, end)) = self.cut_triangle(tri, &vertices, &distances, &sides) else {
                continue;
            };

            if (end - start).norm() < self.min_segment_length {
                output.stats.degenerate += 1;
                continue;
            }

            output.stats.segments += 1;
            output.segments.push(SliceSegment {
                start,
                end,
                element_id: Arc::clone(&element_id),
                category: element.category,
            });
        }
    }

    #[inline]
    fn side(&self, distance: f64) -> Side {
        if distance > self.plane_epsilon {
            Side::Above
        } else if distance < -self.plane_epsilon {
            Side::Below
        } else {
            Side::On
        }
    }

    /// Intersection of one triangle with the plane, if it straddles it
    fn cut_triangle(
        &self,
        tri: &[u32; 3],
        vertices: &[Point3<f64>],
        distances: &[f64],
        sides: &[Side],
    ) -> Option<(Point2<f64>, Point2<f64>)> {
        let side_of = |i: u32| sides[i as usize];

        let above = tri.iter().filter(|&&i| side_of(i) == Side::Above).count();
        let below = tri.iter().filter(|&&i| side_of(i) == Side::Below).count();

        if above == 1 && below == 0 {
            // Edge in the plane: only the triangle above emits it
            let mut on = tri.iter().copied().filter(|&i| side_of(i) == Side::On);
            let (a, b) = (on.next()?, on.next()?);
            let (a, b) = if a < b { (a, b) } else { (b, a) };
            let (pa, pb) = (&vertices[a as usize], &vertices[b as usize]);
            return Some((Point2::new(pa.x, pa.y), Point2::new(pb.x, pb.y)));
        }
        if above == 0 || below == 0 {
            // One-sided, touching at a vertex, or coplanar
            return None;
        }

        let crossing = |a: u32, b: u32| crossing_point(a, b, vertices, distances);

        if let Some(&on) = tri.iter().find(|&&i| side_of(i) == Side::On) {
            // One vertex on the plane, the other two on opposite sides
            let mut others = tri.iter().copied().filter(|&i| i != on);
            let (a, b) = (others.next()?, others.next()?);
            let p = &vertices[on as usize];
            return Some((Point2::new(p.x, p.y), crossing(a, b)));
        }

        // The lone vertex is the one on the minority side
        let lone_side = if above == 1 { Side::Above } else { Side::Below };
        let lone = tri.iter().copied().find(|&i| side_of(i) == lone_side)?;
        let mut others = tri.iter().copied().filter(|&i| i != lone);
        let (a, b) = (others.next()?, others.next()?);

        Some((crossing(lone, a), crossing(lone, b)))
    }
}

/// Point where edge `a b` crosses the plane, projected to XY.
///
/// Interpolates from the lower vertex index so triangles sharing the edge get
/// bit-identical points.
fn crossing_point(a: u32, b: u32, vertices: &[Point3<f64>], distances: &[f64]) -> Point2<f64> {
    let (a, b) = if a < b { (a, b) } else { (b, a) };
    let (pa, pb) = (&vertices[a as usize], &vertices[b as usize]);
    let (da, db) = (distances[a as usize], distances[b as usize]);
    let t = da / (da - db);
    Point2::new(pa.x + (pb.x - pa.x) * t, pa.y + (pb.y - pa.y) * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use batchplan_model::{Category, ElementMesh};
    use nalgebra::Matrix4;

    fn cuboid(id: &str, min: [f64; 3], max: [f64; 3]) -> BuildingElement {
        BuildingElement::new(
            id,
            Category::Wall,
            ElementMesh::cuboid(Point3::from(min), Point3::from(max)),
        )
    }

    #[test]
    fn test_plane_signed_distance() {
        let plane = Plane::horizontal(1.5);
        assert_relative_eq!(plane.signed_distance(&Point3::new(4.0, 2.0, 3.0)), 1.5);
        assert_relative_eq!(plane.signed_distance(&Point3::new(0.0, 0.0, 0.0)), -1.5);
    }

    #[test]
    fn test_slice_box_outline() {
        let element = cuboid("W1", [0.0, 0.0, 0.0], [4.0, 0.2, 3.0]);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.5));

        // Each side face is two triangles, each straddling the plane
        assert_eq!(output.segments.len(), 8);
        assert_eq!(output.stats.elements_cut, 1);
        let perimeter: f64 = output.segments.iter().map(SliceSegment::length).sum();
        assert_relative_eq!(perimeter, 8.4, epsilon = 1e-9);
        assert!(output.segments.iter().all(|s| s.element_id.as_ref() == "W1"));
        assert!(output.segments.iter().all(|s| s.category == Category::Wall));
    }

    #[test]
    fn test_slice_respects_placement() {
        let element = cuboid("W1", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
            .with_placement(Matrix4::new_translation(&Vector3::new(10.0, 0.0, 1.0)));
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.5));
        assert!(!output.segments.is_empty());
        assert!(output
            .segments
            .iter()
            .all(|s| s.start.x >= 10.0 - 1e-12 && s.end.x <= 11.0 + 1e-12));
    }

    #[test]
    fn test_element_out_of_range_is_skipped() {
        let element = cuboid("S1", [0.0, 0.0, 0.0], [5.0, 5.0, 0.3]);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.5));
        assert!(output.segments.is_empty());
        assert_eq!(output.stats.elements_skipped, 1);
        assert_eq!(output.stats.triangles_visited, 0);
    }

    #[test]
    fn test_plane_through_top_face_yields_nothing() {
        let element = cuboid("S1", [0.0, 0.0, 0.0], [5.0, 5.0, 1.5]);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.5));
        assert!(output.segments.is_empty());
    }

    /// Closed box whose side faces have a vertex row at `z_mid`
    fn split_box(min: [f64; 3], max: [f64; 3], z_mid: f64) -> ElementMesh {
        let corners = [
            (min[0], min[1]),
            (max[0], min[1]),
            (max[0], max[1]),
            (min[0], max[1]),
        ];
        let vertices = [min[2], z_mid, max[2]]
            .iter()
            .flat_map(|&z| corners.iter().map(move |&(x, y)| Point3::new(x, y, z)))
            .collect();
        let mut triangles = vec![[0, 2, 1], [0, 3, 2], [8, 9, 10], [8, 10, 11]];
        for band in 0..2u32 {
            for c in 0..4u32 {
                let n = (c + 1) % 4;
                let (a, b) = (band * 4 + c, band * 4 + n);
                let (d, e) = ((band + 1) * 4 + n, (band + 1) * 4 + c);
                triangles.push([a, b, d]);
                triangles.push([a, d, e]);
            }
        }
        ElementMesh::new(vertices, triangles)
    }

    #[test]
    fn test_faces_split_at_plane_height() {
        let mesh = split_box([0.0, 0.0, 0.0], [10.0, 0.3, 3.0], 1.5);
        let element = BuildingElement::new("W1", Category::Wall, mesh);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.5));

        // One segment per side face, emitted by the upper triangle only
        assert_eq!(output.segments.len(), 4);
        assert_eq!(output.stats.elements_cut, 1);
        let perimeter: f64 = output.segments.iter().map(SliceSegment::length).sum();
        assert_relative_eq!(perimeter, 20.6, epsilon = 1e-9);
    }

    #[test]
    fn test_edge_on_plane_counted_once() {
        // Two triangles sharing an edge at z = 1, one above and one below
        let mesh = ElementMesh::new(
            vec![
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(2.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 2.0),
                Point3::new(1.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2], [1, 0, 3]],
        );
        let element = BuildingElement::new("X", Category::Other, mesh);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.0));
        assert_eq!(output.segments.len(), 1);
        assert_relative_eq!(output.segments[0].length(), 2.0);
    }

    #[test]
    fn test_edge_touching_from_below_is_skipped() {
        let mesh = ElementMesh::new(
            vec![
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(2.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let element = BuildingElement::new("X", Category::Other, mesh);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.0));
        assert!(output.segments.is_empty());
        assert_eq!(output.stats.elements_skipped, 1);
    }

    #[test]
    fn test_element_standing_on_plane_is_cut() {
        let element = cuboid("W2", [0.0, 0.0, 1.5], [4.0, 0.2, 3.0]);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.5));
        assert_eq!(output.stats.elements_cut, 1);
        let perimeter: f64 = output.segments.iter().map(SliceSegment::length).sum();
        assert_relative_eq!(perimeter, 8.4, epsilon = 1e-9);
    }

    #[test]
    fn test_vertex_on_plane() {
        // One vertex exactly on the plane, the others on opposite sides
        let mesh = ElementMesh::new(
            vec![
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 2.0),
            ],
            vec![[0, 1, 2]],
        );
        let element = BuildingElement::new("X", Category::Other, mesh);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.0));
        assert_eq!(output.segments.len(), 1);
        let s = &output.segments[0];
        assert_relative_eq!(s.start.x, 0.0);
        assert_relative_eq!(s.end.x, 2.0);
    }

    #[test]
    fn test_sliver_is_degenerate() {
        // Two vertices nearly coincide in XY, so the cut has almost no length
        let mesh = ElementMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1e-9, 0.0, 2.0),
                Point3::new(0.0, 1e-9, 2.0),
            ],
            vec![[0, 1, 2]],
        );
        let element = BuildingElement::new("X", Category::Other, mesh);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.0));
        assert!(output.segments.is_empty());
        assert_eq!(output.stats.degenerate, 1);
    }

    #[test]
    fn test_shared_edges_give_identical_points() {
        let element = cuboid("W1", [0.3, 0.7, 0.0], [4.1, 0.9, 2.9]);
        let output = MeshSlicer::default().slice_element(&element, &Plane::horizontal(1.37));
        let mut endpoints: Vec<(u64, u64)> = output
            .segments
            .iter()
            .flat_map(|s| [s.start, s.end])
            .map(|p| (p.x.to_bits(), p.y.to_bits()))
            .collect();
        endpoints.sort();
        endpoints.dedup();
        // 4 corners plus one diagonal crossing per face
        assert_eq!(endpoints.len(), 8);
    }
}
