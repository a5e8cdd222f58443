// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Matrix4, Point3};

/// Indexed triangle mesh in an element's local coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementMesh {
    /// Vertex positions
    pub vertices: Vec<Point3<f64>>,
    /// Triangle vertex indices
    pub triangles: Vec<[u32; 3]>,
}

/// What had to be dropped to make a source mesh usable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshRepair {
    /// Triangles referencing a missing or non-finite vertex
    pub dropped_triangles: usize,
    /// Trailing coordinates that did not form a full vertex
    pub dangling_coordinates: usize,
    /// Trailing indices that did not form a full triangle
    pub dangling_indices: usize,
}

impl MeshRepair {
    /// Check if the source mesh was used as-is
    #[inline]
    pub fn is_clean(&self) -> bool {
        *self == MeshRepair::default()
    }
}

impl ElementMesh {
    /// Create a mesh from validated parts
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Build a mesh from flat coordinate and index arrays, dropping whatever
    /// cannot be interpreted.
    ///
    /// Coordinates are multiplied by `unit_scale` on the way in.
    pub fn from_flat(coordinates: &[f64], indices: &[u32], unit_scale: f64) -> (Self, MeshRepair) {
        let mut repair = MeshRepair {
            dangling_coordinates: coordinates.len() % 3,
            dangling_indices: indices.len() % 3,
            ..MeshRepair::default()
        };

        let vertices: Vec<Point3<f64>> = coordinates
            .chunks_exact(3)
            .map(|c| Point3::new(c[0] * unit_scale, c[1] * unit_scale, c[2] * unit_scale))
            .collect();

        let vertex_ok = |i: u32| {
            vertices
                .get(i as usize)
                .is_some_and(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
        };

        let mut triangles = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            if tri.iter().all(|&i| vertex_ok(i)) {
                triangles.push([tri[0], tri[1], tri[2]]);
            } else {
                repair.dropped_triangles += 1;
            }
        }

        (Self::new(vertices, triangles), repair)
    }

    /// Closed axis-aligned box with outward-facing counter-clockwise triangles
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Self {
        let vertices = vec![
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ];
        let triangles = vec![
            // bottom
            [0, 2, 1],
            [0, 3, 2],
            // top
            [4, 5, 6],
            [4, 6, 7],
            // front (y = min)
            [0, 1, 5],
            [0, 5, 4],
            // right (x = max)
            [1, 2, 6],
            [1, 6, 5],
            // back (y = max)
            [2, 3, 7],
            [2, 7, 6],
            // left (x = min)
            [3, 0, 4],
            [3, 4, 7],
        ];
        Self::new(vertices, triangles)
    }

    /// Check if mesh has no usable triangles
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Vertex positions after applying `placement`
    pub fn transformed_vertices(&self, placement: &Matrix4<f64>) -> Vec<Point3<f64>> {
        self.vertices
            .iter()
            .map(|p| placement.transform_point(p))
            .collect()
    }
}
