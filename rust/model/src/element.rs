// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building hierarchy value types

use crate::category::Category;
use crate::mesh::ElementMesh;
use nalgebra::{Matrix4, Point3};
use rustc_hash::FxHashMap;

/// A building element with its geometry. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct BuildingElement {
    /// Unique identifier (GlobalId in IFC sources)
    pub id: String,
    /// Drawing category
    pub category: Category,
    /// Source type name, e.g. `IfcWallStandardCase`
    pub type_name: String,
    /// Optional display name
    pub name: Option<String>,
    /// Geometry in local coordinates (metres)
    pub mesh: ElementMesh,
    /// Local-to-global placement (metres)
    pub placement: Matrix4<f64>,
}

impl BuildingElement {
    pub fn new(id: impl Into<String>, category: Category, mesh: ElementMesh) -> Self {
        Self {
            id: id.into(),
            category,
            type_name: category.as_str().to_string(),
            name: None,
            mesh,
            placement: Matrix4::identity(),
        }
    }

    /// Replace the placement transform
    pub fn with_placement(mut self, placement: Matrix4<f64>) -> Self {
        self.placement = placement;
        self
    }

    /// Vertex positions in global coordinates
    pub fn world_vertices(&self) -> Vec<Point3<f64>> {
        self.mesh.transformed_vertices(&self.placement)
    }

    /// Global vertical extent `(min_z, max_z)`, `None` for an empty mesh
    pub fn z_extent(&self) -> Option<(f64, f64)> {
        let mut extent: Option<(f64, f64)> = None;
        for p in self.world_vertices() {
            extent = Some(match extent {
                Some((lo, hi)) => (lo.min(p.z), hi.max(p.z)),
                None => (p.z, p.z),
            });
        }
        extent
    }
}

/// A horizontal building level
#[derive(Debug, Clone, PartialEq)]
pub struct Storey {
    /// Unique identifier
    pub id: String,
    /// Display name, used for output file names
    pub name: String,
    /// Reference elevation in metres
    pub elevation: f64,
    /// Explicit containment relation from the source, in source order.
    /// `None` when the source supplied none for this storey.
    pub members: Option<Vec<String>>,
}

impl Storey {
    pub fn new(id: impl Into<String>, name: impl Into<String>, elevation: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elevation,
            members: None,
        }
    }

    /// Attach an explicit member list
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }
}

/// A loaded building: storeys in declaration order plus all elements
#[derive(Debug, Clone, Default)]
pub struct BuildingModel {
    /// Building name (model name or source file stem)
    pub name: String,
    pub storeys: Vec<Storey>,
    pub elements: Vec<BuildingElement>,
}

impl BuildingModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storeys: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Map element id to its position in `elements`
    pub fn element_index(&self) -> FxHashMap<&str, usize> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect()
    }

    /// Look up an element by id
    pub fn element(&self, id: &str) -> Option<&BuildingElement> {
        self.elements.iter().find(|e| e.id == id)
    }
}
