// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON building-model ingestion.
//!
//! The interchange format is a flattened spatial hierarchy: storeys with
//! optional member lists, and elements carrying a triangulated mesh plus a
//! column-major placement matrix. The `*Record` types mirror the file; the
//! loader converts them into [`BuildingModel`] and reports what it had to
//! drop along the way.

use crate::category::Category;
use crate::element::{BuildingElement, BuildingModel, Storey};
use crate::error::{Error, Result};
use crate::mesh::ElementMesh;
use nalgebra::Matrix4;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Source types that never carry drawable plan geometry
const SKIPPED_TYPES: [&str; 7] = [
    "ifcopeningelement",
    "ifcannotation",
    "ifcgrid",
    "ifcgridaxis",
    "ifcvirtualelement",
    "ifcprojectionelement",
    "ifcspace",
];

/// Root of the JSON interchange file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDocument {
    /// Building name; the file stem is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Metres per model unit (0.001 for millimetre models)
    #[serde(default = "default_unit_scale")]
    pub unit_scale: f64,
    #[serde(default)]
    pub storeys: Vec<StoreyRecord>,
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
}

/// A storey as written in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreyRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub elevation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

/// An element as written in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshRecord>,
    /// 4x4 column-major placement; identity when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Vec<f64>>,
}

/// Flat mesh arrays: `[x0, y0, z0, x1, ...]` and `[i0, i1, i2, ...]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshRecord {
    pub coordinates: Vec<f64>,
    pub indices: Vec<u32>,
}

fn default_unit_scale() -> f64 {
    1.0
}

/// Something the loader dropped or repaired. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestIssue {
    DuplicateElement(String),
    DuplicateStorey(String),
    SkippedType { id: String, type_name: String },
    MissingMesh(String),
    InvalidTransform(String),
    RepairedMesh { id: String, dropped_triangles: usize },
}

impl fmt::Display for IngestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestIssue::DuplicateElement(id) => write!(f, "duplicate element id '{}' ignored", id),
            IngestIssue::DuplicateStorey(id) => write!(f, "duplicate storey id '{}' ignored", id),
            IngestIssue::SkippedType { id, type_name } => {
                write!(f, "element '{}' of type {} has no plan geometry", id, type_name)
            }
            IngestIssue::MissingMesh(id) => write!(f, "element '{}' has no usable mesh", id),
            IngestIssue::InvalidTransform(id) => {
                write!(f, "element '{}' has an invalid placement transform", id)
            }
            IngestIssue::RepairedMesh {
                id,
                dropped_triangles,
            } => write!(
                f,
                "element '{}': dropped {} malformed triangles",
                id, dropped_triangles
            ),
        }
    }
}

/// A model plus the ingestion issues found while building it
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: BuildingModel,
    pub issues: Vec<IngestIssue>,
}

/// Source of building models
pub trait ModelLoader: Send + Sync {
    /// Load the building stored at `path`
    fn load(&self, path: &Path) -> Result<LoadedModel>;
}

/// Loader for the JSON interchange format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelLoader;

impl JsonModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse a model from JSON text. `fallback_name` is used when the
    /// document carries no building name.
    pub fn parse_str(&self, json: &str, fallback_name: &str) -> Result<LoadedModel> {
        let document: ModelDocument = serde_json::from_str(json)?;
        convert_document(document, fallback_name)
    }
}

impl ModelLoader for JsonModelLoader {
    fn load(&self, path: &Path) -> Result<LoadedModel> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "building".to_string());

        let loaded = self.parse_str(&content, &stem)?;
        tracing::debug!(
            path = %path.display(),
            storeys = loaded.model.storeys.len(),
            elements = loaded.model.elements.len(),
            issues = loaded.issues.len(),
            "Loaded building model"
        );
        Ok(loaded)
    }
}

/// Convert the file representation into pipeline value types
fn convert_document(document: ModelDocument, fallback_name: &str) -> Result<LoadedModel> {
    let unit_scale = document.unit_scale;
    if !unit_scale.is_finite() || unit_scale <= 0.0 {
        return Err(Error::Invalid(format!(
            "unit_scale must be a positive number, got {}",
            unit_scale
        )));
    }

    let name = document
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| fallback_name.to_string());

    let mut model = BuildingModel::new(name);
    let mut issues = Vec::new();

    let mut storey_ids: FxHashSet<String> = FxHashSet::default();
    for record in document.storeys {
        if !record.elevation.is_finite() {
            return Err(Error::Invalid(format!(
                "storey '{}' has a non-finite elevation",
                record.id
            )));
        }
        if !storey_ids.insert(record.id.clone()) {
            issues.push(IngestIssue::DuplicateStorey(record.id));
            continue;
        }

        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Level_{}", record.id));

        model.storeys.push(Storey {
            id: record.id,
            name,
            elevation: record.elevation * unit_scale,
            members: record.members,
        });
    }

    let mut element_ids: FxHashSet<String> = FxHashSet::default();
    for record in document.elements {
        if !element_ids.insert(record.id.clone()) {
            issues.push(IngestIssue::DuplicateElement(record.id));
            continue;
        }

        if SKIPPED_TYPES.contains(&record.type_name.to_ascii_lowercase().as_str()) {
            issues.push(IngestIssue::SkippedType {
                id: record.id,
                type_name: record.type_name,
            });
            continue;
        }

        let Some(mesh_record) = record.mesh else {
            issues.push(IngestIssue::MissingMesh(record.id));
            continue;
        };

        let placement = match record.transform.as_deref() {
            None => Matrix4::identity(),
            Some(values) => match parse_placement(values, unit_scale) {
                Some(m) => m,
                None => {
                    issues.push(IngestIssue::InvalidTransform(record.id));
                    continue;
                }
            },
        };

        let (mesh, repair) =
            ElementMesh::from_flat(&mesh_record.coordinates, &mesh_record.indices, unit_scale);
        if mesh.is_empty() {
            issues.push(IngestIssue::MissingMesh(record.id));
            continue;
        }
        if repair.dropped_triangles > 0 {
            issues.push(IngestIssue::RepairedMesh {
                id: record.id.clone(),
                dropped_triangles: repair.dropped_triangles,
            });
        }

        model.elements.push(BuildingElement {
            category: Category::from_type_name(&record.type_name),
            id: record.id,
            type_name: record.type_name,
            name: record.name,
            mesh,
            placement,
        });
    }

    Ok(LoadedModel { model, issues })
}

/// Column-major 4x4 matrix with its translation converted to metres.
///
/// Local coordinates are scaled at load time, so scaling the translation
/// column keeps `placement * local` in metres.
fn parse_placement(values: &[f64], unit_scale: f64) -> Option<Matrix4<f64>> {
    if values.len() != 16 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let mut m = Matrix4::from_column_slice(values);
    for row in 0..3 {
        m[(row, 3)] *= unit_scale;
    }
    Some(m)
}
