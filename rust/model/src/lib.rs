// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batchplan building model
//!
//! Explicit value types for the building hierarchy consumed by the floor-plan
//! pipeline, and the loader that converts the JSON interchange format into
//! them. Everything downstream of the loader works on these types only.

pub mod category;
pub mod element;
pub mod error;
pub mod loader;
pub mod mesh;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3};

pub use category::Category;
pub use element::{BuildingElement, BuildingModel, Storey};
pub use error::{Error, Result};
pub use loader::{
    ElementRecord, IngestIssue, JsonModelLoader, LoadedModel, MeshRecord, ModelDocument,
    ModelLoader, StoreyRecord,
};
pub use mesh::{ElementMesh, MeshRepair};
