// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! batchplan geometry
//!
//! The 3D to 2D core of floor plan extraction: slice element meshes with a
//! horizontal plane, stitch the cut segments into rings, and clean the rings
//! into valid footprints. Boolean operations run through i_overlay and
//! transformations through nalgebra.

pub mod assemble;
pub mod clean;
pub mod error;
pub mod polygon;
pub mod ring;
pub mod slice;
pub mod wkt;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3};

pub use assemble::{Assembly, AssemblyGap, AssemblyStats, PolygonAssembler};
pub use clean::{CleanStats, Cleaned, GeometryCleaner};
pub use error::{Error, Result};
pub use polygon::{ElementId, Footprint, Ring, RingRole, SliceSegment};
pub use ring::Bounds2;
pub use slice::{MeshSlicer, Plane, SliceOutput, SliceStats};
pub use wkt::{footprint_to_wkt, parse_polygon, polygon_to_wkt};
