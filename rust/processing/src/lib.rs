// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! batchplan processing
//!
//! Everything between a loaded building model and files on disk: storey
//! assignment, the per-storey pipeline on a worker pool, styled rendering to
//! PNG, CSV export of WKT footprints and the run report.
//!
//! ```no_run
//! use batchplan_processing::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::from_env())?;
//! let report = pipeline.run(&["building.json"]);
//! println!("{}", report.summary());
//! # Ok::<(), batchplan_processing::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod report;
pub mod spatial;
pub mod style;

pub use config::{OutputFormat, PipelineConfig};
pub use error::{Error, Result};
pub use export::{ExportRecord, Exporter, CSV_HEADER};
pub use pipeline::{Artifact, BuildingDirs, Pipeline, StoreyOutcome, StoreyStage};
pub use raster::{draw_scene, DrawingBackend, RasterBackend};
pub use render::{AnnotationKind, DrawPrimitive, Scene, StyleRenderer, ViewTransform};
pub use report::{RunCounters, RunReport, Warning, WarningKind};
pub use spatial::{AssignmentIssue, SpatialIndex, SpatialIndexBuilder};
pub use style::{Color, FillPattern, StyleConfig, StyleName};
