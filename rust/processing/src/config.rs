// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration with environment defaults.

use crate::error::{Error, Result};
use crate::style::StyleName;
use batchplan_geometry::{GeometryCleaner, PolygonAssembler};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Artifact kind produced per storey
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rendered PNG floor plan
    Image,
    /// CSV of WKT footprints
    Wkt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Image => "png",
            OutputFormat::Wkt => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Image => "image",
            OutputFormat::Wkt => "wkt",
        })
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for generated files.
    pub output_dir: PathBuf,
    /// Artifacts to produce for every storey.
    pub formats: Vec<OutputFormat>,
    /// Drawing style for image output.
    pub style: StyleName,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Maximum elements sliced per storey, unbounded when `None`.
    pub max_elements: Option<usize>,
    /// Height of the slice plane above the storey elevation (m).
    pub slice_offset: f64,
    /// Distance under which segment endpoints are the same vertex (m).
    pub merge_tolerance: f64,
    /// Distance under which open chain ends are snapped together (m).
    pub gap_tolerance: f64,
    /// Maximum boundary deviation removed by simplification (m).
    pub simplify_tolerance: f64,
    /// Rings with less area are discarded (m²).
    pub min_area: f64,
    /// Number of worker threads for storey processing.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            formats: vec![OutputFormat::Wkt],
            style: StyleName::Professional,
            width: 2048,
            height: 2048,
            max_elements: None,
            slice_offset: 1.5,
            merge_tolerance: 1e-4,
            gap_tolerance: 0.01,
            simplify_tolerance: 1e-3,
            min_area: 1e-6,
            workers: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, with worker count and slice offset taken from
    /// `BATCHPLAN_WORKERS` and `BATCHPLAN_SLICE_OFFSET` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            workers: lookup("BATCHPLAN_WORKERS")
                .unwrap_or_else(|| defaults.workers.to_string())
                .parse()
                .unwrap_or(defaults.workers),
            slice_offset: lookup("BATCHPLAN_SLICE_OFFSET")
                .unwrap_or_else(|| defaults.slice_offset.to_string())
                .parse()
                .unwrap_or(defaults.slice_offset),
            ..defaults
        }
    }

    /// Check value ranges and the relation between tolerances
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "canvas size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.formats.is_empty() {
            return Err(Error::Config("at least one formatter is required".into()));
        }
        if self.max_elements == Some(0) {
            return Err(Error::Config("max elements must be positive".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("worker count must be positive".into()));
        }
        if !self.slice_offset.is_finite() {
            return Err(Error::Config("slice offset must be finite".into()));
        }
        if !(self.simplify_tolerance.is_finite() && self.simplify_tolerance >= 0.0) {
            return Err(Error::Config("simplify tolerance must not be negative".into()));
        }
        if !(self.min_area.is_finite() && self.min_area >= 0.0) {
            return Err(Error::Config("minimum area must not be negative".into()));
        }
        self.assembler().map(|_| ())
    }

    /// Check if `format` was requested
    pub fn wants(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }

    pub fn assembler(&self) -> Result<PolygonAssembler> {
        PolygonAssembler::new(self.merge_tolerance, self.gap_tolerance)
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn cleaner(&self) -> GeometryCleaner {
        GeometryCleaner::new(self.min_area, self.merge_tolerance, self.simplify_tolerance)
    }
}
