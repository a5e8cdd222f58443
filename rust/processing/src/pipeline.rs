// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch floor plan pipeline
//!
//! Files are processed one after another. Within a file every storey runs
//! `RAW -> SLICED -> ASSEMBLED -> CLEANED -> {RENDERED, EXPORTED}` on a
//! dedicated worker pool; workers return artifacts as bytes and the calling
//! thread writes them in storey declaration order.

use crate::config::{OutputFormat, PipelineConfig};
use crate::error::Result;
use crate::export::Exporter;
use crate::raster::RasterBackend;
use crate::render::StyleRenderer;
use crate::report::{RunReport, WarningKind};
use crate::spatial::{AssignmentIssue, SpatialIndexBuilder};
use batchplan_geometry::{Footprint, GeometryCleaner, MeshSlicer, Plane, PolygonAssembler};
use batchplan_model::{BuildingModel, JsonModelLoader, ModelLoader, Storey};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Furthest stage a storey reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreyStage {
    Raw,
    Sliced,
    Assembled,
    Cleaned,
    Rendered,
    Exported,
}

/// Encoded output for one storey, not yet on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

/// Result of processing one storey
#[derive(Debug, Clone)]
pub struct StoreyOutcome {
    pub storey_id: String,
    pub stage: StoreyStage,
    /// Elements handed to the slicer after the cap
    pub elements: usize,
    pub footprints: Vec<Footprint>,
    pub artifacts: Vec<Artifact>,
    /// Warnings and counters of this storey alone
    pub report: RunReport,
}

/// Building directory names claimed during one run
#[derive(Debug, Default)]
pub struct BuildingDirs {
    claimed: FxHashSet<String>,
}

impl BuildingDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory name for `building` read from `path`, and whether an earlier
    /// input already held the plain name. Taken names get `_<file stem>`
    /// appended, then a counter.
    pub fn claim(&mut self, building: &str, path: &Path) -> (String, bool) {
        let base = sanitize(building);
        if self.claimed.insert(base.clone()) {
            return (base, false);
        }

        let stem = path
            .file_stem()
            .map(|s| sanitize(&s.to_string_lossy()))
            .unwrap_or_else(|| "input".to_string());
        let mut candidate = format!("{}_{}", base, stem);
        let mut n = 2;
        while !self.claimed.insert(candidate.clone()) {
            candidate = format!("{}_{}_{}", base, stem, n);
            n += 1;
        }
        (candidate, true)
    }
}

/// Floor plan extraction over a batch of model files
pub struct Pipeline {
    config: PipelineConfig,
    loader: Box<dyn ModelLoader>,
    pool: rayon::ThreadPool,
    spatial: SpatialIndexBuilder,
    slicer: MeshSlicer,
    assembler: PolygonAssembler,
    cleaner: GeometryCleaner,
    renderer: StyleRenderer,
    exporter: Exporter,
}

impl Pipeline {
    /// Pipeline reading the JSON model format
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_loader(config, JsonModelLoader::new())
    }

    /// Validate `config` and start the worker pool
    pub fn with_loader(config: PipelineConfig, loader: impl ModelLoader + 'static) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("batchplan-worker-{}", i))
            .build()?;

        Ok(Self {
            assembler: config.assembler()?,
            cleaner: config.cleaner(),
            renderer: StyleRenderer::new(config.width, config.height),
            loader: Box::new(loader),
            pool,
            spatial: SpatialIndexBuilder::new(),
            slicer: MeshSlicer::default(),
            exporter: Exporter::new(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every input in order and return the merged report
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::new();
        let mut dirs = BuildingDirs::new();
        for input in inputs {
            self.process_file(input.as_ref(), &mut dirs, &mut report);
        }

        tracing::info!(
            files = inputs.len(),
            artifacts = report.counters.artifacts_written,
            warnings = report.warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch complete"
        );
        report
    }

    /// Load, process and write one file. Failures are recorded in `report`.
    pub fn process_file(&self, path: &Path, dirs: &mut BuildingDirs, report: &mut RunReport) {
        let file = path.display().to_string();
        let start = Instant::now();

        let loaded = match self.loader.load(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                report.warn(WarningKind::ParseFailure, e.to_string(), Some(&file), None);
                report.counters.files_failed += 1;
                return;
            }
        };
        for issue in &loaded.issues {
            report.warn(WarningKind::Ingest, issue.to_string(), Some(&file), None);
        }

        let model = loaded.model;
        if model.storeys.is_empty() {
            report.warn(
                WarningKind::NoStoreyFound,
                format!("building '{}' declares no storeys", model.name),
                Some(&file),
                None,
            );
            report.counters.files_failed += 1;
            return;
        }

        let (dir_name, collided) = dirs.claim(&model.name, path);
        if collided {
            report.warn(
                WarningKind::OutputCollision,
                format!(
                    "building '{}' was already written by an earlier input, using '{}'",
                    model.name, dir_name
                ),
                Some(&file),
                None,
            );
        }

        let outcomes = self.process_model(&model, &file, report);
        let dir = self.config.output_dir.join(&dir_name);
        self.write_outcomes(&model, &outcomes, &dir, &file, report);
        report.counters.files_processed += 1;

        tracing::info!(
            file = %file,
            building = %model.name,
            storeys = model.storeys.len(),
            elements = model.elements.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "File processed"
        );
    }

    /// Assign elements and run every storey on the worker pool. Outcomes are
    /// in storey declaration order and their reports are merged into `report`
    /// in that order. Nothing is written.
    pub fn process_model(
        &self,
        model: &BuildingModel,
        file: &str,
        report: &mut RunReport,
    ) -> Vec<StoreyOutcome> {
        let index = self.spatial.build(model);
        for issue in &index.issues {
            let storey = match issue {
                AssignmentIssue::UnknownMember { storey, .. } => Some(storey.as_str()),
                _ => None,
            };
            report.warn(WarningKind::UnassignedElement, issue.to_string(), Some(file), storey);
        }

        let mut outcomes: Vec<StoreyOutcome> = self.pool.install(|| {
            model
                .storeys
                .par_iter()
                .zip(index.members.par_iter())
                .map(|(storey, members)| self.process_storey(model, storey, members, file))
                .collect()
        });

        for outcome in &mut outcomes {
            report.merge(std::mem::take(&mut outcome.report));
        }
        outcomes
    }

    /// Run one storey through every stage
    pub fn process_storey(
        &self,
        model: &BuildingModel,
        storey: &Storey,
        members: &[usize],
        file: &str,
    ) -> StoreyOutcome {
        let mut outcome = StoreyOutcome {
            storey_id: storey.id.clone(),
            stage: StoreyStage::Raw,
            elements: 0,
            footprints: Vec::new(),
            artifacts: Vec::new(),
            report: RunReport::new(),
        };
        let report = &mut outcome.report;
        let context = (Some(file), Some(storey.id.as_str()));

        if members.is_empty() {
            tracing::debug!(storey = %storey.id, "Storey has no elements");
            report.counters.storeys_empty += 1;
            return outcome;
        }

        let mut members = members;
        if let Some(cap) = self.config.max_elements {
            if members.len() > cap {
                report.warn(
                    WarningKind::ElementCapApplied,
                    format!("{} of {} elements sliced", cap, members.len()),
                    context.0,
                    context.1,
                );
                members = &members[..cap];
            }
        }
        outcome.elements = members.len();

        // RAW -> SLICED
        let plane = Plane::horizontal(storey.elevation + self.config.slice_offset);
        let sliced = self
            .slicer
            .slice_all(members.iter().map(|&i| &model.elements[i]), &plane);
        report.counters.elements_sliced += members.len();
        report.counters.segments += sliced.segments.len();
        report.counters.degenerate_segments += sliced.stats.degenerate;
        if sliced.stats.degenerate > 0 {
            report.warn(
                WarningKind::DegenerateSlice,
                format!("{} near-zero segments dropped", sliced.stats.degenerate),
                context.0,
                context.1,
            );
        }
        outcome.stage = StoreyStage::Sliced;

        // SLICED -> ASSEMBLED
        let assembly = self.assembler.assemble(&storey.id, &sliced.segments);
        for gap in &assembly.gaps {
            let ids: Vec<&str> = gap.elements.iter().map(|id| id.as_ref()).collect();
            report.warn(
                WarningKind::AssemblyGap,
                format!(
                    "open {} chain from [{}] left a {:.4} m gap",
                    gap.category,
                    ids.join(", "),
                    gap.width()
                ),
                context.0,
                context.1,
            );
        }
        report.counters.rings_dropped += assembly.stats.degenerate_cycles;
        outcome.stage = StoreyStage::Assembled;

        // ASSEMBLED -> CLEANED
        let cleaned = self.cleaner.clean(assembly.footprints);
        report.counters.rings_dropped += cleaned.stats.dropped_rings;
        report.counters.footprints += cleaned.footprints.len();
        outcome.stage = StoreyStage::Cleaned;

        tracing::debug!(
            storey = %storey.id,
            z = plane.z(),
            elements = members.len(),
            segments = sliced.segments.len(),
            gaps = assembly.gaps.len(),
            merged_groups = cleaned.stats.merged_groups,
            boundary_openings = cleaned.stats.boundary_openings,
            footprints = cleaned.footprints.len(),
            "Storey geometry extracted"
        );

        outcome.footprints = cleaned.footprints;
        if outcome.footprints.is_empty() {
            tracing::info!(storey = %storey.id, "No footprints at slice height");
            report.counters.storeys_empty += 1;
            return outcome;
        }
        report.counters.storeys_processed += 1;

        // CLEANED -> RENDERED
        if self.config.wants(OutputFormat::Image) {
            let scene = self
                .renderer
                .render(&outcome.footprints, self.config.style.config());
            match RasterBackend::rasterize(&scene).encode_png() {
                Ok(bytes) => {
                    outcome.artifacts.push(Artifact {
                        format: OutputFormat::Image,
                        bytes,
                    });
                    outcome.stage = StoreyStage::Rendered;
                }
                Err(e) => {
                    report.counters.artifacts_failed += 1;
                    report.warn(WarningKind::ExportIoFailure, e.to_string(), context.0, context.1);
                }
            }
        }

        // CLEANED -> EXPORTED
        if self.config.wants(OutputFormat::Wkt) {
            let csv = self.exporter.export_csv(storey, &outcome.footprints);
            outcome.artifacts.push(Artifact {
                format: OutputFormat::Wkt,
                bytes: csv.into_bytes(),
            });
            outcome.stage = StoreyStage::Exported;
        }

        outcome
    }

    /// Write artifacts as `<dir>/<storey>_floor_plan.<ext>`
    fn write_outcomes(
        &self,
        model: &BuildingModel,
        outcomes: &[StoreyOutcome],
        dir: &Path,
        file: &str,
        report: &mut RunReport,
    ) {
        let stems = storey_stems(&model.storeys);

        for (outcome, stem) in outcomes.iter().zip(&stems) {
            if outcome.artifacts.is_empty() {
                continue;
            }
            if let Err(e) = std::fs::create_dir_all(dir) {
                for _ in &outcome.artifacts {
                    report.counters.artifacts_failed += 1;
                    report.warn(
                        WarningKind::ExportIoFailure,
                        format!("cannot create {}: {}", dir.display(), e),
                        Some(file),
                        Some(&outcome.storey_id),
                    );
                }
                continue;
            }

            for artifact in &outcome.artifacts {
                let path = artifact_path(dir, stem, artifact.format);
                match std::fs::write(&path, &artifact.bytes) {
                    Ok(()) => {
                        report.counters.artifacts_written += 1;
                        tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "Wrote floor plan");
                    }
                    Err(e) => {
                        report.counters.artifacts_failed += 1;
                        report.warn(
                            WarningKind::ExportIoFailure,
                            format!("cannot write {}: {}", path.display(), e),
                            Some(file),
                            Some(&outcome.storey_id),
                        );
                    }
                }
            }
        }
    }
}

/// Output path of one artifact
pub fn artifact_path(dir: &Path, stem: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}_floor_plan.{}", stem, format.extension()))
}

/// File stems for storeys in declaration order. A name already taken by an
/// earlier storey gets `_<storey id>` appended.
pub fn storey_stems(storeys: &[Storey]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    storeys
        .iter()
        .map(|storey| {
            let base = sanitize(&storey.name);
            if seen.insert(base.clone()) {
                base
            } else {
                let stem = format!("{}_{}", base, sanitize(&storey.id));
                seen.insert(stem.clone());
                stem
            }
        })
        .collect()
}

/// Make a name safe to use as one path component
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "unnamed".to_string(),
        _ => cleaned,
    }
}
