// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-run report of recoverable problems and counters.
//!
//! Workers fill their own report and the coordinator merges them, so no
//! report is ever shared between threads.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Kind of a recoverable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Input file unreadable or malformed; the file is skipped
    ParseFailure,
    /// Input file declares no storeys; the file is skipped
    NoStoreyFound,
    /// Element dropped or repaired while loading
    Ingest,
    /// Element matched no storey, or a membership was contradictory
    UnassignedElement,
    /// Slice segment too short to keep
    DegenerateSlice,
    /// Open chain that could not be closed
    AssemblyGap,
    /// Storey members beyond the configured maximum were skipped
    ElementCapApplied,
    /// An output artifact could not be produced or written
    ExportIoFailure,
    /// Building directory already used by an earlier input in the run
    OutputCollision,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningKind::ParseFailure => "parse failure",
            WarningKind::NoStoreyFound => "no storey found",
            WarningKind::Ingest => "ingest",
            WarningKind::UnassignedElement => "unassigned element",
            WarningKind::DegenerateSlice => "degenerate slice",
            WarningKind::AssemblyGap => "assembly gap",
            WarningKind::ElementCapApplied => "element cap applied",
            WarningKind::ExportIoFailure => "export failure",
            WarningKind::OutputCollision => "output collision",
        };
        f.write_str(name)
    }
}

/// One recoverable problem with its context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storey: Option<String>,
}

/// Run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub files_processed: usize,
    pub files_failed: usize,
    pub storeys_processed: usize,
    pub storeys_empty: usize,
    pub elements_sliced: usize,
    pub segments: usize,
    pub degenerate_segments: usize,
    pub rings_dropped: usize,
    pub footprints: usize,
    pub artifacts_written: usize,
    pub artifacts_failed: usize,
}

impl RunCounters {
    pub fn merge(&mut self, other: &RunCounters) {
        self.files_processed += other.files_processed;
        self.files_failed += other.files_failed;
        self.storeys_processed += other.storeys_processed;
        self.storeys_empty += other.storeys_empty;
        self.elements_sliced += other.elements_sliced;
        self.segments += other.segments;
        self.degenerate_segments += other.degenerate_segments;
        self.rings_dropped += other.rings_dropped;
        self.footprints += other.footprints;
        self.artifacts_written += other.artifacts_written;
        self.artifacts_failed += other.artifacts_failed;
    }
}

/// Accumulated warnings and counters of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub warnings: Vec<Warning>,
    pub counters: RunCounters,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn warn(
        &mut self,
        kind: WarningKind,
        message: impl Into<String>,
        file: Option<&str>,
        storey: Option<&str>,
    ) {
        let message = message.into();
        tracing::warn!(kind = %kind, file = file, storey = storey, "{}", message);
        self.warnings.push(Warning {
            kind,
            message,
            file: file.map(str::to_string),
            storey: storey.map(str::to_string),
        });
    }

    /// Append another report, keeping its warnings after ours
    pub fn merge(&mut self, other: RunReport) {
        self.warnings.extend(other.warnings);
        self.counters.merge(&other.counters);
    }

    /// Number of warnings of one kind
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Artifacts successfully written; the run succeeds when this is non-zero
    pub fn outputs_produced(&self) -> usize {
        self.counters.artifacts_written
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "{} file(s), {} storey(s), {} footprint(s), {} artifact(s) written, {} failed, {} warning(s)",
            self.counters.files_processed,
            self.counters.storeys_processed,
            self.counters.footprints,
            self.counters.artifacts_written,
            self.counters.artifacts_failed,
            self.warnings.len()
        )
    }

    /// Serialize as pretty JSON to `path`
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_order() {
        let mut a = RunReport::new();
        a.warn(WarningKind::AssemblyGap, "first", Some("a.json"), Some("L0"));
        a.counters.artifacts_written = 1;

        let mut b = RunReport::new();
        b.warn(WarningKind::DegenerateSlice, "second", None, None);
        b.counters.artifacts_written = 2;

        a.merge(b);
        assert_eq!(a.warnings[0].message, "first");
        assert_eq!(a.warnings[1].message, "second");
        assert_eq!(a.outputs_produced(), 3);
        assert_eq!(a.count(WarningKind::AssemblyGap), 1);
    }

    #[test]
    fn test_json_shape() {
        let mut report = RunReport::new();
        report.warn(WarningKind::NoStoreyFound, "no storeys", Some("x.json"), None);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["warnings"][0]["kind"], "no_storey_found");
        assert!(value["warnings"][0].get("storey").is_none());
        assert_eq!(value["counters"]["files_processed"], 0);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        RunReport::new().write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"warnings\": []"));
    }
}
