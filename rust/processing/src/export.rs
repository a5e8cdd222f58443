// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deterministic CSV/WKT serialization of storey footprints

use batchplan_geometry::{footprint_to_wkt, Footprint};
use batchplan_model::{Category, Storey};
use std::cmp::Ordering;
use std::fmt::Write;

/// CSV header row
pub const CSV_HEADER: [&str; 4] = ["id", "storey", "category", "geometry"];

/// One exported footprint
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    /// `<storey id>-<n>`, 1-based
    pub id: String,
    /// Storey display name
    pub storey: String,
    pub category: Category,
    /// WKT polygon
    pub geometry: String,
}

/// Serializes footprints of one storey
#[derive(Debug, Clone, Copy, Default)]
pub struct Exporter;

impl Exporter {
    pub fn new() -> Self {
        Self
    }

    /// Build numbered records ordered by first contributing element id, then
    /// category, then outer ring vertices
    pub fn records(&self, storey: &Storey, footprints: &[Footprint]) -> Vec<ExportRecord> {
        let mut ordered: Vec<&Footprint> = footprints.iter().collect();
        ordered.sort_by(|a, b| export_order(a, b));

        ordered
            .into_iter()
            .enumerate()
            .map(|(i, fp)| ExportRecord {
                id: format!("{}-{}", storey.id, i + 1),
                storey: storey.name.clone(),
                category: fp.category,
                geometry: footprint_to_wkt(fp),
            })
            .collect()
    }

    /// CSV document with header, CRLF line endings
    pub fn to_csv(&self, records: &[ExportRecord]) -> String {
        let mut out = String::new();
        write_row(&mut out, &CSV_HEADER);
        for record in records {
            write_row(
                &mut out,
                &[
                    record.id.as_str(),
                    record.storey.as_str(),
                    record.category.as_str(),
                    record.geometry.as_str(),
                ],
            );
        }
        out
    }

    /// Records and CSV in one step
    pub fn export_csv(&self, storey: &Storey, footprints: &[Footprint]) -> String {
        self.to_csv(&self.records(storey, footprints))
    }
}

fn export_order(a: &Footprint, b: &Footprint) -> Ordering {
    a.first_element()
        .cmp(&b.first_element())
        .then(a.category.cmp(&b.category))
        .then_with(|| {
            let pa = &a.outer.points;
            let pb = &b.outer.points;
            pa.iter()
                .zip(pb)
                .map(|(p, q)| p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y)))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| pa.len().cmp(&pb.len()))
        })
}

fn write_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_field(out, field);
    }
    out.push_str("\r\n");
}

/// RFC 4180 field quoting
fn write_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        let _ = write!(out, "\"{}\"", field.replace('"', "\"\""));
    } else {
        out.push_str(field);
    }
}
