// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storey membership
//!
//! Explicit containment from the source wins. Elements it does not cover go to
//! the storey whose elevation range `[elevation, next higher elevation)`
//! overlaps their vertical extent the most.

use batchplan_model::BuildingModel;
use std::fmt;

/// Extents thinner than this are treated as a single height (m)
const FLAT_EPSILON: f64 = 1e-9;

/// Problem found while assigning elements to storeys
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentIssue {
    /// Matches no storey by containment or elevation
    Unassigned { element: String },
    /// Listed by more than one storey; the first listing is kept
    DuplicateMembership {
        element: String,
        kept: String,
        ignored: String,
    },
    /// A storey lists an id that is not a loaded element
    UnknownMember { storey: String, element: String },
}

impl fmt::Display for AssignmentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentIssue::Unassigned { element } => {
                write!(f, "element '{}' matches no storey and is dropped", element)
            }
            AssignmentIssue::DuplicateMembership {
                element,
                kept,
                ignored,
            } => write!(
                f,
                "element '{}' is listed by storeys '{}' and '{}'; keeping '{}'",
                element, kept, ignored, kept
            ),
            AssignmentIssue::UnknownMember { storey, element } => {
                write!(f, "storey '{}' lists unknown element '{}'", storey, element)
            }
        }
    }
}

/// Storey membership by position in `BuildingModel::storeys` and
/// `BuildingModel::elements`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialIndex {
    /// Element indices per storey, explicit members first in list order,
    /// then fallback members in element order
    pub members: Vec<Vec<usize>>,
    pub issues: Vec<AssignmentIssue>,
}

impl SpatialIndex {
    /// Number of elements assigned to any storey
    pub fn assigned_count(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }
}

/// Elevation band of one storey
#[derive(Debug, Clone, Copy)]
struct Band {
    lower: f64,
    upper: f64,
}

impl Band {
    #[inline]
    fn width(&self) -> f64 {
        self.upper - self.lower
    }

    #[inline]
    fn contains(&self, z: f64) -> bool {
        z >= self.lower && z < self.upper
    }

    #[inline]
    fn overlap(&self, lo: f64, hi: f64) -> f64 {
        hi.min(self.upper) - lo.max(self.lower)
    }
}

/// Builds the storey → members map
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialIndexBuilder;

impl SpatialIndexBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, model: &BuildingModel) -> SpatialIndex {
        let index = model.element_index();
        let mut owner: Vec<Option<usize>> = vec![None; model.elements.len()];
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); model.storeys.len()];
        let mut issues = Vec::new();

        for (s, storey) in model.storeys.iter().enumerate() {
            let Some(listed) = &storey.members else {
                continue;
            };
            for id in listed {
                let Some(&e) = index.get(id.as_str()) else {
                    issues.push(AssignmentIssue::UnknownMember {
                        storey: storey.id.clone(),
                        element: id.clone(),
                    });
                    continue;
                };
                match owner[e] {
                    Some(first) => issues.push(AssignmentIssue::DuplicateMembership {
                        element: id.clone(),
                        kept: model.storeys[first].id.clone(),
                        ignored: storey.id.clone(),
                    }),
                    None => {
                        owner[e] = Some(s);
                        members[s].push(e);
                    }
                }
            }
        }

        let bands = elevation_bands(model);
        for (e, element) in model.elements.iter().enumerate() {
            if owner[e].is_some() {
                continue;
            }
            let storey = element
                .z_extent()
                .and_then(|(lo, hi)| best_band(&bands, lo, hi));
            match storey {
                Some(s) => {
                    owner[e] = Some(s);
                    members[s].push(e);
                }
                None => issues.push(AssignmentIssue::Unassigned {
                    element: element.id.clone(),
                }),
            }
        }

        tracing::debug!(
            storeys = members.len(),
            assigned = members.iter().map(Vec::len).sum::<usize>(),
            issues = issues.len(),
            "Built storey membership"
        );

        SpatialIndex { members, issues }
    }
}

/// `[elevation, next higher elevation)` for each storey, in declaration order
fn elevation_bands(model: &BuildingModel) -> Vec<Band> {
    model
        .storeys
        .iter()
        .map(|storey| {
            let upper = model
                .storeys
                .iter()
                .map(|other| other.elevation)
                .filter(|&z| z > storey.elevation)
                .fold(f64::INFINITY, f64::min);
            Band {
                lower: storey.elevation,
                upper,
            }
        })
        .collect()
}

/// Storey whose band best bounds the extent `[lo, hi]`: largest overlap, then
/// narrowest band, then declaration order
fn best_band(bands: &[Band], lo: f64, hi: f64) -> Option<usize> {
    let flat = hi - lo <= FLAT_EPSILON;

    let mut best: Option<(f64, f64, usize)> = None;
    for (s, band) in bands.iter().enumerate() {
        let score = if flat {
            if !band.contains(lo) {
                continue;
            }
            0.0
        } else {
            let overlap = band.overlap(lo, hi);
            if overlap <= 0.0 {
                continue;
            }
            overlap
        };

        let better = match best {
            None => true,
            Some((best_score, best_width, _)) => {
                score > best_score || (score == best_score && band.width() < best_width)
            }
        };
        if better {
            best = Some((score, band.width(), s));
        }
    }

    best.map(|(_, _, s)| s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchplan_model::{BuildingElement, Category, ElementMesh, Storey};
    use nalgebra::Point3;

    fn block(id: &str, z0: f64, z1: f64) -> BuildingElement {
        BuildingElement::new(
            id,
            Category::Wall,
            ElementMesh::cuboid(Point3::new(0.0, 0.0, z0), Point3::new(1.0, 1.0, z1)),
        )
    }

    fn model(storeys: Vec<Storey>, elements: Vec<BuildingElement>) -> BuildingModel {
        let mut model = BuildingModel::new("test");
        model.storeys = storeys;
        model.elements = elements;
        model
    }

    #[test]
    fn test_explicit_members_keep_list_order() {
        let m = model(
            vec![Storey::new("L0", "Ground", 0.0).with_members(["B", "A"])],
            vec![block("A", 0.0, 3.0), block("B", 0.0, 3.0)],
        );
        let index = SpatialIndexBuilder::new().build(&m);
        assert_eq!(index.members, vec![vec![1, 0]]);
        assert!(index.issues.is_empty());
    }

    #[test]
    fn test_fallback_by_elevation() {
        let m = model(
            vec![Storey::new("L0", "Ground", 0.0), Storey::new("L1", "First", 3.0)],
            vec![
                block("A", 0.0, 2.9),
                block("B", 3.0, 6.0),
                // Mostly in the first storey
                block("C", 2.5, 5.0),
            ],
        );
        let index = SpatialIndexBuilder::new().build(&m);
        assert_eq!(index.members, vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn test_explicit_before_fallback() {
        let m = model(
            vec![
                Storey::new("L0", "Ground", 0.0).with_members(["B"]),
                Storey::new("L1", "First", 3.0),
            ],
            vec![block("A", 0.0, 3.0), block("B", 3.0, 6.0)],
        );
        let index = SpatialIndexBuilder::new().build(&m);
        // B is explicitly on the ground floor even though it sits higher
        assert_eq!(index.members, vec![vec![1, 0], vec![]]);
    }

    #[test]
    fn test_duplicate_and_unknown_members() {
        let m = model(
            vec![
                Storey::new("L0", "Ground", 0.0).with_members(["A", "ghost"]),
                Storey::new("L1", "First", 3.0).with_members(["A"]),
            ],
            vec![block("A", 0.0, 3.0)],
        );
        let index = SpatialIndexBuilder::new().build(&m);
        assert_eq!(index.members, vec![vec![0], vec![]]);
        assert_eq!(index.issues.len(), 2);
        assert!(matches!(&index.issues[0], AssignmentIssue::UnknownMember { element, .. } if element == "ghost"));
        assert!(matches!(&index.issues[1], AssignmentIssue::DuplicateMembership { kept, .. } if kept == "L0"));
    }

    #[test]
    fn test_below_lowest_storey_is_unassigned() {
        let m = model(
            vec![Storey::new("L0", "Ground", 0.0)],
            vec![block("F", -2.0, 0.0)],
        );
        let index = SpatialIndexBuilder::new().build(&m);
        assert_eq!(index.assigned_count(), 0);
        assert_eq!(
            index.issues,
            vec![AssignmentIssue::Unassigned { element: "F".into() }]
        );
    }

    #[test]
    fn test_flat_element_uses_point_containment() {
        let flat = BuildingElement::new(
            "P",
            Category::Slab,
            ElementMesh::new(
                vec![
                    Point3::new(0.0, 0.0, 3.0),
                    Point3::new(1.0, 0.0, 3.0),
                    Point3::new(0.0, 1.0, 3.0),
                ],
                vec![[0, 1, 2]],
            ),
        );
        let m = model(
            vec![Storey::new("L0", "Ground", 0.0), Storey::new("L1", "First", 3.0)],
            vec![flat],
        );
        let index = SpatialIndexBuilder::new().build(&m);
        assert_eq!(index.members, vec![vec![], vec![0]]);
    }

    #[test]
    fn test_equal_elevations_go_to_first_declared() {
        let m = model(
            vec![Storey::new("A", "A", 0.0), Storey::new("B", "B", 0.0)],
            vec![block("E", 0.0, 3.0)],
        );
        let index = SpatialIndexBuilder::new().build(&m);
        assert_eq!(index.members, vec![vec![0], vec![]]);
    }
}
