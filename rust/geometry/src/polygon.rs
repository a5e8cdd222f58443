// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment, ring and footprint types shared by the extraction stages

use crate::ring::{self, Bounds2};
use batchplan_model::Category;
use nalgebra::Point2;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Shared element identifier carried for provenance
pub type ElementId = Arc<str>;

/// One straight piece of an element's cut outline on the slice plane
#[derive(Debug, Clone, PartialEq)]
pub struct SliceSegment {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub element_id: ElementId,
    pub category: Category,
}

impl SliceSegment {
    #[inline]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// Whether a ring bounds material or a void
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RingRole {
    /// Counter-clockwise boundary
    Outer,
    /// Clockwise boundary of a void
    Hole,
}

/// A closed 2D boundary with provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    /// Vertices without the repeated closing point
    pub points: Vec<Point2<f64>>,
    pub role: RingRole,
    /// Category dominating the segments this ring was built from
    pub category: Category,
    /// Contributing element ids, sorted
    pub elements: BTreeSet<ElementId>,
}

impl Ring {
    /// Create a ring and wind it to match `role`
    pub fn new(
        points: Vec<Point2<f64>>,
        role: RingRole,
        category: Category,
        elements: BTreeSet<ElementId>,
    ) -> Self {
        let mut ring = Self {
            points,
            role,
            category,
            elements,
        };
        ring.normalize_orientation();
        ring
    }

    /// Outer rings counter-clockwise, holes clockwise
    pub fn normalize_orientation(&mut self) {
        ring::orient(&mut self.points, self.role == RingRole::Outer);
    }

    /// Same ring with a different role, rewound accordingly
    pub fn with_role(&self, role: RingRole) -> Self {
        Ring::new(self.points.clone(), role, self.category, self.elements.clone())
    }

    #[inline]
    pub fn signed_area(&self) -> f64 {
        ring::signed_area(&self.points)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounds(&self) -> Option<Bounds2> {
        Bounds2::from_points(&self.points)
    }

    /// Smallest contributing element id
    pub fn first_element(&self) -> Option<&str> {
        self.elements.iter().next().map(|id| id.as_ref())
    }
}

/// Final polygon with holes for one element or merged group on a storey
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub storey_id: String,
    pub category: Category,
    pub outer: Ring,
    /// Each hole keeps its own category and contributors
    pub holes: Vec<Ring>,
    /// Openings that cut clean through the outer. They are attributed here
    /// rather than subtracted, so the outer stays in one piece.
    pub openings: Vec<Ring>,
}

impl Footprint {
    pub fn new(storey_id: impl Into<String>, outer: Ring, holes: Vec<Ring>) -> Self {
        Self {
            storey_id: storey_id.into(),
            category: outer.category,
            outer,
            holes,
            openings: Vec::new(),
        }
    }

    /// Contributing element ids, sorted
    #[inline]
    pub fn elements(&self) -> &BTreeSet<ElementId> {
        &self.outer.elements
    }

    pub fn first_element(&self) -> Option<&str> {
        self.outer.first_element()
    }

    /// Outer area minus hole areas
    pub fn area(&self) -> f64 {
        self.outer.area() - self.holes.iter().map(Ring::area).sum::<f64>()
    }

    pub fn bounds(&self) -> Option<Bounds2> {
        self.outer.bounds()
    }

    /// Outer ring followed by holes
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }
}
