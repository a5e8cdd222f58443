// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon assembly
//!
//! Stitches slice segments into closed rings. Segment endpoints closer than the
//! merge tolerance become one graph vertex (grid spatial hash), cycles are
//! traced through the graph, leftover open chains are joined and closed across
//! small gaps, and the resulting rings are classified as outers or holes by
//! containment.

use crate::error::{Error, Result};
use crate::polygon::{ElementId, Footprint, Ring, RingRole, SliceSegment};
use crate::ring;
use batchplan_model::Category;
use nalgebra::Point2;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};

/// A grid spatial hash for tolerance-based vertex merging.
///
/// Cells have side `tolerance`, so every candidate within tolerance lives in
/// the 3x3 neighbourhood of the query cell.
#[derive(Debug)]
struct VertexGrid {
    cell_size: f64,
    tol_sq: f64,
    grid: FxHashMap<(i64, i64), SmallVec<[usize; 2]>>,
    points: Vec<Point2<f64>>,
}

impl VertexGrid {
    fn new(tolerance: f64) -> Self {
        Self {
            cell_size: tolerance,
            tol_sq: tolerance * tolerance,
            grid: FxHashMap::default(),
            points: Vec::new(),
        }
    }

    /// Returns the closest existing vertex within tolerance, or adds `p`
    fn find_or_insert(&mut self, p: Point2<f64>) -> usize {
        let (cx, cy) = self.cell_coords(&p);

        let mut best: Option<(f64, usize)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(ids) = self.grid.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &id in ids {
                    let dist_sq = (self.points[id] - p).norm_squared();
                    if dist_sq <= self.tol_sq && best.map_or(true, |(d, b)| (dist_sq, id) < (d, b)) {
                        best = Some((dist_sq, id));
                    }
                }
            }
        }

        if let Some((_, id)) = best {
            return id;
        }

        let id = self.points.len();
        self.points.push(p);
        self.grid.entry((cx, cy)).or_default().push(id);
        id
    }

    #[inline]
    fn cell_coords(&self, p: &Point2<f64>) -> (i64, i64) {
        cell_of(p, self.cell_size)
    }
}

#[inline]
fn cell_of(p: &Point2<f64>, cell_size: f64) -> (i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
    )
}

/// Free ends of open chains, bucketed like `VertexGrid` with cells of the gap
/// tolerance
#[derive(Debug)]
struct EndGrid {
    cell_size: f64,
    cells: FxHashMap<(i64, i64), SmallVec<[(usize, bool, Point2<f64>); 2]>>,
}

impl EndGrid {
    fn new(gap_tolerance: f64) -> Self {
        Self {
            cell_size: gap_tolerance,
            cells: FxHashMap::default(),
        }
    }

    /// Record the head or tail of chain `id`
    fn insert(&mut self, p: Point2<f64>, id: usize, tail: bool) {
        self.cells.entry(cell_of(&p, self.cell_size)).or_default().push((id, tail, p));
    }

    /// Ends in the 3x3 neighbourhood of `p`
    fn near(&self, p: &Point2<f64>) -> impl Iterator<Item = &(usize, bool, Point2<f64>)> + '_ {
        let (cx, cy) = cell_of(p, self.cell_size);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flatten()
    }
}

/// Candidate join of two free ends, `first < second`.
///
/// Orders by distance, then by chain ids, preferring tail-to-head.
#[derive(Debug, Clone, Copy)]
struct Join {
    distance: f64,
    first: usize,
    second: usize,
    tail_of_first: bool,
    head_of_second: bool,
}

impl Join {
    #[inline]
    fn key(&self) -> (usize, usize, bool, bool) {
        (self.first, self.second, !self.tail_of_first, !self.head_of_second)
    }
}

impl PartialEq for Join {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Join {}

impl PartialOrd for Join {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Join {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.key().cmp(&other.key()))
    }
}

#[derive(Debug, Clone)]
struct Edge {
    a: usize,
    b: usize,
    element: ElementId,
    category: Category,
}

impl Edge {
    #[inline]
    fn other(&self, v: usize) -> usize {
        if self.a == v {
            self.b
        } else {
            self.a
        }
    }
}

/// A traced vertex path with the edges it used
#[derive(Debug, Clone, Default)]
struct Chain {
    vertices: Vec<usize>,
    edges: Vec<usize>,
}

impl Chain {
    fn reversed(mut self) -> Self {
        self.vertices.reverse();
        self.edges.reverse();
        self
    }

    #[inline]
    fn head(&self) -> usize {
        self.vertices[0]
    }

    #[inline]
    fn tail(&self) -> usize {
        self.vertices[self.vertices.len() - 1]
    }
}

/// An open chain that could not be closed within the gap tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyGap {
    /// Elements whose segments formed the chain
    pub elements: BTreeSet<ElementId>,
    pub category: Category,
    /// Free ends of the chain
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl AssemblyGap {
    /// Distance between the free ends
    pub fn width(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// Counters gathered while assembling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub vertices: usize,
    pub edges: usize,
    /// Repeated segments from the same element
    pub duplicate_edges: usize,
    /// Segments whose endpoints merged into one vertex
    pub collapsed_edges: usize,
    /// Cycles too short to form a ring
    pub degenerate_cycles: usize,
    /// Chain-to-chain joins across a gap
    pub joins: usize,
    pub outers: usize,
    pub holes: usize,
}

/// Rings classified into raw footprints
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub footprints: Vec<Footprint>,
    pub gaps: Vec<AssemblyGap>,
    pub stats: AssemblyStats,
}

/// Stitches slice segments into classified rings
#[derive(Debug, Clone, Copy)]
pub struct PolygonAssembler {
    /// Endpoints within this distance are the same vertex
    merge_tolerance: f64,
    /// Open chain ends within this distance are snapped together
    gap_tolerance: f64,
}

impl Default for PolygonAssembler {
    fn default() -> Self {
        Self {
            merge_tolerance: 1e-4,
            gap_tolerance: 0.01,
        }
    }
}

impl PolygonAssembler {
    /// Create an assembler. The merge tolerance must be positive and smaller
    /// than the gap tolerance.
    pub fn new(merge_tolerance: f64, gap_tolerance: f64) -> Result<Self> {
        if !(merge_tolerance.is_finite() && merge_tolerance > 0.0) {
            return Err(Error::InvalidTolerance(format!(
                "merge tolerance must be positive, got {}",
                merge_tolerance
            )));
        }
        if !(gap_tolerance.is_finite() && gap_tolerance > merge_tolerance) {
            return Err(Error::InvalidTolerance(format!(
                "gap tolerance {} must exceed merge tolerance {}",
                gap_tolerance, merge_tolerance
            )));
        }
        Ok(Self {
            merge_tolerance,
            gap_tolerance,
        })
    }

    #[inline]
    pub fn merge_tolerance(&self) -> f64 {
        self.merge_tolerance
    }

    #[inline]
    pub fn gap_tolerance(&self) -> f64 {
        self.gap_tolerance
    }

    /// Assemble all segments of one storey into footprints
    pub fn assemble(&self, storey_id: &str, segments: &[SliceSegment]) -> Assembly {
        let mut stats = AssemblyStats::default();
        let graph = self.build_graph(segments, &mut stats);

        let (cycles, open) = graph.trace_all();
        let (mut cycles, open) = self.join_chains(&graph, cycles, open, &mut stats);

        let gaps: Vec<AssemblyGap> = open
            .iter()
            .map(|chain| {
                let (elements, category) = graph.provenance(&chain.edges);
                AssemblyGap {
                    elements,
                    category,
                    start: graph.points[chain.head()],
                    end: graph.points[chain.tail()],
                }
            })
            .collect();

        let mut rings = Vec::with_capacity(cycles.len());
        for cycle in cycles.drain(..) {
            if cycle.vertices.len() < 3 {
                stats.degenerate_cycles += 1;
                continue;
            }
            let (elements, category) = graph.provenance(&cycle.edges);
            let points = cycle.vertices.iter().map(|&v| graph.points[v]).collect();
            rings.push(Ring::new(points, RingRole::Outer, category, elements));
        }

        let footprints = self.classify(storey_id, rings, &mut stats);

        tracing::debug!(
            storey = storey_id,
            vertices = stats.vertices,
            edges = stats.edges,
            outers = stats.outers,
            holes = stats.holes,
            gaps = gaps.len(),
            "Assembled rings"
        );

        Assembly {
            footprints,
            gaps,
            stats,
        }
    }

    fn build_graph(&self, segments: &[SliceSegment], stats: &mut AssemblyStats) -> Graph {
        let mut grid = VertexGrid::new(self.merge_tolerance);
        let mut edges = Vec::with_capacity(segments.len());
        let mut seen: FxHashSet<(usize, usize, ElementId)> = FxHashSet::default();

        for segment in segments {
            let a = grid.find_or_insert(segment.start);
            let b = grid.find_or_insert(segment.end);
            if a == b {
                stats.collapsed_edges += 1;
                continue;
            }
            if !seen.insert((a.min(b), a.max(b), segment.element_id.clone())) {
                stats.duplicate_edges += 1;
                continue;
            }
            edges.push(Edge {
                a,
                b,
                element: segment.element_id.clone(),
                category: segment.category,
            });
        }

        let mut adjacency: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); grid.points.len()];
        for (i, edge) in edges.iter().enumerate() {
            adjacency[edge.a].push(i);
            adjacency[edge.b].push(i);
        }

        stats.vertices = grid.points.len();
        stats.edges = edges.len();

        Graph {
            points: grid.points,
            edges,
            adjacency,
        }
    }

    /// Join open chains end to end, closest free ends first, then close
    /// those whose ends meet
    fn join_chains(
        &self,
        graph: &Graph,
        mut cycles: Vec<Chain>,
        open: Vec<Chain>,
        stats: &mut AssemblyStats,
    ) -> (Vec<Chain>, Vec<Chain>) {
        let mut slots: Vec<Option<Chain>> = open.into_iter().map(Some).collect();
        let mut ends = EndGrid::new(self.gap_tolerance);
        let mut queue: BinaryHeap<Reverse<Join>> = BinaryHeap::new();
        for id in 0..slots.len() {
            self.index_chain(graph, &slots, id, &mut ends, &mut queue);
        }

        while let Some(Reverse(join)) = queue.pop() {
            if slots[join.first].is_none() || slots[join.second].is_none() {
                continue;
            }
            let (Some(first), Some(second)) = (slots[join.first].take(), slots[join.second].take()) else {
                continue;
            };
            let first = if join.tail_of_first { first } else { first.reversed() };
            let second = if join.head_of_second { second } else { second.reversed() };

            let mut joined = first;
            let skip = usize::from(joined.tail() == second.head());
            joined.vertices.extend_from_slice(&second.vertices[skip..]);
            joined.edges.extend(second.edges);
            slots.push(Some(joined));
            self.index_chain(graph, &slots, slots.len() - 1, &mut ends, &mut queue);
            stats.joins += 1;
        }

        let mut remaining = Vec::new();
        for mut chain in slots.into_iter().flatten() {
            let gap = (graph.points[chain.tail()] - graph.points[chain.head()]).norm();
            if chain.head() == chain.tail() {
                chain.vertices.pop();
            }
            if chain.vertices.len() >= 3 && gap <= self.gap_tolerance {
                cycles.push(chain);
            } else {
                remaining.push(chain);
            }
        }

        (cycles, remaining)
    }

    /// Queue every join between chain `id` and the live chains indexed so
    /// far, then index its own free ends
    fn index_chain(
        &self,
        graph: &Graph,
        slots: &[Option<Chain>],
        id: usize,
        ends: &mut EndGrid,
        queue: &mut BinaryHeap<Reverse<Join>>,
    ) {
        let Some(chain) = &slots[id] else {
            return;
        };
        let free = [(true, graph.points[chain.tail()]), (false, graph.points[chain.head()])];

        for &(tail, p) in &free {
            for &(other, other_tail, q) in ends.near(&p) {
                if slots[other].is_none() {
                    continue;
                }
                let distance = (p - q).norm();
                if distance <= self.gap_tolerance {
                    // Chains are indexed in id order, so `other < id`
                    queue.push(Reverse(Join {
                        distance,
                        first: other,
                        second: id,
                        tail_of_first: other_tail,
                        head_of_second: !tail,
                    }));
                }
            }
        }

        for (tail, p) in free {
            ends.insert(p, id, tail);
        }
    }

    /// Classify rings as outers or holes and group holes under their outers
    fn classify(&self, storey_id: &str, rings: Vec<Ring>, stats: &mut AssemblyStats) -> Vec<Footprint> {
        let mut order: Vec<usize> = (0..rings.len()).collect();
        order.sort_by(|&a, &b| rings[b].area().total_cmp(&rings[a].area()).then(a.cmp(&b)));

        // `container[i]` is the immediate compatible container of ring i
        let mut container: Vec<Option<usize>> = vec![None; rings.len()];
        let mut is_hole = vec![false; rings.len()];

        for (rank, &i) in order.iter().enumerate() {
            let found = order[..rank].iter().rev().copied().find(|&c| {
                compatible(&rings[c], &rings[i])
                    && ring::ring_contains_ring(&rings[c].points, &rings[i].points, self.merge_tolerance)
            });
            if let Some(c) = found {
                container[i] = Some(c);
                is_hole[i] = !is_hole[c];
            }
        }

        let mut footprints: Vec<Footprint> = Vec::new();
        let mut footprint_of: FxHashMap<usize, usize> = FxHashMap::default();

        for &i in &order {
            if !is_hole[i] {
                footprint_of.insert(i, footprints.len());
                footprints.push(Footprint::new(storey_id, rings[i].clone(), Vec::new()));
                stats.outers += 1;
            }
        }

        for &i in &order {
            if !is_hole[i] {
                continue;
            }
            let Some(&f) = container[i].and_then(|c| footprint_of.get(&c)) else {
                continue;
            };
            footprints[f].holes.push(rings[i].with_role(RingRole::Hole));
            stats.holes += 1;

            // Openings are drawn in their own category as well as cut out
            if rings[i].category.is_opening() {
                footprints.push(Footprint::new(storey_id, rings[i].clone(), Vec::new()));
                stats.outers += 1;
            }
        }

        footprints
    }
}

/// Check if `inner` may be a hole (or island) of `container`
fn compatible(container: &Ring, inner: &Ring) -> bool {
    let shares_element = inner.elements.iter().any(|id| container.elements.contains(id));
    shares_element || (inner.category.is_opening() && !container.category.is_opening())
}

/// Segment graph after vertex merging
#[derive(Debug)]
struct Graph {
    points: Vec<Point2<f64>>,
    edges: Vec<Edge>,
    adjacency: Vec<SmallVec<[usize; 4]>>,
}

impl Graph {
    /// Trace every edge into either a closed cycle or an open chain
    fn trace_all(&self) -> (Vec<Chain>, Vec<Chain>) {
        let mut used = vec![false; self.edges.len()];
        let mut cycles = Vec::new();
        let mut open = Vec::new();

        for first in 0..self.edges.len() {
            if used[first] {
                continue;
            }
            used[first] = true;
            let edge = &self.edges[first];

            let mut chain = Chain {
                vertices: vec![edge.a, edge.b],
                edges: vec![first],
            };
            let closed = self.extend(&mut chain, &mut used, edge.a);
            if closed {
                chain.vertices.pop();
                cycles.push(chain);
                continue;
            }

            // Dead end: walk the other way from the starting vertex
            let mut back = Chain {
                vertices: vec![edge.b, edge.a],
                edges: vec![first],
            };
            self.extend(&mut back, &mut used, usize::MAX);
            let mut back = back.reversed();
            back.vertices.truncate(back.vertices.len() - 2);
            back.edges.pop();
            back.vertices.extend(chain.vertices);
            back.edges.extend(chain.edges);
            open.push(back);
        }

        (cycles, open)
    }

    /// Walk from the chain's tail until it returns to `stop` or dead-ends.
    /// Returns true when the walk closed.
    fn extend(&self, chain: &mut Chain, used: &mut [bool], stop: usize) -> bool {
        loop {
            let current = chain.tail();
            if current == stop {
                return true;
            }
            let previous = chain.vertices[chain.vertices.len() - 2];
            let incoming = chain.edges[chain.edges.len() - 1];

            let Some(next) = self.next_edge(current, previous, incoming, used) else {
                return false;
            };
            used[next] = true;
            chain.vertices.push(self.edges[next].other(current));
            chain.edges.push(next);
        }
    }

    /// Pick the continuation at `current`: unused edges only, same element as
    /// the incoming edge first, then the smallest turn.
    fn next_edge(&self, current: usize, previous: usize, incoming: usize, used: &[bool]) -> Option<usize> {
        let candidates: SmallVec<[usize; 4]> = self.adjacency[current]
            .iter()
            .copied()
            .filter(|&e| !used[e])
            .collect();
        if candidates.len() <= 1 {
            return candidates.first().copied();
        }

        let element = &self.edges[incoming].element;
        let same: SmallVec<[usize; 4]> = candidates
            .iter()
            .copied()
            .filter(|&e| &self.edges[e].element == element)
            .collect();
        let pool = if same.is_empty() { &candidates } else { &same };

        let d_in = self.points[current] - self.points[previous];
        pool.iter()
            .copied()
            .map(|e| {
                let d_out = self.points[self.edges[e].other(current)] - self.points[current];
                let turn = d_in.perp(&d_out).atan2(d_in.dot(&d_out)).abs();
                (turn, e)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, e)| e)
    }

    /// Contributing elements and dominant category of a set of edges
    fn provenance(&self, edges: &[usize]) -> (BTreeSet<ElementId>, Category) {
        let mut elements = BTreeSet::new();
        let mut counts = [0usize; Category::ALL.len()];
        for &e in edges {
            let edge = &self.edges[e];
            elements.insert(edge.element.clone());
            if let Some(k) = Category::ALL.iter().position(|c| *c == edge.category) {
                counts[k] += 1;
            }
        }

        // Most segments wins, ties go to the earlier category
        let mut best = 0;
        for k in 1..counts.len() {
            if counts[k] > counts[best] {
                best = k;
            }
        }
        (elements, Category::ALL[best])
    }
}
