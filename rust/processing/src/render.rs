// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprints to ordered draw primitives
//!
//! World coordinates are mapped to pixels with one uniform scale that fits the
//! combined footprint bounds inside a padded canvas, centered, with the y axis
//! flipped. Nothing here touches pixels.

use crate::style::{AnnotationRules, Color, FillPattern, StyleConfig};
use batchplan_geometry::{Bounds2, Footprint};
use batchplan_model::Category;
use nalgebra::Point2;

/// Canvas padding on each side, as a fraction of the larger dimension
const PADDING: f64 = 0.05;

/// Line weights are given in points for a 1024 px canvas
const WEIGHT_REFERENCE_PX: f64 = 1024.0;

const GRID_COLOR: Color = Color::hex(0xDDDDDD);

/// Legend swatch edges are the fill darkened by this factor
const SWATCH_EDGE_FACTOR: f32 = 0.7;

/// Annotation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Grid,
    ScaleBar,
    NorthArrow,
}

/// A single drawing instruction in pixel space
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    /// Even-odd fill of an outer ring and its holes
    Fill {
        rings: Vec<Vec<Point2<f64>>>,
        color: Color,
        opacity: f32,
        pattern: FillPattern,
        category: Category,
    },
    /// Closed polyline
    Outline {
        ring: Vec<Point2<f64>>,
        color: Color,
        width: f64,
        category: Category,
    },
    /// Straight line segments
    Annotation {
        kind: AnnotationKind,
        segments: Vec<[Point2<f64>; 2]>,
        color: Color,
        width: f64,
    },
    /// Legend entry: a filled square keyed to a category label
    Swatch {
        square: Vec<Point2<f64>>,
        fill: Color,
        opacity: f32,
        outline: Color,
        label: &'static str,
        category: Category,
    },
}

/// Ordered primitives for one canvas
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub primitives: Vec<DrawPrimitive>,
}

/// World to pixel mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Pixels per metre
    pub scale: f64,
    world: Bounds2,
    offset_x: f64,
    offset_y: f64,
}

impl ViewTransform {
    /// Fit `world` into a `width` x `height` canvas with padding
    pub fn fit(world: Bounds2, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        let pad = w.max(h) * PADDING;
        let avail_w = (w - 2.0 * pad).max(1.0);
        let avail_h = (h - 2.0 * pad).max(1.0);

        // Degenerate extents still get a finite scale
        let extent_x = world.width().max(f64::EPSILON);
        let extent_y = world.height().max(f64::EPSILON);
        let scale = (avail_w / extent_x).min(avail_h / extent_y);

        Self {
            scale,
            world,
            offset_x: (w - world.width() * scale) * 0.5,
            offset_y: (h - world.height() * scale) * 0.5,
        }
    }

    /// Map a world point to pixel coordinates (y down)
    #[inline]
    pub fn apply(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            self.offset_x + (p.x - self.world.min.x) * self.scale,
            self.offset_y + (self.world.max.y - p.y) * self.scale,
        )
    }
}

/// Produces draw primitives for a storey
#[derive(Debug, Clone, Copy)]
pub struct StyleRenderer {
    width: u32,
    height: u32,
}

impl StyleRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn render(&self, footprints: &[Footprint], style: &StyleConfig) -> Scene {
        let mut scene = Scene {
            width: self.width,
            height: self.height,
            background: style.background,
            primitives: Vec::new(),
        };

        let Some(world) = footprints
            .iter()
            .filter_map(Footprint::bounds)
            .reduce(|a, b| a.union(&b))
        else {
            return scene;
        };
        let view = ViewTransform::fit(world, self.width, self.height);
        let weight_scale = self.width.max(self.height) as f64 / WEIGHT_REFERENCE_PX;

        // Slabs first, openings last; input order within a category
        let mut ordered: Vec<&Footprint> = footprints.iter().collect();
        ordered.sort_by_key(|fp| fp.category.z_priority());

        for fp in &ordered {
            let entry = style.category(fp.category);
            if entry.is_filled() {
                scene.primitives.push(DrawPrimitive::Fill {
                    rings: fp.rings().map(|r| project(&view, &r.points)).collect(),
                    color: entry.fill,
                    opacity: entry.opacity,
                    pattern: entry.pattern,
                    category: fp.category,
                });
            }
        }

        for fp in &ordered {
            let entry = style.category(fp.category);
            let width = (entry.line_weight as f64 * weight_scale).max(1.0);
            scene.primitives.push(DrawPrimitive::Outline {
                ring: project(&view, &fp.outer.points),
                color: entry.outline,
                width,
                category: fp.category,
            });
            for hole in &fp.holes {
                scene.primitives.push(DrawPrimitive::Outline {
                    ring: project(&view, &hole.points),
                    color: entry.outline,
                    width: (width * style.hole_weight_factor as f64).max(1.0),
                    category: fp.category,
                });
            }
        }

        self.annotate(&mut scene, &view, &world, &style.annotations, weight_scale);
        if style.annotations.legend {
            self.legend(&mut scene, footprints, style);
        }
        scene
    }

    /// One swatch per category present, stacked in the top-left corner
    fn legend(&self, scene: &mut Scene, footprints: &[Footprint], style: &StyleConfig) {
        let pad = self.width.max(self.height) as f64 * PADDING;
        let size = (pad * 0.3).max(4.0);
        let x = pad * 0.2;

        let present = Category::ALL
            .into_iter()
            .filter(|c| footprints.iter().any(|fp| fp.category == *c));
        for (row, category) in present.enumerate() {
            let entry = style.category(category);
            let y = pad * 0.2 + row as f64 * size * 1.5;
            scene.primitives.push(DrawPrimitive::Swatch {
                square: vec![
                    Point2::new(x, y),
                    Point2::new(x + size, y),
                    Point2::new(x + size, y + size),
                    Point2::new(x, y + size),
                ],
                fill: entry.fill,
                opacity: entry.opacity,
                outline: entry.fill.darken(SWATCH_EDGE_FACTOR),
                label: category.as_str(),
                category,
            });
        }
    }

    fn annotate(
        &self,
        scene: &mut Scene,
        view: &ViewTransform,
        world: &Bounds2,
        rules: &AnnotationRules,
        weight_scale: f64,
    ) {
        let (w, h) = (self.width as f64, self.height as f64);
        let pad = w.max(h) * PADDING;
        let line = weight_scale.max(1.0);

        if rules.grid {
            let step = nice_step(world.width().max(world.height()) / 10.0);
            let mut segments = Vec::new();
            let mut x = (world.min.x / step).ceil() * step;
            while x <= world.max.x {
                segments.push([
                    view.apply(&Point2::new(x, world.min.y)),
                    view.apply(&Point2::new(x, world.max.y)),
                ]);
                x += step;
            }
            let mut y = (world.min.y / step).ceil() * step;
            while y <= world.max.y {
                segments.push([
                    view.apply(&Point2::new(world.min.x, y)),
                    view.apply(&Point2::new(world.max.x, y)),
                ]);
                y += step;
            }
            // Grid sits beneath the footprints
            scene.primitives.insert(
                0,
                DrawPrimitive::Annotation {
                    kind: AnnotationKind::Grid,
                    segments,
                    color: GRID_COLOR,
                    width: 1.0,
                },
            );
        }

        if rules.scale_bar {
            let metres = nice_step(world.width().max(f64::EPSILON) / 5.0);
            let length = metres * view.scale;
            let y = h - pad * 0.5;
            let (x0, x1) = (pad, pad + length);
            let tick = pad * 0.15;
            scene.primitives.push(DrawPrimitive::Annotation {
                kind: AnnotationKind::ScaleBar,
                segments: vec![
                    [Point2::new(x0, y), Point2::new(x1, y)],
                    [Point2::new(x0, y - tick), Point2::new(x0, y + tick)],
                    [Point2::new(x1, y - tick), Point2::new(x1, y + tick)],
                ],
                color: Color::BLACK,
                width: line * 2.0,
            });
        }

        if rules.north_arrow {
            let x = w - pad * 0.5;
            let (tip, base) = (pad * 0.15, pad * 0.85);
            let head = pad * 0.2;
            scene.primitives.push(DrawPrimitive::Annotation {
                kind: AnnotationKind::NorthArrow,
                segments: vec![
                    [Point2::new(x, base), Point2::new(x, tip)],
                    [Point2::new(x, tip), Point2::new(x - head, tip + head)],
                    [Point2::new(x, tip), Point2::new(x + head, tip + head)],
                ],
                color: Color::BLACK,
                width: line * 2.0,
            });
        }
    }
}

fn project(view: &ViewTransform, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    points.iter().map(|p| view.apply(p)).collect()
}

/// Round step of 1, 2 or 5 times a power of ten near `target`
pub fn nice_step(target: f64) -> f64 {
    if !(target.is_finite() && target > 0.0) {
        return 1.0;
    }
    let magnitude = 10f64.powf(target.log10().floor());
    let fraction = target / magnitude;
    let nice = if fraction < 1.5 {
        1.0
    } else if fraction < 3.5 {
        2.0
    } else if fraction < 7.5 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleName;
    use approx::assert_relative_eq;
    use batchplan_geometry::{Ring, RingRole};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn square(x: f64, y: f64, size: f64, category: Category) -> Footprint {
        let outer = Ring::new(
            vec![
                Point2::new(x, y),
                Point2::new(x + size, y),
                Point2::new(x + size, y + size),
                Point2::new(x, y + size),
            ],
            RingRole::Outer,
            category,
            BTreeSet::from([Arc::from("E")]),
        );
        Footprint::new("L0", outer, Vec::new())
    }

    #[test]
    fn test_fit_is_uniform_and_centered() {
        let world = Bounds2 {
            min: Point2::new(0.0, 0.0),
            max: Point2::new(20.0, 10.0),
        };
        let view = ViewTransform::fit(world, 1000, 1000);
        // 5% padding leaves 900 px for 20 m
        assert_relative_eq!(view.scale, 45.0);
        let lo = view.apply(&Point2::new(0.0, 0.0));
        let hi = view.apply(&Point2::new(20.0, 10.0));
        assert_relative_eq!(lo.x, 50.0);
        assert_relative_eq!(hi.x, 950.0);
        // y is flipped and the short side is centered
        assert_relative_eq!(lo.y, 725.0);
        assert_relative_eq!(hi.y, 275.0);
    }

    #[test]
    fn test_draw_order() {
        let footprints = vec![
            square(0.0, 0.0, 1.0, Category::Door),
            square(0.0, 0.0, 5.0, Category::Slab),
            square(1.0, 1.0, 1.0, Category::Wall),
        ];
        let scene = StyleRenderer::new(512, 512).render(&footprints, StyleName::Professional.config());

        let fills: Vec<Category> = scene
            .primitives
            .iter()
            .filter_map(|p| match p {
                DrawPrimitive::Fill { category, .. } => Some(*category),
                _ => None,
            })
            .collect();
        assert_eq!(fills, [Category::Slab, Category::Wall, Category::Door]);

        // Grid first, then fills, then outlines, then the other annotations
        let kinds: Vec<u8> = scene
            .primitives
            .iter()
            .map(|p| match p {
                DrawPrimitive::Annotation { kind: AnnotationKind::Grid, .. } => 0,
                DrawPrimitive::Fill { .. } => 1,
                DrawPrimitive::Outline { .. } => 2,
                DrawPrimitive::Annotation { .. } => 3,
                DrawPrimitive::Swatch { .. } => 4,
            })
            .collect();
        assert!(kinds.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(kinds.iter().filter(|&&k| k == 3).count(), 2);
        assert_eq!(kinds.iter().filter(|&&k| k == 4).count(), 3);
    }

    fn swatches(scene: &Scene) -> Vec<(&'static str, Color, Color)> {
        scene
            .primitives
            .iter()
            .filter_map(|p| match p {
                DrawPrimitive::Swatch {
                    label, fill, outline, ..
                } => Some((*label, *fill, *outline)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_legend_lists_present_categories() {
        let footprints = vec![
            square(0.0, 0.0, 1.0, Category::Door),
            square(1.0, 1.0, 1.0, Category::Wall),
            square(3.0, 1.0, 1.0, Category::Wall),
        ];
        let style = StyleName::Professional.config();
        let scene = StyleRenderer::new(512, 512).render(&footprints, style);

        let legend = swatches(&scene);
        assert_eq!(legend.len(), 2);
        assert_eq!(legend[0], ("wall", style.wall.fill, style.wall.fill.darken(0.7)));
        assert_eq!(legend[1].0, "door");
        assert_eq!(legend[1].2, style.door.outline);

        let minimal = StyleRenderer::new(512, 512).render(&footprints, StyleName::Minimal.config());
        assert_eq!(swatches(&minimal).len(), 2);
    }

    #[test]
    fn test_technical_has_no_legend() {
        let footprints = vec![square(0.0, 0.0, 1.0, Category::Wall)];
        let scene = StyleRenderer::new(512, 512).render(&footprints, StyleName::Technical.config());
        assert!(swatches(&scene).is_empty());
    }

    #[test]
    fn test_technical_outlines_only() {
        let mut fp = square(0.0, 0.0, 4.0, Category::Wall);
        fp.holes.push(square(1.0, 1.0, 1.0, Category::Wall).outer.with_role(RingRole::Hole));
        let scene = StyleRenderer::new(1024, 1024).render(&[fp], StyleName::Technical.config());

        assert!(!scene.primitives.iter().any(|p| matches!(p, DrawPrimitive::Fill { .. })));
        let widths: Vec<f64> = scene
            .primitives
            .iter()
            .filter_map(|p| match p {
                DrawPrimitive::Outline { width, .. } => Some(*width),
                _ => None,
            })
            .collect();
        assert_eq!(widths.len(), 2);
        assert_relative_eq!(widths[0], 2.0);
        assert_relative_eq!(widths[1], 1.4, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_scene() {
        let scene = StyleRenderer::new(64, 32).render(&[], StyleName::Minimal.config());
        assert!(scene.primitives.is_empty());
        assert_eq!((scene.width, scene.height), (64, 32));
    }

    #[test]
    fn test_nice_step() {
        assert_relative_eq!(nice_step(0.9), 1.0);
        assert_relative_eq!(nice_step(3.0), 2.0);
        assert_relative_eq!(nice_step(4.0), 5.0);
        assert_relative_eq!(nice_step(80.0), 100.0);
        assert_relative_eq!(nice_step(0.0), 1.0);
    }
}
