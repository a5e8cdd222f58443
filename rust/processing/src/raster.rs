// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel backend for rendered scenes

use crate::error::Result;
use crate::render::{DrawPrimitive, Scene};
use crate::style::{Color, FillPattern};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use nalgebra::Point2;
use std::io::Cursor;

/// Pixel spacing between hatch lines
const HATCH_SPACING: i64 = 8;

/// Lines at or below this width go through the anti-alias free single pixel path
const THIN_LINE: f64 = 1.5;

/// Drawing surface a [`Scene`] can be replayed onto
pub trait DrawingBackend {
    fn clear(&mut self, color: Color);

    /// Fill rings with the even-odd rule
    fn fill(&mut self, rings: &[Vec<Point2<f64>>], color: Color, opacity: f32, pattern: FillPattern);

    fn stroke(&mut self, from: Point2<f64>, to: Point2<f64>, color: Color, width: f64);
}

/// Replay every primitive of `scene` in order
pub fn draw_scene<B: DrawingBackend + ?Sized>(scene: &Scene, backend: &mut B) {
    backend.clear(scene.background);
    for primitive in &scene.primitives {
        match primitive {
            DrawPrimitive::Fill {
                rings,
                color,
                opacity,
                pattern,
                ..
            } => backend.fill(rings, *color, *opacity, *pattern),
            DrawPrimitive::Outline {
                ring, color, width, ..
            } => {
                for (i, a) in ring.iter().enumerate() {
                    let b = ring[(i + 1) % ring.len()];
                    backend.stroke(*a, b, *color, *width);
                }
            }
            DrawPrimitive::Annotation {
                segments,
                color,
                width,
                ..
            } => {
                for [a, b] in segments {
                    backend.stroke(*a, *b, *color, *width);
                }
            }
            // Labels need a font face; only the swatch is drawn
            DrawPrimitive::Swatch {
                square,
                fill,
                opacity,
                outline,
                ..
            } => {
                backend.fill(std::slice::from_ref(square), *fill, *opacity, FillPattern::Solid);
                for (i, a) in square.iter().enumerate() {
                    let b = square[(i + 1) % square.len()];
                    backend.stroke(*a, b, *outline, 1.0);
                }
            }
        }
    }
}

/// RGB raster target
pub struct RasterBackend {
    image: RgbImage,
}

impl RasterBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    /// Render a scene onto a fresh canvas of the scene's size
    pub fn rasterize(scene: &Scene) -> Self {
        let mut backend = Self::new(scene.width, scene.height);
        draw_scene(scene, &mut backend);
        backend
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Encode the canvas as PNG
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn blend(&mut self, x: i64, y: i64, color: Color, opacity: f32) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let a = opacity.clamp(0.0, 1.0);
        let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        *pixel = Rgb([
            mix(color.r, pixel[0]),
            mix(color.g, pixel[1]),
            mix(color.b, pixel[2]),
        ]);
    }

    fn put(&mut self, x: i64, y: i64, color: Color) {
        if x >= 0 && y >= 0 && x < self.image.width() as i64 && y < self.image.height() as i64 {
            self.image
                .put_pixel(x as u32, y as u32, Rgb([color.r, color.g, color.b]));
        }
    }

    /// Bresenham walk stamping a disc at each step
    fn thick_line(&mut self, from: Point2<f64>, to: Point2<f64>, color: Color, width: f64) {
        let radius = width * 0.5;
        let reach = radius.ceil() as i64;
        let (x1, y1) = (to.x.round() as i64, to.y.round() as i64);
        let (mut x, mut y) = (from.x.round() as i64, from.y.round() as i64);

        let dx = (x1 - x).abs();
        let dy = (y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            for oy in -reach..=reach {
                for ox in -reach..=reach {
                    if ((ox * ox + oy * oy) as f64) <= radius * radius {
                        self.put(x + ox, y + oy, color);
                    }
                }
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }
}

impl DrawingBackend for RasterBackend {
    fn clear(&mut self, color: Color) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgb([color.r, color.g, color.b]);
        }
    }

    fn fill(&mut self, rings: &[Vec<Point2<f64>>], color: Color, opacity: f32, pattern: FillPattern) {
        if pattern == FillPattern::None || opacity <= 0.0 {
            return;
        }
        let height = self.image.height() as i64;
        let mut crossings: Vec<f64> = Vec::new();

        for row in 0..height {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for ring in rings {
                for (i, a) in ring.iter().enumerate() {
                    let b = &ring[(i + 1) % ring.len()];
                    if (a.y <= yc) != (b.y <= yc) {
                        crossings.push(a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y));
                    }
                }
            }
            crossings.sort_by(f64::total_cmp);

            for span in crossings.chunks_exact(2) {
                // Pixels whose center lies inside the span
                let start = (span[0] - 0.5).ceil() as i64;
                let end = (span[1] - 0.5).ceil() as i64;
                for col in start.max(0)..end.min(self.image.width() as i64) {
                    if pattern == FillPattern::Hatch && (col + row).rem_euclid(HATCH_SPACING) != 0 {
                        continue;
                    }
                    self.blend(col, row, color, opacity);
                }
            }
        }
    }

    fn stroke(&mut self, from: Point2<f64>, to: Point2<f64>, color: Color, width: f64) {
        if width <= THIN_LINE {
            draw_line_segment_mut(
                &mut self.image,
                (from.x as f32, from.y as f32),
                (to.x as f32, to.y as f32),
                Rgb([color.r, color.g, color.b]),
            );
        } else {
            self.thick_line(from, to, color, width);
        }
    }
}
