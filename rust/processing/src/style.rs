// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drawing styles
//!
//! A closed set of named styles, each an immutable entry in a fixed table.

use batchplan_model::Category;
use serde::Serialize;
use std::fmt;

/// 8-bit sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::hex(0x000000);
    pub const WHITE: Color = Color::hex(0xFFFFFF);

    /// Color from `0xRRGGBB`
    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }

    /// Scale each channel by `factor`, used to derive edge colors from fills.
    /// The style table stores the result at 0.7 for category outlines.
    pub fn darken(&self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }
}

/// How a footprint interior is painted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPattern {
    Solid,
    /// Diagonal lines
    Hatch,
    /// Outline only
    None,
}

/// How one category is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStyle {
    pub fill: Color,
    /// Fill opacity in `[0, 1]`
    pub opacity: f32,
    pub pattern: FillPattern,
    pub outline: Color,
    /// Outline width in points
    pub line_weight: f32,
}

impl CategoryStyle {
    const fn new(fill: Color, opacity: f32, pattern: FillPattern, outline: Color, line_weight: f32) -> Self {
        Self {
            fill,
            opacity,
            pattern,
            outline,
            line_weight,
        }
    }

    /// Check if the interior is painted at all
    pub fn is_filled(&self) -> bool {
        self.pattern != FillPattern::None && self.opacity > 0.0
    }
}

/// Which annotations a style draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationRules {
    pub grid: bool,
    pub scale_bar: bool,
    pub north_arrow: bool,
    /// Swatch per category present on the storey
    pub legend: bool,
}

/// A complete drawing style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleConfig {
    pub name: StyleName,
    pub background: Color,
    pub wall: CategoryStyle,
    pub slab: CategoryStyle,
    pub door: CategoryStyle,
    pub window: CategoryStyle,
    pub other: CategoryStyle,
    pub annotations: AnnotationRules,
    /// Outline width of hole rings relative to their category
    pub hole_weight_factor: f32,
}

impl StyleConfig {
    /// Style entry for a category
    pub fn category(&self, category: Category) -> &CategoryStyle {
        match category {
            Category::Wall => &self.wall,
            Category::Slab => &self.slab,
            Category::Door => &self.door,
            Category::Window => &self.window,
            Category::Other => &self.other,
        }
    }
}

/// Named drawing style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleName {
    Professional,
    Minimal,
    Colorful,
    Technical,
}

impl StyleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleName::Professional => "professional",
            StyleName::Minimal => "minimal",
            StyleName::Colorful => "colorful",
            StyleName::Technical => "technical",
        }
    }

    /// The fixed style record for this name
    pub fn config(&self) -> &'static StyleConfig {
        match self {
            StyleName::Professional => &PROFESSIONAL,
            StyleName::Minimal => &MINIMAL,
            StyleName::Colorful => &COLORFUL,
            StyleName::Technical => &TECHNICAL,
        }
    }
}

impl fmt::Display for StyleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL_ANNOTATIONS: AnnotationRules = AnnotationRules {
    grid: true,
    scale_bar: true,
    north_arrow: true,
    legend: true,
};

const fn filled(fill: u32, opacity: f32, line_weight: f32) -> CategoryStyle {
    CategoryStyle::new(Color::hex(fill), opacity, FillPattern::Solid, Color::BLACK, line_weight)
}

const fn lines_only(line_weight: f32) -> CategoryStyle {
    CategoryStyle::new(Color::WHITE, 0.0, FillPattern::None, Color::BLACK, line_weight)
}

// Outline colors are the fill darkened to 70%, walls are outlined in black

static PROFESSIONAL: StyleConfig = StyleConfig {
    name: StyleName::Professional,
    background: Color::WHITE,
    wall: filled(0x2C3E50, 0.9, 2.0),
    slab: CategoryStyle::new(Color::hex(0xECF0F1), 0.3, FillPattern::Hatch, Color::hex(0xA5A8A9), 0.5),
    door: CategoryStyle::new(Color::hex(0xE67E22), 0.8, FillPattern::Solid, Color::hex(0xA15818), 1.0),
    window: CategoryStyle::new(Color::hex(0x3498DB), 0.7, FillPattern::Solid, Color::hex(0x246A99), 1.0),
    other: CategoryStyle::new(Color::hex(0x7F8C8D), 0.7, FillPattern::Solid, Color::hex(0x596263), 0.5),
    annotations: ALL_ANNOTATIONS,
    hole_weight_factor: 0.7,
};

static MINIMAL: StyleConfig = StyleConfig {
    name: StyleName::Minimal,
    background: Color::WHITE,
    wall: filled(0x2C3E50, 0.8, 1.0),
    slab: CategoryStyle::new(Color::hex(0xECF0F1), 0.2, FillPattern::Solid, Color::hex(0xA5A8A9), 1.0),
    door: CategoryStyle::new(Color::hex(0x95A5A6), 0.8, FillPattern::Solid, Color::hex(0x687374), 1.0),
    window: CategoryStyle::new(Color::hex(0xBDC3C7), 0.8, FillPattern::Solid, Color::hex(0x84888B), 1.0),
    other: CategoryStyle::new(Color::hex(0x2C3E50), 0.8, FillPattern::Solid, Color::hex(0x1F2B38), 1.0),
    annotations: AnnotationRules {
        grid: false,
        scale_bar: true,
        north_arrow: false,
        legend: true,
    },
    hole_weight_factor: 0.7,
};

static COLORFUL: StyleConfig = StyleConfig {
    name: StyleName::Colorful,
    background: Color::WHITE,
    wall: filled(0xFF6B6B, 0.7, 1.5),
    slab: CategoryStyle::new(Color::hex(0xFFE66D), 0.4, FillPattern::Solid, Color::hex(0xB3A14C), 1.5),
    door: CategoryStyle::new(Color::hex(0xFFA07A), 0.7, FillPattern::Solid, Color::hex(0xB37055), 1.5),
    window: CategoryStyle::new(Color::hex(0x98D8E8), 0.7, FillPattern::Solid, Color::hex(0x6A97A2), 1.5),
    other: CategoryStyle::new(Color::hex(0x4ECDC4), 0.7, FillPattern::Hatch, Color::hex(0x378F89), 1.5),
    annotations: ALL_ANNOTATIONS,
    hole_weight_factor: 0.7,
};

static TECHNICAL: StyleConfig = StyleConfig {
    name: StyleName::Technical,
    background: Color::WHITE,
    wall: lines_only(2.0),
    slab: lines_only(1.0),
    door: lines_only(1.0),
    window: lines_only(1.0),
    other: lines_only(1.0),
    // Line drawings carry no color key
    annotations: AnnotationRules {
        legend: false,
        ..ALL_ANNOTATIONS
    },
    hole_weight_factor: 0.7,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_entries_match_names() {
        for name in [
            StyleName::Professional,
            StyleName::Minimal,
            StyleName::Colorful,
            StyleName::Technical,
        ] {
            assert_eq!(name.config().name, name);
        }
        assert_eq!(StyleName::Technical.to_string(), "technical");
    }

    #[test]
    fn test_technical_has_no_fills() {
        let style = StyleName::Technical.config();
        for category in Category::ALL {
            let entry = style.category(category);
            assert!(!entry.is_filled());
            assert_eq!(entry.outline, Color::BLACK);
        }
        assert_eq!(style.wall.line_weight, 2.0);
        assert!(!style.annotations.legend);
        assert!(style.annotations.grid);
    }

    #[test]
    fn test_darken_matches_table() {
        let door = StyleName::Professional.config().door;
        assert_eq!(door.fill.darken(0.7), door.outline);
    }

    #[test]
    fn test_hex() {
        assert_eq!(Color::hex(0x2C3E50), Color { r: 0x2C, g: 0x3E, b: 0x50 });
    }
}
