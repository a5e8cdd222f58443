// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element categories used for styling, merging and hole attribution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Drawing category of a building element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Wall,
    Slab,
    Door,
    Window,
    Other,
}

impl Category {
    /// All categories in declaration order
    pub const ALL: [Category; 5] = [
        Category::Wall,
        Category::Slab,
        Category::Door,
        Category::Window,
        Category::Other,
    ];

    /// Map a source type name (`IfcWallStandardCase`, `wall`, ...) to a category.
    ///
    /// Matching is case-insensitive and the `Ifc` prefix is optional.
    pub fn from_type_name(type_name: &str) -> Self {
        let lower = type_name.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("ifc").unwrap_or(&lower);

        match name {
            "wall" | "wallstandardcase" | "wallelementedcase" | "curtainwall" => Category::Wall,
            "slab" | "slabstandardcase" | "slabelementedcase" | "roof" | "covering" => {
                Category::Slab
            }
            "door" | "doorstandardcase" => Category::Door,
            "window" | "windowstandardcase" => Category::Window,
            _ => Category::Other,
        }
    }

    /// Lowercase label used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Wall => "wall",
            Category::Slab => "slab",
            Category::Door => "door",
            Category::Window => "window",
            Category::Other => "other",
        }
    }

    /// Doors and windows cut through solid elements
    #[inline]
    pub fn is_opening(&self) -> bool {
        matches!(self, Category::Door | Category::Window)
    }

    /// Draw priority: slabs beneath everything, openings on top
    pub fn z_priority(&self) -> u8 {
        match self {
            Category::Slab => 0,
            Category::Other => 1,
            Category::Wall => 2,
            Category::Door | Category::Window => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_type_name() {
        assert_eq!(Category::from_type_name("IfcWallStandardCase"), Category::Wall);
        assert_eq!(Category::from_type_name("IFCWALL"), Category::Wall);
        assert_eq!(Category::from_type_name("IfcCurtainWall"), Category::Wall);
        assert_eq!(Category::from_type_name("IfcSlab"), Category::Slab);
        assert_eq!(Category::from_type_name("door"), Category::Door);
        assert_eq!(Category::from_type_name("IfcWindow"), Category::Window);
        assert_eq!(Category::from_type_name("IfcColumn"), Category::Other);
        assert_eq!(Category::from_type_name(""), Category::Other);
    }

    #[test]
    fn test_z_priority_order() {
        assert!(Category::Slab.z_priority() < Category::Wall.z_priority());
        assert!(Category::Wall.z_priority() < Category::Door.z_priority());
        assert_eq!(Category::Door.z_priority(), Category::Window.z_priority());
    }

    #[test]
    fn test_parse_roundtrip_labels() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("roof".parse::<Category>().is_err());
    }
}
