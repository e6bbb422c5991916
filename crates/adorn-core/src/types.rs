use serde::{Deserialize, Serialize};
use std::fmt;

/// A facial landmark in normalized frame coordinates ([0, 1] on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One frame's landmarks for a single face, ordered by tracker index.
///
/// Indices carry fixed meaning for a given tracker topology; see
/// [`crate::anchors::AnchorIndices`] for the ones used to place jewelry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    pub points: Vec<LandmarkPoint>,
}

impl LandmarkSet {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<LandmarkPoint> {
        self.points.get(index).copied()
    }
}

impl From<Vec<LandmarkPoint>> for LandmarkSet {
    fn from(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }
}

/// Tracker output for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Face(LandmarkSet),
    NoFace,
}

impl Detection {
    pub fn landmarks(&self) -> Option<&LandmarkSet> {
        match self {
            Detection::Face(set) => Some(set),
            Detection::NoFace => None,
        }
    }
}

/// Kind of jewelry an overlay image depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JewelryCategory {
    Earring,
    Necklace,
}

impl JewelryCategory {
    pub const ALL: [JewelryCategory; 2] = [JewelryCategory::Earring, JewelryCategory::Necklace];

    pub fn as_str(self) -> &'static str {
        match self {
            JewelryCategory::Earring => "earring",
            JewelryCategory::Necklace => "necklace",
        }
    }
}

impl fmt::Display for JewelryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JewelryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earring" | "earrings" => Ok(JewelryCategory::Earring),
            "necklace" | "necklaces" => Ok(JewelryCategory::Necklace),
            other => Err(format!("unknown jewelry category: {other}")),
        }
    }
}

/// Which category is currently overlaid. `None` draws nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    #[default]
    None,
    Earring,
    Necklace,
}

impl OverlayMode {
    pub fn category(self) -> Option<JewelryCategory> {
        match self {
            OverlayMode::None => None,
            OverlayMode::Earring => Some(JewelryCategory::Earring),
            OverlayMode::Necklace => Some(JewelryCategory::Necklace),
        }
    }
}

impl From<JewelryCategory> for OverlayMode {
    fn from(category: JewelryCategory) -> Self {
        match category {
            JewelryCategory::Earring => OverlayMode::Earring,
            JewelryCategory::Necklace => OverlayMode::Necklace,
        }
    }
}

impl std::str::FromStr for OverlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(OverlayMode::None),
            other => other.parse::<JewelryCategory>().map(OverlayMode::from),
        }
    }
}

/// Catalog identifier of a jewelry image: category plus 1-based number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId {
    pub category: JewelryCategory,
    pub number: u32,
}

impl AssetId {
    pub fn new(category: JewelryCategory, number: u32) -> Self {
        Self { category, number }
    }

    /// File name inside the category directory, e.g. `earring3.png`.
    pub fn file_name(&self) -> String {
        format!("{}{}.png", self.category, self.number)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.number)
    }
}
