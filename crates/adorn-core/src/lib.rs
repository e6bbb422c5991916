//! adorn-core — Jewelry try-on engine.
//!
//! Smooths facial landmarks from an external tracker, projects anchor
//! landmarks into frame pixels and composites earring/necklace images at
//! those anchors.

pub mod anchors;
pub mod assets;
pub mod config;
pub mod landmarks;
pub mod overlay;
pub mod session;
pub mod smoothing;
pub mod snapshot;
pub mod types;

pub use config::Config;
pub use overlay::{OverlayRenderer, Placement, Surface};
pub use session::{FrameReport, Session};
pub use smoothing::LandmarkSmoother;
pub use types::{AssetId, Detection, JewelryCategory, LandmarkPoint, LandmarkSet, OverlayMode};
