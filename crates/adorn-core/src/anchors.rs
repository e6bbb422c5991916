//! Anchor landmarks and their projection into surface pixel space.

use crate::config::AnchorConfig;
use crate::types::{LandmarkPoint, LandmarkSet};

/// A position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

/// Project a normalized landmark onto a `width` x `height` surface,
/// shifting it down by `y_offset` pixels.
pub fn project(point: LandmarkPoint, width: u32, height: u32, y_offset: f32) -> PixelPoint {
    PixelPoint {
        x: point.x * width as f32,
        y: point.y * height as f32 + y_offset,
    }
}

/// Pixel positions of the three placement anchors for one frame.
///
/// An anchor is `None` when its index is outside the landmark set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub left: Option<PixelPoint>,
    pub right: Option<PixelPoint>,
    pub chin: Option<PixelPoint>,
}

impl Anchors {
    pub fn project(landmarks: &LandmarkSet, config: &AnchorConfig, width: u32, height: u32) -> Self {
        let at = |index: usize, y_offset: f32| {
            landmarks
                .get(index)
                .map(|p| project(p, width, height, y_offset))
        };

        Self {
            left: at(config.left_index, config.ear_offset_y),
            right: at(config.right_index, config.ear_offset_y),
            chin: at(config.chin_index, config.chin_offset_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_mesh(left: (f32, f32), right: (f32, f32), chin: (f32, f32)) -> LandmarkSet {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5); 478];
        points[234] = LandmarkPoint::new(left.0, left.1);
        points[454] = LandmarkPoint::new(right.0, right.1);
        points[152] = LandmarkPoint::new(chin.0, chin.1);
        LandmarkSet::new(points)
    }

    #[test]
    fn test_default_offsets() {
        let lm = face_mesh((0.25, 0.5), (0.75, 0.5), (0.5, 0.8));
        let anchors = Anchors::project(&lm, &AnchorConfig::default(), 1280, 720);

        assert_eq!(anchors.left, Some(PixelPoint { x: 320.0, y: 368.0 }));
        assert_eq!(anchors.right, Some(PixelPoint { x: 960.0, y: 368.0 }));
        let chin = anchors.chin.unwrap();
        assert!((chin.x - 640.0).abs() < 1e-3);
        assert!((chin.y - (0.8 * 720.0 + 20.0)).abs() < 1e-3);
    }

    #[test]
    fn test_x_scales_linearly_with_width() {
        let lm = face_mesh((0.31, 0.4), (0.67, 0.42), (0.49, 0.77));
        let cfg = AnchorConfig::default();
        let narrow = Anchors::project(&lm, &cfg, 640, 480);
        let wide = Anchors::project(&lm, &cfg, 1280, 480);

        for (a, b) in [
            (narrow.left, wide.left),
            (narrow.right, wide.right),
            (narrow.chin, wide.chin),
        ] {
            let (a, b) = (a.unwrap(), b.unwrap());
            assert!((b.x - 2.0 * a.x).abs() < 1e-3);
            assert_eq!(a.y, b.y);
        }
    }

    #[test]
    fn test_missing_index_yields_none() {
        let lm = LandmarkSet::new(vec![LandmarkPoint::new(0.5, 0.5); 200]);
        let anchors = Anchors::project(&lm, &AnchorConfig::default(), 100, 100);
        assert!(anchors.left.is_none());
        assert!(anchors.right.is_none());
        assert_eq!(anchors.chin, Some(PixelPoint { x: 50.0, y: 70.0 }));
    }
}
