//! Jewelry placement and compositing onto a drawing surface.

use crate::anchors::{Anchors, PixelPoint};
use crate::assets::Jewel;
use crate::config::{AnchorConfig, OverlayConfig};
use crate::types::{AssetId, LandmarkSet, OverlayMode};
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Something jewelry can be drawn onto.
pub trait Surface {
    /// Surface size in pixels, `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Draw `image` scaled to `width` x `height` with its top-left corner at
    /// `(x, y)`. Parts outside the surface are clipped.
    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: u32, height: u32);
}

impl Surface for RgbaImage {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let scaled;
        let top = if image.dimensions() == (width, height) {
            image
        } else {
            scaled = imageops::resize(image, width, height, FilterType::Triangle);
            &scaled
        };
        imageops::overlay(self, top, x.round() as i64, y.round() as i64);
    }
}

/// One image drawn by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub asset: AssetId,
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
}

/// Places the active jewelry relative to projected anchor landmarks.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    pub anchors: AnchorConfig,
    pub overlay: OverlayConfig,
}

impl OverlayRenderer {
    pub fn new(anchors: AnchorConfig, overlay: OverlayConfig) -> Self {
        Self { anchors, overlay }
    }

    /// Draw the jewelry for `mode` onto `surface` and report what was drawn.
    ///
    /// Draws nothing when the mode is `None` or its category has no image
    /// ready.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        landmarks: &LandmarkSet,
        mode: OverlayMode,
        earring: Option<&Jewel>,
        necklace: Option<&Jewel>,
    ) -> Vec<Placement> {
        let (width, height) = surface.size();
        let anchors = Anchors::project(landmarks, &self.anchors, width, height);
        let mut placements = Vec::new();

        match mode {
            OverlayMode::None => {}
            OverlayMode::Earring => {
                let Some(jewel) = earring else {
                    tracing::trace!("earring mode but no earring image ready");
                    return placements;
                };
                for (side, anchor) in [("left", anchors.left), ("right", anchors.right)] {
                    match anchor {
                        Some(anchor) => placements.extend(place(
                            surface,
                            jewel,
                            anchor,
                            self.overlay.earring_scale,
                        )),
                        None => tracing::debug!(side, "ear anchor missing from landmarks"),
                    }
                }
            }
            OverlayMode::Necklace => {
                let Some(jewel) = necklace else {
                    tracing::trace!("necklace mode but no necklace image ready");
                    return placements;
                };
                match anchors.chin {
                    Some(anchor) => placements.extend(place(
                        surface,
                        jewel,
                        anchor,
                        self.overlay.necklace_scale,
                    )),
                    None => tracing::debug!("chin anchor missing from landmarks"),
                }
            }
        }

        placements
    }
}

/// Draw `jewel` scaled by `scale`, centred horizontally on `anchor` with its
/// top edge at the anchor.
fn place<S: Surface + ?Sized>(
    surface: &mut S,
    jewel: &Jewel,
    anchor: PixelPoint,
    scale: f32,
) -> Option<Placement> {
    let (native_w, native_h) = jewel.image.dimensions();
    let scaled_w = native_w as f32 * scale;
    let scaled_h = native_h as f32 * scale;
    let width = scaled_w.round() as u32;
    let height = scaled_h.round() as u32;
    if width == 0 || height == 0 {
        tracing::debug!(asset = %jewel.id, scale, "scaled jewel is empty; skipping");
        return None;
    }

    let x = anchor.x - scaled_w / 2.0;
    let y = anchor.y;
    surface.draw_image(&jewel.image, x, y, width, height);

    Some(Placement {
        asset: jewel.id,
        x,
        y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JewelryCategory, LandmarkPoint};
    use image::Rgba;

    /// Records draw calls instead of rasterizing.
    struct RecordingSurface {
        size: (u32, u32),
        calls: Vec<(f32, f32, u32, u32)>,
    }

    impl RecordingSurface {
        fn new(width: u32, height: u32) -> Self {
            Self {
                size: (width, height),
                calls: Vec::new(),
            }
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn draw_image(&mut self, _image: &RgbaImage, x: f32, y: f32, width: u32, height: u32) {
            self.calls.push((x, y, width, height));
        }
    }

    fn jewel(category: JewelryCategory, w: u32, h: u32) -> Jewel {
        Jewel {
            id: AssetId::new(category, 1),
            image: RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
        }
    }

    fn assert_call(actual: (f32, f32, u32, u32), expected: (f32, f32, u32, u32)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-3 && (actual.1 - expected.1).abs() < 1e-3,
            "expected position ({}, {}), got ({}, {})",
            expected.0,
            expected.1,
            actual.0,
            actual.1
        );
        assert_eq!((actual.2, actual.3), (expected.2, expected.3));
    }

    fn face_mesh() -> LandmarkSet {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5); 478];
        points[234] = LandmarkPoint::new(0.25, 0.5);
        points[454] = LandmarkPoint::new(0.75, 0.5);
        points[152] = LandmarkPoint::new(0.5, 0.75);
        LandmarkSet::new(points)
    }

    #[test]
    fn test_earrings_drawn_on_both_anchors() {
        let renderer = OverlayRenderer::default();
        let earring = jewel(JewelryCategory::Earring, 200, 400);
        let mut surface = RecordingSurface::new(1000, 800);

        let placed = renderer.render(&mut surface, &face_mesh(), OverlayMode::Earring, Some(&earring), None);

        // 200x400 at 0.09 -> 18x36, centred on x=250 and x=750, top at 0.5*800+8.
        assert_eq!(placed.len(), 2);
        assert_eq!(surface.calls.len(), 2);
        assert_call(surface.calls[0], (241.0, 408.0, 18, 36));
        assert_call(surface.calls[1], (741.0, 408.0, 18, 36));
    }

    #[test]
    fn test_necklace_drawn_on_chin() {
        let renderer = OverlayRenderer::default();
        let necklace = jewel(JewelryCategory::Necklace, 500, 300);
        let mut surface = RecordingSurface::new(1000, 800);

        let placed = renderer.render(&mut surface, &face_mesh(), OverlayMode::Necklace, None, Some(&necklace));

        // 500x300 at 0.2 -> 100x60, centred on x=500, top at 0.75*800+20.
        assert_eq!(surface.calls.len(), 1);
        assert_call(surface.calls[0], (450.0, 620.0, 100, 60));
        assert_eq!(placed[0].asset.category, JewelryCategory::Necklace);
    }

    #[test]
    fn test_necklace_mode_without_image_draws_nothing() {
        let renderer = OverlayRenderer::default();
        let earring = jewel(JewelryCategory::Earring, 100, 100);
        let mut surface = RecordingSurface::new(640, 480);

        let placed = renderer.render(&mut surface, &face_mesh(), OverlayMode::Necklace, Some(&earring), None);

        assert!(placed.is_empty());
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn test_no_mode_draws_nothing() {
        let renderer = OverlayRenderer::default();
        let earring = jewel(JewelryCategory::Earring, 100, 100);
        let necklace = jewel(JewelryCategory::Necklace, 100, 100);
        let mut surface = RecordingSurface::new(640, 480);

        let placed = renderer.render(&mut surface, &face_mesh(), OverlayMode::None, Some(&earring), Some(&necklace));
        assert!(placed.is_empty());
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn test_tiny_image_skipped() {
        let renderer = OverlayRenderer::default();
        let earring = jewel(JewelryCategory::Earring, 4, 4);
        let mut surface = RecordingSurface::new(640, 480);

        let placed = renderer.render(&mut surface, &face_mesh(), OverlayMode::Earring, Some(&earring), None);
        assert!(placed.is_empty());
    }

    #[test]
    fn test_short_landmark_set_skips_missing_anchors() {
        let renderer = OverlayRenderer::default();
        let necklace = jewel(JewelryCategory::Necklace, 100, 100);
        let lm = LandmarkSet::new(vec![LandmarkPoint::new(0.5, 0.5); 10]);
        let mut surface = RecordingSurface::new(640, 480);

        let placed = renderer.render(&mut surface, &lm, OverlayMode::Necklace, None, Some(&necklace));
        assert!(placed.is_empty());
    }

    #[test]
    fn test_rgba_surface_composites_pixels() {
        let renderer = OverlayRenderer::default();
        let necklace = jewel(JewelryCategory::Necklace, 50, 50);
        let mut frame = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));

        let placed = renderer.render(&mut frame, &face_mesh(), OverlayMode::Necklace, None, Some(&necklace));

        // 50x50 at 0.2 -> 10x10 at (45, 95): clipped to the bottom rows.
        assert_eq!(placed.len(), 1);
        assert!(frame.get_pixel(50, 97)[0] > 200);
        assert_eq!(frame.get_pixel(50, 50), &Rgba([0, 0, 0, 255]));
        assert_eq!(frame.get_pixel(30, 97), &Rgba([0, 0, 0, 255]));
    }
}
