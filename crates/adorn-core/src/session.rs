//! Try-on session: the mutable state behind one camera feed.
//!
//! Owns the overlay mode, per-category asset state, the landmark smoother
//! and the last snapshot. `process_frame` is the per-frame entry point;
//! everything it does is synchronous.

use crate::assets::{AssetError, AssetLoader, AssetState, Catalog, LoadOutcome};
use crate::config::Config;
use crate::overlay::{OverlayRenderer, Placement, Surface};
use crate::smoothing::{LandmarkSmoother, SmoothingError};
use crate::snapshot::{ShareTarget, Snapshot, SnapshotError};
use crate::types::{AssetId, Detection, JewelryCategory, LandmarkSet, OverlayMode};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Smoothing(#[from] SmoothingError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// What happened on one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// The tracker found a face in this frame.
    pub face_detected: bool,
    /// Jewelry drawn, possibly from stale landmarks.
    pub rendered: Vec<Placement>,
}

pub struct Session {
    mode: OverlayMode,
    earring: AssetState,
    necklace: AssetState,
    smoother: LandmarkSmoother,
    renderer: OverlayRenderer,
    catalog: Catalog,
    loader: AssetLoader,
    last_snapshot: Option<Snapshot>,
}

impl Session {
    /// Build a session from config and start its asset loader thread.
    pub fn new(config: &Config) -> Result<Self, SessionError> {
        let smoother = LandmarkSmoother::new(config.smoothing.alpha)?;
        let loader = AssetLoader::spawn()?;
        tracing::debug!(alpha = smoother.alpha(), root = %config.assets.root.display(), "session created");

        Ok(Self {
            mode: OverlayMode::None,
            earring: AssetState::default(),
            necklace: AssetState::default(),
            smoother,
            renderer: OverlayRenderer::new(config.anchors.clone(), config.overlay.clone()),
            catalog: Catalog::from_config(&config.assets),
            loader,
            last_snapshot: None,
        })
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn select_mode(&mut self, mode: OverlayMode) {
        tracing::info!(?mode, "overlay mode selected");
        self.mode = mode;
    }

    /// Start loading catalog entry `number` of `category`. Until it lands,
    /// the previously loaded jewel (if any) keeps being drawn.
    pub fn select_asset(&mut self, category: JewelryCategory, number: u32) -> Result<(), AssetError> {
        let id = AssetId::new(category, number);
        let path = self.catalog.path(id)?;
        self.loader.request(id, path)?;
        self.slot_mut(category).request(id);
        tracing::info!(asset = %id, "jewel requested");
        Ok(())
    }

    pub fn asset_state(&self, category: JewelryCategory) -> &AssetState {
        match category {
            JewelryCategory::Earring => &self.earring,
            JewelryCategory::Necklace => &self.necklace,
        }
    }

    fn slot_mut(&mut self, category: JewelryCategory) -> &mut AssetState {
        match category {
            JewelryCategory::Earring => &mut self.earring,
            JewelryCategory::Necklace => &mut self.necklace,
        }
    }

    /// Fold one load outcome into the matching category.
    pub fn apply_outcome(&mut self, outcome: LoadOutcome) -> bool {
        let id = outcome.id();
        let applied = self.slot_mut(id.category).resolve(outcome);
        if applied {
            match self.asset_state(id.category) {
                AssetState::Loaded(_) => tracing::info!(asset = %id, "jewel ready"),
                AssetState::Failed { reason, .. } => {
                    tracing::warn!(asset = %id, reason = %reason, "jewel unavailable; keeping previous")
                }
                _ => {}
            }
        } else {
            tracing::debug!(asset = %id, "dropping superseded load");
        }
        applied
    }

    /// Apply every load that has finished so far. Never blocks.
    pub fn poll_assets(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.loader.try_outcome() {
            if self.apply_outcome(outcome) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until no category has a load in flight.
    pub fn settle_assets(&mut self) {
        while self.earring.is_pending() || self.necklace.is_pending() {
            match self.loader.wait_outcome() {
                Some(outcome) => {
                    self.apply_outcome(outcome);
                }
                None => break,
            }
        }
    }

    /// Smoothed landmarks, absent until the first face is detected.
    pub fn landmarks(&self) -> Option<&LandmarkSet> {
        self.smoother.landmarks()
    }

    /// Per-frame entry point: apply finished loads, fold the detection into
    /// the smoother, and draw the active jewelry onto `surface`.
    ///
    /// A frame without a face keeps the previous landmarks, so the overlay
    /// stays where it was until tracking resumes.
    pub fn process_frame<S: Surface + ?Sized>(&mut self, detection: &Detection, surface: &mut S) -> FrameReport {
        self.poll_assets();
        self.smoother.observe(detection);

        FrameReport {
            face_detected: matches!(detection, Detection::Face(_)),
            rendered: self.render(surface),
        }
    }

    /// Draw the active jewelry at the current smoothed landmarks.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) -> Vec<Placement> {
        let Some(landmarks) = self.smoother.landmarks() else {
            return Vec::new();
        };
        self.renderer.render(
            surface,
            landmarks,
            self.mode,
            self.earring.drawable(),
            self.necklace.drawable(),
        )
    }

    /// Composite the overlay onto a copy of `frame` and keep it as the last
    /// snapshot. Loads that finished since the last frame are applied first.
    pub fn take_snapshot(&mut self, frame: &RgbaImage) -> Result<&Snapshot, SnapshotError> {
        self.poll_assets();
        if self.smoother.landmarks().is_none() {
            tracing::warn!("snapshot requested before any face was detected");
            return Err(SnapshotError::NoLandmarks);
        }

        let mut canvas = frame.clone();
        let placements = self.render(&mut canvas);
        tracing::info!(
            width = canvas.width(),
            height = canvas.height(),
            placements = placements.len(),
            "snapshot taken"
        );
        Ok(self.last_snapshot.insert(Snapshot::new(canvas, placements)))
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn save_snapshot(&self, dir: &Path) -> Result<PathBuf, SnapshotError> {
        self.last_snapshot
            .as_ref()
            .ok_or(SnapshotError::NothingCaptured)?
            .save(dir)
    }

    pub fn share_snapshot(&self, target: &dyn ShareTarget) -> Result<(), SnapshotError> {
        let snapshot = self.last_snapshot.as_ref().ok_or(SnapshotError::NothingCaptured)?;
        let result = target.share(&snapshot.share_request()?);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "share failed");
        }
        result
    }
}
