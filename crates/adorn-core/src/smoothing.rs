//! Exponential smoothing of landmark positions across frames.
//!
//! Each tracked point is filtered independently per axis:
//! `s = s * (1 - alpha) + raw * alpha`. The first detection seeds the
//! buffer; frames without a face leave it untouched so the overlay keeps
//! its last known position.

use crate::types::{Detection, LandmarkPoint, LandmarkSet};
use thiserror::Error;

pub const DEFAULT_ALPHA: f32 = 0.2;

#[derive(Error, Debug, PartialEq)]
pub enum SmoothingError {
    #[error("smoothing factor must be in (0, 1], got {0}")]
    InvalidAlpha(f32),
}

/// Check that `alpha` is a usable smoothing factor.
pub fn validate_alpha(alpha: f32) -> Result<f32, SmoothingError> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(alpha)
    } else {
        Err(SmoothingError::InvalidAlpha(alpha))
    }
}

/// Blend one point towards `raw` by `alpha`.
pub fn blend(smoothed: LandmarkPoint, raw: LandmarkPoint, alpha: f32) -> LandmarkPoint {
    LandmarkPoint {
        x: smoothed.x * (1.0 - alpha) + raw.x * alpha,
        y: smoothed.y * (1.0 - alpha) + raw.y * alpha,
    }
}

/// Persistent exponential moving average over landmark sets.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f32,
    buffer: Option<LandmarkSet>,
}

impl LandmarkSmoother {
    pub fn new(alpha: f32) -> Result<Self, SmoothingError> {
        Ok(Self {
            alpha: validate_alpha(alpha)?,
            buffer: None,
        })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Current smoothed landmarks, absent until the first face is seen.
    pub fn landmarks(&self) -> Option<&LandmarkSet> {
        self.buffer.as_ref()
    }

    /// Fold one raw landmark set into the buffer.
    pub fn update(&mut self, raw: &LandmarkSet) -> &LandmarkSet {
        let alpha = self.alpha;
        match &mut self.buffer {
            Some(buffer) if buffer.len() == raw.len() => {
                for (s, r) in buffer.points.iter_mut().zip(raw.points.iter()) {
                    *s = blend(*s, *r, alpha);
                }
            }
            slot => {
                match slot {
                    Some(previous) => tracing::warn!(
                        previous = previous.len(),
                        current = raw.len(),
                        "landmark count changed; re-seeding smoothing buffer"
                    ),
                    None => tracing::debug!(points = raw.len(), "seeding smoothing buffer"),
                }
                *slot = Some(raw.clone());
            }
        }
        // Populated by every branch above.
        self.buffer.get_or_insert_with(|| raw.clone())
    }

    /// Apply one frame's detection. `NoFace` keeps the buffer as is.
    pub fn observe(&mut self, detection: &Detection) -> Option<&LandmarkSet> {
        match detection {
            Detection::Face(raw) => Some(self.update(raw)),
            Detection::NoFace => self.buffer.as_ref(),
        }
    }

    /// Forget the buffer; the next face seeds it again.
    pub fn reset(&mut self) {
        self.buffer = None;
    }
}
