//! Runtime configuration: TOML file with `ADORN_*` environment overrides.
//!
//! Every field has a default, so an empty or missing file is valid. The
//! pixel offsets and scale factors are visual tuning values for the
//! bundled jewelry artwork and carry no geometric meaning.

use crate::smoothing::{validate_alpha, SmoothingError, DEFAULT_ALPHA};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Smoothing(#[from] SmoothingError),
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidScale { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub smoothing: SmoothingConfig,
    pub anchors: AnchorConfig,
    pub overlay: OverlayConfig,
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// EMA weight of the newest frame, in (0, 1]. Lower is steadier.
    pub alpha: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { alpha: DEFAULT_ALPHA }
    }
}

/// Landmark indices used as placement anchors, and their pixel offsets.
///
/// Defaults follow the MediaPipe face mesh topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub left_index: usize,
    pub right_index: usize,
    pub chin_index: usize,
    /// Added to the y coordinate of both ear anchors.
    pub ear_offset_y: f32,
    /// Added to the y coordinate of the chin anchor.
    pub chin_offset_y: f32,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            left_index: 234,
            right_index: 454,
            chin_index: 152,
            ear_offset_y: 8.0,
            chin_offset_y: 20.0,
        }
    }
}

/// Uniform scale applied to each jewelry image's native size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub earring_scale: f32,
    pub necklace_scale: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            earring_scale: 0.09,
            necklace_scale: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding `earrings/` and `necklaces/`.
    pub root: PathBuf,
    pub earring_count: u32,
    pub necklace_count: u32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            earring_count: 15,
            necklace_count: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Where saved snapshots are written.
    pub dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load from `path`, or from `ADORN_CONFIG`, or defaults; then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var("ADORN_CONFIG").ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Override fields from `ADORN_*` variables resolved through `lookup`.
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "ADORN_SMOOTHING_ALPHA", &mut self.smoothing.alpha);
        override_parsed(&lookup, "ADORN_EAR_OFFSET_Y", &mut self.anchors.ear_offset_y);
        override_parsed(&lookup, "ADORN_CHIN_OFFSET_Y", &mut self.anchors.chin_offset_y);
        override_parsed(&lookup, "ADORN_EARRING_SCALE", &mut self.overlay.earring_scale);
        override_parsed(&lookup, "ADORN_NECKLACE_SCALE", &mut self.overlay.necklace_scale);
        override_parsed(&lookup, "ADORN_EARRING_COUNT", &mut self.assets.earring_count);
        override_parsed(&lookup, "ADORN_NECKLACE_COUNT", &mut self.assets.necklace_count);
        override_parsed(&lookup, "ADORN_CAMERA_WIDTH", &mut self.camera.width);
        override_parsed(&lookup, "ADORN_CAMERA_HEIGHT", &mut self.camera.height);

        if let Some(root) = lookup("ADORN_ASSET_ROOT") {
            self.assets.root = PathBuf::from(root);
        }
        if let Some(device) = lookup("ADORN_CAMERA_DEVICE") {
            self.camera.device = device;
        }
        if let Some(dir) = lookup("ADORN_SNAPSHOT_DIR") {
            self.snapshot.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_alpha(self.smoothing.alpha)?;
        for (name, value) in [
            ("overlay.earring_scale", self.overlay.earring_scale),
            ("overlay.necklace_scale", self.overlay.necklace_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidScale { name, value });
            }
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable override"),
    }
}
