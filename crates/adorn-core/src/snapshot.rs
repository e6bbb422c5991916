//! Captured try-on stills: PNG encoding, saving and sharing.

use crate::overlay::Placement;
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SHARE_TITLE: &str = "Jewelry Try-On";
pub const SHARE_TEXT: &str = "Check out my look!";
pub const SHARE_FILE_NAME: &str = "jewelry-tryon.png";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Face not detected. Please try again.")]
    NoLandmarks,
    #[error("no snapshot has been taken")]
    NothingCaptured,
    #[error("Sharing not supported on this platform.")]
    ShareUnsupported,
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize share metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// A composited frame plus the jewelry placed on it.
#[derive(Clone)]
pub struct Snapshot {
    pub image: RgbaImage,
    pub placements: Vec<Placement>,
    pub taken_at: DateTime<Utc>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("placements", &self.placements)
            .field("taken_at", &self.taken_at)
            .finish()
    }
}

impl Snapshot {
    pub fn new(image: RgbaImage, placements: Vec<Placement>) -> Self {
        Self {
            image,
            placements,
            taken_at: Utc::now(),
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Download name, e.g. `jewelry-tryon-1760745600000.png`.
    pub fn file_name(&self) -> String {
        format!("jewelry-tryon-{}.png", self.taken_at.timestamp_millis())
    }

    /// Write the PNG into `dir` and return its path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, SnapshotError> {
        let path = dir.join(self.file_name());
        write_file(&path, &self.encode_png()?)?;
        tracing::info!(path = %path.display(), "snapshot saved");
        Ok(path)
    }

    pub fn share_request(&self) -> Result<ShareRequest, SnapshotError> {
        Ok(ShareRequest {
            title: SHARE_TITLE.to_string(),
            text: SHARE_TEXT.to_string(),
            file_name: SHARE_FILE_NAME.to_string(),
            png: self.encode_png()?,
        })
    }
}

/// Payload handed to a share target.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    pub title: String,
    pub text: String,
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Platform share integration.
pub trait ShareTarget {
    fn share(&self, request: &ShareRequest) -> Result<(), SnapshotError>;
}

/// Share target for platforms without a share facility.
pub struct Unsupported;

impl ShareTarget for Unsupported {
    fn share(&self, _request: &ShareRequest) -> Result<(), SnapshotError> {
        Err(SnapshotError::ShareUnsupported)
    }
}

/// Shares by dropping the image and a JSON description into a directory
/// watched by some other tool.
pub struct DirectoryShare {
    pub dir: PathBuf,
}

#[derive(Serialize)]
struct ShareMetadata<'a> {
    title: &'a str,
    text: &'a str,
    file_name: &'a str,
    shared_at: DateTime<Utc>,
}

impl ShareTarget for DirectoryShare {
    fn share(&self, request: &ShareRequest) -> Result<(), SnapshotError> {
        let image_path = self.dir.join(&request.file_name);
        write_file(&image_path, &request.png)?;

        let metadata = serde_json::to_vec_pretty(&ShareMetadata {
            title: &request.title,
            text: &request.text,
            file_name: &request.file_name,
            shared_at: Utc::now(),
        })?;
        let meta_path = self.dir.join(format!("{}.json", request.file_name));
        write_file(&meta_path, &metadata)?;

        tracing::info!(path = %image_path.display(), "snapshot shared");
        Ok(())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    std::fs::write(path, bytes).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn snapshot() -> Snapshot {
        Snapshot::new(RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 255])), Vec::new())
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let png = snapshot().encode_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.get_pixel(3, 3), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_file_name_uses_millis() {
        let snap = snapshot();
        let name = snap.file_name();
        assert!(name.starts_with("jewelry-tryon-"));
        assert!(name.ends_with(".png"));
        assert!(name.contains(&snap.taken_at.timestamp_millis().to_string()));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot().save(dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = snapshot().save(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[test]
    fn test_unsupported_share() {
        let request = snapshot().share_request().unwrap();
        let err = Unsupported.share(&request).unwrap_err();
        assert!(matches!(err, SnapshotError::ShareUnsupported));
        assert_eq!(err.to_string(), "Sharing not supported on this platform.");
    }

    #[test]
    fn test_directory_share() {
        let dir = tempfile::tempdir().unwrap();
        let target = DirectoryShare {
            dir: dir.path().to_path_buf(),
        };
        target.share(&snapshot().share_request().unwrap()).unwrap();

        assert!(dir.path().join("jewelry-tryon.png").exists());
        let meta: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("jewelry-tryon.png.json")).unwrap())
                .unwrap();
        assert_eq!(meta["title"], "Jewelry Try-On");
        assert_eq!(meta["text"], "Check out my look!");
    }
}
