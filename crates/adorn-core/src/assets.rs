//! Jewelry image catalog, background loading and per-category load state.
//!
//! Images are decoded on a dedicated `adorn-assets` thread so frame
//! processing never blocks on disk. Results come back as [`LoadOutcome`]s
//! and are folded into an [`AssetState`] between frames. A failed load
//! leaves the previously loaded jewel in place.

use crate::config::AssetConfig;
use crate::types::{AssetId, JewelryCategory};
use image::RgbaImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("unknown asset {id}: catalog has {count} {category}s")]
    UnknownAsset {
        id: AssetId,
        category: JewelryCategory,
        count: u32,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to spawn asset loader thread: {0}")]
    Spawn(std::io::Error),
    #[error("asset loader thread exited")]
    LoaderClosed,
}

/// A decoded jewelry image.
#[derive(Clone)]
pub struct Jewel {
    pub id: AssetId,
    pub image: RgbaImage,
}

impl fmt::Debug for Jewel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jewel")
            .field("id", &self.id)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

/// Read and decode one jewelry image into RGBA.
pub fn load_jewel(id: AssetId, path: &Path) -> Result<Jewel, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes)
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    tracing::debug!(
        asset = %id,
        width = image.width(),
        height = image.height(),
        "decoded jewel"
    );
    Ok(Jewel { id, image })
}

/// Numbered jewelry images laid out as `<root>/<category>s/<category><n>.png`.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    earring_count: u32,
    necklace_count: u32,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>, earring_count: u32, necklace_count: u32) -> Self {
        Self {
            root: root.into(),
            earring_count,
            necklace_count,
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.root.clone(), config.earring_count, config.necklace_count)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn count(&self, category: JewelryCategory) -> u32 {
        match category {
            JewelryCategory::Earring => self.earring_count,
            JewelryCategory::Necklace => self.necklace_count,
        }
    }

    /// Resolve `id` to its file path, rejecting numbers outside the catalog.
    pub fn path(&self, id: AssetId) -> Result<PathBuf, AssetError> {
        let count = self.count(id.category);
        if id.number == 0 || id.number > count {
            return Err(AssetError::UnknownAsset {
                id,
                category: id.category,
                count,
            });
        }
        Ok(self.path_unchecked(id))
    }

    fn path_unchecked(&self, id: AssetId) -> PathBuf {
        self.root
            .join(format!("{}s", id.category))
            .join(id.file_name())
    }

    /// Every asset of `category`, in catalog order.
    pub fn entries(&self, category: JewelryCategory) -> impl Iterator<Item = (AssetId, PathBuf)> + '_ {
        (1..=self.count(category)).map(move |n| {
            let id = AssetId::new(category, n);
            (id, self.path_unchecked(id))
        })
    }
}

/// Result of one background load.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Jewel),
    Failed { id: AssetId, error: AssetError },
}

impl LoadOutcome {
    pub fn id(&self) -> AssetId {
        match self {
            LoadOutcome::Loaded(jewel) => jewel.id,
            LoadOutcome::Failed { id, .. } => *id,
        }
    }
}

/// Load state for one jewelry category.
#[derive(Debug, Clone, Default)]
pub enum AssetState {
    /// Nothing has been chosen yet.
    #[default]
    Unselected,
    /// A load is in flight; `previous` stays drawable meanwhile.
    Pending {
        requested: AssetId,
        previous: Option<Arc<Jewel>>,
    },
    Loaded(Arc<Jewel>),
    /// The last requested load failed; `previous` stays drawable.
    Failed {
        requested: AssetId,
        reason: String,
        previous: Option<Arc<Jewel>>,
    },
}

impl AssetState {
    /// The jewel the renderer should draw for this category, if any.
    pub fn drawable(&self) -> Option<&Jewel> {
        self.current().map(Arc::as_ref)
    }

    fn current(&self) -> Option<&Arc<Jewel>> {
        match self {
            AssetState::Unselected => None,
            AssetState::Loaded(jewel) => Some(jewel),
            AssetState::Pending { previous, .. } | AssetState::Failed { previous, .. } => {
                previous.as_ref()
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AssetState::Pending { .. })
    }

    /// Record that `id` has been requested.
    pub fn request(&mut self, id: AssetId) {
        let previous = self.current().cloned();
        *self = AssetState::Pending {
            requested: id,
            previous,
        };
    }

    /// Fold a load outcome in. Returns `false` if the outcome is for an
    /// asset that is no longer the pending request, in which case it is
    /// dropped.
    pub fn resolve(&mut self, outcome: LoadOutcome) -> bool {
        let AssetState::Pending { requested, previous } = self else {
            return false;
        };
        if *requested != outcome.id() {
            return false;
        }

        let previous = previous.take();
        *self = match outcome {
            LoadOutcome::Loaded(jewel) => AssetState::Loaded(Arc::new(jewel)),
            LoadOutcome::Failed { id, error } => AssetState::Failed {
                requested: id,
                reason: error.to_string(),
                previous,
            },
        };
        true
    }
}

/// Pending decode requests before `request` blocks.
pub const REQUEST_QUEUE_DEPTH: usize = 4;

struct LoadRequest {
    id: AssetId,
    path: PathBuf,
}

/// Handle to the background image decoding thread.
///
/// Dropping the handle closes the request channel and lets the thread exit.
pub struct AssetLoader {
    requests: mpsc::Sender<LoadRequest>,
    outcomes: mpsc::UnboundedReceiver<LoadOutcome>,
}

impl AssetLoader {
    pub fn spawn() -> Result<Self, AssetError> {
        let (req_tx, mut req_rx) = mpsc::channel::<LoadRequest>(REQUEST_QUEUE_DEPTH);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<LoadOutcome>();

        std::thread::Builder::new()
            .name("adorn-assets".into())
            .spawn(move || {
                tracing::debug!("asset loader started");
                while let Some(req) = req_rx.blocking_recv() {
                    let outcome = match load_jewel(req.id, &req.path) {
                        Ok(jewel) => LoadOutcome::Loaded(jewel),
                        Err(error) => {
                            tracing::warn!(asset = %req.id, %error, "jewel load failed");
                            LoadOutcome::Failed { id: req.id, error }
                        }
                    };
                    if out_tx.send(outcome).is_err() {
                        break;
                    }
                }
                tracing::debug!("asset loader exiting");
            })
            .map_err(AssetError::Spawn)?;

        Ok(Self {
            requests: req_tx,
            outcomes: out_rx,
        })
    }

    /// Queue `path` for decoding as `id`. Blocks while the queue is full,
    /// so must not be called from within an async runtime.
    pub fn request(&self, id: AssetId, path: PathBuf) -> Result<(), AssetError> {
        self.requests
            .blocking_send(LoadRequest { id, path })
            .map_err(|_| AssetError::LoaderClosed)
    }

    /// Next finished load, without blocking.
    pub fn try_outcome(&mut self) -> Option<LoadOutcome> {
        self.outcomes.try_recv().ok()
    }

    /// Block until the next load finishes. Must not be called from within
    /// an async runtime.
    pub fn wait_outcome(&mut self) -> Option<LoadOutcome> {
        self.outcomes.blocking_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_png(path: &Path, w: u32, h: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(w, h, Rgba([200, 160, 40, 255]))
            .save(path)
            .unwrap();
    }

    fn jewel(category: JewelryCategory, n: u32) -> Jewel {
        Jewel {
            id: AssetId::new(category, n),
            image: RgbaImage::new(2, 2),
        }
    }

    #[test]
    fn test_catalog_paths() {
        let catalog = Catalog::new("/srv/assets", 15, 24);
        let path = catalog.path(AssetId::new(JewelryCategory::Earring, 3)).unwrap();
        assert_eq!(path, PathBuf::from("/srv/assets/earrings/earring3.png"));

        let necklaces: Vec<_> = catalog.entries(JewelryCategory::Necklace).collect();
        assert_eq!(necklaces.len(), 24);
        assert_eq!(necklaces[23].1, PathBuf::from("/srv/assets/necklaces/necklace24.png"));
    }

    #[test]
    fn test_catalog_rejects_out_of_range() {
        let catalog = Catalog::new("assets", 15, 24);
        assert!(matches!(
            catalog.path(AssetId::new(JewelryCategory::Earring, 0)),
            Err(AssetError::UnknownAsset { .. })
        ));
        assert!(matches!(
            catalog.path(AssetId::new(JewelryCategory::Earring, 16)),
            Err(AssetError::UnknownAsset { count: 15, .. })
        ));
        assert!(catalog.path(AssetId::new(JewelryCategory::Necklace, 24)).is_ok());
    }

    #[test]
    fn test_load_jewel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("earrings/earring1.png");
        write_png(&path, 40, 80);

        let jewel = load_jewel(AssetId::new(JewelryCategory::Earring, 1), &path).unwrap();
        assert_eq!(jewel.image.dimensions(), (40, 80));
    }

    #[test]
    fn test_load_jewel_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_jewel(AssetId::new(JewelryCategory::Earring, 1), &dir.path().join("nope.png"))
            .unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn test_load_jewel_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = load_jewel(AssetId::new(JewelryCategory::Necklace, 2), &path).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn test_state_pending_then_loaded() {
        let mut state = AssetState::default();
        assert!(state.drawable().is_none());

        state.request(AssetId::new(JewelryCategory::Earring, 1));
        assert!(state.is_pending());
        assert!(state.drawable().is_none());

        assert!(state.resolve(LoadOutcome::Loaded(jewel(JewelryCategory::Earring, 1))));
        assert_eq!(state.drawable().unwrap().id.number, 1);
    }

    #[test]
    fn test_failed_load_keeps_previous() {
        let mut state = AssetState::default();
        state.request(AssetId::new(JewelryCategory::Earring, 1));
        state.resolve(LoadOutcome::Loaded(jewel(JewelryCategory::Earring, 1)));

        let second = AssetId::new(JewelryCategory::Earring, 2);
        state.request(second);
        assert_eq!(state.drawable().unwrap().id.number, 1);

        let applied = state.resolve(LoadOutcome::Failed {
            id: second,
            error: AssetError::LoaderClosed,
        });
        assert!(applied);
        assert!(matches!(state, AssetState::Failed { .. }));
        assert_eq!(state.drawable().unwrap().id.number, 1);
    }

    #[test]
    fn test_superseded_outcome_is_dropped() {
        let mut state = AssetState::default();
        state.request(AssetId::new(JewelryCategory::Necklace, 1));
        state.request(AssetId::new(JewelryCategory::Necklace, 2));

        assert!(!state.resolve(LoadOutcome::Loaded(jewel(JewelryCategory::Necklace, 1))));
        assert!(state.is_pending());

        assert!(state.resolve(LoadOutcome::Loaded(jewel(JewelryCategory::Necklace, 2))));
        assert_eq!(state.drawable().unwrap().id.number, 2);
    }

    #[test]
    fn test_outcome_without_request_is_dropped() {
        let mut state = AssetState::default();
        assert!(!state.resolve(LoadOutcome::Loaded(jewel(JewelryCategory::Earring, 1))));
        assert!(state.drawable().is_none());
    }

    #[test]
    fn test_loader_thread_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("necklaces/necklace1.png");
        write_png(&good, 30, 20);

        let mut loader = AssetLoader::spawn().unwrap();
        let good_id = AssetId::new(JewelryCategory::Necklace, 1);
        let bad_id = AssetId::new(JewelryCategory::Necklace, 2);
        loader.request(good_id, good).unwrap();
        loader.request(bad_id, dir.path().join("necklaces/necklace2.png")).unwrap();

        match loader.wait_outcome().unwrap() {
            LoadOutcome::Loaded(jewel) => {
                assert_eq!(jewel.id, good_id);
                assert_eq!(jewel.image.dimensions(), (30, 20));
            }
            other => panic!("expected loaded jewel, got {other:?}"),
        }
        match loader.wait_outcome().unwrap() {
            LoadOutcome::Failed { id, .. } => assert_eq!(id, bad_id),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_loader_accepts_more_requests_than_queue_depth() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AssetLoader::spawn().unwrap();
        let total = REQUEST_QUEUE_DEPTH as u32 * 3;
        for n in 1..=total {
            let path = dir.path().join(format!("earrings/earring{n}.png"));
            write_png(&path, 4, 4);
            loader.request(AssetId::new(JewelryCategory::Earring, n), path).unwrap();
        }

        let mut finished = Vec::new();
        for _ in 0..total {
            match loader.wait_outcome().unwrap() {
                LoadOutcome::Loaded(jewel) => finished.push(jewel.id.number),
                other => panic!("expected loaded jewel, got {other:?}"),
            }
        }
        assert_eq!(finished, (1..=total).collect::<Vec<_>>());
    }
}
