use crate::TryOn;
use adorn_core::assets::Catalog;
use adorn_core::landmarks::{JsonlLandmarkSource, LandmarkSource};
use adorn_core::snapshot::{DirectoryShare, ShareTarget, SnapshotError, Unsupported};
use adorn_core::{Config, Detection, JewelryCategory, Session};
use adorn_hw::Camera;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Create a session with the requested mode and jewelry. Loads are only
/// queued; `settle` waits for them.
fn start_session(config: &Config, try_on: &TryOn, settle: bool) -> Result<Session> {
    let mut session = Session::new(config).context("failed to start session")?;
    session.select_mode(try_on.mode);

    for (category, number) in [
        (JewelryCategory::Earring, try_on.earring),
        (JewelryCategory::Necklace, try_on.necklace),
    ] {
        if let Some(number) = number {
            session
                .select_asset(category, number)
                .with_context(|| format!("cannot select {category} {number}"))?;
        }
    }

    if settle {
        session.settle_assets();
    }
    Ok(session)
}

/// Snapshot `frame` into `dir`. A missing face is reported as a warning and
/// produces no file.
fn snapshot_to(session: &mut Session, frame: &RgbaImage, dir: &Path) -> Result<Option<PathBuf>> {
    if let Err(err) = session.take_snapshot(frame) {
        return match err {
            SnapshotError::NoLandmarks => {
                eprintln!("warning: {err}");
                Ok(None)
            }
            other => Err(other.into()),
        };
    }
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(Some(session.save_snapshot(dir)?))
}

fn open_landmarks(path: &Path) -> Result<Box<dyn LandmarkSource>> {
    if path == Path::new("-") {
        return Ok(Box::new(JsonlLandmarkSource::new(std::io::stdin().lock())));
    }
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(Box::new(JsonlLandmarkSource::new(BufReader::new(file))))
}

/// Image files in `dir`, sorted by file name.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

pub fn catalog(config: &Config, only: Option<JewelryCategory>) -> Result<()> {
    let catalog = Catalog::from_config(&config.assets);
    println!("Asset root: {}", catalog.root().display());

    for category in JewelryCategory::ALL {
        if only.is_some_and(|c| c != category) {
            continue;
        }
        println!("{category}s ({}):", catalog.count(category));
        for (id, path) in catalog.entries(category) {
            let status = if path.exists() { "ok" } else { "missing" };
            println!("  {:>3}  {:<8} {}", id.number, status, path.display());
        }
    }
    Ok(())
}

pub fn compose(
    config: &Config,
    image_path: &Path,
    landmarks: &Path,
    try_on: &TryOn,
    out: &Path,
    share: Option<Option<PathBuf>>,
) -> Result<()> {
    let frame = image::open(image_path)
        .with_context(|| format!("cannot open {}", image_path.display()))?
        .to_rgba8();
    let detection = open_landmarks(landmarks)?
        .next_detection()?
        .unwrap_or(Detection::NoFace);

    let mut session = start_session(config, try_on, true)?;
    let mut preview = frame.clone();
    session.process_frame(&detection, &mut preview);

    let Some(path) = snapshot_to(&mut session, &frame, out)? else {
        return Ok(());
    };
    println!("Saved {}", path.display());

    if let Some(share_dir) = share {
        let target: Box<dyn ShareTarget> = match share_dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("cannot create {}", dir.display()))?;
                Box::new(DirectoryShare { dir })
            }
            None => Box::new(Unsupported),
        };
        match session.share_snapshot(target.as_ref()) {
            Ok(()) => println!("Shared"),
            Err(SnapshotError::ShareUnsupported) => {
                eprintln!("warning: {}", SnapshotError::ShareUnsupported)
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

pub fn replay(
    config: &Config,
    frames_dir: &Path,
    landmarks: &Path,
    try_on: &TryOn,
    out: &Path,
    snapshot: bool,
) -> Result<()> {
    let frames = list_frames(frames_dir)?;
    if frames.is_empty() {
        anyhow::bail!("no frame images in {}", frames_dir.display());
    }
    std::fs::create_dir_all(out).with_context(|| format!("cannot create {}", out.display()))?;

    let mut source = open_landmarks(landmarks)?;
    let mut session = start_session(config, try_on, true)?;
    let mut detected = 0usize;
    let mut last_frame = None;

    for (i, path) in frames.iter().enumerate() {
        let frame = image::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?
            .to_rgba8();
        let detection = match source.next_detection()? {
            Some(detection) => detection,
            None => {
                tracing::debug!(frame = i, "landmark stream exhausted");
                Detection::NoFace
            }
        };

        let mut composited = frame.clone();
        let report = session.process_frame(&detection, &mut composited);
        if report.face_detected {
            detected += 1;
        }

        let out_path = out.join(format!("frame-{i:05}.png"));
        composited
            .save(&out_path)
            .with_context(|| format!("cannot write {}", out_path.display()))?;
        last_frame = Some(frame);
    }

    println!(
        "Rendered {} frames ({} with a face) into {}",
        frames.len(),
        detected,
        out.display()
    );

    if let (true, Some(frame)) = (snapshot, last_frame) {
        if let Some(path) = snapshot_to(&mut session, &frame, &config.snapshot.dir)? {
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

pub fn live(config: &Config, landmarks: &Path, try_on: &TryOn, max_frames: usize, out: &Path) -> Result<()> {
    let camera = Camera::open(&config.camera.device, config.camera.width, config.camera.height)
        .with_context(|| format!("cannot open camera {}", config.camera.device))?;
    let mut stream = camera.stream()?;
    let mut source = open_landmarks(landmarks)?;
    let mut session = start_session(config, try_on, false)?;

    let mut last_frame = None;
    let mut processed = 0usize;

    while processed < max_frames {
        let Some(detection) = source.next_detection()? else {
            tracing::info!("landmark stream ended");
            break;
        };
        let frame = stream.next_frame()?.to_rgba_image()?;
        let mut composited = frame.clone();
        let report = session.process_frame(&detection, &mut composited);
        tracing::debug!(
            frame = processed,
            face = report.face_detected,
            placements = report.rendered.len(),
            "frame processed"
        );
        last_frame = Some(frame);
        processed += 1;
    }

    println!("Processed {processed} frames from {}", camera.device_path);

    let Some(frame) = last_frame else {
        return Ok(());
    };
    session.settle_assets();
    if let Some(path) = snapshot_to(&mut session, &frame, out)? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

pub fn devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No capture devices found");
        return;
    }
    for dev in devices {
        println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
    }
}
