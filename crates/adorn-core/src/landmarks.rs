//! Landmark stream produced by an external face tracker.
//!
//! One JSON object per line and per frame:
//!
//! ```text
//! {"frame": 17, "faces": [[{"x": 0.41, "y": 0.37, "z": -0.02}, ...]]}
//! ```
//!
//! An absent or empty `faces` array means no face was found in that frame.
//! Only the first face is used; the tracker is expected to run with a
//! single-face limit.

use crate::types::{Detection, LandmarkPoint, LandmarkSet};
use serde::Deserialize;
use std::io::BufRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("failed to read landmark stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed landmark record on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// Wire form of one tracker result.
#[derive(Debug, Deserialize)]
pub struct FrameRecord {
    #[serde(default)]
    pub frame: Option<u64>,
    #[serde(default)]
    pub faces: Vec<Vec<LandmarkPoint>>,
}

impl FrameRecord {
    pub fn into_detection(self) -> Detection {
        match self.faces.into_iter().next() {
            Some(points) if !points.is_empty() => Detection::Face(LandmarkSet::new(points)),
            _ => Detection::NoFace,
        }
    }
}

/// Parse a single record.
pub fn parse_record(text: &str) -> Result<FrameRecord, serde_json::Error> {
    serde_json::from_str(text)
}

/// Per-frame supplier of tracker output.
pub trait LandmarkSource {
    /// Detection for the next frame, or `None` once the stream has ended.
    fn next_detection(&mut self) -> Result<Option<Detection>, LandmarkError>;
}

/// Reads [`FrameRecord`]s from a JSON Lines stream, skipping blank lines.
pub struct JsonlLandmarkSource<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> JsonlLandmarkSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Line number of the last record returned (1-based).
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> LandmarkSource for JsonlLandmarkSource<R> {
    fn next_detection(&mut self) -> Result<Option<Detection>, LandmarkError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let record = parse_record(text).map_err(|source| LandmarkError::Parse {
                line: self.line,
                source,
            })?;
            tracing::trace!(line = self.line, frame = ?record.frame, faces = record.faces.len(), "landmark record");
            return Ok(Some(record.into_detection()));
        }
    }
}
