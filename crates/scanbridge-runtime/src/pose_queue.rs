//! [`PoseQueue`] – the ordered list of scan poses.
//!
//! Loaded once at startup from a plain text file with one pose per line:
//!
//! ```text
//! x y z qx qy qz qw
//! ```
//!
//! Loading is all-or-nothing: the first malformed line aborts the load with
//! its line number, so a half-read queue is never driven.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use scanbridge_types::{Pose, ScanError};

/// A parsed pose together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseRecord {
    /// 1-based line number in the source file.
    pub line: usize,
    /// The line as it appeared in the file, trimmed.
    pub raw: String,
    pub pose: Pose,
}

/// Poses consumed front-to-back, one per orchestration cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseQueue {
    records: VecDeque<PoseRecord>,
}

impl PoseQueue {
    /// Read and parse the pose file at `path`.
    ///
    /// # Errors
    ///
    /// * [`ScanError::PoseFileOpen`] – the file cannot be read.
    /// * [`ScanError::MalformedPose`] – a non-blank line is not a valid pose,
    ///   or the file is not UTF-8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ScanError::PoseFileOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            ScanError::MalformedPose {
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                reason: "invalid UTF-8".to_string(),
            }
        })?;
        Self::parse(&text)
    }

    /// Parse pose records from `text`.  Blank lines and a leading byte-order
    /// mark are skipped.
    pub fn parse(text: &str) -> Result<Self, ScanError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = VecDeque::new();
        for (index, line) in text.lines().enumerate() {
            let raw = line.trim();
            if raw.is_empty() {
                continue;
            }
            let pose = raw.parse::<Pose>().map_err(|reason| ScanError::MalformedPose {
                line: index + 1,
                reason,
            })?;
            records.push_back(PoseRecord {
                line: index + 1,
                raw: raw.to_string(),
                pose,
            });
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove and return the next pose to visit.
    pub fn pop_front(&mut self) -> Option<PoseRecord> {
        self.records.pop_front()
    }
}

impl FromIterator<PoseRecord> for PoseQueue {
    fn from_iter<I: IntoIterator<Item = PoseRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
