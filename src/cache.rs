//! On-disk memo of raw detector output.
//!
//! Layout: the first line is the JSON [`SourceKey`] of the clip, followed by
//! one `<frame index>: <json detections>` line per frame.

use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::detection::Detection;
use crate::detector::{detect_frames, Detector};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::pipeline::CancelToken;

/// Identifies the clip a cache was recorded from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    pub source: String,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
}

impl SourceKey {
    pub fn for_frames<S: Into<String>>(source: S, frames: &[Frame]) -> Self {
        let (width, height) = frames.first().map(|f| f.dims()).unwrap_or((0, 0));

        Self {
            source: source.into(),
            frame_count: frames.len(),
            width,
            height,
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} frames, {}x{})",
            self.source, self.frame_count, self.width, self.height
        )
    }
}

#[derive(Debug, Clone)]
pub struct DetectionCache {
    path: PathBuf,
}

impl DetectionCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the cache back, refusing one recorded for a different clip.
    pub fn load(&self, key: &SourceKey) -> Result<Vec<Vec<Detection>>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut lines = reader.lines();

        let header = lines.next().ok_or_else(|| Error::CacheCorrupt {
            line: 1,
            reason: "missing header".to_string(),
        })??;
        let found: SourceKey = serde_json::from_str(&header).map_err(|e| Error::CacheCorrupt {
            line: 1,
            reason: e.to_string(),
        })?;

        if &found != key {
            return Err(Error::CacheMismatch {
                expected: key.to_string(),
                found: found.to_string(),
            });
        }

        let mut frames = Vec::with_capacity(key.frame_count);
        for (n, line) in lines.enumerate() {
            let line_no = n + 2;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let corrupt = |reason: String| Error::CacheCorrupt {
                line: line_no,
                reason,
            };

            let (idx, dets) = line
                .split_once(':')
                .ok_or_else(|| corrupt("expected `:`".to_string()))?;
            let idx: usize = idx
                .trim()
                .parse()
                .map_err(|_| corrupt(format!("bad frame index {:?}", idx)))?;

            if idx != frames.len() {
                return Err(corrupt(format!(
                    "frame {} where frame {} was expected",
                    idx,
                    frames.len()
                )));
            }

            let dets: Vec<Detection> =
                serde_json::from_str(dets.trim()).map_err(|e| corrupt(e.to_string()))?;
            frames.push(dets);
        }

        if frames.len() != key.frame_count {
            return Err(Error::CacheCorrupt {
                line: frames.len() + 1,
                reason: format!(
                    "holds {} frames, header promises {}",
                    frames.len(),
                    key.frame_count
                ),
            });
        }

        Ok(frames)
    }

    /// Writes `detections` for the clip `key`.
    ///
    /// The file only appears once fully written. Non-finite values have no
    /// JSON form, so a detection holding one is refused up front.
    pub fn store(&self, key: &SourceKey, detections: &[Vec<Detection>]) -> Result<()> {
        if let Some(frame) = detections
            .iter()
            .position(|dets| !dets.iter().all(Detection::is_valid))
        {
            return Err(Error::NonFiniteDetection { frame });
        }

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".part");
        let tmp = self.path.with_file_name(tmp_name);

        let written = (|| -> Result<()> {
            let mut out = BufWriter::new(File::create(&tmp)?);
            writeln!(out, "{}", serde_json::to_string(key)?)?;
            for (idx, dets) in detections.iter().enumerate() {
                writeln!(out, "{}: {}", idx, serde_json::to_string(dets)?)?;
            }
            out.flush()?;
            Ok(())
        })();

        match written {
            Ok(()) => {
                std::fs::rename(&tmp, &self.path)?;
                Ok(())
            }
            Err(err) => {
                let _ = std::fs::remove_file(&tmp);
                Err(err)
            }
        }
    }

    /// Cached detections for `frames` if present, otherwise runs `detector`
    /// once and records the result. A cancelled run records nothing.
    pub fn load_or_detect<D: Detector + ?Sized>(
        &self,
        key: &SourceKey,
        detector: &D,
        frames: &[Frame],
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<Detection>>> {
        if self.exists() {
            info!("reusing detections from {}", self.path.display());
            return self.load(key);
        }

        let detections = detect_frames(detector, frames, cancel)?;
        self.store(key, &detections)?;
        info!("recorded detections to {}", self.path.display());

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::detection::ObjectClass;
    use crate::detector::tests::Scripted;
    use image::RgbImage;
    use std::cell::Cell;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|i| Frame::new(i, RgbImage::new(8, 6))).collect()
    }

    fn sample() -> Vec<Vec<Detection>> {
        vec![
            vec![
                Detection::new(BBox::ltrb(0.1, 0.2, 10.3, 20.7), ObjectClass::Player, 0.87654),
                Detection::new(BBox::ltrb(5.0, 5.0, 6.0, 6.0), ObjectClass::Ball, 0.3),
            ],
            vec![],
            vec![Detection::new(
                BBox::ltrb(1.0 / 3.0, 2.0, 3.0, 4.0),
                ObjectClass::Goalkeeper,
                1.0,
            )],
        ]
    }

    #[test]
    fn test_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        let key = SourceKey::for_frames("clip.mp4", &frames(3));

        cache.store(&key, &sample()).unwrap();

        assert_eq!(cache.load(&key).unwrap(), sample());
        assert!(!dir.path().join("clip.dets.part").exists());
    }

    #[test]
    fn test_other_clip_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        cache
            .store(&SourceKey::for_frames("clip.mp4", &frames(3)), &sample())
            .unwrap();

        let other = SourceKey::for_frames("other.mp4", &frames(3));
        assert!(matches!(cache.load(&other), Err(Error::CacheMismatch { .. })));

        let longer = SourceKey::for_frames("clip.mp4", &frames(4));
        assert!(matches!(cache.load(&longer), Err(Error::CacheMismatch { .. })));
    }

    #[test]
    fn test_truncated_cache_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        let key = SourceKey::for_frames("clip.mp4", &frames(3));
        cache.store(&key, &sample()[..2]).unwrap();

        assert!(matches!(cache.load(&key), Err(Error::CacheCorrupt { .. })));
    }

    #[test]
    fn test_detector_runs_at_most_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        let frames = frames(3);
        let key = SourceKey::for_frames("clip.mp4", &frames);
        let detector = Scripted {
            frames: sample(),
            fail_on: vec![],
            calls: Cell::new(0),
        };

        let cancel = CancelToken::new();
        let first = cache.load_or_detect(&key, &detector, &frames, &cancel).unwrap();
        let second = cache.load_or_detect(&key, &detector, &frames, &cancel).unwrap();

        assert_eq!(detector.calls.get(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_detection_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        let frames = frames(2);
        let key = SourceKey::for_frames("clip.mp4", &frames);
        let detector = Scripted {
            frames: vec![],
            fail_on: vec![0, 1],
            calls: Cell::new(0),
        };

        assert!(cache
            .load_or_detect(&key, &detector, &frames, &CancelToken::new())
            .is_err());
        assert!(!cache.exists());
    }

    #[test]
    fn test_non_finite_detections_never_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        let frames = frames(2);
        let key = SourceKey::for_frames("clip.mp4", &frames);
        let kept = Detection::new(BBox::ltrb(2.0, 2.0, 8.0, 9.0), ObjectClass::Player, 0.8);
        let detector = Scripted {
            frames: vec![
                vec![
                    Detection::new(BBox::ltrb(0.0, f32::NAN, 1.0, 1.0), ObjectClass::Ball, 0.5),
                    kept,
                ],
                vec![Detection::new(
                    BBox::ltrb(0.0, 0.0, f32::INFINITY, 1.0),
                    ObjectClass::Player,
                    0.9,
                )],
            ],
            fail_on: vec![],
            calls: Cell::new(0),
        };
        let cancel = CancelToken::new();

        let first = cache.load_or_detect(&key, &detector, &frames, &cancel).unwrap();
        let second = cache.load_or_detect(&key, &detector, &frames, &cancel).unwrap();

        assert_eq!(first, vec![vec![kept], vec![]]);
        assert_eq!(second, first);
        assert_eq!(detector.calls.get(), 2);
    }

    #[test]
    fn test_store_refuses_non_finite_values() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        let key = SourceKey::for_frames("clip.mp4", &frames(2));
        let dets = vec![
            vec![],
            vec![Detection::new(BBox::ltrb(0.0, 0.0, 1.0, 1.0), ObjectClass::Ball, f32::NAN)],
        ];

        assert!(matches!(
            cache.store(&key, &dets),
            Err(Error::NonFiniteDetection { frame: 1 })
        ));
        assert!(!cache.exists());
    }

    #[test]
    fn test_cancelled_detection_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path().join("clip.dets"));
        let frames = frames(3);
        let key = SourceKey::for_frames("clip.mp4", &frames);
        let detector = Scripted {
            frames: sample(),
            fail_on: vec![],
            calls: Cell::new(0),
        };
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(matches!(
            cache.load_or_detect(&key, &detector, &frames, &cancel),
            Err(Error::Cancelled)
        ));
        assert_eq!(detector.calls.get(), 0);
        assert!(!cache.exists());
    }
}
