use tracing::{info, warn};

use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::pipeline::CancelToken;

/// Per-frame object detector.
///
/// The model itself lives outside this crate; anything that turns a raster
/// into boxes of the football class set can be plugged in here.
pub trait Detector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    #[inline]
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}

/// Runs `detector` over `frames` in order.
///
/// A frame the detector fails on counts as a frame without detections. Only a
/// failure on every frame is fatal. Detections with non-finite values are
/// dropped. `cancel` is checked before every frame.
pub fn detect_frames<D: Detector + ?Sized>(
    detector: &D,
    frames: &[Frame],
    cancel: &CancelToken,
) -> Result<Vec<Vec<Detection>>> {
    let mut out = Vec::with_capacity(frames.len());
    let mut failed = 0usize;

    for (expected, frame) in frames.iter().enumerate() {
        cancel.check()?;

        if frame.index != expected {
            return Err(Error::FrameOrder {
                expected,
                found: frame.index,
            });
        }

        match detector.detect(frame) {
            Ok(mut dets) => {
                let found = dets.len();
                dets.retain(Detection::is_valid);
                if dets.len() < found {
                    warn!(
                        "frame {}: dropped {} non-finite detections",
                        frame.index,
                        found - dets.len()
                    );
                }
                out.push(dets);
            }
            Err(err) => {
                warn!("frame {}: detector failed: {}", frame.index, err);
                failed += 1;
                out.push(Vec::new());
            }
        }
    }

    if !frames.is_empty() && failed == frames.len() {
        return Err(Error::DetectorFailed {
            frames: frames.len(),
        });
    }

    info!(
        "detected {} frames ({} failed)",
        frames.len() - failed,
        failed
    );

    Ok(out)
}
