use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),

    #[error("detector failed on every one of {frames} frames")]
    DetectorFailed { frames: usize },

    #[error("detection cache belongs to {found}, expected {expected}")]
    CacheMismatch { expected: String, found: String },

    #[error("detection cache is corrupt at line {line}: {reason}")]
    CacheCorrupt { line: usize, reason: String },

    #[error("frame {frame} holds a detection with non-finite values")]
    NonFiniteDetection { frame: usize },

    #[error("frame {found} supplied out of order, expected frame {expected}")]
    FrameOrder { expected: usize, found: usize },

    #[error("{frames} frames supplied with detections for {detections} frames")]
    FrameCountMismatch { frames: usize, detections: usize },

    #[error("no frames to analyse")]
    EmptyInput,

    #[error("analysis cancelled")]
    Cancelled,

    #[error("analysis worker panicked")]
    WorkerPanicked,

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
