use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb, Xywh};

/// Closed class vocabulary of the football detector.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Player,
    Referee,
    Ball,
    Goalkeeper,
}

/// One raw detector output for a single frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: ObjectClass,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox<Ltrb>, class: ObjectClass, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            class,
        }
    }

    /// Builds a detection from a center-format box, the layout most YOLO heads emit.
    #[inline]
    pub fn from_xywh(bbox: BBox<Xywh>, class: ObjectClass, confidence: f32) -> Self {
        Self::new(bbox.as_ltrb(), class, confidence)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.bbox.is_finite() && self.confidence.is_finite()
    }
}
