//! Per-frame analytics for broadcast football clips.
//!
//! Raw detections go through [`Tracker`] (stable identities, ball gap
//! filling), [`TeamAssigner`] (jersey color clustering) and
//! [`PossessionAssigner`] (nearest player to the ball), producing a
//! [`TrackStore`] plus the team in control of the ball for every frame.
//! [`Pipeline`] drives the stages in order.

pub mod bbox;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod interpolate;
pub mod pipeline;
pub mod possession;
pub mod store;
pub mod team;
pub mod track;
pub mod tracker;

pub use bbox::BBox;
pub use cache::{DetectionCache, SourceKey};
pub use config::Config;
pub use detection::{Detection, ObjectClass};
pub use detector::Detector;
pub use error::{Error, Result};
pub use frame::Frame;
pub use pipeline::{Analysis, AnalysisHandle, CancelToken, DetectionSource, Pipeline};
pub use possession::{PossessionAssigner, ReferencePoint};
pub use store::{PossessionStats, TrackStore};
pub use team::TeamAssigner;
pub use track::{Team, TrackId, BALL_ID};
pub use tracker::Tracker;
