//! Tunable thresholds, loadable from a JSON file.
//!
//! Every field has a default, so a config file only needs the keys it changes.

use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::possession::ReferencePoint;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub team: TeamConfig,
    pub possession: PossessionConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum IoU between a detection and a track's last box to link them.
    pub min_iou: f32,
    /// Detections below this confidence are dropped before association.
    pub min_confidence: f32,
    /// Track goalkeepers in the players channel instead of dropping them.
    pub goalkeeper_as_player: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_iou: 0.3,
            min_confidence: 0.0,
            goalkeeper_as_player: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TeamConfig {
    /// Upper bound on 2-means refinement rounds.
    pub max_iterations: usize,
    /// Smallest crop width and upper-half height, in pixels, worth sampling.
    pub min_crop_size: u32,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            min_crop_size: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PossessionConfig {
    /// Inclusive radius, in pixels, between the ball center and the player reference point.
    pub max_distance: f32,
    pub reference: ReferencePoint,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            max_distance: 70.0,
            reference: ReferencePoint::BottomCorners,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Progress percentage reached once every frame has its teams assigned.
    pub team_stage_share: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            team_stage_share: 90,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.tracker;
        if !(0.0..=1.0).contains(&t.min_iou) {
            return Err(Error::InvalidConfig(format!(
                "tracker.min_iou must be within [0, 1], got {}",
                t.min_iou
            )));
        }

        if !t.min_confidence.is_finite() || t.min_confidence < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tracker.min_confidence must be a non-negative number, got {}",
                t.min_confidence
            )));
        }

        if self.team.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "team.max_iterations must be positive".to_string(),
            ));
        }

        let d = self.possession.max_distance;
        if !d.is_finite() || d < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "possession.max_distance must be a non-negative number, got {}",
                d
            )));
        }

        if self.pipeline.team_stage_share > 100 {
            return Err(Error::InvalidConfig(format!(
                "pipeline.team_stage_share must be at most 100, got {}",
                self.pipeline.team_stage_share
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "possession": {{ "max_distance": 40.0, "reference": "bottom_center" }} }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.possession.max_distance, 40.0);
        assert_eq!(config.possession.reference, ReferencePoint::BottomCenter);
        assert_eq!(config.tracker, TrackerConfig::default());
    }

    #[test]
    fn test_rejects_iou_above_one() {
        let mut config = Config::default();
        config.tracker.min_iou = 1.5;

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_nan_radius() {
        let mut config = Config::default();
        config.possession.max_distance = f32::NAN;

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
