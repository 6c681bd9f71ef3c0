use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::{BBox, Ltrb};

pub type TrackId = u32;

/// The ball has no track of its own, every frame files it under this identity.
pub const BALL_ID: TrackId = 1;

/// RGB centroid, channels in `0.0..=255.0`.
pub type Color = [f32; 3];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "u8", try_from = "u8")]
pub enum Team {
    One,
    Two,
}

impl Team {
    #[inline]
    pub fn id(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.id() as usize - 1
    }

    #[inline]
    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Team::One),
            1 => Some(Team::Two),
            _ => None,
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> u8 {
        team.id()
    }
}

impl TryFrom<u8> for Team {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Team::One),
            2 => Ok(Team::Two),
            other => Err(format!("team must be 1 or 2, got {}", other)),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.id())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PlayerObservation {
    pub bbox: BBox<Ltrb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_color: Option<Color>,
    #[serde(default)]
    pub has_ball: bool,
}

impl PlayerObservation {
    pub fn new(bbox: BBox<Ltrb>) -> Self {
        Self {
            bbox,
            team: None,
            team_color: None,
            has_ball: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RefereeObservation {
    pub bbox: BBox<Ltrb>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BallObservation {
    pub bbox: BBox<Ltrb>,
    // filled in by gap interpolation rather than detected
    #[serde(default)]
    pub interpolated: bool,
}

impl BallObservation {
    pub fn detected(bbox: BBox<Ltrb>) -> Self {
        Self {
            bbox,
            interpolated: false,
        }
    }
}
