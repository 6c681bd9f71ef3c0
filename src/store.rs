use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bbox::{BBox, Ltrb};
use crate::track::{BallObservation, PlayerObservation, RefereeObservation, Team, TrackId, BALL_ID};

pub type Players = BTreeMap<TrackId, PlayerObservation>;
pub type Referees = BTreeMap<TrackId, RefereeObservation>;

/// Everything the tracker linked in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTracks {
    pub players: Players,
    pub referees: Referees,
    pub ball: Option<BallObservation>,
}

/// Per-frame, per-identity record of every tracked entity.
///
/// All three channels always hold exactly one entry per frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TrackStore {
    pub players: Vec<Players>,
    pub referees: Vec<Referees>,
    pub ball: Vec<Option<BallObservation>>,
}

impl TrackStore {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            players: Vec::with_capacity(frames),
            referees: Vec::with_capacity(frames),
            ball: Vec::with_capacity(frames),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn push(&mut self, frame: FrameTracks) {
        self.players.push(frame.players);
        self.referees.push(frame.referees);
        self.ball.push(frame.ball);
    }

    #[inline]
    pub fn ball_bbox(&self, frame: usize) -> Option<&BBox<Ltrb>> {
        self.ball.get(frame)?.as_ref().map(|b| &b.bbox)
    }

    /// The ball of `frame` keyed the way players and referees are.
    pub fn ball_track(&self, frame: usize) -> Option<(TrackId, &BallObservation)> {
        self.ball.get(frame)?.as_ref().map(|b| (BALL_ID, b))
    }

    /// Identity of the player flagged with the ball in `frame`.
    pub fn ball_holder(&self, frame: usize) -> Option<TrackId> {
        self.players
            .get(frame)?
            .iter()
            .find(|(_, p)| p.has_ball)
            .map(|(id, _)| *id)
    }
}

/// Share of ball control per team, in percent.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PossessionStats {
    pub team1: f32,
    pub team2: f32,
}

impl PossessionStats {
    /// Frames without a controlling team are left out of the denominator.
    /// Returns `None` when no frame has one.
    pub fn from_sequence(possession: &[Option<Team>]) -> Option<Self> {
        let (mut ones, mut twos) = (0usize, 0usize);
        for team in possession.iter().flatten() {
            match team {
                Team::One => ones += 1,
                Team::Two => twos += 1,
            }
        }

        let total = (ones + twos) as f32;
        if total == 0.0 {
            return None;
        }

        Some(Self {
            team1: ones as f32 / total * 100.0,
            team2: twos as f32 / total * 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_skip_uncontrolled_frames() {
        let seq = [Some(Team::One), None, Some(Team::Two), Some(Team::One), None];
        let stats = PossessionStats::from_sequence(&seq).unwrap();

        assert!((stats.team1 - 200.0 / 3.0).abs() < 1e-4);
        assert!((stats.team2 - 100.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_stats_without_control_is_none() {
        assert_eq!(PossessionStats::from_sequence(&[None, None]), None);
        assert_eq!(PossessionStats::from_sequence(&[]), None);
    }

    #[test]
    fn test_store_json_round_trip() {
        let mut store = TrackStore::with_capacity(1);
        let mut frame = FrameTracks::default();
        let mut player = PlayerObservation::new(BBox::ltrb(0.0, 0.0, 10.0, 30.0));
        player.team = Some(Team::Two);
        player.team_color = Some([10.0, 20.0, 30.0]);
        player.has_ball = true;
        frame.players.insert(7, player);
        frame.referees.insert(2, RefereeObservation { bbox: BBox::ltrb(1.0, 1.0, 2.0, 2.0) });
        frame.ball = Some(BallObservation::detected(BBox::ltrb(3.0, 3.0, 4.0, 4.0)));
        store.push(frame);

        let json = serde_json::to_string(&store).unwrap();
        let back: TrackStore = serde_json::from_str(&json).unwrap();

        assert_eq!(back, store);
        assert_eq!(back.ball_holder(0), Some(7));
        assert_eq!(back.ball_track(0).map(|(id, _)| id), Some(BALL_ID));
        assert_eq!(back.ball_track(1), None);
    }
}
