use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::config::PossessionConfig;
use crate::store::Players;
use crate::track::TrackId;

// distances this close count as a tie
const TIE_EPSILON: f32 = 1e-4;

/// Where on a player box the distance to the ball is measured.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePoint {
    /// Nearer of the bottom-left and bottom-right corners (both feet).
    BottomCorners,
    BottomCenter,
    /// Closest point of the box, zero when the ball center is inside.
    NearestEdge,
}

impl ReferencePoint {
    pub fn distance(self, bbox: &BBox<Ltrb>, ball: &na::Point2<f32>) -> f32 {
        match self {
            ReferencePoint::BottomCorners => na::distance(&bbox.bottom_left(), ball)
                .min(na::distance(&bbox.bottom_right(), ball)),
            ReferencePoint::BottomCenter => na::distance(&bbox.bottom_center(), ball),
            ReferencePoint::NearestEdge => na::distance(&bbox.nearest_point(ball), ball),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PossessionAssigner {
    max_distance: f32,
    reference: ReferencePoint,
}

impl PossessionAssigner {
    pub fn new(config: &PossessionConfig) -> Self {
        Self {
            max_distance: config.max_distance,
            reference: config.reference,
        }
    }

    /// Player nearest to the ball center, if within the (inclusive) radius.
    ///
    /// Equidistant candidates resolve to the lowest identity.
    pub fn assign_ball_to_player(&self, players: &Players, ball: &BBox<Ltrb>) -> Option<TrackId> {
        let center = ball.center();
        let mut best: Option<(TrackId, f32)> = None;

        for (&id, player) in players {
            let dist = self.reference.distance(&player.bbox, &center);
            if !dist.is_finite() || dist > self.max_distance {
                continue;
            }

            match best {
                Some((_, best_dist)) if dist >= best_dist - TIE_EPSILON => {}
                _ => best = Some((id, dist)),
            }
        }

        best.map(|(id, _)| id)
    }
}
