use pathfinding::prelude::{kuhn_munkres, Matrix};
use tracing::{debug, trace};

use crate::bbox::{BBox, Ltrb};
use crate::config::TrackerConfig;
use crate::detection::{Detection, ObjectClass};
use crate::error::{Error, Result};
use crate::store::{FrameTracks, TrackStore};
use crate::track::{BallObservation, PlayerObservation, RefereeObservation, TrackId};

// the assignment solver works on integer weights
const IOU_MULTIPLIER: f32 = 10000.0;

/// Last known box of every identity alive in the previous frame.
type LiveTracks = Vec<(TrackId, BBox<Ltrb>)>;

/// Links per-frame detections into identities.
///
/// Players and referees are matched against the tracks of the previous frame
/// by one-to-one IoU assignment. A track that finds no detection ends; a
/// detection that finds no track starts a new identity. The ball keeps only
/// its most confident detection per frame and carries no identity.
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    next_id: TrackId,
    players: LiveTracks,
    referees: LiveTracks,
    next_frame: usize,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            next_id: 1,
            players: Vec::new(),
            referees: Vec::new(),
            next_frame: 0,
        }
    }

    /// Tracks a whole clip, one detection list per frame in frame order.
    pub fn get_object_tracks(&mut self, detections: &[Vec<Detection>]) -> Result<TrackStore> {
        let mut store = TrackStore::with_capacity(detections.len());
        for (idx, dets) in detections.iter().enumerate() {
            store.push(self.update(idx, dets)?);
        }

        Ok(store)
    }

    /// Consumes the detections of frame `frame_index`, which must directly
    /// follow the previously consumed frame.
    pub fn update(&mut self, frame_index: usize, detections: &[Detection]) -> Result<FrameTracks> {
        if frame_index != self.next_frame {
            return Err(Error::FrameOrder {
                expected: self.next_frame,
                found: frame_index,
            });
        }
        self.next_frame += 1;

        let mut player_boxes = Vec::new();
        let mut referee_boxes = Vec::new();
        let mut ball: Option<&Detection> = None;

        for det in detections {
            if !det.is_valid() || det.confidence < self.config.min_confidence {
                trace!("frame {}: dropping {:?}", frame_index, det);
                continue;
            }

            match det.class {
                ObjectClass::Player => player_boxes.push(det.bbox),
                ObjectClass::Goalkeeper if self.config.goalkeeper_as_player => {
                    player_boxes.push(det.bbox)
                }
                ObjectClass::Goalkeeper => {}
                ObjectClass::Referee => referee_boxes.push(det.bbox),
                ObjectClass::Ball => {
                    if ball.map_or(true, |b| det.confidence > b.confidence) {
                        ball = Some(det);
                    }
                }
            }
        }

        let players = self.link(Channel::Players, &player_boxes);
        let referees = self.link(Channel::Referees, &referee_boxes);

        debug!(
            "frame {}: {} players, {} referees, ball {}",
            frame_index,
            players.len(),
            referees.len(),
            if ball.is_some() { "seen" } else { "missing" }
        );

        Ok(FrameTracks {
            players: players
                .into_iter()
                .map(|(id, bbox)| (id, PlayerObservation::new(bbox)))
                .collect(),
            referees: referees
                .into_iter()
                .map(|(id, bbox)| (id, RefereeObservation { bbox }))
                .collect(),
            ball: ball.map(|b| BallObservation::detected(b.bbox)),
        })
    }

    fn link(&mut self, channel: Channel, boxes: &[BBox<Ltrb>]) -> LiveTracks {
        let table = match channel {
            Channel::Players => &mut self.players,
            Channel::Referees => &mut self.referees,
        };
        let live = std::mem::take(table);

        let matches = associate(&live, boxes, self.config.min_iou);

        let mut next: LiveTracks = Vec::with_capacity(boxes.len());
        for (bbox, matched) in boxes.iter().zip(matches) {
            let id = match matched {
                Some(track) => live[track].0,
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    id
                }
            };
            next.push((id, *bbox));
        }

        match channel {
            Channel::Players => self.players = next.clone(),
            Channel::Referees => self.referees = next.clone(),
        }

        next
    }
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Players,
    Referees,
}

/// For every detection, the index of the live track it continues.
///
/// Pairs are chosen to maximise total IoU, then pairs below `min_iou` are
/// dropped.
fn associate(tracks: &[(TrackId, BBox<Ltrb>)], dets: &[BBox<Ltrb>], min_iou: f32) -> Vec<Option<usize>> {
    let mut out = vec![None; dets.len()];
    if tracks.is_empty() || dets.is_empty() {
        return out;
    }

    let mut weights = Matrix::new(dets.len(), tracks.len(), 0i64);
    for (i, det) in dets.iter().enumerate() {
        for (j, (_, bbox)) in tracks.iter().enumerate() {
            weights[(i, j)] = (det.iou(bbox) * IOU_MULTIPLIER) as i64;
        }
    }

    let transpose = weights.rows > weights.columns;
    let weights = if transpose { weights.transposed() } else { weights };
    let (_, assignment) = kuhn_munkres(&weights);

    for (row, &col) in assignment.iter().enumerate() {
        let (det, track) = if transpose { (col, row) } else { (row, col) };

        let iou = dets[det].iou(&tracks[track].1);
        if iou > 0.0 && iou >= min_iou {
            out[det] = Some(track);
        }
    }

    out
}
