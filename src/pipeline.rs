//! Stage-sequential analysis of a clip.
//!
//! Tracking runs over every frame first, then the ball channel is filled in
//! one pass, then teams are assigned frame by frame, then possession. Each
//! stage needs the complete output of the previous one.

use crossbeam_channel::{Receiver, Sender};
use serde_derive::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

use crate::cache::{DetectionCache, SourceKey};
use crate::config::Config;
use crate::detection::Detection;
use crate::detector::{detect_frames, Detector};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::interpolate::interpolate_ball_positions;
use crate::possession::PossessionAssigner;
use crate::store::{PossessionStats, TrackStore};
use crate::team::TeamAssigner;
use crate::track::{Color, Team};
use crate::tracker::Tracker;

/// Shared flag asking a running analysis to stop at the next frame boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Result of a completed run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Analysis {
    pub tracks: TrackStore,
    /// Team of the ball holder per frame.
    pub team_ball_control: Vec<Option<Team>>,
    pub team_colors: Option<[Color; 2]>,
}

impl Analysis {
    #[inline]
    pub fn possession_stats(&self) -> Option<PossessionStats> {
        PossessionStats::from_sequence(&self.team_ball_control)
    }
}

/// Where the raw detections of a run come from.
pub enum DetectionSource {
    Precomputed(Vec<Vec<Detection>>),
    Detector {
        detector: Box<dyn Detector + Send>,
        cache: Option<DetectionCache>,
        source: String,
    },
}

// emits strictly increasing percentages only
struct Progress<F: FnMut(u8)> {
    last: Option<u8>,
    sink: F,
}

impl<F: FnMut(u8)> Progress<F> {
    fn new(sink: F) -> Self {
        Self { last: None, sink }
    }

    fn report(&mut self, pct: u8) {
        let pct = pct.min(100);
        if self.last.map_or(true, |last| pct > last) {
            self.last = Some(pct);
            (self.sink)(pct);
        }
    }
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    /// Resolves `source` into per-frame detections, consulting the cache
    /// before the detector.
    pub fn detections(
        &self,
        frames: &[Frame],
        source: DetectionSource,
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<Detection>>> {
        match source {
            DetectionSource::Precomputed(dets) => Ok(dets),
            DetectionSource::Detector {
                detector,
                cache: Some(cache),
                source,
            } => cache.load_or_detect(
                &SourceKey::for_frames(source, frames),
                &detector,
                frames,
                cancel,
            ),
            DetectionSource::Detector {
                detector,
                cache: None,
                ..
            } => detect_frames(&detector, frames, cancel),
        }
    }

    /// Analyses `frames` given one detection list per frame.
    ///
    /// `progress` receives strictly increasing percentages ending with 100.
    /// Cancellation is honoured between frames and discards all work done.
    pub fn run<F: FnMut(u8)>(
        &self,
        frames: &[Frame],
        detections: &[Vec<Detection>],
        cancel: &CancelToken,
        progress: F,
    ) -> Result<Analysis> {
        if frames.is_empty() {
            return Err(Error::EmptyInput);
        }

        if frames.len() != detections.len() {
            return Err(Error::FrameCountMismatch {
                frames: frames.len(),
                detections: detections.len(),
            });
        }

        for (expected, frame) in frames.iter().enumerate() {
            if frame.index != expected {
                return Err(Error::FrameOrder {
                    expected,
                    found: frame.index,
                });
            }
        }

        let mut progress = Progress::new(progress);
        let n = frames.len();
        progress.report(0);

        let mut tracker = Tracker::new(self.config.tracker.clone());
        let mut tracks = TrackStore::with_capacity(n);
        for (idx, dets) in detections.iter().enumerate() {
            cancel.check()?;
            tracks.push(tracker.update(idx, dets)?);
        }

        tracks.ball = interpolate_ball_positions(&tracks.ball);
        info!("tracked {} frames", n);

        let mut teams = TeamAssigner::new(self.config.team.clone());
        for (frame, players) in frames.iter().zip(&tracks.players) {
            cancel.check()?;
            if teams.assign_team_color(frame, players) {
                break;
            }
        }

        if !teams.is_seeded() {
            warn!("no frame has two usable player crops, teams left unassigned");
        }

        let share = self.config.pipeline.team_stage_share as usize;
        for (idx, frame) in frames.iter().enumerate() {
            cancel.check()?;
            for (&id, player) in tracks.players[idx].iter_mut() {
                let team = teams.get_player_team(frame, &player.bbox, id);
                player.team = team;
                player.team_color = team.and_then(|t| teams.team_color(t));
            }

            progress.report(((idx + 1) * share / n) as u8);
        }

        let possession = PossessionAssigner::new(&self.config.possession);
        let mut team_ball_control = Vec::with_capacity(n);
        for idx in 0..n {
            cancel.check()?;

            let holder = tracks
                .ball_bbox(idx)
                .copied()
                .and_then(|ball| possession.assign_ball_to_player(&tracks.players[idx], &ball));

            let team = match holder.and_then(|id| tracks.players[idx].get_mut(&id)) {
                Some(player) => {
                    player.has_ball = true;
                    player.team
                }
                None => None,
            };

            team_ball_control.push(team);
        }

        let analysis = Analysis {
            tracks,
            team_ball_control,
            team_colors: teams.team_colors().copied(),
        };

        match analysis.possession_stats() {
            Some(stats) => info!(
                "ball control: team 1 {:.1}%, team 2 {:.1}%",
                stats.team1, stats.team2
            ),
            None => info!("ball control: no frame with a ball holder"),
        }

        progress.report(100);

        Ok(analysis)
    }

    /// Runs detection (or cache lookup) and analysis on a dedicated worker.
    pub fn spawn(self, frames: Vec<Frame>, source: DetectionSource) -> Result<AnalysisHandle> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let worker = std::thread::Builder::new()
            .name("pitchtrack-analysis".to_string())
            .spawn(move || self.run_worker(frames, source, &token, tx))?;

        Ok(AnalysisHandle {
            progress: rx,
            cancel,
            worker,
        })
    }

    fn run_worker(
        &self,
        frames: Vec<Frame>,
        source: DetectionSource,
        cancel: &CancelToken,
        tx: Sender<u8>,
    ) -> Result<Analysis> {
        let detections = self.detections(&frames, source, cancel)?;
        cancel.check()?;

        // a dropped receiver only means nobody is watching
        self.run(&frames, &detections, cancel, |pct| {
            let _ = tx.send(pct);
        })
    }
}

/// Running analysis on a worker thread.
pub struct AnalysisHandle {
    progress: Receiver<u8>,
    cancel: CancelToken,
    worker: JoinHandle<Result<Analysis>>,
}

impl AnalysisHandle {
    /// Blocking iterator over progress percentages; ends when the worker is done.
    pub fn progress(&self) -> crossbeam_channel::Iter<'_, u8> {
        self.progress.iter()
    }

    #[inline]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[inline]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn join(self) -> Result<Analysis> {
        self.worker.join().map_err(|_| Error::WorkerPanicked)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_strictly_increasing() {
        let mut seen = Vec::new();
        {
            let mut progress = Progress::new(|p| seen.push(p));
            for p in [0, 0, 10, 5, 10, 45, 90, 120] {
                progress.report(p);
            }
        }

        assert_eq!(seen, vec![0, 10, 45, 90, 100]);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();

        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let pipeline = Pipeline::new(Config::default()).unwrap();

        assert!(matches!(
            pipeline.run(&[], &[], &CancelToken::new(), |_| {}),
            Err(Error::EmptyInput)
        ));
    }
}
