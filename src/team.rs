use ndarray::{Array1, Array2};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::bbox::{BBox, Ltrb};
use crate::cluster::KMeans2;
use crate::config::TeamConfig;
use crate::frame::Frame;
use crate::store::Players;
use crate::track::{Color, Team, TrackId};

/// Team given to a first-seen player whose crop is unusable.
pub const DEFAULT_TEAM: Team = Team::One;

/// Splits players into two teams by jersey color.
///
/// Centroids come from a single seed frame; afterwards every identity is
/// classified once and the answer is cached for the rest of the clip.
#[derive(Debug, Clone)]
pub struct TeamAssigner {
    config: TeamConfig,
    model: Option<KMeans2>,
    team_colors: Option<[Color; 2]>,
    player_teams: HashMap<TrackId, Team>,
}

impl TeamAssigner {
    pub fn new(config: TeamConfig) -> Self {
        Self {
            config,
            model: None,
            team_colors: None,
            player_teams: HashMap::new(),
        }
    }

    #[inline]
    pub fn team_colors(&self) -> Option<&[Color; 2]> {
        self.team_colors.as_ref()
    }

    #[inline]
    pub fn team_color(&self, team: Team) -> Option<Color> {
        self.team_colors.map(|c| c[team.index()])
    }

    #[inline]
    pub fn is_seeded(&self) -> bool {
        self.model.is_some()
    }

    #[inline]
    pub fn cached_team(&self, player_id: TrackId) -> Option<Team> {
        self.player_teams.get(&player_id).copied()
    }

    /// Jersey color of the player under `bbox`.
    ///
    /// The upper half of the crop is split into two color clusters; the one
    /// holding most of the four corner pixels is taken as background and the
    /// other centroid is returned. `None` for crops below `min_crop_size`.
    pub fn player_color(&self, frame: &Frame, bbox: &BBox<Ltrb>) -> Option<Color> {
        let crop = frame.crop(bbox)?;
        let (w, h) = crop.dimensions();
        let min = self.config.min_crop_size.max(1);
        if w < min || h < min {
            return None;
        }

        let th = (h / 2).max(1);
        let (wu, thu) = (w as usize, th as usize);

        let mut pixels = Array2::<f32>::zeros((wu * thu, 3));
        for y in 0..th {
            for x in 0..w {
                let p = crop.get_pixel(x, y);
                let mut row = pixels.row_mut(y as usize * wu + x as usize);
                row[0] = p[0] as f32;
                row[1] = p[1] as f32;
                row[2] = p[2] as f32;
            }
        }

        let model = KMeans2::fit(pixels.view(), self.config.max_iterations)?;

        let corners = [0, wu - 1, (thu - 1) * wu, thu * wu - 1];
        let background_votes = corners.iter().filter(|&&i| model.labels[i] == 1).count();
        // ties keep cluster 0 as background
        let background = if background_votes > 2 { 1 } else { 0 };
        let jersey = model.centroid(1 - background);

        Some([jersey[0], jersey[1], jersey[2]])
    }

    /// Fits the two team centroids from the players of a seed frame.
    ///
    /// Returns `false`, leaving the assigner unseeded, when fewer than two
    /// players yield a usable color. A successful call resets the per-player
    /// cache.
    pub fn assign_team_color(&mut self, frame: &Frame, players: &Players) -> bool {
        let colors: Vec<Color> = players
            .values()
            .filter_map(|p| self.player_color(frame, &p.bbox))
            .collect();

        if colors.len() < 2 {
            debug!(
                "frame {}: only {} usable player colors, cannot seed teams",
                frame.index,
                colors.len()
            );
            return false;
        }

        let flat: Vec<f32> = colors.iter().flatten().copied().collect();
        let samples = match Array2::from_shape_vec((colors.len(), 3), flat) {
            Ok(samples) => samples,
            Err(_) => return false,
        };

        let model = match KMeans2::fit(samples.view(), self.config.max_iterations) {
            Some(model) => model,
            None => return false,
        };

        let c0 = model.centroid(0);
        let c1 = model.centroid(1);
        let team_colors = [[c0[0], c0[1], c0[2]], [c1[0], c1[1], c1[2]]];

        info!(
            "seeded teams from frame {} with {} players: team 1 {:?}, team 2 {:?}",
            frame.index,
            colors.len(),
            team_colors[0],
            team_colors[1]
        );

        self.team_colors = Some(team_colors);
        self.model = Some(model);
        self.player_teams.clear();

        true
    }

    /// Team of `player_id`, classified against the seed centroids on first
    /// sight and served from the cache afterwards.
    ///
    /// A first sight with an unusable crop yields [`DEFAULT_TEAM`] without
    /// caching it. `None` only while the assigner is unseeded.
    pub fn get_player_team(
        &mut self,
        frame: &Frame,
        bbox: &BBox<Ltrb>,
        player_id: TrackId,
    ) -> Option<Team> {
        if let Some(team) = self.player_teams.get(&player_id) {
            return Some(*team);
        }

        let model = self.model.as_ref()?;

        let color = match self.player_color(frame, bbox) {
            Some(color) => color,
            None => {
                debug!(
                    "frame {}: degenerate crop for player {}, using {}",
                    frame.index, player_id, DEFAULT_TEAM
                );
                return Some(DEFAULT_TEAM);
            }
        };

        let team = Team::from_index(model.predict(Array1::from_vec(color.to_vec()).view()))
            .unwrap_or(DEFAULT_TEAM);

        self.player_teams.insert(player_id, team);

        Some(team)
    }
}
