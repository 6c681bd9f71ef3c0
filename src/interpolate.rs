//! Gap filling for the ball channel.
//!
//! Each box coordinate is treated as an independent signal. Interior gaps are
//! filled linearly between the two bounding detections, leading and trailing
//! gaps hold the nearest detection.

use tracing::debug;

use crate::track::BallObservation;

pub fn interpolate_ball_positions(ball: &[Option<BallObservation>]) -> Vec<Option<BallObservation>> {
    let known: Vec<usize> = ball
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.map(|_| i))
        .collect();

    let (first, last) = match (known.first(), known.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return ball.to_vec(),
    };

    let mut out = Vec::with_capacity(ball.len());
    let mut filled = 0usize;
    // index into `known` of the next detection at or after the current frame
    let mut next = 0usize;

    for (i, obs) in ball.iter().enumerate() {
        if let Some(obs) = obs {
            out.push(Some(*obs));
            next += 1;
            continue;
        }

        let bbox = if i < first {
            ball[first].map(|b| b.bbox)
        } else if i > last {
            ball[last].map(|b| b.bbox)
        } else {
            let (p, n) = (known[next - 1], known[next]);
            let t = (i - p) as f32 / (n - p) as f32;

            match (ball[p], ball[n]) {
                (Some(a), Some(b)) => Some(a.bbox.lerp(&b.bbox, t)),
                _ => None,
            }
        };

        filled += 1;
        out.push(bbox.map(|bbox| BallObservation {
            bbox,
            interpolated: true,
        }));
    }

    debug!(
        "ball interpolation: {} detected, {} filled over {} frames",
        known.len(),
        filled,
        ball.len()
    );

    out
}
