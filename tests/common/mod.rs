#![allow(dead_code)]

use image::{Rgb, RgbImage};
use pitchtrack::{BBox, Detection, Frame, ObjectClass};

pub const PITCH: Rgb<u8> = Rgb([30, 140, 40]);
pub const RED: Rgb<u8> = Rgb([220, 20, 20]);
pub const BLUE: Rgb<u8> = Rgb([20, 30, 210]);

pub const WIDTH: u32 = 160;
pub const HEIGHT: u32 = 100;

/// Paints a 20x40 player at (x, y) whose crop corners stay on the pitch.
pub fn paint_player(img: &mut RgbImage, x: u32, y: u32, jersey: Rgb<u8>) -> Detection {
    for py in y + 2..y + 20 {
        for px in x + 5..x + 15 {
            img.put_pixel(px, py, jersey);
        }
    }

    Detection::new(
        BBox::ltrb(x as f32, y as f32, (x + 20) as f32, (y + 40) as f32),
        ObjectClass::Player,
        0.9,
    )
}

/// Ball centered a couple of pixels below the middle of the feet of a player at x.
pub fn ball_at(x: u32) -> Detection {
    let x = x as f32;
    Detection::new(BBox::ltrb(x + 7.0, 59.0, x + 13.0, 65.0), ObjectClass::Ball, 0.7)
}

pub fn red_x(frame: usize) -> u32 {
    10 + 2 * frame as u32
}

pub const BLUE_X: u32 = 130;

/// A red player running right next to the ball and a static blue player.
///
/// The ball is only detected on the frames listed in `ball_frames`.
pub fn clip(n: usize, ball_frames: &[usize]) -> (Vec<Frame>, Vec<Vec<Detection>>) {
    let mut frames = Vec::with_capacity(n);
    let mut detections = Vec::with_capacity(n);

    for i in 0..n {
        let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, PITCH);
        let mut dets = vec![
            paint_player(&mut img, red_x(i), 20, RED),
            paint_player(&mut img, BLUE_X, 20, BLUE),
        ];
        dets.push(Detection::new(
            BBox::ltrb(70.0, 10.0, 80.0, 40.0),
            ObjectClass::Referee,
            0.8,
        ));

        if ball_frames.contains(&i) {
            dets.push(ball_at(red_x(i)));
        }

        frames.push(Frame::new(i, img));
        detections.push(dets);
    }

    (frames, detections)
}
