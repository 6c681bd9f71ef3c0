use image::RgbImage;

use crate::bbox::{BBox, Ltrb};

/// One decoded raster of the clip, tagged with its sequence index.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: RgbImage,
}

impl Frame {
    #[inline]
    pub fn new(index: usize, image: RgbImage) -> Self {
        Self { index, image }
    }

    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Copies out the pixels under `bbox`, clipped to the raster.
    ///
    /// Coordinates are truncated to whole pixels. Returns `None` when nothing
    /// of the box remains.
    pub fn crop(&self, bbox: &BBox<Ltrb>) -> Option<RgbImage> {
        if !bbox.is_finite() {
            return None;
        }

        let (fw, fh) = self.dims();
        let rect = bbox.clip(fw, fh).as_ltwh();

        let x = rect.left() as u32;
        let y = rect.top() as u32;
        let r = (rect.left() + rect.width()) as u32;
        let b = (rect.top() + rect.height()) as u32;

        if r <= x || b <= y {
            return None;
        }

        Some(image::imageops::crop_imm(&self.image, x, y, r - x, b - y).to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_is_clipped_to_raster() {
        let frame = Frame::new(0, RgbImage::from_pixel(20, 10, Rgb([1, 2, 3])));
        let crop = frame.crop(&BBox::ltrb(15.0, -5.0, 40.0, 4.0)).unwrap();

        assert_eq!(crop.dimensions(), (5, 4));
    }

    #[test]
    fn test_crop_outside_raster_is_none() {
        let frame = Frame::new(0, RgbImage::new(20, 10));

        assert!(frame.crop(&BBox::ltrb(30.0, 0.0, 40.0, 5.0)).is_none());
        assert!(frame.crop(&BBox::ltrb(3.0, 3.0, 3.0, 8.0)).is_none());
    }
}
