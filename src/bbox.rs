use nalgebra as na;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

pub trait BBoxFormat: fmt::Debug + Copy + PartialEq {}

/// Left-top-width-height format, contains left top corner and width-height
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

/// Axis-aligned box in frame pixel coordinates, tagged with its layout.
///
/// On the wire every format is a plain `[f32; 4]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> Serialize for BBox<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, F: BBoxFormat> Deserialize<'de> for BBox<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[f32; 4]>::deserialize(deserializer).map(|raw| BBox(raw, PhantomData))
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    // Use carefully when you REALLY sure that slice have needed format
    #[inline(always)]
    pub fn assigned(slice: &[f32; 4]) -> Self {
        BBox(*slice, PhantomData)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], PhantomData)
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline]
    pub fn as_xywh(&self) -> BBox<Xywh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        (self.width().max(0.0)) * (self.height().max(0.0))
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(
            (self.0[0] + self.0[2]) / 2.0,
            (self.0[1] + self.0[3]) / 2.0,
        )
    }

    #[inline]
    pub fn bottom_center(&self) -> na::Point2<f32> {
        na::Point2::new((self.0[0] + self.0[2]) / 2.0, self.0[3])
    }

    #[inline]
    pub fn bottom_left(&self) -> na::Point2<f32> {
        na::Point2::new(self.0[0], self.0[3])
    }

    #[inline]
    pub fn bottom_right(&self) -> na::Point2<f32> {
        na::Point2::new(self.0[2], self.0[3])
    }

    /// Point of the box (border included) closest to `p`.
    #[inline]
    pub fn nearest_point(&self, p: &na::Point2<f32>) -> na::Point2<f32> {
        na::Point2::new(
            p.x.clamp(self.left().min(self.right()), self.right().max(self.left())),
            p.y.clamp(self.top().min(self.bottom()), self.bottom().max(self.top())),
        )
    }

    pub fn iou(&self, other: &Self) -> f32 {
        let iwidth = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let iheight = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let iarea = iwidth * iheight;

        let union = self.area() + other.area() - iarea;

        if union <= 0.0 {
            return 0.0;
        }

        iarea / union
    }

    /// Coordinate-wise linear blend, `t = 0` gives `self`, `t = 1` gives `other`.
    #[inline]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let mut out = [0.0; 4];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.0[i] + (other.0[i] - self.0[i]) * t;
        }

        BBox(out, PhantomData)
    }

    /// Intersection with the `[0, width] x [0, height]` raster.
    pub fn clip(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);

        Self::ltrb(
            self.left().clamp(0.0, w),
            self.top().clamp(0.0, h),
            self.right().clamp(0.0, w),
            self.bottom().clamp(0.0, h),
        )
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], PhantomData)
    }

    #[inline(always)]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] + v.0[0], v.0[3] + v.0[1]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        Self(
            [
                v.0[0] - v.0[2] / 2.0,
                v.0[1] - v.0[3] / 2.0,
                v.0[0] + v.0[2] / 2.0,
                v.0[1] + v.0[3] / 2.0,
            ],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xywh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [
                (v.0[0] + v.0[2]) / 2.0,
                (v.0[1] + v.0[3]) / 2.0,
                v.0[2] - v.0[0],
                v.0[3] - v.0[1],
            ],
            PhantomData,
        )
    }
}
