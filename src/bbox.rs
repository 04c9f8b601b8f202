use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Left-top-width-height box, normally in `[0, 1]` frame-relative units.
///
/// Degenerate boxes (`w <= 0` or `h <= 0`) are allowed and simply have zero area.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BBox {
    #[inline]
    pub fn ltwh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
        }
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    #[inline]
    pub fn centroid(&self) -> na::Point2<f32> {
        na::Point2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Width over height, `None` when the height is not positive.
    #[inline]
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.h <= 0.0 {
            None
        } else {
            Some(self.w / self.h)
        }
    }

    pub fn iou(&self, other: &BBox) -> f32 {
        let iw = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let ih = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        let inter = iw * ih;

        if inter <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }

        inter / union
    }

    #[inline]
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            w: self.w * sx,
            h: self.h * sy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_clamps_negative_sides() {
        assert_eq!(BBox::ltwh(0.1, 0.1, -0.2, 0.5).area(), 0.0);
        assert!((BBox::ltwh(0.0, 0.0, 0.2, 0.5).area() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn centroid_is_box_center() {
        let c = BBox::ltwh(0.2, 0.4, 0.2, 0.4).centroid();
        assert!((c.x - 0.3).abs() < 1e-6);
        assert!((c.y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn iou_properties() {
        let a = BBox::ltwh(0.1, 0.1, 0.3, 0.4);
        let b = BBox::ltwh(0.2, 0.2, 0.3, 0.4);
        let far = BBox::ltwh(0.7, 0.7, 0.1, 0.1);

        assert_eq!(a.iou(&b), b.iou(&a));
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&far), 0.0);

        let iou = a.iou(&b);
        assert!(iou > 0.0 && iou < 1.0);

        // intersection 0.2 x 0.3 = 0.06, union 0.12 + 0.12 - 0.06 = 0.18
        assert!((iou - 0.06 / 0.18).abs() < 1e-5);
    }

    #[test]
    fn iou_of_touching_or_degenerate_boxes_is_zero() {
        let a = BBox::ltwh(0.0, 0.0, 0.5, 0.5);
        let touching = BBox::ltwh(0.5, 0.0, 0.5, 0.5);
        let flat = BBox::ltwh(0.1, 0.1, 0.3, 0.0);

        assert_eq!(a.iou(&touching), 0.0);
        assert_eq!(a.iou(&flat), 0.0);
        assert_eq!(flat.iou(&flat), 0.0);
    }

    #[test]
    fn ltrb_and_aspect_ratio() {
        let b = BBox::ltrb(0.1, 0.2, 0.3, 0.6);
        assert!((b.w - 0.2).abs() < 1e-6);
        assert!((b.h - 0.4).abs() < 1e-6);
        assert!((b.aspect_ratio().unwrap() - 0.5).abs() < 1e-5);
        assert_eq!(BBox::ltwh(0.0, 0.0, 0.1, 0.0).aspect_ratio(), None);
    }
}
