//! Normalized box geometry for the two label encodings.

use serde::Serialize;

/// Tolerance used when absorbing floating rounding at the unit boundary.
pub const UNIT_EPSILON: f64 = 1e-6;

/// A normalized 2D point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An axis-aligned box in center/size form (the rectangle encoding).
///
/// Construction does not enforce positive sizes or unit-range values; the
/// codec only checks structure.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RectBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl RectBox {
    #[inline]
    pub fn new(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self { cx, cy, w, h }
    }

    /// Derives the four corners of the box without introducing any rotation.
    ///
    /// Corners are ordered top-left, top-right, bottom-right, bottom-left so
    /// that edge 1-2 is the top edge.
    pub fn to_oriented(&self) -> OrientedBox {
        let half_w = self.w / 2.0;
        let half_h = self.h / 2.0;
        OrientedBox::new([
            Point::new(self.cx - half_w, self.cy - half_h),
            Point::new(self.cx + half_w, self.cy - half_h),
            Point::new(self.cx + half_w, self.cy + half_h),
            Point::new(self.cx - half_w, self.cy + half_h),
        ])
    }
}

/// A quadrilateral given by four corners (the oriented encoding).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OrientedBox {
    pub corners: [Point; 4],
}

impl OrientedBox {
    #[inline]
    pub fn new(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    /// Length of the first edge (corner 1 to corner 2).
    pub fn width(&self) -> f64 {
        self.corners[0].distance(&self.corners[1])
    }

    /// Length of the second edge (corner 2 to corner 3).
    pub fn height(&self) -> f64 {
        self.corners[1].distance(&self.corners[2])
    }

    /// Clamps coordinates that sit within `epsilon` of the unit interval.
    ///
    /// Coordinates further out are left untouched; the returned flag is true
    /// when at least one such coordinate was found.
    pub fn clamp_to_unit(&self, epsilon: f64) -> (OrientedBox, bool) {
        let mut out_of_range = false;
        let mut clamp = |value: f64| {
            if (-epsilon..=1.0 + epsilon).contains(&value) {
                value.clamp(0.0, 1.0)
            } else {
                out_of_range = true;
                value
            }
        };

        let mut corners = self.corners;
        for corner in &mut corners {
            corner.x = clamp(corner.x);
            corner.y = clamp(corner.y);
        }
        (OrientedBox::new(corners), out_of_range)
    }
}
