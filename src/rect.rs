//! Axis-aligned rectangles.
//!
//! [`Rect`] is used for hand regions in every coordinate space, so it uses `f32` coordinates and
//! allows negative positions (a padded hand region may extend past the frame's edges).

use std::fmt;

use itertools::{Itertools, MinMaxResult};

use crate::coords::Point;
use crate::num::TotalF32;

/// Padding added to every side of the landmark extent by [`points_to_rect`].
pub const HAND_RECT_MARGIN: f32 = 20.0;

/// An axis-aligned rectangle.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        assert!(
            width >= 0.0 && height >= 0.0,
            "negative rectangle size {}x{}",
            width,
            height
        );
        Self {
            x: top_left_x,
            y: top_left_y,
            width,
            height,
        }
    }

    /// Creates a rectangle extending outwards from a center point.
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self::from_top_left(
            x_center - width * 0.5,
            y_center - height * 0.5,
            width,
            height,
        )
    }

    /// Creates a rectangle from two opposing corner points.
    pub fn from_corners(top_left: Point, bottom_right: Point) -> Self {
        Self::span_inner(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
    }

    /// Computes the (axis-aligned) bounding rectangle that encompasses `points`.
    ///
    /// Returns [`None`] if `points` is empty, or if the extent of `points` is not finite.
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let (x_min, x_max) = extent(points.iter().map(|p| p.x))?;
        let (y_min, y_max) = extent(points.iter().map(|p| p.y))?;
        if ![x_min, y_min, x_max - x_min, y_max - y_min]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }
        Some(Self::span_inner(x_min, y_min, x_max, y_max))
    }

    fn span_inner(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        assert!(x_min <= x_max, "x_min={}, x_max={}", x_min, x_max);
        assert!(y_min <= y_max, "y_min={}, y_max={}", y_min, y_max);
        Self::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min)
    }

    /// Grows each side of this rectangle by adding a margin.
    ///
    /// # Panics
    ///
    /// This method will panic if the resulting width or height would be less than 0.
    #[must_use]
    pub fn grow_sides(&self, left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self::from_top_left(
            self.x - left,
            self.y - top,
            self.width + left + right,
            self.height + top + bottom,
        )
    }

    /// Grows every side of this rectangle by `margin`.
    #[must_use]
    pub fn grow(&self, margin: f32) -> Self {
        self.grow_sides(margin, margin, margin, margin)
    }

    /// Scales positions and sizes along each axis, mapping the rectangle into another space.
    #[must_use]
    pub fn scale_axes(&self, sx: f32, sy: f32) -> Self {
        Self::from_top_left(
            self.x * sx,
            self.y * sy,
            self.width * sx,
            self.height * sy,
        )
    }

    #[must_use]
    pub fn move_by(&self, x: f32, y: f32) -> Self {
        Self {
            x: self.x + x,
            y: self.y + y,
            ..*self
        }
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Returns the X coordinate of the right side of the rectangle.
    #[inline]
    pub fn x_max(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the Y coordinate of the bottom side of the rectangle.
    #[inline]
    pub fn y_max(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Returns whether this rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains_point(&self, point: Point) -> bool {
        (self.x..=self.x_max()).contains(&point.x) && (self.y..=self.y_max()).contains(&point.y)
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns `None` when the rectangles do not overlap, or only touch along an edge.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x.max(other.x);
        let y_min = self.y.max(other.y);
        let x_max = self.x_max().min(other.x_max());
        let y_max = self.y_max().min(other.y_max());
        if x_min >= x_max || y_min >= y_max {
            return None;
        }
        Some(Self::span_inner(x_min, y_min, x_max, y_max))
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})-({},{})/{}x{}",
            self.x,
            self.y,
            self.x_max(),
            self.y_max(),
            self.width,
            self.height
        )
    }
}

fn extent(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    match values.map(TotalF32).minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v.0, v.0)),
        MinMaxResult::MinMax(min, max) => Some((min.0, max.0)),
    }
}

/// Computes the bounding rectangle of `points`, grown by `margin` on every side.
///
/// The result is `[min_x - margin, min_y - margin, (max_x - min_x) + 2 * margin,
/// (max_y - min_y) + 2 * margin]`. An empty point list, or points without a finite extent, yield
/// [`Rect::ZERO`].
pub fn points_to_rect(points: &[Point], margin: f32) -> Rect {
    match Rect::bounding(points) {
        Some(rect) => rect.grow(margin),
        None => Rect::ZERO,
    }
}
