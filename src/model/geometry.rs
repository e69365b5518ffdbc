//! Integer pixel geometry shared by the window tree and the layout policies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in display pixels.
///
/// The origin may be negative (windows are allowed to hang off the left or
/// top edge of a display); the size never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0, y: 0, w: 0, h: 0 };

    /// Largest distance from the origin any edge of an accepted rect may have.
    pub const MAX_COORD: i32 = 1 << 24;

    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self { Rect { x, y, w, h } }

    /// All four fields are zero. Used as "not yet requested".
    pub fn is_empty(&self) -> bool { *self == Rect::ZERO }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool { self.w == 0 || self.h == 0 }

    pub fn right(&self) -> i32 { self.x.saturating_add_unsigned(self.w) }

    pub fn bottom(&self) -> i32 { self.y.saturating_add_unsigned(self.h) }

    /// Every edge lies within [`Rect::MAX_COORD`] of the origin, so sums of a
    /// few such rects cannot overflow.
    pub fn is_in_range(&self) -> bool {
        let span = -Rect::MAX_COORD..=Rect::MAX_COORD;
        span.contains(&self.x)
            && span.contains(&self.y)
            && span.contains(&self.right())
            && span.contains(&self.bottom())
    }

    pub fn is_landscape(&self) -> bool { self.w > self.h }

    pub fn area(&self) -> u64 { self.w as u64 * self.h as u64 }

    /// Boundary-inclusive containment.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        (self.x..=self.right()).contains(&x) && (self.y..=self.bottom()).contains(&y)
    }

    pub fn has_overlap(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Overlapping region, or [`Rect::ZERO`] when the two do not overlap.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return Rect::ZERO;
        }
        Rect::new(x, y, right.abs_diff(x), bottom.abs_diff(y))
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Grows the rect by `dx` on the left and right and `dy` on the top and bottom.
    pub fn expand(&self, dx: u32, dy: u32) -> Rect {
        Rect {
            x: self.x.saturating_sub_unsigned(dx),
            y: self.y.saturating_sub_unsigned(dy),
            w: self.w.saturating_add(dx.saturating_mul(2)),
            h: self.h.saturating_add(dy.saturating_mul(2)),
        }
    }

    /// Smallest rect covering both. An empty rect is ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right.abs_diff(x), bottom.abs_diff(y))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x, self.y, self.w, self.h)
    }
}

/// Scales a virtual-pixel length by the display's pixel ratio.
pub fn vp(value: u32, ratio: f32) -> u32 { (value as f32 * ratio) as u32 }
