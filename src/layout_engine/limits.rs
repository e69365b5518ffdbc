//! Size and position clamps for floating windows.
//!
//! Everything here is a pure function of rectangles and limits so that the
//! layout policies can chain them in whichever order a trigger needs.

use crate::common::config::FloatingSettings;
use crate::layout_engine::avoid::AvoidPosType;
use crate::model::geometry::vp;
use crate::model::{DragType, Rect, WindowLimits, WindowType};

const RATIO_EPSILON: f32 = 1e-6;

/// Where the launcher dock sits on its display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DockShowState {
    #[default]
    NotShown,
    Bottom,
    Left,
    Right,
}

pub fn dock_show_state(dock: &Rect, display: &Rect) -> DockShowState {
    let local = dock.translate(-display.x, -display.y);
    if local.w > local.h {
        if local.bottom() == display.h as i32 {
            DockShowState::Bottom
        } else {
            DockShowState::NotShown
        }
    } else if local.x == 0 {
        DockShowState::Left
    } else if local.right() == display.w as i32 {
        DockShowState::Right
    } else {
        DockShowState::NotShown
    }
}

/// Range the title bar of a main floating window may occupy.
///
/// `min_x_edge` bounds the window's right edge, the others bound its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionBounds {
    pub min_x_edge: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl PositionBounds {
    pub fn new(limit: &Rect, title_bar: u32, dock: Option<(DockShowState, Rect)>) -> Self {
        let th = title_bar as i32;
        let mut bounds = PositionBounds {
            min_x_edge: limit.x + th,
            max_x: limit.right() - th,
            min_y: limit.y,
            max_y: limit.bottom() - th,
        };
        match dock {
            Some((DockShowState::Bottom, dock)) => bounds.max_y = dock.y - th,
            Some((DockShowState::Left, dock)) => bounds.min_x_edge = dock.right() + th,
            Some((DockShowState::Right, dock)) => bounds.max_x = dock.x - th,
            _ => {}
        }
        bounds
    }
}

/// Limits imposed by the system on every floating window of a display.
pub fn system_size_limits(
    window_type: WindowType,
    display: &Rect,
    vpr: f32,
    settings: &FloatingSettings,
) -> WindowLimits {
    let max = vp(settings.max_floating_size, vpr);
    let (mut min_w, mut min_h) = (
        vp(settings.min_vertical_floating_width, vpr),
        vp(settings.min_vertical_floating_height, vpr),
    );
    if display.is_landscape() {
        std::mem::swap(&mut min_w, &mut min_h);
    }
    if window_type == WindowType::FloatCamera {
        let short_side = display.w.min(display.h);
        let fraction = if display.is_landscape() { 0.5 } else { 0.3 };
        min_w = (short_side as f32 * fraction) as u32;
        min_h = 0;
    }
    WindowLimits {
        max_width: max,
        max_height: max,
        min_width: min_w,
        min_height: min_h,
        max_ratio: f32::MAX,
        min_ratio: 0.0,
    }
}

fn scaled(value: u32, vpr: f32) -> u32 { (value as f32 * vpr).min(u32::MAX as f32) as u32 }

/// Narrows the system limits by the application's own limits.
///
/// An application value only applies when it lies inside the system range,
/// and the size bounds are then re-derived from the resulting ratios.
pub fn merge_size_limits(system: &WindowLimits, custom: &WindowLimits, vpr: f32) -> WindowLimits {
    let mut out = *system;
    let max_w = scaled(custom.max_width, vpr);
    let max_h = scaled(custom.max_height, vpr);
    let min_w = scaled(custom.min_width, vpr);
    let min_h = scaled(custom.min_height, vpr);

    if (system.min_width..=system.max_width).contains(&max_w) {
        out.max_width = max_w;
    }
    if (system.min_height..=system.max_height).contains(&max_h) {
        out.max_height = max_h;
    }
    if (system.min_width..=out.max_width).contains(&min_w) {
        out.min_width = min_w;
    }
    if (system.min_height..=out.max_height).contains(&min_h) {
        out.min_height = min_h;
    }

    out.max_ratio = ratio(out.max_width, out.min_height);
    out.min_ratio = ratio(out.min_width, out.max_height);
    if out.min_ratio <= custom.max_ratio && custom.max_ratio <= out.max_ratio {
        out.max_ratio = custom.max_ratio;
    }
    if out.min_ratio <= custom.min_ratio && custom.min_ratio <= out.max_ratio {
        out.min_ratio = custom.min_ratio;
    }

    out.max_width = out.max_width.min(mul(out.max_height, out.max_ratio));
    out.min_width = out.min_width.max(mul(out.min_height, out.min_ratio));
    out.max_height = out.max_height.min(div(out.max_width, out.min_ratio));
    out.min_height = out.min_height.max(div(out.min_width, out.max_ratio));
    out
}

fn ratio(w: u32, h: u32) -> f32 { if h == 0 { f32::MAX } else { w as f32 / h as f32 } }

fn mul(value: u32, ratio: f32) -> u32 { (value as f32 * ratio).min(u32::MAX as f32) as u32 }

fn div(value: u32, ratio: f32) -> u32 {
    if ratio.abs() < RATIO_EPSILON {
        return u32::MAX;
    }
    (value as f32 / ratio).min(u32::MAX as f32) as u32
}

/// Clamps the size to `limits`, then fixes the aspect ratio.
///
/// `apply_min` is false for system windows, which only get a maximum.
/// `fix_ratio` is only set for main floating windows.
pub fn limit_size_by_limits(
    rect: Rect,
    limits: &WindowLimits,
    apply_min: bool,
    fix_ratio: bool,
    drag: DragType,
) -> Rect {
    let mut out = rect;
    if apply_min {
        out.w = out.w.max(limits.min_width);
        out.h = out.h.max(limits.min_height);
    }
    out.w = out.w.min(limits.max_width);
    out.h = out.h.min(limits.max_height);
    if out.is_degenerate() || !fix_ratio {
        return out;
    }

    let cur = out.w as f32 / out.h as f32;
    let within = cur >= limits.min_ratio - RATIO_EPSILON && cur <= limits.max_ratio + RATIO_EPSILON;
    if within {
        return out;
    }
    let new_ratio = if cur < limits.min_ratio { limits.min_ratio } else { limits.max_ratio };
    if new_ratio.abs() < RATIO_EPSILON {
        return out;
    }
    if limits.max_width == limits.min_width {
        out.h = (out.w as f32 / new_ratio) as u32;
    } else if limits.max_height == limits.min_height {
        out.w = (out.h as f32 * new_ratio) as u32;
    } else if drag == DragType::BottomOrTop {
        out.w = (out.h as f32 * new_ratio) as u32;
    } else {
        out.h = (out.w as f32 / new_ratio) as u32;
    }
    out
}

/// Keeps the proportions of `origin` while a stretchable window is dragged.
pub fn keep_stretch_ratio(rect: Rect, origin: &Rect, drag: DragType) -> Rect {
    if origin.is_degenerate() {
        return rect;
    }
    let mut out = rect;
    match drag {
        DragType::BottomOrTop => {
            out.w = (out.h as f32 * origin.w as f32 / origin.h as f32) as u32;
        }
        DragType::LeftOrRight | DragType::LeftTopCorner | DragType::RightTopCorner => {
            out.h = (out.w as f32 * origin.h as f32 / origin.w as f32) as u32;
        }
        DragType::Undefined => {}
    }
    out
}

/// After a drag resize was clamped, keeps the edge opposite the grabbed one in
/// place: if the origin moved relative to `last`, the far edge of `requested`
/// stays fixed.
pub fn anchor_drag_edges(limited: Rect, requested: &Rect, last: &Rect) -> Rect {
    let mut out = limited;
    if requested.x != last.x {
        out.x = requested.right() - out.w as i32;
    }
    if requested.y != last.y {
        out.y = requested.bottom() - out.h as i32;
    }
    out
}

/// Position clamp while a drag is in progress. The size is only adjusted when
/// the drag actually resized the window relative to `last`.
pub fn limit_position_when_drag(
    rect: Rect,
    requested: &Rect,
    last: &Rect,
    bounds: &PositionBounds,
) -> Rect {
    let mut out = rect;
    let width_changed = requested.w != last.w;
    let height_changed = requested.h != last.h;

    if out.right() < bounds.min_x_edge {
        if width_changed {
            out.w = (bounds.min_x_edge - out.x).max(1) as u32;
        } else {
            out.x = bounds.min_x_edge - out.w as i32;
        }
    }
    if out.x > bounds.max_x {
        if width_changed {
            out.w = (out.right() - bounds.max_x).max(1) as u32;
        }
        out.x = bounds.max_x;
    }
    if out.y < bounds.min_y {
        if height_changed {
            out.h = (out.bottom() - bounds.min_y).max(1) as u32;
        }
        out.y = bounds.min_y;
    }
    if out.y > bounds.max_y {
        out.y = bounds.max_y;
    }
    out
}

/// When a drag pinned the window against a limit edge, the clamp above may
/// have broken the aspect ratio; recompute the free dimension from it.
pub fn fix_size_by_ratio_at_limit_edges(
    rect: Rect,
    limits: &WindowLimits,
    bounds: &PositionBounds,
) -> Rect {
    let mut out = rect;
    if out.is_degenerate()
        || (limits.max_width == limits.min_width && limits.max_height == limits.min_height)
    {
        return out;
    }
    let cur = out.w as f32 / out.h as f32;
    if cur >= limits.min_ratio - RATIO_EPSILON && cur <= limits.max_ratio + RATIO_EPSILON {
        return out;
    }
    let new_ratio = if cur < limits.min_ratio { limits.min_ratio } else { limits.max_ratio };
    if new_ratio.abs() < RATIO_EPSILON {
        return out;
    }
    if out.right() == bounds.min_x_edge || out.x == bounds.max_x {
        if limits.max_height == limits.min_height {
            return out;
        }
        out.h = (out.w as f32 / new_ratio) as u32;
    }
    if out.y == bounds.min_y || out.y == bounds.max_y {
        if limits.max_width == limits.min_width {
            return out;
        }
        out.w = (out.h as f32 * new_ratio) as u32;
    }
    out
}

/// Position clamp for initial placement and programmatic moves: the title
/// bar must stay inside the limit rect vertically and keep at least its own
/// height of overlap horizontally.
pub fn limit_position_when_init_or_move(rect: Rect, bounds: &PositionBounds) -> Rect {
    let mut out = rect;
    out.y = out.y.max(bounds.min_y).min(bounds.max_y);
    out.x = out.x.max(bounds.min_x_edge - out.w as i32).min(bounds.max_x);
    out
}

/// Pulls a rect back inside `display`, shrinking it if it is larger.
pub fn limit_to_bottom_right_corner(rect: Rect, display: &Rect) -> Rect {
    let mut out = rect;
    out.x = out.x.max(display.x);
    out.y = out.y.max(display.y);
    out.w = out.w.min(display.w);
    out.h = out.h.min(display.h);
    if out.right() > display.right() {
        out.x = display.right() - out.w as i32;
    }
    if out.bottom() > display.bottom() {
        out.y = display.bottom() - out.h as i32;
    }
    out
}

/// Fits `rect` inside `bounds`, shrinking first and then moving.
pub fn clamp_into(rect: Rect, bounds: &Rect) -> Rect {
    let mut out = rect;
    out.w = out.w.min(bounds.w);
    out.h = out.h.min(bounds.h);
    out.x = out.x.max(bounds.x).min(bounds.right() - out.w as i32);
    out.y = out.y.max(bounds.y).min(bounds.bottom() - out.h as i32);
    out
}

/// Removes the strip covered by a system bar from `limit`.
pub fn shrink_limit_rect(limit: Rect, bar: &Rect, pos: AvoidPosType) -> Rect {
    let mut out = limit;
    let (mut w, mut h) = (limit.w as i32, limit.h as i32);
    match pos {
        AvoidPosType::Top => {
            let offset = (bar.bottom() - limit.y).max(0);
            out.y += offset;
            h -= offset;
        }
        AvoidPosType::Bottom => h -= (limit.bottom() - bar.y).max(0),
        AvoidPosType::Left => {
            let offset = (bar.right() - limit.x).max(0);
            out.x += offset;
            w -= offset;
        }
        AvoidPosType::Right => w -= (limit.right() - bar.x).max(0),
    }
    out.w = w.max(0) as u32;
    out.h = h.max(0) as u32;
    out
}
