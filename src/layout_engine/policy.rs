//! State and passes shared by every layout policy.
//!
//! A policy owns a [`PolicyBase`] with the cached per-display limit rects and
//! split geometry; the free functions here run the layout pipeline against
//! it. Policy-specific placement (cascade cursor, tile queue) happens before
//! these passes by rewriting a node's request rect.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::common::config::{LayoutSettings, SplitSettings};
use crate::layout_engine::avoid::AvoidPosType;
use crate::layout_engine::error::{WmError, WmResult};
use crate::layout_engine::events::{Outbox, WmEvent};
use crate::layout_engine::limits::{
    DockShowState, PositionBounds, anchor_drag_edges, clamp_into, dock_show_state,
    fix_size_by_ratio_at_limit_edges, keep_stretch_ratio, limit_position_when_drag,
    limit_position_when_init_or_move, limit_size_by_limits, limit_to_bottom_right_corner,
    merge_size_limits, shrink_limit_rect, system_size_limits,
};
use crate::model::geometry::vp;
use crate::model::{
    DisplayGroup, DisplayId, DisplayInfo, NodeId, Rect, RootType, WindowFlags, WindowId,
    WindowMode, WindowNode, WindowSizeChangeReason, WindowTree, WindowType,
};

/// Everything a policy may read or write during one pass.
pub struct LayoutContext<'a> {
    pub tree: &'a mut WindowTree,
    pub displays: &'a DisplayGroup,
    pub settings: &'a LayoutSettings,
    pub outbox: &'a mut Outbox,
}

impl LayoutContext<'_> {
    pub fn vpr(&self, display: DisplayId) -> f32 { self.displays.vpr(display) }

    pub fn display_rect(&self, display: DisplayId) -> Rect { self.displays.rect(display) }

    pub(crate) fn node_id(&self, id: WindowId) -> WmResult<NodeId> {
        self.tree.find(id).ok_or_else(|| WmError::unknown_window(id))
    }
}

/// Primary and secondary halves of a display plus the divider between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitRects {
    pub primary: Rect,
    pub secondary: Rect,
    pub divider: Rect,
}

impl SplitRects {
    fn is_vertical_divider(&self) -> bool { self.divider.w < self.divider.h }
}

/// The divider was dragged far enough that one half should go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitExit {
    pub display: DisplayId,
    /// Split mode of the half that stays.
    pub keep: WindowMode,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyBase {
    limit_rects: BTreeMap<DisplayId, Rect>,
    split_rects: BTreeMap<DisplayId, SplitRects>,
    split_exit: Option<SplitExit>,
}

impl PolicyBase {
    /// Display rect minus the bars, as of the last full pass.
    pub fn limit_rect(&self, display: DisplayId) -> Option<Rect> {
        self.limit_rects.get(&display).copied()
    }

    /// Union of every display's limit rect.
    pub fn group_limit_rect(&self) -> Rect {
        self.limit_rects.values().fold(Rect::ZERO, |acc, r| acc.union(r))
    }

    pub fn split_rects(&self, display: DisplayId) -> Option<SplitRects> {
        self.split_rects.get(&display).copied()
    }

    pub fn split_rect(&self, display: DisplayId, mode: WindowMode) -> Option<Rect> {
        let rects = self.split_rects.get(&display)?;
        match mode {
            WindowMode::SplitPrimary => Some(rects.primary),
            WindowMode::SplitSecondary => Some(rects.secondary),
            _ => None,
        }
    }

    pub fn take_split_exit(&mut self) -> Option<SplitExit> { self.split_exit.take() }

    pub fn forget_display(&mut self, display: DisplayId) {
        self.limit_rects.remove(&display);
        self.split_rects.remove(&display);
    }

    /// Places the divider at the configured ratio across the display: a
    /// vertical bar on landscape displays, a horizontal one otherwise.
    pub fn init_split_rects(&mut self, info: &DisplayInfo, split: &SplitSettings) {
        let width = vp(split.divider_width, info.virtual_pixel_ratio);
        let rect = info.rect();
        let divider = if info.is_vertical() {
            let y = (rect.h.saturating_sub(width) as f32 * split.split_ratio) as i32;
            Rect::new(rect.x, rect.y + y, rect.w, width)
        } else {
            let x = (rect.w.saturating_sub(width) as f32 * split.split_ratio) as i32;
            Rect::new(rect.x + x, rect.y, width, rect.h)
        };
        self.set_split_rect_by_divider(info.id, &rect, divider);
    }

    /// Derives both split halves from a divider position.
    pub fn set_split_rect_by_divider(&mut self, display_id: DisplayId, rect: &Rect, divider: Rect) {
        let (primary, secondary) = if divider.w < divider.h {
            (
                Rect::new(rect.x, rect.y, (divider.x - rect.x).max(0) as u32, rect.h),
                Rect::new(
                    divider.right(),
                    rect.y,
                    (rect.right() - divider.right()).max(0) as u32,
                    rect.h,
                ),
            )
        } else {
            (
                Rect::new(rect.x, rect.y, rect.w, (divider.y - rect.y).max(0) as u32),
                Rect::new(
                    rect.x,
                    divider.bottom(),
                    rect.w,
                    (rect.bottom() - divider.bottom()).max(0) as u32,
                ),
            )
        };
        trace!(%display_id, %primary, %secondary, %divider, "split rects");
        self.split_rects.insert(display_id, SplitRects { primary, secondary, divider });
    }

    /// Re-derives the split rects when the display was rotated under them.
    fn ensure_split_rects(&mut self, info: &DisplayInfo, split: &SplitSettings) {
        let stale = match self.split_rects.get(&info.id) {
            None => true,
            Some(rects) => rects.is_vertical_divider() == info.is_vertical(),
        };
        if stale {
            self.init_split_rects(info, split);
        }
    }
}

/// Keeps the divider far enough from the limit edges that both halves fit
/// their minimum size.
pub fn limit_divider_in_display_region(
    divider: Rect,
    limit: &Rect,
    vpr: f32,
    split: &SplitSettings,
) -> Rect {
    let mut out = divider;
    if divider.w < divider.h {
        let min = vp(split.min_horizontal_split_width, vpr) as i32;
        let lo = limit.x + min;
        let hi = (limit.right() - min - divider.w as i32).max(lo);
        out.x = divider.x.clamp(lo, hi);
        out.y = limit.y;
        out.h = limit.h;
    } else {
        let min = vp(split.min_vertical_split_height, vpr) as i32;
        let lo = limit.y + min;
        let hi = (limit.bottom() - min - divider.h as i32).max(lo);
        out.y = divider.y.clamp(lo, hi);
        out.x = limit.x;
        out.w = limit.w;
    }
    out
}

/// Fraction of the movable range the divider sits at.
pub fn divider_ratio(divider: &Rect, limit: &Rect) -> f32 {
    let (offset, span) = if divider.w < divider.h {
        (divider.x - limit.x, limit.w.saturating_sub(divider.w))
    } else {
        (divider.y - limit.y, limit.h.saturating_sub(divider.h))
    };
    if span == 0 { 0.0 } else { offset as f32 / span as f32 }
}

/// Moves the divider to whichever configured ratio is closest.
pub fn snap_divider(divider: Rect, limit: &Rect, split: &SplitSettings) -> Rect {
    let current = divider_ratio(&divider, limit);
    let target = std::iter::once(split.split_ratio)
        .chain(split.split_ratio_points.iter().copied())
        .min_by(|a, b| (a - current).abs().total_cmp(&(b - current).abs()))
        .unwrap_or(split.split_ratio);
    let mut out = divider;
    if divider.w < divider.h {
        out.x = limit.x + (limit.w.saturating_sub(divider.w) as f32 * target) as i32;
    } else {
        out.y = limit.y + (limit.h.saturating_sub(divider.h) as f32 * target) as i32;
    }
    out
}

fn dock_state(tree: &WindowTree, display: DisplayId, display_rect: &Rect) -> Option<(DockShowState, Rect)> {
    let above = tree.root(RootType::AboveApp);
    tree.children(above)
        .iter()
        .map(|&c| &tree[c])
        .find(|n| {
            n.window_type == WindowType::LauncherDock && n.is_visible() && n.display_id == display
        })
        .map(|n| (dock_show_state(&n.window_rect, display_rect), n.window_rect))
}

fn uses_size_limits(window_type: WindowType) -> bool {
    window_type.is_app() || window_type.is_app_floating()
}

fn hot_zone_rect(node: &WindowNode, display_rect: &Rect, hot_zone: u32) -> Rect {
    let rect = node.window_rect;
    match node.window_type {
        WindowType::DockSlice if rect.w < rect.h => rect.expand(hot_zone, 0),
        WindowType::DockSlice => rect.expand(0, hot_zone),
        WindowType::LauncherRecent => *display_rect,
        _ if node.is_main_floating() => rect.expand(hot_zone, hot_zone),
        _ => rect,
    }
}

/// Computes and applies the final rect of one node.
pub(crate) fn update_layout_rect(base: &mut PolicyBase, ctx: &mut LayoutContext<'_>, n: NodeId) {
    let settings = ctx.settings;
    let Some(node) = ctx.tree.node(n) else { return };
    if node.is_root() {
        return;
    }
    let display = node.display_id;
    let display_rect = ctx.displays.rect(display);
    let vpr = ctx.displays.vpr(display);
    let limit = base.limit_rect(display).unwrap_or(display_rect);
    let parent_rect = node
        .parent()
        .and_then(|p| ctx.tree.node(p))
        .filter(|p| !p.is_root())
        .map(|p| p.window_rect);
    let dock = dock_state(ctx.tree, display, &display_rect);
    let floating = &settings.floating;

    let node = &mut ctx.tree[n];
    let reason = node.size_change_reason;
    if reason == WindowSizeChangeReason::DragStart {
        node.origin_rect = node.window_rect;
    }
    let old = node.window_rect;
    let need_avoid = node.need_avoid();
    let win_limit = if need_avoid { limit } else { display_rect };

    let mut rect = if node.window_type == WindowType::DockSlice {
        base.split_rects(display).map(|s| s.divider).unwrap_or(node.request_rect)
    } else if node.mode.is_split() {
        match base.split_rect(display, node.mode) {
            Some(split) if need_avoid => split.intersection(&limit),
            Some(split) => split,
            None => win_limit,
        }
    } else if node.is_floating() {
        node.request_rect
    } else {
        win_limit
    };

    if node.is_floating() && node.window_type != WindowType::DockSlice {
        if node.decor_enabled
            && floating.decoration_enabled
            && !node.decorated
            && reason != WindowSizeChangeReason::Move
        {
            rect.w = rect.w.saturating_add(2 * vp(floating.frame_width, vpr));
            rect.h = rect.h.saturating_add(vp(floating.title_bar_height + floating.frame_width, vpr));
            node.request_rect = rect;
            node.decorated = true;
        }

        let parent_limited = node.window_type.is_sub() && node.flags.contains(WindowFlags::PARENT_LIMIT);
        if parent_limited && let Some(parent) = parent_rect {
            rect = clamp_into(rect, &parent);
        }

        let requested = rect;
        if uses_size_limits(node.window_type) {
            let system = system_size_limits(node.window_type, &display_rect, vpr, floating);
            let merged = merge_size_limits(&system, &node.limits, vpr);
            node.updated_limits = merged;
            let apply_min = !node.window_type.is_system() || node.window_type == WindowType::FloatCamera;
            rect = limit_size_by_limits(rect, &merged, apply_min, node.is_main_floating(), node.drag_type);
            if node.stretchable && reason == WindowSizeChangeReason::Drag {
                rect = keep_stretch_ratio(rect, &node.origin_rect, node.drag_type);
            }
            if reason.is_drag() {
                rect = anchor_drag_edges(rect, &requested, &old);
            }
        }

        match node.window_type {
            WindowType::StatusBar if rect.w >= rect.h => rect.y = display_rect.y,
            WindowType::NavigationBar if rect.w >= rect.h => {
                rect.y = display_rect.bottom() - rect.h as i32
            }
            _ => {}
        }

        if node.is_main_floating() {
            let bounds = PositionBounds::new(&limit, vp(floating.title_bar_height, vpr), dock);
            if reason == WindowSizeChangeReason::Drag {
                rect = limit_position_when_drag(rect, &requested, &old, &bounds);
                rect = fix_size_by_ratio_at_limit_edges(rect, &node.updated_limits, &bounds);
            } else {
                rect = limit_position_when_init_or_move(rect, &bounds);
                if reason == WindowSizeChangeReason::Undefined
                    && let Some(pos) = floating.floating_bottom_pos_y
                    && rect.bottom() >= vp(pos, vpr) as i32
                {
                    rect.y = limit.y;
                }
            }
        } else if !parent_limited && !display_rect.is_degenerate() {
            rect = limit_to_bottom_right_corner(rect, &display_rect);
        }
    }

    if !display_rect.is_degenerate() {
        rect.w = rect.w.clamp(1, display_rect.w);
        rect.h = rect.h.clamp(1, display_rect.h);
    }

    node.last_rect = old;
    node.window_rect = rect;
    node.hot_zone_rect = hot_zone_rect(node, &display_rect, vp(floating.hot_zone, vpr));
    node.size_change_reason = WindowSizeChangeReason::Undefined;
    let id = node.id;
    debug!(window = %id, %rect, ?reason, "layout");
    if old != rect {
        ctx.outbox.rect_changed(id, rect, reason);
    }
}

/// Lays out `start` and every visible node below it.
pub(crate) fn layout_subtree(base: &mut PolicyBase, ctx: &mut LayoutContext<'_>, start: NodeId) {
    let mut stack = vec![start];
    while let Some(n) = stack.pop() {
        let Some(node) = ctx.tree.node(n) else { continue };
        if !node.is_root() {
            if !node.is_visible() {
                continue;
            }
            update_layout_rect(base, ctx, n);
        }
        stack.extend(ctx.tree.children(n).iter().rev());
    }
}

/// Full pass over one display: bars first, shrinking the limit rect, then
/// everything else from the top layer down.
pub(crate) fn layout_window_tree(base: &mut PolicyBase, ctx: &mut LayoutContext<'_>, display_id: DisplayId) {
    let Some(info) = ctx.displays.get(display_id) else {
        trace!(%display_id, "layout of unknown display");
        return;
    };
    let display_rect = info.rect();
    base.ensure_split_rects(info, &ctx.settings.split);
    base.limit_rects.insert(display_id, display_rect);

    let bars: Vec<NodeId> = ctx
        .tree
        .roots()
        .iter()
        .flat_map(|&r| ctx.tree.descendants(r))
        .filter(|&n| {
            let node = &ctx.tree[n];
            node.window_type.is_avoid_area() && node.is_visible() && node.display_id == display_id
        })
        .collect();
    for bar in bars {
        update_layout_rect(base, ctx, bar);
        let rect = ctx.tree[bar].window_rect;
        if let Some(pos) = AvoidPosType::classify(&rect.translate(-display_rect.x, -display_rect.y)) {
            let limit = base.limit_rect(display_id).unwrap_or(display_rect);
            base.limit_rects.insert(display_id, shrink_limit_rect(limit, &rect, pos));
        }
    }
    debug!(%display_id, limit = ?base.limit_rect(display_id), "limit rect");

    for root in [RootType::AboveApp, RootType::App, RootType::BelowApp] {
        let root_node = ctx.tree.root(root);
        let tops: Vec<NodeId> = ctx
            .tree
            .children(root_node)
            .iter()
            .copied()
            .filter(|&c| {
                let node = &ctx.tree[c];
                node.display_id == display_id && !node.window_type.is_avoid_area()
            })
            .collect();
        for top in tops {
            layout_subtree(base, ctx, top);
        }
        if root == RootType::AboveApp && has_fullscreen_recent(ctx.tree, display_id) {
            trace!(%display_id, "launcher recent covers the display");
            return;
        }
    }
}

fn has_fullscreen_recent(tree: &WindowTree, display: DisplayId) -> bool {
    let above = tree.root(RootType::AboveApp);
    tree.children(above).iter().map(|&c| &tree[c]).any(|n| {
        n.window_type == WindowType::LauncherRecent
            && n.is_visible()
            && n.mode == WindowMode::Fullscreen
            && n.display_id == display
    })
}

/// Lays out the divider and every split window of `display`.
pub(crate) fn layout_split_nodes(base: &mut PolicyBase, ctx: &mut LayoutContext<'_>, display: DisplayId) {
    let app = ctx.tree.root(RootType::App);
    let split: Vec<NodeId> = ctx
        .tree
        .children(app)
        .iter()
        .copied()
        .filter(|&c| {
            let node = &ctx.tree[c];
            node.display_id == display
                && (node.window_type == WindowType::DockSlice || node.mode.is_split())
        })
        .collect();
    for n in split {
        layout_subtree(base, ctx, n);
    }
}

/// Lays out whatever a change to `id` can affect.
pub(crate) fn layout_node(base: &mut PolicyBase, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
    let n = ctx.node_id(id)?;
    let node = &ctx.tree[n];
    let display = node.display_id;
    if node.window_type.is_avoid_area() {
        layout_window_tree(base, ctx, display);
    } else if node.window_type == WindowType::DockSlice || node.mode.is_split() {
        layout_split_nodes(base, ctx, display);
    } else {
        layout_subtree(base, ctx, n);
    }
    Ok(())
}

/// Applies a divider drag: the request rect is the new divider position.
/// Ending a drag snaps to the nearest ratio and may ask to leave split mode.
pub(crate) fn update_divider(base: &mut PolicyBase, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
    let n = ctx.node_id(id)?;
    let node = &ctx.tree[n];
    let display_id = node.display_id;
    let reason = node.size_change_reason;
    let requested = node.request_rect;
    let display_rect = ctx.display_rect(display_id);
    let limit = base.limit_rect(display_id).unwrap_or(display_rect);
    let split = &ctx.settings.split;

    if reason.is_drag() && !requested.is_degenerate() {
        if reason == WindowSizeChangeReason::DragEnd
            && let Some([low, high]) = split.exit_split_ratios
        {
            let ratio = divider_ratio(&requested, &limit);
            if ratio < low || ratio > high {
                debug!(%display_id, ratio, "divider dragged past exit ratio");
                let keep = if ratio < low {
                    WindowMode::SplitSecondary
                } else {
                    WindowMode::SplitPrimary
                };
                base.split_exit = Some(SplitExit { display: display_id, keep });
                return Ok(());
            }
        }
        let mut divider = limit_divider_in_display_region(requested, &limit, ctx.vpr(display_id), split);
        if reason == WindowSizeChangeReason::DragEnd {
            divider = snap_divider(divider, &limit, split);
        }
        base.set_split_rect_by_divider(display_id, &display_rect, divider);
    }
    layout_split_nodes(base, ctx, display_id);
    Ok(())
}

/// Shared part of removing a node that is already detached from the tree.
pub(crate) fn remove_node(base: &mut PolicyBase, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
    let node = ctx.tree.get(id).ok_or_else(|| WmError::unknown_window(id))?;
    let (window_type, display, request) = (node.window_type, node.display_id, node.request_rect);
    if window_type.is_avoid_area() || window_type == WindowType::DockSlice {
        layout_window_tree(base, ctx, display);
    }
    ctx.outbox.rect_changed(id, request, WindowSizeChangeReason::Hide);
    Ok(())
}

/// Gives `n` a policy-chosen floating rect, switching its mode if needed.
pub(crate) fn place_floating(ctx: &mut LayoutContext<'_>, n: NodeId, rect: Rect) {
    let node = &mut ctx.tree[n];
    node.request_rect = rect;
    node.decorated = true;
    if node.mode != WindowMode::Floating {
        node.last_mode = node.mode;
        node.mode = WindowMode::Floating;
        let window = node.id;
        ctx.outbox.push(WmEvent::ModeChanged { window, mode: WindowMode::Floating });
    }
}

/// App main windows of `display` attached under the app root, bottom first.
pub(crate) fn app_main_windows(tree: &WindowTree, display: DisplayId) -> Vec<WindowId> {
    let app = tree.root(RootType::App);
    tree.children(app)
        .iter()
        .map(|&c| &tree[c])
        .filter(|n| n.window_type.is_main() && n.display_id == display)
        .map(|n| n.id)
        .collect()
}
