use std::collections::BTreeMap;

use tracing::{debug, info, instrument, trace};

use crate::common::config::LayoutMode;
use crate::layout_engine::error::WmResult;
use crate::layout_engine::events::MinimizeReason;
use crate::layout_engine::limits::{merge_size_limits, system_size_limits};
use crate::layout_engine::policy::{
    self, LayoutContext, PolicyBase, app_main_windows, place_floating,
};
use crate::layout_engine::systems::LayoutPolicy;
use crate::model::geometry::vp;
use crate::model::{DisplayId, NodeId, Rect, RootType, WindowId, WindowMode, WindowType};

/// Floating windows open at successively offset positions.
///
/// The first app window gets the default cascade rect of its display; each
/// later one is placed one title-bar height down and to the right of the
/// top-most main window, wrapping to the limit origin per axis.
#[derive(Debug, Clone)]
pub struct CascadePolicy {
    base: PolicyBase,
    default_rects: BTreeMap<DisplayId, Rect>,
    first_app_window: bool,
}

impl Default for CascadePolicy {
    fn default() -> Self { Self::new() }
}

impl CascadePolicy {
    pub fn new() -> Self {
        CascadePolicy {
            base: PolicyBase::default(),
            default_rects: BTreeMap::new(),
            first_app_window: true,
        }
    }

    pub fn default_cascade_rect(&self, display: DisplayId) -> Option<Rect> {
        self.default_rects.get(&display).copied()
    }

    fn init_cascade_rect(&mut self, ctx: &LayoutContext<'_>, display_id: DisplayId) {
        let display_rect = ctx.display_rect(display_id);
        let limit = self.base.limit_rect(display_id).unwrap_or(display_rect);
        let vpr = ctx.vpr(display_id);
        let floating = &ctx.settings.floating;

        let rect = if let Some(r) = floating.default_float_rect {
            Rect::new(
                (r.x as f32 * vpr) as i32,
                (r.y as f32 * vpr) as i32,
                vp(r.w, vpr),
                vp(r.h, vpr),
            )
        } else {
            let (mut min_w, mut min_h) = (
                vp(floating.min_vertical_floating_width, vpr),
                vp(floating.min_vertical_floating_height, vpr),
            );
            if display_rect.is_landscape() {
                std::mem::swap(&mut min_w, &mut min_h);
            }
            let w = ((display_rect.w as f32 * floating.aspect_ratio) as u32).max(min_w);
            let h = ((display_rect.h as f32 * floating.aspect_ratio) as u32).max(min_h);
            if w > limit.w || h > limit.h {
                limit
            } else {
                Rect::new(
                    limit.x + ((limit.w - w) / 2) as i32,
                    limit.y + ((limit.h - h) / 2) as i32,
                    w,
                    h,
                )
            }
        };
        debug!(%display_id, %rect, "default cascade rect");
        self.default_rects.insert(display_id, rect);
    }

    fn default_rect(&mut self, ctx: &LayoutContext<'_>, display: DisplayId) -> Rect {
        if !self.default_rects.contains_key(&display) {
            self.init_cascade_rect(ctx, display);
        }
        self.default_rects.get(&display).copied().unwrap_or_default()
    }

    /// Moves `rect` one title-bar height down and right, wrapping each axis
    /// back to the limit origin when it would leave the limit rect.
    fn step_cascade_rect(&self, ctx: &LayoutContext<'_>, rect: Rect, display: DisplayId) -> Rect {
        let limit = self.base.limit_rect(display).unwrap_or_else(|| ctx.display_rect(display));
        let step = vp(ctx.settings.floating.title_bar_height, ctx.vpr(display)) as i32;
        let mut out = rect;
        out.x = if rect.right() + step > limit.right() { limit.x } else { rect.x + step };
        out.y = if rect.bottom() + step > limit.bottom() { limit.y } else { rect.y + step };
        trace!(from = %rect, to = %out, "cascade step");
        out
    }

    /// Rect of the top-most main window other than `exclude`, or the default.
    fn cur_cascade_rect(&mut self, ctx: &LayoutContext<'_>, exclude: NodeId, display: DisplayId) -> Rect {
        let app = ctx.tree.root(RootType::App);
        let found = ctx
            .tree
            .children(app)
            .iter()
            .rev()
            .filter(|&&c| c != exclude)
            .map(|&c| &ctx.tree[c])
            .find(|n| n.window_type.is_main() && n.display_id == display && n.is_visible())
            .map(|n| if n.is_floating() { n.window_rect } else { n.request_rect })
            .filter(|r| !r.is_degenerate());
        match found {
            Some(rect) => rect,
            None => self.default_rect(ctx, display),
        }
    }

    fn set_cascade_rect(&mut self, ctx: &mut LayoutContext<'_>, n: NodeId) {
        let node = &ctx.tree[n];
        let display = node.display_id;
        let rect = if node.window_type.is_app() && self.first_app_window {
            self.first_app_window = false;
            self.default_rect(ctx, display)
        } else if node.window_type.is_app() {
            let cur = self.cur_cascade_rect(ctx, n, display);
            self.step_cascade_rect(ctx, cur, display)
        } else {
            self.default_rect(ctx, display)
        };
        let node = &mut ctx.tree[n];
        node.request_rect = rect;
        node.decorated = true;
    }

    /// The window cannot be shown floating on this display at all.
    fn cannot_float(&self, ctx: &LayoutContext<'_>, n: NodeId) -> bool {
        let node = &ctx.tree[n];
        if !node.supports_mode(WindowMode::Floating) {
            return true;
        }
        let display = node.display_id;
        let display_rect = ctx.display_rect(display);
        let vpr = ctx.vpr(display);
        let limit = self.base.limit_rect(display).unwrap_or(display_rect);
        let system = system_size_limits(node.window_type, &display_rect, vpr, &ctx.settings.floating);
        let merged = merge_size_limits(&system, &node.limits, vpr);
        merged.min_width > limit.w || merged.min_height > limit.h
    }
}

impl LayoutPolicy for CascadePolicy {
    fn mode(&self) -> LayoutMode { LayoutMode::Cascade }

    fn base(&self) -> &PolicyBase { &self.base }

    fn base_mut(&mut self) -> &mut PolicyBase { &mut self.base }

    #[instrument(skip_all)]
    fn launch(&mut self, ctx: &mut LayoutContext<'_>) {
        let displays: Vec<DisplayId> = ctx.displays.ids().collect();
        for display in displays {
            policy::layout_window_tree(&mut self.base, ctx, display);
            self.init_cascade_rect(ctx, display);
        }
        info!("cascade layout launched");
    }

    fn clean(&mut self, _ctx: &mut LayoutContext<'_>) {
        info!("cascade layout cleaned");
    }

    #[instrument(skip_all)]
    fn reorder(&mut self, ctx: &mut LayoutContext<'_>) {
        let displays: Vec<DisplayId> = ctx.displays.ids().collect();
        for display in displays {
            let mut prev: Option<Rect> = None;
            for id in app_main_windows(ctx.tree, display) {
                let Some(n) = ctx.tree.find(id) else { continue };
                if !ctx.tree[n].is_visible() {
                    continue;
                }
                if self.cannot_float(ctx, n) {
                    debug!(window = %id, "cannot float, minimizing");
                    ctx.outbox.minimize(id, MinimizeReason::LayoutCascade);
                    continue;
                }
                let rect = match prev {
                    None => self.default_rect(ctx, display),
                    Some(prev) => self.step_cascade_rect(ctx, prev, display),
                };
                place_floating(ctx, n, rect);
                prev = Some(rect);
            }
            policy::layout_window_tree(&mut self.base, ctx, display);
        }
    }

    fn add_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
        let n = ctx.node_id(id)?;
        let node = &ctx.tree[n];
        if node.is_floating()
            && node.window_type != WindowType::DockSlice
            && node.request_rect.is_empty()
        {
            self.set_cascade_rect(ctx, n);
        }
        self.update_window_node(ctx, id)
    }

    fn update_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
        let n = ctx.node_id(id)?;
        if ctx.tree[n].window_type == WindowType::DockSlice {
            policy::update_divider(&mut self.base, ctx, id)
        } else {
            policy::layout_node(&mut self.base, ctx, id)
        }
    }

    fn remove_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
        policy::remove_node(&mut self.base, ctx, id)
    }

    fn process_display_create(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        policy::layout_window_tree(&mut self.base, ctx, display);
        self.init_cascade_rect(ctx, display);
    }

    fn process_display_destroy(&mut self, _ctx: &mut LayoutContext<'_>, display: DisplayId) {
        self.base.forget_display(display);
        self.default_rects.remove(&display);
    }

    fn process_display_size_change(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        if let Some(info) = ctx.displays.get(display) {
            self.base.init_split_rects(info, &ctx.settings.split);
        }
        policy::layout_window_tree(&mut self.base, ctx, display);
        self.init_cascade_rect(ctx, display);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::common::config::LayoutSettings;
    use crate::layout_engine::events::{Outbox, WmEvent};
    use crate::model::{
        DEFAULT_DISPLAY, DisplayGroup, DisplayInfo, WindowModeSupport, WindowNode, WindowProperty,
        WindowTree,
    };

    fn w(id: u32) -> WindowId { WindowId(id) }

    struct Fixture {
        tree: WindowTree,
        displays: DisplayGroup,
        settings: LayoutSettings,
        outbox: Outbox,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                tree: WindowTree::new(),
                displays: DisplayGroup::new(DisplayInfo::new(DEFAULT_DISPLAY, 1080, 2340)),
                settings: LayoutSettings::default(),
                outbox: Outbox::default(),
            }
        }

        fn ctx(&mut self) -> LayoutContext<'_> {
            LayoutContext {
                tree: &mut self.tree,
                displays: &self.displays,
                settings: &self.settings,
                outbox: &mut self.outbox,
            }
        }

        fn attach(&mut self, property: WindowProperty) -> NodeId {
            let root = self.tree.root(RootType::App);
            let mut node = WindowNode::new(property);
            node.requested_visibility = true;
            node.current_visibility = true;
            let n = self.tree.insert(node);
            self.tree.attach(n, root, None);
            n
        }

        fn rect(&self, id: u32) -> Rect { self.tree.get(w(id)).unwrap().window_rect }
    }

    fn floating(id: u32) -> WindowProperty {
        WindowProperty::new(w(id), WindowType::AppMainWindow).with_mode(WindowMode::Floating)
    }

    #[test]
    fn test_default_cascade_rect_is_centered() {
        let mut f = Fixture::new();
        let mut policy = CascadePolicy::new();
        policy.launch(&mut f.ctx());
        // 1080 * 0.66 and 2340 * 0.66, centered in the full display.
        assert_eq!(
            policy.default_cascade_rect(DEFAULT_DISPLAY),
            Some(Rect::new(184, 398, 712, 1544))
        );
    }

    #[test]
    fn test_windows_cascade_by_title_bar_height() {
        let mut f = Fixture::new();
        let mut policy = CascadePolicy::new();
        policy.launch(&mut f.ctx());
        f.attach(floating(1));
        policy.add_window_node(&mut f.ctx(), w(1)).unwrap();
        f.attach(floating(2));
        policy.add_window_node(&mut f.ctx(), w(2)).unwrap();

        assert_eq!(f.rect(1), Rect::new(184, 398, 712, 1544));
        assert_eq!(f.rect(2), Rect::new(221, 435, 712, 1544));
    }

    #[test]
    fn test_step_wraps_to_limit_origin() {
        let mut f = Fixture::new();
        let mut policy = CascadePolicy::new();
        policy.launch(&mut f.ctx());
        let ctx = f.ctx();
        let stepped = policy.step_cascade_rect(&ctx, Rect::new(500, 900, 560, 1320), DEFAULT_DISPLAY);
        assert_eq!(stepped, Rect::new(0, 937, 560, 1320));
    }

    #[test]
    fn test_explicit_request_rect_is_kept() {
        let mut f = Fixture::new();
        let mut policy = CascadePolicy::new();
        policy.launch(&mut f.ctx());
        f.attach(floating(1).with_rect(Rect::new(100, 200, 500, 600)));
        policy.add_window_node(&mut f.ctx(), w(1)).unwrap();
        assert_eq!(f.rect(1), Rect::new(100, 200, 500, 600));
    }

    #[test]
    fn test_reorder_floats_and_minimizes() {
        let mut f = Fixture::new();
        let mut policy = CascadePolicy::new();
        policy.launch(&mut f.ctx());
        f.attach(WindowProperty::new(w(1), WindowType::AppMainWindow));
        let mut pinned = WindowProperty::new(w(2), WindowType::AppMainWindow);
        pinned.mode_support = WindowModeSupport::FULLSCREEN;
        f.attach(pinned);
        f.attach(WindowProperty::new(w(3), WindowType::AppMainWindow));

        policy.reorder(&mut f.ctx());

        assert_eq!(f.tree.get(w(1)).unwrap().mode, WindowMode::Floating);
        assert_eq!(f.tree.get(w(1)).unwrap().last_mode, WindowMode::Fullscreen);
        assert_eq!(f.rect(1), Rect::new(184, 398, 712, 1544));
        assert_eq!(f.rect(3), Rect::new(221, 435, 712, 1544));
        let events: Vec<_> = f.outbox.drain().collect();
        assert!(events.contains(&WmEvent::MinimizeRequested {
            window: w(2),
            reason: MinimizeReason::LayoutCascade
        }));
        assert!(events.contains(&WmEvent::ModeChanged { window: w(3), mode: WindowMode::Floating }));
    }
}
