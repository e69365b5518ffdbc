use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, instrument};

use crate::common::config::LayoutMode;
use crate::layout_engine::error::WmResult;
use crate::layout_engine::events::MinimizeReason;
use crate::layout_engine::policy::{
    self, LayoutContext, PolicyBase, app_main_windows, place_floating,
};
use crate::layout_engine::systems::LayoutPolicy;
use crate::model::geometry::vp;
use crate::model::{DisplayId, Rect, WindowId, WindowMode, WindowType};

/// Main windows share the display in equal columns.
///
/// Each display keeps a foreground queue of tiled windows, oldest first. The
/// queue length picks the preset row of rects; pushing past the display's
/// capacity minimizes the oldest window.
#[derive(Debug, Clone, Default)]
pub struct TilePolicy {
    base: PolicyBase,
    presets: BTreeMap<DisplayId, Vec<Vec<Rect>>>,
    queues: BTreeMap<DisplayId, VecDeque<WindowId>>,
}

impl TilePolicy {
    pub fn new() -> Self { Self::default() }

    /// How many windows fit side by side on `display`.
    pub fn max_tile_num(&self, display: DisplayId) -> usize {
        self.presets.get(&display).map(Vec::len).unwrap_or(1)
    }

    pub fn foreground(&self, display: DisplayId) -> Vec<WindowId> {
        self.queues.get(&display).map(|q| q.iter().copied().collect()).unwrap_or_default()
    }

    fn init_tile_rects(&mut self, ctx: &LayoutContext<'_>, display_id: DisplayId) {
        let display_rect = ctx.display_rect(display_id);
        let limit = self.base.limit_rect(display_id).unwrap_or(display_rect);
        let vpr = ctx.vpr(display_id);
        let floating = &ctx.settings.floating;
        let edge = vp(ctx.settings.tile.edge_interval, vpr);
        let mid = vp(ctx.settings.tile.mid_interval, vpr);
        let min_w = if ctx.displays.is_vertical(display_id) {
            vp(floating.min_vertical_floating_width, vpr)
        } else {
            vp(floating.min_vertical_floating_height, vpr)
        };
        let max = ((limit.w.saturating_sub(2 * edge) + mid) / (min_w + mid).max(1)).max(1) as usize;

        let mut presets = Vec::with_capacity(max);
        let w = (limit.w as f32 * floating.aspect_ratio) as u32;
        let h = (limit.h as f32 * floating.aspect_ratio) as u32;
        let single = Rect::new(
            limit.x + (limit.w.saturating_sub(w) / 2) as i32,
            limit.y + (limit.h.saturating_sub(h) / 2) as i32,
            w,
            h,
        );
        presets.push(vec![single.intersection(&limit)]);
        for n in 2..=max as u32 {
            let w = limit.w.saturating_sub(2 * edge + mid * (n - 1)) / n;
            let h = limit.h.saturating_sub(2 * edge);
            let row = (0..n)
                .map(|i| {
                    Rect::new(limit.x + (edge + i * (w + mid)) as i32, limit.y + edge as i32, w, h)
                })
                .collect();
            presets.push(row);
        }
        debug!(%display_id, max, "tile presets");
        self.presets.insert(display_id, presets);
    }

    fn push_to_queue(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId, id: WindowId) {
        let max = self.max_tile_num(display);
        let queue = self.queues.entry(display).or_default();
        if queue.contains(&id) {
            return;
        }
        while queue.len() >= max {
            let Some(oldest) = queue.pop_front() else { break };
            debug!(window = %oldest, "tile queue full, minimizing");
            ctx.outbox.minimize(oldest, MinimizeReason::LayoutTile);
        }
        queue.push_back(id);
    }

    fn assign_tile_rects(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        let Some(queue) = self.queues.get(&display) else { return };
        if queue.is_empty() {
            return;
        }
        let Some(row) = self.presets.get(&display).and_then(|p| p.get(queue.len() - 1)) else {
            return;
        };
        for (&id, &rect) in queue.iter().zip(row) {
            if let Some(n) = ctx.tree.find(id) {
                place_floating(ctx, n, rect);
            }
        }
    }

    fn layout_foreground(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        for id in self.foreground(display) {
            if let Some(n) = ctx.tree.find(id) {
                policy::layout_subtree(&mut self.base, ctx, n);
            }
        }
    }

    fn retile(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        self.assign_tile_rects(ctx, display);
        self.layout_foreground(ctx, display);
    }

    fn init_foreground(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        self.queues.insert(display, VecDeque::new());
        for id in app_main_windows(ctx.tree, display) {
            let Some(node) = ctx.tree.get(id) else { continue };
            if !node.is_visible() {
                continue;
            }
            if node.supports_mode(WindowMode::Floating) {
                self.push_to_queue(ctx, display, id);
            } else {
                ctx.outbox.minimize(id, MinimizeReason::LayoutTile);
            }
        }
    }
}

impl LayoutPolicy for TilePolicy {
    fn mode(&self) -> LayoutMode { LayoutMode::Tile }

    fn base(&self) -> &PolicyBase { &self.base }

    fn base_mut(&mut self) -> &mut PolicyBase { &mut self.base }

    #[instrument(skip_all)]
    fn launch(&mut self, ctx: &mut LayoutContext<'_>) {
        let displays: Vec<DisplayId> = ctx.displays.ids().collect();
        for display in displays {
            policy::layout_window_tree(&mut self.base, ctx, display);
            self.init_tile_rects(ctx, display);
            self.init_foreground(ctx, display);
            self.assign_tile_rects(ctx, display);
            policy::layout_window_tree(&mut self.base, ctx, display);
        }
        info!("tile layout launched");
    }

    fn clean(&mut self, _ctx: &mut LayoutContext<'_>) {
        self.queues.clear();
        info!("tile layout cleaned");
    }

    fn reorder(&mut self, ctx: &mut LayoutContext<'_>) {
        let displays: Vec<DisplayId> = ctx.displays.ids().collect();
        for display in displays {
            self.init_foreground(ctx, display);
            self.retile(ctx, display);
        }
    }

    fn add_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
        let n = ctx.node_id(id)?;
        let node = &ctx.tree[n];
        if !node.window_type.is_main() {
            return self.update_window_node(ctx, id);
        }
        let display = node.display_id;
        if !node.supports_mode(WindowMode::Floating) {
            debug!(window = %id, "cannot tile, minimizing");
            ctx.outbox.minimize(id, MinimizeReason::LayoutTile);
            return Ok(());
        }
        if !self.presets.contains_key(&display) {
            self.init_tile_rects(ctx, display);
        }
        self.push_to_queue(ctx, display, id);
        self.retile(ctx, display);
        Ok(())
    }

    fn update_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
        let n = ctx.node_id(id)?;
        let node = &ctx.tree[n];
        let display = node.display_id;
        if node.window_type.is_avoid_area() {
            policy::layout_window_tree(&mut self.base, ctx, display);
            self.init_tile_rects(ctx, display);
            self.retile(ctx, display);
            Ok(())
        } else if node.window_type == WindowType::DockSlice {
            policy::update_divider(&mut self.base, ctx, id)
        } else {
            policy::layout_node(&mut self.base, ctx, id)
        }
    }

    fn remove_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()> {
        policy::remove_node(&mut self.base, ctx, id)?;
        let Some(display) = ctx.tree.get(id).map(|n| n.display_id) else { return Ok(()) };
        let Some(queue) = self.queues.get_mut(&display) else { return Ok(()) };
        let before = queue.len();
        queue.retain(|&q| q != id);
        if queue.len() != before {
            self.retile(ctx, display);
        }
        Ok(())
    }

    fn process_display_create(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        policy::layout_window_tree(&mut self.base, ctx, display);
        self.init_tile_rects(ctx, display);
    }

    fn process_display_destroy(&mut self, _ctx: &mut LayoutContext<'_>, display: DisplayId) {
        self.base.forget_display(display);
        self.presets.remove(&display);
        self.queues.remove(&display);
    }

    fn process_display_size_change(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        if let Some(info) = ctx.displays.get(display) {
            self.base.init_split_rects(info, &ctx.settings.split);
        }
        policy::layout_window_tree(&mut self.base, ctx, display);
        self.init_tile_rects(ctx, display);
        self.retile(ctx, display);
    }
}
