use enum_dispatch::enum_dispatch;

use crate::common::config::LayoutMode;
use crate::layout_engine::error::WmResult;
use crate::layout_engine::policy::{self, LayoutContext, PolicyBase, SplitExit, SplitRects};
use crate::model::{DisplayId, Rect, WindowId};

/// A layout strategy. Every operation runs to completion against the
/// context it is handed; the policy keeps only its own per-display caches.
#[enum_dispatch]
pub trait LayoutPolicy {
    fn mode(&self) -> LayoutMode;

    fn base(&self) -> &PolicyBase;
    fn base_mut(&mut self) -> &mut PolicyBase;

    /// Takes over the current tree, e.g. after a policy switch.
    fn launch(&mut self, ctx: &mut LayoutContext<'_>);
    /// Drops policy state before another policy takes over.
    fn clean(&mut self, ctx: &mut LayoutContext<'_>);
    /// Rearranges every app main window the way this policy places new ones.
    fn reorder(&mut self, ctx: &mut LayoutContext<'_>);

    fn add_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()>;
    fn update_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()>;
    /// Called once the node has been detached and hidden.
    fn remove_window_node(&mut self, ctx: &mut LayoutContext<'_>, id: WindowId) -> WmResult<()>;

    fn layout_window_tree(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId) {
        policy::layout_window_tree(self.base_mut(), ctx, display)
    }

    fn process_display_create(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId);
    fn process_display_destroy(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId);
    fn process_display_size_change(&mut self, ctx: &mut LayoutContext<'_>, display: DisplayId);

    fn limit_rect(&self, display: DisplayId) -> Option<Rect> { self.base().limit_rect(display) }

    fn group_limit_rect(&self) -> Rect { self.base().group_limit_rect() }

    fn split_rects(&self, display: DisplayId) -> Option<SplitRects> {
        self.base().split_rects(display)
    }

    /// Pending request to leave split mode after a divider drag.
    fn take_split_exit(&mut self) -> Option<SplitExit> { self.base_mut().take_split_exit() }
}

#[derive(Debug, Clone)]
#[enum_dispatch(LayoutPolicy)]
pub enum LayoutPolicyKind {
    Cascade(CascadePolicy),
    Tile(TilePolicy),
}

impl LayoutPolicyKind {
    pub fn new(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Cascade => LayoutPolicyKind::Cascade(CascadePolicy::new()),
            LayoutMode::Tile => LayoutPolicyKind::Tile(TilePolicy::new()),
        }
    }
}

impl Default for LayoutPolicyKind {
    fn default() -> Self { LayoutPolicyKind::new(LayoutMode::default()) }
}

mod cascade;
mod tile;

pub use cascade::CascadePolicy;
pub use tile::TilePolicy;
