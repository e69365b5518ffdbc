//! Per-display bookkeeping and display hot-plug handling.
//!
//! Display events race with each other in practice, so a malformed or
//! out-of-order event is logged and ignored instead of being reported as an
//! error.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, instrument, warn};

use crate::common::config::LayoutSettings;
use crate::layout_engine::events::{Outbox, SystemBarTint, WmEvent};
use crate::layout_engine::policy::LayoutContext;
use crate::layout_engine::systems::{LayoutPolicy, LayoutPolicyKind};
use crate::model::{
    DEFAULT_DISPLAY, DisplayChangeType, DisplayGroup, DisplayId, DisplayInfo, Rect, RootType,
    SystemBarProperty, WindowId, WindowTree, WindowType,
};

const SYSTEM_BARS: [WindowType; 2] = [WindowType::StatusBar, WindowType::NavigationBar];

/// Mutable state a display event may touch besides the controller itself.
pub struct DisplayDeps<'a> {
    pub tree: &'a mut WindowTree,
    pub policy: &'a mut LayoutPolicyKind,
    pub settings: &'a LayoutSettings,
    pub outbox: &'a mut Outbox,
}

#[derive(Debug, Clone)]
pub struct MultiDisplayController {
    displays: DisplayGroup,
    sys_bar_nodes: BTreeMap<DisplayId, BTreeMap<WindowType, WindowId>>,
    sys_bar_tints: BTreeMap<DisplayId, BTreeMap<WindowType, SystemBarTint>>,
    /// Windows of each display per root, in tree order. Rebuilt from the tree
    /// after every structural change.
    snapshots: BTreeMap<DisplayId, BTreeMap<RootType, Vec<WindowId>>>,
}

impl MultiDisplayController {
    pub fn new(default: DisplayInfo) -> Self {
        let id = default.id;
        let mut controller = MultiDisplayController {
            displays: DisplayGroup::new(default),
            sys_bar_nodes: BTreeMap::new(),
            sys_bar_tints: BTreeMap::new(),
            snapshots: BTreeMap::new(),
        };
        controller.init_display_maps(id);
        controller
    }

    pub fn displays(&self) -> &DisplayGroup { &self.displays }

    pub fn is_multi_display(&self) -> bool { self.displays.is_multi_display() }

    pub fn has_sys_bar_maps(&self, display: DisplayId) -> bool {
        self.sys_bar_nodes.contains_key(&display) && self.sys_bar_tints.contains_key(&display)
    }

    pub fn sys_bar_node(&self, display: DisplayId, bar: WindowType) -> Option<WindowId> {
        self.sys_bar_nodes.get(&display)?.get(&bar).copied()
    }

    pub fn sys_bar_tints(&self, display: DisplayId) -> Vec<SystemBarTint> {
        self.sys_bar_tints
            .get(&display)
            .map(|m| m.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn display_windows(&self, display: DisplayId, root: RootType) -> &[WindowId] {
        self.snapshots
            .get(&display)
            .and_then(|m| m.get(&root))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn init_display_maps(&mut self, display: DisplayId) {
        self.sys_bar_nodes.insert(display, BTreeMap::new());
        let tints = SYSTEM_BARS
            .iter()
            .map(|&bar| {
                let tint = SystemBarTint {
                    bar,
                    props: SystemBarProperty::default(),
                    region: Rect::ZERO,
                };
                (bar, tint)
            })
            .collect();
        self.sys_bar_tints.insert(display, tints);
        self.snapshots.insert(display, BTreeMap::new());
    }

    fn clear_display_maps(&mut self, display: DisplayId) {
        self.sys_bar_nodes.remove(&display);
        self.sys_bar_tints.remove(&display);
        self.snapshots.remove(&display);
    }

    #[instrument(skip_all, fields(display = %info.id))]
    pub fn process_display_create(
        &mut self,
        info: DisplayInfo,
        all: &BTreeMap<DisplayId, DisplayInfo>,
        deps: DisplayDeps<'_>,
    ) -> bool {
        let id = info.id;
        if self.displays.contains(id) || self.has_sys_bar_maps(id) {
            warn!("display already tracked, ignoring create");
            return false;
        }
        if all.len() != self.displays.len() + 1 || !all.contains_key(&id) {
            warn!(expected = self.displays.len() + 1, got = all.len(), "display count mismatch, ignoring create");
            return false;
        }

        if !info.rect().is_in_range() {
            warn!(rect = %info.rect(), "display out of range, ignoring create");
            return false;
        }
        self.displays.insert(info);
        self.init_display_maps(id);
        self.process_cross_display_nodes(deps.tree);

        let mut ctx = LayoutContext {
            tree: deps.tree,
            displays: &self.displays,
            settings: deps.settings,
            outbox: deps.outbox,
        };
        deps.policy.process_display_create(&mut ctx, id);
        self.refresh(deps.tree, deps.outbox);
        info!(count = self.displays.len(), "display created");
        true
    }

    /// Returns the windows moved off the destroyed display, or `None` when the
    /// event was ignored.
    #[instrument(skip_all, fields(display = %display_id))]
    pub fn process_display_destroy(
        &mut self,
        display_id: DisplayId,
        all: &BTreeMap<DisplayId, DisplayInfo>,
        deps: DisplayDeps<'_>,
    ) -> Option<Vec<WindowId>> {
        if display_id == DEFAULT_DISPLAY {
            warn!("default display cannot be destroyed");
            return None;
        }
        if !self.displays.contains(display_id) || !self.has_sys_bar_maps(display_id) {
            warn!("display not tracked, ignoring destroy");
            return None;
        }
        if all.len() + 1 != self.displays.len() || all.contains_key(&display_id) {
            warn!(expected = self.displays.len() - 1, got = all.len(), "display count mismatch, ignoring destroy");
            return None;
        }

        let moved = self.move_window_nodes_to_default_display(deps.tree, display_id);
        self.displays.remove(display_id);
        self.clear_display_maps(display_id);
        self.process_cross_display_nodes(deps.tree);

        let mut ctx = LayoutContext {
            tree: deps.tree,
            displays: &self.displays,
            settings: deps.settings,
            outbox: deps.outbox,
        };
        deps.policy.process_display_destroy(&mut ctx, display_id);
        deps.policy.layout_window_tree(&mut ctx, DEFAULT_DISPLAY);
        self.refresh(deps.tree, deps.outbox);
        info!(moved = moved.len(), "display destroyed");
        Some(moved)
    }

    #[instrument(skip_all, fields(display = %info.id, ?change))]
    pub fn process_display_change(
        &mut self,
        info: DisplayInfo,
        change: DisplayChangeType,
        deps: DisplayDeps<'_>,
    ) -> bool {
        let id = info.id;
        let Some(current) = self.displays.get_mut(id) else {
            warn!("change for unknown display ignored");
            return false;
        };
        if change != DisplayChangeType::VirtualPixelRatioChange && !info.rect().is_in_range() {
            warn!(rect = %info.rect(), "display out of range, ignoring change");
            return false;
        }
        match change {
            DisplayChangeType::UpdateRotation | DisplayChangeType::SizeChange => {
                current.x = info.x;
                current.y = info.y;
                current.width = info.width;
                current.height = info.height;
                current.rotation = info.rotation;
            }
            DisplayChangeType::VirtualPixelRatioChange => {
                current.virtual_pixel_ratio = info.virtual_pixel_ratio;
            }
        }
        self.process_cross_display_nodes(deps.tree);

        let mut ctx = LayoutContext {
            tree: deps.tree,
            displays: &self.displays,
            settings: deps.settings,
            outbox: deps.outbox,
        };
        match change {
            DisplayChangeType::VirtualPixelRatioChange => {
                deps.policy.layout_window_tree(&mut ctx, id)
            }
            _ => deps.policy.process_display_size_change(&mut ctx, id),
        }
        self.refresh(deps.tree, deps.outbox);
        true
    }

    /// Offsets a node's request rect into group coordinates when it is added
    /// to a secondary display, and back when it is removed.
    pub fn pre_process_window_node(&self, tree: &mut WindowTree, id: WindowId, is_add: bool) {
        let Some(node) = tree.get_mut(id) else { return };
        if !self.is_multi_display() || node.display_id == DEFAULT_DISPLAY {
            return;
        }
        let Some(info) = self.displays.get(node.display_id) else { return };
        if !node.request_rect.is_empty() {
            node.request_rect = if is_add {
                node.request_rect.translate(info.x, info.y)
            } else {
                node.request_rect.translate(-info.x, -info.y)
            };
        }
        if is_add {
            self.update_shown_displays(tree, id);
        }
    }

    fn update_shown_displays(&self, tree: &mut WindowTree, id: WindowId) {
        let Some(node) = tree.get_mut(id) else { return };
        let rect = if node.window_rect.is_degenerate() { node.request_rect } else { node.window_rect };
        let covering: BTreeSet<DisplayId> = if rect.is_degenerate() {
            BTreeSet::new()
        } else {
            self.displays.displays_covering(&rect).into_iter().collect()
        };
        node.shown_displays = if covering.len() > 1 {
            covering
        } else {
            BTreeSet::from([node.display_id])
        };
        if !node.shown_displays.contains(&node.display_id)
            && let Some(&first) = node.shown_displays.first()
        {
            node.display_id = first;
        }
    }

    /// Recomputes which displays every cross-display node is shown on.
    pub fn process_cross_display_nodes(&self, tree: &mut WindowTree) {
        let ids: Vec<WindowId> = tree
            .nodes()
            .filter(|n| n.is_showing_on_multi_displays() || !self.displays.contains(n.display_id))
            .map(|n| n.id)
            .collect();
        for id in ids {
            self.update_shown_displays(tree, id);
            if let Some(node) = tree.get(id) {
                debug!(window = %id, shown = ?node.shown_displays, "cross display node");
            }
        }
    }

    fn move_window_nodes_to_default_display(
        &self,
        tree: &mut WindowTree,
        display: DisplayId,
    ) -> Vec<WindowId> {
        let offset = self.displays.get(display).map(|d| (d.x, d.y)).unwrap_or_default();
        let default_origin = self.displays.get(DEFAULT_DISPLAY).map(|d| (d.x, d.y)).unwrap_or_default();
        let ids: Vec<WindowId> = tree
            .nodes()
            .filter(|n| n.display_id == display || n.shown_displays.contains(&display))
            .map(|n| n.id)
            .collect();
        let mut moved = Vec::new();
        for id in ids {
            let Some(node) = tree.get_mut(id) else { continue };
            node.shown_displays.remove(&display);
            if node.display_id != display {
                continue;
            }
            if let Some(&other) = node.shown_displays.first() {
                node.display_id = other;
                continue;
            }
            node.display_id = DEFAULT_DISPLAY;
            node.shown_displays.insert(DEFAULT_DISPLAY);
            if !node.request_rect.is_empty() {
                node.request_rect = node
                    .request_rect
                    .translate(default_origin.0 - offset.0, default_origin.1 - offset.1);
            }
            moved.push(id);
        }
        debug!(?moved, "moved to default display");
        moved
    }

    /// Rebuilds the derived per-display caches and reports bar tint changes.
    pub fn refresh(&mut self, tree: &WindowTree, outbox: &mut Outbox) {
        self.rebuild_snapshots(tree);
        self.update_sys_bar_tints(tree, outbox);
    }

    fn rebuild_snapshots(&mut self, tree: &WindowTree) {
        for display in self.displays.ids() {
            let mut per_root = BTreeMap::new();
            for root in [RootType::BelowApp, RootType::App, RootType::AboveApp] {
                let windows: Vec<WindowId> = tree
                    .descendants(tree.root(root))
                    .map(|n| &tree[n])
                    .filter(|n| n.display_id == display || n.shown_displays.contains(&display))
                    .map(|n| n.id)
                    .collect();
                per_root.insert(root, windows);
            }
            self.snapshots.insert(display, per_root);
        }
    }

    /// Bar colours follow the top-most fullscreen app window of the display.
    fn update_sys_bar_tints(&mut self, tree: &WindowTree, outbox: &mut Outbox) {
        let displays: Vec<DisplayId> = self.displays.ids().collect();
        for display in displays {
            let mut bars = BTreeMap::new();
            let mut tints = BTreeMap::new();
            let above = self.display_windows(display, RootType::AboveApp).to_vec();
            let app = self.display_windows(display, RootType::App).to_vec();
            let owner = app
                .iter()
                .rev()
                .filter_map(|&id| tree.get(id))
                .find(|n| n.window_type.is_main() && n.is_visible() && !n.is_floating());
            for bar in SYSTEM_BARS {
                let node = above
                    .iter()
                    .rev()
                    .filter_map(|&id| tree.get(id))
                    .find(|n| n.window_type == bar && n.is_visible());
                if let Some(node) = node {
                    bars.insert(bar, node.id);
                }
                let tint = SystemBarTint {
                    bar,
                    props: owner.map(|n| n.system_bar_props).unwrap_or_default(),
                    region: node.map(|n| n.window_rect).unwrap_or_default(),
                };
                tints.insert(bar, tint);
            }
            self.sys_bar_nodes.insert(display, bars);
            if self.sys_bar_tints.get(&display) != Some(&tints) {
                outbox.push(WmEvent::SystemBarPropsChanged {
                    display,
                    tints: tints.values().copied().collect(),
                });
                self.sys_bar_tints.insert(display, tints);
            }
        }
    }
}
