//! The window aggregate of one display group.
//!
//! [`WindowNodeContainer`] owns the tree and every component that derives
//! state from it. Each public operation runs to completion: it validates its
//! input before touching anything, mutates the tree, lets the active policy
//! lay out what changed, reconciles the avoid areas and bar tints, and then
//! flushes the produced events.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use static_assertions::assert_impl_all;
use tracing::{debug, error, info, instrument, warn};

use crate::common::collections::HashMap;
use crate::common::config::{LayoutMode, LayoutSettings};
use crate::layout_engine::avoid::{AvoidArea, AvoidAreaController, AvoidAreaType};
use crate::layout_engine::display::{DisplayDeps, MultiDisplayController};
use crate::layout_engine::error::{WmError, WmResult};
use crate::layout_engine::events::{EventSender, MinimizeReason, Outbox, WindowStatus, WmEvent};
use crate::layout_engine::policy::{LayoutContext, SplitExit, divider_ratio};
use crate::layout_engine::split::SplitPairs;
use crate::layout_engine::systems::{LayoutPolicy, LayoutPolicyKind};
use crate::model::{
    DEFAULT_DISPLAY, DisplayChangeType, DisplayId, DisplayInfo, NodeId, Rect, RootType,
    WindowFlags, WindowId, WindowMode, WindowNode, WindowProperty, WindowSizeChangeReason,
    WindowTree, WindowType, ZOrder, ZTier,
};

/// Aspect ratios remembered per window name, applied to floating main
/// windows when they are added.
#[derive(Debug, Clone, Default)]
pub struct AspectRatioStore {
    ratios: HashMap<String, f32>,
}

impl AspectRatioStore {
    pub fn new(ratios: impl IntoIterator<Item = (String, f32)>) -> Self {
        AspectRatioStore { ratios: ratios.into_iter().collect() }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.ratios.get(name).copied().filter(|r| *r > 0.0)
    }
}

fn is_focusable(window_type: WindowType) -> bool {
    !window_type.is_system_bar()
        && !matches!(
            window_type,
            WindowType::DockSlice | WindowType::Pointer | WindowType::DraggingEffect
        )
}

pub struct WindowNodeContainer {
    tree: WindowTree,
    displays: MultiDisplayController,
    policy: LayoutPolicyKind,
    avoid: AvoidAreaController,
    split: SplitPairs,
    settings: LayoutSettings,
    outbox: Outbox,
    events_tx: Option<EventSender>,
    focused: Option<WindowId>,
    keyguard_shown: bool,
    aspect_ratios: AspectRatioStore,
    /// Last avoid area reported per display.
    avoid_areas: BTreeMap<DisplayId, AvoidArea>,
}

assert_impl_all!(WindowNodeContainer: Send);

impl WindowNodeContainer {
    pub fn new(default_display: DisplayInfo, settings: LayoutSettings) -> Self {
        let display = default_display.id;
        let mut container = WindowNodeContainer {
            tree: WindowTree::new(),
            displays: MultiDisplayController::new(default_display),
            policy: LayoutPolicyKind::new(settings.default_mode),
            avoid: AvoidAreaController::new(),
            split: SplitPairs::default(),
            settings,
            outbox: Outbox::default(),
            events_tx: None,
            focused: None,
            keyguard_shown: false,
            aspect_ratios: AspectRatioStore::default(),
            avoid_areas: BTreeMap::from([(display, AvoidArea::default())]),
        };
        container.avoid.update_avoid_nodes_map(display, true);
        let (policy, mut ctx) = container.layout_ctx();
        policy.launch(&mut ctx);
        container
    }

    pub fn set_event_sender(&mut self, tx: EventSender) { self.events_tx = Some(tx); }

    pub fn set_aspect_ratio_store(&mut self, store: AspectRatioStore) { self.aspect_ratios = store; }

    pub fn aspect_ratio_store(&self) -> &AspectRatioStore { &self.aspect_ratios }

    pub fn tree(&self) -> &WindowTree { &self.tree }

    pub fn window(&self, id: WindowId) -> Option<&WindowNode> { self.tree.get(id) }

    /// Every window in the arena, attached or not, ordered by id.
    pub fn windows(&self) -> Vec<&WindowNode> {
        let mut windows: Vec<_> = self.tree.nodes().collect();
        windows.sort_by_key(|n| n.id);
        windows
    }

    pub fn displays(&self) -> &MultiDisplayController { &self.displays }

    pub fn policy(&self) -> &LayoutPolicyKind { &self.policy }

    pub fn layout_mode(&self) -> LayoutMode { self.policy.mode() }

    pub fn avoid_controller(&self) -> &AvoidAreaController { &self.avoid }

    pub fn split_pairs(&self) -> &SplitPairs { &self.split }

    pub fn settings(&self) -> &LayoutSettings { &self.settings }

    pub fn get_focus_window(&self) -> Option<WindowId> { self.focused }

    pub fn is_keyguard_shown(&self) -> bool { self.keyguard_shown }

    /// Drains events not yet handed to a sender.
    pub fn take_events(&mut self) -> Vec<WmEvent> { self.outbox.drain().collect() }

    fn layout_ctx(&mut self) -> (&mut LayoutPolicyKind, LayoutContext<'_>) {
        (
            &mut self.policy,
            LayoutContext {
                tree: &mut self.tree,
                displays: self.displays.displays(),
                settings: &self.settings,
                outbox: &mut self.outbox,
            },
        )
    }

    fn display_deps(&mut self) -> (&mut MultiDisplayController, DisplayDeps<'_>) {
        (
            &mut self.displays,
            DisplayDeps {
                tree: &mut self.tree,
                policy: &mut self.policy,
                settings: &self.settings,
                outbox: &mut self.outbox,
            },
        )
    }

    fn flush(&mut self) {
        let Some(tx) = &self.events_tx else { return };
        if !tx.publish(self.outbox.drain()) {
            debug!("event consumer gone");
        }
    }

    /// Brings the derived state up to date and publishes the events.
    fn finish(&mut self) {
        self.sync_avoid_nodes();
        self.displays.refresh(&self.tree, &mut self.outbox);
        self.flush();
    }

    fn keyguard_active(&self) -> bool {
        self.keyguard_shown
            || self
                .tree
                .children(self.tree.root(RootType::AboveApp))
                .iter()
                .any(|&c| self.tree[c].window_type == WindowType::Keyguard && self.tree[c].is_visible())
    }

    fn priority_of(&self, n: NodeId) -> i32 { self.tree[n].window_type.priority(self.keyguard_active()) }

    /// Index of the first sibling that paints above `priority`.
    fn insert_position(&self, parent: NodeId, priority: i32) -> usize {
        let keyguard = self.keyguard_active();
        let children = self.tree.children(parent);
        children
            .iter()
            .position(|&c| self.tree[c].window_type.priority(keyguard) > priority)
            .unwrap_or(children.len())
    }

    fn is_descendant(&self, id: WindowId, of: NodeId) -> bool {
        self.tree.find(id).is_some_and(|n| self.tree.ancestors(n).any(|a| a == of))
    }

    fn check_request_rect(id: WindowId, rect: &Rect) -> WmResult<()> {
        if rect.is_in_range() {
            return Ok(());
        }
        warn!(%rect, "request rect out of range");
        Err(WmError::InvalidParam(format!("window {id} requested {rect}")))
    }

    #[instrument(skip_all, fields(window = %property.id, ty = %property.window_type))]
    pub fn add_window_node(
        &mut self,
        property: WindowProperty,
        parent: Option<WindowId>,
    ) -> WmResult<()> {
        let id = property.id;
        if id == WindowId::INVALID {
            return Err(WmError::InvalidParam(format!("window id {id} is reserved")));
        }
        Self::check_request_rect(id, &property.request_rect)?;
        let Some(root_type) = property.window_type.root_type() else {
            warn!("window type has no root");
            return Err(WmError::InvalidParam(format!("no root for {}", property.window_type)));
        };
        let display = property.display_id;
        if !self.displays.displays().contains(display) {
            warn!(display = %property.display_id, "add on unknown display");
            return Err(WmError::unknown_display(display));
        }

        let root = self.tree.root(root_type);
        let parent_node = match parent {
            None => root,
            Some(parent_id) => {
                let p = self.tree.find(parent_id).ok_or_else(|| WmError::unknown_window(parent_id))?;
                if self.tree.parent(p) != Some(root) {
                    warn!(parent = %parent_id, "parent is not a top-level window of the same root");
                    return Err(WmError::InvalidParam(format!(
                        "window {parent_id} cannot parent window {id}"
                    )));
                }
                if self.tree[p].display_id != display {
                    warn!(parent = %parent_id, "parent lives on another display");
                    return Err(WmError::InvalidParam(format!(
                        "window {parent_id} is not on display {display}"
                    )));
                }
                p
            }
        };

        let n = match self.tree.find(id) {
            Some(n) if self.tree.is_attached(n) => {
                warn!("window already added");
                return Err(WmError::InvalidParam(format!("window {id} already exists")));
            }
            Some(n) => {
                debug!("re-adding detached window");
                self.tree[n].apply_property(&property);
                n
            }
            None => self.tree.insert(WindowNode::new(property)),
        };

        let node = &self.tree[n];
        if node.is_main_floating()
            && let Some(ratio) = self.aspect_ratios.get(&node.name)
        {
            debug!(ratio, "applying remembered aspect ratio");
            let node = &mut self.tree[n];
            node.limits.min_ratio = ratio;
            node.limits.max_ratio = ratio;
        }

        let visible = match parent {
            Some(_) => self.tree[parent_node].current_visibility,
            None => true,
        };
        let node = &mut self.tree[n];
        node.requested_visibility = true;
        node.current_visibility = visible;
        if parent.is_none() {
            for child in self.tree.children(n).to_vec() {
                let child = &mut self.tree[child];
                child.current_visibility = child.requested_visibility;
            }
        }
        let position = self.insert_position(parent_node, self.priority_of(n));
        self.tree.attach(n, parent_node, Some(position));
        self.displays.pre_process_window_node(&mut self.tree, id, true);

        let node = &self.tree[n];
        let partner = if node.window_type.is_main() && node.mode.is_split() {
            self.split.enter(&mut self.tree, &mut self.outbox, id, self.settings.split.split_ratio)
        } else {
            None
        };

        self.assign_z_order();
        let (policy, mut ctx) = self.layout_ctx();
        policy.add_window_node(&mut ctx, id)?;
        if let Some(partner) = partner {
            policy.update_window_node(&mut ctx, partner)?;
        }

        if self.tree[n].is_visible() {
            self.outbox.push(WmEvent::WindowStatusChanged { window: id, status: WindowStatus::Added });
        }
        info!(rect = %self.tree[n].window_rect, "window added");
        self.finish();
        Ok(())
    }

    /// Detaches a window from the tree. Its children stay attached to it and
    /// the node stays known, so it can be added again.
    #[instrument(skip_all, fields(window = %id))]
    pub fn remove_window_node(&mut self, id: WindowId) -> WmResult<()> {
        let n = self.tree.find(id).ok_or(WmError::DestroyedObject(id))?;
        if !self.tree.is_attached(n) {
            warn!("window is not attached");
            return Err(WmError::StateAbnormal(id));
        }
        let held_focus = self.focused.is_some_and(|f| self.is_descendant(f, n));
        let next_focus = if held_focus { self.get_next_focusable_window(id) } else { None };

        self.tree.detach(n);
        let node = &mut self.tree[n];
        node.requested_visibility = false;
        node.current_visibility = false;
        node.decorated = false;
        for child in self.tree.children(n).to_vec() {
            self.tree[child].current_visibility = false;
        }
        let partner = self.split.exit(&mut self.tree, &mut self.outbox, id);

        let (policy, mut ctx) = self.layout_ctx();
        policy.remove_window_node(&mut ctx, id)?;
        if let Some(partner) = partner {
            policy.update_window_node(&mut ctx, partner)?;
        }
        self.displays.pre_process_window_node(&mut self.tree, id, false);

        if held_focus {
            self.move_focus(next_focus);
        }
        self.assign_z_order();
        self.outbox.push(WmEvent::WindowStatusChanged { window: id, status: WindowStatus::Removed });
        info!("window removed");
        self.finish();
        Ok(())
    }

    /// Removes a window and deletes it and its descendants, returning every
    /// deleted id.
    #[instrument(skip_all, fields(window = %id))]
    pub fn destroy_window_node(&mut self, id: WindowId) -> WmResult<Vec<WindowId>> {
        let Some(n) = self.tree.find(id) else {
            warn!("destroy of unknown window");
            return Err(WmError::unknown_window(id));
        };
        if self.tree.is_attached(n) {
            self.remove_window_node(id)?;
        }
        let removed = self.tree.remove_subtree(n);
        if self.focused.is_some_and(|f| removed.contains(&f)) {
            self.focused = None;
        }
        info!(count = removed.len(), "window destroyed");
        self.finish();
        Ok(removed)
    }

    /// Destroys every window, returning their ids.
    #[instrument(skip_all)]
    pub fn destroy(&mut self) -> Vec<WindowId> {
        let tops: Vec<WindowId> = self
            .tree
            .roots()
            .iter()
            .flat_map(|&r| self.tree.children(r).iter().map(|&c| self.tree[c].id))
            .collect();
        let mut removed = Vec::new();
        for id in tops {
            match self.destroy_window_node(id) {
                Ok(ids) => removed.extend(ids),
                Err(err) => warn!(window = %id, %err, "destroy failed"),
            }
        }
        let mut leftovers: Vec<WindowId> = self.tree.window_ids().collect();
        leftovers.sort();
        for id in leftovers {
            if let Some(n) = self.tree.find(id) {
                removed.extend(self.tree.remove_subtree(n));
            }
        }
        self.focused = None;
        info!(count = removed.len(), "container destroyed");
        self.flush();
        removed
    }

    /// Destroys every window owned by a process that went away.
    #[instrument(skip_all, fields(pid))]
    pub fn destroy_window_nodes_of_pid(&mut self, pid: i32) -> Vec<WindowId> {
        let mut targets: Vec<WindowId> =
            self.tree.nodes().filter(|n| n.calling_pid() == pid).map(|n| n.id).collect();
        targets.sort();
        let mut removed = Vec::new();
        for id in targets {
            if !self.tree.contains(id) {
                continue;
            }
            match self.destroy_window_node(id) {
                Ok(ids) => removed.extend(ids),
                Err(err) => warn!(window = %id, %err, "destroy failed"),
            }
        }
        removed
    }

    /// Applies the client-updatable fields of `property` to an existing
    /// window without laying it out.
    #[instrument(skip_all, fields(window = %property.id))]
    pub fn update_window_property(&mut self, property: &WindowProperty) -> WmResult<()> {
        let id = property.id;
        let n = self.tree.find(id).ok_or_else(|| WmError::unknown_window(id))?;
        Self::check_request_rect(id, &property.request_rect)?;
        let node = &self.tree[n];
        let old_mode = node.mode;
        if property.mode != WindowMode::Undefined
            && property.mode != old_mode
            && !node.supports_mode(property.mode)
        {
            warn!(mode = %property.mode, "mode not supported");
            return Err(WmError::InvalidParam(format!("window {id} does not support {}", property.mode)));
        }

        let mut property = property.clone();
        let display = node.display_id;
        if self.displays.is_multi_display()
            && display != DEFAULT_DISPLAY
            && !property.request_rect.is_empty()
            && let Some(info) = self.displays.displays().get(display)
        {
            property.request_rect = property.request_rect.translate(info.x, info.y);
        }
        self.tree[n].apply_property(&property);

        let new_mode = self.tree[n].mode;
        if new_mode != old_mode {
            let partners = self.on_mode_changed(id, old_mode, new_mode);
            self.relayout(&partners);
        }
        Ok(())
    }

    /// Lays a window out again after the client changed it.
    #[instrument(skip_all, fields(window = %id, ?reason))]
    pub fn update_window_node(&mut self, id: WindowId, reason: WindowSizeChangeReason) -> WmResult<()> {
        let n = self.tree.find(id).ok_or_else(|| WmError::unknown_window(id))?;
        if !self.tree.is_attached(n) {
            warn!("update of detached window");
            return Err(WmError::StateAbnormal(id));
        }
        self.tree[n].size_change_reason = reason;
        let (policy, mut ctx) = self.layout_ctx();
        policy.update_window_node(&mut ctx, id)?;

        let node = &self.tree[n];
        let (window_type, display) = (node.window_type, node.display_id);
        if window_type == WindowType::DockSlice && reason == WindowSizeChangeReason::DragEnd {
            self.sync_split_ratio(display);
        }
        if let Some(exit) = self.policy.take_split_exit() {
            self.exit_split_by_divider(exit);
        }
        self.outbox.push(WmEvent::WindowStatusChanged { window: id, status: WindowStatus::Updated });
        self.finish();
        Ok(())
    }

    /// [`Self::update_window_property`] followed by a layout of the window.
    pub fn update_window(&mut self, property: &WindowProperty, reason: WindowSizeChangeReason) -> WmResult<()> {
        self.update_window_property(property)?;
        let attached = self.tree.find(property.id).is_some_and(|n| self.tree.is_attached(n));
        if attached {
            self.update_window_node(property.id, reason)
        } else {
            self.finish();
            Ok(())
        }
    }

    #[instrument(skip_all, fields(window = %id, %mode))]
    pub fn set_window_mode(&mut self, id: WindowId, mode: WindowMode) -> WmResult<()> {
        let n = self.tree.find(id).ok_or_else(|| WmError::unknown_window(id))?;
        let node = &mut self.tree[n];
        if mode == WindowMode::Undefined || !node.supports_mode(mode) {
            warn!("mode not supported");
            return Err(WmError::InvalidParam(format!("window {id} does not support {mode}")));
        }
        if node.mode == mode {
            return Ok(());
        }
        let old = node.mode;
        node.last_mode = old;
        node.mode = mode;
        if mode == WindowMode::Floating && node.request_rect.is_empty() {
            node.request_rect = node.window_rect;
        }
        self.outbox.push(WmEvent::ModeChanged { window: id, mode });
        let partners = self.on_mode_changed(id, old, mode);
        self.relayout(&partners);
        if self.tree.is_attached(n) {
            self.update_window_node(id, WindowSizeChangeReason::Undefined)
        } else {
            self.finish();
            Ok(())
        }
    }

    /// Keeps split pairs in step with a mode change. Returns the windows whose
    /// mode changed as a consequence.
    fn on_mode_changed(&mut self, id: WindowId, old: WindowMode, new: WindowMode) -> Vec<WindowId> {
        let mut changed = Vec::new();
        if old.is_split() && !new.is_split() {
            changed.extend(self.split.exit(&mut self.tree, &mut self.outbox, id));
        }
        let attached_main = self
            .tree
            .find(id)
            .is_some_and(|n| self.tree.is_attached(n) && self.tree[n].window_type.is_main());
        if new.is_split() && attached_main {
            if old.is_split() {
                changed.extend(self.split.exit(&mut self.tree, &mut self.outbox, id));
            }
            let ratio = self.settings.split.split_ratio;
            changed.extend(self.split.enter(&mut self.tree, &mut self.outbox, id, ratio));
        }
        changed
    }

    fn relayout(&mut self, ids: &[WindowId]) {
        let (policy, mut ctx) = self.layout_ctx();
        for &id in ids {
            let attached = ctx.tree.find(id).is_some_and(|n| ctx.tree.is_attached(n));
            if !attached {
                continue;
            }
            if let Err(err) = policy.update_window_node(&mut ctx, id) {
                warn!(window = %id, %err, "relayout failed");
            }
        }
    }

    fn sync_split_ratio(&mut self, display: DisplayId) {
        if let (Some(rects), Some(limit)) =
            (self.policy.split_rects(display), self.policy.limit_rect(display))
        {
            self.split.set_ratio(display, divider_ratio(&rects.divider, &limit));
        }
    }

    fn exit_split_by_divider(&mut self, exit: SplitExit) {
        let kept = self.split.exit_by_divider(&mut self.tree, &mut self.outbox, exit.display, exit.keep);
        if let Some(info) = self.displays.displays().get(exit.display) {
            self.policy.base_mut().init_split_rects(info, &self.settings.split);
        }
        info!(display = %exit.display, ?kept, "split exited by divider");
        self.relayout(&kept);
    }

    #[instrument(skip_all, fields(window = %id))]
    pub fn set_focus_window(&mut self, id: WindowId) -> WmResult<()> {
        if self.focused == Some(id) {
            debug!("focus unchanged");
            return Ok(());
        }
        if !self.tree.get(id).is_some_and(WindowNode::is_visible) {
            warn!("focus on missing or hidden window");
            return Err(WmError::InvalidParam(format!("window {id} cannot take focus")));
        }
        self.move_focus(Some(id));
        self.flush();
        Ok(())
    }

    fn move_focus(&mut self, next: Option<WindowId>) {
        if let Some(old) = self.focused.take() {
            self.focus_event(old, false);
        }
        self.focused = next;
        if let Some(new) = next {
            self.focus_event(new, true);
        }
        debug!(focused = ?self.focused, "focus moved");
    }

    fn focus_event(&mut self, window: WindowId, focused: bool) {
        let Some(node) = self.tree.get(window) else {
            warn!(%window, "focus target vanished");
            return;
        };
        self.outbox.push(WmEvent::FocusChanged {
            window,
            display: node.display_id,
            window_type: node.window_type,
            ability_token: node.ability_token,
            focused,
        });
    }

    /// Numbers every attached node in paint order. Always-on-top windows
    /// additionally carry the upper tier.
    pub fn assign_z_order(&mut self) {
        for (value, n) in self.tree.paint_order().into_iter().enumerate() {
            let node = &mut self.tree[n];
            let tier = if node.window_type.is_on_top_tier() { ZTier::OnTop } else { ZTier::Normal };
            node.z_order = ZOrder { tier, value: value as u32 };
        }
    }

    /// Attached windows, top-most first.
    pub fn traverse_container(&self) -> Vec<WindowId> {
        let mut nodes: Vec<&WindowNode> =
            self.tree.paint_order().into_iter().map(|n| &self.tree[n]).collect();
        nodes.sort_by_key(|n| Reverse(n.z_order));
        nodes.into_iter().map(|n| n.id).collect()
    }

    pub fn get_next_focusable_window(&self, id: WindowId) -> Option<WindowId> {
        let n = self.tree.find(id)?;
        let order = self.traverse_container();
        let index = order.iter().position(|&w| w == id)?;
        order[index + 1..].iter().copied().find(|&w| {
            self.tree
                .get(w)
                .is_some_and(|c| c.is_visible() && is_focusable(c.window_type))
                && !self.is_descendant(w, n)
        })
    }

    /// Whether `id` is the top-most app window, or the top sub-window of the
    /// top-most main window.
    pub fn is_top_app_window(&self, id: WindowId) -> bool {
        let app = self.tree.root(RootType::App);
        let Some(&top) = self.tree.children(app).last() else {
            return false;
        };
        match self.tree.children(top).last() {
            Some(&child) if self.tree[child].window_type.priority(false) > 0 => self.tree[child].id == id,
            _ => self.tree[top].id == id,
        }
    }

    fn raise_in_parent(&mut self, n: NodeId) {
        let Some(parent) = self.tree.parent(n) else { return };
        let priority = self.priority_of(n);
        self.tree.detach(n);
        let position = self.insert_position(parent, priority);
        self.tree.attach(n, parent, Some(position));
    }

    /// Moves a window above its siblings of the same priority.
    #[instrument(skip_all, fields(window = %id))]
    pub fn raise_window_to_top(&mut self, id: WindowId) -> WmResult<()> {
        let n = self.tree.find(id).ok_or_else(|| WmError::unknown_window(id))?;
        if !self.tree.is_attached(n) {
            return Err(WmError::StateAbnormal(id));
        }
        self.raise_in_parent(n);
        self.assign_z_order();
        self.flush();
        Ok(())
    }

    fn raise_split_window(&mut self, id: WindowId) {
        let Some(n) = self.tree.find(id) else { return };
        let display = self.tree[n].display_id;
        let app = self.tree.root(RootType::App);
        let divider = self.tree.children(app).iter().copied().find(|&c| {
            self.tree[c].window_type == WindowType::DockSlice && self.tree[c].display_id == display
        });
        let partner = self.split.partner(id).and_then(|p| self.tree.find(p));
        match (partner, divider) {
            (Some(partner), Some(divider)) => {
                self.raise_in_parent(partner);
                self.raise_in_parent(n);
                self.raise_in_parent(divider);
            }
            _ => self.raise_in_parent(n),
        }
    }

    /// Brings an app window (and its split partner or parent) to the top of
    /// the app layer.
    #[instrument(skip_all, fields(window = %id))]
    pub fn raise_z_order_for_app_window(&mut self, id: WindowId) -> WmResult<()> {
        let n = self.tree.find(id).ok_or_else(|| WmError::unknown_window(id))?;
        if !self.tree.is_attached(n) {
            return Err(WmError::StateAbnormal(id));
        }
        let window_type = self.tree[n].window_type;
        if self.is_top_app_window(id) {
            debug!("already the top app window");
            return Err(WmError::InvalidType(window_type));
        }
        if window_type.is_sub() {
            self.raise_in_parent(n);
            if let Some(parent) = self.tree.parent(n) {
                let parent_node = &self.tree[parent];
                if parent_node.mode.is_split() {
                    let parent_id = parent_node.id;
                    self.raise_split_window(parent_id);
                } else {
                    self.raise_in_parent(parent);
                }
            }
        } else if window_type.is_main() {
            if self.tree[n].mode.is_split() {
                self.raise_split_window(id);
            } else {
                self.raise_in_parent(n);
            }
        }
        self.assign_z_order();
        self.flush();
        Ok(())
    }

    /// Top-most fullscreen app window that draws under the bars.
    pub fn get_top_immersive_node(&self, display: DisplayId) -> Option<WindowId> {
        let app = self.tree.root(RootType::App);
        self.tree
            .children(app)
            .iter()
            .rev()
            .map(|&c| &self.tree[c])
            .find(|n| {
                n.display_id == display && n.mode == WindowMode::Fullscreen && !n.need_avoid()
            })
            .map(|n| n.id)
    }

    fn app_main_windows(&self) -> Vec<&WindowNode> {
        let app = self.tree.root(RootType::App);
        self.tree
            .children(app)
            .iter()
            .map(|&c| &self.tree[c])
            .filter(|n| n.window_type.is_main() && n.is_visible())
            .collect()
    }

    /// Asks the ability layer to minimize every visible app main window except
    /// the listed windows and modes.
    pub fn minimize_app_node_except_options(
        &mut self,
        except_ids: &[WindowId],
        except_modes: &[WindowMode],
        reason: MinimizeReason,
    ) {
        let targets: Vec<WindowId> = self
            .app_main_windows()
            .into_iter()
            .filter(|n| !except_ids.contains(&n.id) && !except_modes.contains(&n.mode))
            .map(|n| n.id)
            .collect();
        for window in targets {
            info!(%window, ?reason, "minimizing");
            self.outbox.minimize(window, reason);
        }
        self.flush();
    }

    pub fn minimize_all_app_windows(&mut self) {
        self.minimize_app_node_except_options(&[], &[], MinimizeReason::MinimizeAll)
    }

    /// Only one fullscreen app window stays up per display.
    #[instrument(skip_all, fields(window = %id))]
    pub fn minimize_other_fullscreen_ability(&mut self, id: WindowId) -> WmResult<()> {
        let display = self.tree.get(id).ok_or_else(|| WmError::unknown_window(id))?.display_id;
        let targets: Vec<WindowId> = self
            .app_main_windows()
            .into_iter()
            .filter(|n| n.id != id && n.display_id == display && n.mode == WindowMode::Fullscreen)
            .map(|n| n.id)
            .collect();
        for window in targets {
            self.outbox.minimize(window, MinimizeReason::OtherFullscreen);
        }
        self.flush();
        Ok(())
    }

    /// Keyguard shown or hidden. The input method follows the keyguard's
    /// priority while it is up, and app windows that may not show over the
    /// keyguard are minimized.
    #[instrument(skip_all, fields(shown))]
    pub fn notify_window_state_change(&mut self, shown: bool) {
        if self.keyguard_shown == shown {
            return;
        }
        self.keyguard_shown = shown;
        let above = self.tree.root(RootType::AboveApp);
        let input_methods: Vec<NodeId> = self
            .tree
            .children(above)
            .iter()
            .copied()
            .filter(|&c| self.tree[c].window_type == WindowType::InputMethodFloat)
            .collect();
        for n in input_methods {
            self.raise_in_parent(n);
        }
        if shown {
            let hidden: Vec<WindowId> = self
                .app_main_windows()
                .into_iter()
                .filter(|n| !n.flags.contains(WindowFlags::SHOW_WHEN_LOCKED))
                .map(|n| n.id)
                .collect();
            for window in hidden {
                self.outbox.minimize(window, MinimizeReason::Keyguard);
            }
        }
        self.assign_z_order();
        info!("keyguard state changed");
        self.finish();
    }

    #[instrument(skip_all, fields(?mode, reorder))]
    pub fn switch_layout_policy(&mut self, mode: LayoutMode, reorder: bool) -> WmResult<()> {
        let (policy, mut ctx) = self.layout_ctx();
        if policy.mode() != mode {
            let from = policy.mode();
            policy.clean(&mut ctx);
            *policy = LayoutPolicyKind::new(mode);
            policy.launch(&mut ctx);
            info!(?from, "layout policy switched");
        } else {
            debug!("layout policy unchanged");
        }
        if reorder {
            policy.reorder(&mut ctx);
        }
        self.finish();
        Ok(())
    }

    pub fn avoid_area(&self, display: DisplayId) -> AvoidArea { self.avoid.avoid_area(display) }

    pub fn get_avoid_area_by_type(&self, id: WindowId, avoid_type: AvoidAreaType) -> WmResult<AvoidArea> {
        let node = self.tree.get(id).ok_or_else(|| WmError::unknown_window(id))?;
        Ok(self.avoid.avoid_area_by_type(node.display_id, avoid_type))
    }

    /// Re-lays out the fullscreen app windows that keep clear of the bars.
    pub fn on_avoid_area_change(&mut self, display_id: DisplayId, area: &AvoidArea) {
        debug!(%display_id, ?area, "avoid area changed");
        let targets: Vec<WindowId> = self
            .app_main_windows()
            .into_iter()
            .filter(|n| n.display_id == display_id && n.mode == WindowMode::Fullscreen && n.need_avoid())
            .map(|n| n.id)
            .collect();
        self.relayout(&targets);
    }

    /// Mirrors the attached bars into the avoid controller and reports
    /// per-display changes of the derived area.
    fn sync_avoid_nodes(&mut self) {
        let displays: Vec<DisplayInfo> = self.displays.displays().iter().cloned().collect();
        for info in displays {
            let display = info.id;
            let mut tracked: BTreeMap<WindowId, Rect> = self
                .avoid
                .avoid_nodes(display)
                .into_iter()
                .map(|(id, _, rect)| (id, rect))
                .collect();
            let current: Vec<(WindowId, WindowType, Rect)> = self
                .tree
                .nodes()
                .filter(|n| n.window_type.is_avoid_area() && n.display_id == display && n.is_visible())
                .map(|n| (n.id, n.window_type, n.window_rect.translate(-info.x, -info.y)))
                .collect();
            for (window, window_type, rect) in current {
                let result = match tracked.remove(&window) {
                    None => self.avoid.add_avoid_area_node(display, window, window_type, rect),
                    Some(old) if old != rect => self.avoid.update_avoid_area_node(display, window, rect),
                    Some(_) => Ok(()),
                };
                if let Err(err) = result {
                    error!(%window, display = %info.id, %err, "avoid bookkeeping out of sync");
                }
            }
            for window in tracked.into_keys() {
                if let Err(err) = self.avoid.remove_avoid_area_node(display, window) {
                    error!(%window, display = %info.id, %err, "avoid bookkeeping out of sync");
                }
            }

            let area = self.avoid.avoid_area(display);
            if self.avoid_areas.get(&display) != Some(&area) {
                self.avoid_areas.insert(display, area);
                self.outbox.push(WmEvent::AvoidAreaChanged { display, area });
                self.on_avoid_area_change(display, &area);
            }
        }
    }

    pub fn process_display_create(
        &mut self,
        info: DisplayInfo,
        all: &BTreeMap<DisplayId, DisplayInfo>,
    ) -> bool {
        let display = info.id;
        let (displays, deps) = self.display_deps();
        if !displays.process_display_create(info, all, deps) {
            return false;
        }
        self.avoid.update_avoid_nodes_map(display, true);
        self.avoid_areas.insert(display, AvoidArea::default());
        self.finish();
        true
    }

    /// Returns the windows moved to the default display, or `None` when the
    /// event was ignored.
    pub fn process_display_destroy(
        &mut self,
        display: DisplayId,
        all: &BTreeMap<DisplayId, DisplayInfo>,
    ) -> Option<Vec<WindowId>> {
        let (displays, deps) = self.display_deps();
        let moved = displays.process_display_destroy(display, all, deps)?;
        self.avoid.update_avoid_nodes_map(display, false);
        self.avoid_areas.remove(&display);
        if self.split.has_pairs(display) {
            let kept = self.split.exit_by_divider(
                &mut self.tree,
                &mut self.outbox,
                display,
                WindowMode::SplitPrimary,
            );
            self.relayout(&kept);
        }
        self.split.forget_display(display);
        self.finish();
        Some(moved)
    }

    pub fn process_display_change(&mut self, info: DisplayInfo, change: DisplayChangeType) -> bool {
        let (displays, deps) = self.display_deps();
        if !displays.process_display_change(info, change, deps) {
            return false;
        }
        self.finish();
        true
    }

    pub fn is_vertical_display(&self, display: DisplayId) -> bool {
        self.displays.displays().is_vertical(display)
    }

    pub fn get_window_count_by_type(&self, window_type: WindowType) -> usize {
        self.tree
            .nodes()
            .filter(|n| n.window_type == window_type)
            .filter(|n| self.tree.find(n.id).is_some_and(|slot| self.tree.is_attached(slot)))
            .count()
    }

    pub fn dump_screen_window_tree(&self) -> String {
        let dump = self.tree.draw_tree();
        debug!("window tree:\n{dump}");
        dump
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::events::channel;
    use crate::model::WindowModeSupport;

    fn w(id: u32) -> WindowId { WindowId(id) }

    fn container() -> WindowNodeContainer {
        WindowNodeContainer::new(DisplayInfo::new(DEFAULT_DISPLAY, 1080, 2340), LayoutSettings::default())
    }

    fn app(id: u32) -> WindowProperty { WindowProperty::new(w(id), WindowType::AppMainWindow) }

    fn sub(id: u32) -> WindowProperty {
        WindowProperty::new(w(id), WindowType::AppSubWindow)
            .with_mode(WindowMode::Floating)
            .with_rect(Rect::new(100, 300, 500, 600))
    }

    #[test]
    fn test_add_rejects_duplicates_and_bad_parents() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        assert!(matches!(c.add_window_node(app(1), None), Err(WmError::InvalidParam(_))));
        assert!(matches!(c.add_window_node(sub(2), Some(w(9))), Err(WmError::InvalidParam(_))));

        c.add_window_node(sub(2), Some(w(1))).unwrap();
        assert!(matches!(c.add_window_node(sub(3), Some(w(2))), Err(WmError::InvalidParam(_))));
        assert!(!c.tree().contains(w(3)));
        assert_eq!(c.tree().check_consistency(), Ok(()));
    }

    #[test]
    fn test_add_on_unknown_display_fails() {
        let mut c = container();
        let err = c.add_window_node(app(1).with_display(DisplayId(4)), None).unwrap_err();
        assert!(matches!(err, WmError::InvalidParam(_)));
        assert!(c.window(w(1)).is_none());
    }

    #[test]
    fn test_remove_keeps_node_for_readd() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(sub(2), Some(w(1))).unwrap();
        c.remove_window_node(w(1)).unwrap();

        let node = c.window(w(1)).unwrap();
        assert!(!node.is_visible());
        assert!(!node.requested_visibility);
        assert!(!c.window(w(2)).unwrap().is_visible());
        assert_eq!(c.remove_window_node(w(1)), Err(WmError::StateAbnormal(w(1))));

        c.add_window_node(app(1), None).unwrap();
        assert!(c.window(w(1)).unwrap().is_visible());
        assert!(c.window(w(2)).unwrap().is_visible());
        assert_eq!(c.tree().check_consistency(), Ok(()));
    }

    #[test]
    fn test_remove_unknown_is_destroyed_object() {
        let mut c = container();
        assert_eq!(c.remove_window_node(w(5)), Err(WmError::DestroyedObject(w(5))));
    }

    #[test]
    fn test_focus_requires_visible_window() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.take_events();
        assert!(matches!(c.set_focus_window(w(9)), Err(WmError::InvalidParam(_))));
        c.set_focus_window(w(1)).unwrap();
        assert_eq!(c.get_focus_window(), Some(w(1)));
        assert!(matches!(
            c.take_events().as_slice(),
            [WmEvent::FocusChanged { window: WindowId(1), focused: true, .. }]
        ));

        c.set_focus_window(w(1)).unwrap();
        assert!(c.take_events().is_empty());

        c.remove_window_node(w(1)).unwrap();
        assert!(matches!(c.set_focus_window(w(1)), Err(WmError::InvalidParam(_))));
    }

    #[test]
    fn test_removing_focused_window_moves_focus() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(app(2), None).unwrap();
        c.set_focus_window(w(2)).unwrap();
        c.take_events();

        c.remove_window_node(w(2)).unwrap();
        assert_eq!(c.get_focus_window(), Some(w(1)));
        let focus: Vec<_> = c
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                WmEvent::FocusChanged { window, focused, .. } => Some((window, focused)),
                _ => None,
            })
            .collect();
        assert_eq!(focus, vec![(w(2), false), (w(1), true)]);
    }

    #[test]
    fn test_z_order_is_monotonic_with_on_top_tier() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(app(2), None).unwrap();
        let pip = WindowProperty::new(w(3), WindowType::Pip)
            .with_mode(WindowMode::Floating)
            .with_rect(Rect::new(600, 1600, 400, 300));
        c.add_window_node(pip, None).unwrap();
        c.add_window_node(app(4), None).unwrap();

        let z = |id| c.window(w(id)).unwrap().z_order;
        assert!(z(2) > z(1));
        assert!(z(4) > z(2));
        assert_eq!(z(3).tier, ZTier::OnTop);
        assert!(z(3) > z(4));
        assert_eq!(c.traverse_container(), vec![w(3), w(4), w(2), w(1)]);
    }

    #[test]
    fn test_raise_app_window() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(app(2), None).unwrap();
        assert!(c.is_top_app_window(w(2)));
        assert!(matches!(c.raise_z_order_for_app_window(w(2)), Err(WmError::InvalidType(_))));

        c.raise_z_order_for_app_window(w(1)).unwrap();
        assert!(c.is_top_app_window(w(1)));
        assert!(c.window(w(1)).unwrap().z_order > c.window(w(2)).unwrap().z_order);
    }

    #[test]
    fn test_raise_sub_window_raises_parent() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(sub(2), Some(w(1))).unwrap();
        c.add_window_node(app(3), None).unwrap();
        c.raise_z_order_for_app_window(w(2)).unwrap();
        assert!(c.is_top_app_window(w(2)));
        assert_eq!(c.traverse_container()[..3], [w(2), w(1), w(3)]);
    }

    #[test]
    fn test_minimize_other_fullscreen() {
        let mut c = container();
        for id in 1..=3 {
            c.add_window_node(app(id), None).unwrap();
        }
        let floating = app(4).with_mode(WindowMode::Floating).with_rect(Rect::new(100, 200, 600, 800));
        c.add_window_node(floating, None).unwrap();
        c.take_events();

        c.minimize_other_fullscreen_ability(w(3)).unwrap();
        let minimized: Vec<_> = c
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                WmEvent::MinimizeRequested { window, reason: MinimizeReason::OtherFullscreen } => Some(window),
                _ => None,
            })
            .collect();
        assert_eq!(minimized, vec![w(1), w(2)]);
    }

    #[test]
    fn test_minimize_except_options() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(app(2).with_mode(WindowMode::Floating), None).unwrap();
        c.add_window_node(app(3), None).unwrap();
        c.take_events();
        c.minimize_app_node_except_options(&[w(3)], &[WindowMode::Floating], MinimizeReason::SplitReplace);
        assert_eq!(
            c.take_events(),
            vec![WmEvent::MinimizeRequested { window: w(1), reason: MinimizeReason::SplitReplace }]
        );
    }

    #[test]
    fn test_destroy_windows_of_pid() {
        let mut c = container();
        c.add_window_node(app(1).with_pid(7), None).unwrap();
        c.add_window_node(sub(2).with_pid(7), Some(w(1))).unwrap();
        c.add_window_node(app(3).with_pid(8), None).unwrap();
        let mut removed = c.destroy_window_nodes_of_pid(7);
        removed.sort();
        assert_eq!(removed, vec![w(1), w(2)]);
        assert!(c.window(w(3)).is_some());
        assert_eq!(c.tree().len(), 1);
    }

    #[test]
    fn test_destroy_returns_every_owned_id() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(sub(2), Some(w(1))).unwrap();
        c.add_window_node(app(3), None).unwrap();
        c.remove_window_node(w(3)).unwrap();
        let mut removed = c.destroy();
        removed.sort();
        assert_eq!(removed, vec![w(1), w(2), w(3)]);
        assert!(c.tree().is_empty());
        assert!(c.destroy().is_empty());
    }

    #[test]
    fn test_split_pairing_on_add_and_remove() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(app(2).with_mode(WindowMode::SplitPrimary), None).unwrap();

        assert_eq!(c.window(w(1)).unwrap().mode, WindowMode::SplitSecondary);
        assert_eq!(c.split_pairs().partner(w(2)), Some(w(1)));
        assert_eq!(c.window(w(2)).unwrap().window_rect, Rect::new(0, 0, 1080, 1166));
        assert_eq!(c.window(w(1)).unwrap().window_rect, Rect::new(0, 1174, 1080, 1166));
        assert!(c.take_events().contains(&WmEvent::SplitDividerRequested {
            display: DEFAULT_DISPLAY,
            create: true
        }));

        c.remove_window_node(w(2)).unwrap();
        let partner = c.window(w(1)).unwrap();
        assert_eq!(partner.mode, WindowMode::Fullscreen);
        assert_eq!(partner.window_rect, Rect::new(0, 0, 1080, 2340));
        assert!(c.take_events().contains(&WmEvent::SplitDividerRequested {
            display: DEFAULT_DISPLAY,
            create: false
        }));
    }

    #[test]
    fn test_set_window_mode() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        let mut fixed = app(2);
        fixed.mode_support = WindowModeSupport::FULLSCREEN;
        c.add_window_node(fixed, None).unwrap();
        c.take_events();

        c.set_window_mode(w(1), WindowMode::Floating).unwrap();
        let node = c.window(w(1)).unwrap();
        assert_eq!(node.mode, WindowMode::Floating);
        assert_eq!(node.last_mode, WindowMode::Fullscreen);
        assert!(c.take_events().contains(&WmEvent::ModeChanged { window: w(1), mode: WindowMode::Floating }));

        assert!(matches!(c.set_window_mode(w(2), WindowMode::Floating), Err(WmError::InvalidParam(_))));
        assert_eq!(c.window(w(2)).unwrap().mode, WindowMode::Fullscreen);
    }

    #[test]
    fn test_update_window_applies_request_rect() {
        let mut c = container();
        let floating = app(1).with_mode(WindowMode::Floating).with_rect(Rect::new(100, 200, 600, 800));
        c.add_window_node(floating.clone(), None).unwrap();
        c.update_window(&floating.with_rect(Rect::new(150, 300, 600, 800)), WindowSizeChangeReason::Move)
            .unwrap();
        assert_eq!(c.window(w(1)).unwrap().window_rect, Rect::new(150, 300, 600, 800));
        assert!(matches!(c.update_window_node(w(9), WindowSizeChangeReason::Move), Err(WmError::InvalidParam(_))));
    }

    #[test]
    fn test_remembered_aspect_ratio_applies_to_floating_main() {
        let mut c = container();
        let property = app(1).with_mode(WindowMode::Floating).with_rect(Rect::new(100, 200, 600, 900));
        c.set_aspect_ratio_store(AspectRatioStore::new([(property.name.clone(), 1.0)]));
        c.add_window_node(property, None).unwrap();
        let node = c.window(w(1)).unwrap();
        assert_eq!(node.limits.min_ratio, 1.0);
        assert_eq!(node.limits.max_ratio, 1.0);
    }

    #[test]
    fn test_keyguard_raises_input_method() {
        let mut c = container();
        let ime = WindowProperty::new(w(1), WindowType::InputMethodFloat).with_rect(Rect::new(0, 1500, 1080, 840));
        let keyguard = WindowProperty::new(w(2), WindowType::Keyguard).with_rect(Rect::new(0, 0, 1080, 2340));
        c.add_window_node(ime, None).unwrap();
        c.add_window_node(app(3), None).unwrap();
        let locked = app(4).with_flags(WindowFlags::SHOW_WHEN_LOCKED);
        c.add_window_node(locked, None).unwrap();
        c.add_window_node(keyguard, None).unwrap();
        assert_eq!(c.traverse_container()[..2], [w(2), w(1)]);
        c.take_events();

        c.notify_window_state_change(true);
        assert!(c.is_keyguard_shown());
        assert_eq!(c.traverse_container()[..2], [w(1), w(2)]);
        let minimized: Vec<_> = c
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                WmEvent::MinimizeRequested { window, reason: MinimizeReason::Keyguard } => Some(window),
                _ => None,
            })
            .collect();
        assert_eq!(minimized, vec![w(3)]);
    }

    #[test]
    fn test_switch_layout_policy() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        assert_eq!(c.layout_mode(), LayoutMode::Cascade);
        c.switch_layout_policy(LayoutMode::Tile, false).unwrap();
        assert_eq!(c.layout_mode(), LayoutMode::Tile);
        c.switch_layout_policy(LayoutMode::Tile, false).unwrap();
        assert_eq!(c.layout_mode(), LayoutMode::Tile);
    }

    #[test]
    fn test_cascade_reorder_floats_app_windows() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(app(2), None).unwrap();
        c.switch_layout_policy(LayoutMode::Cascade, true).unwrap();
        assert!(c.window(w(1)).unwrap().is_floating());
        assert!(c.window(w(2)).unwrap().is_floating());
        assert_ne!(c.window(w(1)).unwrap().window_rect, c.window(w(2)).unwrap().window_rect);
    }

    #[test]
    fn test_events_go_to_sender() {
        let (tx, mut rx) = channel();
        let mut c = container();
        c.set_event_sender(tx);
        c.add_window_node(app(1), None).unwrap();
        assert!(c.take_events().is_empty());
        let mut events = Vec::new();
        while let Ok(delivery) = rx.try_recv() {
            events.push(delivery.event);
        }
        assert!(events.contains(&WmEvent::WindowStatusChanged { window: w(1), status: WindowStatus::Added }));
        assert!(events.iter().any(|e| matches!(e, WmEvent::WindowRectChanged { window: WindowId(1), .. })));
    }

    #[test]
    fn test_avoid_area_by_type_for_window() {
        let mut c = container();
        let bar = WindowProperty::new(w(1), WindowType::NavigationBar).with_rect(Rect::new(0, 2240, 1080, 100));
        c.add_window_node(bar, None).unwrap();
        c.add_window_node(app(2), None).unwrap();
        let area = c.get_avoid_area_by_type(w(2), AvoidAreaType::System).unwrap();
        assert_eq!(area.bottom, Rect::new(0, 2240, 1080, 100));
        assert!(c.get_avoid_area_by_type(w(2), AvoidAreaType::Keyboard).unwrap().is_empty());
        assert!(c.get_avoid_area_by_type(w(5), AvoidAreaType::System).is_err());
    }

    #[test]
    fn test_need_avoid_window_lays_out_around_bars() {
        let mut c = container();
        let status = WindowProperty::new(w(1), WindowType::StatusBar).with_rect(Rect::new(0, 0, 1080, 100));
        c.add_window_node(status, None).unwrap();
        c.add_window_node(app(2).with_flags(WindowFlags::NEED_AVOID), None).unwrap();
        assert_eq!(c.window(w(2)).unwrap().window_rect, Rect::new(0, 100, 1080, 2240));
        assert_eq!(c.get_top_immersive_node(DEFAULT_DISPLAY), None);
        c.add_window_node(app(3), None).unwrap();
        assert_eq!(c.get_top_immersive_node(DEFAULT_DISPLAY), Some(w(3)));
    }

    #[test]
    fn test_window_count_and_dump() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(app(2), None).unwrap();
        c.remove_window_node(w(2)).unwrap();
        assert_eq!(c.get_window_count_by_type(WindowType::AppMainWindow), 1);
        assert!(c.is_vertical_display(DEFAULT_DISPLAY));
        assert!(c.dump_screen_window_tree().contains("AppMainWindow"));
    }

    #[test]
    fn test_zero_sized_display_does_not_clamp_windows() {
        let mut c =
            WindowNodeContainer::new(DisplayInfo::new(DEFAULT_DISPLAY, 0, 0), LayoutSettings::default());
        let mut overlay = WindowProperty::new(w(1), WindowType::VolumeOverlay)
            .with_mode(WindowMode::Floating)
            .with_rect(Rect::new(100, 100, 400, 300));
        overlay.decor_enabled = false;
        c.add_window_node(overlay, None).unwrap();
        assert_eq!(c.window(w(1)).unwrap().window_rect, Rect::new(100, 100, 400, 300));
    }
}
