//! Split-screen pairing.
//!
//! A split pair is one primary and one secondary app main window on the same
//! display sharing it across the divider. Pairs are recorded here; their
//! geometry lives in the policy's split rects.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::layout_engine::events::{MinimizeReason, Outbox, WmEvent};
use crate::model::{DisplayId, RootType, WindowId, WindowMode, WindowTree};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPair {
    pub primary: WindowId,
    pub secondary: WindowId,
    pub ratio: f32,
}

impl WindowPair {
    pub fn contains(&self, id: WindowId) -> bool { self.primary == id || self.secondary == id }

    pub fn other(&self, id: WindowId) -> WindowId {
        if self.primary == id { self.secondary } else { self.primary }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SplitPairs {
    pairs: BTreeMap<DisplayId, Vec<WindowPair>>,
    /// A split window still waiting for its other half.
    pending: BTreeMap<DisplayId, WindowId>,
}

impl SplitPairs {
    pub fn pairs(&self, display: DisplayId) -> &[WindowPair] {
        self.pairs.get(&display).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_pairs(&self, display: DisplayId) -> bool { !self.pairs(display).is_empty() }

    pub fn pair_of(&self, id: WindowId) -> Option<(DisplayId, WindowPair)> {
        self.pairs
            .iter()
            .find_map(|(&d, pairs)| pairs.iter().find(|p| p.contains(id)).map(|p| (d, *p)))
    }

    pub fn partner(&self, id: WindowId) -> Option<WindowId> {
        self.pair_of(id).map(|(_, pair)| pair.other(id))
    }

    pub fn pending(&self, display: DisplayId) -> Option<WindowId> {
        self.pending.get(&display).copied()
    }

    pub fn set_ratio(&mut self, display: DisplayId, ratio: f32) {
        for pair in self.pairs.entry(display).or_default() {
            pair.ratio = ratio;
        }
    }

    pub fn forget_display(&mut self, display: DisplayId) {
        self.pairs.remove(&display);
        self.pending.remove(&display);
    }

    /// Pairs the split window `id` with a partner on its display.
    ///
    /// The partner is a waiting split window of the opposite mode, or else the
    /// top-most fullscreen app main window, which is switched to the opposite
    /// split mode. Other app main windows, except floating ones, are
    /// minimized. Without a partner the window waits for one.
    pub(crate) fn enter(
        &mut self,
        tree: &mut WindowTree,
        outbox: &mut Outbox,
        id: WindowId,
        ratio: f32,
    ) -> Option<WindowId> {
        if let Some(partner) = self.partner(id) {
            return Some(partner);
        }
        let node = tree.get(id)?;
        let (display_id, mode) = (node.display_id, node.mode);
        if !mode.is_split() {
            return None;
        }
        let wanted = mode.opposite_split();

        let waiting = self.pending(display_id).filter(|&p| {
            p != id && tree.get(p).is_some_and(|n| n.mode == wanted && n.is_visible())
        });
        let app = tree.root(RootType::App);
        let partner = waiting.or_else(|| {
            tree.children(app)
                .iter()
                .rev()
                .map(|&c| &tree[c])
                .find(|n| {
                    n.id != id
                        && n.window_type.is_main()
                        && n.display_id == display_id
                        && n.is_visible()
                        && (n.mode == WindowMode::Fullscreen || n.mode == wanted)
                        && n.supports_mode(wanted)
                        && self.partner(n.id).is_none()
                })
                .map(|n| n.id)
        });
        let Some(partner) = partner else {
            debug!(window = %id, %display_id, "split window waiting for a partner");
            self.pending.insert(display_id, id);
            return None;
        };
        self.pending.remove(&display_id);

        if let Some(node) = tree.get_mut(partner)
            && node.mode != wanted
        {
            node.last_mode = node.mode;
            node.mode = wanted;
            outbox.push(WmEvent::ModeChanged { window: partner, mode: wanted });
        }

        let others: Vec<WindowId> = tree
            .children(app)
            .iter()
            .map(|&c| &tree[c])
            .filter(|n| {
                n.window_type.is_main()
                    && n.display_id == display_id
                    && n.is_visible()
                    && n.id != id
                    && n.id != partner
                    && !n.is_floating()
                    && n.mode != WindowMode::Pip
                    && self.partner(n.id).is_none()
            })
            .map(|n| n.id)
            .collect();
        for other in others {
            outbox.minimize(other, MinimizeReason::SplitReplace);
        }

        let pair = if mode == WindowMode::SplitPrimary {
            WindowPair { primary: id, secondary: partner, ratio }
        } else {
            WindowPair { primary: partner, secondary: id, ratio }
        };
        if !self.has_pairs(display_id) {
            outbox.push(WmEvent::SplitDividerRequested { display: display_id, create: true });
        }
        info!(primary = %pair.primary, secondary = %pair.secondary, %display_id, "split pair created");
        self.pairs.entry(display_id).or_default().push(pair);
        Some(partner)
    }

    /// Dissolves the pair holding `id`; the partner resumes its previous
    /// mode. Returns the partner.
    pub(crate) fn exit(
        &mut self,
        tree: &mut WindowTree,
        outbox: &mut Outbox,
        id: WindowId,
    ) -> Option<WindowId> {
        self.pending.retain(|_, &mut p| p != id);
        let (display_id, pair) = self.pair_of(id)?;
        if let Some(pairs) = self.pairs.get_mut(&display_id) {
            pairs.retain(|p| !p.contains(id));
        }
        let partner = pair.other(id);
        resume_last_mode(tree, outbox, partner);
        if !self.has_pairs(display_id) {
            outbox.push(WmEvent::SplitDividerRequested { display: display_id, create: false });
        }
        info!(window = %id, %partner, %display_id, "split pair dissolved");
        Some(partner)
    }

    /// Leaves split mode on `display` after a divider drag, keeping the half
    /// in `keep` and minimizing the other.
    pub(crate) fn exit_by_divider(
        &mut self,
        tree: &mut WindowTree,
        outbox: &mut Outbox,
        display: DisplayId,
        keep: WindowMode,
    ) -> Vec<WindowId> {
        let pairs = self.pairs.remove(&display).unwrap_or_default();
        let mut kept = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let (stay, leave) = if keep == WindowMode::SplitPrimary {
                (pair.primary, pair.secondary)
            } else {
                (pair.secondary, pair.primary)
            };
            outbox.minimize(leave, MinimizeReason::SplitExit);
            resume_last_mode(tree, outbox, stay);
            kept.push(stay);
        }
        if !kept.is_empty() {
            outbox.push(WmEvent::SplitDividerRequested { display, create: false });
        }
        kept
    }
}

fn resume_last_mode(tree: &mut WindowTree, outbox: &mut Outbox, id: WindowId) {
    let Some(node) = tree.get_mut(id) else { return };
    let mode = match node.last_mode {
        WindowMode::Undefined | WindowMode::SplitPrimary | WindowMode::SplitSecondary => {
            WindowMode::Fullscreen
        }
        other => other,
    };
    node.last_mode = node.mode;
    node.mode = mode;
    outbox.push(WmEvent::ModeChanged { window: id, mode });
}
