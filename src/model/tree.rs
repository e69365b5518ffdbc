use std::ops::{Index, IndexMut};

use slotmap::SlotMap;

use crate::common::collections::{FxHashMap, HashMap};
use crate::model::window::{RootType, WindowId, WindowNode};

slotmap::new_key_type! {
    /// Arena slot of a window node.
    pub struct NodeId;
}

/// Arena holding every window node plus the three root sentinels.
///
/// Parent links are plain ids and never own anything; a node's `children`
/// vector is the only ownership edge, ordered bottom to top.
pub struct WindowTree {
    map: SlotMap<NodeId, WindowNode>,
    index: FxHashMap<WindowId, NodeId>,
    below: NodeId,
    app: NodeId,
    above: NodeId,
}

impl Default for WindowTree {
    fn default() -> Self { Self::new() }
}

impl WindowTree {
    pub fn new() -> Self {
        let mut map = SlotMap::with_key();
        let below = map.insert(WindowNode::root_sentinel(RootType::BelowApp));
        let app = map.insert(WindowNode::root_sentinel(RootType::App));
        let above = map.insert(WindowNode::root_sentinel(RootType::AboveApp));
        WindowTree {
            map,
            index: FxHashMap::default(),
            below,
            app,
            above,
        }
    }

    pub fn root(&self, root: RootType) -> NodeId {
        match root {
            RootType::BelowApp => self.below,
            RootType::App => self.app,
            RootType::AboveApp => self.above,
        }
    }

    /// Roots in paint order, bottom first.
    pub fn roots(&self) -> [NodeId; 3] { [self.below, self.app, self.above] }

    pub fn len(&self) -> usize { self.index.len() }

    pub fn is_empty(&self) -> bool { self.index.is_empty() }

    pub fn contains(&self, id: WindowId) -> bool { self.index.contains_key(&id) }

    pub fn find(&self, id: WindowId) -> Option<NodeId> { self.index.get(&id).copied() }

    pub fn get(&self, id: WindowId) -> Option<&WindowNode> { self.find(id).map(|n| &self.map[n]) }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut WindowNode> {
        let node = self.find(id)?;
        self.map.get_mut(node)
    }

    pub fn node(&self, node: NodeId) -> Option<&WindowNode> { self.map.get(node) }

    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ { self.index.keys().copied() }

    pub fn nodes(&self) -> impl Iterator<Item = &WindowNode> + '_ {
        self.map.values().filter(|n| !n.is_root())
    }

    /// Adds a node to the arena without attaching it anywhere.
    pub(crate) fn insert(&mut self, node: WindowNode) -> NodeId {
        let id = node.id;
        let slot = self.map.insert(node);
        self.index.insert(id, slot);
        slot
    }

    /// Links `child` under `parent` at `position` (appended when `None`).
    pub(crate) fn attach(&mut self, child: NodeId, parent: NodeId, position: Option<usize>) {
        if child == parent || !self.map.contains_key(child) || !self.map.contains_key(parent) {
            return;
        }
        self.detach(child);
        let children = &mut self.map[parent].children;
        let at = position.unwrap_or(children.len()).min(children.len());
        children.insert(at, child);
        self.map[child].parent = Some(parent);
    }

    /// Unlinks `child` from its parent. Descendants stay attached to `child`.
    pub(crate) fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.map.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.map.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        self.map[child].parent = None;
    }

    /// Deletes `node` and every descendant from the arena, returning their
    /// window ids in preorder.
    pub(crate) fn remove_subtree(&mut self, node: NodeId) -> Vec<WindowId> {
        if !self.map.contains_key(node) || self.map[node].is_root() {
            return Vec::new();
        }
        self.detach(node);
        let mut removed = Vec::new();
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            let Some(n) = self.map.remove(next) else { continue };
            self.index.remove(&n.id);
            removed.push(n.id);
            stack.extend(n.children.iter().rev());
        }
        removed
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { self.map.get(node).and_then(|n| n.parent) }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.map.get(node).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// Ancestors of `node`, including itself.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = Some(node);
        std::iter::from_fn(move || {
            let cur = next?;
            next = self.parent(cur);
            Some(cur)
        })
    }

    /// The root layer a node is attached under, if any.
    pub fn root_type_of(&self, node: NodeId) -> Option<RootType> {
        self.ancestors(node).find_map(|n| self.map.get(n).and_then(|n| n.sentinel))
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.map.get(node).is_some_and(|n| !n.is_root()) && self.root_type_of(node).is_some()
    }

    pub fn traverse_preorder(&self, start: NodeId) -> PreorderTraversal<'_> {
        PreorderTraversal { tree: self, stack: vec![start] }
    }

    /// Non-root nodes under `root` in preorder.
    pub fn descendants(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.traverse_preorder(root).skip(1)
    }

    /// Every attached node in paint order, bottom first.
    ///
    /// Within a subtree, children with a negative priority paint below their
    /// parent and the rest paint above it.
    pub fn paint_order(&self) -> Vec<NodeId> {
        enum Visit {
            Expand(NodeId),
            Emit(NodeId),
        }

        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<Visit> = self.roots().iter().rev().map(|&r| Visit::Expand(r)).collect();
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Emit(node) => out.push(node),
                Visit::Expand(node) => {
                    let Some(n) = self.map.get(node) else { continue };
                    let (below, above): (Vec<NodeId>, Vec<NodeId>) =
                        n.children.iter().partition(|&&c| {
                            !n.is_root() && self.map[c].window_type.priority(false) < 0
                        });
                    stack.extend(above.iter().rev().map(|&c| Visit::Expand(c)));
                    if !n.is_root() {
                        stack.push(Visit::Emit(node));
                    }
                    stack.extend(below.iter().rev().map(|&c| Visit::Expand(c)));
                }
            }
        }
        out
    }

    /// Checks that parent and child links agree and that every indexed node
    /// hangs off exactly one root.
    pub fn check_consistency(&self) -> Result<(), String> {
        for (slot, node) in &self.map {
            for &child in &node.children {
                match self.map.get(child) {
                    Some(c) if c.parent == Some(slot) => {}
                    _ => return Err(format!("child {child:?} of {} has a stale parent", node.id)),
                }
                if node.children.iter().filter(|&&c| c == child).count() != 1 {
                    return Err(format!("{child:?} listed twice under {}", node.id));
                }
            }
            if let Some(parent) = node.parent
                && !self.map.get(parent).is_some_and(|p| p.children.contains(&slot))
            {
                return Err(format!("{} missing from its parent's children", node.id));
            }
        }
        let mut seen: HashMap<NodeId, RootType> = HashMap::default();
        for root in self.roots() {
            let root_type = self.map[root].sentinel;
            for node in self.descendants(root) {
                if let Some(root_type) = root_type
                    && seen.insert(node, root_type).is_some()
                {
                    return Err(format!("{node:?} reachable from more than one root"));
                }
            }
        }
        Ok(())
    }

    pub fn draw_tree(&self) -> String {
        let mut out = String::new();
        for root in self.roots() {
            let tree = self.ascii_tree(root);
            if ascii_tree::write_tree(&mut out, &tree).is_err() {
                break;
            }
        }
        out
    }

    fn ascii_tree(&self, root: NodeId) -> ascii_tree::Tree {
        let mut built: HashMap<NodeId, ascii_tree::Tree> = HashMap::default();
        let order: Vec<NodeId> = self.traverse_preorder(root).collect();
        for &node in order.iter().rev() {
            let n = &self.map[node];
            let desc = if n.is_root() {
                n.name.clone()
            } else {
                format!(
                    "{} {} {} {} z={}{} {}",
                    n.id,
                    n.window_type,
                    n.mode,
                    n.window_rect,
                    n.z_order.value,
                    if n.z_order.tier == crate::model::window::ZTier::OnTop { "^" } else { "" },
                    if n.current_visibility { "shown" } else { "hidden" },
                )
            };
            let children: Vec<_> = n.children.iter().filter_map(|c| built.remove(c)).collect();
            let tree = if children.is_empty() {
                ascii_tree::Tree::Leaf(vec![desc])
            } else {
                ascii_tree::Tree::Node(desc, children)
            };
            built.insert(node, tree);
        }
        built.remove(&root).unwrap_or_else(|| ascii_tree::Tree::Leaf(Vec::new()))
    }
}

impl Index<NodeId> for WindowTree {
    type Output = WindowNode;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

impl IndexMut<NodeId> for WindowTree {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output { &mut self.map[index] }
}

pub struct PreorderTraversal<'a> {
    tree: &'a WindowTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(n) = self.tree.map.get(node) {
            self.stack.extend(n.children.iter().rev());
        }
        Some(node)
    }
}
