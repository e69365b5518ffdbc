//! Status and navigation bar insets per display.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::layout_engine::error::{WmError, WmResult};
use crate::model::{DisplayId, Rect, WindowId, WindowType};

/// Edge rectangles that ordinary windows lay out around, in display-local
/// coordinates. A side nobody occupies is [`Rect::ZERO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvoidArea {
    pub left: Rect,
    pub top: Rect,
    pub right: Rect,
    pub bottom: Rect,
}

impl AvoidArea {
    /// `[left, top, right, bottom]`
    pub fn to_array(&self) -> [Rect; 4] { [self.left, self.top, self.right, self.bottom] }

    pub fn is_empty(&self) -> bool { self.to_array().iter().all(Rect::is_empty) }

    fn slot_mut(&mut self, pos: AvoidPosType) -> &mut Rect {
        match pos {
            AvoidPosType::Left => &mut self.left,
            AvoidPosType::Top => &mut self.top,
            AvoidPosType::Right => &mut self.right,
            AvoidPosType::Bottom => &mut self.bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvoidPosType {
    Left,
    Top,
    Right,
    Bottom,
}

impl AvoidPosType {
    /// Which edge an avoid rect belongs to. Wide rects go to the top when they
    /// start at `y == 0` and to the bottom otherwise; tall rects go to the left
    /// when they start at `x == 0` and to the right otherwise. A square counts
    /// as wide. Degenerate rects have no edge.
    pub fn classify(rect: &Rect) -> Option<AvoidPosType> {
        if rect.is_degenerate() {
            return None;
        }
        Some(if rect.w >= rect.h {
            if rect.y == 0 { AvoidPosType::Top } else { AvoidPosType::Bottom }
        } else if rect.x == 0 {
            AvoidPosType::Left
        } else {
            AvoidPosType::Right
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvoidAreaType {
    System,
    Cutout,
    SystemGesture,
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AvoidNode {
    window_type: WindowType,
    rect: Rect,
}

pub type AvoidAreaListener = Box<dyn FnMut(DisplayId, &AvoidArea) + Send>;

#[derive(Default)]
pub struct AvoidAreaController {
    nodes: BTreeMap<DisplayId, BTreeMap<WindowId, AvoidNode>>,
    listener: Option<AvoidAreaListener>,
}

impl std::fmt::Debug for AvoidAreaController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvoidAreaController").field("nodes", &self.nodes).finish_non_exhaustive()
    }
}

impl AvoidAreaController {
    pub fn new() -> Self { Self::default() }

    pub fn set_listener(&mut self, listener: AvoidAreaListener) { self.listener = Some(listener); }

    pub fn is_avoid_area_node(window_type: WindowType) -> bool { window_type.is_avoid_area() }

    /// Creates or drops the per-display bookkeeping.
    pub fn update_avoid_nodes_map(&mut self, display: DisplayId, add: bool) {
        if add {
            self.nodes.entry(display).or_default();
        } else {
            self.nodes.remove(&display);
        }
    }

    pub fn contains(&self, display: DisplayId, window: WindowId) -> bool {
        self.nodes.get(&display).is_some_and(|m| m.contains_key(&window))
    }

    pub fn add_avoid_area_node(
        &mut self,
        display_id: DisplayId,
        window: WindowId,
        window_type: WindowType,
        rect: Rect,
    ) -> WmResult<()> {
        if !Self::is_avoid_area_node(window_type) {
            return Err(WmError::InvalidType(window_type));
        }
        let nodes = self.nodes.entry(display_id).or_default();
        if nodes.contains_key(&window) {
            warn!(%window, %display_id, "avoid node already tracked");
            return Err(WmError::InvalidParam(format!("avoid node {window} already tracked")));
        }
        nodes.insert(window, AvoidNode { window_type, rect });
        debug!(%window, %display_id, %rect, "avoid node added");
        self.notify(display_id);
        Ok(())
    }

    pub fn update_avoid_area_node(
        &mut self,
        display_id: DisplayId,
        window: WindowId,
        rect: Rect,
    ) -> WmResult<()> {
        let Some(node) = self.nodes.get_mut(&display_id).and_then(|m| m.get_mut(&window)) else {
            warn!(%window, %display_id, "update of untracked avoid node");
            return Err(WmError::InvalidParam(format!("avoid node {window} not tracked")));
        };
        node.rect = rect;
        trace!(%window, %display_id, %rect, "avoid node updated");
        self.notify(display_id);
        Ok(())
    }

    pub fn remove_avoid_area_node(&mut self, display_id: DisplayId, window: WindowId) -> WmResult<()> {
        if self.nodes.get_mut(&display_id).and_then(|m| m.remove(&window)).is_none() {
            warn!(%window, %display_id, "removal of untracked avoid node");
            return Err(WmError::InvalidParam(format!("avoid node {window} not tracked")));
        }
        debug!(%window, %display_id, "avoid node removed");
        self.notify(display_id);
        Ok(())
    }

    /// Current insets of `display`, derived from the tracked nodes.
    pub fn avoid_area(&self, display: DisplayId) -> AvoidArea {
        let mut area = AvoidArea::default();
        let Some(nodes) = self.nodes.get(&display) else {
            return area;
        };
        for (window, node) in nodes {
            match AvoidPosType::classify(&node.rect) {
                Some(pos) => *area.slot_mut(pos) = node.rect,
                None => debug!(%window, rect = %node.rect, "skipping degenerate avoid rect"),
            }
        }
        area
    }

    /// Only [`AvoidAreaType::System`] is tracked here; other types are zero.
    pub fn avoid_area_by_type(&self, display: DisplayId, avoid_type: AvoidAreaType) -> AvoidArea {
        match avoid_type {
            AvoidAreaType::System => self.avoid_area(display),
            other => {
                trace!(?other, "avoid area type not tracked");
                AvoidArea::default()
            }
        }
    }

    /// Tracked avoid windows of `display` with their types.
    pub fn avoid_nodes(&self, display: DisplayId) -> Vec<(WindowId, WindowType, Rect)> {
        self.nodes
            .get(&display)
            .map(|m| m.iter().map(|(id, n)| (*id, n.window_type, n.rect)).collect())
            .unwrap_or_default()
    }

    fn notify(&mut self, display: DisplayId) {
        let area = self.avoid_area(display);
        if let Some(listener) = self.listener.as_mut() {
            listener(display, &area);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn w(id: u32) -> WindowId { WindowId(id) }

    const D: DisplayId = DisplayId(0);

    #[test]
    fn test_status_bar_occupies_top() {
        let mut avoid = AvoidAreaController::new();
        avoid.add_avoid_area_node(D, w(1), WindowType::StatusBar, Rect::new(0, 0, 1080, 100)).unwrap();
        assert_eq!(
            avoid.avoid_area(D).to_array(),
            [Rect::ZERO, Rect::new(0, 0, 1080, 100), Rect::ZERO, Rect::ZERO]
        );
    }

    #[test]
    fn test_classification_heuristic() {
        use AvoidPosType::*;
        assert_eq!(AvoidPosType::classify(&Rect::new(0, 0, 1080, 100)), Some(Top));
        assert_eq!(AvoidPosType::classify(&Rect::new(0, 2200, 1080, 140)), Some(Bottom));
        assert_eq!(AvoidPosType::classify(&Rect::new(0, 0, 100, 1080)), Some(Left));
        assert_eq!(AvoidPosType::classify(&Rect::new(2200, 0, 140, 1080)), Some(Right));
        // Squares count as wide.
        assert_eq!(AvoidPosType::classify(&Rect::new(0, 0, 100, 100)), Some(Top));
        assert_eq!(AvoidPosType::classify(&Rect::new(50, 50, 100, 100)), Some(Bottom));
        // A wide rect floating in the middle is still called bottom.
        assert_eq!(AvoidPosType::classify(&Rect::new(300, 900, 400, 100)), Some(Bottom));
        assert_eq!(AvoidPosType::classify(&Rect::new(0, 0, 0, 100)), None);
    }

    #[test]
    fn test_degenerate_rect_is_skipped() {
        let mut avoid = AvoidAreaController::new();
        avoid.add_avoid_area_node(D, w(1), WindowType::NavigationBar, Rect::new(0, 2200, 1080, 0)).unwrap();
        assert!(avoid.avoid_area(D).is_empty());
    }

    #[test]
    fn test_presence_preconditions() {
        let mut avoid = AvoidAreaController::new();
        let bar = Rect::new(0, 0, 1080, 100);
        assert!(matches!(
            avoid.update_avoid_area_node(D, w(1), bar),
            Err(WmError::InvalidParam(_))
        ));
        assert!(matches!(avoid.remove_avoid_area_node(D, w(1)), Err(WmError::InvalidParam(_))));
        avoid.add_avoid_area_node(D, w(1), WindowType::StatusBar, bar).unwrap();
        assert!(matches!(
            avoid.add_avoid_area_node(D, w(1), WindowType::StatusBar, bar),
            Err(WmError::InvalidParam(_))
        ));
        assert_eq!(
            avoid.add_avoid_area_node(D, w(2), WindowType::Toast, bar),
            Err(WmError::InvalidType(WindowType::Toast))
        );
    }

    #[test]
    fn test_derivation_is_order_independent() {
        let status = Rect::new(0, 0, 1080, 100);
        let nav = Rect::new(0, 2200, 1080, 140);

        let mut a = AvoidAreaController::new();
        a.add_avoid_area_node(D, w(1), WindowType::StatusBar, status).unwrap();
        a.add_avoid_area_node(D, w(2), WindowType::NavigationBar, Rect::new(0, 0, 100, 2340)).unwrap();
        a.update_avoid_area_node(D, w(2), nav).unwrap();

        let mut b = AvoidAreaController::new();
        b.add_avoid_area_node(D, w(3), WindowType::StatusBar, status).unwrap();
        b.add_avoid_area_node(D, w(2), WindowType::NavigationBar, nav).unwrap();
        b.add_avoid_area_node(D, w(1), WindowType::StatusBar, status).unwrap();
        b.remove_avoid_area_node(D, w(3)).unwrap();

        assert_eq!(a.avoid_area(D), b.avoid_area(D));
        assert_eq!(a.avoid_area(D).bottom, nav);
    }

    #[test]
    fn test_by_type_only_honors_system() {
        let mut avoid = AvoidAreaController::new();
        avoid.add_avoid_area_node(D, w(1), WindowType::StatusBar, Rect::new(0, 0, 1080, 100)).unwrap();
        assert!(!avoid.avoid_area_by_type(D, AvoidAreaType::System).is_empty());
        assert!(avoid.avoid_area_by_type(D, AvoidAreaType::Keyboard).is_empty());
        assert!(avoid.avoid_area_by_type(D, AvoidAreaType::Cutout).is_empty());
    }

    #[test]
    fn test_listener_called_on_every_mutation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut avoid = AvoidAreaController::new();
        avoid.set_listener(Box::new(move |display, area| {
            sink.lock().unwrap().push((display, *area));
        }));
        let bar = Rect::new(0, 0, 1080, 100);
        avoid.add_avoid_area_node(D, w(1), WindowType::StatusBar, bar).unwrap();
        avoid.update_avoid_area_node(D, w(1), Rect::new(0, 0, 1080, 120)).unwrap();
        avoid.remove_avoid_area_node(D, w(1)).unwrap();
        let _ = avoid.remove_avoid_area_node(D, w(1));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].1.top, Rect::new(0, 0, 1080, 120));
        assert!(seen[2].1.is_empty());
    }

    #[test]
    fn test_displays_are_independent() {
        let mut avoid = AvoidAreaController::new();
        avoid.update_avoid_nodes_map(DisplayId(1), true);
        avoid.add_avoid_area_node(D, w(1), WindowType::StatusBar, Rect::new(0, 0, 1080, 100)).unwrap();
        assert!(avoid.avoid_area(DisplayId(1)).is_empty());
        avoid.update_avoid_nodes_map(D, false);
        assert!(avoid.avoid_area(D).is_empty());
        assert!(!avoid.contains(D, w(1)));
    }
}
