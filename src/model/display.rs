//! Physical display records shared between the display controller and the
//! layout policies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::geometry::Rect;
use crate::model::window::{DEFAULT_DISPLAY, DisplayId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayChangeType {
    UpdateRotation,
    SizeChange,
    VirtualPixelRatioChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub id: DisplayId,
    /// Position of the display in the group coordinate space.
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    pub virtual_pixel_ratio: f32,
}

impl DisplayInfo {
    pub fn new(id: DisplayId, width: u32, height: u32) -> Self {
        DisplayInfo {
            id,
            x: 0,
            y: 0,
            width,
            height,
            rotation: Rotation::Rotation0,
            virtual_pixel_ratio: 1.0,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_vpr(mut self, ratio: f32) -> Self {
        self.virtual_pixel_ratio = ratio;
        self
    }

    pub fn rect(&self) -> Rect { Rect::new(self.x, self.y, self.width, self.height) }

    pub fn is_vertical(&self) -> bool { self.width < self.height }
}

/// Snapshot of every active display, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayGroup {
    displays: BTreeMap<DisplayId, DisplayInfo>,
}

impl DisplayGroup {
    pub fn new(default: DisplayInfo) -> Self {
        let mut displays = BTreeMap::new();
        displays.insert(default.id, default);
        DisplayGroup { displays }
    }

    pub fn get(&self, id: DisplayId) -> Option<&DisplayInfo> { self.displays.get(&id) }

    pub(crate) fn get_mut(&mut self, id: DisplayId) -> Option<&mut DisplayInfo> {
        self.displays.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, info: DisplayInfo) { self.displays.insert(info.id, info); }

    pub(crate) fn remove(&mut self, id: DisplayId) -> Option<DisplayInfo> {
        self.displays.remove(&id)
    }

    pub fn contains(&self, id: DisplayId) -> bool { self.displays.contains_key(&id) }

    pub fn len(&self) -> usize { self.displays.len() }

    pub fn is_empty(&self) -> bool { self.displays.is_empty() }

    pub fn ids(&self) -> impl Iterator<Item = DisplayId> + '_ { self.displays.keys().copied() }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayInfo> { self.displays.values() }

    pub fn is_multi_display(&self) -> bool { self.displays.len() > 1 }

    /// Display rect, or the zero rect for an unknown display.
    pub fn rect(&self, id: DisplayId) -> Rect { self.get(id).map(|d| d.rect()).unwrap_or_default() }

    pub fn vpr(&self, id: DisplayId) -> f32 {
        self.get(id).map(|d| d.virtual_pixel_ratio).unwrap_or(1.0)
    }

    pub fn is_vertical(&self, id: DisplayId) -> bool {
        self.get(id).map(|d| d.is_vertical()).unwrap_or(false)
    }

    /// Bounding box of all displays.
    pub fn group_rect(&self) -> Rect {
        self.displays.values().fold(Rect::ZERO, |acc, d| acc.union(&d.rect()))
    }

    /// Displays whose rect overlaps `rect`, falling back to the default display.
    pub fn displays_covering(&self, rect: &Rect) -> Vec<DisplayId> {
        let ids: Vec<_> = self
            .displays
            .values()
            .filter(|d| d.rect().has_overlap(rect))
            .map(|d| d.id)
            .collect();
        if ids.is_empty() { vec![DEFAULT_DISPLAY] } else { ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> DisplayGroup {
        let mut g = DisplayGroup::new(DisplayInfo::new(DisplayId(0), 1080, 2340));
        g.insert(DisplayInfo::new(DisplayId(1), 1920, 1080).at(1080, 0));
        g
    }

    #[test]
    fn test_group_rect_covers_all_displays() {
        assert_eq!(group().group_rect(), Rect::new(0, 0, 3000, 2340));
    }

    #[test]
    fn test_displays_covering() {
        let g = group();
        assert_eq!(g.displays_covering(&Rect::new(0, 0, 100, 100)), vec![DisplayId(0)]);
        assert_eq!(
            g.displays_covering(&Rect::new(1000, 0, 200, 100)),
            vec![DisplayId(0), DisplayId(1)]
        );
        assert_eq!(g.displays_covering(&Rect::new(-500, -500, 10, 10)), vec![DisplayId(0)]);
    }

    #[test]
    fn test_unknown_display_defaults() {
        let g = group();
        assert_eq!(g.rect(DisplayId(7)), Rect::ZERO);
        assert_eq!(g.vpr(DisplayId(7)), 1.0);
        assert!(g.is_vertical(DisplayId(0)));
        assert!(!g.is_vertical(DisplayId(1)));
    }
}
