use crate::common::collections::BTreeMap;
use crate::common::config::{LayoutMode, LayoutSettings};
use crate::layout_engine::{AvoidArea, WindowNodeContainer, WmError};
use crate::model::{
    DEFAULT_DISPLAY, DisplayChangeType, DisplayId, DisplayInfo, Rect, WindowId, WindowLimits, WindowMode,
    WindowProperty, WindowSizeChangeReason, WindowType,
};

fn w(id: u32) -> WindowId { WindowId(id) }

fn portrait() -> DisplayInfo { DisplayInfo::new(DEFAULT_DISPLAY, 1080, 2340) }

fn container() -> WindowNodeContainer { WindowNodeContainer::new(portrait(), LayoutSettings::default()) }

fn app(id: u32) -> WindowProperty { WindowProperty::new(w(id), WindowType::AppMainWindow) }

fn floating(id: u32, rect: Rect) -> WindowProperty {
    app(id).with_mode(WindowMode::Floating).with_rect(rect)
}

fn sub(id: u32) -> WindowProperty {
    WindowProperty::new(w(id), WindowType::AppSubWindow)
        .with_mode(WindowMode::Floating)
        .with_rect(Rect::new(50, 400, 300, 300))
}

/// Small deterministic generator for operation sequences.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 { self.next() % n }
}

mod scenarios {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn test_status_bar_becomes_top_avoid_area() {
        let mut c = container();
        let bar = WindowProperty::new(w(1), WindowType::StatusBar).with_rect(Rect::new(0, 0, 1080, 100));
        c.add_window_node(bar, None).unwrap();

        assert_eq!(
            c.avoid_controller().avoid_area(DEFAULT_DISPLAY),
            AvoidArea { top: Rect::new(0, 0, 1080, 100), ..AvoidArea::default() }
        );
    }

    #[test]
    fn test_drag_resize_clamps_size_then_ratio() {
        let mut c = container();
        let limits = WindowLimits {
            max_width: 800,
            max_height: 800,
            min_width: 400,
            min_height: 400,
            max_ratio: 2.0,
            min_ratio: 1.0,
        };
        let mut property = floating(1, Rect::new(100, 300, 600, 600)).with_limits(limits);
        property.decor_enabled = false;
        c.add_window_node(property.clone(), None).unwrap();

        c.update_window(&property.with_rect(Rect::new(100, 300, 900, 300)), WindowSizeChangeReason::Drag)
            .unwrap();
        let rect = c.window(w(1)).unwrap().window_rect;
        assert_eq!((rect.w, rect.h), (800, 400));
    }

    #[test]
    fn test_display_create_with_matching_count() {
        let mut c = container();
        let second = DisplayInfo::new(DisplayId(1), 1080, 2340).at(1080, 0);
        let all = BTreeMap::from([(DEFAULT_DISPLAY, portrait()), (DisplayId(1), second.clone())]);
        assert!(c.process_display_create(second, &all));
        assert!(c.displays().has_sys_bar_maps(DEFAULT_DISPLAY));
        assert!(c.displays().has_sys_bar_maps(DisplayId(1)));
    }

    #[test]
    fn test_display_create_with_wrong_count_is_ignored() {
        let mut c = container();
        let second = DisplayInfo::new(DisplayId(1), 1080, 2340).at(1080, 0);
        let third = DisplayInfo::new(DisplayId(2), 1080, 2340).at(2160, 0);
        let all = BTreeMap::from([
            (DEFAULT_DISPLAY, portrait()),
            (DisplayId(1), second.clone()),
            (DisplayId(2), third),
        ]);
        assert!(!c.process_display_create(second, &all));
        assert!(c.displays().has_sys_bar_maps(DEFAULT_DISPLAY));
        assert!(!c.displays().has_sys_bar_maps(DisplayId(1)));
        assert!(!c.displays().is_multi_display());
    }

    #[test]
    fn test_destroy_parent_with_two_children() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        c.add_window_node(sub(2), Some(w(1))).unwrap();
        c.add_window_node(sub(3), Some(w(1))).unwrap();

        let mut removed = c.destroy_window_node(w(1)).unwrap();
        removed.sort();
        assert_eq!(removed, vec![w(1), w(2), w(3)]);
        for id in removed {
            assert!(matches!(c.destroy_window_node(id), Err(WmError::InvalidParam(_))));
        }
        assert!(c.tree().is_empty());
    }

    #[test]
    fn test_far_origin_on_secondary_display_is_invalid() {
        let mut c = container();
        let second = DisplayInfo::new(DisplayId(1), 1080, 2340).at(1080, 0);
        let all = BTreeMap::from([(DEFAULT_DISPLAY, portrait()), (DisplayId(1), second.clone())]);
        assert!(c.process_display_create(second, &all));

        let far = floating(1, Rect::new(i32::MAX - 10, 0, 500, 500)).with_display(DisplayId(1));
        assert!(matches!(c.add_window_node(far, None), Err(WmError::InvalidParam(_))));
        let wide = floating(2, Rect::new(0, 0, u32::MAX, 500));
        assert!(matches!(c.add_window_node(wide, None), Err(WmError::InvalidParam(_))));
        assert!(c.tree().is_empty());

        let edge = Rect::MAX_COORD - 1080 - 500;
        c.add_window_node(floating(3, Rect::new(edge, 0, 500, 500)).with_display(DisplayId(1)), None)
            .unwrap();
        assert_eq!(c.tree().check_consistency(), Ok(()));
    }

    #[test]
    fn test_update_with_malformed_rect_keeps_window() {
        let mut c = container();
        let property = floating(1, Rect::new(100, 300, 600, 800));
        c.add_window_node(property.clone(), None).unwrap();
        let before = c.window(w(1)).unwrap().window_rect;

        let bad = property.with_rect(Rect::new(0, i32::MIN, 600, 800));
        assert!(matches!(
            c.update_window(&bad, WindowSizeChangeReason::Move),
            Err(WmError::InvalidParam(_))
        ));
        let node = c.window(w(1)).unwrap();
        assert_eq!(node.window_rect, before);
        assert!(node.request_rect.is_in_range());
    }

    #[test]
    fn test_display_far_out_is_ignored() {
        let mut c = container();
        let far = DisplayInfo::new(DisplayId(1), 1080, 2340).at(i32::MAX - 100, 0);
        let all = BTreeMap::from([(DEFAULT_DISPLAY, portrait()), (DisplayId(1), far.clone())]);
        assert!(!c.process_display_create(far, &all));
        assert!(!c.displays().has_sys_bar_maps(DisplayId(1)));

        let huge = DisplayInfo::new(DEFAULT_DISPLAY, u32::MAX, 2340);
        assert!(!c.process_display_change(huge, DisplayChangeType::SizeChange));
        assert_eq!(c.displays().displays().rect(DEFAULT_DISPLAY), portrait().rect());
    }

    #[test]
    fn test_display_create_keeps_tracked_geometry() {
        let mut c = container();
        c.add_window_node(app(1), None).unwrap();
        let second = DisplayInfo::new(DisplayId(1), 1080, 2340).at(1080, 0);
        let stale = DisplayInfo::new(DEFAULT_DISPLAY, 720, 1280);
        let all = BTreeMap::from([(DEFAULT_DISPLAY, stale), (DisplayId(1), second.clone())]);
        assert!(c.process_display_create(second, &all));

        assert_eq!(c.displays().displays().rect(DEFAULT_DISPLAY), portrait().rect());
        assert_eq!(c.window(w(1)).unwrap().window_rect, portrait().rect());
    }
}

mod properties {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn random_rect(rng: &mut Lcg) -> Rect {
        Rect::new(
            rng.below(900) as i32,
            rng.below(2000) as i32,
            200 + rng.below(1000) as u32,
            200 + rng.below(1500) as u32,
        )
    }

    /// Applies one random request. Failures are part of the exercise.
    fn random_step(c: &mut WindowNodeContainer, rng: &mut Lcg, next_id: &mut u32) {
        let known: Vec<WindowId> = c.windows().iter().map(|n| n.id).collect();
        let pick = |rng: &mut Lcg| -> Option<WindowId> {
            (!known.is_empty()).then(|| known[rng.below(known.len() as u64) as usize])
        };
        match rng.below(8) {
            0 | 1 => {
                *next_id += 1;
                let _ = c.add_window_node(app(*next_id), None);
            }
            2 => {
                *next_id += 1;
                let _ = c.add_window_node(floating(*next_id, random_rect(rng)), None);
            }
            3 => {
                *next_id += 1;
                let _ = c.add_window_node(sub(*next_id), pick(rng));
            }
            4 => {
                if let Some(id) = pick(rng) {
                    let _ = c.remove_window_node(id);
                }
            }
            5 => {
                if let Some(id) = pick(rng) {
                    let _ = c.destroy_window_node(id);
                }
            }
            6 => {
                if let Some(id) = pick(rng)
                    && let Some(node) = c.window(id)
                    && node.is_floating()
                {
                    let property = WindowProperty::new(id, node.window_type)
                        .with_mode(WindowMode::Floating)
                        .with_rect(random_rect(rng));
                    let _ = c.update_window(&property, WindowSizeChangeReason::Move);
                }
            }
            _ => {
                if let Some(id) = pick(rng) {
                    let mode = if rng.below(2) == 0 { WindowMode::Floating } else { WindowMode::Fullscreen };
                    let _ = c.set_window_mode(id, mode);
                }
            }
        }
    }

    #[test]
    fn test_tree_stays_consistent() {
        for seed in 0..20 {
            let mut rng = Lcg(seed);
            let mut c = container();
            let mut next_id = 0;
            for _ in 0..60 {
                random_step(&mut c, &mut rng, &mut next_id);
                assert_eq!(c.tree().check_consistency(), Ok(()), "seed {seed}");
            }
        }
    }

    #[test]
    fn test_title_bar_stays_on_display() {
        let display = portrait().rect();
        let title = LayoutSettings::default().floating.title_bar_height;
        for seed in 0..20 {
            let mut rng = Lcg(seed);
            let mut c = container();
            let mut next_id = 0;
            for _ in 0..60 {
                random_step(&mut c, &mut rng, &mut next_id);
                for node in c.windows().into_iter().filter(|n| n.is_visible()) {
                    let rect = node.window_rect;
                    let strip = Rect::new(rect.x, rect.y, rect.w, title.min(rect.h));
                    assert!(display.has_overlap(&strip), "seed {seed}: {} at {rect}", node.id);
                    assert!(strip.y >= display.y && strip.bottom() <= display.bottom(), "seed {seed}: {rect}");
                    if !node.is_floating() {
                        assert!(display.contains_rect(&rect), "seed {seed}: {rect}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_later_windows_paint_above() {
        for seed in 0..10 {
            let mut rng = Lcg(seed);
            let mut c = container();
            let mut previous = None;
            for id in 1..=12 {
                let property = if rng.below(2) == 0 {
                    app(id)
                } else {
                    floating(id, Rect::new(100, 300, 500, 600))
                };
                c.add_window_node(property, None).unwrap();
                let z = c.window(w(id)).unwrap().z_order;
                if let Some(previous) = previous {
                    assert!(z > previous, "seed {seed}: window {id}");
                }
                previous = Some(z);
            }
        }
    }

    #[test]
    fn test_destroy_is_exhaustive_and_idempotent() {
        for seed in 0..10 {
            let mut rng = Lcg(seed);
            let mut c = container();
            let children = 1 + rng.below(5) as u32;
            c.add_window_node(app(1), None).unwrap();
            for child in 0..children {
                c.add_window_node(sub(10 + child), Some(w(1))).unwrap();
            }
            let removed = c.destroy_window_node(w(1)).unwrap();
            assert_eq!(removed.len(), children as usize + 1);
            assert!(c.destroy_window_node(w(1)).is_err());
            assert!(c.tree().is_empty());
        }
    }

    #[test]
    fn test_tile_policy_keeps_tree_consistent() {
        let mut rng = Lcg(7);
        let mut c = container();
        c.switch_layout_policy(LayoutMode::Tile, false).unwrap();
        let mut next_id = 0;
        for _ in 0..80 {
            random_step(&mut c, &mut rng, &mut next_id);
            assert_eq!(c.tree().check_consistency(), Ok(()));
        }
        c.destroy();
        assert!(c.tree().is_empty());
    }
}
