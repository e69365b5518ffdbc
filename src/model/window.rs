//! Window identity, classification and the per-window record kept in the tree.

use std::collections::BTreeSet;
use std::fmt;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::model::geometry::Rect;
use crate::model::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl WindowId {
    /// Id carried by the root sentinels. Never handed out to a real window.
    pub const INVALID: WindowId = WindowId(0);
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct DisplayId(pub u64);

pub const DEFAULT_DISPLAY: DisplayId = DisplayId(0);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// The three paint layers that partition the window tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum RootType {
    BelowApp,
    App,
    AboveApp,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[derive(IntoPrimitive, TryFromPrimitive, strum::Display)]
pub enum WindowType {
    #[default]
    AppMainWindow = 1,
    Media = 1000,
    AppSubWindow = 1001,
    AppComponent = 1002,
    Wallpaper = 2000,
    Desktop = 2001,
    AppLaunching = 2100,
    DockSlice = 2101,
    IncomingCall = 2102,
    SearchingBar = 2103,
    SystemAlarmWindow = 2104,
    InputMethodFloat = 2105,
    Float = 2106,
    Toast = 2107,
    StatusBar = 2108,
    Panel = 2109,
    Keyguard = 2110,
    VolumeOverlay = 2111,
    NavigationBar = 2112,
    DraggingEffect = 2113,
    Pointer = 2114,
    LauncherRecent = 2115,
    LauncherDock = 2116,
    BootAnimation = 2117,
    FreezeDisplay = 2118,
    VoiceInteraction = 2119,
    FloatCamera = 2120,
    Placeholder = 2121,
    Dialog = 2122,
    Screenshot = 2123,
    InputMethodStatusBar = 2124,
    GlobalSearch = 2125,
    NegativeScreen = 2126,
    SystemToast = 2127,
    SystemFloat = 2128,
    Pip = 2129,
}

impl WindowType {
    fn raw(self) -> u32 { self.into() }

    pub fn is_main(self) -> bool { self == WindowType::AppMainWindow }

    pub fn is_sub(self) -> bool { (1000..1003).contains(&self.raw()) }

    pub fn is_app(self) -> bool { self.is_main() || self.is_sub() }

    pub fn is_below_system(self) -> bool { (2000..2002).contains(&self.raw()) }

    pub fn is_above_system(self) -> bool { (2100..2130).contains(&self.raw()) }

    pub fn is_system(self) -> bool { self.is_below_system() || self.is_above_system() }

    pub fn is_system_bar(self) -> bool {
        matches!(self, WindowType::StatusBar | WindowType::NavigationBar)
    }

    /// Windows whose rect is carved out of every other window's limit rect.
    pub fn is_avoid_area(self) -> bool { self.is_system_bar() }

    pub fn is_app_floating(self) -> bool {
        matches!(self, WindowType::Float | WindowType::FloatCamera)
    }

    /// Always painted above the regular app and system windows.
    pub fn is_on_top_tier(self) -> bool {
        matches!(self, WindowType::Pip | WindowType::FloatCamera | WindowType::Float)
    }

    pub fn root_type(self) -> Option<RootType> {
        if self.is_app() || self == WindowType::DockSlice {
            Some(RootType::App)
        } else if self.is_below_system() {
            Some(RootType::BelowApp)
        } else if self.is_above_system() {
            Some(RootType::AboveApp)
        } else {
            None
        }
    }

    /// Sibling ordering priority. Higher values paint later.
    pub fn priority(self, keyguard_shown: bool) -> i32 {
        match self {
            WindowType::Media => -1,
            WindowType::AppMainWindow => 0,
            WindowType::AppSubWindow | WindowType::AppComponent => 1,
            WindowType::Wallpaper => 0,
            WindowType::Desktop => 1,
            WindowType::DockSlice => 0,
            WindowType::AppLaunching => 101,
            WindowType::InputMethodFloat if keyguard_shown => {
                WindowType::LauncherRecent.priority(false)
            }
            other => other.raw() as i32 - 2000,
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(IntoPrimitive, TryFromPrimitive, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    #[default]
    Undefined = 0,
    Fullscreen = 1,
    SplitPrimary = 100,
    SplitSecondary = 101,
    Floating = 102,
    Pip = 103,
}

impl WindowMode {
    pub fn is_split(self) -> bool {
        matches!(self, WindowMode::SplitPrimary | WindowMode::SplitSecondary)
    }

    /// The other half of a split pair. Non-split modes map to themselves.
    pub fn opposite_split(self) -> WindowMode {
        match self {
            WindowMode::SplitPrimary => WindowMode::SplitSecondary,
            WindowMode::SplitSecondary => WindowMode::SplitPrimary,
            other => other,
        }
    }

    pub fn support_bit(self) -> WindowModeSupport {
        match self {
            WindowMode::Fullscreen => WindowModeSupport::FULLSCREEN,
            WindowMode::Floating => WindowModeSupport::FLOATING,
            WindowMode::SplitPrimary => WindowModeSupport::SPLIT_PRIMARY,
            WindowMode::SplitSecondary => WindowModeSupport::SPLIT_SECONDARY,
            WindowMode::Pip => WindowModeSupport::PIP,
            WindowMode::Undefined => WindowModeSupport::empty(),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WindowModeSupport: u32 {
        const FULLSCREEN = 1 << 0;
        const FLOATING = 1 << 1;
        const SPLIT_PRIMARY = 1 << 2;
        const SPLIT_SECONDARY = 1 << 3;
        const PIP = 1 << 4;
        const ALL = Self::FULLSCREEN.bits()
            | Self::FLOATING.bits()
            | Self::SPLIT_PRIMARY.bits()
            | Self::SPLIT_SECONDARY.bits()
            | Self::PIP.bits();
    }
}

impl Default for WindowModeSupport {
    fn default() -> Self { WindowModeSupport::ALL }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WindowFlags: u32 {
        const NEED_AVOID = 1 << 0;
        const PARENT_LIMIT = 1 << 1;
        const SHOW_WHEN_LOCKED = 1 << 2;
        const FORBID_SPLIT_MOVE = 1 << 3;
        const WATER_MARK = 1 << 4;
        const IS_MODAL = 1 << 5;
    }
}

/// Size constraints in virtual pixels, as set by the application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_ratio: f32,
    pub min_ratio: f32,
}

impl Default for WindowLimits {
    fn default() -> Self {
        WindowLimits {
            max_width: u32::MAX,
            max_height: u32::MAX,
            min_width: 0,
            min_height: 0,
            max_ratio: f32::MAX,
            min_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum WindowSizeChangeReason {
    #[default]
    Undefined,
    Maximize,
    Recover,
    Rotation,
    Drag,
    DragStart,
    DragEnd,
    Resize,
    Move,
    Hide,
    Transform,
    CustomAnimationShow,
    FullToSplit,
    SplitToFull,
}

impl WindowSizeChangeReason {
    pub fn is_drag(self) -> bool {
        matches!(
            self,
            WindowSizeChangeReason::Drag
                | WindowSizeChangeReason::DragStart
                | WindowSizeChangeReason::DragEnd
        )
    }
}

/// Which handle the user grabbed when drag-resizing a floating window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragType {
    #[default]
    Undefined,
    LeftOrRight,
    BottomOrTop,
    LeftTopCorner,
    RightTopCorner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemBarProperty {
    pub enable: bool,
    pub background_color: u32,
    pub content_color: u32,
}

impl Default for SystemBarProperty {
    fn default() -> Self {
        SystemBarProperty {
            enable: true,
            background_color: 0x6600_0000,
            content_color: 0xffee_eeee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ZTier {
    #[default]
    Normal,
    OnTop,
}

/// Two-tier stacking key. Compared by tier first, then by the counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ZOrder {
    pub tier: ZTier,
    pub value: u32,
}

/// Opaque handle to a compositor surface owned by the render layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

/// Client-supplied description of a window, used to create and update nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowProperty {
    pub id: WindowId,
    pub name: String,
    pub window_type: WindowType,
    pub mode: WindowMode,
    pub mode_support: WindowModeSupport,
    pub flags: WindowFlags,
    pub display_id: DisplayId,
    pub request_rect: Rect,
    pub limits: WindowLimits,
    pub calling_pid: i32,
    pub calling_uid: i32,
    pub decor_enabled: bool,
    pub stretchable: bool,
    pub drag_type: DragType,
    pub system_bar_props: SystemBarProperty,
    pub calling_window: Option<WindowId>,
    pub surface: Option<SurfaceHandle>,
    pub ability_token: Option<u64>,
    pub turn_screen_on: bool,
    pub keep_screen_on: bool,
}

impl WindowProperty {
    pub fn new(id: WindowId, window_type: WindowType) -> Self {
        let mode = if window_type.is_app() {
            WindowMode::Fullscreen
        } else {
            WindowMode::Floating
        };
        WindowProperty {
            id,
            window_type,
            mode,
            name: format!("{window_type}{}", id.0),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.request_rect = rect;
        self
    }

    pub fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_display(mut self, display: DisplayId) -> Self {
        self.display_id = display;
        self
    }

    pub fn with_limits(mut self, limits: WindowLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_pid(mut self, pid: i32) -> Self {
        self.calling_pid = pid;
        self
    }
}

/// A single window's persistent record.
#[derive(Debug, Clone, Serialize)]
pub struct WindowNode {
    #[serde(skip)]
    pub(crate) parent: Option<NodeId>,
    #[serde(skip)]
    pub(crate) children: Vec<NodeId>,
    pub(crate) sentinel: Option<RootType>,

    pub id: WindowId,
    pub name: String,
    calling_pid: i32,
    calling_uid: i32,

    pub window_type: WindowType,
    pub mode: WindowMode,
    pub last_mode: WindowMode,
    pub mode_support: WindowModeSupport,
    pub flags: WindowFlags,
    pub display_id: DisplayId,
    pub shown_displays: BTreeSet<DisplayId>,

    pub request_rect: Rect,
    pub window_rect: Rect,
    pub origin_rect: Rect,
    pub last_rect: Rect,
    pub hot_zone_rect: Rect,

    pub limits: WindowLimits,
    pub updated_limits: WindowLimits,

    pub requested_visibility: bool,
    pub current_visibility: bool,

    pub decor_enabled: bool,
    pub decorated: bool,
    pub stretchable: bool,
    pub drag_type: DragType,
    pub size_change_reason: WindowSizeChangeReason,
    pub system_bar_props: SystemBarProperty,
    pub z_order: ZOrder,
    pub calling_window: Option<WindowId>,
    pub surface: Option<SurfaceHandle>,
    pub ability_token: Option<u64>,
    pub turn_screen_on: bool,
    pub keep_screen_on: bool,
}

impl WindowNode {
    pub fn new(property: WindowProperty) -> Self {
        WindowNode {
            parent: None,
            children: Vec::new(),
            sentinel: None,
            id: property.id,
            name: property.name,
            calling_pid: property.calling_pid,
            calling_uid: property.calling_uid,
            window_type: property.window_type,
            mode: property.mode,
            last_mode: property.mode,
            mode_support: property.mode_support,
            flags: property.flags,
            display_id: property.display_id,
            shown_displays: BTreeSet::from([property.display_id]),
            request_rect: property.request_rect,
            window_rect: Rect::ZERO,
            origin_rect: Rect::ZERO,
            last_rect: Rect::ZERO,
            hot_zone_rect: Rect::ZERO,
            limits: property.limits,
            updated_limits: property.limits,
            requested_visibility: false,
            current_visibility: false,
            decor_enabled: property.decor_enabled,
            decorated: false,
            stretchable: property.stretchable,
            drag_type: property.drag_type,
            size_change_reason: WindowSizeChangeReason::Undefined,
            system_bar_props: property.system_bar_props,
            z_order: ZOrder::default(),
            calling_window: property.calling_window,
            surface: property.surface,
            ability_token: property.ability_token,
            turn_screen_on: property.turn_screen_on,
            keep_screen_on: property.keep_screen_on,
        }
    }

    pub(crate) fn root_sentinel(root: RootType) -> Self {
        let mut node = WindowNode::new(WindowProperty {
            name: format!("{root}_root"),
            ..Default::default()
        });
        node.sentinel = Some(root);
        node.requested_visibility = true;
        node.current_visibility = true;
        node
    }

    pub fn is_root(&self) -> bool { self.sentinel.is_some() }

    pub fn calling_pid(&self) -> i32 { self.calling_pid }

    pub fn calling_uid(&self) -> i32 { self.calling_uid }

    pub fn parent(&self) -> Option<NodeId> { self.parent }

    pub fn children(&self) -> &[NodeId] { &self.children }

    pub fn is_visible(&self) -> bool { self.current_visibility }

    pub fn is_floating(&self) -> bool { self.mode == WindowMode::Floating }

    pub fn is_main_floating(&self) -> bool { self.window_type.is_main() && self.is_floating() }

    pub fn need_avoid(&self) -> bool { self.flags.contains(WindowFlags::NEED_AVOID) }

    pub fn is_showing_on_multi_displays(&self) -> bool { self.shown_displays.len() > 1 }

    pub fn supports_mode(&self, mode: WindowMode) -> bool {
        self.mode_support.contains(mode.support_bit())
    }

    /// Applies the client-updatable part of `property` to this node.
    pub fn apply_property(&mut self, property: &WindowProperty) {
        self.request_rect = property.request_rect;
        self.flags = property.flags;
        self.limits = property.limits;
        self.drag_type = property.drag_type;
        self.stretchable = property.stretchable;
        self.system_bar_props = property.system_bar_props;
        self.keep_screen_on = property.keep_screen_on;
        self.turn_screen_on = property.turn_screen_on;
        if property.mode != self.mode && property.mode != WindowMode::Undefined {
            self.last_mode = self.mode;
            self.mode = property.mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_type_classification() {
        assert!(WindowType::AppMainWindow.is_main());
        assert!(WindowType::AppSubWindow.is_sub());
        assert!(WindowType::Media.is_app());
        assert!(WindowType::Wallpaper.is_below_system());
        assert!(WindowType::Pip.is_above_system());
        assert!(!WindowType::Pip.is_below_system());
        assert!(WindowType::StatusBar.is_system_bar());
        assert!(WindowType::NavigationBar.is_avoid_area());
        assert!(!WindowType::InputMethodFloat.is_avoid_area());
        assert!(!WindowType::Toast.is_avoid_area());
    }

    #[test]
    fn test_root_selection() {
        assert_eq!(WindowType::AppMainWindow.root_type(), Some(RootType::App));
        assert_eq!(WindowType::DockSlice.root_type(), Some(RootType::App));
        assert_eq!(WindowType::Desktop.root_type(), Some(RootType::BelowApp));
        assert_eq!(WindowType::NavigationBar.root_type(), Some(RootType::AboveApp));
    }

    #[test]
    fn test_priority_table() {
        assert_eq!(WindowType::Media.priority(false), -1);
        assert_eq!(WindowType::AppSubWindow.priority(false), 1);
        assert_eq!(WindowType::AppLaunching.priority(false), 101);
        assert_eq!(WindowType::InputMethodFloat.priority(false), 105);
        assert_eq!(WindowType::StatusBar.priority(false), 108);
        assert_eq!(WindowType::Keyguard.priority(false), 110);
        assert_eq!(WindowType::NavigationBar.priority(false), 112);
        assert_eq!(WindowType::FreezeDisplay.priority(false), 118);
        assert_eq!(WindowType::InputMethodFloat.priority(true), 115);
    }

    #[test]
    fn test_window_type_round_trips_through_raw() {
        assert_eq!(WindowType::try_from(2108u32).ok(), Some(WindowType::StatusBar));
        assert!(WindowType::try_from(3000u32).is_err());
        assert_eq!(u32::from(WindowType::Pip), 2129);
    }

    #[test]
    fn test_z_order_tier_dominates_value() {
        let on_top = ZOrder { tier: ZTier::OnTop, value: 1 };
        let normal = ZOrder { tier: ZTier::Normal, value: 99 };
        assert!(on_top > normal);
    }

    #[test]
    fn test_apply_property_keeps_last_mode() {
        let prop = WindowProperty::new(WindowId(3), WindowType::AppMainWindow);
        let mut node = WindowNode::new(prop.clone());
        assert_eq!(node.mode, WindowMode::Fullscreen);
        node.apply_property(&prop.with_mode(WindowMode::Floating));
        assert_eq!(node.mode, WindowMode::Floating);
        assert_eq!(node.last_mode, WindowMode::Fullscreen);
    }
}
