pub mod display;
pub mod geometry;
pub mod tree;
pub mod window;

pub use display::{DisplayChangeType, DisplayGroup, DisplayInfo, Rotation};
pub use geometry::Rect;
pub use tree::{NodeId, WindowTree};
pub use window::{
    DEFAULT_DISPLAY, DisplayId, DragType, RootType, SurfaceHandle, SystemBarProperty, WindowFlags,
    WindowId, WindowLimits, WindowMode, WindowModeSupport, WindowNode, WindowProperty,
    WindowSizeChangeReason, WindowType, ZOrder, ZTier,
};
