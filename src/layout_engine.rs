pub mod avoid;
pub mod container;
pub mod display;
pub mod error;
pub mod events;
pub mod limits;
pub mod policy;
pub mod replay;
pub mod split;
pub mod systems;

pub use avoid::{AvoidArea, AvoidAreaController, AvoidAreaType, AvoidPosType};
pub use container::{AspectRatioStore, WindowNodeContainer};
pub use display::MultiDisplayController;
pub use error::{WmError, WmResult};
pub use events::{
    Delivery, EventReceiver, EventSender, MinimizeReason, Outbox, SystemBarTint, WindowStatus, WmEvent,
    channel,
};
pub use policy::{LayoutContext, SplitExit, SplitRects};
pub use replay::{Record, ReplayRequest, ReplaySummary, Replayer, replay};
pub use split::{SplitPairs, WindowPair};
pub use systems::{CascadePolicy, LayoutPolicy, LayoutPolicyKind, TilePolicy};

#[cfg(test)]
mod tests;
