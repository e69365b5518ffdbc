//! Outbound notifications consumed by the ability and render layers.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{Span, trace};

use crate::layout_engine::avoid::AvoidArea;
use crate::model::{
    DisplayId, Rect, SystemBarProperty, WindowId, WindowMode, WindowSizeChangeReason, WindowType,
};

/// An event together with the span of the request that produced it.
#[derive(Debug)]
pub struct Delivery {
    pub span: Span,
    pub event: WmEvent,
}

pub type EventReceiver = UnboundedReceiver<Delivery>;

/// Publishing end handed to the container. The consumer going away is not an
/// error; later batches are dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: UnboundedSender<Delivery>,
}

pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = unbounded_channel();
    (EventSender { tx }, rx)
}

impl EventSender {
    /// Sends a batch under the current span. Returns `false` once the
    /// receiver is closed.
    pub fn publish(&self, events: impl IntoIterator<Item = WmEvent>) -> bool {
        let span = Span::current();
        for event in events {
            if self.tx.send(Delivery { span: span.clone(), event }).is_err() {
                trace!("event receiver closed");
                return false;
            }
        }
        true
    }

    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    Added,
    Updated,
    Removed,
}

/// Current tint of one system bar on a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemBarTint {
    pub bar: WindowType,
    pub props: SystemBarProperty,
    pub region: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WmEvent {
    FocusChanged {
        window: WindowId,
        display: DisplayId,
        window_type: WindowType,
        ability_token: Option<u64>,
        focused: bool,
    },
    SystemBarPropsChanged {
        display: DisplayId,
        tints: Vec<SystemBarTint>,
    },
    AvoidAreaChanged {
        display: DisplayId,
        area: AvoidArea,
    },
    WindowRectChanged {
        window: WindowId,
        rect: Rect,
        reason: WindowSizeChangeReason,
    },
    MinimizeRequested {
        window: WindowId,
        reason: MinimizeReason,
    },
    WindowStatusChanged {
        window: WindowId,
        status: WindowStatus,
    },
    SplitDividerRequested {
        display: DisplayId,
        create: bool,
    },
    ModeChanged {
        window: WindowId,
        mode: WindowMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimizeReason {
    OtherFullscreen,
    SplitReplace,
    SplitExit,
    LayoutTile,
    LayoutCascade,
    MinimizeAll,
    Keyguard,
}

/// Events produced while handling one request, flushed to the channel when
/// the request completes.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<WmEvent>,
}

impl Outbox {
    pub fn push(&mut self, event: WmEvent) {
        tracing::trace!(?event, "queued");
        self.pending.push(event)
    }

    pub fn rect_changed(&mut self, window: WindowId, rect: Rect, reason: WindowSizeChangeReason) {
        self.push(WmEvent::WindowRectChanged { window, rect, reason })
    }

    pub fn minimize(&mut self, window: WindowId, reason: MinimizeReason) {
        self.push(WmEvent::MinimizeRequested { window, reason })
    }

    pub fn is_empty(&self) -> bool { self.pending.is_empty() }

    pub fn drain(&mut self) -> std::vec::Drain<'_, WmEvent> { self.pending.drain(..) }
}
