//! Request recording and offline replay.
//!
//! A recording starts with the layout settings and the default display, one
//! RON value per line, followed by one [`ReplayRequest`] per line.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::config::{LayoutMode, LayoutSettings};
use crate::layout_engine::container::WindowNodeContainer;
use crate::layout_engine::error::WmResult;
use crate::layout_engine::events::WmEvent;
use crate::model::{
    DisplayChangeType, DisplayId, DisplayInfo, WindowId, WindowProperty, WindowSizeChangeReason,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayRequest {
    CreateDisplay(DisplayInfo),
    DestroyDisplay(DisplayId),
    ChangeDisplay(DisplayInfo, DisplayChangeType),
    AddWindow { property: WindowProperty, parent: Option<WindowId> },
    RemoveWindow(WindowId),
    UpdateWindow { property: WindowProperty, reason: WindowSizeChangeReason },
    DestroyWindow(WindowId),
    SetFocus(WindowId),
    SwitchPolicy { mode: LayoutMode, reorder: bool },
}

pub struct Record {
    file: Option<File>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => Some(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            ),
            None => None,
        };
        Ok(Record { file })
    }

    pub fn start(&mut self, settings: &LayoutSettings, display: &DisplayInfo) -> anyhow::Result<()> {
        let Some(file) = self.file.as_mut() else { return Ok(()) };
        let settings = ron::ser::to_string(settings)?;
        let display = ron::ser::to_string(display)?;
        writeln!(file, "{settings}\n{display}")?;
        Ok(())
    }

    pub fn on_request(&mut self, request: &ReplayRequest) -> anyhow::Result<()> {
        let Some(file) = self.file.as_mut() else { return Ok(()) };
        writeln!(file, "{}", ron::ser::to_string(request)?)?;
        Ok(())
    }
}

/// Drives a container from recorded requests, keeping the display list that
/// display create and destroy requests are checked against.
pub struct Replayer {
    container: WindowNodeContainer,
    displays: BTreeMap<DisplayId, DisplayInfo>,
}

impl Replayer {
    pub fn new(settings: LayoutSettings, display: DisplayInfo) -> Self {
        let displays = BTreeMap::from([(display.id, display.clone())]);
        Replayer {
            container: WindowNodeContainer::new(display, settings),
            displays,
        }
    }

    pub fn container(&self) -> &WindowNodeContainer { &self.container }

    pub fn container_mut(&mut self) -> &mut WindowNodeContainer { &mut self.container }

    /// Applies one request. Ignored display events are not errors.
    pub fn apply(&mut self, request: ReplayRequest) -> WmResult<()> {
        debug!(?request, "replaying");
        let c = &mut self.container;
        match request {
            ReplayRequest::CreateDisplay(info) => {
                let mut all = self.displays.clone();
                all.insert(info.id, info.clone());
                if c.process_display_create(info, &all) {
                    self.displays = all;
                }
            }
            ReplayRequest::DestroyDisplay(display) => {
                let mut all = self.displays.clone();
                all.remove(&display);
                if c.process_display_destroy(display, &all).is_some() {
                    self.displays = all;
                }
            }
            ReplayRequest::ChangeDisplay(info, change) => {
                let id = info.id;
                if c.process_display_change(info.clone(), change) {
                    self.displays.insert(id, info);
                }
            }
            ReplayRequest::AddWindow { property, parent } => c.add_window_node(property, parent)?,
            ReplayRequest::RemoveWindow(id) => c.remove_window_node(id)?,
            ReplayRequest::UpdateWindow { property, reason } => c.update_window(&property, reason)?,
            ReplayRequest::DestroyWindow(id) => {
                c.destroy_window_node(id)?;
            }
            ReplayRequest::SetFocus(id) => c.set_focus_window(id)?,
            ReplayRequest::SwitchPolicy { mode, reorder } => c.switch_layout_policy(mode, reorder)?,
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub requests: usize,
    pub failed: usize,
    pub events: usize,
    pub windows: usize,
}

/// Replays a recording, handing every produced event to `on_event`. Failed
/// requests are logged and counted; replay carries on with the next line.
pub fn replay(path: &Path, mut on_event: impl FnMut(WmEvent)) -> anyhow::Result<(Replayer, ReplaySummary)> {
    let file = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let mut lines = file.lines();
    let settings: LayoutSettings =
        ron::de::from_str(&lines.next().context("empty recording")??).context("bad settings line")?;
    let display: DisplayInfo =
        ron::de::from_str(&lines.next().context("expected display line")??).context("bad display line")?;

    let mut replayer = Replayer::new(settings, display);
    let mut summary = ReplaySummary::default();
    for (index, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: ReplayRequest =
            ron::de::from_str(&line).with_context(|| format!("bad request on line {}", index + 3))?;
        summary.requests += 1;
        if let Err(err) = replayer.apply(request) {
            warn!(line = index + 3, %err, "request failed");
            summary.failed += 1;
        }
        for event in replayer.container.take_events() {
            summary.events += 1;
            on_event(event);
        }
    }
    summary.windows = replayer.container.tree().len();
    info!(?summary, "replay finished");
    Ok((replayer, summary))
}
