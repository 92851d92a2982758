//! Observable change notifications.
//!
//! Collaborators (pagers, taskbars, the decoration painter) cannot poke at
//! reactor internals; they learn about changes by draining this queue after
//! each event. The reactor pushes, never reads.

use crate::model::frame::FrameId;
use crate::sys::window_server::{Layer, WindowHandle, WorkspaceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A client's visible title changed.
    TitleChanged(WindowHandle),
    /// Iconic/shaded/stuck/maximize state of a frame changed.
    StateChanged(FrameId),
    /// A different member of the frame became the active tab.
    ActiveTabChanged(FrameId, WindowHandle),
    /// The frame now belongs to another workspace.
    WorkspaceChanged(FrameId, WorkspaceId),
    LayerChanged(FrameId, Layer),
    /// Which frame holds the input focus, if any.
    FocusChanged(Option<FrameId>),
    /// A client set or cleared the urgency hint.
    AttentionChanged(WindowHandle, bool),
    /// Live cell counts ("80x24") while an interactive resize is running.
    ResizeDisplay(FrameId, i32, i32),
    ClientDestroyed(WindowHandle),
    FrameDestroyed(FrameId),
}

#[derive(Debug, Default)]
pub struct Broadcast {
    queue: Vec<Notification>,
}

impl Broadcast {
    pub fn send(&mut self, event: Notification) { self.queue.push(event); }

    pub fn take(&mut self) -> Vec<Notification> { std::mem::take(&mut self.queue) }

    pub fn is_empty(&self) -> bool { self.queue.is_empty() }
}
