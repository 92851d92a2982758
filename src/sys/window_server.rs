//! The seam between the core and the X server.
//!
//! The core never talks to the wire. Collaborators feed it parsed intents
//! (see [`crate::reactor::Event`]) and drain a queue of [`Request`]s — the
//! side effects the core wants performed. This module holds the opaque
//! identities shared across that seam and the raw property records the
//! read-hint query interface produces.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

/// Identifies one protocol-level top-level window. Unique and stable for the
/// lifetime of the client, meaningless across restarts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WindowHandle(NonZeroU32);

impl WindowHandle {
    pub fn new(id: u32) -> WindowHandle { WindowHandle(NonZeroU32::new(id).unwrap()) }

    pub fn get(&self) -> u32 { self.0.get() }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0.get())
    }
}

/// Opaque per-frame handle the stacking collaborator keys raise/lower/restack
/// requests on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StackHandle(u64);

impl StackHandle {
    pub fn new(id: u64) -> StackHandle { StackHandle(id) }

    pub fn get(&self) -> u64 { self.0 }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WorkspaceId(pub u32);

impl WorkspaceId {
    pub fn get(&self) -> u32 { self.0 }
}

/// Coarse stacking class, independent of raise/lower order within the class.
/// Higher is nearer the viewer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Layer(pub u8);

impl Layer {
    pub const DESKTOP: Layer = Layer(0);
    pub const BELOW: Layer = Layer(2);
    pub const NORMAL: Layer = Layer(4);
    pub const ABOVE: Layer = Layer(6);
    pub const DOCK: Layer = Layer(8);
    pub const MENU: Layer = Layer(10);

    /// One class up, stopping short of the menu layer — ordinary frames are
    /// never allowed to stack over menus.
    pub fn raised(self) -> Layer { Layer((self.0 + 2).min(Self::MENU.0 - 2)) }

    pub fn lowered(self) -> Layer { Layer(self.0.saturating_sub(2)) }

    pub fn clamp_below_menu(self) -> Layer { Layer(self.0.min(Self::MENU.0 - 2)) }
}

impl Default for Layer {
    fn default() -> Self { Layer::NORMAL }
}

/// Which grip an interactive resize was started from. The left grip anchors
/// the frame's right edge; the right grip anchors the left edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grip {
    Left,
    Right,
}

/// Side effects the core asks the (out-of-scope) executor to perform, in
/// order. Drained with [`crate::reactor::Reactor::take_requests`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Give the window the input focus directly.
    SetInputFocus(WindowHandle),
    /// Ask the client to take focus via the focus-message protocol.
    SendTakeFocus(WindowHandle),
    /// Ask the client to close itself via the close-message protocol.
    SendDelete(WindowHandle),
    /// Terminate the client unconditionally.
    KillClient(WindowHandle),

    ShowFrame(StackHandle),
    HideFrame(StackHandle),
    ShowClient(WindowHandle),
    HideClient(WindowHandle),
    ConfigureFrame(StackHandle, Rect),

    Raise(StackHandle),
    Lower(StackHandle),
    SetLayer(StackHandle, Layer),

    GrabPointer,
    UngrabPointer,
    /// Jump the pointer by a relative delta (workspace warping while moving).
    WarpPointer { dx: i32, dy: i32 },
    /// Switch the visible workspace; emitted mid-move when warping.
    SwitchWorkspace(WorkspaceId),

    /// Rubber-band feedback for non-opaque move and for resize.
    DrawOutline(Rect),
    ClearOutline,

    /// Arm the single-shot auto-raise timer. A later
    /// [`crate::reactor::Event::AutoRaiseElapsed`] reports expiry.
    ScheduleAutoRaise { delay_ms: u64 },
    /// Hand focus back to the focus-history collaborator (revert-on-iconify).
    RevertFocus,
}

/// Raw WM_NORMAL_HINTS as read off the window, fields present only when the
/// client set the corresponding flag. Normalized by
/// [`crate::model::hints::SizeHints::normalize`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSizeHints {
    pub min_size: Option<(u32, u32)>,
    pub max_size: Option<(u32, u32)>,
    pub resize_inc: Option<(u32, u32)>,
    pub base_size: Option<(u32, u32)>,
    /// ((min_x, min_y), (max_x, max_y)) rational pairs.
    pub aspect: Option<((u32, u32), (u32, u32))>,
    /// Raw PWinGravity value; out-of-range values fall back to NorthWest.
    pub gravity: Option<u8>,
}

/// Raw WM_HINTS.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWmHints {
    pub accepts_input: Option<bool>,
    pub initially_iconic: bool,
    pub urgent: bool,
    pub window_group: Option<WindowHandle>,
}

/// WM_PROTOCOLS participation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocols {
    pub take_focus: bool,
    pub delete_window: bool,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Normal,
    Dialog,
    Dock,
    Splash,
    Desktop,
    Menu,
}

/// Everything the core needs to adopt a window, assembled by the event
/// dispatcher through the read-hint query interface.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub geometry: Rect,
    pub title: String,
    pub instance_name: String,
    pub class_name: String,
    pub window_type: WindowType,
    pub size_hints: RawSizeHints,
    pub wm_hints: RawWmHints,
    pub protocols: Protocols,
    pub transient_for: Option<WindowHandle>,
    pub modal: bool,
}

/// The read-hint query interface: how raw property values are obtained from
/// the server. The dispatch loop implements this over the transport; tests
/// implement it over a table.
pub trait HintSource {
    fn geometry(&self, win: WindowHandle) -> Option<Rect>;
    fn title(&self, win: WindowHandle) -> Option<String>;
    fn class_hint(&self, win: WindowHandle) -> Option<(String, String)>;
    fn window_type(&self, win: WindowHandle) -> Option<WindowType>;
    fn size_hints(&self, win: WindowHandle) -> Option<RawSizeHints>;
    fn wm_hints(&self, win: WindowHandle) -> Option<RawWmHints>;
    fn protocols(&self, win: WindowHandle) -> Option<Protocols>;
    fn transient_for(&self, win: WindowHandle) -> Option<WindowHandle>;
}

impl WindowInfo {
    /// Assembles adoption info for `win`. Missing properties fall back to
    /// defaults; this never fails.
    pub fn read_from(source: &impl HintSource, win: WindowHandle) -> WindowInfo {
        let (instance_name, class_name) = source.class_hint(win).unwrap_or_default();
        WindowInfo {
            geometry: source.geometry(win).unwrap_or(Rect::new(0, 0, 1, 1)),
            title: source.title(win).unwrap_or_default(),
            instance_name,
            class_name,
            window_type: source.window_type(win).unwrap_or_default(),
            size_hints: source.size_hints(win).unwrap_or_default(),
            wm_hints: source.wm_hints(win).unwrap_or_default(),
            protocols: source.protocols(win).unwrap_or_default(),
            transient_for: source.transient_for(win),
            modal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_never_raises_into_menu() {
        assert_eq!(Layer::NORMAL.raised(), Layer::ABOVE);
        assert_eq!(Layer::ABOVE.raised(), Layer::DOCK);
        assert_eq!(Layer::DOCK.raised(), Layer::DOCK);
        assert_eq!(Layer::MENU.clamp_below_menu(), Layer::DOCK);
    }

    #[test]
    fn layer_lowering_saturates() {
        assert_eq!(Layer::NORMAL.lowered(), Layer::BELOW);
        assert_eq!(Layer::DESKTOP.lowered(), Layer::DESKTOP);
    }
}
