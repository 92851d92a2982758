//! The decorated, stackable container a user actually manipulates.
//!
//! A `Frame` holds an ordered sequence of clients (tab order) of which
//! exactly one is active. Everything here is local to one frame; operations
//! that span frames or walk the transient graph live on
//! [`crate::reactor::Reactor`].

use std::cell::Cell;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use strum::Display;

use crate::model::client::ClientId;
use crate::sys::geometry::Rect;
use crate::sys::window_server::{Layer, StackHandle, WorkspaceId};

new_key_type! {
    pub struct FrameId;
}

bitflags! {
    /// Which decoration parts this frame carries; each is independently
    /// togglable.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Decorations: u16 {
        const TITLEBAR = 1 << 0;
        const BORDER   = 1 << 1;
        const HANDLE   = 1 << 2;
        const ICONIFY  = 1 << 3;
        const MAXIMIZE = 1 << 4;
        const CLOSE    = 1 << 5;
        const MENU     = 1 << 6;
        const TAB      = 1 << 7;
    }
}

bitflags! {
    /// Which operations are permitted on this frame.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Functions: u8 {
        const RESIZE   = 1 << 0;
        const MOVE     = 1 << 1;
        const ICONIFY  = 1 << 2;
        const MAXIMIZE = 1 << 3;
        const CLOSE    = 1 << 4;
    }
}

impl Default for Decorations {
    fn default() -> Self { Decorations::all() }
}

impl Default for Functions {
    fn default() -> Self { Functions::all() }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum WmState {
    /// Managed but not yet mapped with a resolved placement.
    #[default]
    Withdrawn,
    Normal,
    Iconic,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Frame {
    pub geometry: Rect,
    pub border_width: u32,
    /// Pre-maximize geometry, saved per axis so clearing one maximize bit
    /// restores only that axis.
    saved_x: i32,
    saved_width: u32,
    saved_y: i32,
    saved_height: u32,

    pub state: WmState,
    pub shaded: bool,
    pub stuck: bool,
    pub max_horz: bool,
    pub max_vert: bool,
    pub moving: bool,
    pub resizing: bool,
    pub focused: bool,

    pub decorations: Decorations,
    pub functions: Functions,

    members: Vec<ClientId>,
    active: Option<ClientId>,

    pub workspace: WorkspaceId,
    pub layer: Layer,
    pub stack: StackHandle,

    /// One-shot guard against logical recursion through the transient graph
    /// (raise/lower/iconify/deiconify cascades). Not a concurrency
    /// primitive; this whole crate runs on one thread.
    #[serde(skip)]
    pub(crate) op_lock: Cell<bool>,
}

impl Frame {
    pub fn new(geometry: Rect, border_width: u32, workspace: WorkspaceId, stack: StackHandle) -> Frame {
        Frame {
            geometry,
            border_width,
            saved_x: geometry.x,
            saved_width: geometry.width,
            saved_y: geometry.y,
            saved_height: geometry.height,
            state: WmState::Withdrawn,
            shaded: false,
            stuck: false,
            max_horz: false,
            max_vert: false,
            moving: false,
            resizing: false,
            focused: false,
            decorations: Decorations::default(),
            functions: Functions::default(),
            members: Vec::new(),
            active: None,
            workspace,
            layer: Layer::NORMAL,
            stack,
            op_lock: Cell::new(false),
        }
    }

    pub fn is_iconic(&self) -> bool { self.state == WmState::Iconic }

    /// Both maximize bits set; "Full" exists only as this conjunction.
    pub fn is_maximized_full(&self) -> bool { self.max_horz && self.max_vert }

    pub fn members(&self) -> &[ClientId] { &self.members }

    pub fn num_clients(&self) -> usize { self.members.len() }

    pub fn active(&self) -> Option<ClientId> { self.active }

    pub fn contains(&self, client: ClientId) -> bool { self.members.contains(&client) }

    fn position_of(&self, client: ClientId) -> Option<usize> {
        self.members.iter().position(|&c| c == client)
    }

    /// Appends to the tab order and makes the newcomer active.
    pub(crate) fn push_member(&mut self, client: ClientId) {
        self.members.push(client);
        self.active = Some(client);
    }

    /// Takes every member out, preserving relative order, for migration into
    /// another frame.
    pub(crate) fn take_members(&mut self) -> Vec<ClientId> {
        self.active = None;
        std::mem::take(&mut self.members)
    }

    /// Appends migrated members to the tab order without touching the
    /// active tab; the caller decides who is active afterwards.
    pub(crate) fn absorb(&mut self, incoming: Vec<ClientId>) {
        self.members.extend(incoming);
        if self.active.is_none() {
            self.active = self.members.first().copied();
        }
    }

    /// Removes `client` from the tab order. If it was active, the neighbor
    /// to its right inherits activity, or the left neighbor when the
    /// removed client was last. Returns false (and changes nothing) for
    /// non-members.
    pub(crate) fn remove_member(&mut self, client: ClientId) -> bool {
        let Some(pos) = self.position_of(client) else {
            return false;
        };
        if self.active == Some(client) {
            self.active = if self.members.len() == 1 {
                None
            } else if pos == self.members.len() - 1 {
                Some(self.members[pos - 1])
            } else {
                Some(self.members[pos + 1])
            };
        }
        self.members.remove(pos);
        true
    }

    pub(crate) fn set_active(&mut self, client: ClientId) -> bool {
        if !self.contains(client) {
            return false;
        }
        self.active = Some(client);
        true
    }

    /// The member after the active one, wrapping.
    pub fn next_member(&self) -> Option<ClientId> {
        let pos = self.position_of(self.active?)?;
        Some(self.members[(pos + 1) % self.members.len()])
    }

    /// The member before the active one, wrapping.
    pub fn prev_member(&self) -> Option<ClientId> {
        let pos = self.position_of(self.active?)?;
        let len = self.members.len();
        Some(self.members[(pos + len - 1) % len])
    }

    pub(crate) fn save_horizontal(&mut self) {
        self.saved_x = self.geometry.x;
        self.saved_width = self.geometry.width;
    }

    pub(crate) fn save_vertical(&mut self) {
        self.saved_y = self.geometry.y;
        self.saved_height = self.geometry.height;
    }

    pub(crate) fn saved_horizontal(&self) -> (i32, u32) { (self.saved_x, self.saved_width) }

    pub(crate) fn saved_vertical(&self) -> (i32, u32) { (self.saved_y, self.saved_height) }

    /// Decoration extent above and below the client area; the resize code
    /// subtracts these before consulting the size hints.
    pub fn decoration_heights(&self, titlebar: u32, handle: u32) -> (u32, u32) {
        let top = if self.decorations.contains(Decorations::TITLEBAR) { titlebar } else { 0 };
        let bottom = if self.decorations.contains(Decorations::HANDLE) { handle } else { 0 };
        (top, bottom)
    }
}

#[cfg(test)]
mod tests {
    use slotmap::{KeyData, SlotMap};

    use super::*;

    fn frame() -> Frame {
        Frame::new(Rect::new(0, 0, 100, 100), 1, WorkspaceId(0), StackHandle::new(1))
    }

    fn ids(n: usize) -> Vec<ClientId> {
        // real keys so equality behaves; the map itself is discarded
        let mut map: SlotMap<ClientId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn removal_advances_active_to_the_right() {
        let mut f = frame();
        let c = ids(3);
        for &id in &c {
            f.push_member(id);
        }
        f.set_active(c[1]);
        assert!(f.remove_member(c[1]));
        assert_eq!(f.active(), Some(c[2]));
        assert_eq!(f.members(), &[c[0], c[2]]);
    }

    #[test]
    fn removing_the_last_member_falls_back_left() {
        let mut f = frame();
        let c = ids(3);
        for &id in &c {
            f.push_member(id);
        }
        // push_member left c[2] active, which is also last
        assert!(f.remove_member(c[2]));
        assert_eq!(f.active(), Some(c[1]));
    }

    #[test]
    fn removing_a_non_member_changes_nothing() {
        let mut f = frame();
        let c = ids(2);
        f.push_member(c[0]);
        assert!(!f.remove_member(c[1]));
        assert_eq!(f.members(), &[c[0]]);
        assert_eq!(f.active(), Some(c[0]));
    }

    #[test]
    fn tab_cycling_wraps() {
        let mut f = frame();
        let c = ids(3);
        for &id in &c {
            f.push_member(id);
        }
        f.set_active(c[2]);
        assert_eq!(f.next_member(), Some(c[0]));
        assert_eq!(f.prev_member(), Some(c[1]));
    }

    #[test]
    fn migration_preserves_relative_order() {
        let mut f = frame();
        let c = ids(3);
        for &id in &c {
            f.push_member(id);
        }
        assert_eq!(f.take_members(), c);
        assert_eq!(f.active(), None);
        assert_eq!(f.num_clients(), 0);
    }

    #[test]
    fn full_is_the_conjunction_of_the_axis_bits() {
        let mut f = frame();
        f.max_horz = true;
        assert!(!f.is_maximized_full());
        f.max_vert = true;
        assert!(f.is_maximized_full());
    }

    #[test]
    fn stale_keydata_is_not_a_member() {
        let mut f = frame();
        let c = ids(1);
        f.push_member(c[0]);
        let stranger = ClientId::from(KeyData::from_ffi(0xdead_beef));
        assert!(!f.contains(stranger));
    }
}
