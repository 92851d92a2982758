//! The reactor owns the whole client/frame graph and keeps it coherent.
//!
//! It consumes a sequential stream of already-parsed protocol intents
//! ([`Event`]) — the dispatch loop and transport live elsewhere — and runs
//! every transition, including cascades through the transient graph, to
//! completion before returning. Side effects toward the server come out as
//! [`Request`]s, observable changes as
//! [`broadcast::Notification`]s; the caller drains both queues between
//! events. Strictly single-threaded; the only guards in here are against
//! logical recursion, not other threads.

pub mod broadcast;
mod lifecycle;
mod moveresize;
mod stacking;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

pub use broadcast::Notification;
use broadcast::Broadcast;
use moveresize::DragState;

use crate::common::collections::HashMap;
use crate::common::config::Config;
use crate::model::client::{Client, ClientId, FocusModel};
use crate::model::frame::{Decorations, Frame, FrameId, Functions, WmState};
use crate::model::session::{ClientKey, SavedAttributes, SessionStore};
use crate::model::transient::{
    self, TransientWaitList, root_transient_for, set_transient_for,
};
use crate::sys::geometry::Rect;
use crate::sys::window_server::{
    Grip, Layer, Protocols, RawSizeHints, RawWmHints, Request, StackHandle, WindowHandle,
    WindowInfo, WindowType, WorkspaceId,
};

/// A parsed protocol intent. Events are processed strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// The screen layout changed. Always the first event sent on startup;
    /// the primary head is first in the list.
    ScreenParametersChanged(Vec<Rect>),
    /// The visible workspace changed, or the workspace count did.
    WorkspaceChanged { current: WorkspaceId, count: u32 },

    /// A top-level window asked to be managed, with the property bundle the
    /// dispatcher assembled through the read-hint interface.
    WindowMapped(WindowHandle, WindowInfo),
    /// The client withdrew its window.
    WindowUnmapped(WindowHandle),
    /// The window is gone from the server.
    WindowDestroyed(WindowHandle),

    TransientForChanged(WindowHandle, Option<WindowHandle>),
    SizeHintsChanged(WindowHandle, RawSizeHints),
    WmHintsChanged(WindowHandle, RawWmHints),
    ProtocolsChanged(WindowHandle, Protocols),
    TitleChanged(WindowHandle, String),
    ModalChanged(WindowHandle, bool),
    /// The client asked for a geometry itself; hint-violating requests are
    /// clamped, never rejected.
    ConfigureRequested(WindowHandle, Rect),

    FocusRequested(WindowHandle),
    CloseRequested { window: WindowHandle, forceful: bool },

    /// Pointer press-drag began on the titlebar region.
    MoveStarted { window: WindowHandle, x: i32, y: i32 },
    /// Pointer press began on a resize grip.
    ResizeStarted { window: WindowHandle, x: i32, y: i32, grip: Grip },
    PointerMoved { x: i32, y: i32 },
    /// Button release or ungrab: ends whatever interaction is in progress.
    PointerReleased { x: i32, y: i32 },

    /// The single-shot auto-raise timer expired.
    AutoRaiseElapsed,

    Command(Command),

    /// Drain the wait list and snapshot client attributes for persistence.
    Shutdown,
}

/// User-initiated operations on the frame that currently holds `window`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Iconify(WindowHandle),
    Deiconify {
        window: WindowHandle,
        reassociate: bool,
        raise: bool,
    },
    ToggleMaximize(WindowHandle),
    ToggleMaximizeHorizontal(WindowHandle),
    ToggleMaximizeVertical(WindowHandle),
    Shade(WindowHandle),
    Stick(WindowHandle),
    Raise(WindowHandle),
    Lower(WindowHandle),
    RaiseLayer(WindowHandle),
    LowerLayer(WindowHandle),
    MoveToLayer(WindowHandle, Layer),
    NextTab(WindowHandle),
    PrevTab(WindowHandle),
    /// Split the window out of its frame into a new one.
    DetachTab(WindowHandle),
    /// Group `window` (and everything sharing its frame) into the frame
    /// holding `target`.
    AttachTo {
        window: WindowHandle,
        target: WindowHandle,
    },
}

pub struct Reactor {
    pub(crate) config: Config,
    pub(crate) clients: SlotMap<ClientId, Client>,
    pub(crate) frames: SlotMap<FrameId, Frame>,
    /// Live handle -> client lookup; exactly the managed windows.
    pub(crate) window_index: HashMap<WindowHandle, ClientId>,
    pub(crate) wait_list: TransientWaitList,

    pub(crate) screens: Vec<Rect>,
    pub(crate) workspace: WorkspaceId,
    pub(crate) workspace_count: u32,
    pub(crate) focused: Option<FrameId>,
    pub(crate) drag: Option<DragState>,

    session: SessionStore,
    next_stack: u64,

    pub(crate) pending: Vec<Request>,
    pub(crate) broadcast: Broadcast,
}

impl Reactor {
    pub fn new(config: Config) -> Reactor {
        let workspace_count = config.workspace_count.max(1);
        Reactor {
            config,
            clients: SlotMap::with_key(),
            frames: SlotMap::with_key(),
            window_index: HashMap::default(),
            wait_list: TransientWaitList::default(),
            screens: Vec::new(),
            workspace: WorkspaceId(0),
            workspace_count,
            focused: None,
            drag: None,
            session: SessionStore::default(),
            next_stack: 1,
            pending: Vec::new(),
            broadcast: Broadcast::default(),
        }
    }

    pub fn with_session(config: Config, session: SessionStore) -> Reactor {
        let mut reactor = Reactor::new(config);
        reactor.session = session;
        reactor
    }

    /// Drains the side effects accumulated since the last call, in the order
    /// they must be performed.
    pub fn take_requests(&mut self) -> Vec<Request> { std::mem::take(&mut self.pending) }

    /// Drains the change notifications for subscribers.
    pub fn take_notifications(&mut self) -> Vec<Notification> { self.broadcast.take() }

    /// Attribute snapshots for the persistence collaborator to write out.
    pub fn session(&self) -> &SessionStore { &self.session }

    pub fn handle_event(&mut self, event: Event) {
        trace!(?event, "handling event");
        match event {
            Event::ScreenParametersChanged(screens) => self.screens = screens,
            Event::WorkspaceChanged { current, count } => {
                self.workspace = current;
                self.workspace_count = count.max(1);
            }
            Event::WindowMapped(window, info) => self.adopt_window(window, info),
            Event::WindowUnmapped(window) | Event::WindowDestroyed(window) => {
                match self.window_index.get(&window) {
                    Some(&client) => self.destroy_client(client),
                    // never adopted; drop any clients parked on it
                    None => self.wait_list.forget_target(window),
                }
            }
            Event::TransientForChanged(window, target) => {
                if let Some(client) = self.lookup(window) {
                    set_transient_for(
                        &mut self.clients,
                        &mut self.wait_list,
                        &self.window_index,
                        client,
                        target,
                    );
                }
            }
            Event::SizeHintsChanged(window, raw) => {
                if let Some(client) = self.lookup(window) {
                    self.clients[client].hints =
                        crate::model::hints::SizeHints::normalize(raw);
                }
            }
            Event::WmHintsChanged(window, hints) => self.update_wm_hints(window, &hints),
            Event::ProtocolsChanged(window, protocols) => {
                if let Some(client) = self.lookup(window) {
                    self.clients[client].update_protocols(&protocols);
                }
            }
            Event::TitleChanged(window, title) => {
                let max = self.config.title_max_len;
                if let Some(client) = self.lookup(window) {
                    if self.clients[client].update_title(&title, max) {
                        self.broadcast.send(Notification::TitleChanged(window));
                    }
                }
            }
            Event::ModalChanged(window, modal) => self.set_modal(window, modal),
            Event::ConfigureRequested(window, rect) => self.configure_requested(window, rect),
            Event::FocusRequested(window) => {
                if let Some(client) = self.lookup(window) {
                    if let Some(frame) = self.clients[client].frame {
                        self.set_active(frame, client, true);
                    }
                }
            }
            Event::CloseRequested { window, forceful } => {
                if let Some(client) = self.lookup(window) {
                    self.clients[client].request_close(forceful, &mut self.pending);
                }
            }
            Event::MoveStarted { window, x, y } => {
                if let Some(frame) = self.frame_of_window(window) {
                    self.start_move(frame, x, y);
                }
            }
            Event::ResizeStarted { window, x, y, grip } => {
                if let Some(frame) = self.frame_of_window(window) {
                    self.start_resize(frame, x, y, grip);
                }
            }
            Event::PointerMoved { x, y } => self.pointer_moved(x, y),
            Event::PointerReleased { x, y } => self.pointer_released(x, y),
            Event::AutoRaiseElapsed => {
                if let Some(frame) = self.focused {
                    self.raise(frame);
                }
            }
            Event::Command(command) => self.handle_command(command),
            Event::Shutdown => self.shutdown(),
        }
    }

    fn handle_command(&mut self, command: Command) {
        use Command::*;
        let frame_of = |reactor: &Reactor, w| reactor.frame_of_window(w);
        match command {
            Iconify(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.iconify(f);
                }
            }
            Deiconify { window, reassociate, raise } => {
                if let Some(f) = frame_of(self, window) {
                    self.deiconify(f, reassociate, raise);
                }
            }
            ToggleMaximize(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.maximize(f);
                }
            }
            ToggleMaximizeHorizontal(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.maximize_horizontal(f);
                }
            }
            ToggleMaximizeVertical(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.maximize_vertical(f);
                }
            }
            Shade(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.shade(f);
                }
            }
            Stick(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.stick(f);
                }
            }
            Raise(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.raise(f);
                }
            }
            Lower(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.lower(f);
                }
            }
            RaiseLayer(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.raise_layer(f);
                }
            }
            LowerLayer(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.lower_layer(f);
                }
            }
            MoveToLayer(w, layer) => {
                if let Some(f) = frame_of(self, w) {
                    self.move_to_layer(f, layer);
                }
            }
            NextTab(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.cycle_tab(f, true);
                }
            }
            PrevTab(w) => {
                if let Some(f) = frame_of(self, w) {
                    self.cycle_tab(f, false);
                }
            }
            DetachTab(w) => self.detach_tab(w),
            AttachTo { window, target } => {
                let (Some(client), Some(dst)) =
                    (self.lookup(window), self.frame_of_window(target))
                else {
                    return;
                };
                self.attach(dst, client);
            }
        }
    }

    pub fn lookup(&self, window: WindowHandle) -> Option<ClientId> {
        self.window_index.get(&window).copied()
    }

    pub fn frame_of_window(&self, window: WindowHandle) -> Option<FrameId> {
        self.clients.get(self.lookup(window)?)?.frame
    }

    fn alloc_stack(&mut self) -> StackHandle {
        let handle = StackHandle::new(self.next_stack);
        self.next_stack += 1;
        handle
    }

    // ---- adoption and teardown ------------------------------------------

    fn adopt_window(&mut self, window: WindowHandle, info: WindowInfo) {
        if self.window_index.contains_key(&window) {
            warn!(%window, "already managing this window");
            return;
        }
        let client = Client::new(window, &info, self.config.title_max_len);
        let initially_iconic = client.initially_iconic;
        let hints_gravity = client.hints.gravity;
        let id = self.clients.insert(client);
        self.window_index.insert(window, id);

        let key = ClientKey::new(&info.instance_name, &info.class_name);
        let saved = self.session.lookup(&key).cloned();

        let metrics = self.config.frame.clone();
        let mut frame = Frame::new(
            Rect::default(),
            metrics.border_width,
            self.workspace,
            self.alloc_stack(),
        );
        if info.window_type == WindowType::Dialog || info.transient_for.is_some() {
            // dialogs don't maximize and don't get grouped
            frame.decorations &= !(Decorations::MAXIMIZE | Decorations::TAB);
            frame.functions &= !Functions::MAXIMIZE;
        }

        frame.geometry = match &saved {
            Some(attrs) => attrs.geometry,
            None => {
                let (top, bottom) =
                    frame.decoration_heights(metrics.titlebar_height, metrics.handle_height);
                let (dx, dy) = hints_gravity.frame_offset(
                    metrics.border_width,
                    metrics.border_width,
                    metrics.border_width + top,
                    metrics.border_width + bottom,
                );
                Rect::new(
                    info.geometry.x + dx,
                    info.geometry.y + dy,
                    info.geometry.width,
                    info.geometry.height + top + bottom,
                )
            }
        };
        if let Some(attrs) = &saved {
            debug!(?key, "restoring saved client attributes");
            frame.workspace = attrs.workspace;
            frame.layer = attrs.layer.clamp_below_menu();
            frame.decorations = attrs.decorations;
            frame.stuck = attrs.stuck;
            frame.shaded = attrs.shaded;
        }

        frame.push_member(id);
        let fid = self.frames.insert(frame);
        self.clients[id].frame = Some(fid);

        // Everyone who was waiting for this window re-resolves now.
        for waiter in self.wait_list.resolve(window) {
            let target = self.clients.get(waiter).and_then(|c| c.transient_for_handle);
            set_transient_for(
                &mut self.clients,
                &mut self.wait_list,
                &self.window_index,
                waiter,
                target,
            );
        }
        // And this window may itself be somebody's transient.
        set_transient_for(
            &mut self.clients,
            &mut self.wait_list,
            &self.window_index,
            id,
            info.transient_for,
        );

        if initially_iconic {
            self.iconify(fid);
            return;
        }

        self.frames[fid].state = WmState::Normal;
        let (stack, geometry, layer) = {
            let f = &self.frames[fid];
            (f.stack, f.geometry, f.layer)
        };
        self.pending.push(Request::ConfigureFrame(stack, geometry));
        self.pending.push(Request::SetLayer(stack, layer));
        self.pending.push(Request::ShowFrame(stack));
        self.broadcast.send(Notification::StateChanged(fid));
        self.raise(fid);
        if self.config.focus.focus_new && self.clients[id].accepts_focus() {
            self.set_input_focus(fid);
        }
    }

    /// Full teardown of one client: transient links, wait list, handle
    /// index, frame membership. The frame follows if this was its last
    /// member.
    pub(crate) fn destroy_client(&mut self, id: ClientId) {
        let Some(client) = self.clients.get(id) else {
            return;
        };
        let window = client.handle();
        let frame = client.frame;

        if let Some(fid) = frame {
            self.record_frame_attributes(fid);
        }

        transient::detach_from_parent(&mut self.clients, id);
        transient::release_transients(&mut self.clients, id);
        self.wait_list.remove_waiter(id);
        self.wait_list.forget_target(window);
        self.window_index.remove(&window);
        self.clients.remove(id);
        self.broadcast.send(Notification::ClientDestroyed(window));

        let Some(fid) = frame else {
            return;
        };
        let now_empty = match self.frames.get_mut(fid) {
            Some(f) => {
                f.remove_member(id);
                f.num_clients() == 0
            }
            None => return,
        };
        if now_empty {
            self.destroy_frame_shell(fid);
        } else {
            if let Some(active) = self.frames[fid].active() {
                let handle = self.clients[active].handle();
                self.broadcast.send(Notification::ActiveTabChanged(fid, handle));
            }
            if self.focused == Some(fid) {
                self.set_input_focus(fid);
            }
        }
    }

    /// Destroys a frame and every client still in it.
    pub(crate) fn destroy_frame(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get_mut(fid) else {
            return;
        };
        let members = frame.take_members();
        for id in members {
            let Some(client) = self.clients.get_mut(id) else {
                continue;
            };
            client.frame = None;
            let window = client.handle();
            transient::detach_from_parent(&mut self.clients, id);
            transient::release_transients(&mut self.clients, id);
            self.wait_list.remove_waiter(id);
            self.wait_list.forget_target(window);
            self.window_index.remove(&window);
            self.clients.remove(id);
            self.broadcast.send(Notification::ClientDestroyed(window));
        }
        self.destroy_frame_shell(fid);
    }

    /// Removes the (already empty) frame itself.
    fn destroy_frame_shell(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        debug_assert_eq!(frame.num_clients(), 0);
        let stack = frame.stack;
        if self
            .drag
            .as_ref()
            .is_some_and(|drag| drag.frame() == fid)
        {
            self.drag = None;
            self.pending.push(Request::ClearOutline);
            self.pending.push(Request::UngrabPointer);
        }
        if self.focused == Some(fid) {
            self.focused = None;
            self.pending.push(Request::RevertFocus);
            self.broadcast.send(Notification::FocusChanged(None));
        }
        self.pending.push(Request::HideFrame(stack));
        self.frames.remove(fid);
        self.broadcast.send(Notification::FrameDestroyed(fid));
    }

    fn record_frame_attributes(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        let attrs = SavedAttributes::of(frame);
        for &member in frame.members() {
            if let Some(client) = self.clients.get(member) {
                self.session.record(
                    ClientKey::new(&client.instance_name, &client.class_name),
                    attrs.clone(),
                );
            }
        }
    }

    fn shutdown(&mut self) {
        let frames: Vec<FrameId> = self.frames.keys().collect();
        for fid in frames {
            self.record_frame_attributes(fid);
        }
        self.wait_list.clear();
    }

    // ---- membership ------------------------------------------------------

    /// Groups `client` into `dst`. A client that already lives in another
    /// frame brings *all* of that frame's members along, preserving their
    /// relative order; the emptied source frame is destroyed. The attached
    /// client becomes active and is raised.
    pub fn attach(&mut self, dst: FrameId, client: ClientId) {
        if !self.frames.contains_key(dst) || !self.clients.contains_key(client) {
            return;
        }
        let src = self.clients[client].frame;
        if src == Some(dst) {
            return;
        }
        match src {
            Some(src) => {
                let moved = self.frames[src].take_members();
                for &id in &moved {
                    self.clients[id].frame = Some(dst);
                }
                self.frames[dst].absorb(moved);
                self.destroy_frame_shell(src);
            }
            None => {
                self.frames[dst].push_member(client);
                self.clients[client].frame = Some(dst);
            }
        }
        self.frames[dst].set_active(client);
        let window = self.clients[client].handle();
        self.broadcast.send(Notification::ActiveTabChanged(dst, window));
        self.broadcast.send(Notification::StateChanged(dst));
        self.broadcast
            .send(Notification::WorkspaceChanged(dst, self.frames[dst].workspace));
        self.broadcast.send(Notification::LayerChanged(dst, self.frames[dst].layer));
        self.raise(dst);
    }

    /// Takes `client` out of its frame, leaving it unowned. Fails on the
    /// sole member and on non-members; framing the detached client again is
    /// the caller's job.
    pub fn detach(&mut self, client: ClientId) -> bool {
        let Some(fid) = self.clients.get(client).and_then(|c| c.frame) else {
            return false;
        };
        let Some(frame) = self.frames.get_mut(fid) else {
            return false;
        };
        if frame.num_clients() <= 1 || !frame.contains(client) {
            return false;
        }
        frame.remove_member(client);
        self.clients[client].frame = None;
        if let Some(active) = self.frames[fid].active() {
            let handle = self.clients[active].handle();
            self.broadcast.send(Notification::ActiveTabChanged(fid, handle));
        }
        self.raise(fid);
        self.set_input_focus(fid);
        true
    }

    /// `Command::DetachTab`: detach plus the caller half of the contract —
    /// a fresh single-member frame at the old position.
    fn detach_tab(&mut self, window: WindowHandle) {
        let Some(client) = self.lookup(window) else {
            return;
        };
        let Some(old_frame) = self.clients[client].frame else {
            return;
        };
        let geometry = self.frames[old_frame].geometry;
        let (workspace, layer) = (self.frames[old_frame].workspace, self.frames[old_frame].layer);
        if !self.detach(client) {
            return;
        }
        let mut frame = Frame::new(
            geometry,
            self.config.frame.border_width,
            workspace,
            self.alloc_stack(),
        );
        frame.layer = layer;
        frame.state = WmState::Normal;
        frame.push_member(client);
        let fid = self.frames.insert(frame);
        self.clients[client].frame = Some(fid);
        let (stack, layer) = (self.frames[fid].stack, self.frames[fid].layer);
        self.pending.push(Request::ConfigureFrame(stack, geometry));
        self.pending.push(Request::SetLayer(stack, layer));
        self.pending.push(Request::ShowFrame(stack));
        self.broadcast.send(Notification::StateChanged(fid));
        self.raise(fid);
        self.set_input_focus(fid);
    }

    /// Removes `client` from its frame and destroys it; unlike detach this
    /// is allowed on the sole member, after which the frame goes too.
    pub fn remove(&mut self, client: ClientId) -> bool {
        if !self.clients.contains_key(client) {
            return false;
        }
        self.destroy_client(client);
        true
    }

    /// Makes `client` the active tab of `frame`; optionally also routes the
    /// input focus through the focus protocol (honoring modality).
    pub fn set_active(
        &mut self,
        frame: FrameId,
        client: ClientId,
        request_input_focus: bool,
    ) -> bool {
        let Some(f) = self.frames.get_mut(frame) else {
            return false;
        };
        if !f.set_active(client) {
            trace!(?frame, "set_active on a non-member");
            return false;
        }
        let window = self.clients[client].handle();
        self.broadcast.send(Notification::ActiveTabChanged(frame, window));
        self.raise(frame);
        if request_input_focus {
            return self.set_input_focus(frame);
        }
        true
    }

    fn cycle_tab(&mut self, frame: FrameId, forward: bool) {
        let Some(f) = self.frames.get(frame) else {
            return;
        };
        if f.num_clients() <= 1 {
            return;
        }
        let next = if forward { f.next_member() } else { f.prev_member() };
        if let Some(next) = next {
            self.set_active(frame, next, true);
        }
    }

    // ---- focus -----------------------------------------------------------

    /// Routes input focus to `frame`'s active client.
    ///
    /// Modality comes first: while the active client has pending modal
    /// transients, focus is redirected to the first modal transient in its
    /// set (one level, no recursion). Otherwise locally-active and passive
    /// clients get a direct focus set; globally-active clients refuse local
    /// focus and must self-initiate, so this reports failure.
    pub fn set_input_focus(&mut self, frame: FrameId) -> bool {
        let Some(active) = self.frames.get(frame).and_then(|f| f.active()) else {
            return false;
        };
        self.rescue_offscreen(frame);

        if self.clients[active].is_modal_blocked() {
            let modal = self.clients[active]
                .transients()
                .iter()
                .copied()
                .find(|&t| self.clients.get(t).map(|c| c.modal).unwrap_or(false));
            if let Some(modal) = modal {
                if let Some(modal_frame) = self.clients[modal].frame {
                    return self.set_active(modal_frame, modal, true);
                }
            }
        }

        match self.clients[active].focus_model() {
            FocusModel::LocallyActive | FocusModel::Passive => {
                let window = self.clients[active].handle();
                self.pending.push(Request::SetInputFocus(window));
            }
            FocusModel::GloballyActive | FocusModel::NoInput => return false,
        }

        if self.focused != Some(frame) {
            if let Some(old) = self.focused {
                if let Some(f) = self.frames.get_mut(old) {
                    f.focused = false;
                }
            }
            self.frames[frame].focused = true;
            self.focused = Some(frame);
            self.broadcast.send(Notification::FocusChanged(Some(frame)));
        }
        if self.config.focus.auto_raise {
            self.pending.push(Request::ScheduleAutoRaise {
                delay_ms: self.config.focus.auto_raise_delay_ms,
            });
        }
        true
    }

    /// A frame that drifted entirely off every head is pulled back to the
    /// nearest edge before it gets focus; focusing something invisible just
    /// confuses people.
    fn rescue_offscreen(&mut self, frame: FrameId) {
        let Some(f) = self.frames.get(frame) else {
            return;
        };
        let Some(bounds) = self.screen_bounds() else {
            return;
        };
        let g = f.geometry;
        let bw = f.border_width as i32;
        let mut x = g.x;
        let mut y = g.y;
        if g.right() < bounds.left() {
            x = bounds.left() + bw;
        } else if g.left() > bounds.right() {
            x = bounds.right() - g.width as i32;
        }
        if g.bottom() < bounds.top() {
            y = bounds.top() + bw;
        } else if g.top() > bounds.bottom() {
            y = bounds.bottom() - g.height as i32;
        }
        if (x, y) != (g.x, g.y) {
            self.move_resize(frame, g.with_origin(x, y));
        }
    }

    // ---- geometry --------------------------------------------------------

    pub fn move_resize(&mut self, frame: FrameId, rect: Rect) {
        let Some(f) = self.frames.get_mut(frame) else {
            return;
        };
        f.geometry = rect;
        let stack = f.stack;
        self.pending.push(Request::ConfigureFrame(stack, rect));
    }

    /// An externally requested geometry: validated against the client's own
    /// hints and clamped when it violates them.
    fn configure_requested(&mut self, window: WindowHandle, rect: Rect) {
        let Some(client) = self.lookup(window) else {
            return;
        };
        let Some(frame) = self.clients[client].frame else {
            return;
        };
        let hints = self.clients[client].hints;
        let (width, height) = if hints.check(rect.width, rect.height) {
            (rect.width, rect.height)
        } else {
            let applied = hints.apply(rect.width as i32, rect.height as i32, false);
            (applied.width, applied.height)
        };
        let (top, bottom) = self.frame_decoration_heights(frame);
        self.move_resize(
            frame,
            Rect::new(rect.x, rect.y, width, height + top + bottom),
        );
    }

    pub(crate) fn frame_decoration_heights(&self, frame: FrameId) -> (u32, u32) {
        match self.frames.get(frame) {
            Some(f) => f.decoration_heights(
                self.config.frame.titlebar_height,
                self.config.frame.handle_height,
            ),
            None => (0, 0),
        }
    }

    /// Usable area of the head the frame's center sits on; the whole first
    /// head when it is off every screen.
    pub(crate) fn head_area(&self, frame: FrameId) -> Option<Rect> {
        let f = self.frames.get(frame)?;
        let g = f.geometry;
        let center = crate::sys::geometry::Point::new(
            g.x + g.width as i32 / 2,
            g.y + g.height as i32 / 2,
        );
        self.screens
            .iter()
            .copied()
            .find(|s| s.contains(center))
            .or_else(|| self.screens.first().copied())
    }

    fn screen_bounds(&self) -> Option<Rect> {
        let first = self.screens.first()?;
        let mut bounds = *first;
        for s in &self.screens[1..] {
            let right = bounds.right().max(s.right());
            let bottom = bounds.bottom().max(s.bottom());
            bounds.x = bounds.x.min(s.x);
            bounds.y = bounds.y.min(s.y);
            bounds.width = (right - bounds.x) as u32;
            bounds.height = (bottom - bounds.y) as u32;
        }
        Some(bounds)
    }

    // ---- per-client hint updates ------------------------------------------

    fn update_wm_hints(&mut self, window: WindowHandle, hints: &RawWmHints) {
        let Some(client) = self.lookup(window) else {
            return;
        };
        let was_urgent = self.clients[client].urgent;
        self.clients[client].update_wm_hints(hints);
        if self.clients[client].urgent != was_urgent {
            let focused_frame = self.clients[client].frame == self.focused
                && self.clients[client].frame.is_some();
            // a focused window demanding attention is just noise
            if !focused_frame || !hints.urgent {
                self.broadcast
                    .send(Notification::AttentionChanged(window, hints.urgent));
            }
        }
    }

    fn set_modal(&mut self, window: WindowHandle, modal: bool) {
        let Some(client) = self.lookup(window) else {
            return;
        };
        if self.clients[client].modal == modal {
            return;
        }
        self.clients[client].modal = modal;
        if let Some(parent) = self.clients[client].transient_for {
            if let Some(parent) = self.clients.get_mut(parent) {
                if modal {
                    parent.add_modal();
                } else {
                    parent.remove_modal();
                }
            }
        }
    }

    /// Diagnostic dump of the transient tree over `window`'s root.
    pub fn draw_transient_tree(&self, window: WindowHandle) -> Option<String> {
        let client = self.lookup(window)?;
        let root = root_transient_for(&self.clients, client);
        Some(transient::draw_tree(&self.clients, root))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::testing::{h, make_window};
    use super::*;

    #[test]
    fn adoption_maps_raises_and_focuses() {
        let mut reactor = Reactor::new_for_test();
        let window = reactor.map(1, make_window("xterm"));
        let fid = reactor.frame_for(1);

        assert_eq!(reactor.frames[fid].state, WmState::Normal);
        // frame wraps the client: same width, titlebar and handle added
        assert_eq!(reactor.frames[fid].geometry, Rect::new(100, 100, 300, 222));

        let requests = reactor.take_requests();
        let stack = reactor.frames[fid].stack;
        assert!(requests.contains(&Request::ShowFrame(stack)));
        assert!(requests.contains(&Request::Raise(stack)));
        assert!(requests.contains(&Request::SetInputFocus(window)));
        assert_eq!(reactor.focused, Some(fid));
    }

    #[test]
    fn adopting_the_same_window_twice_is_a_noop() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.map(1, make_window("a again"));
        assert_eq!(reactor.frames.len(), 1);
        assert_eq!(reactor.clients.len(), 1);
    }

    #[test]
    fn late_transient_target_resolves_through_the_wait_list() {
        let mut reactor = Reactor::new_for_test();
        let mut dialog = make_window("open file");
        dialog.transient_for = Some(h(5));
        reactor.map(10, dialog);

        let waiter = reactor.lookup(h(10)).unwrap();
        assert_eq!(reactor.wait_list.waiters(h(5)), &[waiter]);
        assert_eq!(reactor.clients[waiter].transient_for, None);

        reactor.map(5, make_window("editor"));
        let parent = reactor.lookup(h(5)).unwrap();
        assert_eq!(reactor.clients[waiter].transient_for, Some(parent));
        assert_eq!(reactor.clients[parent].transients(), &[waiter]);
        assert!(reactor.wait_list.is_empty());
    }

    #[test]
    fn destroying_an_unborn_target_clears_its_waiters_entry() {
        let mut reactor = Reactor::new_for_test();
        let mut dialog = make_window("d");
        dialog.transient_for = Some(h(5));
        reactor.map(10, dialog);
        assert_eq!(reactor.wait_list.len(), 1);

        reactor.handle_event(Event::WindowDestroyed(h(5)));
        assert!(reactor.wait_list.is_empty());
    }

    #[test]
    fn attach_migrates_every_member_and_destroys_the_source() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.map(2, make_window("b"));
        reactor.map(3, make_window("c"));
        let (a, b, c) = (
            reactor.lookup(h(1)).unwrap(),
            reactor.lookup(h(2)).unwrap(),
            reactor.lookup(h(3)).unwrap(),
        );

        // group b and c first, then pull both into a's frame via c
        reactor.handle_event(Event::Command(Command::AttachTo { window: h(3), target: h(2) }));
        let bc = reactor.frame_for(2);
        assert_eq!(reactor.frames[bc].members(), &[b, c]);

        reactor.handle_event(Event::Command(Command::AttachTo { window: h(3), target: h(1) }));
        assert_eq!(reactor.frames.len(), 1);
        let all = reactor.frame_for(1);
        assert_eq!(reactor.frames[all].members(), &[a, b, c]);
        assert_eq!(reactor.frames[all].active(), Some(c));
        for &id in reactor.frames[all].members() {
            assert_eq!(reactor.clients[id].frame, Some(all));
        }
    }

    #[test]
    fn attaching_a_client_to_its_own_frame_changes_nothing() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let fid = reactor.frame_for(1);
        let client = reactor.lookup(h(1)).unwrap();
        reactor.attach(fid, client);
        assert_eq!(reactor.frames.len(), 1);
        assert_eq!(reactor.frames[fid].num_clients(), 1);
    }

    #[test]
    fn detaching_the_sole_member_fails_without_state_change() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let client = reactor.lookup(h(1)).unwrap();
        assert!(!reactor.detach(client));
        assert_eq!(reactor.frames.len(), 1);
        assert_eq!(reactor.clients[client].frame, Some(reactor.frame_for(1)));
    }

    #[test]
    fn detaching_a_grouped_tab_keeps_active_among_members() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.map(2, make_window("b"));
        reactor.handle_event(Event::Command(Command::AttachTo { window: h(2), target: h(1) }));
        let fid = reactor.frame_for(1);
        let b = reactor.lookup(h(2)).unwrap();

        assert!(reactor.detach(b));
        let remaining = reactor.frames[fid].members().to_vec();
        let active = reactor.frames[fid].active().unwrap();
        assert!(remaining.contains(&active));
        assert_eq!(reactor.clients[b].frame, None);
    }

    #[test]
    fn detach_tab_command_creates_the_replacement_frame() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.map(2, make_window("b"));
        reactor.handle_event(Event::Command(Command::AttachTo { window: h(2), target: h(1) }));
        assert_eq!(reactor.frames.len(), 1);

        reactor.handle_event(Event::Command(Command::DetachTab(h(2))));
        assert_eq!(reactor.frames.len(), 2);
        assert_ne!(reactor.frame_for(1), reactor.frame_for(2));
    }

    #[test]
    fn removing_the_last_client_destroys_the_frame() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let fid = reactor.frame_for(1);
        reactor.drain();

        reactor.handle_event(Event::WindowDestroyed(h(1)));
        assert!(reactor.frames.is_empty());
        assert!(reactor.clients.is_empty());
        assert!(reactor.window_index.is_empty());
        let notes = reactor.take_notifications();
        assert!(notes.contains(&Notification::ClientDestroyed(h(1))));
        assert!(notes.contains(&Notification::FrameDestroyed(fid)));
    }

    #[test]
    fn destroying_a_grouped_client_advances_the_active_tab() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.map(2, make_window("b"));
        reactor.handle_event(Event::Command(Command::AttachTo { window: h(2), target: h(1) }));
        let fid = reactor.frame_for(1);
        let a = reactor.lookup(h(1)).unwrap();

        reactor.handle_event(Event::WindowDestroyed(h(2)));
        assert_eq!(reactor.frames[fid].members(), &[a]);
        assert_eq!(reactor.frames[fid].active(), Some(a));
    }

    #[test]
    fn frame_destruction_takes_all_members_with_it() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.map(2, make_window("b"));
        reactor.handle_event(Event::Command(Command::AttachTo { window: h(2), target: h(1) }));
        let fid = reactor.frame_for(1);

        reactor.destroy_frame(fid);
        assert!(reactor.clients.is_empty());
        assert!(reactor.window_index.is_empty());
        assert!(reactor.frames.is_empty());
    }

    #[test]
    fn modal_transient_steals_focus_from_its_parent() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("editor"));
        let mut dialog = make_window("really quit?");
        dialog.transient_for = Some(h(1));
        dialog.modal = true;
        reactor.map(2, dialog);
        reactor.drain();

        reactor.handle_event(Event::FocusRequested(h(1)));
        let requests = reactor.take_requests();
        assert!(requests.contains(&Request::SetInputFocus(h(2))));
        assert!(!requests.contains(&Request::SetInputFocus(h(1))));
        assert_eq!(reactor.focused, Some(reactor.frame_for(2)));
    }

    #[test]
    fn globally_active_clients_refuse_local_focus() {
        let mut reactor = Reactor::new_for_test();
        let mut info = make_window("self-starter");
        info.wm_hints.accepts_input = Some(false);
        info.protocols.take_focus = true;
        reactor.map(1, info);

        let requests = reactor.take_requests();
        assert!(!requests.iter().any(|r| matches!(r, Request::SetInputFocus(_))));
        assert_eq!(reactor.focused, None);

        let fid = reactor.frame_for(1);
        assert!(!reactor.set_input_focus(fid));
    }

    #[test]
    fn close_request_honors_the_delete_protocol() {
        let mut reactor = Reactor::new_for_test();
        let mut info = make_window("polite");
        info.protocols.delete_window = true;
        reactor.map(1, info);
        reactor.map(2, make_window("rude"));
        reactor.drain();

        reactor.handle_event(Event::CloseRequested { window: h(1), forceful: false });
        reactor.handle_event(Event::CloseRequested { window: h(2), forceful: false });
        reactor.handle_event(Event::CloseRequested { window: h(1), forceful: true });
        assert_eq!(
            reactor.take_requests(),
            vec![
                Request::SendDelete(h(1)),
                Request::KillClient(h(2)),
                Request::KillClient(h(1)),
            ]
        );
    }

    #[test]
    fn hint_violating_configure_requests_are_clamped() {
        let mut reactor = Reactor::new_for_test();
        let mut info = make_window("term");
        info.size_hints.min_size = Some((100, 100));
        info.size_hints.base_size = Some((0, 0));
        info.size_hints.resize_inc = Some((10, 10));
        reactor.map(1, info);
        let fid = reactor.frame_for(1);
        reactor.drain();

        reactor.handle_event(Event::ConfigureRequested(h(1), Rect::new(50, 60, 207, 198)));
        // 207x198 snaps down to 200x190; the frame adds its decorations
        assert_eq!(reactor.frames[fid].geometry, Rect::new(50, 60, 200, 212));
    }

    #[test]
    fn conforming_configure_requests_pass_straight_through() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("free"));
        let fid = reactor.frame_for(1);
        reactor.handle_event(Event::ConfigureRequested(h(1), Rect::new(5, 6, 640, 480)));
        assert_eq!(reactor.frames[fid].geometry, Rect::new(5, 6, 640, 502));
    }

    #[test]
    fn auto_raise_arms_on_focus_and_raises_on_expiry() {
        let mut config = Config::default();
        config.focus.auto_raise = true;
        let mut reactor = Reactor::new_for_test_with(config);
        reactor.map(1, make_window("a"));
        let stack = reactor.frames[reactor.frame_for(1)].stack;

        let requests = reactor.take_requests();
        assert!(requests.contains(&Request::ScheduleAutoRaise { delay_ms: 250 }));

        reactor.handle_event(Event::AutoRaiseElapsed);
        assert!(reactor.take_requests().contains(&Request::Raise(stack)));
    }

    #[test]
    fn title_changes_notify_subscribers() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("before"));
        reactor.take_notifications();

        reactor.handle_event(Event::TitleChanged(h(1), "after".to_string()));
        assert!(reactor
            .take_notifications()
            .contains(&Notification::TitleChanged(h(1))));
        // same title again: no notification
        reactor.handle_event(Event::TitleChanged(h(1), "after".to_string()));
        assert!(reactor.take_notifications().is_empty());
    }

    #[test]
    fn urgency_hint_raises_attention() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.map(2, make_window("b"));
        reactor.take_notifications();

        let hints = RawWmHints { urgent: true, ..Default::default() };
        reactor.handle_event(Event::WmHintsChanged(h(1), hints));
        assert!(reactor
            .take_notifications()
            .contains(&Notification::AttentionChanged(h(1), true)));
    }

    #[test]
    fn shutdown_drains_the_wait_list_and_snapshots_attributes() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let mut orphan = make_window("waits forever");
        orphan.transient_for = Some(h(42));
        reactor.map(2, orphan);
        assert!(!reactor.wait_list.is_empty());

        reactor.handle_event(Event::Shutdown);
        assert!(reactor.wait_list.is_empty());
        assert_eq!(reactor.session().len(), 1); // both windows share a class key
    }

    #[test]
    fn saved_attributes_are_restored_on_readoption() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let fid = reactor.frame_for(1);
        reactor.handle_event(Event::Command(Command::Stick(h(1))));
        reactor.move_resize(fid, Rect::new(40, 50, 200, 100));
        reactor.handle_event(Event::WindowDestroyed(h(1)));

        // same class hint, new handle: placement and stickiness come back
        reactor.map(7, make_window("a"));
        let fid = reactor.frame_for(7);
        assert_eq!(reactor.frames[fid].geometry, Rect::new(40, 50, 200, 100));
        assert!(reactor.frames[fid].stuck);
    }

    #[test]
    fn transient_tree_dump_includes_the_whole_family() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("parent"));
        let mut dialog = make_window("child");
        dialog.transient_for = Some(h(1));
        reactor.map(2, dialog);

        let tree = reactor.draw_transient_tree(h(2)).unwrap();
        assert!(tree.contains("parent"));
        assert!(tree.contains("child"));
    }
}
