//! Protocol state of one top-level window.
//!
//! A `Client` is owned by exactly one [`crate::model::frame::Frame`]; every
//! cross-client reference (the transient relation) goes through `ClientId`
//! arena keys and never owns anything.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use strum::Display;

use crate::model::frame::FrameId;
use crate::model::hints::SizeHints;
use crate::sys::window_server::{
    Protocols, RawWmHints, Request, WindowHandle, WindowInfo, WindowType,
};

new_key_type! {
    pub struct ClientId;
}

/// ICCCM 4.1.7 input models.
///
/// ```text
/// Input Model      Input Field   WM_TAKE_FOCUS
/// No Input          False         Absent
/// Passive           True          Absent
/// Locally Active    True          Present
/// Globally Active   False         Present
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum FocusModel {
    NoInput,
    Passive,
    LocallyActive,
    GloballyActive,
}

/// How a focus request was satisfied, if at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FocusResponse {
    /// A direct focus set was issued.
    AcceptedInput,
    /// The client was asked to take focus itself.
    SentMessage,
    /// The client's protocol class forbids both. The caller must try an
    /// alternative or give up silently.
    Refused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    handle: WindowHandle,
    /// The frame that currently owns this client. `None` only during
    /// adoption and teardown.
    pub(crate) frame: Option<FrameId>,

    title: String,
    title_override: bool,
    pub instance_name: String,
    pub class_name: String,
    pub window_type: WindowType,

    pub hints: SizeHints,
    pub accepts_input: bool,
    pub sends_focus_message: bool,
    pub sends_close_message: bool,
    pub initially_iconic: bool,
    pub urgent: bool,

    /// This client demands focus precedence over its parent while open.
    pub modal: bool,
    /// Number of modal transients currently hanging off this client.
    modal_count: u32,

    /// The transient-for target as declared by the client, resolved or not.
    /// Kept so a later-created target can be re-resolved from the wait list.
    pub(crate) transient_for_handle: Option<WindowHandle>,
    pub(crate) transient_for: Option<ClientId>,
    pub(crate) transients: Vec<ClientId>,
}

impl Client {
    pub fn new(handle: WindowHandle, info: &WindowInfo, title_max_len: usize) -> Client {
        let mut client = Client {
            handle,
            frame: None,
            title: String::new(),
            title_override: false,
            instance_name: info.instance_name.clone(),
            class_name: info.class_name.clone(),
            window_type: info.window_type,
            hints: SizeHints::normalize(info.size_hints),
            accepts_input: true,
            sends_focus_message: false,
            sends_close_message: false,
            initially_iconic: false,
            urgent: false,
            modal: info.modal,
            modal_count: 0,
            transient_for_handle: info.transient_for,
            transient_for: None,
            transients: Vec::new(),
        };
        client.update_wm_hints(&info.wm_hints);
        client.update_protocols(&info.protocols);
        client.update_title(&info.title, title_max_len);
        client
    }

    pub fn handle(&self) -> WindowHandle { self.handle }

    pub fn title(&self) -> &str { &self.title }

    /// Title as reported by the client. Ignored once a user override is in
    /// place. Returns whether the visible title changed.
    pub fn update_title(&mut self, title: &str, max_len: usize) -> bool {
        if self.title_override {
            return false;
        }
        let mut end = title.len().min(max_len);
        while !title.is_char_boundary(end) {
            end -= 1;
        }
        if self.title == title[..end] {
            return false;
        }
        self.title = title[..end].to_string();
        true
    }

    pub fn set_title_override(&mut self, title: String) {
        self.title = title;
        self.title_override = true;
    }

    pub fn update_wm_hints(&mut self, hints: &RawWmHints) {
        self.accepts_input = hints.accepts_input.unwrap_or(true);
        self.initially_iconic = hints.initially_iconic;
        self.urgent = hints.urgent;
    }

    pub fn update_protocols(&mut self, protocols: &Protocols) {
        self.sends_focus_message = protocols.take_focus;
        self.sends_close_message = protocols.delete_window;
    }

    pub fn focus_model(&self) -> FocusModel {
        match (self.accepts_input, self.sends_focus_message) {
            (false, false) => FocusModel::NoInput,
            (true, false) => FocusModel::Passive,
            (true, true) => FocusModel::LocallyActive,
            (false, true) => FocusModel::GloballyActive,
        }
    }

    /// Whether this client is a legitimate focus target at all. Docks and
    /// splashes are never focused; handing them the input focus wedges the
    /// rest of the session.
    pub fn accepts_focus(&self) -> bool {
        (self.accepts_input || self.sends_focus_message)
            && self.window_type != WindowType::Dock
            && self.window_type != WindowType::Splash
    }

    /// Issues the focus request appropriate to the client's protocol class.
    pub fn request_focus(&self, pending: &mut Vec<Request>) -> FocusResponse {
        if self.accepts_input {
            pending.push(Request::SetInputFocus(self.handle));
            FocusResponse::AcceptedInput
        } else if self.sends_focus_message {
            pending.push(Request::SendTakeFocus(self.handle));
            FocusResponse::SentMessage
        } else {
            FocusResponse::Refused
        }
    }

    /// Asks the client to go away. Clients outside the close-message
    /// protocol get the unconditional treatment.
    pub fn request_close(&self, forceful: bool, pending: &mut Vec<Request>) {
        if forceful || !self.sends_close_message {
            pending.push(Request::KillClient(self.handle));
        } else {
            pending.push(Request::SendDelete(self.handle));
        }
    }

    pub fn is_transient(&self) -> bool { self.transient_for.is_some() }

    pub fn transients(&self) -> &[ClientId] { &self.transients }

    /// True while any modal transient of this client is open; focus aimed at
    /// this client must be redirected to the modal.
    pub fn is_modal_blocked(&self) -> bool { self.modal_count > 0 }

    pub(crate) fn add_modal(&mut self) { self.modal_count += 1; }

    pub(crate) fn remove_modal(&mut self) {
        self.modal_count = self.modal_count.saturating_sub(1);
    }
}
