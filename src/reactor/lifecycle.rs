//! Frame state transitions: iconify/deiconify with their cascades through
//! the transient graph, the maximize family, shading and sticking.

use tracing::{debug, trace};

use crate::model::frame::{Decorations, FrameId, Functions, WmState};
use crate::reactor::{Notification, Reactor};
use crate::sys::geometry::Rect;
use crate::sys::window_server::Request;

impl Reactor {
    /// Hides the frame, unmaps every member, and pulls the whole transient
    /// neighborhood along: each member's parent frame and each member's
    /// transients iconify with it. Marking the state before cascading is
    /// what keeps mutually-transient frames from ping-ponging.
    pub fn iconify(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get_mut(fid) else {
            return;
        };
        if frame.is_iconic() {
            return;
        }
        frame.state = WmState::Iconic;
        let stack = frame.stack;
        self.broadcast.send(Notification::StateChanged(fid));
        self.pending.push(Request::HideFrame(stack));

        let members = self.frames[fid].members().to_vec();
        for member in members {
            let Some(client) = self.clients.get(member) else {
                continue;
            };
            self.pending.push(Request::HideClient(client.handle()));

            if let Some(parent) = client.transient_for {
                if let Some(parent_frame) = self.clients.get(parent).and_then(|c| c.frame) {
                    if !self.frames[parent_frame].is_iconic() {
                        self.iconify(parent_frame);
                    }
                }
            }
            let transients = self
                .clients
                .get(member)
                .map(|c| c.transients().to_vec())
                .unwrap_or_default();
            for t in transients {
                if let Some(tf) = self.clients.get(t).and_then(|c| c.frame) {
                    if !self.frames[tf].is_iconic() {
                        self.iconify(tf);
                    }
                }
            }
        }

        if self.focused == Some(fid) {
            if let Some(frame) = self.frames.get_mut(fid) {
                frame.focused = false;
            }
            self.focused = None;
            self.pending.push(Request::RevertFocus);
            self.broadcast.send(Notification::FocusChanged(None));
        }
    }

    /// Re-maps the frame. `reassociate` also moves it to the current
    /// workspace and cascades to the members' transients; `raise` brings it
    /// up afterwards. A frame parked on another workspace stays hidden
    /// unless reassociated (or mid-move).
    pub fn deiconify(&mut self, fid: FrameId, reassociate: bool, raise: bool) {
        let (was_iconic, moving, frame_workspace) = match self.frames.get(fid) {
            Some(f) if f.num_clients() > 0 && !f.op_lock.get() => {
                (f.is_iconic(), f.moving, f.workspace)
            }
            _ => return,
        };
        self.frames[fid].op_lock.set(true);

        if was_iconic || reassociate {
            if frame_workspace != self.workspace {
                let workspace = self.workspace;
                self.frames[fid].workspace = workspace;
                self.broadcast
                    .send(Notification::WorkspaceChanged(fid, workspace));
            }
        } else if moving || frame_workspace != self.workspace {
            self.frames[fid].op_lock.set(false);
            return;
        }

        self.frames[fid].state = WmState::Normal;
        self.broadcast.send(Notification::StateChanged(fid));

        let members = self.frames[fid].members().to_vec();
        for &member in &members {
            if let Some(client) = self.clients.get(member) {
                self.pending.push(Request::ShowClient(client.handle()));
            }
        }
        self.pending.push(Request::ShowFrame(self.frames[fid].stack));

        if was_iconic && self.config.focus.focus_new {
            self.set_input_focus(fid);
        }

        if reassociate {
            for member in members {
                let transients = self
                    .clients
                    .get(member)
                    .map(|c| c.transients().to_vec())
                    .unwrap_or_default();
                for t in transients {
                    if let Some(tf) = self.clients.get(t).and_then(|c| c.frame) {
                        self.deiconify(tf, true, false);
                    }
                }
            }
        }

        if let Some(frame) = self.frames.get(fid) {
            frame.op_lock.set(false);
        }
        if raise {
            self.raise(fid);
        }
    }

    // ---- maximize family --------------------------------------------------

    /// Toggles None <-> Full. Each axis keeps its own pre-maximize save so
    /// that later single-axis toggles restore exactly what they changed.
    pub fn maximize(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        if !frame.functions.contains(Functions::MAXIMIZE) {
            return;
        }
        if frame.is_iconic() {
            self.deiconify(fid, true, true);
        }
        let Some(area) = self.head_area(fid) else {
            debug!(?fid, "no head to maximize to");
            return;
        };

        let frame = &mut self.frames[fid];
        if !frame.is_maximized_full() {
            if !frame.max_horz {
                frame.save_horizontal();
            }
            if !frame.max_vert {
                frame.save_vertical();
            }
            frame.max_horz = true;
            frame.max_vert = true;
            let target = self.maximized_rect(fid, area, true, true);
            self.move_resize(fid, target);
        } else {
            frame.max_horz = false;
            frame.max_vert = false;
            let (x, width) = frame.saved_horizontal();
            let (y, height) = frame.saved_vertical();
            self.move_resize(fid, Rect::new(x, y, width, height));
        }
        self.broadcast.send(Notification::StateChanged(fid));
    }

    /// Toggles the horizontal bit alone. Clearing it while Full demotes to
    /// vertical-only, restoring the saved x/width.
    pub fn maximize_horizontal(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        if !frame.functions.contains(Functions::MAXIMIZE) {
            return;
        }
        let Some(area) = self.head_area(fid) else {
            return;
        };
        let frame = &mut self.frames[fid];
        if !frame.max_horz {
            frame.save_horizontal();
            frame.max_horz = true;
            let geometry = frame.geometry;
            let target = Rect::new(
                area.x,
                geometry.y,
                area.width - 2 * frame.border_width,
                geometry.height,
            );
            self.move_resize(fid, target);
        } else {
            frame.max_horz = false;
            let (x, width) = frame.saved_horizontal();
            let geometry = frame.geometry;
            self.move_resize(fid, Rect::new(x, geometry.y, width, geometry.height));
        }
        self.broadcast.send(Notification::StateChanged(fid));
    }

    /// Toggles the vertical bit alone.
    pub fn maximize_vertical(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        if !frame.functions.contains(Functions::MAXIMIZE) {
            return;
        }
        let Some(area) = self.head_area(fid) else {
            return;
        };
        let frame = &mut self.frames[fid];
        if !frame.max_vert {
            frame.save_vertical();
            frame.max_vert = true;
            let geometry = frame.geometry;
            let target = Rect::new(
                geometry.x,
                area.y,
                geometry.width,
                area.height - 2 * frame.border_width,
            );
            self.move_resize(fid, target);
        } else {
            frame.max_vert = false;
            let (y, height) = frame.saved_vertical();
            let geometry = frame.geometry;
            self.move_resize(fid, Rect::new(geometry.x, y, geometry.width, height));
        }
        self.broadcast.send(Notification::StateChanged(fid));
    }

    /// Full-head target rect, run through the active client's size hints
    /// with the maximizing rule so the result never overshoots the head.
    fn maximized_rect(&self, fid: FrameId, area: Rect, horz: bool, vert: bool) -> Rect {
        let frame = &self.frames[fid];
        let bw = frame.border_width;
        let geometry = frame.geometry;
        let (top, bottom) = frame.decoration_heights(
            self.config.frame.titlebar_height,
            self.config.frame.handle_height,
        );
        let deco = top + bottom;

        let mut target = geometry;
        if horz {
            target.x = area.x;
            target.width = area.width.saturating_sub(2 * bw);
        }
        if vert {
            target.y = area.y;
            target.height = area.height.saturating_sub(2 * bw);
        }

        if let Some(active) = frame.active() {
            if let Some(client) = self.clients.get(active) {
                let applied = client.hints.apply(
                    target.width as i32,
                    target.height as i32 - deco as i32,
                    true,
                );
                target.width = applied.width;
                target.height = applied.height + deco;
            }
        }
        target
    }

    // ---- shade / stick ----------------------------------------------------

    /// Rolls the frame up into its titlebar (protocol-wise the same as
    /// iconic). Needs a titlebar to roll into.
    pub fn shade(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get_mut(fid) else {
            return;
        };
        if !frame.decorations.contains(Decorations::TITLEBAR) {
            trace!(?fid, "no titlebar, no shade");
            return;
        }
        frame.shaded = !frame.shaded;
        self.broadcast.send(Notification::StateChanged(fid));
    }

    /// Toggles omnipresence. Announced as a workspace change because pagers
    /// treat "stuck" as a pseudo-workspace.
    pub fn stick(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get_mut(fid) else {
            return;
        };
        frame.stuck = !frame.stuck;
        let workspace = frame.workspace;
        self.broadcast.send(Notification::StateChanged(fid));
        self.broadcast
            .send(Notification::WorkspaceChanged(fid, workspace));
    }
}
