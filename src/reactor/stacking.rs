//! Raise/lower and layer movement, cascading through the transient graph.
//!
//! Every cascade starts from the root of the active client's transient
//! chain and walks down so dialogs always end up over their parents. The
//! per-frame `op_lock` makes a re-entrant visit a no-op: diamond shapes and
//! the debris of a truncated cycle would otherwise recurse forever.

use crate::model::frame::FrameId;
use crate::reactor::{Notification, Reactor};
use crate::sys::window_server::{Layer, Request};
use crate::model::transient::root_transient_for;

impl Reactor {
    /// Raises the frame and every transient hanging off its chain.
    pub fn raise(&mut self, fid: FrameId) {
        if self.frames.get(fid).is_none() {
            return;
        }
        if self.frames[fid].is_iconic() {
            self.deiconify(fid, true, false);
        }
        let root = self.cascade_root(fid);
        self.raise_cascade(root);
    }

    pub fn lower(&mut self, fid: FrameId) {
        if self.frames.get(fid).is_none() {
            return;
        }
        if self.frames[fid].is_iconic() {
            self.deiconify(fid, true, false);
        }
        let root = self.cascade_root(fid);
        self.lower_cascade(root);
    }

    /// The frame holding the root of the active client's transient-for
    /// chain; the frame itself when the chain leads nowhere useful.
    fn cascade_root(&self, fid: FrameId) -> FrameId {
        let Some(active) = self.frames.get(fid).and_then(|f| f.active()) else {
            return fid;
        };
        let root = root_transient_for(&self.clients, active);
        self.clients.get(root).and_then(|c| c.frame).unwrap_or(fid)
    }

    fn raise_cascade(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        if frame.op_lock.get() {
            return;
        }
        frame.op_lock.set(true);
        if !frame.is_iconic() {
            self.pending.push(Request::Raise(frame.stack));
        }
        for tf in self.transient_frames_of_active(fid) {
            self.raise_cascade(tf);
        }
        if let Some(frame) = self.frames.get(fid) {
            frame.op_lock.set(false);
        }
    }

    fn lower_cascade(&mut self, fid: FrameId) {
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        if frame.op_lock.get() {
            return;
        }
        frame.op_lock.set(true);
        if !frame.is_iconic() {
            self.pending.push(Request::Lower(frame.stack));
        }
        for tf in self.transient_frames_of_active(fid) {
            self.lower_cascade(tf);
        }
        if let Some(frame) = self.frames.get(fid) {
            frame.op_lock.set(false);
        }
    }

    /// Frames of the active client's transients, skipping iconic ones.
    fn transient_frames_of_active(&self, fid: FrameId) -> Vec<FrameId> {
        let Some(active) = self.frames.get(fid).and_then(|f| f.active()) else {
            return Vec::new();
        };
        let Some(client) = self.clients.get(active) else {
            return Vec::new();
        };
        client
            .transients()
            .iter()
            .filter_map(|&t| self.clients.get(t).and_then(|c| c.frame))
            .filter(|&tf| self.frames.get(tf).is_some_and(|f| !f.is_iconic()))
            .collect()
    }

    // ---- layers -----------------------------------------------------------

    pub fn raise_layer(&mut self, fid: FrameId) {
        let root = self.cascade_root(fid);
        let Some(frame) = self.frames.get(root) else {
            return;
        };
        let layer = frame.layer.raised();
        self.set_layer_with_transients(root, layer);
    }

    pub fn lower_layer(&mut self, fid: FrameId) {
        let root = self.cascade_root(fid);
        let Some(frame) = self.frames.get(root) else {
            return;
        };
        let layer = frame.layer.lowered();
        self.set_layer_with_transients(root, layer);
    }

    pub fn move_to_layer(&mut self, fid: FrameId, layer: Layer) {
        let root = self.cascade_root(fid);
        self.set_layer_with_transients(root, layer.clamp_below_menu());
    }

    /// Moves the frame to `layer` and drags the active client's transients
    /// to the same layer so dialogs never get stranded in another stacking
    /// class than their parent.
    fn set_layer_with_transients(&mut self, fid: FrameId, layer: Layer) {
        let Some(frame) = self.frames.get_mut(fid) else {
            return;
        };
        if frame.layer != layer {
            frame.layer = layer;
            let stack = frame.stack;
            self.pending.push(Request::SetLayer(stack, layer));
            self.broadcast.send(Notification::LayerChanged(fid, layer));
        }
        for tf in self.transient_frames_of_active(fid) {
            let Some(frame) = self.frames.get_mut(tf) else {
                continue;
            };
            if frame.layer != layer {
                frame.layer = layer;
                let stack = frame.stack;
                self.pending.push(Request::SetLayer(stack, layer));
                self.broadcast.send(Notification::LayerChanged(tf, layer));
            }
        }
    }
}
