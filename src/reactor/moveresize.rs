//! Interactive move and resize.
//!
//! Exactly one drag can be in flight (move and resize are mutually
//! exclusive interaction modes). Motion events re-derive the proposed
//! geometry on every pointer position: moves go through edge/window
//! snapping and may warp across workspaces; resizes go through the size
//! hints, with the left-grip variant re-anchoring the x origin so the right
//! edge stays put. Release always commits and always restores the grab.

use tracing::{debug, trace};

use crate::model::frame::{FrameId, Functions};
use crate::reactor::{Notification, Reactor};
use crate::sys::geometry::Rect;
use crate::sys::window_server::{Grip, Request, WorkspaceId};

#[derive(Debug)]
pub(crate) enum DragState {
    Move(MoveState),
    Resize(ResizeState),
}

impl DragState {
    pub(crate) fn frame(&self) -> FrameId {
        match self {
            DragState::Move(state) => state.frame,
            DragState::Resize(state) => state.frame,
        }
    }
}

#[derive(Debug)]
pub(crate) struct MoveState {
    frame: FrameId,
    /// Pointer position relative to the frame origin at grab time; kept
    /// up to date across workspace warps so motion continues seamlessly.
    offset_x: i32,
    offset_y: i32,
    /// Last proposed (snapped) position, committed on release.
    last_x: i32,
    last_y: i32,
    last_pointer_x: i32,
    start_workspace: WorkspaceId,
}

#[derive(Debug)]
pub(crate) struct ResizeState {
    frame: FrameId,
    grab_x: i32,
    grab_y: i32,
    grip: Grip,
    /// Geometry at grab time; deltas are applied against this.
    orig: Rect,
    /// Last hint-conformed proposal, committed on release.
    last: Rect,
}

/// Offsets that would align the moving rect with `other`'s edges, kept per
/// axis whenever they beat the current best. Edges only count when the two
/// rects overlap on the perpendicular axis.
fn snap_to_rect(dx: &mut i32, dy: &mut i32, moving: &Rect, other: &Rect) {
    if moving.overlaps_vertically(other) {
        for edge in [other.left(), other.right()] {
            for mine in [moving.left(), moving.right()] {
                if (edge - mine).abs() < dx.abs() {
                    *dx = edge - mine;
                }
            }
        }
    }
    if moving.overlaps_horizontally(other) {
        for edge in [other.top(), other.bottom()] {
            for mine in [moving.top(), moving.bottom()] {
                if (edge - mine).abs() < dy.abs() {
                    *dy = edge - mine;
                }
            }
        }
    }
}

impl Reactor {
    pub(crate) fn start_move(&mut self, fid: FrameId, x: i32, y: i32) {
        if self.drag.is_some() {
            return;
        }
        let Some(frame) = self.frames.get_mut(fid) else {
            return;
        };
        if frame.resizing || !frame.functions.contains(Functions::MOVE) {
            trace!(?fid, "move refused");
            return;
        }
        frame.moving = true;
        let geometry = frame.geometry;
        self.drag = Some(DragState::Move(MoveState {
            frame: fid,
            offset_x: x - geometry.x,
            offset_y: y - geometry.y,
            last_x: geometry.x,
            last_y: geometry.y,
            last_pointer_x: x,
            start_workspace: self.workspace,
        }));
        self.pending.push(Request::GrabPointer);
        if !self.config.move_resize.opaque_move {
            self.pending.push(Request::DrawOutline(geometry));
        }
    }

    pub(crate) fn start_resize(&mut self, fid: FrameId, x: i32, y: i32, grip: Grip) {
        if self.drag.is_some() {
            return;
        }
        let Some(frame) = self.frames.get_mut(fid) else {
            return;
        };
        if frame.moving || !frame.functions.contains(Functions::RESIZE) {
            trace!(?fid, "resize refused");
            return;
        }
        frame.resizing = true;
        let orig = frame.geometry;
        let mut state = ResizeState {
            frame: fid,
            grab_x: x,
            grab_y: y,
            grip,
            orig,
            last: orig,
        };
        self.conform_resize(&mut state);
        let outline = state.last;
        self.drag = Some(DragState::Resize(state));
        self.pending.push(Request::GrabPointer);
        self.pending.push(Request::DrawOutline(outline));
    }

    pub(crate) fn pointer_moved(&mut self, x: i32, y: i32) {
        match self.drag.take() {
            Some(DragState::Move(state)) => self.move_motion(state, x, y),
            Some(DragState::Resize(state)) => self.resize_motion(state, x, y),
            None => {}
        }
    }

    pub(crate) fn pointer_released(&mut self, x: i32, y: i32) {
        match self.drag.take() {
            Some(DragState::Move(mut state)) => {
                self.apply_move_motion(&mut state, x, y);
                self.stop_move(state);
            }
            Some(DragState::Resize(mut state)) => {
                self.apply_resize_motion(&mut state, x, y);
                self.stop_resize(state);
            }
            None => {}
        }
    }

    // ---- move -------------------------------------------------------------

    fn move_motion(&mut self, mut state: MoveState, x: i32, y: i32) {
        self.apply_move_motion(&mut state, x, y);
        self.drag = Some(DragState::Move(state));
    }

    fn apply_move_motion(&mut self, state: &mut MoveState, x: i32, y: i32) {
        if self.frames.get(state.frame).is_none() {
            return;
        }
        let mut pointer_x = x;
        if self.config.move_resize.workspace_warping {
            pointer_x = self.maybe_warp_workspace(state, x);
        }
        let mut left = pointer_x - state.offset_x;
        let mut top = y - state.offset_y;
        self.snap_position(state.frame, &mut left, &mut top);

        state.last_x = left;
        state.last_y = top;
        state.last_pointer_x = pointer_x;

        let geometry = self.frames[state.frame].geometry;
        if self.config.move_resize.opaque_move {
            self.move_resize(state.frame, geometry.with_origin(left, top));
        } else {
            let bw = self.frames[state.frame].border_width;
            self.pending.push(Request::DrawOutline(
                geometry.with_origin(left, top).inflate(bw),
            ));
        }
    }

    /// Crossing a horizontal screen edge past the snap pad while actually
    /// moving in that direction hops to the neighboring workspace, wrapping
    /// at the ends. The pointer is warped to the opposite edge and the drag
    /// origin re-based so the window keeps tracking it.
    fn maybe_warp_workspace(&mut self, state: &mut MoveState, x: i32) -> i32 {
        let count = self.workspace_count;
        if count <= 1 {
            return x;
        }
        let Some(&screen) = self.screens.first() else {
            return x;
        };
        let moved_x = x - state.last_pointer_x;
        if moved_x == 0 {
            return x;
        }
        let pad = self.config.snap.threshold;
        let current = self.workspace.get();
        let (next, warp_dx) = if x >= screen.right() - pad - 1 && moved_x > 0 {
            ((current + 1) % count, -x)
        } else if x <= screen.left() + pad && moved_x < 0 {
            ((current + count - 1) % count, screen.right() - x - 1)
        } else {
            return x;
        };

        let workspace = WorkspaceId(next);
        debug!(?workspace, "warping mid-move");
        self.workspace = workspace;
        self.pending.push(Request::WarpPointer { dx: warp_dx, dy: 0 });
        self.pending.push(Request::SwitchWorkspace(workspace));

        // the pointer jumped by warp_dx; shift the grab offset the same
        // amount so the proposed position is continuous
        state.offset_x += warp_dx;
        x + warp_dx
    }

    fn stop_move(&mut self, state: MoveState) {
        let fid = state.frame;
        if let Some(frame) = self.frames.get_mut(fid) {
            frame.moving = false;
            let geometry = frame.geometry.with_origin(state.last_x, state.last_y);
            self.move_resize(fid, geometry);
            if state.start_workspace != self.workspace {
                let workspace = self.workspace;
                self.frames[fid].workspace = workspace;
                self.broadcast
                    .send(Notification::WorkspaceChanged(fid, workspace));
            }
        }
        if !self.config.move_resize.opaque_move {
            self.pending.push(Request::ClearOutline);
        }
        self.pending.push(Request::UngrabPointer);
    }

    /// Best snap deltas for a proposed position against head edges and
    /// every visible frame on the current workspace; axes are independent
    /// and only offsets within the threshold are applied.
    fn snap_position(&self, fid: FrameId, left: &mut i32, top: &mut i32) {
        let threshold = self.config.snap.threshold;
        if threshold == 0 {
            return;
        }
        let Some(frame) = self.frames.get(fid) else {
            return;
        };
        let bw = frame.border_width;
        let moving = Rect::new(
            *left,
            *top,
            frame.geometry.width + 2 * bw,
            frame.geometry.height + 2 * bw,
        );

        let mut dx = threshold + 1;
        let mut dy = threshold + 1;
        for screen in &self.screens {
            snap_to_rect(&mut dx, &mut dy, &moving, screen);
        }
        for (oid, other) in &self.frames {
            if oid == fid || other.is_iconic() {
                continue;
            }
            if other.workspace != self.workspace && !other.stuck {
                continue;
            }
            let obw = other.border_width;
            let rect = Rect::new(
                other.geometry.x,
                other.geometry.y,
                other.geometry.width + 2 * obw,
                other.geometry.height + 2 * obw,
            );
            snap_to_rect(&mut dx, &mut dy, &moving, &rect);
        }

        if dx.abs() <= threshold {
            *left += dx;
        }
        if dy.abs() <= threshold {
            *top += dy;
        }
    }

    // ---- resize -----------------------------------------------------------

    fn resize_motion(&mut self, mut state: ResizeState, x: i32, y: i32) {
        self.apply_resize_motion(&mut state, x, y);
        self.drag = Some(DragState::Resize(state));
    }

    fn apply_resize_motion(&mut self, state: &mut ResizeState, x: i32, y: i32) {
        if self.frames.get(state.frame).is_none() {
            return;
        }
        let height = state.orig.height as i32 + (y - state.grab_y);
        state.last.height = height.max(1) as u32;
        match state.grip {
            Grip::Right => {
                let width = state.orig.width as i32 + (x - state.grab_x);
                state.last.width = width.max(1) as u32;
            }
            Grip::Left => {
                state.last.x = state.orig.x + (x - state.grab_x);
                let width = state.orig.right() - state.last.x;
                state.last.width = width.max(1) as u32;
            }
        }
        self.conform_resize(state);
        self.pending.push(Request::DrawOutline(state.last));
    }

    /// Runs the proposal through the active client's size hints (frame
    /// decorations subtracted first) and reports the live cell counts. The
    /// left grip re-derives x from the new width, anchoring the right edge.
    fn conform_resize(&mut self, state: &mut ResizeState) {
        let fid = state.frame;
        let Some(active) = self.frames.get(fid).and_then(|f| f.active()) else {
            return;
        };
        let (top, bottom) = self.frame_decoration_heights(fid);
        let deco = (top + bottom) as i32;
        let hints = self.clients[active].hints;
        let applied = hints.apply(
            state.last.width as i32,
            state.last.height as i32 - deco,
            false,
        );
        state.last.width = applied.width;
        state.last.height = applied.height + deco as u32;
        if state.grip == Grip::Left {
            state.last.x = state.orig.right() - state.last.width as i32;
        }
        self.broadcast
            .send(Notification::ResizeDisplay(fid, applied.cols, applied.rows));
    }

    fn stop_resize(&mut self, state: ResizeState) {
        let fid = state.frame;
        if let Some(frame) = self.frames.get_mut(fid) {
            frame.resizing = false;
            self.move_resize(fid, state.last);
        }
        self.pending.push(Request::ClearOutline);
        self.pending.push(Request::UngrabPointer);
    }
}


#[cfg(test)]
mod interaction_tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::reactor::testing::{h, make_window};
    use crate::reactor::{Event, Notification, Reactor};
    use crate::sys::window_server::RawSizeHints;

    fn start_move(reactor: &mut Reactor, n: u32, x: i32, y: i32) {
        reactor.handle_event(Event::MoveStarted { window: h(n), x, y });
    }

    #[test]
    fn opaque_move_tracks_the_pointer() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let fid = reactor.frame_for(1);
        reactor.drain();

        start_move(&mut reactor, 1, 150, 150);
        assert!(reactor.take_requests().contains(&Request::GrabPointer));
        assert!(reactor.frames[fid].moving);

        reactor.handle_event(Event::PointerMoved { x: 450, y: 250 });
        assert_eq!(reactor.frames[fid].geometry.origin().x, 400);
        assert_eq!(reactor.frames[fid].geometry.origin().y, 200);

        reactor.handle_event(Event::PointerReleased { x: 450, y: 250 });
        assert!(!reactor.frames[fid].moving);
        assert!(reactor.take_requests().contains(&Request::UngrabPointer));
        assert!(reactor.drag.is_none());
    }

    #[test]
    fn moving_snaps_to_a_neighbors_edge() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("moving"));
        let mut other = make_window("anchor");
        other.geometry = Rect::new(500, 100, 200, 400);
        reactor.map(2, other);
        let fid = reactor.frame_for(1);
        let bw = reactor.frames[fid].border_width as i32;

        start_move(&mut reactor, 1, 150, 150);
        // proposed left = 195; the moving frame's right edge (borders
        // included) lands 3px shy of the anchor's left edge - snap pulls it
        // flush
        reactor.handle_event(Event::PointerMoved { x: 245, y: 150 });
        let g = reactor.frames[fid].geometry;
        assert_eq!(g.x + g.width as i32 + 2 * bw, 500);
        assert_eq!(g.y, 100, "y axis did not move");
    }

    #[test]
    fn snapping_is_off_at_zero_threshold() {
        let mut config = crate::common::config::Config::default();
        config.snap.threshold = 0;
        let mut reactor = Reactor::new_for_test_with(config);
        reactor.map(1, make_window("a"));
        let fid = reactor.frame_for(1);

        start_move(&mut reactor, 1, 150, 150);
        reactor.handle_event(Event::PointerMoved { x: 52, y: 150 });
        assert_eq!(reactor.frames[fid].geometry.x, 2, "no pull to the edge");
    }

    #[test]
    fn dragging_past_the_screen_edge_warps_to_the_next_workspace() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let fid = reactor.frame_for(1);
        reactor.drain();

        start_move(&mut reactor, 1, 500, 300);
        reactor.handle_event(Event::PointerMoved { x: 995, y: 300 });

        assert_eq!(reactor.workspace, WorkspaceId(1));
        let requests = reactor.take_requests();
        assert!(requests.contains(&Request::SwitchWorkspace(WorkspaceId(1))));
        assert!(requests.iter().any(|r| matches!(r, Request::WarpPointer { .. })));

        // release commits and reassociates the frame to the new workspace
        reactor.handle_event(Event::PointerReleased { x: 10, y: 300 });
        assert_eq!(reactor.frames[fid].workspace, WorkspaceId(1));
        assert!(reactor
            .take_notifications()
            .iter()
            .any(|n| matches!(n, Notification::WorkspaceChanged(f, WorkspaceId(1)) if *f == fid)));
    }

    #[test]
    fn warping_wraps_backwards_from_workspace_zero() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));

        start_move(&mut reactor, 1, 500, 300);
        reactor.handle_event(Event::PointerMoved { x: 3, y: 300 });
        // 4 workspaces by default: 0 - 1 wraps to 3
        assert_eq!(reactor.workspace, WorkspaceId(3));
    }

    #[test]
    fn move_is_refused_while_resizing() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        let fid = reactor.frame_for(1);

        reactor.handle_event(Event::ResizeStarted {
            window: h(1),
            x: 400,
            y: 322,
            grip: Grip::Right,
        });
        start_move(&mut reactor, 1, 150, 150);
        assert!(!reactor.frames[fid].moving);
        assert!(reactor.frames[fid].resizing);
    }

    #[test]
    fn right_grip_resize_honors_increments_and_reports_cells() {
        let mut reactor = Reactor::new_for_test();
        let mut info = make_window("term");
        info.size_hints = RawSizeHints {
            min_size: Some((100, 100)),
            base_size: Some((0, 0)),
            resize_inc: Some((10, 10)),
            ..Default::default()
        };
        reactor.map(1, info);
        let fid = reactor.frame_for(1);
        reactor.drain();

        reactor.handle_event(Event::ResizeStarted {
            window: h(1),
            x: 400,
            y: 322,
            grip: Grip::Right,
        });
        reactor.handle_event(Event::PointerMoved { x: 407, y: 320 });
        let notes = reactor.take_notifications();
        assert!(notes.contains(&Notification::ResizeDisplay(fid, 30, 19)));

        reactor.handle_event(Event::PointerReleased { x: 407, y: 320 });
        // client 300x198 snaps to 300x190; frame adds 22px of decoration
        assert_eq!(reactor.frames[fid].geometry, Rect::new(100, 100, 300, 212));
        assert!(!reactor.frames[fid].resizing);
    }

    #[test]
    fn left_grip_resize_anchors_the_right_edge() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("free"));
        let fid = reactor.frame_for(1);
        let right_edge = reactor.frames[fid].geometry.right();

        reactor.handle_event(Event::ResizeStarted {
            window: h(1),
            x: 100,
            y: 322,
            grip: Grip::Left,
        });
        reactor.handle_event(Event::PointerMoved { x: 93, y: 322 });
        reactor.handle_event(Event::PointerReleased { x: 93, y: 322 });

        let g = reactor.frames[fid].geometry;
        assert_eq!(g.x, 93, "left edge followed the pointer");
        assert_eq!(g.width, 307, "width grew by the same amount");
        assert_eq!(g.right(), right_edge, "right edge never moved");
    }

    #[test]
    fn resize_outline_is_drawn_and_cleared() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.drain();

        reactor.handle_event(Event::ResizeStarted {
            window: h(1),
            x: 400,
            y: 322,
            grip: Grip::Right,
        });
        assert!(reactor
            .take_requests()
            .iter()
            .any(|r| matches!(r, Request::DrawOutline(_))));

        reactor.handle_event(Event::PointerReleased { x: 400, y: 322 });
        assert!(reactor.take_requests().contains(&Request::ClearOutline));
    }

    #[test]
    fn pointer_events_without_a_drag_are_ignored() {
        let mut reactor = Reactor::new_for_test();
        reactor.map(1, make_window("a"));
        reactor.drain();
        reactor.handle_event(Event::PointerMoved { x: 5, y: 5 });
        reactor.handle_event(Event::PointerReleased { x: 5, y: 5 });
        assert!(reactor.take_requests().is_empty());
    }
}
