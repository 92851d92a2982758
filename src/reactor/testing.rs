//! Shared helpers for reactor tests.

use crate::common::config::Config;
use crate::model::frame::FrameId;
use crate::reactor::{Event, Reactor};
use crate::sys::geometry::Rect;
use crate::sys::window_server::{Request, WindowHandle, WindowInfo};

pub(crate) fn h(n: u32) -> WindowHandle { WindowHandle::new(n) }

pub(crate) fn make_window(title: &str) -> WindowInfo {
    WindowInfo {
        geometry: Rect::new(100, 100, 300, 200),
        title: title.to_string(),
        instance_name: "term".to_string(),
        class_name: "Term".to_string(),
        ..Default::default()
    }
}

impl Reactor {
    pub(crate) fn new_for_test() -> Reactor { Reactor::new_for_test_with(Config::default()) }

    pub(crate) fn new_for_test_with(config: Config) -> Reactor {
        let mut reactor = Reactor::new(config);
        reactor.handle_event(Event::ScreenParametersChanged(vec![Rect::new(
            0, 0, 1000, 800,
        )]));
        reactor
    }

    pub(crate) fn map(&mut self, n: u32, info: WindowInfo) -> WindowHandle {
        let window = h(n);
        self.handle_event(Event::WindowMapped(window, info));
        window
    }

    pub(crate) fn frame_for(&self, n: u32) -> FrameId {
        self.frame_of_window(h(n)).expect("window has no frame")
    }

    pub(crate) fn drain(&mut self) -> Vec<Request> {
        self.broadcast.take();
        self.take_requests()
    }
}
