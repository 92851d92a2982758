pub mod client;
pub mod frame;
pub mod hints;
pub mod session;
pub mod transient;

pub use client::{Client, ClientId, FocusModel, FocusResponse};
pub use frame::{Decorations, Frame, FrameId, Functions, WmState};
pub use hints::{AppliedSize, AspectRatio, Gravity, SizeHints};
pub use session::{ClientKey, SavedAttributes, SessionStore};
pub use transient::TransientWaitList;
