//! Types shared across the seam to the display server.

pub mod geometry;
pub mod window_server;
