//! ICCCM size-hint normalization and the geometry constraint engine.
//!
//! `SizeHints` is the defaulted, always-valid form of WM_NORMAL_HINTS.
//! [`SizeHints::apply`] conforms a proposed size to the hints (min/max,
//! aspect range, increments, in that order — see ICCCM 4.1.2.3);
//! [`SizeHints::check`] verifies a size without mutating it.

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::sys::window_server::RawSizeHints;

/// Which corner or edge of the client is held fixed when the decorations
/// around it change size.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Gravity {
    Forget = 0,
    #[default]
    NorthWest = 1,
    North = 2,
    NorthEast = 3,
    West = 4,
    Center = 5,
    East = 6,
    SouthWest = 7,
    South = 8,
    SouthEast = 9,
    Static = 10,
}

impl Gravity {
    /// Offset from the client's requested origin to the frame origin, given
    /// the decoration extents on each side.
    pub fn frame_offset(&self, left: u32, right: u32, top: u32, bottom: u32) -> (i32, i32) {
        let dw = (left + right) as i32;
        let dh = (top + bottom) as i32;
        let dx = match self {
            Gravity::NorthWest | Gravity::West | Gravity::SouthWest | Gravity::Forget => 0,
            Gravity::North | Gravity::Center | Gravity::South => -(dw / 2),
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => -dw,
            Gravity::Static => -(left as i32),
        };
        let dy = match self {
            Gravity::NorthWest | Gravity::North | Gravity::NorthEast | Gravity::Forget => 0,
            Gravity::West | Gravity::Center | Gravity::East => -(dh / 2),
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => -dh,
            Gravity::Static => -(top as i32),
        };
        (dx, dy)
    }
}

/// A rational aspect bound. `den == 0` means the bound is unset.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub fn is_set(&self) -> bool { self.den > 0 }

    fn value(&self) -> f64 { self.num as f64 / self.den as f64 }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeHints {
    pub min_width: u32,
    pub min_height: u32,
    /// 0 = unbounded.
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub base_width: u32,
    pub base_height: u32,
    pub min_aspect: AspectRatio,
    pub max_aspect: AspectRatio,
    pub gravity: Gravity,
}

impl Default for SizeHints {
    fn default() -> Self { SizeHints::normalize(RawSizeHints::default()) }
}

/// Result of conforming a proposed size. `cols`/`rows` are the pre-snap
/// increment quotients — the cell counts shown to the user during an
/// interactive resize ("80x24" for a terminal).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AppliedSize {
    pub width: u32,
    pub height: u32,
    pub cols: i32,
    pub rows: i32,
}

/// Closest point to (px, py) on the line through the origin with the given
/// gradient. Aspect lines always pass through the origin, so the general
/// point-to-line formula collapses to one projection.
fn closest_point_to_line(px: f64, py: f64, gradient: f64) -> (f64, f64) {
    let u = (px * gradient + py) / (gradient * gradient + 1.0);
    (u * gradient, u)
}

impl SizeHints {
    /// Normalizes a possibly-partial raw hint set. Never fails: missing or
    /// invalid fields fall back to defaults (min 1x1, increments 1, max
    /// unbounded, gravity NorthWest). Min and base default to each other
    /// when only one was supplied.
    pub fn normalize(raw: RawSizeHints) -> SizeHints {
        let (min_width, min_height, base_width, base_height) = match (raw.min_size, raw.base_size)
        {
            (Some((minw, minh)), Some((basew, baseh))) => (minw, minh, basew, baseh),
            (Some((minw, minh)), None) => (minw, minh, minw, minh),
            (None, Some((basew, baseh))) => (basew, baseh, basew, baseh),
            (None, None) => (1, 1, 0, 0),
        };
        let (max_width, max_height) = raw.max_size.unwrap_or((0, 0));
        let (width_inc, height_inc) = raw.resize_inc.unwrap_or((1, 1));
        let (min_aspect, max_aspect) = match raw.aspect {
            Some(((min_x, min_y), (max_x, max_y))) => (
                AspectRatio { num: min_x, den: min_y },
                AspectRatio { num: max_x, den: max_y },
            ),
            None => (AspectRatio::default(), AspectRatio::default()),
        };
        SizeHints {
            min_width: min_width.max(1),
            min_height: min_height.max(1),
            max_width,
            max_height,
            width_inc: width_inc.max(1),
            height_inc: height_inc.max(1),
            base_width,
            base_height,
            min_aspect,
            max_aspect,
            gravity: raw
                .gravity
                .and_then(|g| Gravity::try_from(g).ok())
                .unwrap_or_default(),
        }
    }

    fn aspect_range_set(&self) -> bool { self.min_aspect.is_set() && self.max_aspect.is_set() }

    /// Conforms a proposed size to these hints and reports the increment
    /// quotients for display.
    ///
    /// When `maximizing`, the aspect correction holds one axis fixed and
    /// derives the other instead of projecting — projection can grow a
    /// dimension, which would push a maximized frame off its head. When a
    /// degenerate proposal violates both aspect bounds at once the minimum
    /// bound wins; that tie-break is a documented default, nothing upstream
    /// pins it down.
    pub fn apply(&self, width: i32, height: i32, maximizing: bool) -> AppliedSize {
        let mut width = width;
        let mut height = height;

        if width < self.min_width as i32 {
            width = self.min_width as i32;
        }
        if height < self.min_height as i32 {
            height = self.min_height as i32;
        }
        if self.max_width > 0 && width > self.max_width as i32 {
            width = self.max_width as i32;
        }
        if self.max_height > 0 && height > self.max_height as i32 {
            height = self.max_height as i32;
        }

        // Aspect before increments; exactly satisfying both at once is not
        // generally possible and clients do not combine them in practice.
        // Aspect bounds constrain the size in excess of the base size.
        if self.aspect_range_set() && height - (self.base_height as i32) > 0 {
            let mut widthd = (width - self.base_width as i32) as f64;
            let mut heightd = (height - self.base_height as i32) as f64;
            let min = self.min_aspect.value();
            let max = self.max_aspect.value();
            let actual = widthd / heightd;

            if min > 0.0 && max > 0.0 && actual > 0.0 {
                let mut changed = false;
                if actual < min {
                    changed = true;
                    if maximizing {
                        heightd = widthd / min;
                    } else {
                        (widthd, heightd) = closest_point_to_line(widthd, heightd, min);
                    }
                } else if actual > max {
                    changed = true;
                    if maximizing {
                        widthd = heightd * max;
                    } else {
                        (widthd, heightd) = closest_point_to_line(widthd, heightd, max);
                    }
                }
                if changed {
                    width = widthd as i32 + self.base_width as i32;
                    height = heightd as i32 + self.base_height as i32;
                }
            }
        }

        // Snap to increments relative to the base size. The quotient is what
        // the user sees.
        let cols = (width - self.base_width as i32) / self.width_inc as i32;
        let rows = (height - self.base_height as i32) / self.height_inc as i32;
        width = cols * self.width_inc as i32 + self.base_width as i32;
        height = rows * self.height_inc as i32 + self.base_height as i32;

        AppliedSize {
            width: width.max(1) as u32,
            height: height.max(1) as u32,
            cols,
            rows,
        }
    }

    /// Re-verifies a size against the hints without changing it. Used to
    /// detect externally-requested geometries that violate what the client
    /// itself declared.
    pub fn check(&self, width: u32, height: u32) -> bool {
        if width < self.min_width || height < self.min_height {
            return false;
        }
        if self.max_width > 0 && width > self.max_width {
            return false;
        }
        if self.max_height > 0 && height > self.max_height {
            return false;
        }
        if (width as i64 - self.base_width as i64) % self.width_inc as i64 != 0 {
            return false;
        }
        if (height as i64 - self.base_height as i64) % self.height_inc as i64 != 0 {
            return false;
        }
        let ratio = width as f64 / height as f64;
        if self.min_aspect.is_set() && self.min_aspect.value() > ratio {
            return false;
        }
        if self.max_aspect.is_set() && self.max_aspect.value() < ratio {
            return false;
        }
        true
    }
}
