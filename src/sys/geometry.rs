//! Integer pixel geometry. X11 hands us i16/u16 on the wire; everything here
//! is widened so arithmetic on proposed positions can go negative without
//! ceremony.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point { Point { x, y } }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Size { Size { width, height } }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Rect { Rect { x, y, width, height } }

    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    pub fn size(&self) -> Size { Size::new(self.width, self.height) }

    pub fn left(&self) -> i32 { self.x }

    pub fn top(&self) -> i32 { self.y }

    pub fn right(&self) -> i32 { self.x + self.width as i32 }

    pub fn bottom(&self) -> i32 { self.y + self.height as i32 }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    /// The vertical extents of the two rects intersect.
    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.top() <= other.bottom() && self.bottom() >= other.top()
    }

    /// The horizontal extents of the two rects intersect.
    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.left() <= other.right() && self.right() >= other.left()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Grown by `amount` on every side; used to include borders when
    /// comparing frame edges.
    pub fn inflate(&self, amount: u32) -> Rect {
        Rect::new(
            self.x - amount as i32,
            self.y - amount as i32,
            self.width + 2 * amount,
            self.height + 2 * amount,
        )
    }

    pub fn with_origin(&self, x: i32, y: i32) -> Rect { Rect::new(x, y, self.width, self.height) }

    pub fn with_size(&self, width: u32, height: u32) -> Rect {
        Rect::new(self.x, self.y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges() {
        let r = Rect::new(10, 20, 30, 40);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 60);
        assert!(r.contains(Point::new(10, 20)));
        assert!(!r.contains(Point::new(40, 20)));
    }

    #[test]
    fn orthogonal_overlap() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(500, 50, 100, 100);
        // far apart in x, but their vertical ranges intersect
        assert!(a.overlaps_vertically(&b));
        assert!(!Rect::new(0, 0, 10, 10).overlaps_vertically(&Rect::new(0, 200, 10, 10)));
    }

    #[test]
    fn inflate_accounts_for_borders() {
        let r = Rect::new(5, 5, 10, 10).inflate(2);
        assert_eq!(r, Rect::new(3, 3, 14, 14));
    }
}
