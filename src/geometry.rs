//! Axis-aligned rectangles in overlay-surface pixel coordinates.

/// Position and size of a control (or label) on the overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Containment test, inclusive on all four edges.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let within = |pos: i32, start: i32, size: i32| {
            let pos = i64::from(pos);
            pos >= i64::from(start) && pos <= i64::from(start) + i64::from(size)
        };
        within(x, self.x, self.width) && within(y, self.y, self.height)
    }

    /// Centre point, kept fractional for angle computation.
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Translate by `(dx, dy)` and clamp each axis independently so the
    /// rectangle stays inside `[0, max_x] × [0, max_y]`.
    ///
    /// A rectangle larger than the surface is pinned to the origin.
    pub fn translated_within(&self, dx: i32, dy: i32, max_x: i32, max_y: i32) -> Rect {
        let clamp = |pos: i32, size: i32, max: i32| pos.min(max.saturating_sub(size)).max(0);
        Rect {
            x: clamp(self.x.saturating_add(dx), self.width, max_x),
            y: clamp(self.y.saturating_add(dy), self.height, max_y),
            ..*self
        }
    }
}

